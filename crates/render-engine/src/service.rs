//! Request intake: runs transforms on a bounded pool of blocking workers.
//!
//! Each request is resolved, folded, and encoded on tokio's blocking pool;
//! a semaphore caps how many run at once so intake never waits on a slow
//! encode. Dropping a pending `transform` future cancels the request at the
//! next stage or frame boundary.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use spinoff_common::cancel::CancelToken;
use spinoff_common::config::AppConfig;
use spinoff_common::error::{SpinoffError, SpinoffResult};
use spinoff_media_model::request::{output_path_for, TransformRequest, TransformResult};
use spinoff_processing_core::{AssetLoader, PipelineExecutor};
use tokio::sync::Semaphore;

use crate::decode::FfmpegLoader;
use crate::encode::{EncodeBackend, FfmpegEncoder};

/// Cancels the token when dropped unless disarmed.
struct CancelOnDrop {
    token: CancelToken,
    armed: bool,
}

impl CancelOnDrop {
    fn new(token: CancelToken) -> Self {
        Self { token, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!("Transform abandoned by caller, cancelling");
            self.token.cancel();
        }
    }
}

/// Shared entry point for producing spin-offs.
#[derive(Clone)]
pub struct TransformService {
    executor: PipelineExecutor,
    encoder: Arc<dyn EncodeBackend>,
    output_dir: Option<PathBuf>,
    permits: Arc<Semaphore>,
    workers: usize,
}

impl TransformService {
    /// Service over the built-in recipes, decoding and encoding with ffmpeg.
    pub fn from_config(config: &AppConfig) -> Self {
        let loader: Arc<dyn AssetLoader> =
            Arc::new(FfmpegLoader::new(&config.encoder, &config.validation));
        Self::new(
            PipelineExecutor::with_builtin(loader),
            Arc::new(FfmpegEncoder::from_config(&config.encoder)),
            config.output_dir.clone(),
            config.workers.resolved_jobs(),
        )
    }

    pub fn new(
        executor: PipelineExecutor,
        encoder: Arc<dyn EncodeBackend>,
        output_dir: Option<PathBuf>,
        workers: usize,
    ) -> Self {
        let workers = workers.max(1);
        Self {
            executor,
            encoder,
            output_dir,
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn encoder(&self) -> &dyn EncodeBackend {
        self.encoder.as_ref()
    }

    pub fn executor(&self) -> &PipelineExecutor {
        &self.executor
    }

    /// Run one request to completion on the worker pool.
    ///
    /// Dropping the returned future before it resolves cancels `cancel`.
    /// A request that fails on its own, even by panicking, leaves the token
    /// alone.
    pub async fn transform(
        &self,
        request: TransformRequest,
        cancel: CancelToken,
    ) -> SpinoffResult<TransformResult> {
        let guard = CancelOnDrop::new(cancel.clone());
        let result = self.run_on_pool(request, cancel).await;
        guard.disarm();
        result
    }

    async fn run_on_pool(
        &self,
        request: TransformRequest,
        cancel: CancelToken,
    ) -> SpinoffResult<TransformResult> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| SpinoffError::Other(anyhow::anyhow!("worker pool closed: {e}")))?;

        let service = self.clone();
        tokio::task::spawn_blocking(move || service.transform_blocking(&request, &cancel))
            .await
            .map_err(|e| SpinoffError::Other(anyhow::anyhow!("transform worker failed: {e}")))?
    }

    /// Run several requests concurrently, bounded by the pool size. Results
    /// come back in request order.
    ///
    /// Dropping the returned future cancels every request still running.
    pub async fn transform_all(
        &self,
        requests: Vec<TransformRequest>,
        cancel: CancelToken,
    ) -> Vec<SpinoffResult<TransformResult>> {
        let guard = CancelOnDrop::new(cancel.clone());
        let handles: Vec<_> = requests
            .into_iter()
            .map(|request| {
                let service = self.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move { service.transform(request, cancel).await })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(handle.await.unwrap_or_else(|e| {
                Err(SpinoffError::Other(anyhow::anyhow!("transform task failed: {e}")))
            }));
        }
        guard.disarm();
        results
    }

    /// Resolve, fold, and encode on the current thread.
    pub fn transform_blocking(
        &self,
        request: &TransformRequest,
        cancel: &CancelToken,
    ) -> SpinoffResult<TransformResult> {
        let start = Instant::now();
        tracing::info!(
            source = %request.source.display(),
            platform = %request.platform,
            "Starting transform"
        );

        let prepared = self.executor.run(&request.source, &request.platform, cancel)?;
        cancel.check("before encode")?;

        let output_dir = request.output_dir.as_deref().or(self.output_dir.as_deref());
        let output_path = output_path_for(&request.source, prepared.platform, output_dir);
        let summary = self
            .encoder
            .encode(&prepared.asset, &prepared.encode, &output_path, cancel)?;

        let result = TransformResult {
            output_path: summary.output_path,
            platform: prepared.platform,
            duration_secs: prepared.asset.duration_secs(),
            width: prepared.asset.width(),
            height: prepared.asset.height(),
            video_bitrate_kbps: prepared.encode.video_bitrate_kbps,
            audio_bitrate_kbps: prepared.encode.audio_bitrate_kbps,
            elapsed_secs: start.elapsed().as_secs_f64(),
        };
        tracing::info!(
            output = %result.output_path.display(),
            platform = %result.platform,
            width = result.width,
            height = result.height,
            duration_secs = result.duration_secs,
            elapsed_secs = result.elapsed_secs,
            "Transform complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{write_frames, EncodeSummary};
    use spinoff_common::error::ErrorKind;
    use spinoff_media_model::asset::VideoAsset;
    use spinoff_media_model::geometry::Dimensions;
    use spinoff_media_model::profile::EncodeSettings;
    use spinoff_media_model::synthetic::{synthetic_asset, Pattern};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct SmallLoader;

    impl AssetLoader for SmallLoader {
        fn load(&self, source: &Path) -> SpinoffResult<VideoAsset> {
            if !source.exists() {
                return Err(SpinoffError::source_unreadable(source, "missing"));
            }
            synthetic_asset(
                &source.to_string_lossy(),
                Dimensions::new(32, 18),
                1.0,
                2.0,
                Pattern::Gradient,
            )
        }
    }

    /// Writes raw frames straight to the output path.
    #[derive(Default)]
    struct RawBackend {
        calls: AtomicUsize,
    }

    impl EncodeBackend for RawBackend {
        fn encode(
            &self,
            asset: &VideoAsset,
            _settings: &EncodeSettings,
            output: &Path,
            cancel: &CancelToken,
        ) -> SpinoffResult<EncodeSummary> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut bytes = Vec::new();
            let frames_written = write_frames(asset, &mut bytes, output, cancel)?;
            std::fs::write(output, bytes)?;
            Ok(EncodeSummary {
                output_path: output.to_path_buf(),
                frames_written,
                elapsed_secs: 0.0,
            })
        }

        fn is_available(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "raw"
        }
    }

    fn service(backend: Arc<RawBackend>, workers: usize) -> TransformService {
        TransformService::new(
            PipelineExecutor::with_builtin(Arc::new(SmallLoader)),
            backend,
            None,
            workers,
        )
    }

    fn source(dir: &Path) -> PathBuf {
        let path = dir.join("clip.mp4");
        std::fs::write(&path, b"placeholder").unwrap();
        path
    }

    #[tokio::test]
    async fn test_transform_writes_named_output() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path());
        let svc = service(Arc::new(RawBackend::default()), 2);

        let result = svc
            .transform(TransformRequest::new(&src, "twitter"), CancelToken::new())
            .await
            .unwrap();
        assert_eq!(result.output_path, dir.path().join("clip_spinoff_twitter.mp4"));
        assert!(result.output_path.exists());
        assert_eq!((result.width, result.height), (1280, 720));
        assert_eq!(result.video_bitrate_kbps, 2000);
    }

    #[tokio::test]
    async fn test_unknown_platform_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path());
        let backend = Arc::new(RawBackend::default());
        let svc = service(backend.clone(), 1);

        let err = svc
            .transform(TransformRequest::new(&src, "tiktok"), CancelToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownPlatform);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_output_dir_override() {
        let dir = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let src = source(dir.path());
        let svc = service(Arc::new(RawBackend::default()), 1);

        let request = TransformRequest::new(&src, "instagram").with_output_dir(out.path());
        let result = svc.transform(request, CancelToken::new()).await.unwrap();
        assert_eq!(
            result.output_path,
            out.path().join("clip_spinoff_instagram.mp4")
        );
        assert_eq!(result.width, result.height);
    }

    #[tokio::test]
    async fn test_cancelled_request_never_encodes() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path());
        let backend = Arc::new(RawBackend::default());
        let svc = service(backend.clone(), 1);

        let cancel = CancelToken::new();
        cancel.cancel();
        let err = svc
            .transform(TransformRequest::new(&src, "youtube"), cancel)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transform_all_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path());
        let svc = service(Arc::new(RawBackend::default()), 2);

        let requests = ["twitter", "bogus", "pinterest"]
            .into_iter()
            .map(|tag| TransformRequest::new(&src, tag))
            .collect();
        let results = svc.transform_all(requests, CancelToken::new()).await;
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert_eq!(
            results[1].as_ref().unwrap_err().kind(),
            ErrorKind::UnknownPlatform
        );
        assert_eq!(results[2].as_ref().unwrap().height, 1620);
    }

    #[tokio::test]
    async fn test_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(Arc::new(RawBackend::default()), 1);
        let err = svc
            .transform(
                TransformRequest::new(dir.path().join("gone.mp4"), "facebook"),
                CancelToken::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceUnreadable);
    }

    /// Panics on `bad.mp4`; takes its time on everything else.
    struct FlakyLoader;

    impl AssetLoader for FlakyLoader {
        fn load(&self, source: &Path) -> SpinoffResult<VideoAsset> {
            if source.ends_with("bad.mp4") {
                panic!("decoder crashed on {}", source.display());
            }
            std::thread::sleep(Duration::from_millis(300));
            SmallLoader.load(source)
        }
    }

    fn flaky_service(workers: usize) -> TransformService {
        TransformService::new(
            PipelineExecutor::with_builtin(Arc::new(FlakyLoader)),
            Arc::new(RawBackend::default()),
            None,
            workers,
        )
    }

    #[tokio::test]
    async fn test_panicking_request_spares_its_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let good = source(dir.path());
        let bad = dir.path().join("bad.mp4");
        std::fs::write(&bad, b"placeholder").unwrap();
        let svc = flaky_service(2);

        let cancel = CancelToken::new();
        let requests = vec![
            TransformRequest::new(&bad, "twitter"),
            TransformRequest::new(&good, "twitter"),
        ];
        let results = svc.transform_all(requests, cancel.clone()).await;

        assert_eq!(results[0].as_ref().unwrap_err().kind(), ErrorKind::Other);
        assert_eq!(results[1].as_ref().unwrap().width, 1280);
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_abandoned_batch_is_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path());
        let svc = flaky_service(1);

        let cancel = CancelToken::new();
        let requests = vec![
            TransformRequest::new(&src, "twitter"),
            TransformRequest::new(&src, "youtube"),
        ];
        let batch = svc.transform_all(requests, cancel.clone());
        assert!(tokio::time::timeout(Duration::from_millis(20), batch)
            .await
            .is_err());
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_cancel_on_drop() {
        let token = CancelToken::new();
        drop(CancelOnDrop::new(token.clone()));
        assert!(token.is_cancelled());

        let token = CancelToken::new();
        CancelOnDrop::new(token.clone()).disarm();
        assert!(!token.is_cancelled());
    }
}
