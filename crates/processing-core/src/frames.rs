//! Lazy frame-source adapters.
//!
//! Each adapter wraps an upstream [`FrameSource`] and describes how its
//! frames are altered; no pixels are touched until a pass is opened.

use std::fmt;
use std::sync::Arc;

use spinoff_common::error::SpinoffResult;
use spinoff_media_model::asset::{Frame, FrameIter, FrameSource};

/// A per-frame pixel operation.
pub type FrameFn = Arc<dyn Fn(Frame) -> Frame + Send + Sync>;

/// Applies `op` to every frame.
pub struct MappedFrames {
    inner: Arc<dyn FrameSource>,
    label: String,
    op: FrameFn,
}

impl MappedFrames {
    pub fn new(inner: Arc<dyn FrameSource>, label: impl Into<String>, op: FrameFn) -> Self {
        Self {
            inner,
            label: label.into(),
            op,
        }
    }
}

impl fmt::Debug for MappedFrames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedFrames")
            .field("label", &self.label)
            .field("inner", &self.inner)
            .finish()
    }
}

impl FrameSource for MappedFrames {
    fn open(&self) -> SpinoffResult<FrameIter<'_>> {
        let op = Arc::clone(&self.op);
        Ok(Box::new(self.inner.open()?.map(move |frame| frame.map(|f| op(f)))))
    }
}

/// Stops after `limit` frames.
#[derive(Debug)]
pub struct TrimmedFrames {
    inner: Arc<dyn FrameSource>,
    limit: u64,
}

impl TrimmedFrames {
    pub fn new(inner: Arc<dyn FrameSource>, limit: u64) -> Self {
        Self { inner, limit }
    }
}

impl FrameSource for TrimmedFrames {
    fn open(&self) -> SpinoffResult<FrameIter<'_>> {
        Ok(Box::new(self.inner.open()?.take(self.limit as usize)))
    }
}

/// Resamples the stream in time: output frame `i` shows upstream frame
/// `floor(i * factor)`. Factors above 1 drop frames, below 1 repeat them.
/// When upstream runs short, the last frame is held.
#[derive(Debug)]
pub struct RetimedFrames {
    inner: Arc<dyn FrameSource>,
    factor: f64,
    count: u64,
}

impl RetimedFrames {
    pub fn new(inner: Arc<dyn FrameSource>, factor: f64, count: u64) -> Self {
        Self {
            inner,
            factor,
            count,
        }
    }
}

impl FrameSource for RetimedFrames {
    fn open(&self) -> SpinoffResult<FrameIter<'_>> {
        let mut upstream = self.inner.open()?;
        let factor = self.factor;
        let mut current: Option<Frame> = None;
        let mut position: i64 = -1;
        let mut exhausted = false;

        Ok(Box::new((0..self.count).map_while(move |i| {
            // Nudge so 10 * 1.1 lands on 11, not 10.999...
            let target = (i as f64 * factor + 1e-9).floor() as i64;
            while position < target && !exhausted {
                match upstream.next() {
                    Some(Ok(frame)) => {
                        current = Some(frame);
                        position += 1;
                    }
                    Some(Err(e)) => return Some(Err(e)),
                    None => exhausted = true,
                }
            }
            current.clone().map(|f| Ok(f.with_index(i)))
        })))
    }
}

/// Applies `op` only to frames whose position falls in `[start, end)`.
pub struct WindowedFrames {
    inner: Arc<dyn FrameSource>,
    start: u64,
    end: u64,
    label: String,
    op: FrameFn,
}

impl WindowedFrames {
    pub fn new(
        inner: Arc<dyn FrameSource>,
        start: u64,
        end: u64,
        label: impl Into<String>,
        op: FrameFn,
    ) -> Self {
        Self {
            inner,
            start,
            end,
            label: label.into(),
            op,
        }
    }
}

impl fmt::Debug for WindowedFrames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowedFrames")
            .field("label", &self.label)
            .field("start", &self.start)
            .field("end", &self.end)
            .field("inner", &self.inner)
            .finish()
    }
}

impl FrameSource for WindowedFrames {
    fn open(&self) -> SpinoffResult<FrameIter<'_>> {
        let op = Arc::clone(&self.op);
        let (start, end) = (self.start, self.end);
        Ok(Box::new(self.inner.open()?.enumerate().map(
            move |(pos, frame)| {
                let pos = pos as u64;
                frame.map(|f| if pos >= start && pos < end { op(f) } else { f })
            },
        )))
    }
}

/// After upstream ends, emits `extra` frames derived from its last frame.
pub struct AppendedFrames {
    inner: Arc<dyn FrameSource>,
    extra: u64,
    label: String,
    op: FrameFn,
}

impl AppendedFrames {
    pub fn new(
        inner: Arc<dyn FrameSource>,
        extra: u64,
        label: impl Into<String>,
        op: FrameFn,
    ) -> Self {
        Self {
            inner,
            extra,
            label: label.into(),
            op,
        }
    }
}

impl fmt::Debug for AppendedFrames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppendedFrames")
            .field("label", &self.label)
            .field("extra", &self.extra)
            .field("inner", &self.inner)
            .finish()
    }
}

impl FrameSource for AppendedFrames {
    fn open(&self) -> SpinoffResult<FrameIter<'_>> {
        let mut upstream = self.inner.open()?;
        let op = Arc::clone(&self.op);
        let extra = self.extra;
        let mut last: Option<Frame> = None;
        let mut emitted: u64 = 0;
        let mut tail_emitted: u64 = 0;
        let mut tail: Option<Frame> = None;

        Ok(Box::new(std::iter::from_fn(move || {
            if tail.is_none() {
                match upstream.next() {
                    Some(Ok(frame)) => {
                        let frame = frame.with_index(emitted);
                        emitted += 1;
                        last = Some(frame.clone());
                        return Some(Ok(frame));
                    }
                    Some(Err(e)) => return Some(Err(e)),
                    None => {
                        // Build the card once from the final frame.
                        tail = Some(op(last.take()?));
                    }
                }
            }
            if tail_emitted >= extra {
                return None;
            }
            let frame = tail.clone()?.with_index(emitted + tail_emitted);
            tail_emitted += 1;
            Some(Ok(frame))
        })))
    }
}

/// Emits `op` applied to the first `lead` upstream frames, then the whole
/// upstream stream again from the start.
pub struct PrependedFrames {
    inner: Arc<dyn FrameSource>,
    lead: u64,
    label: String,
    op: FrameFn,
}

impl PrependedFrames {
    pub fn new(
        inner: Arc<dyn FrameSource>,
        lead: u64,
        label: impl Into<String>,
        op: FrameFn,
    ) -> Self {
        Self {
            inner,
            lead,
            label: label.into(),
            op,
        }
    }
}

impl fmt::Debug for PrependedFrames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrependedFrames")
            .field("label", &self.label)
            .field("lead", &self.lead)
            .field("inner", &self.inner)
            .finish()
    }
}

impl FrameSource for PrependedFrames {
    fn open(&self) -> SpinoffResult<FrameIter<'_>> {
        let op = Arc::clone(&self.op);
        let intro = self
            .inner
            .open()?
            .take(self.lead as usize)
            .map(move |frame| frame.map(|f| op(f)));
        let main = self.inner.open()?;
        Ok(Box::new(
            intro
                .chain(main)
                .enumerate()
                .map(|(pos, frame)| frame.map(|f| f.with_index(pos as u64))),
        ))
    }
}
