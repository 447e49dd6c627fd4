//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{SpinoffError, SpinoffResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory where spin-offs are written. `None` writes next to the source.
    pub output_dir: Option<PathBuf>,

    /// Worker pool sizing.
    pub workers: WorkerConfig,

    /// External codec tooling.
    pub encoder: EncoderDefaults,

    /// Source media checks applied before probing.
    pub validation: ValidationConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Worker pool parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Maximum transforms running at once (0 = number of CPU cores).
    pub max_concurrent_jobs: usize,
}

/// Codec binaries and encoder limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderDefaults {
    /// ffmpeg executable.
    pub ffmpeg_path: PathBuf,

    /// ffprobe executable.
    pub ffprobe_path: PathBuf,

    /// Upper bound on threads handed to a single encode.
    pub max_threads: usize,
}

/// Source media validation rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Accepted file extensions, lowercase, without the dot.
    pub allowed_extensions: Vec<String>,

    /// Maximum source size in megabytes.
    pub max_size_mb: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "spinoff=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            workers: WorkerConfig::default(),
            encoder: EncoderDefaults::default(),
            validation: ValidationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 0,
        }
    }
}

impl WorkerConfig {
    /// Effective pool size, resolving 0 to the number of available cores.
    pub fn resolved_jobs(&self) -> usize {
        if self.max_concurrent_jobs > 0 {
            self.max_concurrent_jobs
        } else {
            available_cores()
        }
    }
}

impl Default for EncoderDefaults {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            max_threads: 8,
        }
    }
}

impl EncoderDefaults {
    /// Threads for one encode: the core count, capped by `max_threads`.
    pub fn resolved_threads(&self) -> usize {
        available_cores().min(self.max_threads.max(1))
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: ["mp4", "mov", "mkv", "webm", "avi"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            max_size_mb: 2048,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &Path) -> Self {
        if !config_path.exists() {
            return Self::default();
        }
        match Self::try_load_from(config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{e}; using defaults");
                Self::default()
            }
        }
    }

    /// Load config from an explicit path that must exist and parse.
    pub fn try_load_from(config_path: &Path) -> SpinoffResult<Self> {
        let content = std::fs::read_to_string(config_path).map_err(|e| {
            SpinoffError::config(format!("cannot read {}: {e}", config_path.display()))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            SpinoffError::config(format!("cannot parse {}: {e}", config_path.display()))
        })
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, config_path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("spinoff").join("config.json")
}

fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
