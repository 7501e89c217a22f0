use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable prefix, e.g. `VOICE_STUDIO__SERVICE__BASE_URL`
const ENV_PREFIX: &str = "VOICE_STUDIO";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub recording: RecordingConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Root URL of the voice service (no trailing slash required)
    pub base_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordingConfig {
    /// Hard cap on a single capture attempt
    pub max_duration_ms: u64,
    /// Pacing of the file-backed capture device
    pub chunk_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// JSON file holding the persisted session identifier
    pub path: PathBuf,
}

impl Config {
    /// Load configuration from an optional file plus environment overrides.
    ///
    /// Missing keys fall back to the built-in defaults, so an absent file is
    /// not an error.
    pub fn load(path: &str) -> Result<Self> {
        let settings = Self::with_defaults()?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("Failed to load config from {}", path))?;

        Ok(settings.try_deserialize()?)
    }

    fn with_defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let defaults = Config::default();
        let builder = config::Config::builder()
            .set_default("service.base_url", defaults.service.base_url)?
            .set_default(
                "service.request_timeout_secs",
                defaults.service.request_timeout_secs as i64,
            )?
            .set_default(
                "recording.max_duration_ms",
                defaults.recording.max_duration_ms as i64,
            )?
            .set_default("recording.chunk_ms", defaults.recording.chunk_ms as i64)?
            .set_default(
                "storage.path",
                defaults.storage.path.to_string_lossy().into_owned(),
            )?;
        Ok(builder)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                base_url: "http://127.0.0.1:5000".to_string(),
                request_timeout_secs: 120, // synthesis on CPU is slow
            },
            recording: RecordingConfig::default(),
            storage: StorageConfig {
                path: PathBuf::from(".voice-studio/session.json"),
            },
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            max_duration_ms: 15_000,
            chunk_ms: 100,
        }
    }
}

impl ServiceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl RecordingConfig {
    pub fn max_duration(&self) -> Duration {
        Duration::from_millis(self.max_duration_ms)
    }

    pub fn chunk_duration(&self) -> Duration {
        Duration::from_millis(self.chunk_ms.max(1))
    }
}
