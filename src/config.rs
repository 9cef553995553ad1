//! Configuration loading using Figment.
//!
//! Settings are merged from:
//! 1. Built-in defaults (every field has one, so an empty file is valid)
//! 2. A TOML file (`config/handedness.toml` by default)
//! 3. Environment variables prefixed with `HANDEDNESS_`, nested with `__`
//!
//! # Example
//! ```no_run
//! use handedness_sense::config::Settings;
//!
//! // HANDEDNESS_SAMPLING__RATE_HZ=100 overrides [sampling] rate_hz
//! let settings = Settings::load()?;
//! settings.validate()?;
//! println!("window = {} samples", settings.window.size);
//! # Ok::<(), handedness_sense::error::HandednessError>(())
//! ```

use crate::clock::DEFAULT_RATE_HZ;
use crate::error::{AppResult, HandednessError};
use crate::validation::{
    is_in_range, is_valid_log_level, is_valid_path, is_valid_rate_hz, is_valid_window,
};
use crate::window::{DEFAULT_STRIDE, DEFAULT_WINDOW_SIZE};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/handedness.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "HANDEDNESS_";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Application settings
    pub application: ApplicationConfig,
    /// Commit clock settings
    pub sampling: SamplingConfig,
    /// Window and stride
    pub window: WindowConfig,
    /// Model artifact and label metadata
    pub model: ModelConfig,
    /// Inference dispatch settings
    pub pipeline: PipelineConfig,
    /// Session runner settings
    pub session: SessionConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Application name
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "handedness".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Commit clock configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Target commit rate in Hz
    pub rate_hz: f64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            rate_hz: DEFAULT_RATE_HZ,
        }
    }
}

/// Sliding window configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Samples per window
    pub size: usize,
    /// New samples between classifications
    pub stride: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_WINDOW_SIZE,
            stride: DEFAULT_STRIDE,
        }
    }
}

/// Model artifact locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the model artifact
    pub path: PathBuf,
    /// Path to the metadata JSON holding `label_classes`
    pub metadata_path: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("assets/imu_model.json"),
            metadata_path: PathBuf::from("assets/metadata.json"),
        }
    }
}

/// Inference dispatch configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Windows allowed queued or in flight before new ones are dropped
    pub max_pending_windows: usize,
    /// Capacity of the result channel
    pub result_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_pending_windows: 1,
            result_capacity: 16,
        }
    }
}

/// Session runner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Watchdog: stop a session after this long. Zero disables the watchdog.
    #[serde(with = "humantime_serde")]
    pub max_duration: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_duration: Duration::from_secs(10 * 60),
        }
    }
}

impl Settings {
    /// Load from [`DEFAULT_CONFIG_PATH`] and the environment.
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from a specific TOML file and the environment.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let settings = Self::figment(path.as_ref()).extract()?;
        Ok(settings)
    }

    /// The merged provider stack, for callers that want to add their own layers.
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate semantic constraints after loading.
    pub fn validate(&self) -> AppResult<()> {
        let invalid = |field: &str, msg: &str| {
            HandednessError::Configuration(format!("{field}: {msg}"))
        };

        is_valid_log_level(&self.application.log_level)
            .map_err(|e| invalid("application.log_level", e))?;
        is_valid_rate_hz(self.sampling.rate_hz).map_err(|e| invalid("sampling.rate_hz", e))?;
        is_valid_window(self.window.size, self.window.stride).map_err(|e| invalid("window", e))?;
        is_valid_path(&self.model.path.to_string_lossy()).map_err(|e| invalid("model.path", e))?;
        is_valid_path(&self.model.metadata_path.to_string_lossy())
            .map_err(|e| invalid("model.metadata_path", e))?;
        is_in_range(self.pipeline.max_pending_windows, 1..=64)
            .map_err(|e| invalid("pipeline.max_pending_windows", e))?;
        is_in_range(self.pipeline.result_capacity, 1..=4096)
            .map_err(|e| invalid("pipeline.result_capacity", e))?;
        Ok(())
    }
}
