//! Custom error types for the application.
//!
//! This module defines the primary error type, `HandednessError`, for construction-time
//! failures across the crate. Using the `thiserror` crate, it provides a centralized and
//! consistent way to report problems that stop a pipeline from being built.
//!
//! ## Error Hierarchy
//!
//! - **`Config`**: Wraps errors from `figment`, typically file parsing or type mismatches
//!   in the configuration sources.
//! - **`Configuration`**: Semantic errors in values that parsed fine but make no sense
//!   (a zero stride, a stride larger than the window).
//! - **`Io`**: Wraps `std::io::Error` for artifact and replay file access.
//! - **`ModelLoad`** / **`ModelFormat`**: The model artifact is missing, unreadable, or its
//!   declared dimensions are inconsistent. These are fatal: no pipeline can be built.
//! - **`Session`**: The sensor source failed in a way the session runner cannot absorb.
//!
//! Metadata (label order) problems are deliberately *not* part of this enum. They have
//! their own [`LabelResolutionError`] so that the caller picks the fallback explicitly.
//!
//! Steady-state processing (per event, per window) never produces these errors; anomalies
//! there are traced and absorbed.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, HandednessError>;

#[derive(Error, Debug)]
pub enum HandednessError {
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Configuration validation error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to load model artifact {path:?}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    #[error("Model artifact is malformed: {0}")]
    ModelFormat(String),

    #[error("Session error: {0}")]
    Session(String),
}

impl From<figment::Error> for HandednessError {
    fn from(value: figment::Error) -> Self {
        HandednessError::Config(Box::new(value))
    }
}

/// Why a label order could not be read from the metadata resource.
#[derive(Error, Debug)]
pub enum LabelResolutionError {
    #[error("metadata resource {0:?} could not be read: {1}")]
    Unreadable(PathBuf, std::io::Error),

    #[error("metadata resource is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("metadata has no `label_classes` field")]
    MissingField,

    #[error("`label_classes` must be an array of strings")]
    NotAStringArray,

    #[error("`label_classes` is empty")]
    Empty,
}
