//! # Handedness Sensing Core Library
//!
//! This crate turns raw phone motion-sensor events into a running "which hand is
//! holding the device" label. It is a library first, so the same core can sit behind a
//! mobile foreground service, the bundled CLI (`main.rs`), or an offline replay tool.
//!
//! ## Data Flow
//!
//! ```text
//! SensorEvent ─► SampleClock ─► Sample ─► WindowedClassifier ─► Window
//!                (60 Hz commit)            (120 slots, stride 60)   │
//!                                                                    ▼
//!                     ClassificationResult ◄── ClassificationAdapter (worker)
//! ```
//!
//! ## Crate Structure
//!
//! - **`sensor`**: Event and sample types shared by every stage.
//! - **`clock`**: `SampleClock`, which rate-gates irregular multi-sensor events into a
//!   fixed-rate 6-channel sample stream with stale-value carry-forward.
//! - **`window`**: `RingBuffer` and `WindowedClassifier`, which emit overlapping
//!   chronological windows on a fixed stride.
//! - **`model`**: The `InferenceModel` shape contract and the `DenseModel` artifact.
//! - **`labels`**: Label order resolution from metadata with an explicit fallback.
//! - **`classifier`**: `ClassificationAdapter`, argmax and label mapping.
//! - **`pipeline`**: `HandednessPipeline`, which wires the stages together with a
//!   background inference worker, start/stop lifecycle and cancellation.
//! - **`source`**: The `SensorSource` capability plus mock and replay sources.
//! - **`session`**: Bounded sensing sessions with a max-duration watchdog.
//! - **`config`**: Figment-based `Settings` loading (TOML + environment).
//! - **`logging`**: `tracing-subscriber` initialisation.
//! - **`error`**: `HandednessError` and `LabelResolutionError`.
//! - **`validation`**: Helpers used by configuration validation.

pub mod classifier;
pub mod clock;
pub mod config;
pub mod error;
pub mod labels;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod sensor;
pub mod session;
pub mod source;
pub mod validation;
pub mod window;

// Re-export commonly used types
pub use classifier::{argmax, ClassificationAdapter, ClassificationResult};
pub use clock::SampleClock;
pub use config::Settings;
pub use error::{AppResult, HandednessError, LabelResolutionError};
pub use labels::{LabelSet, LabelSource};
pub use model::{DenseModel, InferenceModel};
pub use pipeline::{HandednessPipeline, IngestOutcome, PipelineOptions};
pub use sensor::{Sample, SensorEvent, SensorKind};
pub use window::{RingBuffer, Window, WindowedClassifier};
