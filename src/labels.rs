//! Label order resolution.
//!
//! The model's output channel `i` means whatever the training pipeline called class `i`.
//! That order ships next to the model in a metadata JSON file:
//!
//! ```json
//! { "label_classes": ["BOTH", "LEFT", "RIGHT"] }
//! ```
//!
//! [`resolve_labels`] reads it and reports failures as a [`LabelResolutionError`]. The
//! caller decides what to do on failure; [`LabelSet::resolve_or_default`] is the policy the
//! pipeline uses: fall back to [`DEFAULT_LABELS`] and log a warning.

use crate::error::LabelResolutionError;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Label order used when the metadata resource is missing or malformed.
pub const DEFAULT_LABELS: [&str; 3] = ["BOTH", "LEFT", "RIGHT"];

/// Label reported for an output index with no entry in the label set.
pub const UNKNOWN_LABEL: &str = "UNKNOWN";

/// Where a [`LabelSet`] came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelSource {
    /// Read from the metadata resource.
    Metadata,
    /// The built-in default order, with the reason resolution failed.
    Fallback(String),
}

impl fmt::Display for LabelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelSource::Metadata => write!(f, "metadata"),
            LabelSource::Fallback(reason) => write!(f, "fallback ({reason})"),
        }
    }
}

/// Ordered, immutable mapping from model output index to label.
///
/// Cloning is cheap; the labels themselves are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    labels: Arc<[String]>,
    source: LabelSource,
}

impl LabelSet {
    /// Build from explicit labels.
    pub fn new<I, S>(labels: I, source: LabelSource) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
            source,
        }
    }

    /// The built-in `["BOTH", "LEFT", "RIGHT"]` order.
    pub fn fallback(reason: impl Into<String>) -> Self {
        Self::new(DEFAULT_LABELS, LabelSource::Fallback(reason.into()))
    }

    /// Resolve from `path`, falling back to the default order on any failure.
    ///
    /// Never fails. The fallback is logged and visible through [`LabelSet::source`].
    pub fn resolve_or_default(path: &Path) -> Self {
        match resolve_labels(path) {
            Ok(labels) => {
                info!(path = %path.display(), labels = ?labels.as_slice(), "Loaded label order");
                labels
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    fallback = ?DEFAULT_LABELS,
                    "Failed to load label order from metadata, using fallback"
                );
                Self::fallback(err.to_string())
            }
        }
    }

    /// Label for `index`, or [`UNKNOWN_LABEL`] when out of range.
    pub fn label(&self, index: usize) -> &str {
        self.labels
            .get(index)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_LABEL)
    }

    /// Labels in output order.
    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True when there are no labels.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// How this set was resolved.
    pub fn source(&self) -> &LabelSource {
        &self.source
    }

    /// True if this set is the built-in default order.
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, LabelSource::Fallback(_))
    }
}

/// Read the `label_classes` array from a metadata JSON file.
pub fn resolve_labels(path: &Path) -> Result<LabelSet, LabelResolutionError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| LabelResolutionError::Unreadable(path.to_path_buf(), e))?;
    parse_labels(&text)
}

/// Parse the `label_classes` array from metadata JSON text.
pub fn parse_labels(text: &str) -> Result<LabelSet, LabelResolutionError> {
    let json: Value = serde_json::from_str(text)?;
    let classes = json
        .get("label_classes")
        .ok_or(LabelResolutionError::MissingField)?
        .as_array()
        .ok_or(LabelResolutionError::NotAStringArray)?;

    let labels = classes
        .iter()
        .map(|v| v.as_str().map(str::to_owned))
        .collect::<Option<Vec<_>>>()
        .ok_or(LabelResolutionError::NotAStringArray)?;

    if labels.is_empty() {
        return Err(LabelResolutionError::Empty);
    }
    Ok(LabelSet::new(labels, LabelSource::Metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use tracing_test::traced_test;

    fn metadata_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_discovered_order() {
        let labels = parse_labels(r#"{"label_classes": ["LEFT", "RIGHT", "BOTH"], "n": 3}"#)
            .unwrap();
        assert_eq!(labels.as_slice(), &["LEFT", "RIGHT", "BOTH"]);
        assert_eq!(labels.source(), &LabelSource::Metadata);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_labels("not json"),
            Err(LabelResolutionError::InvalidJson(_))
        ));
        assert!(matches!(
            parse_labels(r#"{"classes": []}"#),
            Err(LabelResolutionError::MissingField)
        ));
        assert!(matches!(
            parse_labels(r#"{"label_classes": "LEFT"}"#),
            Err(LabelResolutionError::NotAStringArray)
        ));
        assert!(matches!(
            parse_labels(r#"{"label_classes": ["LEFT", 2]}"#),
            Err(LabelResolutionError::NotAStringArray)
        ));
        assert!(matches!(
            parse_labels(r#"{"label_classes": []}"#),
            Err(LabelResolutionError::Empty)
        ));
    }

    #[test]
    fn test_resolve_from_file() {
        let file = metadata_file(r#"{"label_classes": ["RIGHT", "LEFT"]}"#);
        let labels = LabelSet::resolve_or_default(file.path());
        assert_eq!(labels.as_slice(), &["RIGHT", "LEFT"]);
        assert!(!labels.is_fallback());
    }

    #[test]
    #[traced_test]
    fn test_missing_metadata_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let labels = LabelSet::resolve_or_default(&dir.path().join("metadata.json"));
        assert_eq!(labels.as_slice(), &["BOTH", "LEFT", "RIGHT"]);
        assert!(labels.is_fallback());
        assert!(logs_contain("using fallback"));
    }

    #[test]
    fn test_malformed_metadata_falls_back() {
        let file = metadata_file(r#"{"label_classes": [1, 2, 3]}"#);
        let labels = LabelSet::resolve_or_default(file.path());
        assert_eq!(labels.as_slice(), &["BOTH", "LEFT", "RIGHT"]);
        match labels.source() {
            LabelSource::Fallback(reason) => assert!(reason.contains("array of strings")),
            other => panic!("unexpected source {other:?}"),
        }
    }

    #[test]
    fn test_unknown_label_out_of_range() {
        let labels = LabelSet::fallback("test");
        assert_eq!(labels.label(0), "BOTH");
        assert_eq!(labels.label(2), "RIGHT");
        assert_eq!(labels.label(3), UNKNOWN_LABEL);
    }
}
