//! Classification adapter: model scores to labeled results.

use crate::error::{AppResult, HandednessError};
use crate::labels::{LabelSet, UNKNOWN_LABEL};
use crate::model::InferenceModel;
use crate::sensor::CHANNEL_COUNT;
use crate::window::Window;
use std::sync::Arc;
use tracing::{debug, warn};

/// One classified window.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    /// Sequence number of the window that produced this result.
    pub sequence: u64,
    /// Pipeline session generation. Zero when `classify` is called directly.
    pub generation: u64,
    /// Index of the highest score; `None` when the model returned no scores.
    pub best_index: Option<usize>,
    /// Label for `best_index`, or `"UNKNOWN"`.
    pub label: String,
    /// Raw scores in model output order. Not necessarily normalized.
    pub confidences: Vec<f32>,
}

/// Index of the first maximal score, or `None` for an empty slice.
///
/// The scan uses strict `>`, so ties go to the lowest index.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let first = scores.first()?;
    let mut best = (0, *first);
    for (i, &score) in scores.iter().enumerate().skip(1) {
        if score > best.1 {
            best = (i, score);
        }
    }
    Some(best.0)
}

/// Runs a model over windows and names the winning class.
#[derive(Clone)]
pub struct ClassificationAdapter {
    model: Arc<dyn InferenceModel>,
    labels: LabelSet,
}

impl ClassificationAdapter {
    /// Pair a model with its label order.
    ///
    /// Fails with [`HandednessError::Configuration`] if the model does not take
    /// `CHANNEL_COUNT` channels per row.
    pub fn new(model: Arc<dyn InferenceModel>, labels: LabelSet) -> AppResult<Self> {
        let (rows, channels) = model.input_shape();
        if channels != CHANNEL_COUNT {
            return Err(HandednessError::Configuration(format!(
                "model input is {rows}x{channels}, samples carry {CHANNEL_COUNT} channels"
            )));
        }
        if model.output_len() != labels.len() {
            warn!(
                outputs = model.output_len(),
                labels = labels.len(),
                "Model output count differs from label count; unmatched indices report UNKNOWN"
            );
        }
        Ok(Self { model, labels })
    }

    /// Rows per window the model expects.
    pub fn window_size(&self) -> usize {
        self.model.input_shape().0
    }

    /// The resolved label order.
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Classify one window.
    ///
    /// # Panics
    ///
    /// If the window shape differs from the model input shape. Windows built by
    /// [`WindowedClassifier`](crate::window::WindowedClassifier) with the model's window
    /// size always match.
    pub fn classify(&self, window: &Window) -> ClassificationResult {
        assert_eq!(
            window.shape(),
            self.model.input_shape(),
            "window shape does not match model input"
        );

        let confidences = self.model.infer(&window.to_flat());
        let best_index = argmax(&confidences);
        let label = match best_index {
            Some(index) => self.labels.label(index),
            None => UNKNOWN_LABEL,
        }
        .to_owned();
        debug!(
            sequence = window.sequence(),
            label = %label,
            scores = ?confidences,
            "Model output"
        );

        ClassificationResult {
            sequence: window.sequence(),
            generation: 0,
            best_index,
            label,
            confidences,
        }
    }
}

impl std::fmt::Debug for ClassificationAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationAdapter")
            .field("input_shape", &self.model.input_shape())
            .field("labels", &self.labels)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::LabelSource;

    /// Returns fixed scores regardless of input.
    struct FixedScores {
        rows: usize,
        scores: Vec<f32>,
    }

    impl InferenceModel for FixedScores {
        fn input_shape(&self) -> (usize, usize) {
            (self.rows, CHANNEL_COUNT)
        }

        fn output_len(&self) -> usize {
            self.scores.len()
        }

        fn infer(&self, input: &[f32]) -> Vec<f32> {
            assert_eq!(input.len(), self.rows * CHANNEL_COUNT);
            self.scores.clone()
        }
    }

    fn adapter(scores: Vec<f32>) -> ClassificationAdapter {
        ClassificationAdapter::new(
            Arc::new(FixedScores { rows: 2, scores }),
            LabelSet::fallback("test"),
        )
        .unwrap()
    }

    fn window() -> Window {
        Window::new(7, vec![[0.0; CHANNEL_COUNT]; 2])
    }

    #[test]
    fn test_argmax_ties_pick_first() {
        assert_eq!(argmax(&[0.5, 0.5, 0.2]), Some(0));
        assert_eq!(argmax(&[0.1, 0.7, 0.7]), Some(1));
        assert_eq!(argmax(&[0.1, 0.2, 0.9]), Some(2));
        assert_eq!(argmax(&[-3.0, -1.0, -2.0]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_classify_maps_label() {
        let result = adapter(vec![0.1, 0.2, 0.7]).classify(&window());
        assert_eq!(result.sequence, 7);
        assert_eq!(result.best_index, Some(2));
        assert_eq!(result.label, "RIGHT");
        assert_eq!(result.confidences, vec![0.1, 0.2, 0.7]);
    }

    #[test]
    fn test_classify_discovered_order() {
        let adapter = ClassificationAdapter::new(
            Arc::new(FixedScores {
                rows: 2,
                scores: vec![0.9, 0.05, 0.05],
            }),
            LabelSet::new(["LEFT", "RIGHT", "BOTH"], LabelSource::Metadata),
        )
        .unwrap();
        assert_eq!(adapter.classify(&window()).label, "LEFT");
    }

    #[test]
    fn test_out_of_range_index_is_unknown() {
        let result = adapter(vec![0.0, 0.1, 0.2, 0.9]).classify(&window());
        assert_eq!(result.best_index, Some(3));
        assert_eq!(result.label, "UNKNOWN");
    }

    #[test]
    fn test_empty_scores_are_unknown() {
        let result = adapter(Vec::new()).classify(&window());
        assert_eq!(result.best_index, None);
        assert_eq!(result.label, "UNKNOWN");
        assert!(result.confidences.is_empty());
    }

    /// Declares five channels per row.
    struct FiveChannels;

    impl InferenceModel for FiveChannels {
        fn input_shape(&self) -> (usize, usize) {
            (120, 5)
        }

        fn output_len(&self) -> usize {
            3
        }

        fn infer(&self, _input: &[f32]) -> Vec<f32> {
            vec![0.0; 3]
        }
    }

    #[test]
    fn test_channel_mismatch_is_configuration_error() {
        match ClassificationAdapter::new(Arc::new(FiveChannels), LabelSet::fallback("test")) {
            Err(HandednessError::Configuration(msg)) => assert!(msg.contains("120x5"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    #[should_panic(expected = "window shape does not match model input")]
    fn test_wrong_window_shape_panics() {
        adapter(vec![1.0, 0.0, 0.0]).classify(&Window::new(0, vec![[0.0; CHANNEL_COUNT]; 3]));
    }
}
