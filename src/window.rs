//! Sliding-window assembly over committed samples.
//!
//! [`RingBuffer`] stores the most recent `capacity` samples. [`WindowedClassifier`] wraps
//! it with a stride counter: once the buffer is full it emits one chronological
//! [`Window`] every `stride` samples. With the defaults (120-sample window, 60-sample
//! stride at 60 Hz) that is a 2 s window refreshed every second, 50% overlap.
//!
//! Windows are handed to the classification stage; this module never runs a model.
//!
//! # Example
//!
//! ```
//! use handedness_sense::window::WindowedClassifier;
//!
//! let mut windows = WindowedClassifier::new(4, 2);
//! let emitted: Vec<_> = (0..8)
//!     .filter_map(|i| windows.ingest([i as f32; 6]))
//!     .collect();
//!
//! // Full after 4 samples, then every 2 more.
//! assert_eq!(emitted.len(), 3);
//! assert_eq!(emitted[0].samples()[0][0], 0.0);
//! assert_eq!(emitted[2].samples()[3][0], 7.0);
//! ```

use crate::sensor::{Sample, CHANNEL_COUNT};

/// Default number of samples in a window (2 s at 60 Hz).
pub const DEFAULT_WINDOW_SIZE: usize = 120;

/// Default number of new samples between window emissions (1 s at 60 Hz).
pub const DEFAULT_STRIDE: usize = 60;

/// Fixed-capacity circular store of samples.
///
/// `write_pos` is the next slot to be overwritten, which is also the oldest live slot
/// once the buffer is full.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    slots: Box<[Sample]>,
    write_pos: usize,
    live_count: usize,
}

impl RingBuffer {
    /// Create an empty buffer. `capacity` must be non-zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be non-zero");
        Self {
            slots: vec![[0.0; CHANNEL_COUNT]; capacity].into_boxed_slice(),
            write_pos: 0,
            live_count: 0,
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots holding a sample written since the last clear.
    pub fn len(&self) -> usize {
        self.live_count
    }

    /// True when no sample has been written since the last clear.
    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    /// True when every slot holds a live sample.
    pub fn is_full(&self) -> bool {
        self.live_count == self.slots.len()
    }

    /// Index of the next slot to be written.
    pub fn write_pos(&self) -> usize {
        self.write_pos
    }

    /// Overwrite the oldest slot with `sample`.
    pub fn push(&mut self, sample: Sample) {
        self.slots[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.slots.len();
        if self.live_count < self.slots.len() {
            self.live_count += 1;
        }
    }

    /// Copy out all live samples, oldest first.
    pub fn snapshot(&self) -> Vec<Sample> {
        let capacity = self.slots.len();
        let start = if self.is_full() { self.write_pos } else { 0 };
        (0..self.live_count)
            .map(|i| self.slots[(start + i) % capacity])
            .collect()
    }

    /// Drop all samples and rewind to slot zero.
    pub fn clear(&mut self) {
        self.slots.fill([0.0; CHANNEL_COUNT]);
        self.write_pos = 0;
        self.live_count = 0;
    }
}

/// A chronological run of samples handed to the classifier as one model input.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    sequence: u64,
    samples: Vec<Sample>,
}

impl Window {
    /// Build a window directly from samples.
    pub fn new(sequence: u64, samples: Vec<Sample>) -> Self {
        Self { sequence, samples }
    }

    /// Monotonically increasing index of this window within its pipeline.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Samples, oldest first.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True for a window with no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// `(rows, channels)` of this window.
    pub fn shape(&self) -> (usize, usize) {
        (self.samples.len(), CHANNEL_COUNT)
    }

    /// Row-major `[rows * channels]` copy, the layout of a `[1, rows, channels]` tensor.
    pub fn to_flat(&self) -> Vec<f32> {
        self.samples.iter().flatten().copied().collect()
    }
}

/// Accumulates samples and emits overlapping windows on a fixed stride.
#[derive(Debug, Clone)]
pub struct WindowedClassifier {
    ring: RingBuffer,
    stride: usize,
    samples_since_trigger: usize,
    next_sequence: u64,
}

impl WindowedClassifier {
    /// Create with `window_size` slots, emitting every `stride` samples once full.
    pub fn new(window_size: usize, stride: usize) -> Self {
        assert!(stride > 0, "stride must be non-zero");
        Self {
            ring: RingBuffer::new(window_size),
            stride,
            samples_since_trigger: 0,
            next_sequence: 0,
        }
    }

    /// Samples per window.
    pub fn window_size(&self) -> usize {
        self.ring.capacity()
    }

    /// Samples between emissions.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Live samples currently buffered.
    pub fn live_count(&self) -> usize {
        self.ring.len()
    }

    /// Samples ingested since the last emission (or since reset).
    pub fn samples_since_trigger(&self) -> usize {
        self.samples_since_trigger
    }

    /// Sequence number the next emitted window will carry.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Add one sample; returns a window when the buffer is full and a stride has passed.
    pub fn ingest(&mut self, sample: Sample) -> Option<Window> {
        self.ring.push(sample);
        self.samples_since_trigger += 1;

        if !self.ring.is_full() || self.samples_since_trigger < self.stride {
            return None;
        }

        self.samples_since_trigger = 0;
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        Some(Window::new(sequence, self.ring.snapshot()))
    }

    /// Empty the buffer and the stride counter.
    ///
    /// The sequence counter keeps running so windows from different sessions of the same
    /// pipeline never share a sequence number.
    pub fn reset(&mut self) {
        self.ring.clear();
        self.samples_since_trigger = 0;
    }
}

impl Default for WindowedClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE, DEFAULT_STRIDE)
    }
}
