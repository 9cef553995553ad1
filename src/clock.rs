//! Fixed-rate sample clock.
//!
//! Motion sensors report on their own schedules: the accelerometer and gyroscope fire
//! independently, at best-effort rates, with jitter. [`SampleClock`] turns that irregular
//! stream into a uniform one by rate-gating commits on elapsed event time.
//!
//! Every event overwrites the last-known reading for its sensor. Whenever at least one
//! sampling interval has passed since the previous commit (or nothing has been committed
//! yet), the current last-known readings of *all* sensors are concatenated into a
//! [`Sample`]. A sensor that has not fired recently contributes its stale value; one that
//! has never fired contributes zeros.
//!
//! The clock is a pure synchronous transform: no I/O, no locking, no heap allocation.

use crate::sensor::{LastKnown, Sample, SensorEvent};

/// Default commit rate in Hz.
pub const DEFAULT_RATE_HZ: f64 = 60.0;

/// Sampling interval in nanoseconds for a target rate, `round(1e9 / rate_hz)`.
///
/// `rate_hz` must be positive and finite; configuration validation guarantees this for
/// clocks built from [`Settings`](crate::config::Settings).
pub fn sampling_interval_ns(rate_hz: f64) -> i64 {
    (1e9 / rate_hz).round() as i64
}

/// Rate-gates an irregular multi-sensor event stream into fixed-rate samples.
#[derive(Debug, Clone)]
pub struct SampleClock {
    interval_ns: i64,
    last: LastKnown,
    last_commit_ns: Option<i64>,
    commits: u64,
}

impl SampleClock {
    /// Create a clock committing at `rate_hz`.
    pub fn new(rate_hz: f64) -> Self {
        Self::with_interval_ns(sampling_interval_ns(rate_hz))
    }

    /// Create a clock with an explicit interval.
    pub fn with_interval_ns(interval_ns: i64) -> Self {
        Self {
            interval_ns,
            last: LastKnown::default(),
            last_commit_ns: None,
            commits: 0,
        }
    }

    /// Interval between commits in nanoseconds.
    pub fn interval_ns(&self) -> i64 {
        self.interval_ns
    }

    /// Number of samples committed since construction or the last [`reset`](Self::reset).
    pub fn commits(&self) -> u64 {
        self.commits
    }

    /// Record an event and commit a sample if the interval has elapsed.
    ///
    /// The first event after construction or reset always commits.
    pub fn observe(&mut self, event: &SensorEvent) -> Option<Sample> {
        self.last.update(event.kind, event.values);

        let now = event.timestamp_ns;
        let due = match self.last_commit_ns {
            None => true,
            Some(prev) => now.saturating_sub(prev) >= self.interval_ns,
        };
        if !due {
            return None;
        }

        self.last_commit_ns = Some(now);
        self.commits += 1;
        Some(self.last.to_sample())
    }

    /// Forget all readings and the commit time.
    pub fn reset(&mut self) {
        self.last = LastKnown::default();
        self.last_commit_ns = None;
        self.commits = 0;
    }
}

impl Default for SampleClock {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_HZ)
    }
}
