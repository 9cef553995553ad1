//! Sensor event sources.
//!
//! The pipeline does not control how sensors are sampled; it consumes whatever a
//! [`SensorSource`] yields. Two sources ship with the crate:
//!
//! - [`MockImu`] synthesizes accelerometer and gyroscope streams at independent,
//!   jittered rates, optionally paced in real time. Useful without hardware.
//! - [`ReplaySource`] reads recorded events from a JSON-lines file.
//!
//! Platform integrations implement the trait themselves.

use crate::sensor::{SensorEvent, SensorKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::time::{sleep_until, Duration, Instant};
use tracing::{debug, warn};

/// Capability: a stream of raw sensor events.
///
/// # Contract
/// - Events from one source arrive in non-decreasing timestamp order per sensor
/// - `Ok(None)` means the source is exhausted and will not produce more events
/// - Errors are unrecoverable for the current session
#[async_trait]
pub trait SensorSource: Send {
    /// Wait for the next event.
    async fn next_event(&mut self) -> Result<Option<SensorEvent>>;
}

// =============================================================================
// MockImu - Simulated accelerometer + gyroscope
// =============================================================================

/// Simulated IMU with two independent sensor clocks.
///
/// Defaults mimic a phone in "game" delay mode: accelerometer near 100 Hz, gyroscope
/// near 200 Hz, each with up to 20% timing jitter. The signal is a slow oscillation with
/// a small amount of noise.
///
/// # Example
///
/// ```
/// # tokio_test::block_on(async {
/// use handedness_sense::source::{MockImu, SensorSource};
///
/// let mut imu = MockImu::new(7).with_limit(10);
/// let mut count = 0;
/// while let Some(_event) = imu.next_event().await.unwrap() {
///     count += 1;
/// }
/// assert_eq!(count, 10);
/// # });
/// ```
pub struct MockImu {
    rng: StdRng,
    accel_period_ns: i64,
    gyro_period_ns: i64,
    jitter: f64,
    next_accel_ns: i64,
    next_gyro_ns: i64,
    emitted: u64,
    limit: Option<u64>,
    paced_from: Option<Instant>,
}

impl MockImu {
    /// Create an unpaced mock with a deterministic seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            accel_period_ns: 10_000_000,
            gyro_period_ns: 5_000_000,
            jitter: 0.2,
            next_accel_ns: 0,
            next_gyro_ns: 0,
            emitted: 0,
            limit: None,
            paced_from: None,
        }
    }

    /// Set the nominal accelerometer and gyroscope rates in Hz.
    pub fn with_rates(mut self, accel_hz: f64, gyro_hz: f64) -> Self {
        self.accel_period_ns = (1e9 / accel_hz).round() as i64;
        self.gyro_period_ns = (1e9 / gyro_hz).round() as i64;
        self
    }

    /// Set timing jitter as a fraction of the period, clamped to `0.0..=0.9`.
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 0.9);
        self
    }

    /// Stop after `count` events.
    pub fn with_limit(mut self, count: u64) -> Self {
        self.limit = Some(count);
        self
    }

    /// Deliver events in real time instead of as fast as possible.
    pub fn paced(mut self) -> Self {
        self.paced_from = Some(Instant::now());
        self
    }

    /// Events produced so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    fn jittered(&mut self, period_ns: i64) -> i64 {
        if self.jitter == 0.0 {
            return period_ns;
        }
        let factor = self.rng.gen_range(1.0 - self.jitter..=1.0 + self.jitter);
        ((period_ns as f64) * factor).round().max(1.0) as i64
    }

    fn reading(&mut self, kind: SensorKind, t_ns: i64) -> [f32; 3] {
        let t = t_ns as f64 / 1e9;
        let (amplitude, bias) = match kind {
            SensorKind::Accelerometer => (2.0, [0.0, 0.0, 9.81]),
            SensorKind::Gyroscope => (0.5, [0.0; 3]),
        };
        let mut out = [0.0f32; 3];
        for (axis, v) in out.iter_mut().enumerate() {
            let phase = axis as f64 * std::f64::consts::FRAC_PI_3;
            let noise: f64 = self.rng.gen_range(-0.05..0.05);
            *v = (bias[axis] + amplitude * (2.0 * t + phase).sin() + noise) as f32;
        }
        out
    }
}

#[async_trait]
impl SensorSource for MockImu {
    async fn next_event(&mut self) -> Result<Option<SensorEvent>> {
        if self.limit.is_some_and(|limit| self.emitted >= limit) {
            return Ok(None);
        }

        let kind = if self.next_accel_ns <= self.next_gyro_ns {
            SensorKind::Accelerometer
        } else {
            SensorKind::Gyroscope
        };
        let timestamp_ns = match kind {
            SensorKind::Accelerometer => {
                let t = self.next_accel_ns;
                self.next_accel_ns += self.jittered(self.accel_period_ns);
                t
            }
            SensorKind::Gyroscope => {
                let t = self.next_gyro_ns;
                self.next_gyro_ns += self.jittered(self.gyro_period_ns);
                t
            }
        };

        if let Some(start) = self.paced_from {
            sleep_until(start + Duration::from_nanos(timestamp_ns as u64)).await;
        }

        let values = self.reading(kind, timestamp_ns);
        self.emitted += 1;
        Ok(Some(SensorEvent {
            kind,
            values,
            timestamp_ns,
        }))
    }
}

// =============================================================================
// ReplaySource - Recorded events
// =============================================================================

/// Replays events from a JSON-lines file, one [`SensorEvent`] per line.
///
/// ```text
/// {"kind":"accelerometer","values":[0.1,0.2,9.8],"timestamp_ns":0}
/// {"kind":"gyroscope","values":[0.0,0.01,0.0],"timestamp_ns":4800000}
/// ```
///
/// Blank lines are ignored. Malformed lines are logged and skipped.
pub struct ReplaySource {
    lines: Lines<BufReader<File>>,
    line_no: usize,
    skipped: usize,
}

impl ReplaySource {
    /// Open a recording.
    pub async fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .await
            .with_context(|| format!("Failed to open replay file: {:?}", path))?;
        debug!(path = %path.display(), "Replay file opened");
        Ok(Self {
            lines: BufReader::new(file).lines(),
            line_no: 0,
            skipped: 0,
        })
    }

    /// Lines skipped as malformed so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

#[async_trait]
impl SensorSource for ReplaySource {
    async fn next_event(&mut self) -> Result<Option<SensorEvent>> {
        while let Some(line) = self
            .lines
            .next_line()
            .await
            .context("Failed to read replay file")?
        {
            self.line_no += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<SensorEvent>(line) {
                Ok(event) => return Ok(Some(event)),
                Err(e) => {
                    self.skipped += 1;
                    warn!(line = self.line_no, error = %e, "Skipping malformed replay line");
                }
            }
        }
        Ok(None)
    }
}
