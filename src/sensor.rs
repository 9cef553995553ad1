//! Sensor event and sample types.
//!
//! Raw events arrive from the platform tagged with the sensor that produced them. The
//! core only understands two channel groups, accelerometer and gyroscope, each carrying a
//! 3-axis vector. Committed samples concatenate both groups into one 6-channel row.

use serde::{Deserialize, Serialize};

/// Number of axes reported by a single motion sensor.
pub const AXES: usize = 3;

/// Number of channels in a committed sample (accelerometer xyz + gyroscope xyz).
pub const CHANNEL_COUNT: usize = 6;

const GROUP_COUNT: usize = 2;

/// One fixed-rate multi-channel row: `[ax, ay, az, gx, gy, gz]`.
pub type Sample = [f32; CHANNEL_COUNT];

/// Channel group that produced an event.
///
/// The declaration order is the channel order inside a [`Sample`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// Linear acceleration in m/s^2, channels 0..3.
    Accelerometer,
    /// Angular velocity in rad/s, channels 3..6.
    Gyroscope,
}

impl SensorKind {
    /// All channel groups in sample order.
    pub const ALL: [SensorKind; GROUP_COUNT] = [SensorKind::Accelerometer, SensorKind::Gyroscope];

    /// Offset of this group's first channel inside a [`Sample`].
    pub fn channel_offset(self) -> usize {
        match self {
            SensorKind::Accelerometer => 0,
            SensorKind::Gyroscope => AXES,
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// A raw sensor reading with its monotonic timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorEvent {
    /// Which sensor fired.
    pub kind: SensorKind,
    /// The 3-axis reading.
    pub values: [f32; AXES],
    /// Monotonic event time in nanoseconds.
    pub timestamp_ns: i64,
}

impl SensorEvent {
    /// Create an accelerometer event.
    pub fn accel(values: [f32; AXES], timestamp_ns: i64) -> Self {
        Self {
            kind: SensorKind::Accelerometer,
            values,
            timestamp_ns,
        }
    }

    /// Create a gyroscope event.
    pub fn gyro(values: [f32; AXES], timestamp_ns: i64) -> Self {
        Self {
            kind: SensorKind::Gyroscope,
            values,
            timestamp_ns,
        }
    }
}

/// Last-known reading for every channel group.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct LastKnown {
    values: [[f32; AXES]; GROUP_COUNT],
}

impl LastKnown {
    pub(crate) fn update(&mut self, kind: SensorKind, values: [f32; AXES]) {
        self.values[kind.slot()] = values;
    }

    pub(crate) fn to_sample(self) -> Sample {
        let mut sample = [0.0; CHANNEL_COUNT];
        for kind in SensorKind::ALL {
            let offset = kind.channel_offset();
            sample[offset..offset + AXES].copy_from_slice(&self.values[kind.slot()]);
        }
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_offsets_cover_sample() {
        assert_eq!(SensorKind::Accelerometer.channel_offset(), 0);
        assert_eq!(SensorKind::Gyroscope.channel_offset(), 3);
        assert_eq!(GROUP_COUNT * AXES, CHANNEL_COUNT);
    }

    #[test]
    fn test_last_known_concatenates_in_order() {
        let mut last = LastKnown::default();
        assert_eq!(last.to_sample(), [0.0; CHANNEL_COUNT]);

        last.update(SensorKind::Gyroscope, [4.0, 5.0, 6.0]);
        assert_eq!(last.to_sample(), [0.0, 0.0, 0.0, 4.0, 5.0, 6.0]);

        last.update(SensorKind::Accelerometer, [1.0, 2.0, 3.0]);
        assert_eq!(last.to_sample(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_event_json_shape() {
        let event = SensorEvent::gyro([0.5, -0.5, 1.0], 16_666_667);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"gyroscope\""));
        let back: SensorEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
