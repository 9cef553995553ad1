//! Validators for configuration values.
//!
//! Each helper returns `Err(&'static str)` with a user-facing message, so callers can
//! attach the field name and wrap it in their own error type.

use std::ops::RangeInclusive;

/// Highest sampling rate accepted for the commit clock, in Hz.
pub const MAX_RATE_HZ: f64 = 10_000.0;

/// Validates a sampling rate: finite, positive, and no faster than [`MAX_RATE_HZ`].
///
/// # Returns
///
/// * `Ok(())` if the rate is usable.
/// * `Err(&'static str)` otherwise.
pub fn is_valid_rate_hz(rate_hz: f64) -> Result<(), &'static str> {
    if !rate_hz.is_finite() {
        return Err("Sampling rate must be a finite number");
    }
    if rate_hz <= 0.0 {
        return Err("Sampling rate must be greater than 0 Hz");
    }
    if rate_hz > MAX_RATE_HZ {
        return Err("Sampling rate must not exceed 10 kHz");
    }
    Ok(())
}

/// Validates a window/stride pair.
///
/// Both must be non-zero. A stride longer than the window is allowed (it skips samples
/// between windows) but a zero stride would never reset the trigger counter.
pub fn is_valid_window(size: usize, stride: usize) -> Result<(), &'static str> {
    if size == 0 {
        return Err("Window size must be greater than 0");
    }
    if stride == 0 {
        return Err("Window stride must be greater than 0");
    }
    Ok(())
}

/// Validates if a given value is within a specified numeric range.
pub fn is_in_range<T: PartialOrd>(value: T, range: RangeInclusive<T>) -> Result<(), &'static str> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err("Value is outside the specified range")
    }
}

/// Validates a file path string: non-empty, no NUL bytes.
pub fn is_valid_path(path: &str) -> Result<(), &'static str> {
    if path.is_empty() {
        return Err("File path cannot be empty");
    }
    if path.contains('\0') {
        return Err("File path cannot contain null bytes");
    }
    Ok(())
}

/// Validates a log level name.
pub fn is_valid_log_level(level: &str) -> Result<(), &'static str> {
    const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
    if LEVELS.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err("Log level must be one of: trace, debug, info, warn, error")
    }
}
