//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;
use std::time::Duration;

/// Whole milliseconds in a duration, saturating at `u64::MAX`.
#[must_use]
pub fn duration_to_millis(duration: Duration) -> u64 {
    cast::<u128, u64>(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Round a f64 and clamp it to the i32 range, returning 0 for NaN values.
#[must_use]
pub fn round_f64_to_i32(value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    let min = cast::<i32, f64>(i32::MIN).unwrap_or(f64::MIN);
    let max = cast::<i32, f64>(i32::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(min, max).round();
    cast::<f64, i32>(clamped).unwrap_or(0)
}
