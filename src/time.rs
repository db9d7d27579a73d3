//! # Time Units
//!
//! Absolute positions and durations are measured in time units where a quarter
//! note is 64 units. Durations built from tuplets are not integral, so times are
//! `f64` and all comparisons go through the helpers below, which treat values
//! closer than [`TIME_TOLERANCE`] as equal.

/// Time position or duration, in units of 1/64 of a quarter note.
pub type TimeUnits = f64;

pub const TIME_WHOLE: TimeUnits = 256.0;
pub const TIME_HALF: TimeUnits = 128.0;
pub const TIME_QUARTER: TimeUnits = 64.0;
pub const TIME_EIGHTH: TimeUnits = 32.0;
pub const TIME_16TH: TimeUnits = 16.0;
pub const TIME_32ND: TimeUnits = 8.0;
pub const TIME_64TH: TimeUnits = 4.0;
pub const TIME_128TH: TimeUnits = 2.0;

/// Two times closer than this are the same time.
pub const TIME_TOLERANCE: TimeUnits = 0.001;

pub fn is_equal_time(a: TimeUnits, b: TimeUnits) -> bool {
    (a - b).abs() < TIME_TOLERANCE
}

pub fn is_lower_time(a: TimeUnits, b: TimeUnits) -> bool {
    a < b && !is_equal_time(a, b)
}

pub fn is_greater_time(a: TimeUnits, b: TimeUnits) -> bool {
    a > b && !is_equal_time(a, b)
}

/// Quantized key for grouping simultaneous positions.
pub fn time_key(t: TimeUnits) -> i64 {
    (t / TIME_TOLERANCE).round() as i64
}

/// Total order on times with tolerance.
pub fn compare_time(a: TimeUnits, b: TimeUnits) -> std::cmp::Ordering {
    if is_equal_time(a, b) {
        std::cmp::Ordering::Equal
    } else {
        a.total_cmp(&b)
    }
}
