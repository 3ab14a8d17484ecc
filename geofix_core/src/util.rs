//! Small formatting and time helpers for geofix_core.

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Render a coordinate with exactly `precision` decimals.
/// Non-finite values render as zero at the same precision.
pub fn format_coordinate(value: f64, precision: usize) -> String {
    let v = if value.is_finite() { value } else { 0.0 };
    format!("{v:.precision$}")
}

/// Convert a signed millisecond timestamp delta into an unsigned offset,
/// clamping negatives to zero.
#[inline]
pub fn non_negative_ms(delta: i64) -> u64 {
    u64::try_from(delta).unwrap_or(0)
}

/// Milliseconds to whole seconds, rounded to nearest.
#[inline]
pub fn ms_to_secs_rounded(ms: u64) -> u64 {
    ms.saturating_add(MILLIS_PER_SEC / 2) / MILLIS_PER_SEC
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_fixed_decimals() {
        assert_eq!(format_coordinate(-6.2, 6), "-6.200000");
        assert_eq!(format_coordinate(106.8000004, 6), "106.800000");
        assert_eq!(format_coordinate(1.23456, 2), "1.23");
    }

    #[test]
    fn non_finite_formats_as_zero() {
        assert_eq!(format_coordinate(f64::NAN, 6), "0.000000");
        assert_eq!(format_coordinate(f64::INFINITY, 3), "0.000");
    }

    #[test]
    fn negative_deltas_clamp() {
        assert_eq!(non_negative_ms(-5), 0);
        assert_eq!(non_negative_ms(1500), 1500);
        assert_eq!(ms_to_secs_rounded(1499), 1);
        assert_eq!(ms_to_secs_rounded(1500), 2);
    }
}
