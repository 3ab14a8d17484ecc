//! Raw positioning samples and the validator that gates them.

use crate::config::AccuracyCfg;
use crate::error::Rejection;

/// One timestamped position sample with an accuracy radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawReading {
    pub lat: f64,
    pub lng: f64,
    /// Radius (m) of the confidence circle; smaller is better.
    pub accuracy_m: f64,
    /// Sensor timestamp in milliseconds.
    pub timestamp_ms: i64,
    pub altitude: Option<f64>,
    pub altitude_accuracy: Option<f64>,
    pub speed_mps: Option<f64>,
    pub heading_deg: Option<f64>,
}

impl RawReading {
    /// A reading with only the positional fields populated.
    pub fn new(lat: f64, lng: f64, accuracy_m: f64, timestamp_ms: i64) -> Self {
        Self {
            lat,
            lng,
            accuracy_m,
            timestamp_ms,
            altitude: None,
            altitude_accuracy: None,
            speed_mps: None,
            heading_deg: None,
        }
    }

    pub fn with_altitude(mut self, altitude: f64, altitude_accuracy: Option<f64>) -> Self {
        self.altitude = Some(altitude);
        self.altitude_accuracy = altitude_accuracy;
        self
    }

    pub fn with_motion(mut self, speed_mps: Option<f64>, heading_deg: Option<f64>) -> Self {
        self.speed_mps = speed_mps;
        self.heading_deg = heading_deg;
        self
    }
}

/// Accepts or rejects raw samples before they reach the tracker.
#[derive(Debug, Clone)]
pub struct ReadingValidator {
    max_reasonable_accuracy_m: f64,
}

impl ReadingValidator {
    pub fn new(cfg: &AccuracyCfg) -> Self {
        Self {
            max_reasonable_accuracy_m: cfg.max_reasonable_accuracy_m,
        }
    }

    /// Check a reading; `Err` carries the first violated rule.
    pub fn check(&self, r: &RawReading) -> Result<(), Rejection> {
        if !r.lat.is_finite() || !r.lng.is_finite() {
            return Err(Rejection::NonFiniteCoordinate);
        }
        if !(-90.0..=90.0).contains(&r.lat) || !(-180.0..=180.0).contains(&r.lng) {
            return Err(Rejection::CoordinateOutOfRange);
        }
        if r.accuracy_m.is_nan() || r.accuracy_m <= 0.0 {
            return Err(Rejection::NonPositiveAccuracy);
        }
        if r.accuracy_m > self.max_reasonable_accuracy_m {
            return Err(Rejection::AccuracyTooCoarse);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn validator() -> ReadingValidator {
        ReadingValidator::new(&AccuracyCfg::default())
    }

    #[rstest]
    #[case(RawReading::new(f64::NAN, 106.8, 10.0, 0), Rejection::NonFiniteCoordinate)]
    #[case(RawReading::new(-6.2, f64::INFINITY, 10.0, 0), Rejection::NonFiniteCoordinate)]
    #[case(RawReading::new(91.0, 106.8, 10.0, 0), Rejection::CoordinateOutOfRange)]
    #[case(RawReading::new(-6.2, 106.8, 0.0, 0), Rejection::NonPositiveAccuracy)]
    #[case(RawReading::new(-6.2, 106.8, -5.0, 0), Rejection::NonPositiveAccuracy)]
    #[case(RawReading::new(-6.2, 106.8, f64::NAN, 0), Rejection::NonPositiveAccuracy)]
    #[case(RawReading::new(-6.2, 106.8, 1000.5, 0), Rejection::AccuracyTooCoarse)]
    fn rejects_invalid(#[case] r: RawReading, #[case] why: Rejection) {
        assert_eq!(validator().check(&r), Err(why));
    }

    #[rstest]
    #[case(RawReading::new(-6.2, 106.8, 0.5, 0))]
    #[case(RawReading::new(-6.2, 106.8, 1000.0, 0))]
    #[case(RawReading::new(90.0, -180.0, 25.0, 0))]
    fn accepts_valid(#[case] r: RawReading) {
        assert_eq!(validator().check(&r), Ok(()));
    }
}
