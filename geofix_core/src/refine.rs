//! Accuracy-weighted refinement of the final estimate.
//!
//! The refined location blends the most accurate readings of the session,
//! weighting each by `1 / accuracy_m`. Altitude, speed and heading are not
//! averaged; they come verbatim from the single most accurate reading.
//!
//! Degenerate input (no usable weights, non-finite blend) never errors and
//! resolves through a fixed fallback chain:
//! best reading in history → current best estimate → zero placeholder.

use crate::config::RefineCfg;
use crate::history::History;
use crate::reading::RawReading;
use crate::util::format_coordinate;
use std::cmp::Ordering;

/// Where a refined location came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefineSource {
    /// Weighted blend of this many readings.
    Weighted { samples: usize },
    /// Single most accurate reading in history.
    BestInHistory,
    /// The tracker's best estimate.
    BestEstimate,
    /// Nothing usable was available.
    Placeholder,
}

/// Final, publishable estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefinedLocation {
    pub lat: f64,
    pub lng: f64,
    /// Rounded to the nearest meter.
    pub accuracy_m: f64,
    pub altitude: Option<f64>,
    pub altitude_accuracy: Option<f64>,
    pub speed_mps: Option<f64>,
    pub heading_deg: Option<f64>,
    pub source: RefineSource,
}

/// A refined location with lat/lng rendered at a fixed precision, the form a
/// capture collaborator stamps on an artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalLocation {
    pub lat: String,
    pub lng: String,
    pub accuracy_m: f64,
    pub altitude: Option<f64>,
    pub altitude_accuracy: Option<f64>,
    pub speed_mps: Option<f64>,
    pub heading_deg: Option<f64>,
}

impl RefinedLocation {
    fn from_reading(r: &RawReading, source: RefineSource) -> Self {
        Self {
            lat: r.lat,
            lng: r.lng,
            accuracy_m: r.accuracy_m.round(),
            altitude: r.altitude,
            altitude_accuracy: r.altitude_accuracy,
            speed_mps: r.speed_mps,
            heading_deg: r.heading_deg,
            source,
        }
    }

    pub fn placeholder() -> Self {
        Self {
            lat: 0.0,
            lng: 0.0,
            accuracy_m: 0.0,
            altitude: None,
            altitude_accuracy: None,
            speed_mps: None,
            heading_deg: None,
            source: RefineSource::Placeholder,
        }
    }

    pub fn is_fallback(&self) -> bool {
        !matches!(self.source, RefineSource::Weighted { .. })
    }

    pub fn externalize(&self, precision: usize) -> ExternalLocation {
        ExternalLocation {
            lat: format_coordinate(self.lat, precision),
            lng: format_coordinate(self.lng, precision),
            accuracy_m: self.accuracy_m,
            altitude: self.altitude,
            altitude_accuracy: self.altitude_accuracy,
            speed_mps: self.speed_mps,
            heading_deg: self.heading_deg,
        }
    }
}

#[inline]
fn usable(r: &RawReading) -> bool {
    r.accuracy_m.is_finite() && r.accuracy_m > 0.0
}

/// Total order used for selection: usable accuracies first, then smaller
/// accuracy, then earlier timestamp, then history order.
fn rank(history: &[RawReading], a: usize, b: usize) -> Ordering {
    let (ra, rb) = (&history[a], &history[b]);
    usable(rb)
        .cmp(&usable(ra))
        .then_with(|| ra.accuracy_m.total_cmp(&rb.accuracy_m))
        .then_with(|| ra.timestamp_ms.cmp(&rb.timestamp_ms))
        .then_with(|| a.cmp(&b))
}

/// Compute the refined location from `history` (oldest first).
///
/// Pure: identical input yields identical output and nothing is mutated.
pub fn compute_refined(
    history: &[RawReading],
    best: Option<&RawReading>,
    top_n: usize,
) -> RefinedLocation {
    let n = top_n.max(1).min(history.len());
    let mut idx: Vec<usize> = (0..history.len()).collect();
    if idx.len() > n {
        idx.select_nth_unstable_by(n - 1, |&a, &b| rank(history, a, b));
        idx.truncate(n);
    }
    idx.sort_unstable_by(|&a, &b| rank(history, a, b));

    let mut w_sum = 0.0_f64;
    let (mut lat, mut lng, mut acc) = (0.0_f64, 0.0_f64, 0.0_f64);
    let mut samples = 0usize;
    for &i in &idx {
        let r = &history[i];
        if !usable(r) {
            continue;
        }
        let w = 1.0 / r.accuracy_m;
        lat += r.lat * w;
        lng += r.lng * w;
        acc += r.accuracy_m * w;
        w_sum += w;
        samples += 1;
    }

    if w_sum > 0.0 {
        let (lat, lng, acc) = (lat / w_sum, lng / w_sum, (acc / w_sum).round());
        if lat.is_finite() && lng.is_finite() && acc.is_finite() {
            // idx is sorted, so its first entry is the most accurate usable one.
            let lead = &history[idx[0]];
            return RefinedLocation {
                lat,
                lng,
                accuracy_m: acc,
                altitude: lead.altitude,
                altitude_accuracy: lead.altitude_accuracy,
                speed_mps: lead.speed_mps,
                heading_deg: lead.heading_deg,
                source: RefineSource::Weighted { samples },
            };
        }
    }

    fallback(history, best)
}

fn fallback(history: &[RawReading], best: Option<&RawReading>) -> RefinedLocation {
    let finite = |r: &RawReading| r.lat.is_finite() && r.lng.is_finite();
    let candidate = (0..history.len())
        .filter(|&i| finite(&history[i]) && usable(&history[i]))
        .min_by(|&a, &b| rank(history, a, b));
    if let Some(i) = candidate {
        tracing::debug!("refinement fell back to best reading in history");
        return RefinedLocation::from_reading(&history[i], RefineSource::BestInHistory);
    }
    if let Some(b) = best.filter(|b| finite(b)) {
        tracing::debug!("refinement fell back to best estimate");
        return RefinedLocation::from_reading(b, RefineSource::BestEstimate);
    }
    tracing::debug!("refinement fell back to placeholder");
    RefinedLocation::placeholder()
}

/// Stateless wrapper carrying the refinement tunables.
#[derive(Debug, Clone)]
pub struct RefinementEngine {
    cfg: RefineCfg,
}

impl RefinementEngine {
    pub fn new(cfg: RefineCfg) -> Self {
        Self { cfg }
    }

    pub fn cfg(&self) -> &RefineCfg {
        &self.cfg
    }

    pub fn compute(&self, history: &History, best: Option<&RawReading>) -> RefinedLocation {
        compute_refined(&history.to_vec(), best, self.cfg.top_n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_reading_passes_through() {
        let r = RawReading::new(-6.2, 106.8, 12.4, 5).with_altitude(30.0, Some(4.0));
        let out = compute_refined(&[r], None, 7);
        assert_eq!(out.lat, -6.2);
        assert_eq!(out.lng, 106.8);
        assert_eq!(out.accuracy_m, 12.0);
        assert_eq!(out.altitude, Some(30.0));
        assert_eq!(out.source, RefineSource::Weighted { samples: 1 });
    }

    #[test]
    fn empty_history_without_best_is_placeholder() {
        let out = compute_refined(&[], None, 7);
        assert_eq!(out, RefinedLocation::placeholder());
    }

    #[test]
    fn externalize_uses_precision() {
        let r = RawReading::new(-6.123456789, 106.8, 10.0, 0);
        let ext = compute_refined(&[r], None, 7).externalize(6);
        assert_eq!(ext.lat, "-6.123457");
        assert_eq!(ext.lng, "106.800000");
    }
}
