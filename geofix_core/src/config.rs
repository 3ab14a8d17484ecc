//! Configuration types for the stabilization engine.
//!
//! These are the runtime configuration structs used by `Stabilizer`.
//! They are separate from the TOML-deserialized config in `geofix_config`.

use crate::error::BuildError;

/// Accuracy gates applied to every reading.
#[derive(Debug, Clone, PartialEq)]
pub struct AccuracyCfg {
    /// Accuracy (m) at or below which the best estimate may trigger stabilization.
    pub min_accuracy_m: f64,
    /// Readings coarser than this (m) are discarded as noise.
    pub max_reasonable_accuracy_m: f64,
}

impl Default for AccuracyCfg {
    fn default() -> Self {
        Self {
            min_accuracy_m: 25.0,
            max_reasonable_accuracy_m: 1000.0,
        }
    }
}

/// Thresholds deciding whether a new reading replaces the best estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptanceCfg {
    /// Fast mode: accept when the accuracy improves by more than this (m).
    pub improvement_fast_m: f64,
    /// Fast mode: accept when `current / new` exceeds this ratio.
    pub ratio_fast: f64,
    /// Stable mode: accept when the accuracy improves by more than this (m).
    pub improvement_stable_m: f64,
    /// Stable mode: accept when `current / new` exceeds this ratio.
    pub convergence_factor: f64,
    /// Stable mode: strict improvements smaller than this (m) are also accepted.
    pub similar_accuracy_m: f64,
}

impl Default for AcceptanceCfg {
    fn default() -> Self {
        Self {
            improvement_fast_m: 5.0,
            ratio_fast: 1.2,
            improvement_stable_m: 20.0,
            convergence_factor: 1.5,
            similar_accuracy_m: 10.0,
        }
    }
}

/// Clustering check over the most recent readings.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsistencyCfg {
    /// Number of most recent readings inspected (K).
    pub window: usize,
    /// Readings that must sit within `movement_threshold_m` of the centroid.
    pub min_positions: usize,
    pub movement_threshold_m: f64,
    /// Largest per-axis delta (degrees) for the equirectangular shortcut.
    pub fast_distance_max_deg: f64,
    /// Identical input within this many ms reuses the previous verdict.
    pub debounce_ms: u64,
}

impl Default for ConsistencyCfg {
    fn default() -> Self {
        Self {
            window: 5,
            min_positions: 3,
            movement_threshold_m: 10.0,
            fast_distance_max_deg: 0.1,
            debounce_ms: 1000,
        }
    }
}

/// Timer durations for the two acquisition phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeouts {
    pub fast_acquisition_ms: u64,
    pub best_location_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            fast_acquisition_ms: 3000,
            best_location_ms: 12_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefineCfg {
    /// Maximum number of most accurate readings blended into the estimate.
    pub top_n: usize,
    /// Decimal digits used when externalizing lat/lng.
    pub coordinate_precision: usize,
}

impl Default for RefineCfg {
    fn default() -> Self {
        Self {
            top_n: 7,
            coordinate_precision: 6,
        }
    }
}

/// Complete, immutable engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineCfg {
    pub accuracy: AccuracyCfg,
    pub acceptance: AcceptanceCfg,
    pub consistency: ConsistencyCfg,
    pub timeouts: Timeouts,
    pub refine: RefineCfg,
    /// Bound on retained readings.
    pub history_size: usize,
}

impl Default for EngineCfg {
    fn default() -> Self {
        Self {
            accuracy: AccuracyCfg::default(),
            acceptance: AcceptanceCfg::default(),
            consistency: ConsistencyCfg::default(),
            timeouts: Timeouts::default(),
            refine: RefineCfg::default(),
            history_size: 15,
        }
    }
}

impl EngineCfg {
    /// Reject values the engine cannot operate with.
    pub fn validate(&self) -> Result<(), BuildError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        let non_negative = |v: f64| v.is_finite() && v >= 0.0;

        if !positive(self.accuracy.min_accuracy_m) {
            return Err(BuildError::InvalidConfig("min_accuracy_m must be > 0"));
        }
        if !positive(self.accuracy.max_reasonable_accuracy_m) {
            return Err(BuildError::InvalidConfig(
                "max_reasonable_accuracy_m must be > 0",
            ));
        }
        if !non_negative(self.acceptance.improvement_fast_m)
            || !non_negative(self.acceptance.improvement_stable_m)
            || !non_negative(self.acceptance.similar_accuracy_m)
        {
            return Err(BuildError::InvalidConfig(
                "acceptance improvements must be >= 0",
            ));
        }
        if !(self.acceptance.ratio_fast.is_finite() && self.acceptance.ratio_fast >= 1.0)
            || !(self.acceptance.convergence_factor.is_finite()
                && self.acceptance.convergence_factor >= 1.0)
        {
            return Err(BuildError::InvalidConfig("acceptance ratios must be >= 1.0"));
        }
        if self.consistency.window == 0 || self.consistency.min_positions == 0 {
            return Err(BuildError::InvalidConfig(
                "consistency window and min_positions must be >= 1",
            ));
        }
        if self.consistency.min_positions > self.consistency.window {
            return Err(BuildError::InvalidConfig(
                "consistency min_positions must be <= window",
            ));
        }
        if !positive(self.consistency.movement_threshold_m) {
            return Err(BuildError::InvalidConfig("movement_threshold_m must be > 0"));
        }
        if !non_negative(self.consistency.fast_distance_max_deg) {
            return Err(BuildError::InvalidConfig(
                "fast_distance_max_deg must be >= 0",
            ));
        }
        if self.timeouts.fast_acquisition_ms == 0 || self.timeouts.best_location_ms == 0 {
            return Err(BuildError::InvalidConfig("timeouts must be >= 1 ms"));
        }
        if self.refine.top_n == 0 {
            return Err(BuildError::InvalidConfig("refine top_n must be >= 1"));
        }
        if self.history_size == 0 {
            return Err(BuildError::InvalidConfig("history_size must be >= 1"));
        }
        Ok(())
    }
}
