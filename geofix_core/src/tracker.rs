//! Best-estimate tracking over the bounded history.

use crate::config::{AcceptanceCfg, EngineCfg};
use crate::error::Rejection;
use crate::history::History;
use crate::reading::{RawReading, ReadingValidator};

/// Acceptance regime for `is_better`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionMode {
    /// Responsive thresholds used during fast acquisition.
    Fast,
    /// Conservative thresholds used everywhere else.
    Stable,
}

/// Outcome of `BestEstimateTracker::ingest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ingest {
    pub accepted: bool,
    pub became_best: bool,
    /// Set when the reading was dropped by the validator.
    pub rejection: Option<Rejection>,
}

impl Ingest {
    fn rejected(why: Rejection) -> Self {
        Self {
            accepted: false,
            became_best: false,
            rejection: Some(why),
        }
    }
}

/// Whether `new` should replace `current` as the best estimate.
///
/// Never true when `new` is equal to or coarser than `current`.
pub fn is_better(
    new: &RawReading,
    current: Option<&RawReading>,
    mode: AcquisitionMode,
    cfg: &AcceptanceCfg,
) -> bool {
    let Some(current) = current else {
        return true;
    };
    if new.accuracy_m.is_nan() || new.accuracy_m >= current.accuracy_m {
        return false;
    }
    let improvement = current.accuracy_m - new.accuracy_m;
    let ratio = current.accuracy_m / new.accuracy_m;
    match mode {
        AcquisitionMode::Fast => improvement > cfg.improvement_fast_m || ratio > cfg.ratio_fast,
        AcquisitionMode::Stable => {
            improvement > cfg.improvement_stable_m
                || ratio > cfg.convergence_factor
                || improvement < cfg.similar_accuracy_m
        }
    }
}

/// Owns the session history and the best-so-far reading.
#[derive(Debug, Clone)]
pub struct BestEstimateTracker {
    validator: ReadingValidator,
    acceptance: AcceptanceCfg,
    history: History,
    best: Option<RawReading>,
}

impl BestEstimateTracker {
    pub fn new(cfg: &EngineCfg) -> Self {
        Self {
            validator: ReadingValidator::new(&cfg.accuracy),
            acceptance: cfg.acceptance.clone(),
            history: History::new(cfg.history_size),
            best: None,
        }
    }

    /// Validate, record and compare a reading against the current best.
    /// Invalid readings leave all state untouched.
    pub fn ingest(&mut self, reading: RawReading, mode: AcquisitionMode) -> Ingest {
        if let Err(why) = self.validator.check(&reading) {
            tracing::trace!(reason = %why, accuracy_m = reading.accuracy_m, "reading rejected");
            return Ingest::rejected(why);
        }
        self.history.push(reading);
        let became_best = is_better(&reading, self.best.as_ref(), mode, &self.acceptance);
        if became_best {
            self.best = Some(reading);
        }
        tracing::trace!(
            accuracy_m = reading.accuracy_m,
            became_best,
            history_len = self.history.len(),
            "reading tracked"
        );
        Ingest {
            accepted: true,
            became_best,
            rejection: None,
        }
    }

    /// Drop history and best estimate (session reset).
    pub fn reset(&mut self) {
        self.history.clear();
        self.best = None;
    }

    pub fn best(&self) -> Option<&RawReading> {
        self.best.as_ref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }
}
