//! `From` implementations bridging `geofix_config` types to `geofix_core` types.

use crate::config::{AcceptanceCfg, AccuracyCfg, ConsistencyCfg, EngineCfg, RefineCfg, Timeouts};
use crate::reading::RawReading;

// ── AccuracyCfg ──────────────────────────────────────────────────────────────

impl From<&geofix_config::AccuracyCfg> for AccuracyCfg {
    fn from(c: &geofix_config::AccuracyCfg) -> Self {
        Self {
            min_accuracy_m: c.min_accuracy_m,
            max_reasonable_accuracy_m: c.max_reasonable_accuracy_m,
        }
    }
}

// ── AcceptanceCfg ────────────────────────────────────────────────────────────

impl From<&geofix_config::AcceptanceCfg> for AcceptanceCfg {
    fn from(c: &geofix_config::AcceptanceCfg) -> Self {
        Self {
            improvement_fast_m: c.improvement_fast_m,
            ratio_fast: c.ratio_fast,
            improvement_stable_m: c.improvement_stable_m,
            convergence_factor: c.convergence_factor,
            similar_accuracy_m: c.similar_accuracy_m,
        }
    }
}

// ── ConsistencyCfg ───────────────────────────────────────────────────────────

impl From<&geofix_config::ConsistencyCfg> for ConsistencyCfg {
    fn from(c: &geofix_config::ConsistencyCfg) -> Self {
        Self {
            window: c.window,
            min_positions: c.min_positions,
            movement_threshold_m: c.movement_threshold_m,
            fast_distance_max_deg: c.fast_distance_max_deg,
            debounce_ms: c.debounce_ms,
        }
    }
}

// ── Timeouts ─────────────────────────────────────────────────────────────────

impl From<&geofix_config::Timeouts> for Timeouts {
    fn from(c: &geofix_config::Timeouts) -> Self {
        Self {
            fast_acquisition_ms: c.fast_acquisition_ms,
            best_location_ms: c.best_location_ms,
        }
    }
}

// ── RefineCfg ────────────────────────────────────────────────────────────────

impl From<&geofix_config::RefineCfg> for RefineCfg {
    fn from(c: &geofix_config::RefineCfg) -> Self {
        Self {
            top_n: c.top_n,
            coordinate_precision: c.coordinate_precision,
        }
    }
}

// ── EngineCfg ────────────────────────────────────────────────────────────────

impl From<&geofix_config::Config> for EngineCfg {
    fn from(c: &geofix_config::Config) -> Self {
        Self {
            accuracy: (&c.accuracy).into(),
            acceptance: (&c.acceptance).into(),
            consistency: (&c.consistency).into(),
            timeouts: (&c.timeouts).into(),
            refine: (&c.refine).into(),
            history_size: c.history.size,
        }
    }
}

// ── Trace rows ───────────────────────────────────────────────────────────────

impl From<&geofix_config::TraceRow> for RawReading {
    fn from(r: &geofix_config::TraceRow) -> Self {
        Self {
            lat: r.lat,
            lng: r.lng,
            accuracy_m: r.accuracy_m,
            timestamp_ms: r.timestamp_ms,
            altitude: r.altitude,
            altitude_accuracy: r.altitude_accuracy,
            speed_mps: r.speed_mps,
            heading_deg: r.heading_deg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_file_config_matches_default_engine_config() {
        let from_file = EngineCfg::from(&geofix_config::Config::default());
        assert_eq!(from_file, EngineCfg::default());
    }

    #[test]
    fn overrides_flow_through() {
        let cfg = geofix_config::load_toml(
            "[timeouts]\nbest_location_ms = 500\n[history]\nsize = 4\n",
        )
        .unwrap();
        let e = EngineCfg::from(&cfg);
        assert_eq!(e.timeouts.best_location_ms, 500);
        assert_eq!(e.timeouts.fast_acquisition_ms, 3000);
        assert_eq!(e.history_size, 4);
    }
}
