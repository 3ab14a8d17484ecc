#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and trace parsing for the geofix engine.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//!   Every section is optional; missing values fall back to the engine's
//!   stock tunables.
//! - The trace CSV loader enforces known headers and returns rows in file
//!   order for deterministic replay.
use serde::Deserialize;
use std::io::Read;

/// Accuracy gates applied to every reading.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AccuracyCfg {
    /// Accuracy (m) at or below which a best estimate may trigger stabilization.
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

/// Tie-break parameters for replacing the best estimate.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AcceptanceCfg {
    pub improvement_fast_m: f64,
    pub ratio_fast: f64,
    pub improvement_stable_m: f64,
    pub convergence_factor: f64,
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

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ConsistencyCfg {
    /// Number of most recent readings inspected.
    pub window: usize,
    /// Minimum readings that must sit within the movement threshold.
    pub min_positions: usize,
    /// Clustering radius around the centroid (m).
    pub movement_threshold_m: f64,
    /// Largest coordinate delta (degrees) for the planar distance shortcut.
    pub fast_distance_max_deg: f64,
    /// Reuse a previous verdict for identical input within this window (ms).
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

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Timeouts {
    /// Time spent in fast acquisition before tightening acceptance (ms).
    pub fast_acquisition_ms: u64,
    /// Time a qualifying estimate is given to improve before it is accepted (ms).
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

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RefineCfg {
    /// Maximum number of most accurate readings blended into the final estimate.
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

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HistoryCfg {
    /// Bound on retained readings.
    pub size: usize,
}

impl Default for HistoryCfg {
    fn default() -> Self {
        Self { size: 15 }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// Parameters of the simulated receiver used by `geofix simulate`.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimulationCfg {
    pub origin_lat: f64,
    pub origin_lng: f64,
    /// Interval between emitted readings (ms).
    pub interval_ms: u64,
    pub start_accuracy_m: f64,
    pub floor_accuracy_m: f64,
    /// Geometric accuracy decay per reading, in (0.0, 1.0].
    pub decay: f64,
    /// Maximum positional jitter (m) around the origin.
    pub jitter_m: f64,
    /// Fraction of emitted readings that are deliberately invalid.
    pub invalid_rate: f64,
    pub seed: u32,
}

impl Default for SimulationCfg {
    fn default() -> Self {
        Self {
            origin_lat: -6.2,
            origin_lng: 106.8,
            interval_ms: 1000,
            start_accuracy_m: 200.0,
            floor_accuracy_m: 8.0,
            decay: 0.7,
            jitter_m: 3.0,
            invalid_rate: 0.0,
            seed: 7,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub accuracy: AccuracyCfg,
    pub acceptance: AcceptanceCfg,
    pub consistency: ConsistencyCfg,
    pub timeouts: Timeouts,
    pub refine: RefineCfg,
    pub history: HistoryCfg,
    pub logging: Logging,
    pub simulation: SimulationCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read and parse a TOML file. A missing file is an error; callers that want
/// stock settings should skip loading.
pub fn load_toml_file(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    load_toml(&text).map_err(|e| eyre::eyre!("invalid configuration in {:?}: {}", path, e))
}

fn positive_finite(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Accuracy
        if !positive_finite(self.accuracy.min_accuracy_m) {
            eyre::bail!("accuracy.min_accuracy_m must be > 0");
        }
        if !positive_finite(self.accuracy.max_reasonable_accuracy_m) {
            eyre::bail!("accuracy.max_reasonable_accuracy_m must be > 0");
        }
        if self.accuracy.min_accuracy_m > self.accuracy.max_reasonable_accuracy_m {
            eyre::bail!("accuracy.min_accuracy_m must be <= accuracy.max_reasonable_accuracy_m");
        }

        // Acceptance
        let a = &self.acceptance;
        if !(a.improvement_fast_m.is_finite() && a.improvement_fast_m >= 0.0) {
            eyre::bail!("acceptance.improvement_fast_m must be >= 0");
        }
        if !(a.improvement_stable_m.is_finite() && a.improvement_stable_m >= 0.0) {
            eyre::bail!("acceptance.improvement_stable_m must be >= 0");
        }
        if !(a.similar_accuracy_m.is_finite() && a.similar_accuracy_m >= 0.0) {
            eyre::bail!("acceptance.similar_accuracy_m must be >= 0");
        }
        if !(a.ratio_fast.is_finite() && a.ratio_fast >= 1.0) {
            eyre::bail!("acceptance.ratio_fast must be >= 1.0");
        }
        if !(a.convergence_factor.is_finite() && a.convergence_factor >= 1.0) {
            eyre::bail!("acceptance.convergence_factor must be >= 1.0");
        }

        // Consistency
        let c = &self.consistency;
        if c.window == 0 {
            eyre::bail!("consistency.window must be >= 1");
        }
        if c.min_positions == 0 {
            eyre::bail!("consistency.min_positions must be >= 1");
        }
        if c.min_positions > c.window {
            eyre::bail!("consistency.min_positions must be <= consistency.window");
        }
        if !positive_finite(c.movement_threshold_m) {
            eyre::bail!("consistency.movement_threshold_m must be > 0");
        }
        if !(c.fast_distance_max_deg.is_finite() && c.fast_distance_max_deg >= 0.0) {
            eyre::bail!("consistency.fast_distance_max_deg must be >= 0");
        }
        if c.debounce_ms > 60 * 1000 {
            eyre::bail!("consistency.debounce_ms is unreasonably large (>1min)");
        }

        // Timeouts
        if self.timeouts.fast_acquisition_ms == 0 {
            eyre::bail!("timeouts.fast_acquisition_ms must be >= 1");
        }
        if self.timeouts.best_location_ms == 0 {
            eyre::bail!("timeouts.best_location_ms must be >= 1");
        }
        if self.timeouts.best_location_ms > 10 * 60 * 1000 {
            eyre::bail!("timeouts.best_location_ms is unreasonably large (>10min)");
        }

        // Refine
        if self.refine.top_n == 0 {
            eyre::bail!("refine.top_n must be >= 1");
        }
        if self.refine.coordinate_precision > 15 {
            eyre::bail!("refine.coordinate_precision must be <= 15");
        }

        // History
        if self.history.size == 0 {
            eyre::bail!("history.size must be >= 1");
        }
        if self.history.size < self.consistency.window {
            eyre::bail!("history.size must be >= consistency.window");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        // Simulation
        let s = &self.simulation;
        if !(s.origin_lat.is_finite() && (-90.0..=90.0).contains(&s.origin_lat)) {
            eyre::bail!("simulation.origin_lat must be in [-90, 90]");
        }
        if !(s.origin_lng.is_finite() && (-180.0..=180.0).contains(&s.origin_lng)) {
            eyre::bail!("simulation.origin_lng must be in [-180, 180]");
        }
        if s.interval_ms == 0 {
            eyre::bail!("simulation.interval_ms must be >= 1");
        }
        if !positive_finite(s.start_accuracy_m) || !positive_finite(s.floor_accuracy_m) {
            eyre::bail!("simulation accuracies must be > 0");
        }
        if !(s.decay > 0.0 && s.decay <= 1.0) {
            eyre::bail!("simulation.decay must be in (0.0, 1.0]");
        }
        if !(s.jitter_m.is_finite() && s.jitter_m >= 0.0) {
            eyre::bail!("simulation.jitter_m must be >= 0");
        }
        if !(0.0..=1.0).contains(&s.invalid_rate) {
            eyre::bail!("simulation.invalid_rate must be in [0.0, 1.0]");
        }

        Ok(())
    }
}

/// One recorded reading in a replay trace.
///
/// Expected headers (optional columns may be omitted or left empty):
/// timestamp_ms,lat,lng,accuracy_m[,altitude,altitude_accuracy,speed_mps,heading_deg]
///
/// Example:
/// timestamp_ms,lat,lng,accuracy_m
/// 0,-6.2000012,106.8000031,180
/// 1000,-6.2000004,106.8000011,42
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct TraceRow {
    pub timestamp_ms: i64,
    pub lat: f64,
    pub lng: f64,
    pub accuracy_m: f64,
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub altitude_accuracy: Option<f64>,
    #[serde(default)]
    pub speed_mps: Option<f64>,
    #[serde(default)]
    pub heading_deg: Option<f64>,
}

const REQUIRED_TRACE_HEADERS: [&str; 4] = ["timestamp_ms", "lat", "lng", "accuracy_m"];
const OPTIONAL_TRACE_HEADERS: [&str; 4] =
    ["altitude", "altitude_accuracy", "speed_mps", "heading_deg"];

/// Parse a trace from any reader. Rows keep file order; timestamps must not
/// decrease.
pub fn load_trace_reader<R: Read>(input: R) -> eyre::Result<Vec<TraceRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read trace headers: {}", e))?
        .clone();
    let actual: Vec<&str> = headers.iter().collect();
    for required in REQUIRED_TRACE_HEADERS {
        if !actual.contains(&required) {
            eyre::bail!(
                "trace CSV must have headers 'timestamp_ms,lat,lng,accuracy_m', got: {}",
                actual.join(",")
            );
        }
    }
    if let Some(unknown) = actual
        .iter()
        .find(|h| !REQUIRED_TRACE_HEADERS.contains(h) && !OPTIONAL_TRACE_HEADERS.contains(h))
    {
        eyre::bail!("trace CSV has unknown column '{}'", unknown);
    }

    let mut rows: Vec<TraceRow> = Vec::new();
    for (idx, rec) in rdr.deserialize::<TraceRow>().enumerate() {
        match rec {
            Ok(row) => {
                if let Some(prev) = rows.last()
                    && row.timestamp_ms < prev.timestamp_ms
                {
                    eyre::bail!(
                        "trace timestamps must not decrease (row {}: {} < {})",
                        idx + 2,
                        row.timestamp_ms,
                        prev.timestamp_ms
                    );
                }
                rows.push(row);
            }
            Err(e) => {
                eyre::bail!("invalid trace row {}: {}", idx + 2, e);
            }
        }
    }
    Ok(rows)
}

pub fn load_trace_csv(path: &std::path::Path) -> eyre::Result<Vec<TraceRow>> {
    let file = std::fs::File::open(path)
        .map_err(|e| eyre::eyre!("open trace CSV {:?}: {}", path, e))?;
    load_trace_reader(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_stock_values() {
        let cfg = load_toml("").expect("empty config parses");
        assert_eq!(cfg.history.size, 15);
        assert_eq!(cfg.timeouts.best_location_ms, 12_000);
        assert!((cfg.acceptance.ratio_fast - 1.2).abs() < f64::EPSILON);
        cfg.validate().expect("stock config is valid");
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg = load_toml("[accuracy]\nmin_accuracy_m = 15.0\n").expect("parse");
        assert!((cfg.accuracy.min_accuracy_m - 15.0).abs() < f64::EPSILON);
        assert!((cfg.accuracy.max_reasonable_accuracy_m - 1000.0).abs() < f64::EPSILON);
    }
}
