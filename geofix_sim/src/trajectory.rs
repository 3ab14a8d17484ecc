//! Deterministic generator behind the simulated receiver.

use geofix_core::RawReading;

use crate::error::{Result, SimError};

const METERS_PER_DEG_LAT: f64 = 111_320.0;

/// Parameters of a simulated fix sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct SimParams {
    pub origin_lat: f64,
    pub origin_lng: f64,
    pub interval_ms: u64,
    pub start_accuracy_m: f64,
    pub floor_accuracy_m: f64,
    /// Accuracy multiplier applied per reading, in (0.0, 1.0].
    pub decay: f64,
    /// Maximum positional offset (m) from the origin.
    pub jitter_m: f64,
    /// Probability that a reading is deliberately unusable.
    pub invalid_rate: f64,
    pub seed: u32,
}

impl Default for SimParams {
    fn default() -> Self {
        (&geofix_config::SimulationCfg::default()).into()
    }
}

impl From<&geofix_config::SimulationCfg> for SimParams {
    fn from(c: &geofix_config::SimulationCfg) -> Self {
        Self {
            origin_lat: c.origin_lat,
            origin_lng: c.origin_lng,
            interval_ms: c.interval_ms,
            start_accuracy_m: c.start_accuracy_m,
            floor_accuracy_m: c.floor_accuracy_m,
            decay: c.decay,
            jitter_m: c.jitter_m,
            invalid_rate: c.invalid_rate,
            seed: c.seed,
        }
    }
}

impl SimParams {
    pub fn validate(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.origin_lat) || !(-180.0..=180.0).contains(&self.origin_lng)
        {
            return Err(SimError::InvalidParam("origin out of range"));
        }
        if self.interval_ms == 0 {
            return Err(SimError::InvalidParam("interval_ms must be >= 1"));
        }
        if !(self.floor_accuracy_m > 0.0 && self.start_accuracy_m >= self.floor_accuracy_m) {
            return Err(SimError::InvalidParam(
                "accuracies must satisfy 0 < floor <= start",
            ));
        }
        if !(self.decay > 0.0 && self.decay <= 1.0) {
            return Err(SimError::InvalidParam("decay must be in (0, 1]"));
        }
        if !(self.jitter_m >= 0.0 && self.jitter_m.is_finite()) {
            return Err(SimError::InvalidParam("jitter_m must be >= 0"));
        }
        if !(0.0..=1.0).contains(&self.invalid_rate) {
            return Err(SimError::InvalidParam("invalid_rate must be in [0, 1]"));
        }
        Ok(())
    }
}

/// Tiny xorshift32 PRNG; deterministic per seed.
#[derive(Debug, Clone)]
pub struct XorShift32(u32);

impl XorShift32 {
    pub fn new(seed: u32) -> Self {
        Self(seed.max(1))
    }

    /// Uniform in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        f64::from(x) / (f64::from(u32::MAX) + 1.0)
    }

    /// Uniform in [-1, 1).
    pub fn next_signed(&mut self) -> f64 {
        self.next_f64() * 2.0 - 1.0
    }
}

#[derive(Debug, Clone)]
pub struct Trajectory {
    params: SimParams,
    rng: XorShift32,
    accuracy_m: f64,
    emitted: u64,
}

impl Trajectory {
    pub fn new(params: SimParams) -> Self {
        Self {
            rng: XorShift32::new(params.seed),
            accuracy_m: params.start_accuracy_m,
            params,
            emitted: 0,
        }
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Produce the next reading stamped `timestamp_ms`.
    pub fn next_reading(&mut self, timestamp_ms: i64) -> RawReading {
        let p = &self.params;
        let dn = self.rng.next_signed() * p.jitter_m;
        let de = self.rng.next_signed() * p.jitter_m;
        let invalid = self.rng.next_f64() < p.invalid_rate;

        let lat = p.origin_lat + dn / METERS_PER_DEG_LAT;
        let cos_lat = p.origin_lat.to_radians().cos().max(1e-6);
        let lng = p.origin_lng + de / (METERS_PER_DEG_LAT * cos_lat);
        let accuracy_m = if invalid { 0.0 } else { self.accuracy_m };

        self.accuracy_m = (self.accuracy_m * p.decay).max(p.floor_accuracy_m);
        self.emitted += 1;
        RawReading::new(lat, lng, accuracy_m, timestamp_ms)
    }
}
