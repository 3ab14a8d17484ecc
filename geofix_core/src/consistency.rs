//! Decides whether the most recent readings cluster tightly.

use crate::config::ConsistencyCfg;
use crate::geo::distance_m;
use crate::history::History;
use crate::reading::RawReading;

/// Pure clustering verdict over `recent` (already trimmed to the window).
///
/// Counts readings within `movement_threshold_m` of the arithmetic-mean
/// centroid and compares the count with `min_positions`.
pub fn evaluate(cfg: &ConsistencyCfg, recent: &[RawReading]) -> bool {
    if recent.is_empty() || recent.len() < cfg.min_positions {
        return false;
    }
    let n = recent.len() as f64;
    let (sum_lat, sum_lng) = recent
        .iter()
        .fold((0.0, 0.0), |(a, b), r| (a + r.lat, b + r.lng));
    let (c_lat, c_lng) = (sum_lat / n, sum_lng / n);

    let consistent = recent
        .iter()
        .filter(|r| {
            distance_m(c_lat, c_lng, r.lat, r.lng, cfg.fast_distance_max_deg)
                <= cfg.movement_threshold_m
        })
        .count();
    consistent >= cfg.min_positions
}

#[derive(Debug, Clone)]
struct Memo {
    key: Vec<[u64; 2]>,
    at_ms: u64,
    verdict: bool,
}

/// Clustering check with a short-lived memo keyed on the exact coordinates
/// of the inspected window.
#[derive(Debug, Clone)]
pub struct ConsistencyEvaluator {
    cfg: ConsistencyCfg,
    memo: Option<Memo>,
    window: Vec<RawReading>,
}

impl ConsistencyEvaluator {
    pub fn new(cfg: ConsistencyCfg) -> Self {
        let cap = cfg.window.max(1);
        Self {
            cfg,
            memo: None,
            window: Vec::with_capacity(cap),
        }
    }

    pub fn cfg(&self) -> &ConsistencyCfg {
        &self.cfg
    }

    /// Verdict for the last `window` entries of `history` at time `now_ms`.
    pub fn is_consistent(&mut self, history: &History, now_ms: u64) -> bool {
        if history.len() < self.cfg.min_positions {
            return false;
        }
        self.window.clear();
        self.window.extend(history.recent(self.cfg.window).copied());

        if let Some(m) = &self.memo
            && now_ms.saturating_sub(m.at_ms) < self.cfg.debounce_ms
            && key_matches(&m.key, &self.window)
        {
            tracing::trace!(verdict = m.verdict, "consistency memo hit");
            return m.verdict;
        }

        let verdict = evaluate(&self.cfg, &self.window);
        self.memo = Some(Memo {
            key: self.window.iter().map(|r| [r.lat.to_bits(), r.lng.to_bits()]).collect(),
            at_ms: now_ms,
            verdict,
        });
        tracing::trace!(verdict, samples = self.window.len(), "consistency evaluated");
        verdict
    }

    /// Forget the memo (session reset).
    pub fn invalidate(&mut self) {
        self.memo = None;
    }
}

fn key_matches(key: &[[u64; 2]], window: &[RawReading]) -> bool {
    key.len() == window.len()
        && key
            .iter()
            .zip(window)
            .all(|(k, r)| k[0] == r.lat.to_bits() && k[1] == r.lng.to_bits())
}
