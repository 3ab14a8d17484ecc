//! Deterministic replay of a recorded reading trace.
//!
//! The engine must have been built with (a clone of) `clock`. Time is moved
//! to each reading's timestamp relative to the first one, firing every timer
//! that falls due on the way, so the outcome depends only on the trace.

use geofix_traits::{ManualClock, PositionSource};

use crate::event::Publisher;
use crate::reading::RawReading;
use crate::refine::RefinedLocation;
use crate::stabilizer::{SessionId, Stabilizer, State};
use crate::util::non_negative_ms;

#[derive(Debug, Clone, PartialEq)]
pub struct ReplaySummary {
    pub session: SessionId,
    pub final_state: State,
    pub refined: Option<RefinedLocation>,
    pub accepted: usize,
    pub rejected: usize,
    pub stabilizations: usize,
    /// Engine time (ms since the first reading) when STABLE was first reached.
    pub stable_at_ms: Option<u64>,
    /// Engine time (ms since the first reading) when the replay ended.
    pub elapsed_ms: u64,
}

impl ReplaySummary {
    pub fn is_stable(&self) -> bool {
        self.final_state == State::Stable
    }
}

struct Cursor<'a> {
    clock: &'a ManualClock,
    base_ms: u64,
    stable_at_ms: Option<u64>,
}

impl Cursor<'_> {
    fn advance_to<S: PositionSource, P: Publisher>(&self, engine: &Stabilizer<S, P>, at_ms: u64) {
        let now = engine.now_ms();
        if at_ms > now {
            self.clock.advance_ms(at_ms - now);
        }
    }

    fn note<S: PositionSource, P: Publisher>(&mut self, engine: &Stabilizer<S, P>) {
        if self.stable_at_ms.is_none() && engine.state() == State::Stable {
            self.stable_at_ms = Some(engine.now_ms().saturating_sub(self.base_ms));
        }
    }

    /// Fire, in order, every timer due at or before `at_ms`.
    fn fire_until<S: PositionSource, P: Publisher>(
        &mut self,
        engine: &mut Stabilizer<S, P>,
        at_ms: u64,
    ) {
        while let Some(due) = engine.next_deadline_ms().filter(|d| *d <= at_ms) {
            self.advance_to(engine, due);
            engine.poll_timers();
            self.note(engine);
        }
    }
}

/// Start a fresh session on `engine` and feed it `readings` in order.
///
/// With `drain`, outstanding timers are fired after the last reading, as if
/// the sensor had gone quiet.
pub fn replay<S: PositionSource, P: Publisher>(
    engine: &mut Stabilizer<S, P>,
    readings: &[RawReading],
    clock: &ManualClock,
    drain: bool,
) -> ReplaySummary {
    let session = engine.start();
    let mut cur = Cursor {
        clock,
        base_ms: engine.now_ms(),
        stable_at_ms: None,
    };
    let t0 = readings.first().map_or(0, |r| r.timestamp_ms);

    for r in readings {
        let at = cur
            .base_ms
            .saturating_add(non_negative_ms(r.timestamp_ms.saturating_sub(t0)));
        cur.fire_until(engine, at);
        cur.advance_to(engine, at);
        engine.on_reading(session, *r);
        cur.note(engine);
    }
    if drain {
        cur.fire_until(engine, u64::MAX);
    }

    let stats = engine.stats();
    let summary = ReplaySummary {
        session,
        final_state: engine.state(),
        refined: engine.last_refined().copied(),
        accepted: stats.accepted,
        rejected: stats.rejected,
        stabilizations: stats.stabilizations,
        stable_at_ms: cur.stable_at_ms,
        elapsed_ms: engine.now_ms().saturating_sub(cur.base_ms),
    };
    tracing::info!(
        state = %summary.final_state,
        accepted = summary.accepted,
        rejected = summary.rejected,
        elapsed_ms = summary.elapsed_ms,
        "replay finished"
    );
    summary
}
