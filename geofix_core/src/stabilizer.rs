//! The stabilization state machine.
//!
//! `Stabilizer` is a single logical actor: every input (reading, sensor
//! error, timer fire, control call) runs to completion on `&mut self`.
//! Waiting is never done here; callers drive time through `poll_timers`
//! and `next_deadline_ms` (see `runner` and `replay`).

use std::sync::Arc;
use std::time::Instant;

use geofix_traits::{Clock, PositionSource};

use crate::config::EngineCfg;
use crate::consistency::ConsistencyEvaluator;
use crate::error::SensorFailure;
use crate::event::{Event, Publisher, TransitionData};
use crate::history::History;
use crate::reading::RawReading;
use crate::refine::{RefinedLocation, RefinementEngine};
use crate::sensor_error::map_source_error;
use crate::timer::{Deadline, TimerKind, Timers};
use crate::tracker::{AcquisitionMode, BestEstimateTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Idle,
    Starting,
    AcquiringFast,
    AcquiringStable,
    Stabilizing,
    Stable,
    Error,
}

impl State {
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Starting => "STARTING",
            Self::AcquiringFast => "ACQUIRING_FAST",
            Self::AcquiringStable => "ACQUIRING_STABLE",
            Self::Stabilizing => "STABILIZING",
            Self::Stable => "STABLE",
            Self::Error => "ERROR",
        }
    }

    /// States in which the sensor is being watched and readings matter.
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Idle | Self::Error)
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Generation counter bumped by every `start()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub accepted: usize,
    pub rejected: usize,
    /// Deliveries dropped because they carried another session's tag.
    pub stale: usize,
    pub stabilizations: usize,
}

pub struct Stabilizer<S: PositionSource, P: Publisher> {
    cfg: EngineCfg,
    source: S,
    publisher: P,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
    state: State,
    session: SessionId,
    watching: bool,
    tracker: BestEstimateTracker,
    consistency: ConsistencyEvaluator,
    refiner: RefinementEngine,
    timers: Timers,
    last_refined: Option<RefinedLocation>,
    stats: SessionStats,
}

impl<S: PositionSource, P: Publisher> std::fmt::Debug for Stabilizer<S, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stabilizer")
            .field("state", &self.state)
            .field("session", &self.session)
            .field("best_accuracy_m", &self.best().map(|b| b.accuracy_m))
            .field("history_len", &self.history().len())
            .field("timers", &self.timers.live_count())
            .finish()
    }
}

impl<S: PositionSource, P: Publisher> Stabilizer<S, P> {
    /// Construct an idle engine. Prefer `StabilizerBuilder`, which validates
    /// the configuration first.
    pub(crate) fn new(
        cfg: EngineCfg,
        source: S,
        publisher: P,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        let epoch = clock.now();
        Self {
            tracker: BestEstimateTracker::new(&cfg),
            consistency: ConsistencyEvaluator::new(cfg.consistency.clone()),
            refiner: RefinementEngine::new(cfg.refine.clone()),
            cfg,
            source,
            publisher,
            clock,
            epoch,
            state: State::Idle,
            session: SessionId::default(),
            watching: false,
            timers: Timers::new(),
            last_refined: None,
            stats: SessionStats::default(),
        }
    }

    /// Milliseconds on the engine clock since construction.
    pub fn now_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }

    /// Engine milliseconds of an instant taken from the engine clock.
    pub fn ms_at(&self, at: Instant) -> u64 {
        let dur = at.saturating_duration_since(self.epoch);
        u64::try_from(dur.as_millis()).unwrap_or(u64::MAX)
    }

    // ── Control ──────────────────────────────────────────────────────────────

    /// Begin a new session from any state. History, best estimate and all
    /// timers are discarded, and the source is asked to start watching.
    pub fn start(&mut self) -> SessionId {
        if self.watching {
            self.stop_source();
        }
        self.session = SessionId(self.session.0.wrapping_add(1));
        self.transition(State::Starting, TransitionData::None);
        self.session
    }

    /// Stop watching, cancel timers and return to IDLE. No-op when idle.
    pub fn pause(&mut self) {
        if self.state == State::Idle {
            return;
        }
        if self.watching {
            self.stop_source();
        }
        self.timers.cancel_all();
        self.transition(State::Idle, TransitionData::None);
    }

    /// Start a new session if idle.
    pub fn resume(&mut self) -> Option<SessionId> {
        (self.state == State::Idle).then(|| self.start())
    }

    /// Force-publish the current best estimate without touching state.
    pub fn request_refresh(&mut self) -> Option<RawReading> {
        let best = self.tracker.best().copied();
        if let Some(location) = best {
            self.publisher.publish(Event::LocationUpdate { location });
        }
        best
    }

    // ── Inputs ───────────────────────────────────────────────────────────────

    pub fn on_reading(&mut self, session: SessionId, reading: RawReading) {
        if session != self.session {
            self.stats.stale += 1;
            tracing::debug!(%session, current = %self.session, "stale reading dropped");
            return;
        }
        if !self.state.is_active() {
            tracing::trace!(state = %self.state, "reading ignored while inactive");
            return;
        }

        let mode = if self.state == State::AcquiringFast {
            AcquisitionMode::Fast
        } else {
            AcquisitionMode::Stable
        };
        let out = self.tracker.ingest(reading, mode);
        if !out.accepted {
            self.stats.rejected += 1;
            return;
        }
        self.stats.accepted += 1;
        if out.became_best {
            self.publisher.publish(Event::LocationUpdate { location: reading });
        }

        match self.state {
            State::Starting => {
                self.transition(State::AcquiringFast, TransitionData::None);
                self.evaluate();
            }
            State::AcquiringFast | State::AcquiringStable => self.evaluate(),
            State::Stabilizing if out.became_best => {
                self.transition(State::Stabilizing, TransitionData::None);
            }
            State::Stable if out.became_best => {
                self.transition(State::AcquiringStable, TransitionData::None);
            }
            _ => {}
        }
    }

    pub fn on_sensor_error(&mut self, session: SessionId, failure: SensorFailure) {
        if session != self.session {
            self.stats.stale += 1;
            tracing::debug!(%session, current = %self.session, "stale sensor error dropped");
            return;
        }
        if !self.state.is_active() {
            tracing::debug!(state = %self.state, error = %failure, "sensor error ignored while inactive");
            return;
        }
        self.fail(failure);
    }

    /// Apply a timer fire. Fires whose token is no longer live are dropped.
    pub fn on_timer(&mut self, fire: Deadline) {
        if !self.timers.is_live(&fire) {
            tracing::debug!(timer = fire.kind.name(), "stale timer fire dropped");
            return;
        }
        self.timers.cancel(fire.kind);
        match (fire.kind, self.state) {
            (TimerKind::FastAcquisition, State::AcquiringFast) => {
                self.transition(State::AcquiringStable, TransitionData::None);
            }
            (TimerKind::Stabilization, State::Stabilizing) => {
                let data = self
                    .tracker
                    .best()
                    .copied()
                    .map_or(TransitionData::None, TransitionData::Location);
                self.transition(State::Stable, data);
            }
            (kind, state) => {
                tracing::debug!(timer = kind.name(), %state, "timer fired in unrelated state");
            }
        }
    }

    /// Fire every timer due at the current clock time, earliest first.
    /// Returns how many fired.
    pub fn poll_timers(&mut self) -> usize {
        self.poll_timers_until(self.now_ms())
    }

    /// Fire every timer due at or before `at_ms`, earliest first. Timers due
    /// later stay armed even if the clock has already passed them.
    pub fn poll_timers_until(&mut self, at_ms: u64) -> usize {
        let mut fired = 0;
        while let Some(d) = self.timers.next_due().filter(|d| d.due_ms <= at_ms) {
            self.on_timer(d);
            fired += 1;
        }
        fired
    }

    /// Engine-clock deadline of the earliest live timer.
    pub fn next_deadline_ms(&self) -> Option<u64> {
        self.timers.next_due().map(|d| d.due_ms)
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn state(&self) -> State {
        self.state
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn best(&self) -> Option<&RawReading> {
        self.tracker.best()
    }

    pub fn history(&self) -> &History {
        self.tracker.history()
    }

    pub fn last_refined(&self) -> Option<&RefinedLocation> {
        self.last_refined.as_ref()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn cfg(&self) -> &EngineCfg {
        &self.cfg
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    // ── Internals ────────────────────────────────────────────────────────────

    /// Shared exit logic of the two acquiring states.
    fn evaluate(&mut self) {
        let Some(best) = self.tracker.best() else {
            return;
        };
        if best.accuracy_m > self.cfg.accuracy.min_accuracy_m {
            return;
        }
        let best = *best;
        let now = self.now_ms();
        if self.consistency.is_consistent(self.tracker.history(), now) {
            self.transition(State::Stable, TransitionData::Location(best));
        } else {
            self.transition(State::Stabilizing, TransitionData::None);
        }
    }

    fn fail(&mut self, failure: SensorFailure) {
        tracing::warn!(code = %failure.code, message = %failure.message, session = %self.session, "sensor failure");
        self.transition(State::Error, TransitionData::Failure(failure));
    }

    fn stop_source(&mut self) {
        self.watching = false;
        if let Err(e) = self.source.stop_watch() {
            tracing::warn!(error = %e, "stop_watch failed");
        }
    }

    fn transition(&mut self, next: State, data: TransitionData) {
        let previous = self.state;
        if previous == State::AcquiringFast && next != State::AcquiringFast {
            self.timers.cancel(TimerKind::FastAcquisition);
        }
        if previous == State::Stabilizing && next != State::Stabilizing {
            self.timers.cancel(TimerKind::Stabilization);
        }
        self.state = next;
        tracing::info!(from = %previous, to = %next, session = %self.session, "state transition");
        self.publisher.publish(Event::StateChange {
            state: next,
            previous,
            data: data.clone(),
        });

        match next {
            State::Idle => {}
            State::Starting => self.enter_starting(),
            State::AcquiringFast => {
                self.timers.arm(
                    TimerKind::FastAcquisition,
                    self.now_ms(),
                    self.cfg.timeouts.fast_acquisition_ms,
                );
            }
            State::AcquiringStable => {}
            State::Stabilizing => {
                self.timers.arm(
                    TimerKind::Stabilization,
                    self.now_ms(),
                    self.cfg.timeouts.best_location_ms,
                );
            }
            State::Stable => self.enter_stable(),
            State::Error => {
                self.timers.cancel_all();
                if let TransitionData::Failure(f) = data {
                    self.publisher.publish(Event::Error {
                        code: f.code,
                        message: f.message,
                    });
                }
            }
        }
    }

    fn enter_starting(&mut self) {
        self.tracker.reset();
        self.consistency.invalidate();
        self.timers.cancel_all();
        self.last_refined = None;
        self.stats = SessionStats::default();
        match self.source.start_watch(self.session.0) {
            Ok(()) => self.watching = true,
            Err(e) => {
                let failure = map_source_error(e.as_ref());
                self.fail(failure);
            }
        }
    }

    fn enter_stable(&mut self) {
        self.timers.cancel_all();
        let refined = self
            .refiner
            .compute(self.tracker.history(), self.tracker.best());
        self.stats.stabilizations += 1;
        tracing::info!(
            lat = refined.lat,
            lng = refined.lng,
            accuracy_m = refined.accuracy_m,
            fallback = refined.is_fallback(),
            "location stable"
        );
        self.last_refined = Some(refined);
        self.publisher
            .publish(Event::LocationStable { location: refined });
    }
}

impl<S: PositionSource, P: Publisher> Drop for Stabilizer<S, P> {
    fn drop(&mut self) {
        if self.watching {
            self.stop_source();
        }
    }
}
