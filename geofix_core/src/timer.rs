//! Cancellable one-shot timers owned by the state machine.
//!
//! There is at most one live timer per `TimerKind`. Arming a kind cancels any
//! previous timer of that kind first. Every armed timer gets a fresh token, so
//! a fire notification carrying a cancelled token is recognised as stale.

/// Purpose of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Ends fast acquisition.
    FastAcquisition,
    /// Ends the stabilization window.
    Stabilization,
}

impl TimerKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::FastAcquisition => "fast_acquisition",
            Self::Stabilization => "stabilization",
        }
    }
}

/// Unique identity of one arming of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

/// A scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    pub kind: TimerKind,
    pub token: TimerToken,
    /// Engine milliseconds at which the timer fires.
    pub due_ms: u64,
}

#[derive(Debug, Default)]
pub struct Timers {
    fast: Option<Deadline>,
    stabilization: Option<Deadline>,
    next_token: u64,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, kind: TimerKind) -> &mut Option<Deadline> {
        match kind {
            TimerKind::FastAcquisition => &mut self.fast,
            TimerKind::Stabilization => &mut self.stabilization,
        }
    }

    /// Cancel any live timer of `kind`, then schedule a new one.
    pub fn arm(&mut self, kind: TimerKind, now_ms: u64, delay_ms: u64) -> Deadline {
        if let Some(prev) = self.cancel(kind) {
            tracing::debug!(timer = kind.name(), due_ms = prev.due_ms, "timer re-armed");
        }
        self.next_token = self.next_token.wrapping_add(1);
        let d = Deadline {
            kind,
            token: TimerToken(self.next_token),
            due_ms: now_ms.saturating_add(delay_ms),
        };
        *self.slot(kind) = Some(d);
        tracing::debug!(timer = kind.name(), due_ms = d.due_ms, "timer armed");
        d
    }

    pub fn cancel(&mut self, kind: TimerKind) -> Option<Deadline> {
        self.slot(kind).take()
    }

    pub fn cancel_all(&mut self) {
        self.fast = None;
        self.stabilization = None;
    }

    pub fn get(&self, kind: TimerKind) -> Option<Deadline> {
        match kind {
            TimerKind::FastAcquisition => self.fast,
            TimerKind::Stabilization => self.stabilization,
        }
    }

    /// True if `d` is still the live timer of its kind.
    pub fn is_live(&self, d: &Deadline) -> bool {
        self.get(d.kind).is_some_and(|live| live.token == d.token)
    }

    /// Earliest live timer; ties resolve by arming order.
    pub fn next_due(&self) -> Option<Deadline> {
        [self.fast, self.stabilization]
            .into_iter()
            .flatten()
            .min_by_key(|d| (d.due_ms, d.token))
    }

    pub fn live_count(&self) -> usize {
        usize::from(self.fast.is_some()) + usize::from(self.stabilization.is_some())
    }
}
