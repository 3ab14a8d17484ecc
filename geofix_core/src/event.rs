//! Notifications emitted by the state machine and the sink they go through.

use crate::error::{SensorErrorCode, SensorFailure};
use crate::reading::RawReading;
use crate::refine::RefinedLocation;
use crate::stabilizer::State;

/// Payload attached to a state change.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionData {
    None,
    /// Best estimate at the moment the machine became stable.
    Location(RawReading),
    /// Failure that drove the machine into ERROR.
    Failure(SensorFailure),
}

/// Everything the engine publishes. Closed set.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    StateChange {
        state: State,
        previous: State,
        data: TransitionData,
    },
    /// The best estimate changed (or a refresh was requested).
    LocationUpdate { location: RawReading },
    /// Emitted once per stabilization.
    LocationStable { location: RefinedLocation },
    Error {
        code: SensorErrorCode,
        message: String,
    },
}

impl Event {
    /// Short, stable name used in logs and JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StateChange { .. } => "state_change",
            Self::LocationUpdate { .. } => "location_update",
            Self::LocationStable { .. } => "location_stable",
            Self::Error { .. } => "error",
        }
    }
}

/// Receives engine events. Called synchronously from the engine's thread, so
/// implementations must not block.
pub trait Publisher {
    fn publish(&mut self, event: Event);
}

impl<T: Publisher + ?Sized> Publisher for Box<T> {
    fn publish(&mut self, event: Event) {
        (**self).publish(event);
    }
}

impl Publisher for crossbeam_channel::Sender<Event> {
    fn publish(&mut self, event: Event) {
        if self.send(event).is_err() {
            tracing::debug!("event receiver disconnected; dropping event");
        }
    }
}

/// Publisher backed by a closure.
pub struct FnPublisher<F>(pub F);

impl<F: FnMut(Event)> Publisher for FnPublisher<F> {
    fn publish(&mut self, event: Event) {
        (self.0)(event);
    }
}
