pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Boundary error type for collaborator calls.
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// The positioning collaborator the engine asks to start and stop watching.
///
/// `start_watch` receives the engine's session generation; an implementation
/// must tag every reading and error it forwards with that value so the engine
/// can drop deliveries that belong to an earlier session.
pub trait PositionSource {
    fn start_watch(&mut self, session: u64) -> Result<(), SourceError>;
    fn stop_watch(&mut self) -> Result<(), SourceError>;
}

impl<T: PositionSource + ?Sized> PositionSource for Box<T> {
    fn start_watch(&mut self, session: u64) -> Result<(), SourceError> {
        (**self).start_watch(session)
    }

    fn stop_watch(&mut self) -> Result<(), SourceError> {
        (**self).stop_watch()
    }
}
