//! Test and helper mocks for geofix_core

use std::sync::{Arc, Mutex};

use geofix_traits::{PositionSource, SourceError};

use crate::event::{Event, Publisher};

/// A source that accepts every start/stop and remembers the calls; used when
/// readings are fed to the engine directly (tests, trace replay).
#[derive(Debug, Default, Clone)]
pub struct NoopSource {
    /// Session tags passed to `start_watch`, in call order.
    pub starts: Vec<u64>,
    pub stops: usize,
}

impl PositionSource for NoopSource {
    fn start_watch(&mut self, session: u64) -> Result<(), SourceError> {
        self.starts.push(session);
        Ok(())
    }

    fn stop_watch(&mut self) -> Result<(), SourceError> {
        self.stops += 1;
        Ok(())
    }
}

/// A source whose `start_watch` always fails with the given I/O kind.
#[derive(Debug, Clone, Copy)]
pub struct FailingSource(pub std::io::ErrorKind);

impl PositionSource for FailingSource {
    fn start_watch(&mut self, _session: u64) -> Result<(), SourceError> {
        Err(Box::new(std::io::Error::new(
            self.0,
            "position source refused to start",
        )))
    }

    fn stop_watch(&mut self) -> Result<(), SourceError> {
        Ok(())
    }
}

/// Publisher that records every event; clones share the same log.
#[derive(Debug, Default, Clone)]
pub struct RecordingPublisher {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Event kinds in publish order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events().iter().map(Event::kind).collect()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.kinds().into_iter().filter(|k| *k == kind).count()
    }

    pub fn clear(&self) {
        if let Ok(mut e) = self.events.lock() {
            e.clear();
        }
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&mut self, event: Event) {
        if let Ok(mut e) = self.events.lock() {
            e.push(event);
        }
    }
}
