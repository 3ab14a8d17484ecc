#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Simulated GNSS receiver implementing `geofix_traits::PositionSource`.
//!
//! A background thread emits converging, jittered readings into a
//! `geofix_core::runner::ReadingSink`, tagged with the session passed to
//! `start_watch`. Each watch owns exactly one thread, stopped and joined by
//! `stop_watch` or on drop.

pub mod error;
pub mod trajectory;

use std::thread::JoinHandle;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crossbeam_channel as xch;
use geofix_core::error::{SensorErrorCode, SensorFailure};
use geofix_core::runner::ReadingSink;
use geofix_traits::{PositionSource, SourceError};

pub use error::SimError;
pub use trajectory::{SimParams, Trajectory, XorShift32};

struct Worker {
    /// Dropping the sender wakes and stops the thread.
    stop: Option<xch::Sender<()>>,
    join: Option<JoinHandle<u64>>,
}

impl Worker {
    /// Stop the thread and return how many readings it emitted.
    fn stop(mut self) -> u64 {
        self.stop.take();
        self.join
            .take()
            .and_then(|h| match h.join() {
                Ok(n) => Some(n),
                Err(e) => {
                    tracing::warn!(?e, "simulator thread panicked");
                    None
                }
            })
            .unwrap_or(0)
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop.take();
        if let Some(h) = self.join.take() {
            let _ = h.join();
        }
    }
}

pub struct SimulatedReceiver {
    params: SimParams,
    sink: ReadingSink,
    fail_start: Option<SensorErrorCode>,
    worker: Option<Worker>,
}

impl SimulatedReceiver {
    pub fn new(params: SimParams, sink: ReadingSink) -> error::Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            sink,
            fail_start: None,
            worker: None,
        })
    }

    /// Make every `start_watch` fail with `code`.
    pub fn fail_start_with(mut self, code: SensorErrorCode) -> Self {
        self.fail_start = Some(code);
        self
    }

    pub fn is_watching(&self) -> bool {
        self.worker.is_some()
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    fn spawn(&self, session: u64) -> error::Result<Worker> {
        let (stop_tx, stop_rx) = xch::bounded::<()>(0);
        let sink = self.sink.clone();
        let mut traj = Trajectory::new(self.params.clone());
        let interval = Duration::from_millis(self.params.interval_ms);
        let join = std::thread::Builder::new()
            .name(format!("geofix-sim-{session}"))
            .spawn(move || {
                loop {
                    let reading = traj.next_reading(wall_clock_ms());
                    if !sink.push(session, reading) {
                        tracing::debug!("engine gone, simulator exiting");
                        break;
                    }
                    tracing::trace!(session, accuracy_m = reading.accuracy_m, "simulated reading");
                    match stop_rx.recv_timeout(interval) {
                        Err(xch::RecvTimeoutError::Timeout) => {}
                        _ => break,
                    }
                }
                traj.emitted()
            })?;
        Ok(Worker {
            stop: Some(stop_tx),
            join: Some(join),
        })
    }
}

fn wall_clock_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

impl PositionSource for SimulatedReceiver {
    fn start_watch(&mut self, session: u64) -> Result<(), SourceError> {
        if let Some(w) = self.worker.take() {
            w.stop();
        }
        if let Some(code) = self.fail_start {
            return Err(Box::new(SimError::Refused(SensorFailure::new(
                code,
                "simulated receiver configured to fail",
            ))));
        }
        self.worker = Some(self.spawn(session)?);
        tracing::debug!(session, "simulated watch started");
        Ok(())
    }

    fn stop_watch(&mut self) -> Result<(), SourceError> {
        if let Some(w) = self.worker.take() {
            let emitted = w.stop();
            tracing::debug!(emitted, "simulated watch stopped");
        }
        Ok(())
    }
}
