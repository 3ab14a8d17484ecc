//! Threaded actor wrapper around `Stabilizer`.
//!
//! All inputs (sensor deliveries and control calls) travel through one
//! single-consumer channel, stamped with the engine clock when they are
//! enqueued. The actor thread waits with `recv_timeout` until the next timer
//! deadline. Before an input is dispatched, only the timers due at or before
//! its stamp fire, so readings and timer fires interleave by arrival order
//! even when the queue backs up.
//!
//! Each `ActorHandle` owns exactly one thread; dropping the handle stops
//! acquisition and joins it.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel as xch;
use geofix_traits::{Clock, MonotonicClock, PositionSource};

use crate::error::{GeofixError, Result, SensorFailure};
use crate::event::Publisher;
use crate::reading::RawReading;
use crate::stabilizer::{SessionId, Stabilizer};

/// Messages accepted by the actor.
#[derive(Debug, Clone)]
pub enum Input {
    Reading { session: u64, reading: RawReading },
    SensorError { session: u64, failure: SensorFailure },
    Start,
    Pause,
    Resume,
    Refresh,
    /// Re-check due timers; lets a manually driven clock take effect.
    Tick,
    Shutdown,
}

/// An input together with the clock instant it was enqueued at.
#[derive(Debug, Clone)]
pub struct Stamped {
    pub at: Instant,
    pub input: Input,
}

/// Create the engine's inbox on the real-time clock: the producer handle for
/// collaborators and the receiver consumed by `Actor::spawn`.
pub fn inbox() -> (ReadingSink, xch::Receiver<Stamped>) {
    inbox_with_clock(Arc::new(MonotonicClock::new()))
}

/// Like `inbox`, stamping with `clock`. It must be the clock the engine
/// runs on (for a `ManualClock`, a clone of the engine's handle).
pub fn inbox_with_clock(
    clock: Arc<dyn Clock + Send + Sync>,
) -> (ReadingSink, xch::Receiver<Stamped>) {
    let (tx, rx) = xch::unbounded();
    (ReadingSink { tx, clock }, rx)
}

/// Cloneable producer handle handed to position sources.
#[derive(Clone)]
pub struct ReadingSink {
    tx: xch::Sender<Stamped>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl std::fmt::Debug for ReadingSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadingSink")
            .field("queued", &self.tx.len())
            .finish_non_exhaustive()
    }
}

impl ReadingSink {
    /// Deliver a reading tagged with its session. Returns false once the
    /// actor is gone.
    pub fn push(&self, session: u64, reading: RawReading) -> bool {
        self.send(Input::Reading { session, reading }).is_ok()
    }

    pub fn fail(&self, session: u64, failure: SensorFailure) -> bool {
        self.send(Input::SensorError { session, failure }).is_ok()
    }

    fn control(&self, input: Input) -> Result<()> {
        self.send(input)
            .map_err(|_| eyre::Report::new(GeofixError::Disconnected))
    }

    fn send(&self, input: Input) -> std::result::Result<(), xch::SendError<Stamped>> {
        self.tx.send(Stamped {
            at: self.clock.now(),
            input,
        })
    }
}

pub struct Actor;

impl Actor {
    /// Run `engine` on its own thread, consuming `inbox`. The engine is
    /// started immediately when `autostart` is set.
    pub fn spawn<S, P>(
        engine: Stabilizer<S, P>,
        sink: &ReadingSink,
        inbox: xch::Receiver<Stamped>,
        autostart: bool,
    ) -> Result<ActorHandle<S, P>>
    where
        S: PositionSource + Send + 'static,
        P: Publisher + Send + 'static,
    {
        let join = std::thread::Builder::new()
            .name("geofix-actor".into())
            .spawn(move || run_loop(engine, &inbox, autostart))
            .map_err(|e| eyre::Report::new(GeofixError::State(format!("spawn failed: {e}"))))?;
        Ok(ActorHandle {
            sink: sink.clone(),
            join: Some(join),
        })
    }
}

fn run_loop<S: PositionSource, P: Publisher>(
    mut engine: Stabilizer<S, P>,
    inbox: &xch::Receiver<Stamped>,
    autostart: bool,
) -> Stabilizer<S, P> {
    if autostart {
        engine.start();
    }
    loop {
        // Queued inputs are drained before overdue timers are polled; their
        // stamps decide which timers precede them.
        let Stamped { at, input } = match engine.next_deadline_ms() {
            Some(due) => {
                let wait = Duration::from_millis(due.saturating_sub(engine.now_ms()));
                match inbox.recv_timeout(wait) {
                    Ok(m) => m,
                    Err(xch::RecvTimeoutError::Timeout) => {
                        engine.poll_timers();
                        continue;
                    }
                    Err(xch::RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match inbox.recv() {
                Ok(m) => m,
                Err(_) => break,
            },
        };
        let arrived_ms = engine.ms_at(at);
        engine.poll_timers_until(arrived_ms);
        match input {
            Input::Reading { session, reading } => engine.on_reading(SessionId(session), reading),
            Input::SensorError { session, failure } => {
                engine.on_sensor_error(SessionId(session), failure);
            }
            Input::Start => {
                engine.start();
            }
            Input::Pause => engine.pause(),
            Input::Resume => {
                engine.resume();
            }
            Input::Refresh => {
                engine.request_refresh();
            }
            Input::Tick => {}
            Input::Shutdown => break,
        }
    }
    engine.pause();
    tracing::trace!("actor thread exiting cleanly");
    engine
}

/// Owner of the actor thread.
pub struct ActorHandle<S: PositionSource, P: Publisher> {
    sink: ReadingSink,
    join: Option<JoinHandle<Stabilizer<S, P>>>,
}

impl<S: PositionSource, P: Publisher> ActorHandle<S, P> {
    pub fn sink(&self) -> &ReadingSink {
        &self.sink
    }

    pub fn start(&self) -> Result<()> {
        self.sink.control(Input::Start)
    }

    pub fn pause(&self) -> Result<()> {
        self.sink.control(Input::Pause)
    }

    pub fn resume(&self) -> Result<()> {
        self.sink.control(Input::Resume)
    }

    pub fn refresh(&self) -> Result<()> {
        self.sink.control(Input::Refresh)
    }

    pub fn tick(&self) -> Result<()> {
        self.sink.control(Input::Tick)
    }

    /// Stop the actor and hand back the engine for inspection.
    pub fn shutdown(mut self) -> Result<Stabilizer<S, P>> {
        let join = self
            .join
            .take()
            .ok_or_else(|| eyre::Report::new(GeofixError::Disconnected))?;
        // The thread may already have exited; joining still works.
        let _ = self.sink.control(Input::Shutdown);
        join.join()
            .map_err(|_| eyre::Report::new(GeofixError::State("actor thread panicked".into())))
    }
}

impl<S: PositionSource, P: Publisher> Drop for ActorHandle<S, P> {
    fn drop(&mut self) {
        if let Some(handle) = self.join.take() {
            let _ = self.sink.control(Input::Shutdown);
            match handle.join() {
                Ok(_) => tracing::trace!("actor thread joined successfully"),
                Err(e) => tracing::warn!(?e, "actor thread panicked during shutdown"),
            }
        }
    }
}
