//! Actor thread lifecycle: input routing, timer wake-ups and clean shutdown.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel as xch;
use geofix_core::mocks::NoopSource;
use geofix_core::runner::{Actor, inbox, inbox_with_clock};
use geofix_core::{EngineCfg, Event, Publisher, RawReading, State, build_stabilizer};
use geofix_traits::ManualClock;

const WAIT: Duration = Duration::from_secs(5);

fn wait_for(rx: &xch::Receiver<Event>, pred: impl Fn(&Event) -> bool) -> Event {
    loop {
        let e = rx.recv_timeout(WAIT).expect("event not received in time");
        if pred(&e) {
            return e;
        }
    }
}

fn entered(state: State) -> impl Fn(&Event) -> bool {
    move |e| matches!(e, Event::StateChange { state: s, .. } if *s == state)
}

#[test]
fn actor_stabilizes_on_manual_clock() {
    let clock = ManualClock::new();
    let (sink, rx) = inbox_with_clock(Arc::new(clock.clone()));
    let (ev_tx, ev_rx) = xch::unbounded();
    let engine = build_stabilizer(
        NoopSource::default(),
        ev_tx,
        EngineCfg::default(),
        Some(Box::new(clock.clone())),
    )
    .unwrap();
    let handle = Actor::spawn(engine, &sink, rx, true).unwrap();

    assert!(sink.push(1, RawReading::new(-6.2, 106.8, 12.0, 0)));
    wait_for(&ev_rx, entered(State::Stabilizing));

    clock.advance_ms(12_000);
    handle.tick().unwrap();
    let stable = wait_for(&ev_rx, |e| matches!(e, Event::LocationStable { .. }));
    let Event::LocationStable { location } = stable else {
        unreachable!()
    };
    assert_eq!(location.accuracy_m, 12.0);

    let mut engine = handle.shutdown().unwrap();
    assert_eq!(engine.state(), State::Idle);
    assert!(engine.last_refined().is_some());
    assert_eq!(engine.source_mut().stops, 1);
}

#[test]
fn stale_session_is_ignored_by_actor() {
    let clock = ManualClock::new();
    let (sink, rx) = inbox_with_clock(Arc::new(clock.clone()));
    let (ev_tx, ev_rx) = xch::unbounded();
    let engine = build_stabilizer(
        NoopSource::default(),
        ev_tx,
        EngineCfg::default(),
        Some(Box::new(clock)),
    )
    .unwrap();
    let handle = Actor::spawn(engine, &sink, rx, true).unwrap();
    sink.push(7, RawReading::new(-6.2, 106.8, 12.0, 0));
    handle.refresh().unwrap();
    let engine = handle.shutdown().unwrap();
    assert!(engine.history().is_empty());
    assert_eq!(engine.stats().stale, 1);
    // Only the STARTING and shutdown IDLE transitions were published.
    let kinds: Vec<_> = ev_rx.try_iter().map(|e| e.kind()).collect();
    assert_eq!(kinds, vec!["state_change", "state_change"]);
}

#[test]
fn control_messages_reach_the_engine() {
    let clock = ManualClock::new();
    let (sink, rx) = inbox_with_clock(Arc::new(clock.clone()));
    let (ev_tx, ev_rx) = xch::unbounded();
    let engine = build_stabilizer(
        NoopSource::default(),
        ev_tx,
        EngineCfg::default(),
        Some(Box::new(clock)),
    )
    .unwrap();
    let handle = Actor::spawn(engine, &sink, rx, false).unwrap();
    handle.start().unwrap();
    wait_for(&ev_rx, entered(State::Starting));
    handle.pause().unwrap();
    wait_for(&ev_rx, entered(State::Idle));
    handle.resume().unwrap();
    wait_for(&ev_rx, entered(State::Starting));
    let mut engine = handle.shutdown().unwrap();
    assert_eq!(engine.source_mut().starts, vec![1, 2]);
}

#[test]
fn dropping_handle_joins_thread() {
    for _ in 0..10 {
        let (sink, rx) = inbox();
        let engine = build_stabilizer(
            NoopSource::default(),
            geofix_core::mocks::RecordingPublisher::default(),
            EngineCfg::default(),
            None,
        )
        .unwrap();
        let handle = Actor::spawn(engine, &sink, rx, true).unwrap();
        sink.push(1, RawReading::new(0.0, 0.0, 100.0, 0));
        drop(handle);
        // The sink outlives the actor; sends now fail.
        assert!(!sink.push(1, RawReading::new(0.0, 0.0, 100.0, 1)));
    }
}

/// Forwards events and jumps the clock forward while handling the update
/// for one accuracy, as if the actor were descheduled mid-queue.
struct StallOnUpdate {
    clock: ManualClock,
    accuracy_m: f64,
    stall_ms: u64,
    tx: xch::Sender<Event>,
}

impl Publisher for StallOnUpdate {
    fn publish(&mut self, event: Event) {
        if let Event::LocationUpdate { location } = &event
            && location.accuracy_m == self.accuracy_m
        {
            self.clock.advance_ms(self.stall_ms);
        }
        let _ = self.tx.send(event);
    }
}

#[test]
fn queued_reading_is_judged_by_its_arrival_time() {
    let clock = ManualClock::new();
    let (sink, rx) = inbox_with_clock(Arc::new(clock.clone()));
    let (ev_tx, ev_rx) = xch::unbounded();
    let publisher = StallOnUpdate {
        clock: clock.clone(),
        accuracy_m: 150.0,
        stall_ms: 3500,
        tx: ev_tx,
    };
    let engine = build_stabilizer(
        NoopSource::default(),
        publisher,
        EngineCfg::default(),
        Some(Box::new(clock.clone())),
    )
    .unwrap();

    // All three arrive at t=0, well inside the 3 s fast-acquisition window.
    for acc in [200.0, 150.0, 135.0] {
        assert!(sink.push(1, RawReading::new(-6.2, 106.8, acc, 0)));
    }
    let handle = Actor::spawn(engine, &sink, rx, true).unwrap();
    wait_for(&ev_rx, entered(State::AcquiringStable));
    let engine = handle.shutdown().unwrap();

    // 15 m beats the fast-mode bar but not the stable-mode one.
    assert_eq!(engine.best().map(|b| b.accuracy_m), Some(135.0));
    let seen: Vec<Event> = ev_rx.try_iter().collect();
    assert!(
        !seen
            .iter()
            .any(|e| matches!(e, Event::LocationUpdate { .. })),
        "no update may follow the fast-acquisition timeout: {seen:?}"
    );
}

#[test]
fn timer_due_before_a_late_input_fires_first() {
    let clock = ManualClock::new();
    let (sink, rx) = inbox_with_clock(Arc::new(clock.clone()));
    let (ev_tx, ev_rx) = xch::unbounded();
    let engine = build_stabilizer(
        NoopSource::default(),
        ev_tx,
        EngineCfg::default(),
        Some(Box::new(clock.clone())),
    )
    .unwrap();
    assert!(sink.push(1, RawReading::new(-6.2, 106.8, 200.0, 0)));
    let handle = Actor::spawn(engine, &sink, rx, true).unwrap();
    wait_for(&ev_rx, entered(State::AcquiringFast));

    clock.advance_ms(3500);
    assert!(sink.push(1, RawReading::new(-6.2, 106.8, 185.0, 3500)));
    wait_for(&ev_rx, entered(State::AcquiringStable));
    let engine = handle.shutdown().unwrap();
    // Judged under stable-mode rules: a 15 m gain is not enough.
    assert_eq!(engine.best().map(|b| b.accuracy_m), Some(200.0));
    assert_eq!(engine.history().len(), 2);
}
