use geofix_core::mocks::{NoopSource, RecordingPublisher};
use geofix_core::replay::replay;
use geofix_core::{EngineCfg, RawReading, State, build_stabilizer};
use geofix_traits::ManualClock;

const TRACE: &str = "\
timestamp_ms,lat,lng,accuracy_m,altitude
1700000000000,-6.20010,106.80010,200,40
1700000001000,-6.20004,106.80003,150,
1700000002000,-6.20001,106.80001,100,
1700000003000,-6.20000,106.80000,0,
1700000004000,-6.20000,106.80000,40,
1700000005000,-6.20000,106.80000,20,41.5
";

fn trace() -> Vec<RawReading> {
    geofix_config::load_trace_reader(TRACE.as_bytes())
        .unwrap()
        .iter()
        .map(RawReading::from)
        .collect()
}

#[test]
fn recorded_trace_replays_deterministically() {
    let run = || {
        let clock = ManualClock::new();
        let events = RecordingPublisher::default();
        let mut engine = build_stabilizer(
            NoopSource::default(),
            events.clone(),
            EngineCfg::default(),
            Some(Box::new(clock.clone())),
        )
        .unwrap();
        (replay(&mut engine, &trace(), &clock, true), events.events())
    };
    let (a, ev_a) = run();
    let (b, ev_b) = run();
    assert_eq!(a, b);
    assert_eq!(ev_a, ev_b);

    assert_eq!(a.accepted, 5);
    assert_eq!(a.rejected, 1);
    assert!(a.refined.is_some());
    assert!(a.stable_at_ms.is_some_and(|t| t <= 5000 + 12_000));
}

#[test]
fn without_drain_a_pending_window_stays_open() {
    let clock = ManualClock::new();
    let mut engine = build_stabilizer(
        NoopSource::default(),
        RecordingPublisher::default(),
        EngineCfg::default(),
        Some(Box::new(clock.clone())),
    )
    .unwrap();
    let lone = [RawReading::new(-6.2, 106.8, 15.0, 0)];
    let summary = replay(&mut engine, &lone, &clock, false);
    assert_eq!(summary.final_state, State::Stabilizing);
    assert!(summary.refined.is_none());
    assert_eq!(summary.elapsed_ms, 0);

    let clock = ManualClock::new();
    let mut engine = build_stabilizer(
        NoopSource::default(),
        RecordingPublisher::default(),
        EngineCfg::default(),
        Some(Box::new(clock.clone())),
    )
    .unwrap();
    let summary = replay(&mut engine, &lone, &clock, true);
    assert!(summary.is_stable());
    assert_eq!(summary.stable_at_ms, Some(12_000));
    assert_eq!(summary.stabilizations, 1);
}
