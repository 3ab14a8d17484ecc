use std::time::Duration;

use crossbeam_channel as xch;
use geofix_core::error::SensorErrorCode;
use geofix_core::runner::{Actor, Input, inbox};
use geofix_core::sensor_error::map_source_error;
use geofix_core::{EngineCfg, Event, State, build_stabilizer};
use geofix_sim::{SimParams, SimulatedReceiver};
use geofix_traits::PositionSource;
use rstest::rstest;

fn fast_params() -> SimParams {
    SimParams {
        interval_ms: 5,
        ..SimParams::default()
    }
}

#[test]
fn readings_carry_the_session_tag() {
    let (sink, rx) = inbox();
    let mut sim = SimulatedReceiver::new(fast_params(), sink).unwrap();
    sim.start_watch(3).unwrap();
    for _ in 0..3 {
        match rx.recv_timeout(Duration::from_secs(2)).unwrap().input {
            Input::Reading { session, reading } => {
                assert_eq!(session, 3);
                assert!(reading.accuracy_m > 0.0);
            }
            other => panic!("unexpected input {other:?}"),
        }
    }
    sim.stop_watch().unwrap();
    assert!(!sim.is_watching());
    // Nothing arrives once the watch is stopped.
    while rx.try_recv().is_ok() {}
    assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
}

#[rstest]
#[case(SensorErrorCode::PermissionDenied)]
#[case(SensorErrorCode::PositionUnavailable)]
#[case(SensorErrorCode::Unsupported)]
fn refused_start_maps_to_typed_failure(#[case] code: SensorErrorCode) {
    let (sink, _rx) = inbox();
    let mut sim = SimulatedReceiver::new(fast_params(), sink)
        .unwrap()
        .fail_start_with(code);
    let err = sim.start_watch(1).unwrap_err();
    assert_eq!(map_source_error(err.as_ref()).code, code);
    assert!(!sim.is_watching());
}

#[rstest]
#[case::zero_interval(SimParams { interval_ms: 0, ..SimParams::default() })]
#[case::floor_above_start(SimParams { floor_accuracy_m: 500.0, ..SimParams::default() })]
#[case::decay_above_one(SimParams { decay: 1.5, ..SimParams::default() })]
#[case::invalid_rate(SimParams { invalid_rate: 2.0, ..SimParams::default() })]
fn bad_params_are_rejected(#[case] params: SimParams) {
    let (sink, _rx) = inbox();
    assert!(SimulatedReceiver::new(params, sink).is_err());
}

#[test]
fn actor_with_simulator_reaches_stable() {
    let (sink, rx) = inbox();
    let (ev_tx, ev_rx) = xch::unbounded();
    let sim = SimulatedReceiver::new(fast_params(), sink.clone()).unwrap();
    let engine = build_stabilizer(sim, ev_tx, EngineCfg::default(), None).unwrap();
    let handle = Actor::spawn(engine, &sink, rx, true).unwrap();

    let stable = loop {
        match ev_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Event::LocationStable { location }) => break location,
            Ok(_) => {}
            Err(e) => panic!("no stable location: {e}"),
        }
    };
    assert!(stable.accuracy_m > 0.0);
    assert!((stable.lat - -6.2).abs() < 1e-3);

    let mut engine = handle.shutdown().unwrap();
    assert_eq!(engine.state(), State::Idle);
    assert!(!engine.source_mut().is_watching());
}
