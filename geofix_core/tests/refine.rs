use geofix_core::RawReading;
use geofix_core::refine::{RefineSource, RefinedLocation, compute_refined};
use proptest::prelude::*;

#[test]
fn accuracy_weighting_pulls_towards_the_precise_fix() {
    let history = [
        RawReading::new(-6.200000, 106.800000, 10.0, 0),
        RawReading::new(-6.200010, 106.800010, 30.0, 1000),
    ];
    let out = compute_refined(&history, None, 7);
    let unweighted = (-6.200000 + -6.200010) / 2.0;
    assert!((out.lat - -6.200000).abs() < (unweighted - -6.200000_f64).abs());
    assert_eq!(out.accuracy_m, 15.0);
    assert_eq!(out.source, RefineSource::Weighted { samples: 2 });
}

#[test]
fn only_the_seven_most_accurate_are_blended() {
    // Accuracies 1..=10; the three coarsest sit far away.
    let history: Vec<RawReading> = (1..=10)
        .map(|i| {
            let lat = if i <= 7 { 10.0 } else { 20.0 };
            RawReading::new(lat, 0.0, f64::from(i), i64::from(i))
        })
        .collect();
    let out = compute_refined(&history, None, 7);
    assert!((out.lat - 10.0).abs() < 1e-9);
    assert_eq!(out.source, RefineSource::Weighted { samples: 7 });
}

#[test]
fn ties_prefer_earliest_timestamps() {
    let mut history = vec![RawReading::new(45.0, 0.0, 10.0, 99)];
    history.extend((0..7).map(|i| RawReading::new(0.0, 0.0, 10.0, i)));
    let out = compute_refined(&history, None, 7);
    assert_eq!(out.lat, 0.0);
}

#[test]
fn ancillary_fields_come_from_most_accurate_entry() {
    let history = [
        RawReading::new(0.0, 0.0, 10.0, 0).with_altitude(50.0, Some(9.0)),
        RawReading::new(0.0, 0.0, 5.0, 1)
            .with_altitude(100.0, Some(3.0))
            .with_motion(Some(1.5), Some(270.0)),
    ];
    let out = compute_refined(&history, None, 7);
    assert_eq!(out.altitude, Some(100.0));
    assert_eq!(out.altitude_accuracy, Some(3.0));
    assert_eq!(out.speed_mps, Some(1.5));
    assert_eq!(out.heading_deg, Some(270.0));
}

#[test]
fn unusable_weights_fall_back_to_best_estimate() {
    let history = [RawReading::new(1.0, 1.0, 0.0, 0)];
    let best = RawReading::new(2.0, 2.0, 12.6, 0);
    let out = compute_refined(&history, Some(&best), 7);
    assert_eq!(out.source, RefineSource::BestEstimate);
    assert_eq!(out.lat, 2.0);
    assert_eq!(out.accuracy_m, 13.0);
}

#[test]
fn non_finite_blend_falls_back_to_best_in_history() {
    let history = [
        RawReading::new(f64::NAN, 0.0, 5.0, 0),
        RawReading::new(3.0, 4.0, 8.0, 1),
    ];
    let out = compute_refined(&history, None, 7);
    assert_eq!(out.source, RefineSource::BestInHistory);
    assert_eq!((out.lat, out.lng), (3.0, 4.0));
}

#[test]
fn nothing_usable_yields_placeholder() {
    let history = [RawReading::new(1.0, 1.0, -1.0, 0)];
    assert_eq!(compute_refined(&history, None, 7), RefinedLocation::placeholder());
}

fn reading() -> impl Strategy<Value = RawReading> {
    (-90.0..90.0f64, -180.0..180.0f64, 0.5..1000.0f64, 0i64..1_000_000)
        .prop_map(|(lat, lng, acc, ts)| RawReading::new(lat, lng, acc, ts))
}

proptest! {
    #[test]
    fn refinement_is_idempotent_and_pure(history in prop::collection::vec(reading(), 0..20)) {
        let before = history.clone();
        let a = compute_refined(&history, None, 7);
        let b = compute_refined(&history, None, 7);
        prop_assert_eq!(a, b);
        prop_assert_eq!(history, before);
    }

    #[test]
    fn refined_accuracy_is_bounded_by_inputs(history in prop::collection::vec(reading(), 1..20)) {
        let out = compute_refined(&history, None, 7);
        let min = history.iter().map(|r| r.accuracy_m).fold(f64::INFINITY, f64::min);
        let max = history.iter().map(|r| r.accuracy_m).fold(0.0, f64::max);
        prop_assert!(out.accuracy_m >= min.round() - 1.0);
        prop_assert!(out.accuracy_m <= max.round() + 1.0);
    }
}
