use geofix_core::tracker::BestEstimateTracker;
use geofix_core::{AcceptanceCfg, AcquisitionMode, EngineCfg, RawReading, is_better};
use proptest::prelude::*;
use rstest::rstest;

fn mode() -> impl Strategy<Value = AcquisitionMode> {
    prop_oneof![Just(AcquisitionMode::Fast), Just(AcquisitionMode::Stable)]
}

proptest! {
    #[test]
    fn history_never_exceeds_capacity(
        accs in prop::collection::vec(-50.0..2000.0f64, 0..200),
        size in 1usize..40,
    ) {
        let cfg = EngineCfg { history_size: size, ..EngineCfg::default() };
        let mut t = BestEstimateTracker::new(&cfg);
        for (i, acc) in accs.into_iter().enumerate() {
            t.ingest(RawReading::new(1.0, 2.0, acc, i as i64), AcquisitionMode::Stable);
            prop_assert!(t.history().len() <= size);
        }
    }

    #[test]
    fn coarser_or_equal_is_never_better(
        current in 0.1..1000.0f64,
        extra in 0.0..1000.0f64,
        m in mode(),
    ) {
        let cur = RawReading::new(0.0, 0.0, current, 0);
        let new = RawReading::new(0.0, 0.0, current + extra, 1);
        prop_assert!(!is_better(&new, Some(&cur), m, &AcceptanceCfg::default()));
    }

    #[test]
    fn best_accuracy_is_non_increasing(
        accs in prop::collection::vec(0.5..1000.0f64, 1..100),
        m in mode(),
    ) {
        let mut t = BestEstimateTracker::new(&EngineCfg::default());
        let mut last = f64::INFINITY;
        for (i, acc) in accs.into_iter().enumerate() {
            t.ingest(RawReading::new(1.0, 2.0, acc, i as i64), m);
            let best = t.best().map_or(f64::INFINITY, |b| b.accuracy_m);
            prop_assert!(best <= last);
            last = best;
        }
    }
}

#[rstest]
#[case(AcquisitionMode::Fast, 100.0, 94.0, true)]
#[case(AcquisitionMode::Fast, 100.0, 95.0, false)]
#[case(AcquisitionMode::Fast, 12.0, 9.0, true)]
#[case(AcquisitionMode::Stable, 100.0, 79.0, true)]
#[case(AcquisitionMode::Stable, 100.0, 85.0, false)]
#[case(AcquisitionMode::Stable, 100.0, 95.0, true)]
#[case(AcquisitionMode::Stable, 30.0, 19.0, true)]
#[case(AcquisitionMode::Stable, 20.0, 20.0, false)]
fn acceptance_table(
    #[case] m: AcquisitionMode,
    #[case] current: f64,
    #[case] new: f64,
    #[case] want: bool,
) {
    let cur = RawReading::new(0.0, 0.0, current, 0);
    let n = RawReading::new(0.0, 0.0, new, 1);
    assert_eq!(is_better(&n, Some(&cur), m, &AcceptanceCfg::default()), want);
}

#[test]
fn overflow_evicts_oldest() {
    let cfg = EngineCfg {
        history_size: 3,
        ..EngineCfg::default()
    };
    let mut t = BestEstimateTracker::new(&cfg);
    for i in 0..5 {
        t.ingest(RawReading::new(0.0, 0.0, 50.0, i), AcquisitionMode::Stable);
    }
    let ts: Vec<i64> = t.history().iter().map(|r| r.timestamp_ms).collect();
    assert_eq!(ts, vec![2, 3, 4]);
}
