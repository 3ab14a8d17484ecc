//! Command implementations: replay, simulate, check-config and self-check.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel as xch;
use geofix_core::event::FnPublisher;
use geofix_core::refine::RefineSource;
use geofix_core::replay::{ReplaySummary, replay};
use geofix_core::runner::{Actor, inbox};
use geofix_core::util::ms_to_secs_rounded;
use geofix_core::{
    EngineCfg, Event, GeofixError, RawReading, RefinedLocation, SensorFailure, State,
    TransitionData, build_stabilizer,
};
use geofix_sim::{SimParams, SimulatedReceiver, Trajectory};
use geofix_traits::{ManualClock, PositionSource, SourceError};
use serde_json::{Value, json};

use crate::cli::FailKind;

/// Readings generated for `self-check`.
const SELF_CHECK_READINGS: usize = 30;
/// How often `simulate` wakes up to check for Ctrl-C and its deadline.
const SIMULATE_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("position did not stabilize (final state {0})")]
    NotStabilized(State),
    #[error("interrupted before the position stabilized")]
    Interrupted,
}

/// Source used while replaying: readings come from the trace, so there is no
/// sensor to start or stop.
#[derive(Debug, Default)]
struct RecordedTrace;

impl PositionSource for RecordedTrace {
    fn start_watch(&mut self, session: u64) -> Result<(), SourceError> {
        tracing::debug!(session, "replay session started");
        Ok(())
    }

    fn stop_watch(&mut self) -> Result<(), SourceError> {
        Ok(())
    }
}

/// Writes events to stdout, one line each.
#[derive(Debug, Clone, Copy)]
struct EventPrinter {
    json: bool,
    precision: usize,
}

impl EventPrinter {
    fn print(&self, ev: &Event) {
        if self.json {
            println!("{}", event_json(ev, self.precision));
        } else {
            println!("{}", event_line(ev, self.precision));
        }
    }
}

fn reading_json(r: &RawReading) -> Value {
    json!({
        "lat": r.lat,
        "lng": r.lng,
        "accuracy_m": r.accuracy_m,
        "timestamp_ms": r.timestamp_ms,
    })
}

fn refined_json(loc: &RefinedLocation, precision: usize) -> Value {
    let ext = loc.externalize(precision);
    let (source, samples) = match loc.source {
        RefineSource::Weighted { samples } => ("weighted", samples),
        RefineSource::BestInHistory => ("best_in_history", 1),
        RefineSource::BestEstimate => ("best_estimate", 1),
        RefineSource::Placeholder => ("placeholder", 0),
    };
    json!({
        "lat": ext.lat,
        "lng": ext.lng,
        "accuracy_m": ext.accuracy_m,
        "altitude": ext.altitude,
        "altitude_accuracy": ext.altitude_accuracy,
        "speed_mps": ext.speed_mps,
        "heading_deg": ext.heading_deg,
        "source": source,
        "samples": samples,
    })
}

fn failure_json(f: &SensorFailure) -> Value {
    json!({ "code": f.code.name(), "code_num": f.code.code(), "message": f.message })
}

pub fn event_json(ev: &Event, precision: usize) -> Value {
    match ev {
        Event::StateChange {
            state,
            previous,
            data,
        } => {
            let mut obj = json!({
                "event": ev.kind(),
                "state": state.name(),
                "previous": previous.name(),
            });
            match data {
                TransitionData::None => {}
                TransitionData::Location(r) => obj["location"] = reading_json(r),
                TransitionData::Failure(f) => obj["failure"] = failure_json(f),
            }
            obj
        }
        Event::LocationUpdate { location } => {
            json!({ "event": ev.kind(), "location": reading_json(location) })
        }
        Event::LocationStable { location } => {
            json!({ "event": ev.kind(), "location": refined_json(location, precision) })
        }
        Event::Error { code, message } => json!({
            "event": ev.kind(),
            "code": code.name(),
            "code_num": code.code(),
            "message": message,
        }),
    }
}

fn event_line(ev: &Event, precision: usize) -> String {
    match ev {
        Event::StateChange {
            state, previous, ..
        } => format!("state   {previous} -> {state}"),
        Event::LocationUpdate { location: r } => format!(
            "update  {:.p$},{:.p$} ±{:.1} m",
            r.lat,
            r.lng,
            r.accuracy_m,
            p = precision
        ),
        Event::LocationStable { location } => {
            let ext = location.externalize(precision);
            format!("stable  {},{} ±{} m", ext.lat, ext.lng, ext.accuracy_m)
        }
        Event::Error { code, message } => format!("error   {code}: {message}"),
    }
}

fn print_summary(s: &ReplaySummary, json: bool, precision: usize) {
    if json {
        let obj = json!({
            "event": "summary",
            "state": s.final_state.name(),
            "stable": s.is_stable(),
            "session": s.session.0,
            "accepted": s.accepted,
            "rejected": s.rejected,
            "stabilizations": s.stabilizations,
            "stable_at_ms": s.stable_at_ms,
            "elapsed_ms": s.elapsed_ms,
            "location": s.refined.as_ref().map(|l| refined_json(l, precision)),
        });
        println!("{obj}");
        return;
    }
    println!(
        "\n{} readings accepted, {} rejected, final state {}",
        s.accepted, s.rejected, s.final_state
    );
    if let Some(loc) = s.refined.as_ref().filter(|_| s.is_stable()) {
        let ext = loc.externalize(precision);
        let after = s
            .stable_at_ms
            .map(|ms| format!(" after {} s", ms_to_secs_rounded(ms)))
            .unwrap_or_default();
        println!(
            "Position stable{after}: {}, {} (±{} m)",
            ext.lat, ext.lng, ext.accuracy_m
        );
    }
}

fn replay_readings(
    cfg: &EngineCfg,
    readings: &[RawReading],
    drain: bool,
    json: bool,
) -> eyre::Result<ReplaySummary> {
    let printer = EventPrinter {
        json,
        precision: cfg.refine.coordinate_precision,
    };
    let clock = ManualClock::new();
    let mut engine = build_stabilizer(
        RecordedTrace,
        FnPublisher(move |ev: Event| printer.print(&ev)),
        cfg.clone(),
        Some(Box::new(clock.clone())),
    )?;
    let summary = replay(&mut engine, readings, &clock, drain);
    print_summary(&summary, json, printer.precision);
    if summary.is_stable() {
        Ok(summary)
    } else {
        Err(RunError::NotStabilized(summary.final_state).into())
    }
}

pub fn run_replay(cfg: &EngineCfg, trace: &Path, drain: bool, json: bool) -> eyre::Result<()> {
    let rows = geofix_config::load_trace_csv(trace)?;
    if rows.is_empty() {
        eyre::bail!("trace {:?} contains no readings", trace);
    }
    let readings: Vec<RawReading> = rows.iter().map(RawReading::from).collect();
    tracing::info!(readings = readings.len(), drain, "replaying trace");
    replay_readings(cfg, &readings, drain, json).map(|_| ())
}

pub fn run_self_check(cfg: &EngineCfg, params: SimParams, json: bool) -> eyre::Result<()> {
    params.validate()?;
    let step = i64::try_from(params.interval_ms).unwrap_or(i64::MAX);
    let mut traj = Trajectory::new(params);
    let readings: Vec<RawReading> = (0..SELF_CHECK_READINGS)
        .map(|i| traj.next_reading(step.saturating_mul(i64::try_from(i).unwrap_or(0))))
        .collect();
    let summary = replay_readings(cfg, &readings, true, json)?;
    tracing::info!(
        stabilizations = summary.stabilizations,
        "self-check passed"
    );
    if !json {
        println!("self-check OK");
    }
    Ok(())
}

pub fn run_simulate(
    cfg: &EngineCfg,
    params: SimParams,
    max_wait_ms: u64,
    fail_start: Option<FailKind>,
    json: bool,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<()> {
    let printer = EventPrinter {
        json,
        precision: cfg.refine.coordinate_precision,
    };
    let (sink, rx) = inbox();
    let (ev_tx, ev_rx) = xch::unbounded::<Event>();
    let mut sim = SimulatedReceiver::new(params, sink.clone())?;
    if let Some(kind) = fail_start {
        sim = sim.fail_start_with(kind.into());
    }
    let engine = build_stabilizer(sim, ev_tx, cfg.clone(), None)?;
    let handle = Actor::spawn(engine, &sink, rx, true)?;

    let deadline = Instant::now() + Duration::from_millis(max_wait_ms);
    let mut last_state = State::Idle;
    let outcome: eyre::Result<()> = loop {
        if shutdown.load(Ordering::Relaxed) {
            break Err(RunError::Interrupted.into());
        }
        let now = Instant::now();
        if now >= deadline {
            break Err(RunError::NotStabilized(last_state).into());
        }
        match ev_rx.recv_timeout(SIMULATE_POLL.min(deadline - now)) {
            Ok(ev) => {
                printer.print(&ev);
                match ev {
                    Event::StateChange { state, .. } => last_state = state,
                    Event::LocationStable { .. } => break Ok(()),
                    Event::Error { code, message } => {
                        break Err(GeofixError::Sensor(SensorFailure::new(code, message)).into());
                    }
                    Event::LocationUpdate { .. } => {}
                }
            }
            Err(xch::RecvTimeoutError::Timeout) => {}
            Err(xch::RecvTimeoutError::Disconnected) => {
                break Err(GeofixError::Disconnected.into());
            }
        }
    };

    let engine = handle.shutdown()?;
    let stats = engine.stats();
    tracing::info!(
        accepted = stats.accepted,
        rejected = stats.rejected,
        stale = stats.stale,
        "simulation finished"
    );
    if let Err(e) = &outcome
        && let Some(RunError::NotStabilized(_)) = e.downcast_ref::<RunError>()
    {
        tracing::warn!(best = ?engine.best().map(|r| r.accuracy_m), "gave up waiting for a stable fix");
    }
    outcome
}

pub fn run_check_config(cfg: &EngineCfg, json: bool) {
    if json {
        let obj = json!({
            "accuracy": {
                "min_accuracy_m": cfg.accuracy.min_accuracy_m,
                "max_reasonable_accuracy_m": cfg.accuracy.max_reasonable_accuracy_m,
            },
            "acceptance": {
                "improvement_fast_m": cfg.acceptance.improvement_fast_m,
                "ratio_fast": cfg.acceptance.ratio_fast,
                "improvement_stable_m": cfg.acceptance.improvement_stable_m,
                "convergence_factor": cfg.acceptance.convergence_factor,
                "similar_accuracy_m": cfg.acceptance.similar_accuracy_m,
            },
            "consistency": {
                "window": cfg.consistency.window,
                "min_positions": cfg.consistency.min_positions,
                "movement_threshold_m": cfg.consistency.movement_threshold_m,
            },
            "timeouts": {
                "fast_acquisition_ms": cfg.timeouts.fast_acquisition_ms,
                "best_location_ms": cfg.timeouts.best_location_ms,
            },
            "refine": {
                "top_n": cfg.refine.top_n,
                "coordinate_precision": cfg.refine.coordinate_precision,
            },
            "history_size": cfg.history_size,
        });
        println!("{obj}");
        return;
    }
    println!("config OK");
    println!(
        "  accuracy     min {} m, max reasonable {} m",
        cfg.accuracy.min_accuracy_m, cfg.accuracy.max_reasonable_accuracy_m
    );
    println!(
        "  acceptance   fast +{} m or x{}, stable +{} m or x{}, similar < {} m",
        cfg.acceptance.improvement_fast_m,
        cfg.acceptance.ratio_fast,
        cfg.acceptance.improvement_stable_m,
        cfg.acceptance.convergence_factor,
        cfg.acceptance.similar_accuracy_m
    );
    println!(
        "  consistency  {} of last {} within {} m",
        cfg.consistency.min_positions, cfg.consistency.window, cfg.consistency.movement_threshold_m
    );
    println!(
        "  timeouts     fast {} ms, stabilization {} ms",
        cfg.timeouts.fast_acquisition_ms, cfg.timeouts.best_location_ms
    );
    println!(
        "  refine       top {}, {} decimals, history {}",
        cfg.refine.top_n, cfg.refine.coordinate_precision, cfg.history_size
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use geofix_core::SensorErrorCode;

    #[test]
    fn state_change_json_carries_failure() {
        let ev = Event::StateChange {
            state: State::Error,
            previous: State::Starting,
            data: TransitionData::Failure(SensorFailure::new(
                SensorErrorCode::PermissionDenied,
                "denied",
            )),
        };
        let v = event_json(&ev, 6);
        assert_eq!(v["event"], "state_change");
        assert_eq!(v["state"], "ERROR");
        assert_eq!(v["previous"], "STARTING");
        assert_eq!(v["failure"]["code"], "PERMISSION_DENIED");
        assert_eq!(v["failure"]["code_num"], 1);
    }

    #[test]
    fn stable_json_uses_fixed_precision_strings() {
        let loc = geofix_core::compute_refined(
            &[RawReading::new(-6.2, 106.8, 12.4, 0)],
            None,
            7,
        );
        let v = event_json(&Event::LocationStable { location: loc }, 4);
        assert_eq!(v["location"]["lat"], "-6.2000");
        assert_eq!(v["location"]["lng"], "106.8000");
        assert_eq!(v["location"]["accuracy_m"], 12.0);
        assert_eq!(v["location"]["source"], "weighted");
    }

    #[test]
    fn lone_good_reading_replays_to_stable() {
        let cfg = EngineCfg::default();
        let summary =
            replay_readings(&cfg, &[RawReading::new(-6.2, 106.8, 15.0, 0)], true, true).unwrap();
        assert_eq!(summary.stable_at_ms, Some(cfg.timeouts.best_location_ms));
    }

    #[test]
    fn coarse_trace_without_drain_is_not_stable() {
        let err = replay_readings(
            &EngineCfg::default(),
            &[RawReading::new(-6.2, 106.8, 300.0, 0)],
            false,
            true,
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RunError>(),
            Some(RunError::NotStabilized(_))
        ));
    }
}
