#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Position acquisition and stabilization engine (sensor-agnostic).
//!
//! Turns a noisy, asynchronous stream of positioning readings into one
//! trustworthy estimate. All sensor interaction goes through
//! `geofix_traits::PositionSource`; all output goes through `event::Publisher`.
//!
//! ## Architecture
//!
//! - **Validation**: `reading::ReadingValidator` drops unusable samples
//! - **Tracking**: bounded `history::History` plus best-so-far (`tracker`)
//! - **Consistency**: centroid clustering of the latest readings (`consistency`)
//! - **Refinement**: accuracy-weighted blend of the top readings (`refine`)
//! - **State machine**: timers and transitions (`stabilizer`, `timer`)
//! - **Drivers**: threaded actor (`runner`) and deterministic replay (`replay`)

pub mod builder;
pub mod config;
pub mod consistency;
pub mod conversions;
pub mod error;
pub mod event;
pub mod geo;
pub mod history;
pub mod mocks;
pub mod reading;
pub mod refine;
pub mod replay;
pub mod runner;
pub mod sensor_error;
pub mod stabilizer;
pub mod timer;
pub mod tracker;
pub mod util;

pub use builder::{DynStabilizer, StabilizerBuilder, build_stabilizer};
pub use config::{AcceptanceCfg, AccuracyCfg, ConsistencyCfg, EngineCfg, RefineCfg, Timeouts};
pub use error::{BuildError, GeofixError, Rejection, Result, SensorErrorCode, SensorFailure};
pub use event::{Event, Publisher, TransitionData};
pub use reading::RawReading;
pub use refine::{ExternalLocation, RefinedLocation, compute_refined};
pub use stabilizer::{SessionId, Stabilizer, State};
pub use tracker::{AcquisitionMode, is_better};
