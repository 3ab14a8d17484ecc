//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use geofix_core::SensorErrorCode;
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "geofix", version, about = "Position acquisition and stabilization engine")]
pub struct Cli {
    /// Path to config TOML; stock settings are used when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Emit events, results and errors as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG overrides
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Failure a simulated receiver can be told to report on start.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum FailKind {
    PermissionDenied,
    Unavailable,
    Timeout,
    Unsupported,
}

impl From<FailKind> for SensorErrorCode {
    fn from(k: FailKind) -> Self {
        match k {
            FailKind::PermissionDenied => Self::PermissionDenied,
            FailKind::Unavailable => Self::PositionUnavailable,
            FailKind::Timeout => Self::Timeout,
            FailKind::Unsupported => Self::Unsupported,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a recorded reading trace deterministically
    Replay {
        /// Trace CSV (timestamp_ms,lat,lng,accuracy_m[,altitude,...])
        #[arg(long, value_name = "FILE")]
        trace: PathBuf,
        /// Do not fire outstanding timers after the last reading
        #[arg(long, action = ArgAction::SetTrue)]
        no_drain: bool,
    },
    /// Run the engine against the simulated receiver in real time
    Simulate {
        /// Give up after this many milliseconds
        #[arg(long, value_name = "MS", default_value_t = 60_000)]
        max_wait_ms: u64,
        /// Make the receiver fail on start with the given error
        #[arg(long, value_enum, value_name = "KIND")]
        fail_start: Option<FailKind>,
    },
    /// Load and validate the config, then print the effective engine settings
    CheckConfig,
    /// Replay a built-in synthetic trace and verify it stabilizes
    SelfCheck,
}
