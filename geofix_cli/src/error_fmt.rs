//! Human-readable error descriptions and structured JSON error formatting.

use geofix_core::error::{BuildError, GeofixError, SensorErrorCode};

use crate::run::RunError;

/// Exit code when the engine never produced a stable position.
pub const EXIT_NOT_STABLE: i32 = 3;
/// Exit code when the position source reported a failure.
pub const EXIT_SENSOR: i32 = 4;

fn sensor_hint(code: SensorErrorCode) -> &'static str {
    match code {
        SensorErrorCode::PermissionDenied => {
            "Likely causes: Location access was refused for this process.\nHow to fix: Grant location permission, then start a new session."
        }
        SensorErrorCode::PositionUnavailable => {
            "Likely causes: No satellites or network fix available, or the receiver is disconnected.\nHow to fix: Move to open sky or check the receiver, then start a new session."
        }
        SensorErrorCode::Timeout => {
            "Likely causes: The receiver did not deliver a fix in time.\nHow to fix: Retry; if it persists, check the receiver and its antenna."
        }
        SensorErrorCode::Unsupported => {
            "Likely causes: This platform has no positioning capability.\nHow to fix: Run on a device with a positioning receiver."
        }
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSource => {
                "What happened: No position source was provided to the engine.\nLikely causes: The receiver failed to initialize or was not wired into the builder.\nHow to fix: Pass a source via with_source(...).".to_string()
            }
            BuildError::MissingPublisher => {
                "What happened: No event publisher was provided to the engine.\nLikely causes: The builder was not fully configured.\nHow to fix: Pass a publisher via with_publisher(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file (see `geofix check-config`), then rerun."
            ),
        };
    }

    if let Some(re) = err.downcast_ref::<RunError>() {
        return match re {
            RunError::NotStabilized(state) => format!(
                "What happened: No stable position was reached (engine ended in {state}).\nLikely causes: Readings never got accurate enough, or the trace ended before the stabilization timer.\nHow to fix: Provide more or better readings, replay without --no-drain, or raise --max-wait-ms."
            ),
            RunError::Interrupted => {
                "What happened: Interrupted before a stable position was reached.\nHow to fix: Rerun and let the session finish.".to_string()
            }
        };
    }

    if let Some(ge) = err.downcast_ref::<GeofixError>() {
        if let GeofixError::Sensor(f) = ge {
            return format!(
                "What happened: The position source failed ({}: {}).\n{}",
                f.code,
                f.message,
                sensor_hint(f.code)
            );
        }
        return format!(
            "What happened: {ge}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
        );
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("trace csv must have headers") {
        return "Invalid headers in trace CSV. Expected 'timestamp_ms,lat,lng,accuracy_m'.".to_string();
    }

    if lower.contains("read config") || lower.contains("invalid configuration in") {
        return format!(
            "What happened: The configuration could not be loaded.\nLikely causes: Wrong path or malformed TOML.\nHow to fix: Check the --config path and syntax. Original: {msg}"
        );
    }

    if lower.contains("must be") {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the TOML config and try again."
        );
    }

    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<RunError>().is_some() {
        return EXIT_NOT_STABLE;
    }
    if let Some(GeofixError::Sensor(_)) = err.downcast_ref::<GeofixError>() {
        return EXIT_SENSOR;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(re) = err.downcast_ref::<RunError>() {
        return match re {
            RunError::NotStabilized(_) => "NotStabilized",
            RunError::Interrupted => "Interrupted",
        };
    }
    if let Some(GeofixError::Sensor(_)) = err.downcast_ref::<GeofixError>() {
        return "Sensor";
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return "Config";
    }
    "Error"
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    if let Some(GeofixError::Sensor(f)) = err.downcast_ref::<GeofixError>() {
        return json!({
            "reason": reason_name(err),
            "details": { "code": f.code.name(), "code_num": f.code.code() },
            "message": humanize(err),
        })
        .to_string();
    }
    json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}
