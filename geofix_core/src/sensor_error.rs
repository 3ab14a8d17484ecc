//! Maps `Box<dyn Error>` from the `PositionSource` boundary to `SensorFailure`.
//!
//! Collaborators report failures however they like. Typed values are
//! recognised first (`SensorFailure` itself, then `std::io::Error` kinds),
//! after which the message text decides.

use crate::error::{SensorErrorCode, SensorFailure};
use std::io::ErrorKind;

/// Map a trait-boundary error to a typed `SensorFailure`.
pub fn map_source_error(e: &(dyn std::error::Error + 'static)) -> SensorFailure {
    // A typed failure anywhere in the source chain wins.
    if let Some(f) = std::iter::successors(Some(e), |e| e.source())
        .find_map(|e| e.downcast_ref::<SensorFailure>())
    {
        return f.clone();
    }
    if let Some(io) = e.downcast_ref::<std::io::Error>() {
        let code = match io.kind() {
            ErrorKind::PermissionDenied => Some(SensorErrorCode::PermissionDenied),
            ErrorKind::TimedOut => Some(SensorErrorCode::Timeout),
            ErrorKind::Unsupported => Some(SensorErrorCode::Unsupported),
            ErrorKind::NotFound | ErrorKind::NotConnected => {
                Some(SensorErrorCode::PositionUnavailable)
            }
            _ => None,
        };
        if let Some(code) = code {
            return SensorFailure::new(code, io.to_string());
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    let lower = s.to_lowercase();
    let code = if lower.contains("permission") || lower.contains("denied") {
        SensorErrorCode::PermissionDenied
    } else if lower.contains("timeout") || lower.contains("timed out") {
        SensorErrorCode::Timeout
    } else if lower.contains("unsupported") || lower.contains("not supported") {
        SensorErrorCode::Unsupported
    } else {
        SensorErrorCode::PositionUnavailable
    };
    SensorFailure::new(code, s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::PermissionDenied, SensorErrorCode::PermissionDenied)]
    #[case(ErrorKind::TimedOut, SensorErrorCode::Timeout)]
    #[case(ErrorKind::Unsupported, SensorErrorCode::Unsupported)]
    #[case(ErrorKind::NotFound, SensorErrorCode::PositionUnavailable)]
    fn io_kinds_map(#[case] kind: ErrorKind, #[case] want: SensorErrorCode) {
        let e = std::io::Error::new(kind, "x");
        assert_eq!(map_source_error(&e).code, want);
    }

    #[rstest]
    #[case("User denied Geolocation", SensorErrorCode::PermissionDenied)]
    #[case("Timeout expired", SensorErrorCode::Timeout)]
    #[case("geolocation not supported", SensorErrorCode::Unsupported)]
    #[case("no satellites", SensorErrorCode::PositionUnavailable)]
    fn messages_map(#[case] msg: &str, #[case] want: SensorErrorCode) {
        let e = std::io::Error::other(msg.to_string());
        let f = map_source_error(&e);
        assert_eq!(f.code, want);
        assert_eq!(f.message, msg);
    }

    #[test]
    fn typed_failure_passes_through() {
        let f = SensorFailure::new(SensorErrorCode::Timeout, "gps cold");
        let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(f.clone());
        assert_eq!(map_source_error(boxed.as_ref()), f);
    }
}
