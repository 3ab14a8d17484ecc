use thiserror::Error;

/// Failure codes reported by the positioning collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorErrorCode {
    /// The platform has no positioning capability at all.
    Unsupported,
    PermissionDenied,
    PositionUnavailable,
    Timeout,
}

impl SensorErrorCode {
    /// Numeric code as reported by geolocation APIs (-1 for unsupported).
    pub fn code(self) -> i32 {
        match self {
            Self::Unsupported => -1,
            Self::PermissionDenied => 1,
            Self::PositionUnavailable => 2,
            Self::Timeout => 3,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::Unsupported),
            1 => Some(Self::PermissionDenied),
            2 => Some(Self::PositionUnavailable),
            3 => Some(Self::Timeout),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Unsupported => "UNSUPPORTED",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::PositionUnavailable => "POSITION_UNAVAILABLE",
            Self::Timeout => "TIMEOUT",
        }
    }
}

impl std::fmt::Display for SensorErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A failure pushed by (or derived from) the positioning collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct SensorFailure {
    pub code: SensorErrorCode,
    pub message: String,
}

impl SensorFailure {
    pub fn new(code: SensorErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Why a raw reading was dropped. Rejections are never escalated.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("non-finite coordinate")]
    NonFiniteCoordinate,
    #[error("coordinate out of range")]
    CoordinateOutOfRange,
    #[error("accuracy must be a positive number")]
    NonPositiveAccuracy,
    #[error("accuracy coarser than the reasonable maximum")]
    AccuracyTooCoarse,
}

#[derive(Debug, Error, Clone)]
pub enum GeofixError {
    #[error("sensor failure: {0}")]
    Sensor(SensorFailure),
    #[error("invalid state: {0}")]
    State(String),
    #[error("engine stopped")]
    Disconnected,
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing position source")]
    MissingSource,
    #[error("missing publisher")]
    MissingPublisher,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
