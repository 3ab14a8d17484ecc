use geofix_core::error::SensorFailure;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulated receiver refused to start")]
    Refused(#[source] SensorFailure),
    #[error("invalid simulation parameter: {0}")]
    InvalidParam(&'static str),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
