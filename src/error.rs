//! Engine error types

use std::time::Duration;
use thiserror::Error;

/// Errors returned synchronously by the progress engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A run was requested with a zero or negative duration
    #[error("invalid duration: {0} (must be greater than zero)")]
    InvalidDuration(String),

    /// The sampling cadence is outside of (0, 1s]
    #[error("invalid sample interval: {0:?} (must be between 1ms and 1s)")]
    InvalidSampleInterval(Duration),
}

impl EngineError {
    /// Whether the error was caused by caller input rather than configuration
    pub fn is_invalid_duration(&self) -> bool {
        matches!(self, EngineError::InvalidDuration(_))
    }
}
