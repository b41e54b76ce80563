//! Error types for stress-features

use thiserror::Error;

use crate::baseline::BaselineStatistic;
use crate::types::ParticipantId;

/// Errors that can occur during computation
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Missing required channel: {0}")]
    MissingChannel(String),

    #[error("No {statistic} baseline for participant {participant}")]
    MissingBaseline {
        statistic: BaselineStatistic,
        participant: ParticipantId,
    },

    #[error("Baseline table not loaded: {0}")]
    BaselineUnavailable(BaselineStatistic),

    #[error("Sampling frequency undefined: {0}")]
    UndefinedFrequency(String),

    #[error("Signal decomposition failed: {0}")]
    DecompositionFailure(String),

    #[error("Failed to parse table: {0}")]
    ParseError(String),

    #[error("Invalid table schema: {0}")]
    SchemaError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ComputeError {
    /// Whether the error only degrades a feature rather than invalidating the recording.
    ///
    /// Feature derivation turns these into `NaN` features instead of failing.
    pub fn is_degradable(&self) -> bool {
        matches!(self, ComputeError::MissingChannel(_))
    }
}
