//! Physiological target computation
//!
//! Turns one participant's EDA/ECG recording into corrected target variables.
//! Decomposition and beat detection are external capabilities; this module
//! derives the sampling rate, selects the signal handed to them, and applies
//! participant baseline corrections.
//!
//! Pipeline: table → rate/duration → capability → descriptive reduction →
//! baseline correction → feature dictionary

pub mod capability;
pub mod ecg;
pub mod eda;
pub mod hrv;

pub use capability::{
    EcgProcessor, EcgSignals, EdaDecomposer, EdaDecomposition, HrvIndices, HrvSummarizer,
    PrecomputedEcg, PrecomputedEda,
};
pub use ecg::compute_ecg_targets;
pub use eda::{compute_eda_targets, compute_participant_eda};
pub use hrv::TimeDomainHrv;

use crate::config::DecompositionInput;
use crate::error::ComputeError;
use crate::schema::{RecordingTable, PARTICIPANT_CHANNEL};
use crate::types::ParticipantId;

/// Raw electrodermal activity channel
pub const RAW_EDA_CHANNEL: &str = "raw_EDA";
/// Raw electrocardiogram channel
pub const RAW_ECG_CHANNEL: &str = "raw_ECG";

/// Sampling rate from the first inter-sample gap, rounded to whole hertz.
pub fn sampling_rate(timestamps: &[f64]) -> Result<u32, ComputeError> {
    if timestamps.len() < 2 {
        return Err(ComputeError::UndefinedFrequency(format!(
            "{} timestamped samples, at least 2 needed",
            timestamps.len()
        )));
    }
    let gap = timestamps[1] - timestamps[0];
    let rate = (1.0 / gap).round();
    if !rate.is_finite() || rate < 1.0 || rate > u32::MAX as f64 {
        return Err(ComputeError::UndefinedFrequency(format!(
            "first sample gap of {} s gives no usable rate",
            gap
        )));
    }
    Ok(rate as u32)
}

/// Participant id of a physiological table; absence is fatal.
pub fn participant_of(table: &RecordingTable) -> Result<ParticipantId, ComputeError> {
    table
        .participant()
        .ok_or_else(|| ComputeError::MissingChannel(PARTICIPANT_CHANNEL.to_string()))
}

/// Signal handed to a capability under the configured input policy
pub fn decomposition_input(raw: &[f64], input: DecompositionInput) -> Vec<f64> {
    match input {
        DecompositionInput::RawColumn => raw.to_vec(),
        DecompositionInput::DropMissing => raw.iter().copied().filter(|v| !v.is_nan()).collect(),
    }
}
