//! External signal-processing capabilities
//!
//! Tonic/phasic EDA decomposition, ECG cleaning with R-peak detection and
//! interval-related HRV summaries are supplied by a third-party toolkit. The
//! target computer only depends on these traits. Any failure is reported as
//! `DecompositionFailure` and propagated unchanged.

use crate::error::ComputeError;
use crate::schema::RecordingTable;
use serde::{Deserialize, Serialize};

/// Output of a tonic/phasic EDA decomposition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdaDecomposition {
    /// Tonic component (skin conductance level), one value per input sample
    pub tonic: Vec<f64>,
    /// Sample indices of detected phasic peaks (skin conductance responses)
    pub scr_peaks: Vec<usize>,
}

/// Cleaned ECG with detected beats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcgSignals {
    pub cleaned: Vec<f64>,
    /// Sample indices of R peaks, ascending
    pub r_peaks: Vec<usize>,
}

/// Interval-related heart-rate-variability indices (milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HrvIndices {
    pub mean_nn: f64,
    pub rmssd: f64,
    pub sdnn: f64,
}

pub trait EdaDecomposer: Send + Sync {
    fn decompose(&self, raw: &[f64], sampling_rate: u32) -> Result<EdaDecomposition, ComputeError>;
}

pub trait EcgProcessor: Send + Sync {
    fn process(&self, raw: &[f64], sampling_rate: u32) -> Result<EcgSignals, ComputeError>;
}

pub trait HrvSummarizer: Send + Sync {
    fn interval_related(
        &self,
        signals: &EcgSignals,
        sampling_rate: u32,
    ) -> Result<HrvIndices, ComputeError>;
}

/// Column names the external toolkit writes for its EDA output
pub const EDA_TONIC_CHANNEL: &str = "EDA_Tonic";
pub const SCR_PEAKS_CHANNEL: &str = "SCR_Peaks";
/// Column names the external toolkit writes for its ECG output
pub const ECG_CLEAN_CHANNEL: &str = "ECG_Clean";
pub const ECG_R_PEAKS_CHANNEL: &str = "ECG_R_Peaks";

/// Indices of samples flagged with 1 in a 0/1 marker channel
fn flagged_indices(markers: &[f64]) -> Vec<usize> {
    markers
        .iter()
        .enumerate()
        .filter(|(_, &v)| v == 1.0)
        .map(|(i, _)| i)
        .collect()
}

/// EDA decomposition exported by the external toolkit ahead of time.
///
/// The export must cover exactly the samples handed to [`EdaDecomposer::decompose`].
#[derive(Debug, Clone, PartialEq)]
pub struct PrecomputedEda {
    decomposition: EdaDecomposition,
}

impl PrecomputedEda {
    pub fn new(decomposition: EdaDecomposition) -> Self {
        Self { decomposition }
    }

    /// Read `EDA_Tonic` and the `SCR_Peaks` marker channel from an export table.
    pub fn from_table(table: &RecordingTable) -> Result<Self, ComputeError> {
        let tonic = table.require(EDA_TONIC_CHANNEL)?.to_vec();
        let scr_peaks = flagged_indices(table.require(SCR_PEAKS_CHANNEL)?);
        Ok(Self::new(EdaDecomposition { tonic, scr_peaks }))
    }
}

impl EdaDecomposer for PrecomputedEda {
    fn decompose(&self, raw: &[f64], _sampling_rate: u32) -> Result<EdaDecomposition, ComputeError> {
        if raw.len() != self.decomposition.tonic.len() {
            return Err(ComputeError::DecompositionFailure(format!(
                "precomputed EDA covers {} samples, signal has {}",
                self.decomposition.tonic.len(),
                raw.len()
            )));
        }
        Ok(self.decomposition.clone())
    }
}

/// ECG processing exported by the external toolkit ahead of time.
#[derive(Debug, Clone, PartialEq)]
pub struct PrecomputedEcg {
    signals: EcgSignals,
}

impl PrecomputedEcg {
    pub fn new(signals: EcgSignals) -> Self {
        Self { signals }
    }

    /// Read `ECG_Clean` and the `ECG_R_Peaks` marker channel from an export table.
    pub fn from_table(table: &RecordingTable) -> Result<Self, ComputeError> {
        let cleaned = table.require(ECG_CLEAN_CHANNEL)?.to_vec();
        let r_peaks = flagged_indices(table.require(ECG_R_PEAKS_CHANNEL)?);
        Ok(Self::new(EcgSignals { cleaned, r_peaks }))
    }
}

impl EcgProcessor for PrecomputedEcg {
    fn process(&self, raw: &[f64], _sampling_rate: u32) -> Result<EcgSignals, ComputeError> {
        if raw.len() != self.signals.cleaned.len() {
            return Err(ComputeError::DecompositionFailure(format!(
                "precomputed ECG covers {} samples, signal has {}",
                self.signals.cleaned.len(),
                raw.len()
            )));
        }
        Ok(self.signals.clone())
    }
}
