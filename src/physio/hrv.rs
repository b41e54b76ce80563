//! Time-domain HRV from R-peak positions

use super::capability::{EcgSignals, HrvIndices, HrvSummarizer};
use crate::aggregate;
use crate::error::ComputeError;

/// Minimum number of R peaks for interval-related indices
const MIN_PEAKS: usize = 3;

/// MeanNN, SDNN (sample) and RMSSD over all NN intervals of a recording
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeDomainHrv;

impl TimeDomainHrv {
    /// NN intervals in milliseconds
    pub fn nn_intervals(r_peaks: &[usize], sampling_rate: u32) -> Vec<f64> {
        let ms_per_sample = 1000.0 / sampling_rate as f64;
        r_peaks
            .windows(2)
            .map(|w| (w[1] as f64 - w[0] as f64) * ms_per_sample)
            .collect()
    }
}

impl HrvSummarizer for TimeDomainHrv {
    fn interval_related(
        &self,
        signals: &EcgSignals,
        sampling_rate: u32,
    ) -> Result<HrvIndices, ComputeError> {
        if sampling_rate == 0 {
            return Err(ComputeError::UndefinedFrequency(
                "sampling rate is zero".to_string(),
            ));
        }
        if signals.r_peaks.len() < MIN_PEAKS {
            return Err(ComputeError::DecompositionFailure(format!(
                "{} R peaks detected, at least {} needed",
                signals.r_peaks.len(),
                MIN_PEAKS
            )));
        }
        if signals.r_peaks.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ComputeError::DecompositionFailure(
                "R peaks are not strictly increasing".to_string(),
            ));
        }

        let nn = Self::nn_intervals(&signals.r_peaks, sampling_rate);
        let successive: Vec<f64> = nn.windows(2).map(|w| (w[1] - w[0]).powi(2)).collect();

        Ok(HrvIndices {
            mean_nn: aggregate::mean(&nn),
            sdnn: aggregate::std(&nn),
            rmssd: aggregate::mean(&successive).sqrt(),
        })
    }
}
