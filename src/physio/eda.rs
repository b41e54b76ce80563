//! Electrodermal activity targets
//!
//! Two computations share the tonic decomposition:
//! - participant descriptives of the skin conductance level, used upstream to
//!   build baseline tables
//! - corrected task targets, normalised with those persisted baselines

use super::capability::EdaDecomposer;
use super::{
    decomposition_input, participant_of, sampling_rate, RAW_ECG_CHANNEL, RAW_EDA_CHANNEL,
};
use crate::aggregate;
use crate::baseline::{BaselineCatalog, BaselineStatistic};
use crate::config::PhysioConfig;
use crate::error::ComputeError;
use crate::schema::{RecordingTable, TIME_CHANNEL};
use crate::types::FeatureDictionary;
use tracing::debug;

/// Mean of the first and last `edge_secs` of the tonic signal, concatenated.
///
/// Windows longer than the signal cover the whole signal. A zero-length window
/// takes an empty head and the whole signal as tail, like a `[-0:]` slice.
pub fn edge_baseline(tonic: &[f64], sampling_rate: u32, edge_secs: u32) -> f64 {
    let n = (edge_secs as usize).saturating_mul(sampling_rate as usize);
    let head = &tonic[..n.min(tonic.len())];
    let tail = if n == 0 {
        tonic
    } else {
        &tonic[tonic.len().saturating_sub(n)..]
    };
    let joined: Vec<f64> = head.iter().chain(tail).copied().collect();
    aggregate::mean(&joined)
}

/// SCL descriptives of one recording: `mean_SCL`, `std_SCL`, `max_SCL`,
/// `min_SCL` and the in-recording `mean_SCL_Baseline`.
pub fn compute_participant_eda(
    table: &RecordingTable,
    decomposer: &dyn EdaDecomposer,
    config: &PhysioConfig,
) -> Result<FeatureDictionary, ComputeError> {
    let participant = participant_of(table)?;
    let raw = table.require(RAW_EDA_CHANNEL)?;
    let rate = sampling_rate(table.require(TIME_CHANNEL)?)?;

    let input = decomposition_input(raw, config.participant_eda_input);
    let decomposition = decomposer.decompose(&input, rate)?;
    let tonic = &decomposition.tonic;
    debug!(%participant, rate, samples = input.len(), "decomposed EDA for descriptives");

    let mut processed = FeatureDictionary::for_participant(participant);
    processed.insert("mean_SCL", aggregate::mean(tonic));
    processed.insert("std_SCL", aggregate::std(tonic));
    processed.insert("max_SCL", aggregate::max(tonic));
    processed.insert("min_SCL", aggregate::min(tonic));
    processed.insert(
        "mean_SCL_Baseline",
        edge_baseline(tonic, rate, config.edge_window_secs),
    );
    Ok(processed)
}

/// Corrected EDA targets for one task recording.
///
/// All five baseline statistics are looked up before any signal work; a
/// missing participant aborts the recording.
pub fn compute_eda_targets(
    table: &RecordingTable,
    baselines: &BaselineCatalog,
    decomposer: &dyn EdaDecomposer,
    config: &PhysioConfig,
) -> Result<FeatureDictionary, ComputeError> {
    let participant = participant_of(table)?;

    let mean_baseline = baselines.lookup(BaselineStatistic::MeanSclBaseline, &participant)?;
    let min_baseline = baselines.lookup(BaselineStatistic::MinSclBaseline, &participant)?;
    let mean_all = baselines.lookup(BaselineStatistic::MeanSclAll, &participant)?;
    let std_all = baselines.lookup(BaselineStatistic::StdSclAll, &participant)?;
    let max_all = baselines.lookup(BaselineStatistic::MaxSclAll, &participant)?;

    let raw = table.require(RAW_EDA_CHANNEL)?;
    table.require(TIME_CHANNEL)?;

    // EDA and ECG are sampled at different rates; rows missing either are gaps
    let valid = table.drop_missing(&[RAW_EDA_CHANNEL, RAW_ECG_CHANNEL, TIME_CHANNEL]);
    let timestamps = valid.require(TIME_CHANNEL)?;
    let rate = sampling_rate(timestamps)?;
    let seconds = aggregate::duration_seconds(timestamps);

    let input = decomposition_input(raw, config.eda_input);
    let decomposition = decomposer.decompose(&input, rate)?;
    let tonic = &decomposition.tonic;
    debug!(
        %participant,
        rate,
        seconds,
        samples = input.len(),
        peaks = decomposition.scr_peaks.len(),
        "decomposed EDA for targets"
    );

    let range_scaled: Vec<f64> = tonic
        .iter()
        .map(|v| (v - min_baseline) / (max_all - min_baseline))
        .collect();
    let standardised: Vec<f64> = tonic.iter().map(|v| (v - mean_all) / std_all).collect();

    let mean_scl = aggregate::mean(tonic);
    let mut processed = FeatureDictionary::for_participant(participant);
    processed.insert("mean_SCL", mean_scl);
    processed.insert("corrected_mean_SCL", mean_scl - mean_baseline);
    processed.insert("range_corrected_mean_SCL", aggregate::mean(&range_scaled));
    processed.insert("standardised_mean_scl", aggregate::mean(&standardised));
    processed.insert(
        "frequency_NS_SCR",
        decomposition.scr_peaks.len() as f64 / seconds * 60.0,
    );
    Ok(processed)
}
