//! Baseline-corrected heart-rate-variability targets

use super::capability::{EcgProcessor, HrvSummarizer};
use super::{decomposition_input, participant_of, sampling_rate, RAW_ECG_CHANNEL};
use crate::baseline::{BaselineCatalog, BaselineStatistic};
use crate::config::PhysioConfig;
use crate::error::ComputeError;
use crate::schema::{RecordingTable, TIME_CHANNEL};
use crate::types::FeatureDictionary;
use tracing::debug;

/// HRV_MeanNN, HRV_RMSSD and HRV_SDNN of one task recording, each with a
/// `_corrected` counterpart relative to the participant's resting baseline.
pub fn compute_ecg_targets(
    table: &RecordingTable,
    baselines: &BaselineCatalog,
    processor: &dyn EcgProcessor,
    summarizer: &dyn HrvSummarizer,
    config: &PhysioConfig,
) -> Result<FeatureDictionary, ComputeError> {
    let participant = participant_of(table)?;

    let mean_nn_baseline = baselines.lookup(BaselineStatistic::MeanNnBaseline, &participant)?;
    let rmssd_baseline = baselines.lookup(BaselineStatistic::RmssdBaseline, &participant)?;
    let sdnn_baseline = baselines.lookup(BaselineStatistic::SdnnBaseline, &participant)?;

    let raw = table.require(RAW_ECG_CHANNEL)?;
    let rate = sampling_rate(table.require(TIME_CHANNEL)?)?;

    let input = decomposition_input(raw, config.ecg_input);
    let signals = processor.process(&input, rate)?;
    let hrv = summarizer.interval_related(&signals, rate)?;
    debug!(
        %participant,
        rate,
        beats = signals.r_peaks.len(),
        mean_nn = hrv.mean_nn,
        "summarized HRV"
    );

    let mut processed = FeatureDictionary::for_participant(participant);
    processed.insert("HRV_MeanNN", hrv.mean_nn);
    processed.insert("HRV_RMSSD", hrv.rmssd);
    processed.insert("HRV_SDNN", hrv.sdnn);
    processed.insert("HRV_MeanNN_corrected", hrv.mean_nn - mean_nn_baseline);
    processed.insert("HRV_RMSSD_corrected", hrv.rmssd - rmssd_baseline);
    processed.insert("HRV_SDNN_corrected", hrv.sdnn - sdnn_baseline);
    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::BaselineTable;
    use crate::config::DecompositionInput;
    use crate::physio::capability::{EcgSignals, HrvIndices};
    use crate::physio::hrv::TimeDomainHrv;
    use crate::types::ParticipantId;
    use std::sync::Mutex;

    /// Beats every `spacing` samples over the whole input
    struct RegularBeats {
        spacing: usize,
    }

    impl EcgProcessor for RegularBeats {
        fn process(&self, raw: &[f64], _rate: u32) -> Result<EcgSignals, ComputeError> {
            Ok(EcgSignals {
                cleaned: raw.to_vec(),
                r_peaks: (0..raw.len()).step_by(self.spacing).collect(),
            })
        }
    }

    /// Records the input length it was handed
    #[derive(Default)]
    struct LengthRecorder {
        seen: Mutex<Option<usize>>,
    }

    impl EcgProcessor for LengthRecorder {
        fn process(&self, raw: &[f64], _rate: u32) -> Result<EcgSignals, ComputeError> {
            *self.seen.lock().unwrap() = Some(raw.len());
            Ok(EcgSignals {
                cleaned: raw.to_vec(),
                r_peaks: vec![0, 8, 16],
            })
        }
    }

    struct FixedHrv(HrvIndices);

    impl HrvSummarizer for FixedHrv {
        fn interval_related(
            &self,
            _signals: &EcgSignals,
            _rate: u32,
        ) -> Result<HrvIndices, ComputeError> {
            Ok(self.0)
        }
    }

    fn catalog(pp: &str) -> BaselineCatalog {
        let id = ParticipantId::new(pp);
        BaselineCatalog::new()
            .with_table(BaselineTable::with_values(
                BaselineStatistic::MeanNnBaseline,
                [(id.clone(), 800.0)],
            ))
            .with_table(BaselineTable::with_values(
                BaselineStatistic::RmssdBaseline,
                [(id.clone(), 40.0)],
            ))
            .with_table(BaselineTable::with_values(
                BaselineStatistic::SdnnBaseline,
                [(id, 50.0)],
            ))
    }

    /// 10 Hz, 4 s of ECG
    fn recording(pp: &str) -> RecordingTable {
        let n = 40;
        RecordingTable::from_columns(vec![
            ("t_from_start", (0..n).map(|i| i as f64 * 0.1).collect()),
            ("raw_ECG", vec![0.0; n]),
        ])
        .unwrap()
        .with_text_channel("pp", vec![pp.to_string(); n])
        .unwrap()
    }

    #[test]
    fn test_corrections_subtract_baseline() {
        let summarizer = FixedHrv(HrvIndices {
            mean_nn: 820.0,
            rmssd: 35.0,
            sdnn: 55.0,
        });
        let targets = compute_ecg_targets(
            &recording("7"),
            &catalog("7"),
            &RegularBeats { spacing: 8 },
            &summarizer,
            &PhysioConfig::default(),
        )
        .unwrap();

        assert_eq!(targets.participant, Some(ParticipantId::new("7")));
        assert_eq!(targets.get("HRV_MeanNN"), Some(820.0));
        assert_eq!(targets.get("HRV_MeanNN_corrected"), Some(20.0));
        assert_eq!(targets.get("HRV_RMSSD_corrected"), Some(-5.0));
        assert_eq!(targets.get("HRV_SDNN_corrected"), Some(5.0));
        assert_eq!(targets.len(), 6);
    }

    #[test]
    fn test_time_domain_summary_through_targets() {
        // beat every 8 samples at 10 Hz -> 800 ms, no variability
        let targets = compute_ecg_targets(
            &recording("7"),
            &catalog("7"),
            &RegularBeats { spacing: 8 },
            &TimeDomainHrv,
            &PhysioConfig::default(),
        )
        .unwrap();

        assert_eq!(targets.get("HRV_MeanNN"), Some(800.0));
        assert_eq!(targets.get("HRV_MeanNN_corrected"), Some(0.0));
        assert_eq!(targets.get("HRV_SDNN_corrected"), Some(-50.0));
    }

    #[test]
    fn test_input_policy_controls_processor_length() {
        let mut ecg = vec![0.0; 40];
        ecg[3] = f64::NAN;
        ecg[17] = f64::NAN;
        let table = RecordingTable::from_columns(vec![
            ("t_from_start", (0..40).map(|i| i as f64 * 0.1).collect()),
            ("raw_ECG", ecg),
        ])
        .unwrap()
        .with_text_channel("pp", vec!["7".to_string(); 40])
        .unwrap();

        let mut config = PhysioConfig::default();
        assert_eq!(config.ecg_input, DecompositionInput::RawColumn);
        let raw = LengthRecorder::default();
        compute_ecg_targets(&table, &catalog("7"), &raw, &TimeDomainHrv, &config).unwrap();
        assert_eq!(*raw.seen.lock().unwrap(), Some(40));

        config.ecg_input = DecompositionInput::DropMissing;
        let dropped = LengthRecorder::default();
        let targets =
            compute_ecg_targets(&table, &catalog("7"), &dropped, &TimeDomainHrv, &config).unwrap();
        assert_eq!(*dropped.seen.lock().unwrap(), Some(38));
        // beats 8 samples apart at 10 Hz
        assert_eq!(targets.get("HRV_MeanNN"), Some(800.0));
    }

    #[test]
    fn test_unknown_participant() {
        let result = compute_ecg_targets(
            &recording("12"),
            &catalog("7"),
            &RegularBeats { spacing: 8 },
            &TimeDomainHrv,
            &PhysioConfig::default(),
        );
        assert!(matches!(
            result,
            Err(ComputeError::MissingBaseline {
                statistic: BaselineStatistic::MeanNnBaseline,
                ..
            })
        ));
    }

    #[test]
    fn test_missing_statistic_table() {
        let catalog = BaselineCatalog::new().with_table(BaselineTable::with_values(
            BaselineStatistic::MeanNnBaseline,
            [(ParticipantId::new("7"), 800.0)],
        ));
        let result = compute_ecg_targets(
            &recording("7"),
            &catalog,
            &RegularBeats { spacing: 8 },
            &TimeDomainHrv,
            &PhysioConfig::default(),
        );
        assert!(matches!(
            result,
            Err(ComputeError::BaselineUnavailable(BaselineStatistic::RmssdBaseline))
        ));
    }

    #[test]
    fn test_missing_ecg_channel() {
        let table = RecordingTable::from_columns(vec![("t_from_start", vec![0.0, 0.1])])
            .unwrap()
            .with_text_channel("pp", vec!["7".to_string(); 2])
            .unwrap();
        let result = compute_ecg_targets(
            &table,
            &catalog("7"),
            &RegularBeats { spacing: 8 },
            &TimeDomainHrv,
            &PhysioConfig::default(),
        );
        assert!(matches!(result, Err(ComputeError::MissingChannel(c)) if c == "raw_ECG"));
    }
}
