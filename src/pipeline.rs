//! Pipeline orchestration
//!
//! Wraps the feature computations into per-recording processors and maps them
//! over a batch of recordings. Every recording is processed independently:
//! a failure is reported in that recording's slot and never affects the others.
//!
//! Pipeline stages per recording:
//! 1. Schema resolution (channel families, participant id)
//! 2. Feature or target computation
//! 3. Wrapping into a timestamped `FeatureRecord`

use crate::baseline::BaselineCatalog;
use crate::config::{PhysioConfig, VideoConfig};
use crate::error::ComputeError;
use crate::features::FeatureDeriver;
use crate::physio::{
    compute_ecg_targets, compute_eda_targets, compute_participant_eda, EcgProcessor,
    EdaDecomposer, HrvSummarizer,
};
use crate::schema::RecordingTable;
use crate::types::{FeatureDictionary, FeatureRecord};
use chrono::Utc;
use std::path::Path;
use tracing::{info, warn};

/// A labelled recording ready for processing
#[derive(Debug, Clone)]
pub struct Recording {
    pub name: String,
    pub table: RecordingTable,
}

impl Recording {
    pub fn new(name: impl Into<String>, table: RecordingTable) -> Self {
        Self {
            name: name.into(),
            table,
        }
    }

    /// Read a CSV recording, labelled by its file stem.
    pub fn from_csv_path(path: &Path) -> Result<Self, ComputeError> {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, RecordingTable::from_csv_path(path)?))
    }
}

/// One recording in, one feature record out
pub trait RecordingProcessor: Sync {
    fn process(&self, recording: &Recording) -> Result<FeatureRecord, ComputeError>;
}

fn record(recording: &Recording, features: FeatureDictionary) -> FeatureRecord {
    FeatureRecord {
        recording: recording.name.clone(),
        computed_at: Utc::now(),
        features,
    }
}

/// Facial/pose feature processor
#[derive(Debug, Clone, Default)]
pub struct VideoProcessor {
    config: VideoConfig,
}

impl VideoProcessor {
    pub fn new(config: VideoConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VideoConfig {
        &self.config
    }
}

impl RecordingProcessor for VideoProcessor {
    fn process(&self, recording: &Recording) -> Result<FeatureRecord, ComputeError> {
        let features = FeatureDeriver::derive(&recording.table, &self.config)?;
        Ok(record(recording, features))
    }
}

/// Physiological target processor.
///
/// Holds the shared baseline catalog and the external capabilities. EDA and
/// ECG targets are each computed only when their capability is attached.
pub struct PhysioProcessor<'a> {
    config: PhysioConfig,
    baselines: &'a BaselineCatalog,
    eda: Option<&'a dyn EdaDecomposer>,
    ecg: Option<(&'a dyn EcgProcessor, &'a dyn HrvSummarizer)>,
}

impl<'a> PhysioProcessor<'a> {
    pub fn new(config: PhysioConfig, baselines: &'a BaselineCatalog) -> Self {
        Self {
            config,
            baselines,
            eda: None,
            ecg: None,
        }
    }

    pub fn with_eda(mut self, decomposer: &'a dyn EdaDecomposer) -> Self {
        self.eda = Some(decomposer);
        self
    }

    pub fn with_ecg(
        mut self,
        processor: &'a dyn EcgProcessor,
        summarizer: &'a dyn HrvSummarizer,
    ) -> Self {
        self.ecg = Some((processor, summarizer));
        self
    }

    /// Corrected EDA and/or ECG targets merged into one dictionary
    pub fn targets(&self, table: &RecordingTable) -> Result<FeatureDictionary, ComputeError> {
        if self.eda.is_none() && self.ecg.is_none() {
            return Err(ComputeError::ConfigError(
                "no EDA or ECG capability attached".to_string(),
            ));
        }

        let mut targets = FeatureDictionary::new();
        if let Some(decomposer) = self.eda {
            targets.merge(compute_eda_targets(
                table,
                self.baselines,
                decomposer,
                &self.config,
            )?);
        }
        if let Some((processor, summarizer)) = self.ecg {
            targets.merge(compute_ecg_targets(
                table,
                self.baselines,
                processor,
                summarizer,
                &self.config,
            )?);
        }
        Ok(targets)
    }

    /// SCL descriptives used to build participant baseline tables
    pub fn participant_eda(&self, recording: &Recording) -> Result<FeatureRecord, ComputeError> {
        let decomposer = self.eda.ok_or_else(|| {
            ComputeError::ConfigError("no EDA capability attached".to_string())
        })?;
        let features = compute_participant_eda(&recording.table, decomposer, &self.config)?;
        Ok(record(recording, features))
    }
}

impl RecordingProcessor for PhysioProcessor<'_> {
    fn process(&self, recording: &Recording) -> Result<FeatureRecord, ComputeError> {
        let targets = self.targets(&recording.table)?;
        Ok(record(recording, targets))
    }
}

fn process_one<P>(processor: &P, recording: &Recording) -> Result<FeatureRecord, ComputeError>
where
    P: RecordingProcessor + ?Sized,
{
    let result = processor.process(recording);
    match &result {
        Ok(record) => info!(
            recording = %recording.name,
            rows = recording.table.len(),
            features = record.features.len(),
            "processed recording"
        ),
        Err(e) => warn!(recording = %recording.name, error = %e, "recording failed"),
    }
    result
}

/// Process recordings one after another, preserving input order.
pub fn process_recordings<P>(
    processor: &P,
    recordings: &[Recording],
) -> Vec<Result<FeatureRecord, ComputeError>>
where
    P: RecordingProcessor + ?Sized,
{
    recordings
        .iter()
        .map(|recording| process_one(processor, recording))
        .collect()
}

/// Process recordings on the rayon pool, preserving input order.
#[cfg(feature = "parallel")]
pub fn process_recordings_parallel<P>(
    processor: &P,
    recordings: &[Recording],
) -> Vec<Result<FeatureRecord, ComputeError>>
where
    P: RecordingProcessor + ?Sized,
{
    use rayon::prelude::*;

    recordings
        .par_iter()
        .map(|recording| process_one(processor, recording))
        .collect()
}
