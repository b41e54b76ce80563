//! stress-features - Batch feature engine for stress-study recordings
//!
//! Turns facial action-unit / head-pose / eye-landmark tables and EDA / ECG
//! recordings into fixed-size feature dictionaries through a deterministic
//! pipeline: schema resolution → rolling baseline normalization → geometry →
//! descriptive aggregation → participant baseline correction.
//!
//! ## Modules
//!
//! - **Facial features**: head motion, emotion composites, arousal, action-unit
//!   statistics, blinks and pupil diameter ([`features`])
//! - **Physiological targets**: baseline-corrected EDA and HRV targets over
//!   external decomposition capabilities ([`physio`])

pub mod aggregate;
pub mod baseline;
pub mod config;
pub mod error;
pub mod features;
pub mod geometry;
pub mod normalizer;
pub mod physio;
pub mod pipeline;
pub mod schema;
pub mod types;

pub use baseline::{BaselineCatalog, BaselineStatistic, BaselineTable, Reduction};
pub use config::{Config, DataPaths, DecompositionInput, PhysioConfig, VideoConfig};
pub use error::ComputeError;
pub use features::FeatureDeriver;
pub use pipeline::{process_recordings, PhysioProcessor, Recording, RecordingProcessor, VideoProcessor};
pub use schema::{ChannelMap, RecordingTable};
pub use types::{FeatureDictionary, FeatureRecord, ParticipantId};

#[cfg(feature = "parallel")]
pub use pipeline::process_recordings_parallel;

/// Crate version embedded in CLI reports
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for CLI reports
pub const PRODUCER_NAME: &str = "stress-features";
