//! Configuration for stress-features.
//!
//! All file locations are explicit: nothing is derived from the process working
//! directory. Pure computations receive the relevant sub-config; only loaders
//! touch the filesystem.

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Locations of persisted baseline statistics
    pub paths: DataPaths,
    /// Facial feature settings
    pub video: VideoConfig,
    /// Physiological target settings
    pub physio: PhysioConfig,
}

/// Resolved directories holding the baseline statistic tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    /// Directory with the `PP_*SCL_*.csv` tables
    pub scl_stats_dir: PathBuf,
    /// Directory with the `PP_*_Baseline.csv` HRV tables
    pub hrv_stats_dir: PathBuf,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self::from_data_dir(Path::new("data"))
    }
}

impl DataPaths {
    /// Conventional layout below a dataset root: `information/SCL stats` and
    /// `information/HRV stats`.
    pub fn from_data_dir(data_dir: &Path) -> Self {
        let information = data_dir.join("information");
        Self {
            scl_stats_dir: information.join("SCL stats"),
            hrv_stats_dir: information.join("HRV stats"),
        }
    }
}

/// Facial feature settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Assumed frame rate of the facial table
    pub frame_rate_hz: f64,
    /// Length of the trailing baseline window
    pub rolling_window_secs: f64,
    /// Number of most active action units averaged for arousal
    pub arousal_top_k: usize,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            frame_rate_hz: 25.0,
            rolling_window_secs: 60.0,
            arousal_top_k: 5,
        }
    }
}

impl VideoConfig {
    /// Rolling window as a sample count
    pub fn window_samples(&self) -> usize {
        crate::normalizer::window_samples(self.rolling_window_secs, self.frame_rate_hz)
    }
}

/// Which signal is handed to an external decomposition capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecompositionInput {
    /// The full raw column, missing samples included
    RawColumn,
    /// The raw column with its own missing samples removed
    DropMissing,
}

/// Physiological target settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysioConfig {
    /// Seconds taken from each end of the tonic signal for the in-recording baseline
    pub edge_window_secs: u32,
    /// Decomposition input for EDA targets
    pub eda_input: DecompositionInput,
    /// Decomposition input for participant EDA descriptives
    pub participant_eda_input: DecompositionInput,
    /// Beat-detection input for ECG targets
    pub ecg_input: DecompositionInput,
}

impl Default for PhysioConfig {
    fn default() -> Self {
        Self {
            edge_window_secs: 30,
            eda_input: DecompositionInput::DropMissing,
            participant_eda_input: DecompositionInput::RawColumn,
            ecg_input: DecompositionInput::RawColumn,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file; absent keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ComputeError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ComputeError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ComputeError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ComputeError> {
        toml::to_string_pretty(self).map_err(|e| ComputeError::ConfigError(e.to_string()))
    }

    /// Reject settings that make window or rate computations meaningless
    pub fn validate(&self) -> Result<(), ComputeError> {
        if !(self.video.frame_rate_hz.is_finite() && self.video.frame_rate_hz > 0.0) {
            return Err(ComputeError::ConfigError(format!(
                "video.frame_rate_hz must be positive, got {}",
                self.video.frame_rate_hz
            )));
        }
        if !(self.video.rolling_window_secs.is_finite() && self.video.rolling_window_secs > 0.0) {
            return Err(ComputeError::ConfigError(format!(
                "video.rolling_window_secs must be positive, got {}",
                self.video.rolling_window_secs
            )));
        }
        if self.video.arousal_top_k == 0 {
            return Err(ComputeError::ConfigError(
                "video.arousal_top_k must be at least 1".to_string(),
            ));
        }
        if self.physio.edge_window_secs == 0 {
            return Err(ComputeError::ConfigError(
                "physio.edge_window_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.video.window_samples(), 1500);
        assert_eq!(config.physio.eda_input, DecompositionInput::DropMissing);
        assert_eq!(config.physio.ecg_input, DecompositionInput::RawColumn);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [video]
            frame_rate_hz = 30.0

            [physio]
            eda_input = "raw_column"
            "#,
        )
        .unwrap();

        assert_eq!(config.video.frame_rate_hz, 30.0);
        assert_eq!(config.video.arousal_top_k, 5);
        assert_eq!(config.physio.eda_input, DecompositionInput::RawColumn);
        assert_eq!(config.paths, DataPaths::default());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = Config::default();
        config.paths = DataPaths::from_data_dir(Path::new("/srv/study"));
        let text = config.to_toml().unwrap();
        assert_eq!(Config::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_invalid_rate_rejected() {
        let result = Config::from_toml("[video]\nframe_rate_hz = 0.0\n");
        assert!(matches!(result, Err(ComputeError::ConfigError(_))));
    }

    #[test]
    fn test_data_paths_layout() {
        let paths = DataPaths::from_data_dir(Path::new("/srv/study"));
        assert_eq!(paths.scl_stats_dir, PathBuf::from("/srv/study/information/SCL stats"));
        assert_eq!(paths.hrv_stats_dir, PathBuf::from("/srv/study/information/HRV stats"));
    }
}
