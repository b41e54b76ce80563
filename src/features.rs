//! Facial feature derivation
//!
//! This module reduces one facial/pose recording to scalar features:
//! - Head motion variability and compound translation motion
//! - Emotion composites from action-unit intensities
//! - Arousal from the most activated baseline-corrected units
//! - Per-unit level, change and variability
//! - Blink rate, eye-closure fraction and pupil diameter
//!
//! Missing channel families degrade the dependent features to `NaN`; the
//! remaining features are still produced.

use crate::aggregate;
use crate::config::VideoConfig;
use crate::error::ComputeError;
use crate::geometry;
use crate::normalizer;
use crate::schema::{ChannelMap, RecordingTable, BLINK_CHANNEL, TIME_CHANNEL};
use crate::types::FeatureDictionary;
use tracing::{debug, warn};

/// Action units composing each emotion
pub const EMOTIONS: [(&str, &[&str]); 4] = [
    ("Happy", &["AU06", "AU12"]),
    ("Sad", &["AU01", "AU04", "AU15"]),
    ("Angry", &["AU04", "AU05", "AU07", "AU23"]),
    ("Scared", &["AU01", "AU02", "AU04", "AU05", "AU07", "AU20", "AU26"]),
];

/// Feature deriver for one facial recording
pub struct FeatureDeriver;

impl FeatureDeriver {
    /// Resolve the channel families once, then run every feature group.
    ///
    /// Missing channels degrade features to `NaN`; any other error aborts.
    pub fn derive(
        table: &RecordingTable,
        config: &VideoConfig,
    ) -> Result<FeatureDictionary, ComputeError> {
        let channels = ChannelMap::resolve(table);
        let window = config.window_samples();

        let mut features = FeatureDictionary::new();
        features.merge(head_motion(table, &channels));
        features.merge(emotions(table));
        features.merge(arousal(table, &channels, window, config.arousal_top_k));
        features.merge(mean_action_units(table, &channels, window));
        features.merge(std_action_units(table, &channels));
        features.merge(blink_rate(table, &channels));
        features.merge(percentage_eyes_closed(table, &channels));
        features.merge(pupil_features(table, &channels)?);

        debug!(
            rows = table.len(),
            features = features.len(),
            window,
            "derived facial features"
        );
        Ok(features)
    }
}

fn columns<'a>(table: &'a RecordingTable, names: &[String]) -> Vec<&'a [f64]> {
    names.iter().filter_map(|n| table.channel(n)).collect()
}

/// `std_<channel>` per pose axis and `compound_Motion` over the translation axes
pub fn head_motion(table: &RecordingTable, channels: &ChannelMap) -> FeatureDictionary {
    let mut features = FeatureDictionary::new();
    for name in &channels.pose {
        if let Some(signal) = table.channel(name) {
            features.insert(format!("std_{}", name), aggregate::std(signal));
        }
    }
    let translation = columns(table, &channels.pose_translation);
    features.insert("compound_Motion", aggregate::compound_motion(&translation));
    features
}

/// `mean_<Emotion>`: mean over frames of the average of the emotion's units.
///
/// An emotion with any unit absent is `NaN`.
pub fn emotions(table: &RecordingTable) -> FeatureDictionary {
    let mut features = FeatureDictionary::new();
    for (emotion, units) in EMOTIONS {
        let signals: Option<Vec<&[f64]>> = units
            .iter()
            .map(|unit| table.channel(&format!("{}_r", unit)))
            .collect();
        let value = match signals {
            Some(signals) => aggregate::row_mean(&signals),
            None => {
                warn!(emotion, "action units missing for emotion");
                f64::NAN
            }
        };
        features.insert(format!("mean_{}", emotion), value);
    }
    features
}

/// `mean_Arousal`: baseline-corrected intensities clamped at zero, then the
/// mean of the `top_k` largest units per frame.
pub fn arousal(
    table: &RecordingTable,
    channels: &ChannelMap,
    window: usize,
    top_k: usize,
) -> FeatureDictionary {
    let raw = columns(table, &channels.arousal_channels());
    let clamped: Vec<Vec<f64>> = normalizer::normalize_channels(&raw, window)
        .into_iter()
        .map(|signal| signal.into_iter().map(clamp_negative).collect())
        .collect();
    let views: Vec<&[f64]> = clamped.iter().map(Vec::as_slice).collect();

    let mut features = FeatureDictionary::new();
    features.insert("mean_Arousal", aggregate::top_k_mean(&views, top_k));
    features
}

/// Negative values become zero; NaN is kept so reductions still see it.
fn clamp_negative(value: f64) -> f64 {
    if value < 0.0 {
        0.0
    } else {
        value
    }
}

/// Unit name without the `_r` suffix (`AU04_r` → `AU04`)
fn unit_name(channel: &str) -> &str {
    channel.strip_suffix("_r").unwrap_or(channel)
}

/// `mean_AU##` of the raw intensity and `mean_change_AU##` of its
/// baseline-corrected signal
pub fn mean_action_units(
    table: &RecordingTable,
    channels: &ChannelMap,
    window: usize,
) -> FeatureDictionary {
    let mut features = FeatureDictionary::new();
    for name in &channels.au_intensity {
        if let Some(signal) = table.channel(name) {
            let unit = unit_name(name);
            let change = normalizer::rolling_baseline_normalize(signal, window);
            features.insert(format!("mean_{}", unit), aggregate::mean(signal));
            features.insert(format!("mean_change_{}", unit), aggregate::mean(&change));
        }
    }
    features
}

/// `std_AU##` of each raw intensity
pub fn std_action_units(table: &RecordingTable, channels: &ChannelMap) -> FeatureDictionary {
    let mut features = FeatureDictionary::new();
    for name in &channels.au_intensity {
        if let Some(signal) = table.channel(name) {
            features.insert(format!("std_{}", unit_name(name)), aggregate::std(signal));
        }
    }
    features
}

/// `blink_rate`: eye-closure onsets per minute of recording
pub fn blink_rate(table: &RecordingTable, channels: &ChannelMap) -> FeatureDictionary {
    let value = match (table.channel(BLINK_CHANNEL), table.channel(TIME_CHANNEL)) {
        (Some(closed), Some(time)) if channels.has_blink && channels.has_time => {
            aggregate::rate_per_minute(closed, aggregate::duration_seconds(time))
        }
        _ => f64::NAN,
    };
    let mut features = FeatureDictionary::new();
    features.insert("blink_rate", value);
    features
}

/// `percentage_EC`: fraction of frames with the eyes closed
pub fn percentage_eyes_closed(table: &RecordingTable, channels: &ChannelMap) -> FeatureDictionary {
    let value = match table.channel(BLINK_CHANNEL) {
        Some(closed) if channels.has_blink => aggregate::fraction_active(closed),
        _ => f64::NAN,
    };
    let mut features = FeatureDictionary::new();
    features.insert("percentage_EC", value);
    features
}

/// `mean_PD`, `std_PD` (population) and `max_PD` of the combined pupil diameter.
///
/// Absent landmarks give `NaN` features; other geometry errors are returned.
pub fn pupil_features(
    table: &RecordingTable,
    channels: &ChannelMap,
) -> Result<FeatureDictionary, ComputeError> {
    let diameter = if channels.eye_landmark_x.is_empty() || channels.eye_landmark_y.is_empty() {
        Vec::new()
    } else {
        match geometry::pupil_diameter(table) {
            Ok(diameter) => diameter.combined,
            Err(e) if e.is_degradable() => {
                warn!(error = %e, "pupil landmarks incomplete");
                Vec::new()
            }
            Err(e) => return Err(e),
        }
    };

    let mut features = FeatureDictionary::new();
    features.insert("mean_PD", aggregate::mean(&diameter));
    features.insert("std_PD", aggregate::population_std(&diameter));
    features.insert("max_PD", aggregate::max(&diameter));
    Ok(features)
}
