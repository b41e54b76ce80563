//! Channel selection by naming convention
//!
//! Channel families are identified purely by name:
//! - `pose*` head pose axes, `pose_T*` the translation subset
//! - `AU##_r` action-unit intensity, `AU##_c` action-unit presence
//! - `eye_lmk_X_##` / `eye_lmk_Y_##` eye landmark coordinates
//!
//! Matching is case-sensitive and exact on prefixes. Families are resolved once
//! per table by [`ChannelMap::resolve`]; computations consume the resolved map
//! instead of filtering column names themselves.

use crate::schema::table::{RecordingTable, TIME_CHANNEL};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Binary eye-closure channel used for blink features
pub const BLINK_CHANNEL: &str = "AU45_c";

/// Conjunctive predicate over channel names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelSelector {
    prefix: Option<String>,
    suffix: Option<String>,
    excluded: Vec<String>,
}

impl ChannelSelector {
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            ..Default::default()
        }
    }

    pub fn suffix(suffix: impl Into<String>) -> Self {
        Self {
            suffix: Some(suffix.into()),
            ..Default::default()
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Reject names containing `fragment`
    pub fn excluding(mut self, fragment: impl Into<String>) -> Self {
        self.excluded.push(fragment.into());
        self
    }

    pub fn matches(&self, name: &str) -> bool {
        self.prefix.as_deref().map_or(true, |p| name.starts_with(p))
            && self.suffix.as_deref().map_or(true, |s| name.ends_with(s))
            && !self.excluded.iter().any(|x| name.contains(x.as_str()))
    }

    /// Matching channel names in table order; empty when nothing matches.
    pub fn select(&self, table: &RecordingTable) -> Vec<String> {
        table
            .channel_names()
            .iter()
            .filter(|name| self.matches(name))
            .cloned()
            .collect()
    }
}

/// Named channel families of a facial/pose table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelFamily {
    Pose,
    PoseTranslation,
    ActionUnitIntensity,
    ActionUnitPresence,
    EyeLandmarkX,
    EyeLandmarkY,
}

impl ChannelFamily {
    pub const ALL: [ChannelFamily; 6] = [
        ChannelFamily::Pose,
        ChannelFamily::PoseTranslation,
        ChannelFamily::ActionUnitIntensity,
        ChannelFamily::ActionUnitPresence,
        ChannelFamily::EyeLandmarkX,
        ChannelFamily::EyeLandmarkY,
    ];

    pub fn selector(&self) -> ChannelSelector {
        match self {
            ChannelFamily::Pose => ChannelSelector::prefix("pose"),
            ChannelFamily::PoseTranslation => ChannelSelector::prefix("pose_T"),
            ChannelFamily::ActionUnitIntensity => ChannelSelector::prefix("AU").with_suffix("_r"),
            ChannelFamily::ActionUnitPresence => ChannelSelector::prefix("AU").with_suffix("_c"),
            ChannelFamily::EyeLandmarkX => ChannelSelector::prefix(EYE_LANDMARK_X),
            ChannelFamily::EyeLandmarkY => ChannelSelector::prefix(EYE_LANDMARK_Y),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelFamily::Pose => "pose",
            ChannelFamily::PoseTranslation => "pose_translation",
            ChannelFamily::ActionUnitIntensity => "action_unit_intensity",
            ChannelFamily::ActionUnitPresence => "action_unit_presence",
            ChannelFamily::EyeLandmarkX => "eye_landmark_x",
            ChannelFamily::EyeLandmarkY => "eye_landmark_y",
        }
    }
}

impl fmt::Display for ChannelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prefix of eye landmark x coordinates
pub const EYE_LANDMARK_X: &str = "eye_lmk_X_";
/// Prefix of eye landmark y coordinates
pub const EYE_LANDMARK_Y: &str = "eye_lmk_Y_";

/// Channel families resolved against one table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelMap {
    pub pose: Vec<String>,
    pub pose_translation: Vec<String>,
    pub au_intensity: Vec<String>,
    pub au_presence: Vec<String>,
    pub eye_landmark_x: Vec<String>,
    pub eye_landmark_y: Vec<String>,
    pub has_time: bool,
    pub has_blink: bool,
}

impl ChannelMap {
    /// Resolve every family once; absent families are logged, not rejected.
    pub fn resolve(table: &RecordingTable) -> Self {
        let map = Self {
            pose: ChannelFamily::Pose.selector().select(table),
            pose_translation: ChannelFamily::PoseTranslation.selector().select(table),
            au_intensity: ChannelFamily::ActionUnitIntensity.selector().select(table),
            au_presence: ChannelFamily::ActionUnitPresence.selector().select(table),
            eye_landmark_x: ChannelFamily::EyeLandmarkX.selector().select(table),
            eye_landmark_y: ChannelFamily::EyeLandmarkY.selector().select(table),
            has_time: table.has_channel(TIME_CHANNEL),
            has_blink: table.has_channel(BLINK_CHANNEL),
        };

        for family in map.missing() {
            warn!(%family, "channel family absent, dependent features will be NaN");
        }
        if !map.has_time {
            warn!(channel = TIME_CHANNEL, "time channel absent");
        }
        map
    }

    pub fn family(&self, family: ChannelFamily) -> &[String] {
        match family {
            ChannelFamily::Pose => &self.pose,
            ChannelFamily::PoseTranslation => &self.pose_translation,
            ChannelFamily::ActionUnitIntensity => &self.au_intensity,
            ChannelFamily::ActionUnitPresence => &self.au_presence,
            ChannelFamily::EyeLandmarkX => &self.eye_landmark_x,
            ChannelFamily::EyeLandmarkY => &self.eye_landmark_y,
        }
    }

    /// Families with no matching channel
    pub fn missing(&self) -> Vec<ChannelFamily> {
        ChannelFamily::ALL
            .into_iter()
            .filter(|f| self.family(*f).is_empty())
            .collect()
    }

    /// Intensity channels used for arousal (everything but the blink unit)
    pub fn arousal_channels(&self) -> Vec<String> {
        let selector = ChannelFamily::ActionUnitIntensity
            .selector()
            .excluding("45");
        self.au_intensity
            .iter()
            .filter(|name| selector.matches(name))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(names: &[&str]) -> RecordingTable {
        RecordingTable::from_columns(names.iter().map(|n| (*n, vec![0.0]))).unwrap()
    }

    #[test]
    fn test_pose_translation_is_strict_subset() {
        let t = table(&["pose_Tx", "pose_Ty", "pose_Tz", "pose_Rx", "pose_Ry", "pose_Rz"]);
        let map = ChannelMap::resolve(&t);

        assert_eq!(map.pose.len(), 6);
        assert_eq!(map.pose_translation, vec!["pose_Tx", "pose_Ty", "pose_Tz"]);
    }

    #[test]
    fn test_selection_is_case_sensitive_and_order_preserving() {
        let t = table(&["AU12_r", "au01_r", "AU01_r", "AU01_c", "frame", "AU45_r"]);

        let intensity = ChannelFamily::ActionUnitIntensity.selector().select(&t);
        assert_eq!(intensity, vec!["AU12_r", "AU01_r", "AU45_r"]);

        let presence = ChannelFamily::ActionUnitPresence.selector().select(&t);
        assert_eq!(presence, vec!["AU01_c"]);
    }

    #[test]
    fn test_arousal_excludes_blink_unit() {
        let t = table(&["AU01_r", "AU45_r", "AU12_r"]);
        let map = ChannelMap::resolve(&t);
        assert_eq!(map.arousal_channels(), vec!["AU01_r", "AU12_r"]);
    }

    #[test]
    fn test_suffix_only_selector() {
        let t = table(&["AU01_c", "x_c", "AU01_r"]);
        assert_eq!(ChannelSelector::suffix("_c").select(&t), vec!["AU01_c", "x_c"]);
    }

    #[test]
    fn test_missing_families_reported() {
        let t = table(&["t_from_start", "AU45_c"]);
        let map = ChannelMap::resolve(&t);

        assert!(map.has_time);
        assert!(map.has_blink);
        // AU45_c is itself a presence channel
        assert_eq!(map.missing().len(), ChannelFamily::ALL.len() - 1);
        assert!(!map.missing().contains(&ChannelFamily::ActionUnitPresence));
        assert!(ChannelSelector::prefix("pose").select(&t).is_empty());
    }
}
