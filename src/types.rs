//! Core types for the stress-features pipeline
//!
//! This module defines the values that leave each computation: the participant
//! identifier, the per-recording feature dictionary and the record the pipeline
//! wraps around it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Participant identifier (`pp`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_string())
    }

    /// Identifier read from a numeric `pp` channel.
    ///
    /// Integral values are rendered without a fractional part so that `101.0`
    /// and `"101"` name the same participant.
    pub fn from_numeric(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        if value.fract() == 0.0 {
            Some(Self(format!("{}", value as i64)))
        } else {
            Some(Self(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Feature name to scalar mapping produced for one recording.
///
/// Undefined features are stored as `NaN` rather than omitted, so every
/// recording processed by the same function yields the same key set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureDictionary {
    /// Participant the features belong to, when known
    #[serde(rename = "pp", default, skip_serializing_if = "Option::is_none")]
    pub participant: Option<ParticipantId>,
    /// Feature values keyed by name
    #[serde(flatten, with = "nan_as_null")]
    pub values: BTreeMap<String, f64>,
}

impl FeatureDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_participant(participant: ParticipantId) -> Self {
        Self {
            participant: Some(participant),
            values: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fold another dictionary into this one; later values win on name clashes.
    pub fn merge(&mut self, other: FeatureDictionary) {
        if self.participant.is_none() {
            self.participant = other.participant;
        }
        self.values.extend(other.values);
    }
}

/// One processed recording as emitted by the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// Recording label (usually the source file stem)
    pub recording: String,
    /// When the features were computed
    pub computed_at: DateTime<Utc>,
    /// Computed features
    pub features: FeatureDictionary,
}

/// JSON has no NaN; undefined features travel as `null`.
mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S>(values: &BTreeMap<String, f64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mapped: BTreeMap<&String, Option<f64>> = values
            .iter()
            .map(|(k, v)| (k, if v.is_finite() { Some(*v) } else { None }))
            .collect();
        mapped.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: BTreeMap<String, serde_json::Value> = BTreeMap::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .filter_map(|(k, v)| match v {
                serde_json::Value::Null => Some((k, f64::NAN)),
                serde_json::Value::Number(n) => n.as_f64().map(|f| (k, f)),
                _ => None,
            })
            .collect())
    }
}
