//! Landmark geometry
//!
//! Pupil diameter is approximated per frame as the mean length of four chords
//! between opposite points of the tracked pupil contour, averaged over both eyes.

use crate::error::ComputeError;
use crate::schema::{RecordingTable, EYE_LANDMARK_X, EYE_LANDMARK_Y};

/// Opposite contour points of the left pupil
pub const LEFT_PUPIL_PAIRS: [(u32, u32); 4] = [(27, 23), (26, 22), (25, 21), (24, 20)];

/// Opposite contour points of the right pupil
pub const RIGHT_PUPIL_PAIRS: [(u32, u32); 4] = [(55, 51), (54, 50), (53, 49), (52, 48)];

/// Per-frame pupil diameters
#[derive(Debug, Clone, PartialEq)]
pub struct PupilDiameter {
    pub left: Vec<f64>,
    pub right: Vec<f64>,
    /// Mean of left and right
    pub combined: Vec<f64>,
}

/// Euclidean distance between two point tracks, frame by frame.
pub fn distance(x1: &[f64], x2: &[f64], y1: &[f64], y2: &[f64]) -> Vec<f64> {
    x1.iter()
        .zip(x2)
        .zip(y1.iter().zip(y2))
        .map(|((a, b), (c, d))| ((a - b).powi(2) + (c - d).powi(2)).sqrt())
        .collect()
}

/// Mean distance over landmark index pairs, read from `{x_prefix}{i}` / `{y_prefix}{i}`.
///
/// Returns an all-NaN signal for an empty pair list.
pub fn average_distance(
    pairs: &[(u32, u32)],
    table: &RecordingTable,
    x_prefix: &str,
    y_prefix: &str,
) -> Result<Vec<f64>, ComputeError> {
    let mut total = vec![0.0; table.len()];
    for &(a, b) in pairs {
        let x1 = table.require(&format!("{}{}", x_prefix, a))?;
        let x2 = table.require(&format!("{}{}", x_prefix, b))?;
        let y1 = table.require(&format!("{}{}", y_prefix, a))?;
        let y2 = table.require(&format!("{}{}", y_prefix, b))?;
        for (acc, d) in total.iter_mut().zip(distance(x1, x2, y1, y2)) {
            *acc += d;
        }
    }
    let n = pairs.len() as f64;
    Ok(total.into_iter().map(|sum| sum / n).collect())
}

/// Both-eye pupil diameter using the fixed contour pairs.
pub fn pupil_diameter(table: &RecordingTable) -> Result<PupilDiameter, ComputeError> {
    let left = average_distance(&LEFT_PUPIL_PAIRS, table, EYE_LANDMARK_X, EYE_LANDMARK_Y)?;
    let right = average_distance(&RIGHT_PUPIL_PAIRS, table, EYE_LANDMARK_X, EYE_LANDMARK_Y)?;
    let combined = left
        .iter()
        .zip(&right)
        .map(|(l, r)| (l + r) / 2.0)
        .collect();

    Ok(PupilDiameter {
        left,
        right,
        combined,
    })
}
