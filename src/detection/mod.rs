//! Frame detection modules
//!
//! Recover discrete frame markers from an analog sync trace:
//! - Threshold derivation
//! - Forward/reverse frame walking with extrapolation
//! - Interval consistency checks
//! - Intensity clustering for multi-level stimuli

pub mod cluster;
pub mod frames;
pub mod threshold;
pub mod timing;

use serde::{Deserialize, Serialize};

use crate::analysis::result::SyncWarning;
use crate::error::SyncError;

/// Strictly increasing sample indices of detected frame edges
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerSequence(Vec<usize>);

impl MarkerSequence {
    /// Build a marker sequence, rejecting timepoints that are not strictly increasing
    pub fn new(timepoints: Vec<usize>) -> Result<Self, SyncError> {
        if let Some(pos) = timepoints.windows(2).position(|w| w[1] <= w[0]) {
            return Err(SyncError::InvalidInput(format!(
                "Timepoints must be strictly increasing (frame {}: {} -> {})",
                pos,
                timepoints[pos],
                timepoints[pos + 1]
            )));
        }
        Ok(Self(timepoints))
    }

    /// Sample indices as a slice
    pub fn timepoints(&self) -> &[usize] {
        &self.0
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no frame was detected
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume into the raw timepoints
    pub fn into_inner(self) -> Vec<usize> {
        self.0
    }
}

/// Per-frame level values (binary high/low or a cluster label)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSequence(Vec<u8>);

impl LevelSequence {
    /// Wrap raw levels
    pub fn new(levels: Vec<u8>) -> Self {
        Self(levels)
    }

    /// Levels as a slice
    pub fn levels(&self) -> &[u8] {
        &self.0
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume into the raw levels
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for LevelSequence {
    fn from(levels: Vec<u8>) -> Self {
        Self(levels)
    }
}

/// Output of one frame detection run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameDetection {
    /// Detected frame edges
    pub markers: MarkerSequence,

    /// High/low level per frame
    pub levels: LevelSequence,

    /// Number of leading frames synthesized by extrapolation
    pub extrapolated: usize,

    /// Thresholds actually used (low, high)
    pub thresholds: (f32, f32),

    /// Soft failures found during detection
    pub warnings: Vec<SyncWarning>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_sequence_rejects_unsorted() {
        assert!(MarkerSequence::new(vec![0, 10, 10]).is_err());
        assert!(MarkerSequence::new(vec![5, 3]).is_err());
        assert!(MarkerSequence::new(vec![]).is_ok());
        assert_eq!(MarkerSequence::new(vec![1, 2, 9]).unwrap().len(), 3);
    }
}
