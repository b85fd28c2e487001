//! Synchronization result types

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::alignment::EditLog;
use crate::config::AlignStrategy;
use crate::correction::{FrameChannels, ReplacementLog};

/// Soft failure recorded during synchronization
///
/// None of these stop the pipeline; each is also logged at `warn` level where it
/// is raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncWarning {
    /// Frame intervals far from the mean interval
    TimepointAnomaly {
        /// Frame indices preceding the anomalous intervals
        frames: Vec<usize>,
        /// Sample indices of those frames
        timepoints: Vec<usize>,
    },

    /// Fewer intensity clusters separated than requested
    WeakClustering {
        /// Cluster boundaries found
        found: usize,
        /// Cluster boundaries expected (`n_cluster - 1`)
        expected: usize,
    },

    /// Frames still disagreeing with the reference after local correction
    UnresolvedErrors {
        /// Reference-axis indices of the frames
        indices: Vec<usize>,
    },

    /// Alignment fell back from the requested strategy
    StrategyFallback {
        /// Why the requested strategy was abandoned
        reason: String,
    },
}

impl fmt::Display for SyncWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncWarning::TimepointAnomaly { frames, .. } => {
                write!(f, "{} anomalous frame intervals", frames.len())
            }
            SyncWarning::WeakClustering { found, expected } => write!(
                f,
                "Weak clustering: {} of {} cluster boundaries found",
                found, expected
            ),
            SyncWarning::UnresolvedErrors { indices } => {
                write!(f, "{} frames left uncorrected", indices.len())
            }
            SyncWarning::StrategyFallback { reason } => {
                write!(f, "Fell back to banded alignment: {}", reason)
            }
        }
    }
}

/// Ordered soft failures of one synchronization run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Warnings in the order they were raised
    pub warnings: Vec<SyncWarning>,
}

impl Diagnostics {
    /// No warnings
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning
    pub fn push(&mut self, warning: SyncWarning) {
        self.warnings.push(warning);
    }

    /// Record several warnings
    pub fn extend<I: IntoIterator<Item = SyncWarning>>(&mut self, warnings: I) {
        self.warnings.extend(warnings);
    }

    /// True if the run raised no warning
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Number of warnings
    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// Iterate over warnings
    pub fn iter(&self) -> std::slice::Iter<'_, SyncWarning> {
        self.warnings.iter()
    }

    /// Frames left uncorrected, if local correction reported any
    pub fn unresolved(&self) -> &[usize] {
        self.warnings
            .iter()
            .find_map(|w| match w {
                SyncWarning::UnresolvedErrors { indices } => Some(indices.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }
}

/// Complete synchronization result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResult {
    /// Corrected channels, one entry per reference frame
    pub channels: FrameChannels,

    /// Sample index of each reference frame in the recording
    pub timepoints: Vec<usize>,

    /// Detected frame at which the reference begins
    pub start_frame: usize,

    /// Edits that brought detected frames onto the reference axis
    pub edits: EditLog,

    /// Frames replaced by local correction
    pub replacements: ReplacementLog,

    /// Soft failures
    pub diagnostics: Diagnostics,

    /// Run metadata
    pub metadata: SyncMetadata,
}

/// Synchronization metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncMetadata {
    /// Frames found by detection, extrapolated ones included
    pub detected_frames: usize,

    /// Leading frames synthesized by extrapolation
    pub extrapolated_frames: usize,

    /// Detection thresholds (low, high)
    pub thresholds: (f32, f32),

    /// Intensity cluster boundaries, when clustering ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_thresholds: Option<Vec<f32>>,

    /// Strategy that produced `edits`
    pub strategy_used: AlignStrategy,

    /// Processing time in milliseconds
    pub processing_time_ms: f32,

    /// Crate version that produced the result
    pub algorithm_version: String,
}
