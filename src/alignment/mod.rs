//! Sequence alignment modules
//!
//! Reconcile the detected level sequence with the reference sequence using
//! insertions and deletions only:
//! - Banded Needleman-Wunsch (exact within a bounded drift)
//! - Iterative convolution drift detection (heuristic, many small shifts)
//! - Start-position matching (coarse seed before alignment)

pub mod banded_matrix;
pub mod drift;
pub mod needleman_wunsch;
pub mod start_position;

use serde::{Deserialize, Serialize};

use crate::config::{AlignStrategy, SyncConfig};
use crate::error::SyncError;

/// Kind of edit applied at a reference-axis position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditKind {
    /// Reference frame with no detected counterpart; filled by duplicating the
    /// preceding frame
    Insert,
    /// Detected frame with no reference counterpart; skipped
    Delete,
}

/// Single edit at a position on the reference (output) axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditOperation {
    /// Output index at which the edit takes effect
    pub position: usize,

    /// Insert or delete
    pub kind: EditKind,
}

impl EditOperation {
    /// Insert at `position`
    pub fn insert(position: usize) -> Self {
        Self {
            position,
            kind: EditKind::Insert,
        }
    }

    /// Delete at `position`
    pub fn delete(position: usize) -> Self {
        Self {
            position,
            kind: EditKind::Delete,
        }
    }
}

/// Ordered edit operations transforming a detected-axis channel into a
/// reference-axis channel
///
/// Positions are non-decreasing. The log is built once per alignment and only
/// replayed afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditLog(Vec<EditOperation>);

impl EditLog {
    /// Empty log (sequences already aligned)
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Build a log, rejecting decreasing positions
    pub fn from_operations(operations: Vec<EditOperation>) -> Result<Self, SyncError> {
        if let Some(i) = operations
            .windows(2)
            .position(|w| w[1].position < w[0].position)
        {
            return Err(SyncError::InvalidInput(format!(
                "Edit positions must be non-decreasing (op {}: {} -> {})",
                i,
                operations[i].position,
                operations[i + 1].position
            )));
        }
        Ok(Self(operations))
    }

    /// Operations in replay order
    pub fn operations(&self) -> &[EditOperation] {
        &self.0
    }

    /// Number of operations
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no edit is needed
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of inserted (dropped in the recording) frames
    pub fn insertions(&self) -> usize {
        self.count(EditKind::Insert)
    }

    /// Number of deleted (duplicated in the recording) frames
    pub fn deletions(&self) -> usize {
        self.count(EditKind::Delete)
    }

    fn count(&self, kind: EditKind) -> usize {
        self.0.iter().filter(|op| op.kind == kind).count()
    }

    /// Iterate over operations
    pub fn iter(&self) -> std::slice::Iter<'_, EditOperation> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a EditLog {
    type Item = &'a EditOperation;
    type IntoIter = std::slice::Iter<'a, EditOperation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Align detected levels onto the reference with the configured strategy
///
/// The convolution strategy reports `NotConverged` as an error; callers decide
/// whether to fall back (the pipeline does).
pub fn align_levels(
    detected: &[u8],
    reference: &[u8],
    config: &SyncConfig,
) -> Result<EditLog, SyncError> {
    match config.strategy {
        AlignStrategy::Banded => needleman_wunsch::align_banded(
            detected,
            reference,
            config.band_side,
            config.insertion_score,
            config.deletion_score,
        ),
        AlignStrategy::Convolution => drift::detect_drift(
            detected,
            reference,
            config.search_range,
            config.smoothing_window,
            config.shift_threshold,
            config.max_iterations,
        ),
    }
}
