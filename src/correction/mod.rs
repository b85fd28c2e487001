//! Frame correction modules
//!
//! Turn an edit log into corrected channels:
//! - Shift application (replay inserts/deletes on every channel)
//! - Local error correction (fix residual mismatches from nearby frames)

pub mod local;
pub mod shifts;

use serde::{Deserialize, Serialize};

pub use local::{
    correct_local_errors, find_matches, FrameMatch, LocalCorrection, Replacement, ReplacementLog,
};
pub use shifts::{apply_shifts, shift_channel, FrameChannels};

use crate::alignment::{align_levels, EditLog};
use crate::config::SyncConfig;
use crate::error::SyncError;

/// Channels brought onto a reference axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameCorrection {
    /// Edits applied before local correction
    pub edits: EditLog,

    /// Corrected channels, one entry per reference frame
    pub channels: FrameChannels,

    /// Frames replaced by local correction
    pub replacements: ReplacementLog,

    /// Frames still disagreeing with the reference
    pub unresolved: Vec<usize>,
}

/// Align, shift and locally correct a channel bundle against a reference
///
/// The marker channel is aligned onto `reference` with the configured strategy; the
/// resulting edits are replayed on every channel and residual mismatches are
/// corrected from frames within `config.search_range`.
///
/// # Errors
///
/// - `SyncError::InvalidInput` for mismatched channels or empty sequences
/// - Any alignment error (`DriftExceedsBand`, `NotConverged`)
pub fn correct_frames(
    reference: &[u8],
    channels: &FrameChannels,
    config: &SyncConfig,
) -> Result<FrameCorrection, SyncError> {
    channels.validate()?;

    let edits = align_levels(&channels.marker, reference, config)?;
    let shifted = apply_shifts(channels, &edits, reference.len())?;
    let local = correct_local_errors(reference, &shifted, config.search_range);

    Ok(FrameCorrection {
        edits,
        channels: local.channels,
        replacements: local.replacements,
        unresolved: local.unresolved,
    })
}
