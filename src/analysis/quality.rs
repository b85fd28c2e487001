//! Synchronization quality scoring
//!
//! Summarises how trustworthy a synchronization result is. The components:
//!
//! 1. **Match fraction**: share of corrected frames equal to the reference
//! 2. **Edit density**: edits per reference frame; a few dropped frames per
//!    thousand is normal, dense edits point to a bad threshold or start position
//! 3. **Overall**: match fraction penalised by edit density and by each warning
//!
//! # Example
//!
//! ```no_run
//! use frame_sync::{synchronize, SyncConfig};
//! use frame_sync::analysis::quality::compute_quality;
//!
//! let samples = vec![0.0f32; 10_000];
//! let reference = vec![0u8; 100];
//! let result = synchronize(&samples, &reference, &SyncConfig::default())?;
//! let quality = compute_quality(&result, &reference);
//!
//! if quality.overall < 0.9 {
//!     println!("Check this recording: {:?}", quality.notes);
//! }
//! # Ok::<(), frame_sync::SyncError>(())
//! ```

use serde::{Deserialize, Serialize};

use super::result::{SyncResult, SyncWarning};

/// Edit density at which the overall score reaches zero
const MAX_EDIT_DENSITY: f32 = 0.1;

/// Edit density above which a note is added
const NOTE_EDIT_DENSITY: f32 = 0.01;

/// Penalty applied per soft warning
const WARNING_PENALTY: f32 = 0.05;

/// Quality summary of a synchronization result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncQuality {
    /// Fraction of frames whose corrected level equals the reference (0.0-1.0)
    pub match_fraction: f32,

    /// Edits per reference frame
    pub edit_density: f32,

    /// Frames left uncorrected
    pub unresolved: usize,

    /// Overall score (0.0-1.0)
    pub overall: f32,

    /// Readable notes on what lowered the score
    pub notes: Vec<String>,
}

/// Compute quality scores for a synchronization result
///
/// # Arguments
///
/// * `result` - Result from `synchronize()`
/// * `reference` - Reference levels the result was aligned to
///
/// # Returns
///
/// `SyncQuality` with component and overall scores
pub fn compute_quality(result: &SyncResult, reference: &[u8]) -> SyncQuality {
    let n = reference.len();
    let marker = &result.channels.marker;

    let match_fraction = if n == 0 {
        0.0
    } else {
        let matching = marker
            .iter()
            .zip(reference)
            .filter(|(a, b)| a == b)
            .count();
        matching as f32 / n as f32
    };

    let edit_density = if n == 0 {
        0.0
    } else {
        result.edits.len() as f32 / n as f32
    };

    let unresolved = result.diagnostics.unresolved().len();

    let mut notes = Vec::new();
    if match_fraction < 1.0 {
        notes.push(format!(
            "{:.1}% of frames differ from the reference",
            (1.0 - match_fraction) * 100.0
        ));
    }
    if edit_density > NOTE_EDIT_DENSITY {
        notes.push(format!(
            "High edit density: {} edits over {} frames",
            result.edits.len(),
            n
        ));
    }
    for warning in result.diagnostics.iter() {
        if !matches!(warning, SyncWarning::UnresolvedErrors { .. }) {
            notes.push(warning.to_string());
        }
    }

    let density_factor = (1.0 - edit_density / MAX_EDIT_DENSITY).clamp(0.0, 1.0);
    let warning_factor =
        (1.0 - WARNING_PENALTY * result.diagnostics.len() as f32).clamp(0.0, 1.0);
    let overall = (match_fraction * density_factor * warning_factor).clamp(0.0, 1.0);

    log::debug!(
        "Quality: match={:.3}, edit density={:.4}, overall={:.3}",
        match_fraction,
        edit_density,
        overall
    );

    SyncQuality {
        match_fraction,
        edit_density,
        unresolved,
        overall,
        notes,
    }
}
