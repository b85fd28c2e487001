//! # Frame Sync
//!
//! Recovers stimulus frame markers from an analog sync trace recorded alongside an
//! experiment and reconciles them with the frame sequence the stimulus was supposed
//! to display.
//!
//! ## Features
//!
//! - **Frame Detection**: Threshold-based forward/reverse frame walking with
//!   extrapolation of truncated starts and interval anomaly checks
//! - **Intensity Clustering**: Ordinal labels for stimuli that encode more than two
//!   levels in the sync trace
//! - **Start Matching**: FFT cross-correlation of the reference against the detected
//!   levels around an onset estimate
//! - **Alignment**: Banded Needleman-Wunsch, or iterative convolution drift detection
//!   with automatic fallback
//! - **Correction**: Edit replay on every frame channel plus local error correction
//!
//! ## Quick Start
//!
//! ```no_run
//! use frame_sync::{synchronize, SyncConfig};
//!
//! // Analog sync trace and the levels the stimulus should have shown
//! let samples: Vec<f32> = vec![]; // Your recording
//! let reference: Vec<u8> = vec![]; // Your stimulus marker
//!
//! let config = SyncConfig { increment: 100, ..Default::default() };
//! let result = synchronize(&samples, &reference, &config)?;
//!
//! println!(
//!     "{} inserted, {} deleted, {} replaced",
//!     result.edits.insertions(),
//!     result.edits.deletions(),
//!     result.replacements.len()
//! );
//! # Ok::<(), frame_sync::SyncError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Sync Trace → Frame Detection → (Clustering) → Start Matching → Alignment → Shift → Local Correction
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod alignment;
pub mod analysis;
pub mod config;
pub mod correction;
pub mod detection;
pub mod error;

use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

// Re-export main types
pub use alignment::{EditKind, EditLog, EditOperation};
pub use analysis::quality::{compute_quality, SyncQuality};
pub use analysis::result::{Diagnostics, SyncMetadata, SyncResult, SyncWarning};
pub use config::{AlignStrategy, SyncConfig};
pub use correction::{correct_frames, FrameChannels, FrameCorrection, Replacement, ReplacementLog};
pub use detection::{LevelSequence, MarkerSequence};
pub use error::SyncError;

use alignment::start_position::match_starting_position;
use correction::{apply_shifts, correct_local_errors, shift_channel};
use detection::cluster::{cluster_frame_levels, frame_areas};
use detection::frames::detect_frames;

/// One recording for batch synchronization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    /// Analog sync samples
    pub samples: Vec<f32>,

    /// Reference levels of the stimulus shown during the recording
    pub reference: Vec<u8>,

    /// Rough stimulus onset in samples, overriding `SyncConfig::onset_estimate`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onset_estimate: Option<usize>,
}

/// Main synchronization function
///
/// Detects frames in the sync trace, finds where the reference begins, aligns the
/// detected levels onto the reference and corrects every frame channel.
///
/// # Arguments
///
/// * `samples` - Analog sync samples
/// * `reference` - Levels the stimulus was supposed to show, one per frame
/// * `config` - Synchronization configuration parameters
///
/// # Returns
///
/// `SyncResult` with channels and timepoints on the reference axis, the edit and
/// replacement logs, and diagnostics
///
/// # Errors
///
/// - `SyncError::InvalidInput` for empty inputs or an invalid config
/// - `SyncError::DetectionFailed` if no frame can be detected
/// - `SyncError::DriftExceedsBand` if banded alignment cannot represent the drift
///
/// A convolution run that does not converge falls back to banded alignment and
/// is reported as a `StrategyFallback` warning instead of an error.
///
/// # Example
///
/// ```no_run
/// use frame_sync::{synchronize, AlignStrategy, SyncConfig};
///
/// let samples = vec![0.0f32; 100_000];
/// let reference = vec![0u8; 1000];
/// let config = SyncConfig {
///     strategy: AlignStrategy::Convolution,
///     ..Default::default()
/// };
/// let result = synchronize(&samples, &reference, &config)?;
/// for warning in result.diagnostics.iter() {
///     println!("{}", warning);
/// }
/// # Ok::<(), frame_sync::SyncError>(())
/// ```
pub fn synchronize(
    samples: &[f32],
    reference: &[u8],
    config: &SyncConfig,
) -> Result<SyncResult, SyncError> {
    let start_time = Instant::now();

    log::debug!(
        "Starting synchronization: {} samples, {} reference frames",
        samples.len(),
        reference.len()
    );

    if samples.is_empty() {
        return Err(SyncError::InvalidInput("Empty sync signal".to_string()));
    }

    if reference.is_empty() {
        return Err(SyncError::InvalidInput(
            "Empty reference sequence".to_string(),
        ));
    }

    config.validate()?;

    let mut diagnostics = Diagnostics::new();

    // Stage 1: Frame detection
    let detection = detect_frames(samples, config)?;
    diagnostics.extend(detection.warnings.iter().cloned());
    let timepoints = detection.markers.timepoints();

    // Stage 2: Intensity clustering (multi-level stimuli only)
    let (levels, areas, cluster_thresholds) = if config.n_cluster > 2 {
        let clusters = cluster_frame_levels(
            samples,
            timepoints,
            config.n_cluster,
            config.cluster_tail_skip,
            config.cluster_gap_sigma,
        )?;
        diagnostics.extend(clusters.warning);
        (
            clusters.labels.into_inner(),
            clusters.areas,
            Some(clusters.thresholds),
        )
    } else {
        (
            detection.levels.levels().to_vec(),
            frame_areas(samples, timepoints),
            None,
        )
    };

    // Stage 3: Start position
    let start_frame = match config.onset_estimate {
        Some(estimate) => match_starting_position(
            timepoints,
            &levels,
            reference,
            estimate,
            config.match_transitions,
            config.match_max_len,
            config.match_search_radius,
        )?,
        None => 0,
    };

    // Extra detected frames past the reference end let trailing drift resolve as
    // deletions; the band bounds how many can be absorbed
    let stop = (start_frame + reference.len() + config.band_side.saturating_sub(1))
        .min(levels.len());
    if start_frame >= stop {
        return Err(SyncError::InvalidInput(format!(
            "Start frame {} leaves no detected frame to align",
            start_frame
        )));
    }

    let detected = &levels[start_frame..stop];

    // Stage 4: Alignment
    let (edits, strategy_used) = align_with_fallback(detected, reference, config, &mut diagnostics)?;

    // Stage 5: Shift every channel onto the reference axis
    let channels = FrameChannels::new(areas[start_frame..stop].to_vec(), detected.to_vec(), None)?;
    let shifted = apply_shifts(&channels, &edits, reference.len())?;
    let shifted_timepoints = shift_channel(&timepoints[start_frame..stop], &edits, reference.len())?;

    // Stage 6: Local error correction
    let local = correct_local_errors(reference, &shifted, config.search_range);
    if !local.unresolved.is_empty() {
        diagnostics.push(SyncWarning::UnresolvedErrors {
            indices: local.unresolved.clone(),
        });
    }

    let processing_time_ms = start_time.elapsed().as_secs_f32() * 1000.0;

    log::debug!(
        "Synchronization done in {:.1} ms: start={}, {} edits, {} replacements, {} warnings",
        processing_time_ms,
        start_frame,
        edits.len(),
        local.replacements.len(),
        diagnostics.len()
    );

    Ok(SyncResult {
        channels: local.channels,
        timepoints: shifted_timepoints,
        start_frame,
        edits,
        replacements: local.replacements,
        diagnostics,
        metadata: SyncMetadata {
            detected_frames: detection.markers.len(),
            extrapolated_frames: detection.extrapolated,
            thresholds: detection.thresholds,
            cluster_thresholds,
            strategy_used,
            processing_time_ms,
            algorithm_version: env!("CARGO_PKG_VERSION").to_string(),
        },
    })
}

/// Align with the configured strategy, falling back to banded alignment when the
/// convolution detector does not converge
fn align_with_fallback(
    detected: &[u8],
    reference: &[u8],
    config: &SyncConfig,
    diagnostics: &mut Diagnostics,
) -> Result<(EditLog, AlignStrategy), SyncError> {
    match alignment::align_levels(detected, reference, config) {
        Ok(edits) => Ok((edits, config.strategy)),
        Err(SyncError::NotConverged { iterations }) => {
            log::warn!(
                "Convolution drift detection did not converge after {} edits, using banded alignment",
                iterations
            );
            diagnostics.push(SyncWarning::StrategyFallback {
                reason: format!("not converged after {} edits", iterations),
            });
            let edits = alignment::needleman_wunsch::align_banded(
                detected,
                reference,
                config.band_side,
                config.insertion_score,
                config.deletion_score,
            )?;
            Ok((edits, AlignStrategy::Banded))
        }
        Err(e) => Err(e),
    }
}

/// Synchronize independent recordings in parallel
///
/// Each recording runs through [`synchronize`] on the rayon thread pool; a
/// recording's own `onset_estimate` overrides the shared config.
///
/// # Returns
///
/// One result per recording, in input order
pub fn synchronize_batch(
    recordings: &[Recording],
    config: &SyncConfig,
) -> Vec<Result<SyncResult, SyncError>> {
    log::debug!("Batch synchronization of {} recordings", recordings.len());

    recordings
        .par_iter()
        .map(|recording| {
            let config = SyncConfig {
                onset_estimate: recording.onset_estimate.or(config.onset_estimate),
                ..config.clone()
            };
            synchronize(&recording.samples, &recording.reference, &config)
        })
        .collect()
}
