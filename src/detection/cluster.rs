//! Intensity clustering for multi-level stimuli
//!
//! Binary high/low detection cannot tell apart stimuli that encode more than two
//! intensities in the sync trace. Here each frame is summarised by the area under
//! the trace between its edge and the next one; the sorted areas form plateaus, and
//! the largest jumps between plateaus become the cluster boundaries.

use serde::{Deserialize, Serialize};

use super::LevelSequence;
use crate::analysis::result::SyncWarning;
use crate::error::SyncError;

/// Result of intensity clustering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameClusters {
    /// Cluster label per frame, in `[0, thresholds.len()]`
    pub labels: LevelSequence,

    /// Area boundaries between consecutive clusters, ascending
    pub thresholds: Vec<f32>,

    /// Trapezoidal area of each frame segment
    pub areas: Vec<f32>,

    /// `WeakClustering` when fewer boundaries than requested were found
    pub warning: Option<SyncWarning>,
}

/// Trapezoidal area of each frame segment
///
/// Frame `i` spans from `timepoints[i]` to `timepoints[i + 1]`; the last frame runs
/// to the end of the signal. Segments shorter than two samples have zero area.
pub fn frame_areas(samples: &[f32], timepoints: &[usize]) -> Vec<f32> {
    timepoints
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = timepoints.get(i + 1).copied().unwrap_or(samples.len());
            let start = start.min(samples.len());
            let end = end.min(samples.len()).max(start);
            trapezoid(&samples[start..end])
        })
        .collect()
}

fn trapezoid(segment: &[f32]) -> f32 {
    segment.windows(2).map(|w| (w[0] + w[1]) * 0.5).sum()
}

/// Assign each frame an ordinal intensity label
///
/// # Arguments
///
/// * `samples` - Analog sync samples
/// * `timepoints` - Detected frame edges
/// * `n_cluster` - Number of intensity levels expected
/// * `tail_skip` - Gaps ignored at each end of the sorted areas (typically 5)
/// * `gap_sigma` - A gap qualifies above this many standard deviations (typically 3.0)
///
/// # Returns
///
/// Labels in `[0, n_cluster)`. If fewer than `n_cluster - 1` gaps qualify, fewer
/// clusters are used and a `WeakClustering` warning is attached.
///
/// # Errors
///
/// Returns `SyncError::InvalidInput` if `n_cluster` is 0 or above 255
pub fn cluster_frame_levels(
    samples: &[f32],
    timepoints: &[usize],
    n_cluster: usize,
    tail_skip: usize,
    gap_sigma: f32,
) -> Result<FrameClusters, SyncError> {
    if n_cluster == 0 || n_cluster > u8::MAX as usize + 1 {
        return Err(SyncError::InvalidInput(format!(
            "Cluster count must be in [1, 256], got {}",
            n_cluster
        )));
    }

    let areas = frame_areas(samples, timepoints);
    let wanted = n_cluster - 1;

    log::debug!(
        "Clustering {} frames into {} levels",
        areas.len(),
        n_cluster
    );

    let mut sorted = areas.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut gaps: Vec<f32> = sorted.windows(2).map(|w| w[1] - w[0]).collect();
    let head = tail_skip.min(gaps.len());
    gaps[..head].iter_mut().for_each(|g| *g = 0.0);
    let tail = gaps.len().saturating_sub(tail_skip);
    gaps[tail..].iter_mut().for_each(|g| *g = 0.0);

    let threshold = std_dev(&gaps) * gap_sigma;

    // Greedily take the largest qualifying gaps
    let mut gap_indices = Vec::with_capacity(wanted);
    while gap_indices.len() < wanted {
        let Some((idx, &gap)) = gaps
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        else {
            break;
        };
        if gap <= 0.0 || gap < threshold {
            break;
        }
        gap_indices.push(idx);
        gaps[idx] = 0.0;
    }
    gap_indices.sort_unstable();

    let thresholds: Vec<f32> = gap_indices
        .iter()
        .map(|&idx| (sorted[idx] + sorted[idx + 1]) * 0.5)
        .collect();

    let warning = if thresholds.len() < wanted {
        log::warn!(
            "Fewer transitions in frame areas than needed ({} of {}), clusters will be merged",
            thresholds.len(),
            wanted
        );
        Some(SyncWarning::WeakClustering {
            found: thresholds.len(),
            expected: wanted,
        })
    } else {
        None
    };

    let labels: Vec<u8> = areas
        .iter()
        .map(|&area| thresholds.iter().filter(|&&t| area > t).count() as u8)
        .collect();

    Ok(FrameClusters {
        labels: LevelSequence::new(labels),
        thresholds,
        areas,
        warning,
    })
}

fn std_dev(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    (values.iter().map(|&x| (x - mean) * (x - mean)).sum::<f32>() / n).sqrt()
}
