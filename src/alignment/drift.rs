//! Iterative convolution-based drift detection
//!
//! Heuristic alternative to banded alignment for long recordings with many small
//! shifts. Each pass:
//!
//! 1. Finds frames where the working sequence disagrees with the reference and, for
//!    each, the signed offset to the nearest frame holding the expected value
//! 2. Smooths the sparse offset signal with a moving average
//! 3. Takes the first smoothed value past the threshold (at or after the last edit)
//!    as the onset of a shift, and applies one insert or delete there
//!
//! A positive offset means the working sequence runs ahead of itself, so a frame is
//! deleted; a negative one means a frame is missing and the previous frame is
//! duplicated. Isolated level errors barely move the average and are left to local
//! correction.
//!
//! # Caveats
//!
//! Nearest matches break ties toward the earlier frame. On binary stimuli a
//! duplicated frame then reads as negative drift, and it is handled by an insert a
//! few frames later instead of a delete at the duplicate. Local correction repairs
//! the frames between the two; use banded alignment when the exact edit position
//! matters.

use super::{EditLog, EditOperation};
use crate::correction::local::find_matches;
use crate::error::SyncError;

/// Detect drift of `detected` relative to `reference` with iterative local matching
///
/// # Arguments
///
/// * `detected` - Detected levels (source axis)
/// * `reference` - Reference levels (output axis)
/// * `range` - Half-width of the local search window in frames
/// * `window` - Moving-average width
/// * `threshold` - Smoothed offset magnitude treated as a shift
/// * `max_iterations` - Maximum number of edits applied before giving up
///
/// # Returns
///
/// Edit log in reference coordinates, compatible with the banded aligner's output.
/// Detected frames past the reference length are kept and move into view as
/// frames are deleted.
///
/// # Errors
///
/// - `SyncError::InvalidInput` for empty sequences or a zero-width window
/// - `SyncError::NotConverged` if a further shift is detected after `max_iterations`
///   edits
pub fn detect_drift(
    detected: &[u8],
    reference: &[u8],
    range: usize,
    window: usize,
    threshold: f32,
    max_iterations: usize,
) -> Result<EditLog, SyncError> {
    if detected.is_empty() || reference.is_empty() {
        return Err(SyncError::InvalidInput(
            "Cannot detect drift on empty level sequences".to_string(),
        ));
    }

    if window == 0 {
        return Err(SyncError::InvalidInput(
            "Smoothing window must be > 0".to_string(),
        ));
    }

    let n = reference.len();
    let mut working = detected.to_vec();
    pad_with_last(&mut working, n);

    log::debug!(
        "Drift detection: {} detected vs {} reference frames, range={}, window={}",
        detected.len(),
        n,
        range,
        window
    );

    let mut operations = Vec::new();
    let mut floor = 0usize;

    loop {
        let offsets = offset_signal(reference, &working, range);
        let smoothed = moving_average(&offsets, window);

        let Some(onset) = (floor..n).find(|&i| smoothed[i].abs() > threshold) else {
            break;
        };

        if operations.len() >= max_iterations {
            log::warn!(
                "Drift detection stopped after {} edits with drift remaining at frame {}",
                operations.len(),
                onset
            );
            return Err(SyncError::NotConverged {
                iterations: operations.len(),
            });
        }

        if smoothed[onset] > 0.0 {
            let position = refine_deletion(reference, &working, onset, floor);
            working.remove(position);
            pad_with_last(&mut working, n);
            operations.push(EditOperation::delete(position));
            floor = position;
        } else {
            let duplicate = working[onset.saturating_sub(1)];
            working.insert(onset, duplicate);
            operations.push(EditOperation::insert(onset));
            floor = onset;
        }
    }

    let log = EditLog::from_operations(operations)?;

    log::debug!(
        "Drift detection: {} insertions, {} deletions",
        log.insertions(),
        log.deletions()
    );

    Ok(log)
}

/// Sparse signed offsets: non-zero only at mismatches with an in-window match
fn offset_signal(reference: &[u8], working: &[u8], range: usize) -> Vec<f32> {
    let mut offsets = vec![0.0f32; reference.len()];
    for m in find_matches(reference, working, range) {
        if let Some(offset) = m.offset() {
            offsets[m.error_index] = offset as f32;
        }
    }
    offsets
}

/// Centered moving average with zero padding, output aligned with the input
///
/// Element `i` averages `values[i - window / 2 ..= i + (window - 1) / 2]`.
fn moving_average(values: &[f32], window: usize) -> Vec<f32> {
    let n = values.len();
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0f64);
    for &v in values {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + v as f64);
    }

    let before = window / 2;
    let after = (window - 1) / 2;
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(before);
            let hi = (i + after + 1).min(n);
            ((prefix[hi] - prefix[lo]) / window as f64) as f32
        })
        .collect()
}

/// First frame near `onset` whose level does not occur in the nearby reference
///
/// The smoothed onset can sit a frame or two away from the extra frame; the extra
/// frame is the one whose value the reference does not expect there.
fn refine_deletion(reference: &[u8], working: &[u8], onset: usize, floor: usize) -> usize {
    let n = reference.len();
    let start = onset.saturating_sub(2).max(floor);
    let stop = (onset + 2).min(n);
    let expected = &reference[start..stop];

    (start..stop)
        .find(|&i| !expected.contains(&working[i]))
        .unwrap_or(onset)
}

/// Extend `levels` to at least `len` by repeating its last value
fn pad_with_last(levels: &mut Vec<u8>, len: usize) {
    if let Some(&last) = levels.last() {
        if levels.len() < len {
            levels.resize(len, last);
        }
    }
}
