//! Banded Needleman-Wunsch alignment of level sequences
//!
//! Global alignment restricted to a band of half-width `side` around the main
//! diagonal, allowing only insertions and deletions besides (mis)matches. Memory and
//! time are O(N * side) instead of O(N²), which is valid as long as the drift between
//! the sequences stays strictly inside the band.
//!
//! # Scoring
//!
//! Levels come from a 5-symbol circular alphabet. A match scores 1, levels one step
//! apart score -1, two steps apart -3. Insertions and deletions cost -10 by default.
//!
//! # Drift beyond the band
//!
//! A mismatch costs far less than an indel, so a shift wider than the band does not
//! necessarily push the path onto the band edge: it can be absorbed as a run of
//! mismatches instead. After traceback the matched pairs are scanned in windows of
//! `2 * side` reference frames, and a window where more than
//! [`MAX_MISMATCH_DENSITY`] of the frames mismatch is reported as drift.
//!
//! # Example
//!
//! ```
//! use frame_sync::alignment::needleman_wunsch::align_banded;
//!
//! let detected = [0, 1, 1, 0, 1];
//! let reference = [0, 1, 0, 1, 1, 0, 1];
//! let log = align_banded(&detected, &reference, 20, -10, -10)?;
//! assert_eq!(log.insertions(), 2);
//! assert_eq!(log.deletions(), 0);
//! # Ok::<(), frame_sync::SyncError>(())
//! ```

use super::banded_matrix::BandedMatrix;
use super::{EditLog, EditOperation};
use crate::error::SyncError;

/// Number of distinct levels the score table covers
pub const LEVEL_ALPHABET: usize = 5;

/// Score of a reference level 0 against observed levels 0..5; rotated for other levels
const LEVEL_SCORES: [i32; LEVEL_ALPHABET] = [1, -1, -3, -3, -1];

/// Share of mismatching frames in a `2 * side` window treated as unresolved drift
pub const MAX_MISMATCH_DENSITY: f32 = 0.3;

/// Effectively -inf for disabled moves, far enough from i32::MIN to add penalties
const DISABLED: i32 = i32::MIN / 4;

/// (Mis)match score between two levels
pub fn level_score(reference: u8, observed: u8) -> i32 {
    let distance = (observed as usize + LEVEL_ALPHABET - reference as usize % LEVEL_ALPHABET)
        % LEVEL_ALPHABET;
    LEVEL_SCORES[distance]
}

/// Align `detected` onto `reference` within a diagonal band
///
/// Rows of the band follow the detected sequence, columns the reference. The first
/// frames of both sequences are assumed to correspond (see the start-position
/// matcher).
///
/// # Arguments
///
/// * `detected` - Detected levels (source axis)
/// * `reference` - Reference levels (output axis)
/// * `side` - Band half-width in frames
/// * `insertion_score` - Score of a reference frame with no detected counterpart
/// * `deletion_score` - Score of a detected frame with no reference counterpart
///
/// # Returns
///
/// Edit log in reference coordinates: a horizontal traceback step at reference
/// frame `t` inserts at `t`; a vertical step deletes the detected frame that would
/// otherwise land at `t + 1`.
///
/// # Errors
///
/// - `SyncError::InvalidInput` for empty sequences or levels outside the alphabet
/// - `SyncError::DriftExceedsBand` if the best path touches the band edge, which
///   includes length differences of `side` frames or more, or if a `2 * side`
///   window of the path is dominated by mismatches
pub fn align_banded(
    detected: &[u8],
    reference: &[u8],
    side: usize,
    insertion_score: i32,
    deletion_score: i32,
) -> Result<EditLog, SyncError> {
    if detected.is_empty() || reference.is_empty() {
        return Err(SyncError::InvalidInput(
            "Cannot align empty level sequences".to_string(),
        ));
    }

    if side == 0 {
        return Err(SyncError::InvalidInput("Band side must be > 0".to_string()));
    }

    if let Some(&level) = detected
        .iter()
        .chain(reference)
        .find(|&&l| l as usize >= LEVEL_ALPHABET)
    {
        return Err(SyncError::InvalidInput(format!(
            "Level {} outside the {}-level scoring alphabet",
            level, LEVEL_ALPHABET
        )));
    }

    let rows = detected.len();
    let cols = reference.len();
    let end_offset = BandedMatrix::offset(rows - 1, cols - 1);

    log::debug!(
        "Banded alignment: {} detected vs {} reference frames, side={}",
        rows,
        cols,
        side
    );

    if end_offset.unsigned_abs() >= side {
        return Err(SyncError::DriftExceedsBand {
            position: cols - 1,
            side,
        });
    }

    let matrix = fill_matrix(detected, reference, side, insertion_score, deletion_score);
    let (log, mismatches) =
        traceback(&matrix, detected, reference, insertion_score, deletion_score)?;
    check_mismatch_density(&mismatches, side)?;

    log::debug!(
        "Banded alignment: {} insertions, {} deletions",
        log.insertions(),
        log.deletions()
    );

    Ok(log)
}

fn fill_matrix(
    detected: &[u8],
    reference: &[u8],
    side: usize,
    insertion_score: i32,
    deletion_score: i32,
) -> BandedMatrix {
    let rows = detected.len();
    let cols = reference.len();
    let side_i = side as isize;
    let mut matrix = BandedMatrix::new(rows, side, DISABLED);

    let origin = level_score(reference[0], detected[0]);
    matrix.set(0, 0, origin);

    // First row: leading reference frames are insertions
    for t in 1..=side.min(cols - 1) {
        matrix.set(0, t as isize, origin + insertion_score * t as i32);
    }
    // First column: leading detected frames are deletions
    for s in 1..=side.min(rows - 1) {
        matrix.set(s, -(s as isize), origin + deletion_score * s as i32);
    }

    for s in 1..rows {
        for d in -side_i..=side_i {
            let Some(t) = BandedMatrix::column(s, d) else {
                continue;
            };
            if t == 0 || t >= cols {
                continue;
            }

            let diagonal = matrix.get(s - 1, d).unwrap_or(DISABLED);
            let matched = diagonal.saturating_add(level_score(reference[t], detected[s]));

            // Band edges: the move that would come from outside the band is disabled
            let insert = if d > -side_i {
                matrix
                    .get(s, d - 1)
                    .unwrap_or(DISABLED)
                    .saturating_add(insertion_score)
            } else {
                DISABLED
            };
            let delete = if d < side_i {
                matrix
                    .get(s - 1, d + 1)
                    .unwrap_or(DISABLED)
                    .saturating_add(deletion_score)
            } else {
                DISABLED
            };

            matrix.set(s, d, matched.max(insert).max(delete));
        }
    }

    matrix
}

/// Walk back from the last cell, returning the edit log and the reference frames
/// of mismatching pairs in ascending order
fn traceback(
    matrix: &BandedMatrix,
    detected: &[u8],
    reference: &[u8],
    insertion_score: i32,
    deletion_score: i32,
) -> Result<(EditLog, Vec<usize>), SyncError> {
    let side = matrix.side();
    let mut s = detected.len() - 1;
    let mut t = reference.len() - 1;
    let mut operations = Vec::new();
    let mut mismatches = Vec::new();

    while s > 0 || t > 0 {
        let d = BandedMatrix::offset(s, t);
        if d.unsigned_abs() >= side {
            return Err(SyncError::DriftExceedsBand { position: t, side });
        }

        let here = matrix.get(s, d).unwrap_or(DISABLED);

        let is_match = s > 0
            && t > 0
            && matrix
                .get(s - 1, d)
                .is_some_and(|prev| here == prev.saturating_add(level_score(reference[t], detected[s])));

        let is_delete = s > 0
            && (t == 0
                || matrix
                    .get(s - 1, d + 1)
                    .is_some_and(|prev| here == prev.saturating_add(deletion_score)));

        if is_match {
            if detected[s] != reference[t] {
                mismatches.push(t);
            }
            s -= 1;
            t -= 1;
        } else if is_delete {
            operations.push(EditOperation::delete(t + 1));
            s -= 1;
        } else {
            debug_assert!(matrix
                .get(s, d - 1)
                .is_some_and(|prev| here == prev.saturating_add(insertion_score)));
            operations.push(EditOperation::insert(t));
            t -= 1;
        }
    }

    // Both sequences start on the forced first pair
    if detected[0] != reference[0] {
        mismatches.push(0);
    }

    operations.reverse();
    mismatches.reverse();
    Ok((EditLog::from_operations(operations)?, mismatches))
}

/// Fail if any `2 * side` window of reference frames holds too many mismatches
///
/// `mismatches` must be ascending.
fn check_mismatch_density(mismatches: &[usize], side: usize) -> Result<(), SyncError> {
    let window = 2 * side;
    let limit = (window as f32 * MAX_MISMATCH_DENSITY) as usize;

    let mut first = 0;
    for (last, &t) in mismatches.iter().enumerate() {
        while t - mismatches[first] >= window {
            first += 1;
        }
        if last + 1 - first > limit {
            log::warn!(
                "{} of {} frames mismatch from frame {}, drift exceeds the band",
                last + 1 - first,
                window,
                mismatches[first]
            );
            return Err(SyncError::DriftExceedsBand {
                position: mismatches[first],
                side,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::EditKind;

    fn align(detected: &[u8], reference: &[u8]) -> Result<EditLog, SyncError> {
        align_banded(detected, reference, 20, -10, -10)
    }

    #[test]
    fn test_level_score_table() {
        assert_eq!(level_score(0, 0), 1);
        assert_eq!(level_score(0, 1), -1);
        assert_eq!(level_score(0, 4), -1);
        assert_eq!(level_score(0, 2), -3);
        assert_eq!(level_score(2, 0), -3);
        assert_eq!(level_score(3, 4), -1);
        assert_eq!(level_score(4, 4), 1);
    }

    #[test]
    fn test_identical_sequences_need_no_edits() {
        let levels: Vec<u8> = (0..100).map(|i| (i % 3) as u8).collect();
        assert!(align(&levels, &levels).unwrap().is_empty());
    }

    #[test]
    fn test_missing_pair_is_inserted() {
        let log = align(&[0, 1, 1, 0, 1], &[0, 1, 0, 1, 1, 0, 1]).unwrap();

        assert_eq!(
            log.operations(),
            &[EditOperation::insert(1), EditOperation::insert(2)]
        );
    }

    #[test]
    fn test_extra_frame_is_deleted() {
        // Detected has a duplicated 2 in the middle
        let reference: Vec<u8> = vec![0, 1, 2, 3, 4, 0, 1, 2, 3, 4];
        let detected: Vec<u8> = vec![0, 1, 2, 2, 3, 4, 0, 1, 2, 3, 4];

        let log = align(&detected, &reference).unwrap();

        assert_eq!(log.deletions(), 1);
        assert_eq!(log.insertions(), 0);
        let op = log.operations()[0];
        assert_eq!(op.kind, EditKind::Delete);
        assert!(op.position == 3 || op.position == 2 || op.position == 4);
    }

    #[test]
    fn test_ops_stay_within_band() {
        let reference: Vec<u8> = (0..300).map(|i| ((i * 13 + i / 7) % 5) as u8).collect();
        let mut detected = reference.clone();
        detected.remove(120);
        detected.remove(60);
        detected.insert(200, 3);

        let log = align(&detected, &reference).unwrap();
        assert!(!log.is_empty());
        assert!(log.iter().all(|op| op.position <= reference.len()));
    }

    #[test]
    fn test_length_difference_beyond_band_fails() {
        let reference: Vec<u8> = (0..100).map(|i| (i % 2) as u8).collect();
        let detected = &reference[..75];

        assert!(matches!(
            align(detected, &reference),
            Err(SyncError::DriftExceedsBand { side: 20, .. })
        ));
    }

    #[test]
    fn test_drift_on_band_edge_fails() {
        let reference: Vec<u8> = (0..50).map(|i| (i % 5) as u8).collect();
        let detected = &reference[..47];

        assert!(matches!(
            align_banded(detected, &reference, 3, -10, -10),
            Err(SyncError::DriftExceedsBand { side: 3, .. })
        ));
        assert!(align_banded(detected, &reference, 4, -10, -10).is_ok());
    }

    /// Pseudo-random binary levels from a linear congruential generator
    fn random_binary(len: usize, seed: u32) -> Vec<u8> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                ((state >> 16) & 1) as u8
            })
            .collect()
    }

    #[test]
    fn test_drift_inside_sequence_beyond_band_fails() {
        let reference = random_binary(400, 7);
        // 25 frames dropped at 100, then 25 frames shown twice at 200
        let mut detected: Vec<u8> = reference[..100].to_vec();
        detected.extend_from_slice(&reference[125..225]);
        detected.extend_from_slice(&reference[200..]);
        assert_eq!(detected.len(), reference.len());

        assert!(matches!(
            align(&detected, &reference),
            Err(SyncError::DriftExceedsBand { side: 20, .. })
        ));
    }

    #[test]
    fn test_isolated_level_errors_do_not_count_as_drift() {
        let reference = random_binary(400, 11);
        let mut detected = reference.clone();
        for i in [30, 95, 160, 250, 330] {
            detected[i] = 1 - detected[i];
        }

        assert!(align(&detected, &reference).is_ok());
    }

    #[test]
    fn test_mismatch_density_window() {
        // Limit for side 5 is 3 mismatches in 10 frames
        assert!(check_mismatch_density(&[0, 3, 6, 10, 13, 16], 5).is_ok());
        assert!(matches!(
            check_mismatch_density(&[2, 20, 22, 25, 29], 5),
            Err(SyncError::DriftExceedsBand {
                position: 20,
                side: 5
            })
        ));
    }

    #[test]
    fn test_levels_outside_alphabet_are_rejected() {
        assert!(matches!(
            align(&[0, 5], &[0, 1]),
            Err(SyncError::InvalidInput(_))
        ));
    }
}
