//! Local error correction
//!
//! After the alignment and shift pass, a few frames can still disagree with the
//! reference (an edit placed one frame off, a noisy level). For each such frame a
//! small window of the shifted marker is searched for the expected value; when found,
//! the frame is replaced, in every channel, by the matching frame.

use serde::{Deserialize, Serialize};

use super::shifts::FrameChannels;

/// Where a mismatching frame can find the expected value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameMatch {
    /// Index where the marker disagrees with the reference
    pub error_index: usize,

    /// Closest index holding the reference value, if one lies in the window
    pub source_index: Option<usize>,
}

impl FrameMatch {
    /// Signed distance from the error to its source
    pub fn offset(&self) -> Option<isize> {
        self.source_index
            .map(|source| source as isize - self.error_index as isize)
    }
}

/// Single replacement performed by local correction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    /// Frame that was overwritten
    pub error_index: usize,

    /// Frame whose payload was copied
    pub source_index: usize,
}

/// Replacements performed by local correction, in the order applied
pub type ReplacementLog = Vec<Replacement>;

/// Outcome of local correction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalCorrection {
    /// Corrected channels
    pub channels: FrameChannels,

    /// Replacements in the order applied, ascending error order within a pass
    pub replacements: ReplacementLog,

    /// Mismatching frames without a match inside the window
    pub unresolved: Vec<usize>,
}

/// Find, for every frame where `marker` disagrees with `reference`, the closest
/// frame within `range` holding the reference value
///
/// Only the common prefix of both sequences is compared. Windows are clipped at the
/// sequence ends. On equal distance the earlier frame wins.
pub fn find_matches(reference: &[u8], marker: &[u8], range: usize) -> Vec<FrameMatch> {
    let n = reference.len().min(marker.len());

    (0..n)
        .filter(|&i| marker[i] != reference[i])
        .map(|i| {
            let expected = reference[i];
            let source_index = (1..=range).find_map(|dist| {
                let before = i.checked_sub(dist).filter(|&j| marker[j] == expected);
                let after = Some(i + dist).filter(|&j| j < n && marker[j] == expected);
                before.or(after)
            });
            FrameMatch {
                error_index: i,
                source_index,
            }
        })
        .collect()
}

/// Replace mismatching frames with their nearest in-window match
///
/// Within a pass, matches are computed on the pass input and every replacement
/// reads the values from before that pass, so the order of replacements does not
/// matter. A frame left unresolved can find its value in a neighbour another
/// replacement just fixed, so passes repeat until one replaces nothing. The result
/// is stable: correcting it again replaces nothing.
///
/// Replaced frames hold the reference value and are never touched again, so every
/// non-empty pass strictly reduces the number of mismatches.
pub fn correct_local_errors(
    reference: &[u8],
    channels: &FrameChannels,
    range: usize,
) -> LocalCorrection {
    let mut corrected = channels.clone();
    let mut replacements = Vec::new();
    let mut passes = 0usize;

    let (errors, unresolved) = loop {
        passes += 1;
        let matches = find_matches(reference, &corrected.marker, range);
        let before = corrected.clone();
        let mut unresolved = Vec::new();
        let mut replaced = 0usize;

        for m in &matches {
            match m.source_index {
                Some(source) => {
                    replace_frame(&mut corrected, &before, m.error_index, source);
                    replacements.push(Replacement {
                        error_index: m.error_index,
                        source_index: source,
                    });
                    replaced += 1;
                }
                None => unresolved.push(m.error_index),
            }
        }

        if replaced == 0 {
            break (matches.len(), unresolved);
        }
    };

    log::debug!(
        "Local correction: {} replaced in {} passes, {} unresolved of {} remaining errors",
        replacements.len(),
        passes,
        unresolved.len(),
        errors
    );

    if !unresolved.is_empty() {
        log::warn!(
            "{} frames could not be matched within {} frames",
            unresolved.len(),
            range
        );
    }

    LocalCorrection {
        channels: corrected,
        replacements,
        unresolved,
    }
}

/// Copy frame `source` of `from` over frame `error` of `into`, in every channel
fn replace_frame(into: &mut FrameChannels, from: &FrameChannels, error: usize, source: usize) {
    into.marker[error] = from.marker[source];
    into.intensity[error] = from.intensity[source];
    if let (Some(dst), Some(src)) = (into.shader.as_mut(), from.shader.as_ref()) {
        dst[error] = src[source];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channels(marker: Vec<u8>) -> FrameChannels {
        let intensity = (0..marker.len()).map(|i| i as f32).collect();
        FrameChannels::new(intensity, marker, None).unwrap()
    }

    #[test]
    fn test_match_two_frames_away_is_used() {
        let reference = vec![0, 0, 0, 0, 1, 0, 0, 0];
        let marker = vec![0, 0, 0, 0, 0, 0, 1, 0];

        let result = correct_local_errors(&reference, &channels(marker), 5);

        // Frame 4 takes frame 6; frame 6 finds a 0 right next to it
        assert_eq!(
            result.replacements[0],
            Replacement {
                error_index: 4,
                source_index: 6
            }
        );
        assert_eq!(result.channels.marker[4], 1);
        assert_eq!(result.channels.intensity[4], 6.0);
        assert!(result.unresolved.is_empty());
    }

    #[test]
    fn test_match_outside_window_is_unresolved() {
        let mut reference = vec![0u8; 20];
        reference[3] = 1;
        let mut marker = vec![0u8; 20];
        marker[9] = 1;

        let result = correct_local_errors(&reference, &channels(marker), 5);

        assert_eq!(result.unresolved, vec![3]);
        assert_eq!(result.channels.marker[3], 0);
        // Frame 9 is fixed from a neighbouring 0
        assert_eq!(result.replacements.len(), 1);
        assert_eq!(result.replacements[0].error_index, 9);
    }

    #[test]
    fn test_ties_prefer_earlier_frame() {
        let reference = vec![0, 1, 0, 1, 0];
        let marker = vec![0, 1, 1, 1, 0];

        let matches = find_matches(&reference, &marker, 2);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].source_index, Some(0));
        assert_eq!(matches[0].offset(), Some(-2));
    }

    #[test]
    fn test_window_clipped_at_edges() {
        let reference = vec![1, 0, 0];
        let marker = vec![0, 0, 0];
        let matches = find_matches(&reference, &marker, 5);
        assert_eq!(matches[0].source_index, None);
    }

    #[test]
    fn test_correction_is_idempotent() {
        let reference: Vec<u8> = (0..40).map(|i| ((i / 3) % 2) as u8).collect();
        let mut marker = reference.clone();
        marker[10] = 1 - marker[10];
        marker[25] = 1 - marker[25];

        let once = correct_local_errors(&reference, &channels(marker), 5);
        let twice = correct_local_errors(&reference, &once.channels, 5);

        assert_eq!(once.channels, twice.channels);
        assert!(twice.replacements.is_empty());
        assert_eq!(once.channels.marker, reference);
    }

    #[test]
    fn test_unresolved_frame_uses_neighbour_fixed_in_same_run() {
        let mut reference = vec![0u8; 20];
        reference[5] = 1;
        reference[10] = 1;
        let mut marker = vec![0u8; 20];
        marker[15] = 1;

        let once = correct_local_errors(&reference, &channels(marker), 5);

        // Frame 5 sees no 1 within 5 frames until frame 10 has taken frame 15
        assert_eq!(
            once.replacements,
            vec![
                Replacement {
                    error_index: 10,
                    source_index: 15
                },
                Replacement {
                    error_index: 15,
                    source_index: 14
                },
                Replacement {
                    error_index: 5,
                    source_index: 10
                },
            ]
        );
        assert!(once.unresolved.is_empty());
        assert_eq!(once.channels.marker, reference);
        assert_eq!(once.channels.intensity[5], 15.0);

        let twice = correct_local_errors(&reference, &once.channels, 5);
        assert!(twice.replacements.is_empty());
        assert!(twice.unresolved.is_empty());
        assert_eq!(twice.channels, once.channels);
    }

    #[test]
    fn test_unresolved_frames_are_stable() {
        let mut reference = vec![0u8; 20];
        reference[3] = 1;
        let mut marker = vec![0u8; 20];
        marker[9] = 1;

        let once = correct_local_errors(&reference, &channels(marker), 5);
        let twice = correct_local_errors(&reference, &once.channels, 5);

        assert_eq!(once.unresolved, vec![3]);
        assert!(twice.replacements.is_empty());
        assert_eq!(twice.unresolved, vec![3]);
    }

    #[test]
    fn test_shader_follows_replacements() {
        let reference = vec![0, 1, 0];
        let marker = vec![0, 0, 1];
        let bundle =
            FrameChannels::new(vec![0.0, 0.1, 0.2], marker, Some(vec![5.0, 6.0, 7.0])).unwrap();

        let result = correct_local_errors(&reference, &bundle, 5);

        assert_eq!(result.channels.marker, vec![0, 1, 0]);
        assert_eq!(result.channels.shader, Some(vec![5.0, 7.0, 6.0]));
    }
}
