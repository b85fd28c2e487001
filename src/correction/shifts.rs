//! Replaying an edit log onto frame-indexed channels

use serde::{Deserialize, Serialize};

use crate::alignment::{EditKind, EditLog};
use crate::error::SyncError;

/// Frame-indexed payload channels replayed together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameChannels {
    /// Per-frame intensity
    pub intensity: Vec<f32>,

    /// Per-frame marker level, compared against the reference
    pub marker: Vec<u8>,

    /// Optional per-frame auxiliary parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shader: Option<Vec<f32>>,
}

impl FrameChannels {
    /// Bundle channels, rejecting mismatched lengths
    pub fn new(
        intensity: Vec<f32>,
        marker: Vec<u8>,
        shader: Option<Vec<f32>>,
    ) -> Result<Self, SyncError> {
        let channels = Self {
            intensity,
            marker,
            shader,
        };
        channels.validate()?;
        Ok(channels)
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.marker.len()
    }

    /// True if no frame is present
    pub fn is_empty(&self) -> bool {
        self.marker.is_empty()
    }

    /// Check that every present channel has the marker channel's length
    pub fn validate(&self) -> Result<(), SyncError> {
        let n = self.marker.len();
        let shader_len = self.shader.as_ref().map_or(n, Vec::len);
        if self.intensity.len() != n || shader_len != n {
            return Err(SyncError::InvalidInput(format!(
                "Channel lengths differ: intensity={}, marker={}, shader={}",
                self.intensity.len(),
                n,
                shader_len
            )));
        }
        Ok(())
    }
}

/// Replay `log` onto one channel, producing exactly `target_len` frames
///
/// Operations are applied in position order with a cursor into the source: data is
/// copied unshifted up to each operation, an `Insert` duplicates the preceding
/// output frame, a `Delete` skips one source frame. The tail after the last
/// operation is copied verbatim, padded by repeating the last frame if the source
/// runs out and truncated if it is too long.
///
/// # Errors
///
/// Returns `SyncError::InvalidInput` if the source is empty while `target_len > 0`
pub fn shift_channel<T: Clone>(
    source: &[T],
    log: &EditLog,
    target_len: usize,
) -> Result<Vec<T>, SyncError> {
    if source.is_empty() {
        if target_len == 0 {
            return Ok(Vec::new());
        }
        return Err(SyncError::InvalidInput(
            "Cannot shift an empty channel onto a non-empty axis".to_string(),
        ));
    }

    let mut out: Vec<T> = Vec::with_capacity(target_len);
    let mut cursor = 0usize;
    let mut shift = 0isize;

    for op in log {
        let position = op.position.min(target_len);

        // Unshifted data up to the operation point
        if out.len() < position {
            let take = (position - out.len()).min(source.len() - cursor);
            out.extend_from_slice(&source[cursor..cursor + take]);
            cursor += take;
        }

        match op.kind {
            EditKind::Insert => {
                if out.len() < target_len {
                    let value = out
                        .last()
                        .cloned()
                        .unwrap_or_else(|| source[cursor.min(source.len() - 1)].clone());
                    out.push(value);
                    shift += 1;
                }
            }
            EditKind::Delete => {
                if cursor < source.len() {
                    cursor += 1;
                    shift -= 1;
                }
            }
        }
    }

    if out.len() < target_len {
        let take = (target_len - out.len()).min(source.len() - cursor);
        out.extend_from_slice(&source[cursor..cursor + take]);
    }
    out.truncate(target_len);
    if let Some(last) = out.last().cloned() {
        out.resize(target_len, last);
    }

    log::debug!(
        "Shifted channel: {} -> {} frames, cumulative shift {}",
        source.len(),
        out.len(),
        shift
    );

    Ok(out)
}

/// Replay `log` onto every channel of a bundle
///
/// # Errors
///
/// Returns `SyncError::InvalidInput` for mismatched channel lengths or an empty bundle
pub fn apply_shifts(
    channels: &FrameChannels,
    log: &EditLog,
    target_len: usize,
) -> Result<FrameChannels, SyncError> {
    channels.validate()?;

    Ok(FrameChannels {
        intensity: shift_channel(&channels.intensity, log, target_len)?,
        marker: shift_channel(&channels.marker, log, target_len)?,
        shader: channels
            .shader
            .as_ref()
            .map(|shader| shift_channel(shader, log, target_len))
            .transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::EditOperation;

    fn log(ops: Vec<EditOperation>) -> EditLog {
        EditLog::from_operations(ops).unwrap()
    }

    #[test]
    fn test_empty_log_is_identity() {
        let source = vec![3, 1, 4, 1, 5];
        let out = shift_channel(&source, &EditLog::new(), 5).unwrap();
        assert_eq!(out, source);
    }

    #[test]
    fn test_insert_duplicates_previous_frame() {
        let source = vec![10, 20, 30, 40];
        let out = shift_channel(&source, &log(vec![EditOperation::insert(2)]), 5).unwrap();
        assert_eq!(out, vec![10, 20, 20, 30, 40]);
    }

    #[test]
    fn test_delete_skips_source_frame() {
        let source = vec![10, 20, 25, 30, 40];
        let out = shift_channel(&source, &log(vec![EditOperation::delete(2)]), 4).unwrap();
        assert_eq!(out, vec![10, 20, 30, 40]);
    }

    #[test]
    fn test_mixed_operations_track_cumulative_shift() {
        let source: Vec<u32> = (0..10).collect();
        let ops = vec![
            EditOperation::insert(1),
            EditOperation::delete(4),
            EditOperation::delete(4),
            EditOperation::insert(7),
        ];
        let out = shift_channel(&source, &log(ops), 10).unwrap();
        // 0 | dup 0 | 1 2 | skip 3 4 | 5 6 7 | dup 7 | 8 9 -> truncated to 10
        assert_eq!(out, vec![0, 0, 1, 2, 5, 6, 7, 7, 8, 9]);
    }

    #[test]
    fn test_output_length_always_matches_target() {
        let source: Vec<u8> = (0..20).map(|i| (i % 2) as u8).collect();
        let logs = vec![
            EditLog::new(),
            log(vec![EditOperation::insert(0), EditOperation::insert(3)]),
            log(vec![EditOperation::delete(5), EditOperation::delete(19)]),
            log(vec![EditOperation::insert(18), EditOperation::delete(40)]),
        ];
        for edits in &logs {
            for target_len in [1, 15, 20, 26] {
                let out = shift_channel(&source, edits, target_len).unwrap();
                assert_eq!(out.len(), target_len);
            }
        }
    }

    #[test]
    fn test_apply_shifts_moves_all_channels_together() {
        let channels = FrameChannels::new(
            vec![0.1, 0.2, 0.3],
            vec![0, 1, 0],
            Some(vec![7.0, 8.0, 9.0]),
        )
        .unwrap();
        let out = apply_shifts(&channels, &log(vec![EditOperation::insert(1)]), 4).unwrap();

        assert_eq!(out.marker, vec![0, 0, 1, 0]);
        assert_eq!(out.intensity, vec![0.1, 0.1, 0.2, 0.3]);
        assert_eq!(out.shader, Some(vec![7.0, 7.0, 8.0, 9.0]));
    }

    #[test]
    fn test_mismatched_channels_are_rejected() {
        assert!(FrameChannels::new(vec![0.0; 3], vec![0; 4], None).is_err());
    }
}
