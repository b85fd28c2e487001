//! Human-readable match display
//!
//! Prints reference, recorded and corrected levels side by side at the start, middle
//! and end of the reference, to eyeball whether a start position or a correction
//! is right.
//!
//! # Example
//!
//! ```
//! use frame_sync::analysis::report::render_match;
//!
//! let reference = [0u8, 1, 1, 0, 1, 0];
//! let recorded = [1u8, 1, 0, 1, 1, 0, 1, 0];
//! let text = render_match(2, &reference, Some(&recorded[..]), None, 3);
//! assert!(text.starts_with("REF [0]  0 1 1\nREC [0]  0 1 1\n"));
//! ```

use std::fmt::Write;

use crate::alignment::{EditKind, EditLog};

/// Render reference, recorded and corrected levels at three points of the reference
///
/// # Arguments
///
/// * `start` - Frame of `recorded` aligned with reference frame 0
/// * `reference` - Reference levels
/// * `recorded` - Detected levels, shown offset by `start`
/// * `corrected` - Corrected levels on the reference axis
/// * `line_len` - Frames per line (typically 50)
///
/// # Returns
///
/// Blocks of `REF`/`REC`/`COR` lines separated by blank lines. Lines are clipped
/// at the sequence ends.
pub fn render_match(
    start: usize,
    reference: &[u8],
    recorded: Option<&[u8]>,
    corrected: Option<&[u8]>,
    line_len: usize,
) -> String {
    let mut out = String::new();
    let n = reference.len();

    for line in [0, n / 2, n.saturating_sub(line_len)] {
        push_line(&mut out, "REF", line, clipped(reference, line, line_len));
        if let Some(recorded) = recorded {
            push_line(&mut out, "REC", line, clipped(recorded, line + start, line_len));
        }
        if let Some(corrected) = corrected {
            push_line(&mut out, "COR", line, clipped(corrected, line, line_len));
        }
        out.push('\n');
    }

    out
}

fn clipped(levels: &[u8], from: usize, len: usize) -> &[u8] {
    let from = from.min(levels.len());
    let to = (from + len).min(levels.len());
    &levels[from..to]
}

fn push_line(out: &mut String, tag: &str, line: usize, levels: &[u8]) {
    let body: Vec<String> = levels.iter().map(|l| l.to_string()).collect();
    // Writing to a String cannot fail
    let _ = writeln!(out, "{} [{}]  {}", tag, line, body.join(" "));
}

/// Count insertions and deletions with a position in `[from, to)`
///
/// # Returns
///
/// `(insertions, deletions)`
pub fn count_edits_in_window(log: &EditLog, from: usize, to: usize) -> (usize, usize) {
    log.iter()
        .filter(|op| op.position >= from && op.position < to)
        .fold((0, 0), |(ins, del), op| match op.kind {
            EditKind::Insert => (ins + 1, del),
            EditKind::Delete => (ins, del + 1),
        })
}
