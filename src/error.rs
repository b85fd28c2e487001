//! Error types for the synchronization engine

use std::fmt;

/// Errors that can occur while detecting, aligning or correcting frames
#[derive(Debug, Clone, PartialEq)]
pub enum SyncError {
    /// Invalid input parameters or inconsistent array lengths
    InvalidInput(String),

    /// No sample crosses the high threshold; frame detection cannot start
    DetectionFailed(String),

    /// Banded alignment needed a drift the band cannot represent
    DriftExceedsBand {
        /// Reference index at which the path reached the band edge
        position: usize,
        /// Band half-width in frames
        side: usize,
    },

    /// Iterative drift detection hit its edit cap without settling
    NotConverged {
        /// Number of edits applied before giving up
        iterations: usize,
    },
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            SyncError::DetectionFailed(msg) => write!(f, "Detection failed: {}", msg),
            SyncError::DriftExceedsBand { position, side } => write!(
                f,
                "Drift exceeds alignment band: reached band edge (side={}) at reference frame {}",
                side, position
            ),
            SyncError::NotConverged { iterations } => write!(
                f,
                "Drift detection did not converge after {} edits",
                iterations
            ),
        }
    }
}

impl std::error::Error for SyncError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = SyncError::DriftExceedsBand { position: 42, side: 20 };
        assert!(err.to_string().contains("side=20"));
        assert!(err.to_string().contains("42"));

        let err = SyncError::NotConverged { iterations: 7 };
        assert_eq!(err.to_string(), "Drift detection did not converge after 7 edits");
    }
}
