//! Configuration parameters for frame synchronization

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Alignment strategy used to reconcile detected and reference levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlignStrategy {
    /// Exact banded Needleman-Wunsch alignment
    Banded,
    /// Iterative convolution-based drift detection, falling back to `Banded`
    /// when it does not converge
    Convolution,
}

/// Synchronization configuration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    // Thresholds
    /// Low threshold for frame edges (default: None = `low_fraction` of the window max)
    pub low_threshold: Option<f32>,

    /// High threshold for "on" frames (default: None = `high_fraction` of the window max)
    pub high_threshold: Option<f32>,

    /// Fraction of the window maximum used as high threshold (default: 0.75)
    pub high_fraction: f32,

    /// Fraction of the window maximum used as low threshold (default: 0.25)
    pub low_fraction: f32,

    /// Number of samples, from the signal midpoint on, searched for the maximum
    /// (default: 10_000_000)
    pub threshold_window: usize,

    // Frame detection
    /// Expected number of samples per frame (default: 60)
    pub increment: usize,

    /// Forward step in percent of `increment` (default: 95)
    pub forward_step_percent: usize,

    /// Reverse step in percent of `increment` (default: 105)
    pub reverse_step_percent: usize,

    /// Maximum number of frames synthesized before the first detection (default: 10)
    pub extrapolate_frames: usize,

    /// Samples subtracted from every timepoint to land on the rising edge (default: 3)
    pub edge_offset: usize,

    /// Interval anomaly threshold in standard deviations (default: 6.0)
    pub anomaly_sigma: f32,

    // Clustering
    /// Number of intensity levels; clustering runs only above 2 (default: 2)
    pub n_cluster: usize,

    /// Gaps ignored at each tail of the sorted areas (default: 5)
    pub cluster_tail_skip: usize,

    /// Minimum gap size in standard deviations of the gap distribution (default: 3.0)
    pub cluster_gap_sigma: f32,

    // Start position
    /// Reference transitions used as matching template (default: 50)
    pub match_transitions: usize,

    /// Maximum template length in frames (default: 600)
    pub match_max_len: usize,

    /// Frames searched on each side of the onset estimate (default: 1000)
    pub match_search_radius: usize,

    /// Rough stimulus onset in samples; None starts alignment at frame 0 (default: None)
    pub onset_estimate: Option<usize>,

    // Alignment
    /// Alignment strategy (default: Banded)
    pub strategy: AlignStrategy,

    /// Band half-width for banded alignment (default: 20)
    pub band_side: usize,

    /// Score of a reference frame with no detected counterpart (default: -10)
    pub insertion_score: i32,

    /// Score of a detected frame with no reference counterpart (default: -10)
    pub deletion_score: i32,

    /// Window half-width for local matching (default: 5)
    pub search_range: usize,

    /// Moving-average width used to smooth sparse offsets (default: 20)
    pub smoothing_window: usize,

    /// Smoothed offset magnitude treated as a genuine shift (default: 0.5)
    pub shift_threshold: f32,

    /// Maximum number of edits the convolution detector may apply (default: 10_000)
    pub max_iterations: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            low_threshold: None,
            high_threshold: None,
            high_fraction: 0.75,
            low_fraction: 0.25,
            threshold_window: 10_000_000,
            increment: 60,
            forward_step_percent: 95,
            reverse_step_percent: 105,
            extrapolate_frames: 10,
            edge_offset: 3,
            anomaly_sigma: 6.0,
            n_cluster: 2,
            cluster_tail_skip: 5,
            cluster_gap_sigma: 3.0,
            match_transitions: 50,
            match_max_len: 600,
            match_search_radius: 1000,
            onset_estimate: None,
            strategy: AlignStrategy::Banded,
            band_side: 20,
            insertion_score: -10,
            deletion_score: -10,
            search_range: 5,
            smoothing_window: 20,
            shift_threshold: 0.5,
            max_iterations: 10_000,
        }
    }
}

impl SyncConfig {
    /// Check parameters for values no stage can work with
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.increment < 2 {
            return Err(SyncError::InvalidInput(format!(
                "Increment must be >= 2 samples, got {}",
                self.increment
            )));
        }

        if !(self.low_fraction > 0.0 && self.low_fraction < self.high_fraction) {
            return Err(SyncError::InvalidInput(format!(
                "Threshold fractions must satisfy 0 < low < high, got low={} high={}",
                self.low_fraction, self.high_fraction
            )));
        }

        if let (Some(low), Some(high)) = (self.low_threshold, self.high_threshold) {
            if low >= high {
                return Err(SyncError::InvalidInput(format!(
                    "Low threshold ({}) must be below high threshold ({})",
                    low, high
                )));
            }
        }

        if self.forward_step_percent == 0 || self.reverse_step_percent <= 50 {
            return Err(SyncError::InvalidInput(format!(
                "Step percents out of range: forward={} reverse={} (reverse must exceed 50)",
                self.forward_step_percent, self.reverse_step_percent
            )));
        }

        if self.band_side == 0 {
            return Err(SyncError::InvalidInput(
                "Band side must be > 0".to_string(),
            ));
        }

        if self.smoothing_window == 0 {
            return Err(SyncError::InvalidInput(
                "Smoothing window must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}
