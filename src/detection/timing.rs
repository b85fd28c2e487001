//! Timepoint consistency checks and onset estimation

use std::time::SystemTime;

use crate::analysis::result::SyncWarning;

/// Flag frame intervals deviating from the mean by more than `sigma` standard deviations
///
/// This is a soft consistency signal: a flagged interval usually means a missed
/// frame edge or a glitch in the trace, but detection carries on regardless.
///
/// # Arguments
///
/// * `timepoints` - Frame timepoints in samples (strictly increasing)
/// * `sigma` - Deviation threshold in standard deviations (typically 6.0)
///
/// # Returns
///
/// `Some(SyncWarning::TimepointAnomaly)` listing the offending intervals, or `None`
pub fn check_intervals(timepoints: &[usize], sigma: f32) -> Option<SyncWarning> {
    if timepoints.len() < 3 {
        return None;
    }

    let intervals: Vec<f64> = timepoints
        .windows(2)
        .map(|w| w[1] as f64 - w[0] as f64)
        .collect();

    let n = intervals.len() as f64;
    let mean = intervals.iter().sum::<f64>() / n;
    let variance = intervals.iter().map(|&x| (x - mean) * (x - mean)).sum::<f64>() / n;
    let limit = mean + variance.sqrt() * sigma as f64;

    let frames: Vec<usize> = intervals
        .iter()
        .enumerate()
        .filter(|(_, &x)| x.abs() > limit)
        .map(|(i, _)| i)
        .collect();

    if frames.is_empty() {
        return None;
    }

    let at: Vec<usize> = frames.iter().map(|&i| timepoints[i]).collect();
    log::warn!(
        "Error in timepoints detected in frames {:?} at timepoints {:?}",
        frames,
        at
    );

    Some(SyncWarning::TimepointAnomaly {
        frames,
        timepoints: at,
    })
}

/// Estimate where the stimulus starts in a recording, in samples
///
/// Only whole seconds are used; the start-position matcher refines the estimate.
///
/// # Returns
///
/// `None` if the stimulus started before the recording
pub fn position_estimate(
    record_start: SystemTime,
    stimulus_start: SystemTime,
    sample_rate: f32,
) -> Option<usize> {
    let offset = stimulus_start.duration_since(record_start).ok()?;
    Some((offset.as_secs() as f64 * sample_rate as f64) as usize)
}
