//! Frame detection from an analog sync trace
//!
//! Algorithm:
//! 1. Find an anchor: the first sample above the high threshold (a confidently "on" frame)
//! 2. Walk forward in steps slightly shorter than a frame; in each window the first
//!    low-threshold crossing is the next frame edge, high if the window also crosses
//!    the high threshold
//! 3. Walk backward from the anchor with steps slightly longer than a frame
//! 4. Extrapolate missing frames before the first backward detection
//! 5. Shift every timepoint a few samples left onto the rising edge
//! 6. Flag inconsistent intervals
//!
//! One call detects one contiguous run of frames. [`detect_frame_runs`] re-invokes
//! the detector on the remainder of the signal to pick up later runs.
//!
//! # Example
//!
//! ```
//! use frame_sync::detection::frames::detect_frames;
//! use frame_sync::SyncConfig;
//!
//! // 10 pulses, one every 100 samples
//! let mut samples = vec![0.0f32; 1300];
//! for k in 0..10 {
//!     for s in &mut samples[200 + 100 * k..220 + 100 * k] {
//!         *s = 1.0;
//!     }
//! }
//! let config = SyncConfig { increment: 100, ..Default::default() };
//! let detection = detect_frames(&samples, &config)?;
//! assert_eq!(detection.markers.len(), 10);
//! # Ok::<(), frame_sync::SyncError>(())
//! ```

use super::threshold::{first_crossing, resolve_thresholds};
use super::timing::check_intervals;
use super::{FrameDetection, LevelSequence, MarkerSequence};
use crate::config::SyncConfig;
use crate::error::SyncError;

/// Detect one contiguous run of frames
///
/// Thresholds come from the config when set, otherwise from the signal
/// (see [`resolve_thresholds`]).
///
/// # Errors
///
/// Returns `SyncError::DetectionFailed` if no sample crosses the high threshold,
/// `SyncError::InvalidInput` for an empty signal or invalid config
pub fn detect_frames(samples: &[f32], config: &SyncConfig) -> Result<FrameDetection, SyncError> {
    config.validate()?;
    let thresholds = resolve_thresholds(samples, config)?;
    detect_frames_with_thresholds(samples, thresholds, config)
}

/// Detect one contiguous run of frames with fixed `(low, high)` thresholds
pub fn detect_frames_with_thresholds(
    samples: &[f32],
    thresholds: (f32, f32),
    config: &SyncConfig,
) -> Result<FrameDetection, SyncError> {
    if samples.is_empty() {
        return Err(SyncError::InvalidInput("Empty sync signal".to_string()));
    }

    let (low, high) = thresholds;
    let increment = config.increment;

    log::debug!(
        "Detecting frames: {} samples, increment={}, low={:.4}, high={:.4}",
        samples.len(),
        increment,
        low,
        high
    );

    let anchor = first_crossing(samples, high).ok_or_else(|| {
        SyncError::DetectionFailed(format!(
            "No sample exceeds the high threshold ({:.4}); detection can't work",
            high
        ))
    })?;

    let reverse = reverse_detection(samples, anchor, low, increment, config.reverse_step_percent);
    let extrapolated = extrapolate_timepoints(&reverse, config.extrapolate_frames);
    let forward = forward_detection(
        samples,
        anchor,
        (low, high),
        increment,
        config.forward_step_percent,
    );

    log::debug!(
        "Frames: {} extrapolated, {} reverse, anchor at {}, {} forward",
        extrapolated.len(),
        reverse.len(),
        anchor,
        forward.len()
    );

    let leading = extrapolated.len() + reverse.len();
    let raw = extrapolated
        .iter()
        .chain(reverse.iter())
        .map(|&tp| (tp, 0u8))
        .chain(std::iter::once((anchor, 1u8)))
        .chain(forward);

    // Saturating at 0 can collapse the earliest frames onto the same sample
    let mut timepoints = Vec::with_capacity(leading + 1);
    let mut levels = Vec::with_capacity(leading + 1);
    for (tp, level) in raw {
        let tp = tp.saturating_sub(config.edge_offset);
        if timepoints.last().is_some_and(|&last| tp <= last) {
            continue;
        }
        timepoints.push(tp);
        levels.push(level);
    }

    let warnings = check_intervals(&timepoints, config.anomaly_sigma)
        .into_iter()
        .collect();

    Ok(FrameDetection {
        markers: MarkerSequence::new(timepoints)?,
        levels: LevelSequence::new(levels),
        extrapolated: extrapolated.len(),
        thresholds,
        warnings,
    })
}

/// Detect every run of frames in a recording
///
/// Thresholds are resolved once on the full signal. After each run, detection
/// restarts one increment past its last frame, until no sample crosses the
/// high threshold any more.
///
/// # Errors
///
/// Returns `SyncError::DetectionFailed` if not even the first run can be detected
pub fn detect_frame_runs(
    samples: &[f32],
    config: &SyncConfig,
) -> Result<Vec<FrameDetection>, SyncError> {
    config.validate()?;
    let thresholds = resolve_thresholds(samples, config)?;

    let mut runs = Vec::new();
    let mut offset = 0;

    while offset < samples.len() {
        let detection = match detect_frames_with_thresholds(&samples[offset..], thresholds, config)
        {
            Ok(detection) => detection,
            Err(SyncError::DetectionFailed(_)) if !runs.is_empty() => break,
            Err(e) => return Err(e),
        };

        let timepoints: Vec<usize> = detection
            .markers
            .timepoints()
            .iter()
            .map(|&tp| tp + offset)
            .collect();
        let next = timepoints.last().map_or(samples.len(), |&last| last + config.increment);

        runs.push(FrameDetection {
            markers: MarkerSequence::new(timepoints)?,
            ..detection
        });

        offset = next;
    }

    log::debug!("Detected {} frame runs", runs.len());
    Ok(runs)
}

/// First sample above `threshold` in `[start, start + len)`, as an absolute index
fn window_crossing(samples: &[f32], start: usize, len: usize, threshold: f32) -> Option<usize> {
    let end = start.saturating_add(len).min(samples.len());
    if start >= end {
        return None;
    }
    first_crossing(&samples[start..end], threshold).map(|k| start + k)
}

fn step_size(increment: usize, percent: usize) -> usize {
    (increment * percent / 100).max(1)
}

/// Walk forward from the anchor, returning (timepoint, level) pairs
fn forward_detection(
    samples: &[f32],
    anchor: usize,
    thresholds: (f32, f32),
    increment: usize,
    step_percent: usize,
) -> Vec<(usize, u8)> {
    let (low, high) = thresholds;
    let step = step_size(increment, step_percent);
    let half = increment / 2;

    let mut frames = Vec::new();
    let mut i = anchor + step;

    while i < samples.len() {
        let end = (i + half).min(samples.len());
        let window = &samples[i..end];

        let Some(k) = first_crossing(window, low) else {
            // This run of frames is over
            break;
        };

        let level = u8::from(window.iter().any(|&x| x > high));
        i += k;
        frames.push((i, level));
        i += step;
    }

    frames
}

/// Walk backward from the anchor, returning timepoints in increasing order
fn reverse_detection(
    samples: &[f32],
    anchor: usize,
    low: f32,
    increment: usize,
    step_percent: usize,
) -> Vec<usize> {
    let step = step_size(increment, step_percent) as isize;
    let half = increment / 2;

    let mut timepoints = Vec::new();
    let mut i = anchor as isize - step;

    while i > 0 {
        let Some(edge) = window_crossing(samples, i as usize, half, low) else {
            break;
        };
        timepoints.push(edge);

        let next = edge as isize - step;
        if next >= i {
            break;
        }
        i = next;
    }

    timepoints.reverse();
    timepoints
}

/// Synthesize up to `max_frames` frames before the first timepoint
///
/// Frames are placed at the mean spacing of `timepoints`, keeping only positive
/// indices. Needs at least two timepoints to measure a spacing.
pub fn extrapolate_timepoints(timepoints: &[usize], max_frames: usize) -> Vec<usize> {
    if timepoints.len() < 2 {
        return Vec::new();
    }

    let span = timepoints[timepoints.len() - 1] - timepoints[0];
    let spacing = span / (timepoints.len() - 1);
    if spacing == 0 {
        return Vec::new();
    }

    let first = timepoints[0];
    let mut extended: Vec<usize> = (1..=max_frames)
        .map(|k| k * spacing)
        .take_while(|&back| back < first)
        .map(|back| first - back)
        .collect();
    extended.reverse();
    extended
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::result::SyncWarning;

    /// Pulse train: `amplitudes.len()` pulses of `width` samples, one every `period`
    fn pulse_train(
        start: usize,
        period: usize,
        width: usize,
        amplitudes: &[f32],
        total: usize,
    ) -> Vec<f32> {
        let mut samples = vec![0.0f32; total];
        for (k, &amp) in amplitudes.iter().enumerate() {
            let onset = start + k * period;
            for s in &mut samples[onset..(onset + width).min(total)] {
                *s = amp;
            }
        }
        samples
    }

    fn config(increment: usize) -> SyncConfig {
        SyncConfig {
            increment,
            ..Default::default()
        }
    }

    #[test]
    fn test_ten_pulses_give_ten_markers() {
        let samples = pulse_train(200, 100, 20, &[1.0; 10], 1300);
        let detection = detect_frames(&samples, &config(100)).unwrap();

        assert_eq!(detection.markers.len(), 10);
        assert_eq!(detection.markers.timepoints()[0], 197);
        for w in detection.markers.timepoints().windows(2) {
            let spacing = w[1] as i64 - w[0] as i64;
            assert!((spacing - 100).abs() <= 1, "Spacing {} off period", spacing);
        }
        assert!(detection.levels.levels().iter().all(|&l| l == 1));
        assert_eq!(detection.extrapolated, 0);
        assert!(detection.warnings.is_empty());
    }

    #[test]
    fn test_reverse_detection_recovers_low_frames() {
        // First four pulses never reach the high threshold
        let mut amplitudes = vec![0.5f32; 4];
        amplitudes.extend([1.0f32; 6]);
        let samples = pulse_train(80, 100, 20, &amplitudes, 1100);

        let detection = detect_frames(&samples, &config(100)).unwrap();

        assert_eq!(detection.markers.len(), 10);
        assert_eq!(
            detection.levels.levels(),
            &[0, 0, 0, 0, 1, 1, 1, 1, 1, 1]
        );
        assert_eq!(detection.markers.timepoints()[0], 77);
        assert_eq!(detection.extrapolated, 0);
    }

    #[test]
    fn test_truncated_start_is_extrapolated() {
        let mut amplitudes = vec![0.5f32; 3];
        amplitudes.extend([1.0f32; 5]);
        let samples = pulse_train(250, 100, 20, &amplitudes, 1100);

        let detection = detect_frames(&samples, &config(100)).unwrap();

        // 50 and 150 are synthesized in front of the pulse at 250
        assert_eq!(detection.extrapolated, 2);
        assert_eq!(&detection.markers.timepoints()[..3], &[47, 147, 247]);
        assert_eq!(detection.levels.levels()[0], 0);
    }

    #[test]
    fn test_no_high_sample_is_fatal() {
        let samples = vec![0.1f32; 500];
        let config = SyncConfig {
            low_threshold: Some(0.2),
            high_threshold: Some(0.5),
            ..config(100)
        };
        assert!(matches!(
            detect_frames(&samples, &config),
            Err(SyncError::DetectionFailed(_))
        ));
    }

    #[test]
    fn test_levels_follow_window_maximum() {
        let amplitudes = [1.0, 0.5, 1.0, 0.5, 0.5, 1.0];
        let samples = pulse_train(100, 100, 20, &amplitudes, 800);
        let detection = detect_frames(&samples, &config(100)).unwrap();

        assert_eq!(detection.levels.levels(), &[1, 0, 1, 0, 0, 1]);
    }

    #[test]
    fn test_detect_frame_runs_finds_both_runs() {
        let mut samples = pulse_train(100, 100, 20, &[1.0; 5], 2600);
        let second = pulse_train(2000, 100, 20, &[1.0; 5], 2600);
        for (s, t) in samples.iter_mut().zip(second) {
            *s += t;
        }

        let runs = detect_frame_runs(&samples, &config(100)).unwrap();

        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].markers.len(), 5);
        assert_eq!(runs[1].markers.len(), 5);
        assert_eq!(runs[1].markers.timepoints()[0], 1997);
    }

    #[test]
    fn test_extrapolate_timepoints() {
        assert_eq!(extrapolate_timepoints(&[250, 350, 450], 10), vec![50, 150]);
        assert_eq!(extrapolate_timepoints(&[250, 350, 450], 1), vec![150]);
        assert!(extrapolate_timepoints(&[250], 10).is_empty());
    }

    #[test]
    fn test_late_pulse_is_reported_not_fatal() {
        // 101 pulses, the 51st arrives 20 samples late
        let mut samples = pulse_train(100, 100, 20, &[1.0; 101], 10_300);
        for s in &mut samples[5100..5120] {
            *s = 0.0;
        }
        for s in &mut samples[5120..5140] {
            *s = 1.0;
        }

        let detection = detect_frames(&samples, &config(100)).unwrap();

        assert_eq!(detection.markers.len(), 101);
        assert_eq!(detection.warnings.len(), 1);
        match &detection.warnings[0] {
            SyncWarning::TimepointAnomaly { frames, timepoints } => {
                assert_eq!(frames, &vec![49]);
                assert_eq!(timepoints, &vec![4997]);
            }
            other => panic!("Expected timepoint anomaly, got {:?}", other),
        }
    }
}
