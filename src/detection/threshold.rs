//! Threshold utilities for frame detection
//!
//! Sync traces differ in offset and gain between recordings, so thresholds are
//! derived from the trace itself: a fraction of the maximum found in a window
//! starting at the signal midpoint, where the stimulus is almost always running.

use crate::config::SyncConfig;
use crate::error::SyncError;

/// Compute (low, high) thresholds from the maximum of a representative window
///
/// The window starts at `samples.len() / 2` and spans `window` samples (clipped
/// to the end of the signal).
///
/// # Arguments
///
/// * `samples` - Analog sync samples
/// * `window` - Number of samples searched for the maximum
/// * `low_fraction` - Fraction of the maximum used as low threshold (typically 0.25)
/// * `high_fraction` - Fraction of the maximum used as high threshold (typically 0.75)
///
/// # Returns
///
/// `(low_threshold, high_threshold)`
///
/// # Errors
///
/// Returns `SyncError::InvalidInput` if the signal is empty
pub fn window_thresholds(
    samples: &[f32],
    window: usize,
    low_fraction: f32,
    high_fraction: f32,
) -> Result<(f32, f32), SyncError> {
    if samples.is_empty() {
        return Err(SyncError::InvalidInput(
            "Empty signal for threshold calculation".to_string(),
        ));
    }

    let start = samples.len() / 2;
    let end = start.saturating_add(window.max(1)).min(samples.len());

    let max_value = samples[start..end]
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);

    let low = max_value * low_fraction;
    let high = max_value * high_fraction;

    log::debug!(
        "Window thresholds: max={:.4} over [{}, {}), low={:.4}, high={:.4}",
        max_value,
        start,
        end,
        low,
        high
    );

    Ok((low, high))
}

/// Resolve the thresholds for a run, preferring explicit values from the config
pub fn resolve_thresholds(samples: &[f32], config: &SyncConfig) -> Result<(f32, f32), SyncError> {
    let (auto_low, auto_high) = match (config.low_threshold, config.high_threshold) {
        (Some(low), Some(high)) => return Ok((low, high)),
        _ => window_thresholds(
            samples,
            config.threshold_window,
            config.low_fraction,
            config.high_fraction,
        )?,
    };

    Ok((
        config.low_threshold.unwrap_or(auto_low),
        config.high_threshold.unwrap_or(auto_high),
    ))
}

/// Index of the first sample strictly above `threshold`
pub fn first_crossing(samples: &[f32], threshold: f32) -> Option<usize> {
    samples.iter().position(|&x| x > threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_thresholds_uses_second_half() {
        // Large spike in the first half must be ignored
        let mut samples = vec![0.0f32; 100];
        samples[10] = 10.0;
        samples[70] = 2.0;

        let (low, high) = window_thresholds(&samples, 1_000, 0.25, 0.75).unwrap();
        assert!((low - 0.5).abs() < 1e-6);
        assert!((high - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_window_thresholds_empty() {
        assert!(window_thresholds(&[], 10, 0.25, 0.75).is_err());
    }

    #[test]
    fn test_resolve_prefers_explicit_values() {
        let samples = vec![0.0, 4.0, 0.0, 4.0];
        let config = SyncConfig {
            high_threshold: Some(3.5),
            ..Default::default()
        };
        let (low, high) = resolve_thresholds(&samples, &config).unwrap();
        assert_eq!(high, 3.5);
        assert!((low - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_first_crossing() {
        let samples = vec![0.1, 0.2, 0.9, 0.95];
        assert_eq!(first_crossing(&samples, 0.5), Some(2));
        assert_eq!(first_crossing(&samples, 0.95), None);
    }
}
