//! Start-position matching
//!
//! Recordings usually start before the stimulus. Before alignment, the first
//! stimulus frame is located by cross-correlating the beginning of the reference
//! with the detected levels around a rough onset estimate.
//!
//! # Algorithm
//!
//! 1. Template: the reference up to its `transitions`-th level change, capped at
//!    `max_len` frames
//! 2. Search window: `radius` frames on each side of the first frame after the
//!    estimated onset
//! 3. Valid cross-correlation of the window with the template, computed with FFT
//!    acceleration: `C = IFFT(FFT(window) · conj(FFT(template)))`
//! 4. The first maximum gives the start frame

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::error::SyncError;

/// Locate the first stimulus frame in the detected levels
///
/// # Arguments
///
/// * `timepoints` - Detected frame edges in samples
/// * `detected` - Detected levels, one per timepoint
/// * `reference` - Reference levels
/// * `estimate` - Rough stimulus onset in samples
/// * `transitions` - Reference level changes included in the template (default: 50)
/// * `max_len` - Maximum template length (default: 600)
/// * `radius` - Frames searched on each side of the estimate (default: 1000)
///
/// # Returns
///
/// Index into `detected` where the reference most likely begins. The estimate maps
/// to frame 0 if every timepoint lies before it.
///
/// # Errors
///
/// Returns `SyncError::InvalidInput` if inputs are empty or differ in length, or if
/// the search window is shorter than the template
pub fn match_starting_position(
    timepoints: &[usize],
    detected: &[u8],
    reference: &[u8],
    estimate: usize,
    transitions: usize,
    max_len: usize,
    radius: usize,
) -> Result<usize, SyncError> {
    if detected.is_empty() || reference.is_empty() {
        return Err(SyncError::InvalidInput(
            "Cannot match start position on empty level sequences".to_string(),
        ));
    }

    if timepoints.len() != detected.len() {
        return Err(SyncError::InvalidInput(format!(
            "Timepoints ({}) and levels ({}) differ in length",
            timepoints.len(),
            detected.len()
        )));
    }

    let template = &reference[..template_length(reference, transitions, max_len)];
    let anchor = timepoints.iter().position(|&tp| tp > estimate).unwrap_or(0);
    let start = anchor.saturating_sub(radius);
    let stop = (anchor + radius).min(detected.len());

    log::debug!(
        "Start matching: template {} frames, window [{}, {}) around frame {}",
        template.len(),
        start,
        stop,
        anchor
    );

    if stop <= start || stop - start < template.len() {
        return Err(SyncError::InvalidInput(format!(
            "Search window [{}, {}) is shorter than the {}-frame template",
            start,
            stop,
            template.len()
        )));
    }

    let correlation = cross_correlate_valid(&detected[start..stop], template);

    let best = correlation
        .iter()
        .enumerate()
        .fold((0usize, f64::NEG_INFINITY), |best, (k, &c)| {
            if c > best.1 {
                (k, c)
            } else {
                best
            }
        })
        .0;

    log::debug!("Start matching: best offset {}", start + best);

    Ok(start + best)
}

/// Template length: frames up to the `transitions`-th level change, capped at `max_len`
///
/// The whole reference (capped) is used if it has fewer changes.
pub fn template_length(reference: &[u8], transitions: usize, max_len: usize) -> usize {
    let until_transition = reference
        .windows(2)
        .enumerate()
        .filter(|(_, w)| w[0] != w[1])
        .map(|(i, _)| i)
        .nth(transitions)
        .unwrap_or(reference.len());

    until_transition.min(max_len).min(reference.len()).max(1)
}

/// Valid-mode cross-correlation `c[k] = Σ signal[n + k] · template[n]`
///
/// `k` runs over `0..=signal.len() - template.len()`. Levels are integers, so the
/// FFT result is rounded to remove floating-point noise before argmax.
fn cross_correlate_valid(signal: &[u8], template: &[u8]) -> Vec<f64> {
    let n = signal.len();
    let m = template.len();
    let fft_size = (n + m).next_power_of_two();

    let mut a: Vec<Complex<f64>> = signal
        .iter()
        .map(|&x| Complex::new(x as f64, 0.0))
        .collect();
    a.resize(fft_size, Complex::new(0.0, 0.0));

    let mut b: Vec<Complex<f64>> = template
        .iter()
        .map(|&x| Complex::new(x as f64, 0.0))
        .collect();
    b.resize(fft_size, Complex::new(0.0, 0.0));

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);
    fft.process(&mut a);
    fft.process(&mut b);

    for (x, y) in a.iter_mut().zip(&b) {
        *x *= y.conj();
    }

    let ifft = planner.plan_fft_inverse(fft_size);
    ifft.process(&mut a);

    let scale = 1.0 / fft_size as f64;
    a[..=n - m].iter().map(|x| (x.re * scale).round()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Ones at triangular-number frames, zeros elsewhere
    fn sparse_reference(len: usize) -> Vec<u8> {
        let mut levels = vec![0u8; len];
        let mut k = 1;
        let mut pos = 0;
        while pos < len {
            levels[pos] = 1;
            pos += k;
            k += 1;
        }
        levels
    }

    #[test]
    fn test_template_length() {
        let reference = [0u8, 0, 1, 1, 0, 1];
        // Changes after frames 1, 3 and 4
        assert_eq!(template_length(&reference, 0, 600), 1);
        assert_eq!(template_length(&reference, 1, 600), 3);
        assert_eq!(template_length(&reference, 1, 2), 2);
        assert_eq!(template_length(&reference, 10, 600), 6);
    }

    #[test]
    fn test_cross_correlation_matches_direct_sum() {
        let signal = [0u8, 1, 2, 0, 1, 3, 0];
        let template = [1u8, 2, 1];
        let direct: Vec<f64> = (0..=signal.len() - template.len())
            .map(|k| {
                template
                    .iter()
                    .enumerate()
                    .map(|(n, &v)| (signal[n + k] as f64) * (v as f64))
                    .sum()
            })
            .collect();
        assert_eq!(cross_correlate_valid(&signal, &template), direct);
    }

    #[test]
    fn test_finds_stimulus_after_leading_silence() {
        let reference = sparse_reference(400);
        let mut detected = vec![0u8; 200];
        detected.extend_from_slice(&reference);
        let timepoints: Vec<usize> = (0..detected.len()).map(|i| i * 100).collect();

        let start =
            match_starting_position(&timepoints, &detected, &reference, 20_000, 10, 600, 1000)
                .unwrap();
        assert_eq!(start, 200);
    }

    #[test]
    fn test_estimate_after_recording_uses_first_frame() {
        let reference = sparse_reference(100);
        let timepoints: Vec<usize> = (0..reference.len()).map(|i| i * 10).collect();

        let start = match_starting_position(
            &timepoints,
            &reference,
            &reference,
            1_000_000,
            10,
            600,
            1000,
        )
        .unwrap();
        assert_eq!(start, 0);
    }

    #[test]
    fn test_short_window_is_rejected() {
        let reference = vec![0u8, 1, 0, 1, 0, 1, 0, 1];
        let detected = vec![0u8, 1, 0];
        let timepoints = vec![0, 10, 20];

        assert!(matches!(
            match_starting_position(&timepoints, &detected, &reference, 0, 50, 600, 1000),
            Err(SyncError::InvalidInput(_))
        ));
    }
}
