use rayon::prelude::*;

use crate::scoring::config::AnalysisSettings;
use crate::types::WaveformSignal;

use super::{frame_at, odd_length, FrameGrid};

/// Physical window length in periods of the minimum pitch.
const WINDOW_PERIODS: f64 = 7.2;
const GAUSS_ALPHA: f64 = 13.2;
/// Squared auditory threshold, (2e-5 Pa)^2.
const REFERENCE_POWER: f64 = 4.0e-10;

/// Per-frame intensity in dB, `None` for frames with no energy.
///
/// Samples are read as pressure in pascal; each frame has its mean removed
/// and is reduced to a Gaussian-weighted mean square. Levels below 0 dB are
/// reported as 0 so the contour stays non-negative.
pub(super) fn measure(signal: &WaveformSignal, settings: &AnalysisSettings) -> Vec<Option<f64>> {
    let sample_rate = signal.sample_rate() as f64;
    let window_len = odd_length(WINDOW_PERIODS / settings.intensity_min_pitch * sample_rate);
    let grid = FrameGrid::centered(
        signal.duration_secs(),
        window_len as f64 / sample_rate,
        settings.time_step,
    );
    let samples: Vec<f64> = signal.samples().iter().map(|&s| f64::from(s)).collect();
    let window = gaussian(window_len, GAUSS_ALPHA);
    let window_sum: f64 = window.iter().sum();

    (0..grid.frames)
        .into_par_iter()
        .map(|index| {
            let frame = frame_at(&samples, sample_rate, grid.center(index), window_len);
            frame_level(&frame, &window, window_sum)
        })
        .collect()
}

fn frame_level(frame: &[f64], window: &[f64], window_sum: f64) -> Option<f64> {
    if window_sum <= 0.0 {
        return None;
    }
    let mean = frame.iter().sum::<f64>() / frame.len() as f64;
    let mean_square = frame
        .iter()
        .zip(window)
        .map(|(&s, &w)| (s - mean).powi(2) * w)
        .sum::<f64>()
        / window_sum;
    if mean_square <= 0.0 {
        return None;
    }
    let level = 10.0 * (mean_square / REFERENCE_POWER).log10();
    level.is_finite().then_some(level.max(0.0))
}

fn gaussian(len: usize, alpha: f64) -> Vec<f64> {
    if len <= 1 {
        return vec![1.0; len];
    }
    let mid = (len - 1) as f64 / 2.0;
    let edge = (-alpha).exp();
    (0..len)
        .map(|i| {
            let x = (i as f64 - mid) / mid;
            ((-alpha * x * x).exp() - edge) / (1.0 - edge)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn gaussian_peaks_at_centre_and_vanishes_at_edges() {
        let window = gaussian(9, GAUSS_ALPHA);
        assert_abs_diff_eq!(window[4], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(window[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(window[8], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn full_scale_square_wave_is_about_94_db() {
        let frame: Vec<f64> = (0..101).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let window = vec![1.0; frame.len()];
        let level = frame_level(&frame, &window, window.len() as f64).unwrap();
        // mean is 1/101, so the mean square is just under 1 Pa^2
        assert_abs_diff_eq!(level, 93.98, epsilon = 0.05);
    }

    #[test]
    fn dc_only_frame_is_undefined() {
        let frame = vec![0.25; 11];
        let window = gaussian(11, GAUSS_ALPHA);
        let sum = window.iter().sum();
        assert_eq!(frame_level(&frame, &window, sum), None);
    }
}
