use aus::analysis;
use tracing::warn;

use crate::audio::resample;
use crate::scoring::config::AnalysisSettings;
use crate::types::WaveformSignal;

use super::{odd_length, FrameGrid};

const PYIN_SAMPLE_RATE: u32 = 16_000;
const PYIN_WINDOW_MS: usize = 25;
const PERIODS_PER_WINDOW: f64 = 3.0;

/// Per-frame pitch from probabilistic YIN, mapped onto the autocorrelation frame grid.
pub(super) fn track(signal: &WaveformSignal, settings: &AnalysisSettings) -> Vec<Option<f64>> {
    let sample_rate = signal.sample_rate() as f64;
    let window_len = odd_length(PERIODS_PER_WINDOW / settings.pitch_floor * sample_rate);
    let grid = FrameGrid::centered(
        signal.duration_secs(),
        window_len as f64 / sample_rate,
        settings.time_step,
    );
    if grid.frames == 0 {
        return Vec::new();
    }

    let finite = finite_samples(signal.samples());
    let samples = match resample::linear_resample(
        &finite,
        signal.sample_rate(),
        PYIN_SAMPLE_RATE,
    ) {
        Ok(samples) => samples,
        Err(err) => {
            warn!(error = %err, "pyin resampling failed, treating signal as unvoiced");
            return vec![None; grid.frames];
        }
    };
    let audio: Vec<f64> = samples.into_iter().map(f64::from).collect();
    let frame_len = ((PYIN_SAMPLE_RATE as usize * PYIN_WINDOW_MS) / 1000).max(1);
    if audio.len() < frame_len {
        return vec![None; grid.frames];
    }
    let (_timestamps, pitches, voiced_flags, _confidence) = analysis::pyin_pitch_estimator(
        &audio,
        PYIN_SAMPLE_RATE,
        settings.pitch_floor,
        settings.pitch_ceiling,
        frame_len,
    );
    let estimates: Vec<Option<f64>> = pitches
        .iter()
        .zip(voiced_flags.iter())
        .map(|(&pitch, &voiced)| (voiced && pitch.is_finite() && pitch > 0.0).then_some(pitch))
        .collect();
    nearest_frames(&estimates, grid.frames)
}

/// Copies the samples with NaN and infinities replaced by silence; pYIN panics on them.
fn finite_samples(samples: &[f32]) -> Vec<f32> {
    let invalid = samples.iter().filter(|s| !s.is_finite()).count();
    if invalid > 0 {
        warn!(invalid, "zeroing non-finite samples before pyin");
    }
    samples
        .iter()
        .map(|&s| if s.is_finite() { s } else { 0.0 })
        .collect()
}

/// Resamples per-frame estimates to `frame_count` frames by nearest position.
fn nearest_frames(estimates: &[Option<f64>], frame_count: usize) -> Vec<Option<f64>> {
    match (frame_count, estimates.len()) {
        (0, _) => Vec::new(),
        (_, 0) => vec![None; frame_count],
        (count, len) if count == len => estimates.to_vec(),
        (count, len) => {
            let denom = (count - 1).max(1) as f64;
            (0..count)
                .map(|frame| {
                    let position = frame as f64 * (len - 1) as f64 / denom;
                    estimates[(position.round() as usize).min(len - 1)]
                })
                .collect()
        }
    }
}
