mod fill;
mod intensity;
mod pitch;
mod pyin;

use tracing::{debug, warn};

use crate::scoring::config::{AnalysisSettings, PitchMethod};
use crate::scoring::{Result, SignalProfile};
use crate::types::{FeatureKind, FeatureSequence, WaveformSignal};

/// Converts a waveform into pitch and intensity contours on a shared frame grid.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    settings: AnalysisSettings,
}

impl FeatureExtractor {
    pub fn new(settings: AnalysisSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Fundamental frequency per frame in Hz; unvoiced frames follow the unvoiced policy.
    pub fn extract_pitch(&self, signal: &WaveformSignal) -> FeatureSequence {
        if signal.is_degenerate() {
            warn!(
                samples = signal.len(),
                sample_rate = signal.sample_rate(),
                "degenerate signal, pitch contour is empty"
            );
            return FeatureSequence::empty(FeatureKind::Pitch, self.settings.frame_rate());
        }
        let frames = match self.settings.pitch_method {
            PitchMethod::Autocorrelation => pitch::track(signal, &self.settings),
            PitchMethod::Pyin => pyin::track(signal, &self.settings),
        };
        let voiced = frames.iter().filter(|frame| frame.is_some()).count();
        if voiced == 0 && !frames.is_empty() {
            warn!(frames = frames.len(), "no voiced frames detected");
        }
        debug!(
            frames = frames.len(),
            voiced,
            method = ?self.settings.pitch_method,
            "tracked pitch"
        );
        self.finish(FeatureKind::Pitch, &frames)
    }

    /// Intensity per frame in dB; silent frames follow the unvoiced policy.
    pub fn extract_intensity(&self, signal: &WaveformSignal) -> FeatureSequence {
        if signal.is_degenerate() {
            warn!(
                samples = signal.len(),
                sample_rate = signal.sample_rate(),
                "degenerate signal, intensity contour is empty"
            );
            return FeatureSequence::empty(FeatureKind::Intensity, self.settings.frame_rate());
        }
        let frames = intensity::measure(signal, &self.settings);
        debug!(frames = frames.len(), "measured intensity");
        self.finish(FeatureKind::Intensity, &frames)
    }

    /// Both contours plus the signal duration, extracted concurrently.
    pub fn profile(&self, signal: &WaveformSignal) -> SignalProfile {
        let (pitch, intensity) = rayon::join(
            || self.extract_pitch(signal),
            || self.extract_intensity(signal),
        );
        SignalProfile {
            pitch,
            intensity,
            duration: signal.duration_secs(),
            sample_rate: signal.sample_rate(),
        }
    }

    fn finish(&self, kind: FeatureKind, frames: &[Option<f64>]) -> FeatureSequence {
        let values = self.settings.unvoiced_policy.apply(frames);
        FeatureSequence::sanitized(kind, values, self.settings.frame_rate())
    }
}

/// Positions of analysis frames, centred on the signal the way Praat centres them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct FrameGrid {
    pub frames: usize,
    pub first_center: f64,
    pub step: f64,
}

impl FrameGrid {
    /// As many frames as fit a `window`-second window, at least one for a non-empty signal.
    pub fn centered(duration: f64, window: f64, step: f64) -> Self {
        if duration <= 0.0 || step <= 0.0 {
            return Self {
                frames: 0,
                first_center: 0.0,
                step,
            };
        }
        let frames = if duration >= window {
            ((duration - window) / step + 1e-9).floor() as usize + 1
        } else {
            1
        };
        let first_center = (duration - (frames - 1) as f64 * step) / 2.0;
        Self {
            frames,
            first_center,
            step,
        }
    }

    pub fn center(&self, index: usize) -> f64 {
        self.first_center + index as f64 * self.step
    }
}

/// Copies `len` samples centred on `center` seconds, zero-padding past either edge.
pub(crate) fn frame_at(samples: &[f64], sample_rate: f64, center: f64, len: usize) -> Vec<f64> {
    let mid = (center * sample_rate).round() as isize;
    let start = mid - (len / 2) as isize;
    (0..len)
        .map(|offset| {
            let index = start + offset as isize;
            if index >= 0 && (index as usize) < samples.len() {
                samples[index as usize]
            } else {
                0.0
            }
        })
        .collect()
}

/// Rounds a window length in samples up to the next odd count.
pub(crate) fn odd_length(samples: f64) -> usize {
    let len = samples.round().max(1.0) as usize;
    if len % 2 == 0 {
        len + 1
    } else {
        len
    }
}
