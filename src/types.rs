//! Core value types for the prosody scoring pipeline

use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use ndarray::Array1;
use serde::Serialize;

use crate::scoring::{Result, ScoringError};

/// Decoded mono waveform (f32 samples, normalized to [-1.0, 1.0])
#[derive(Debug, Clone, Default)]
pub struct WaveformSignal {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl WaveformSignal {
    pub fn new(samples: impl Into<Arc<[f32]>>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::new(samples, sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz (e.g., 44100)
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// True when no analysis frame can be taken from this signal.
    pub fn is_degenerate(&self) -> bool {
        self.samples.is_empty() || self.sample_rate == 0
    }

    /// Total duration in seconds; zero for a signal without a sample rate.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_secs())
    }
}

/// Which acoustic contour a feature sequence carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    /// Fundamental frequency in Hz, 0 for unvoiced frames.
    Pitch,
    /// Intensity in dB, 0 for silent frames.
    Intensity,
}

impl Display for FeatureKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureKind::Pitch => write!(f, "pitch"),
            FeatureKind::Intensity => write!(f, "intensity"),
        }
    }
}

/// One scalar per analysis frame. Values are always finite.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSequence {
    kind: FeatureKind,
    values: Array1<f64>,
    frame_rate: f64,
}

impl FeatureSequence {
    /// Builds a sequence, rejecting non-finite values and invalid frame rates.
    pub fn new(kind: FeatureKind, values: Vec<f64>, frame_rate: f64) -> Result<Self> {
        ensure_frame_rate(frame_rate)?;
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(ScoringError::computation(format!(
                "{kind} frame {index} is not finite ({})",
                values[index]
            )));
        }
        Ok(Self {
            kind,
            values: Array1::from(values),
            frame_rate,
        })
    }

    /// Builds a sequence from raw analysis output, replacing NaN/Inf with 0.
    pub fn coerce_finite(kind: FeatureKind, values: Vec<f64>, frame_rate: f64) -> Result<Self> {
        ensure_frame_rate(frame_rate)?;
        Ok(Self::sanitized(kind, values, frame_rate))
    }

    /// Same as [`FeatureSequence::coerce_finite`] for a frame rate already validated upstream.
    pub(crate) fn sanitized(kind: FeatureKind, values: Vec<f64>, frame_rate: f64) -> Self {
        let values = values
            .into_iter()
            .map(|v| if v.is_finite() { v } else { 0.0 })
            .collect::<Vec<_>>();
        Self {
            kind,
            values: Array1::from(values),
            frame_rate,
        }
    }

    pub fn empty(kind: FeatureKind, frame_rate: f64) -> Self {
        Self {
            kind,
            values: Array1::zeros(0),
            frame_rate,
        }
    }

    pub fn kind(&self) -> FeatureKind {
        self.kind
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    /// Values are always built from a `Vec`, so the array is contiguous.
    pub fn as_slice(&self) -> &[f64] {
        self.values.as_slice().unwrap_or(&[])
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.values.to_vec()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Frames per second.
    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    /// Time covered by the frames, in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.values.len() as f64 / self.frame_rate
    }
}

fn ensure_frame_rate(frame_rate: f64) -> Result<()> {
    if frame_rate.is_finite() && frame_rate > 0.0 {
        Ok(())
    } else {
        Err(ScoringError::invalid_input(format!(
            "frame rate must be positive and finite, got {frame_rate}"
        )))
    }
}

/// Cumulative DTW cost plus the lengths of the two aligned sequences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlignmentResult {
    pub distance: f64,
    pub len_a: usize,
    pub len_b: usize,
}

impl AlignmentResult {
    /// Result for a pair where at least one side has no frames.
    pub fn degenerate(len_a: usize, len_b: usize) -> Self {
        Self {
            distance: 0.0,
            len_a,
            len_b,
        }
    }

    pub fn longest(&self) -> usize {
        self.len_a.max(self.len_b)
    }
}

/// Bounded sub-scores and their weighted total, each in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScoreBreakdown {
    pub pitch: f64,
    pub intensity: f64,
    pub rhythm: f64,
    #[serde(rename = "final")]
    pub overall: f64,
}

/// Reference and candidate contours of one feature kind, passed through for plotting.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ContourPair {
    #[serde(rename = "native")]
    pub reference: Vec<f64>,
    #[serde(rename = "learner")]
    pub candidate: Vec<f64>,
}

impl ContourPair {
    pub fn from_sequences(reference: &FeatureSequence, candidate: &FeatureSequence) -> Self {
        Self {
            reference: reference.to_vec(),
            candidate: candidate.to_vec(),
        }
    }
}

/// Raw alignment costs behind the pitch and intensity sub-scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReportDistances {
    pub pitch: AlignmentResult,
    pub intensity: AlignmentResult,
}

/// Everything a scoring request returns.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreReport {
    pub breakdown: ScoreBreakdown,
    pub distances: ReportDistances,
    pub reference_duration: f64,
    pub candidate_duration: f64,
    pub pitch: ContourPair,
    pub intensity: ContourPair,
}

impl ScoreReport {
    /// Response body in the shape consumed by the web client.
    pub fn to_response(&self) -> ReportResponse<'_> {
        ReportResponse {
            score: self.breakdown.overall,
            breakdown: SubScores {
                pitch: self.breakdown.pitch,
                intensity: self.breakdown.intensity,
                rhythm: self.breakdown.rhythm,
            },
            pitch: &self.pitch,
            intensity: &self.intensity,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportResponse<'a> {
    pub score: f64,
    pub breakdown: SubScores,
    pub pitch: &'a ContourPair,
    pub intensity: &'a ContourPair,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SubScores {
    pub pitch: f64,
    pub intensity: f64,
    pub rhythm: f64,
}
