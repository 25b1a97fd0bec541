pub mod alignment;
pub mod cache;
pub mod cli;
pub mod config;
pub mod features;
pub mod metrics;

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::types::{
    ContourPair, FeatureSequence, ReportDistances, ScoreReport, WaveformSignal,
};

use alignment::SequenceAligner;
use config::ScoringConfig;
use features::FeatureExtractor;
use metrics::MetricCalculator;

/// Convenient alias for results returned by scoring modules.
pub type Result<T> = std::result::Result<T, ScoringError>;

/// Broad category of a scoring failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller supplied a value outside the accepted domain.
    InvalidInput,
    /// A non-finite value surfaced mid-computation.
    ComputationFault,
    /// Calibration or analysis settings are inconsistent.
    Config,
    /// Reading a settings file failed.
    Io,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorKind::InvalidInput => "invalid input",
            ErrorKind::ComputationFault => "computation fault",
            ErrorKind::Config => "configuration error",
            ErrorKind::Io => "i/o error",
        };
        f.write_str(label)
    }
}

/// Lightweight error type for the scoring engine.
#[derive(Debug, Clone)]
pub struct ScoringError {
    kind: ErrorKind,
    message: Arc<str>,
}

impl ScoringError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: Arc::from(message.into()),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn computation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ComputationFault, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ScoringError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl Error for ScoringError {}

/// Contours and duration of one analysed recording.
///
/// Profiles are immutable once built, so a reference profile can be shared
/// between concurrent scoring requests (see [`cache::ReferenceCache`]).
#[derive(Debug, Clone, PartialEq)]
pub struct SignalProfile {
    pub pitch: FeatureSequence,
    pub intensity: FeatureSequence,
    pub duration: f64,
    /// Source sample rate in Hz, 0 when unknown.
    pub sample_rate: u32,
}

impl SignalProfile {
    /// Assembles a profile from precomputed contours.
    ///
    /// The source sample rate is unknown here and recorded as 0; scoring never
    /// reads it. Use [`SignalProfile::with_sample_rate`] when it is known.
    pub fn from_contours(pitch: FeatureSequence, intensity: FeatureSequence, duration: f64) -> Self {
        Self {
            pitch,
            intensity,
            duration: duration.max(0.0),
            sample_rate: 0,
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }
}

/// Entry point of the pipeline: extraction, alignment, normalisation, aggregation.
#[derive(Debug)]
pub struct ScoringEngine {
    config: ScoringConfig,
    extractor: FeatureExtractor,
    aligner: SequenceAligner,
    metrics: MetricCalculator,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            extractor: FeatureExtractor::new(config.analysis.clone())?,
            aligner: SequenceAligner::new(),
            metrics: MetricCalculator::new(config.weights, config.normalization),
            config,
        })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    /// Extracts both contours of a recording.
    pub fn analyze(&self, signal: &WaveformSignal) -> SignalProfile {
        self.extractor.profile(signal)
    }

    /// Scores a candidate recording against a reference recording.
    pub fn score(&self, reference: &WaveformSignal, candidate: &WaveformSignal) -> ScoreReport {
        let (reference, candidate) =
            rayon::join(|| self.analyze(reference), || self.analyze(candidate));
        self.score_profiles(&reference, &candidate)
    }

    /// Scores a candidate recording against an already analysed reference.
    pub fn score_against(
        &self,
        reference: &SignalProfile,
        candidate: &WaveformSignal,
    ) -> ScoreReport {
        let candidate = self.analyze(candidate);
        self.score_profiles(reference, &candidate)
    }

    /// Scores many candidates against one reference in parallel, preserving input order.
    pub fn score_batch(
        &self,
        reference: &SignalProfile,
        candidates: &[WaveformSignal],
    ) -> Vec<ScoreReport> {
        debug!(candidates = candidates.len(), "scoring batch");
        candidates
            .par_iter()
            .map(|candidate| self.score_against(reference, candidate))
            .collect()
    }

    pub fn score_profiles(&self, reference: &SignalProfile, candidate: &SignalProfile) -> ScoreReport {
        let (pitch, intensity) = rayon::join(
            || self.aligner.align(&reference.pitch, &candidate.pitch),
            || self.aligner.align(&reference.intensity, &candidate.intensity),
        );
        let pitch_score = self.metrics.pitch_score(&pitch);
        let intensity_score = self.metrics.intensity_score(&intensity);
        let rhythm_score = metrics::compare_durations(reference.duration, candidate.duration);
        let breakdown = self
            .metrics
            .aggregate(pitch_score, intensity_score, rhythm_score);
        info!(
            score = breakdown.overall,
            pitch = breakdown.pitch,
            intensity = breakdown.intensity,
            rhythm = breakdown.rhythm,
            "scored recording"
        );
        ScoreReport {
            breakdown,
            distances: ReportDistances { pitch, intensity },
            reference_duration: reference.duration,
            candidate_duration: candidate.duration,
            pitch: ContourPair::from_sequences(&reference.pitch, &candidate.pitch),
            intensity: ContourPair::from_sequences(&reference.intensity, &candidate.intensity),
        }
    }
}
