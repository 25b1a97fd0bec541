mod rhythm;

pub use rhythm::compare_durations;

use tracing::debug;

use crate::scoring::config::{NormalizationSettings, ScoreWeights};
use crate::types::{AlignmentResult, FeatureKind, ScoreBreakdown};

const MAX_SCORE: f64 = 100.0;

/// Turns alignment distances into bounded scores and combines them.
#[derive(Debug, Clone, Default)]
pub struct MetricCalculator {
    weights: ScoreWeights,
    normalization: NormalizationSettings,
}

impl MetricCalculator {
    pub fn new(weights: ScoreWeights, normalization: NormalizationSettings) -> Self {
        Self {
            weights,
            normalization,
        }
    }

    pub fn weights(&self) -> ScoreWeights {
        self.weights
    }

    pub fn pitch_score(&self, alignment: &AlignmentResult) -> f64 {
        self.score_for(FeatureKind::Pitch, alignment)
    }

    pub fn intensity_score(&self, alignment: &AlignmentResult) -> f64 {
        self.score_for(FeatureKind::Intensity, alignment)
    }

    pub fn score_for(&self, kind: FeatureKind, alignment: &AlignmentResult) -> f64 {
        let score = normalize(
            alignment.distance,
            alignment.len_a,
            alignment.len_b,
            self.normalization.scale_for(kind),
        );
        debug!(%kind, distance = alignment.distance, score, "normalized distance");
        score
    }

    pub fn aggregate(&self, pitch: f64, intensity: f64, rhythm: f64) -> ScoreBreakdown {
        aggregate_with(&self.weights, pitch, intensity, rhythm)
    }
}

/// Maps a DTW distance to a 0-100 similarity using `max(len_a, len_b) * scale` as the zero point.
///
/// An empty side means there is nothing to compare, which scores 0.
pub fn normalize(distance: f64, len_a: usize, len_b: usize, scale: f64) -> f64 {
    if len_a == 0 || len_b == 0 {
        return 0.0;
    }
    let denominator = len_a.max(len_b) as f64 * scale;
    if !(denominator > 0.0) || !distance.is_finite() {
        return 0.0;
    }
    clamp_score(MAX_SCORE * (1.0 - distance.max(0.0) / denominator))
}

/// Weighted total of the three sub-scores, everything rounded to one decimal.
///
/// The total is computed from the unrounded sub-scores.
pub fn aggregate_with(
    weights: &ScoreWeights,
    pitch: f64,
    intensity: f64,
    rhythm: f64,
) -> ScoreBreakdown {
    let (pitch, intensity, rhythm) = (clamp_score(pitch), clamp_score(intensity), clamp_score(rhythm));
    let overall = pitch * weights.pitch + intensity * weights.intensity + rhythm * weights.rhythm;
    ScoreBreakdown {
        pitch: round_tenth(pitch),
        intensity: round_tenth(intensity),
        rhythm: round_tenth(rhythm),
        overall: round_tenth(clamp_score(overall)),
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, MAX_SCORE)
}

/// Rounds to one decimal, ties to even, judged on the exact value of `value`.
///
/// `68.25` becomes `68.2`, while `0.15` (stored slightly below a tie) becomes `0.1`.
pub fn round_tenth(value: f64) -> f64 {
    let scaled = value * 10.0;
    let rounded = if (scaled - scaled.trunc()).abs() == 0.5 {
        // The product may itself have been rounded onto the tie.
        let residual = value.mul_add(10.0, -scaled);
        if residual > 0.0 {
            scaled.ceil()
        } else if residual < 0.0 {
            scaled.floor()
        } else {
            scaled.round_ties_even()
        }
    } else {
        scaled.round()
    };
    rounded / 10.0
}
