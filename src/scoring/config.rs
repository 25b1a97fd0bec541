use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::scoring::{ErrorKind, Result, ScoringError};
use crate::types::FeatureKind;

/// File name looked up inside the assets directory.
pub const CONFIG_FILE: &str = "scoring.json";

const WEIGHT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub analysis: AnalysisSettings,
    pub weights: ScoreWeights,
    pub normalization: NormalizationSettings,
}

impl ScoringConfig {
    /// Reads `scoring.json` from the assets directory, falling back to defaults.
    pub fn load_from_assets(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if path.is_file() {
            Self::from_path(&path)
        } else {
            debug!(path = %path.display(), "no scoring config found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            ScoringError::new(
                ErrorKind::Io,
                format!("failed to read scoring config {}: {err}", path.display()),
            )
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|err| ScoringError::config(format!("invalid scoring config: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.analysis.validate()?;
        self.weights.validate()?;
        self.normalization.validate()
    }
}

/// Pitch tracking algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PitchMethod {
    /// Windowed autocorrelation with a Viterbi path through the candidates.
    #[default]
    Autocorrelation,
    /// Probabilistic YIN, computed at 16 kHz.
    Pyin,
}

/// What happens to frames with no defined value (unvoiced pitch, silent intensity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum UnvoicedPolicy {
    /// Undefined frames become 0.
    #[default]
    ZeroFill,
    /// Undefined frames repeat the nearest defined value.
    Hold,
    /// Undefined frames are dropped from the sequence.
    Skip,
}

/// Frame grid and tracker parameters shared by both contours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Hop between analysis frames, in seconds.
    pub time_step: f64,
    pub pitch_floor: f64,
    pub pitch_ceiling: f64,
    /// Lowest pitch the intensity window must smooth out.
    pub intensity_min_pitch: f64,
    pub pitch_method: PitchMethod,
    pub voicing_threshold: f64,
    pub silence_threshold: f64,
    pub octave_cost: f64,
    pub octave_jump_cost: f64,
    pub voiced_unvoiced_cost: f64,
    pub unvoiced_policy: UnvoicedPolicy,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            time_step: 0.01,
            pitch_floor: 75.0,
            pitch_ceiling: 600.0,
            intensity_min_pitch: 100.0,
            pitch_method: PitchMethod::Autocorrelation,
            voicing_threshold: 0.45,
            silence_threshold: 0.03,
            octave_cost: 0.01,
            octave_jump_cost: 0.35,
            voiced_unvoiced_cost: 0.14,
            unvoiced_policy: UnvoicedPolicy::ZeroFill,
        }
    }
}

impl AnalysisSettings {
    /// Frames per second of every contour.
    pub fn frame_rate(&self) -> f64 {
        1.0 / self.time_step
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive("analysis.time_step", self.time_step)?;
        ensure_positive("analysis.pitch_floor", self.pitch_floor)?;
        ensure_positive("analysis.intensity_min_pitch", self.intensity_min_pitch)?;
        if !(self.pitch_ceiling.is_finite() && self.pitch_ceiling > self.pitch_floor) {
            return Err(ScoringError::config(format!(
                "analysis.pitch_ceiling ({}) must exceed pitch_floor ({})",
                self.pitch_ceiling, self.pitch_floor
            )));
        }
        for (name, value) in [
            ("analysis.voicing_threshold", self.voicing_threshold),
            ("analysis.silence_threshold", self.silence_threshold),
            ("analysis.octave_cost", self.octave_cost),
            ("analysis.octave_jump_cost", self.octave_jump_cost),
            ("analysis.voiced_unvoiced_cost", self.voiced_unvoiced_cost),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ScoringError::config(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Contribution of each sub-score to the final score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub pitch: f64,
    pub intensity: f64,
    pub rhythm: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            pitch: 0.5,
            intensity: 0.3,
            rhythm: 0.2,
        }
    }
}

impl ScoreWeights {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("weights.pitch", self.pitch),
            ("weights.intensity", self.intensity),
            ("weights.rhythm", self.rhythm),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ScoringError::config(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        let sum = self.pitch + self.intensity + self.rhythm;
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ScoringError::config(format!(
                "weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }
}

/// Per-frame distance that maps to a score of 0 (`K` in `max(lenA, lenB) * K`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationSettings {
    pub pitch_scale: f64,
    pub intensity_scale: f64,
}

impl Default for NormalizationSettings {
    fn default() -> Self {
        Self {
            pitch_scale: 200.0,
            intensity_scale: 200.0,
        }
    }
}

impl NormalizationSettings {
    pub fn scale_for(&self, kind: FeatureKind) -> f64 {
        match kind {
            FeatureKind::Pitch => self.pitch_scale,
            FeatureKind::Intensity => self.intensity_scale,
        }
    }

    fn validate(&self) -> Result<()> {
        ensure_positive("normalization.pitch_scale", self.pitch_scale)?;
        ensure_positive("normalization.intensity_scale", self.intensity_scale)
    }
}

fn ensure_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ScoringError::config(format!(
            "{name} must be positive, got {value}"
        )))
    }
}
