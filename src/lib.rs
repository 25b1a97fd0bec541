//! Pronunciation scoring by prosody.
//!
//! A learner recording is compared with a native reference of the same
//! sentence: pitch and intensity contours are aligned with dynamic time
//! warping, the alignment costs become 0-100 scores, durations give a rhythm
//! score, and the three are combined into a weighted final score.

pub mod audio;
pub mod config;
pub mod scoring;
pub mod types;

pub use scoring::{ScoringEngine, ScoringError, SignalProfile};
pub use types::{FeatureSequence, ScoreBreakdown, ScoreReport, WaveformSignal};
