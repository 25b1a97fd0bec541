use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use approx::assert_abs_diff_eq;
use prosody_scorer::scoring::cache::ReferenceCache;
use prosody_scorer::scoring::config::ScoringConfig;
use prosody_scorer::scoring::{Result, ScoringEngine, ScoringError, SignalProfile};
use prosody_scorer::types::{FeatureKind, FeatureSequence, WaveformSignal};
use serde::Deserialize;

const SAMPLE_RATE: u32 = 16_000;
const FRAME_RATE: f64 = 100.0;

#[derive(Deserialize)]
struct ProfileFixture {
    reference: RawProfile,
    candidate: RawProfile,
    expected: ExpectedScores,
}

#[derive(Deserialize)]
struct RawProfile {
    pitch: Vec<f64>,
    intensity: Vec<f64>,
    duration: f64,
}

#[derive(Deserialize)]
struct ExpectedScores {
    pitch: f64,
    intensity: f64,
    rhythm: f64,
    #[serde(rename = "final")]
    overall: f64,
}

impl RawProfile {
    fn into_profile(self) -> Result<SignalProfile> {
        Ok(SignalProfile::from_contours(
            FeatureSequence::new(FeatureKind::Pitch, self.pitch, FRAME_RATE)?,
            FeatureSequence::new(FeatureKind::Intensity, self.intensity, FRAME_RATE)?,
            self.duration,
        ))
    }
}

fn engine() -> Result<ScoringEngine> {
    ScoringEngine::new(ScoringConfig::default())
}

fn check_fixture(name: &str) -> Result<()> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/profiles")
        .join(format!("{name}.json"));
    let file = File::open(&path).map_err(|err| ScoringError::invalid_input(err.to_string()))?;
    let fixture: ProfileFixture = serde_json::from_reader(file)
        .map_err(|err| ScoringError::invalid_input(err.to_string()))?;
    let reference = fixture.reference.into_profile()?;
    let candidate = fixture.candidate.into_profile()?;

    let report = engine()?.score_profiles(&reference, &candidate);
    let breakdown = report.breakdown;
    assert_eq!(breakdown.pitch, fixture.expected.pitch, "{name}: pitch");
    assert_eq!(breakdown.intensity, fixture.expected.intensity, "{name}: intensity");
    assert_eq!(breakdown.rhythm, fixture.expected.rhythm, "{name}: rhythm");
    assert_eq!(breakdown.overall, fixture.expected.overall, "{name}: final");
    Ok(())
}

#[test]
fn identical_contours_score_full_marks() -> Result<()> {
    check_fixture("identical")
}

#[test]
fn empty_candidate_pitch_scores_zero_without_fault() -> Result<()> {
    check_fixture("empty_candidate_pitch")
}

#[test]
fn slower_learner_only_loses_rhythm() -> Result<()> {
    check_fixture("slower_learner")
}

#[test]
fn off_key_learner_loses_pitch() -> Result<()> {
    check_fixture("off_key")
}

fn tone(frequency: f32, seconds: f32) -> WaveformSignal {
    let total = (SAMPLE_RATE as f32 * seconds) as usize;
    let samples = (0..total)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            let envelope = (std::f32::consts::PI * i as f32 / total as f32).sin();
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.4 * envelope
        })
        .collect();
    WaveformSignal::from_samples(samples, SAMPLE_RATE)
}

#[test]
fn same_recording_scores_hundred() -> Result<()> {
    let native = tone(200.0, 1.0);
    let report = engine()?.score(&native, &native);
    assert_eq!(report.breakdown.overall, 100.0);
    assert_eq!(report.distances.pitch.distance, 0.0);
    assert_eq!(report.pitch.reference, report.pitch.candidate);
    assert!(!report.intensity.reference.is_empty());
    Ok(())
}

#[test]
fn different_recording_scores_lower() -> Result<()> {
    let native = tone(200.0, 1.0);
    let learner = tone(320.0, 1.5);
    let report = engine()?.score(&native, &learner);
    assert!(report.breakdown.overall < 100.0);
    assert!(report.breakdown.pitch < 100.0);
    assert_abs_diff_eq!(report.breakdown.rhythm, 66.7, epsilon = 1e-9);
    assert!(report.distances.pitch.distance > 0.0);
    assert_eq!(report.reference_duration, 1.0);
    assert_eq!(report.candidate_duration, 1.5);
    Ok(())
}

#[test]
fn empty_learner_recording_is_defined() -> Result<()> {
    let native = tone(200.0, 0.5);
    let empty = WaveformSignal::from_samples(Vec::new(), SAMPLE_RATE);
    let report = engine()?.score(&native, &empty);
    assert_eq!(report.breakdown.pitch, 0.0);
    assert_eq!(report.breakdown.intensity, 0.0);
    assert_eq!(report.breakdown.rhythm, 0.0);
    assert_eq!(report.breakdown.overall, 0.0);
    assert!(report.pitch.candidate.is_empty());
    Ok(())
}

#[test]
fn batch_matches_individual_scoring() -> Result<()> {
    let engine = engine()?;
    let native = engine.analyze(&tone(200.0, 1.0));
    let learners = vec![tone(200.0, 1.0), tone(250.0, 0.8), tone(180.0, 1.2)];
    let batch = engine.score_batch(&native, &learners);
    assert_eq!(batch.len(), learners.len());
    for (learner, report) in learners.iter().zip(&batch) {
        assert_eq!(&engine.score_against(&native, learner), report);
    }
    assert_eq!(batch[0].breakdown.overall, 100.0);
    Ok(())
}

#[test]
fn cached_reference_is_shared_between_requests() -> Result<()> {
    let engine = engine()?;
    let cache = ReferenceCache::new();
    let native = tone(200.0, 1.0);
    let first = cache.get_or_try_insert_with("ch1_1", || Ok::<_, ScoringError>(engine.analyze(&native)))?;
    let second = cache.get_or_try_insert_with("ch1_1", || Ok::<_, ScoringError>(engine.analyze(&native)))?;
    assert!(Arc::ptr_eq(&first, &second));

    let learner = tone(200.0, 1.0);
    let cached = engine.score_against(&first, &learner);
    let fresh = engine.score(&native, &learner);
    assert_eq!(cached, fresh);
    Ok(())
}

#[test]
fn report_serialises_to_response_shape() -> Result<()> {
    let native = tone(200.0, 0.5);
    let report = engine()?.score(&native, &native);
    let json = serde_json::to_value(report.to_response())
        .map_err(|err| ScoringError::invalid_input(err.to_string()))?;
    assert_eq!(json["score"], 100.0);
    assert_eq!(json["breakdown"]["pitch"], 100.0);
    assert!(json["breakdown"]["intensity"].is_number());
    assert!(json["breakdown"]["rhythm"].is_number());
    assert!(json["pitch"]["native"].is_array());
    assert!(json["pitch"]["learner"].is_array());
    assert!(json["intensity"]["native"].is_array());
    assert!(json["intensity"]["learner"].is_array());
    Ok(())
}
