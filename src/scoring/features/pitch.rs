//! Autocorrelation pitch tracking.
//!
//! Each frame is Hann-windowed, autocorrelated through an FFT and divided by
//! the window's own autocorrelation. Peaks of the normalised autocorrelation
//! inside the pitch range become voiced candidates; every frame also carries
//! one unvoiced candidate whose strength grows as the frame gets quieter.
//! A Viterbi pass then picks one candidate per frame, penalising octave jumps
//! and voicing changes.

use std::sync::Arc;

use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::scoring::config::AnalysisSettings;
use crate::types::WaveformSignal;

use super::{frame_at, odd_length, FrameGrid};

/// Window length in periods of the pitch floor.
const PERIODS_PER_WINDOW: f64 = 3.0;
/// Voiced candidates kept per frame, strongest first.
const MAX_VOICED_CANDIDATES: usize = 14;
/// Transition costs are defined per 10 ms of hop.
const REFERENCE_STEP: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    /// 0 for the unvoiced candidate.
    frequency: f64,
    strength: f64,
}

/// Per-frame pitch in Hz, `None` where the frame is unvoiced.
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

    let samples = centered_samples(signal.samples());
    let global_peak = samples.iter().fold(0.0_f64, |peak, s| peak.max(s.abs()));
    if global_peak <= 0.0 {
        return vec![None; grid.frames];
    }

    let min_lag = ((sample_rate / settings.pitch_ceiling).ceil() as usize).max(1);
    let max_lag = ((sample_rate / settings.pitch_floor).floor() as usize).min(window_len - 1);
    let correlator = Autocorrelator::new(window_len, max_lag);
    let window = hann(window_len);
    let window_ac = correlator.normalized(&window);

    let analysis = FrameAnalysis {
        settings,
        sample_rate,
        window: &window,
        window_ac: &window_ac,
        correlator: &correlator,
        min_lag,
        max_lag,
        global_peak,
    };
    let frames: Vec<Vec<Candidate>> = (0..grid.frames)
        .into_par_iter()
        .map(|index| {
            let frame = frame_at(&samples, sample_rate, grid.center(index), window_len);
            analysis.candidates(frame)
        })
        .collect();
    select_path(&frames, settings)
}

fn centered_samples(samples: &[f32]) -> Vec<f64> {
    if samples.is_empty() {
        return Vec::new();
    }
    let mean = samples.iter().map(|&s| s as f64).sum::<f64>() / samples.len() as f64;
    samples.iter().map(|&s| s as f64 - mean).collect()
}

struct FrameAnalysis<'a> {
    settings: &'a AnalysisSettings,
    sample_rate: f64,
    window: &'a [f64],
    window_ac: &'a [f64],
    correlator: &'a Autocorrelator,
    min_lag: usize,
    max_lag: usize,
    global_peak: f64,
}

impl FrameAnalysis<'_> {
    fn candidates(&self, mut frame: Vec<f64>) -> Vec<Candidate> {
        let mean = frame.iter().sum::<f64>() / frame.len() as f64;
        let local_peak = frame
            .iter()
            .fold(0.0_f64, |peak, s| peak.max((s - mean).abs()));
        let local_intensity = (local_peak / self.global_peak).min(1.0);
        let mut candidates = vec![Candidate {
            frequency: 0.0,
            strength: unvoiced_strength(local_intensity, self.settings),
        }];

        for (sample, weight) in frame.iter_mut().zip(self.window) {
            *sample = (*sample - mean) * weight;
        }
        let r = self.correlator.compute(&frame);
        if r[0] <= 0.0 {
            return candidates;
        }
        let normalized: Vec<f64> = r
            .iter()
            .zip(self.window_ac)
            .map(|(&value, &w)| if w > 0.0 { value / r[0] / w } else { 0.0 })
            .collect();

        let mut voiced = self.voiced_candidates(&normalized);
        voiced.sort_by(|a, b| b.strength.total_cmp(&a.strength));
        voiced.truncate(MAX_VOICED_CANDIDATES);
        candidates.extend(voiced);
        candidates
    }

    fn voiced_candidates(&self, normalized: &[f64]) -> Vec<Candidate> {
        let settings = self.settings;
        let mut found = Vec::new();
        for lag in self.min_lag..self.max_lag {
            let (prev, current, next) = (normalized[lag - 1], normalized[lag], normalized[lag + 1]);
            if !(current > prev && current >= next && current > 0.5 * settings.voicing_threshold) {
                continue;
            }
            let (offset, peak) = parabolic_peak(prev, current, next);
            let frequency = self.sample_rate / (lag as f64 + offset);
            if !(settings.pitch_floor..=settings.pitch_ceiling).contains(&frequency) {
                continue;
            }
            // Overshoot past 1 comes from the window normalisation at long lags.
            let peak = if peak > 1.0 { 1.0 / peak } else { peak };
            let strength = peak - settings.octave_cost * (settings.pitch_floor / frequency).log2();
            found.push(Candidate {
                frequency,
                strength,
            });
        }
        found
    }
}

fn unvoiced_strength(local_intensity: f64, settings: &AnalysisSettings) -> f64 {
    let quietness = if settings.silence_threshold > 0.0 {
        2.0 - local_intensity * (1.0 + settings.voicing_threshold) / settings.silence_threshold
    } else {
        0.0
    };
    settings.voicing_threshold + quietness.max(0.0)
}

/// Sub-lag offset and height of the parabola through three neighbouring values.
fn parabolic_peak(prev: f64, current: f64, next: f64) -> (f64, f64) {
    let curvature = prev - 2.0 * current + next;
    if curvature.abs() < f64::EPSILON {
        return (0.0, current);
    }
    let offset = 0.5 * (prev - next) / curvature;
    let peak = current - 0.25 * (prev - next) * offset;
    (offset.clamp(-0.5, 0.5), peak)
}

fn transition_cost(from: &Candidate, to: &Candidate, settings: &AnalysisSettings) -> f64 {
    match (from.frequency > 0.0, to.frequency > 0.0) {
        (false, false) => 0.0,
        (true, true) => settings.octave_jump_cost * (to.frequency / from.frequency).log2().abs(),
        _ => settings.voiced_unvoiced_cost,
    }
}

/// Viterbi path through the candidates, maximising strength minus transition costs.
fn select_path(frames: &[Vec<Candidate>], settings: &AnalysisSettings) -> Vec<Option<f64>> {
    let Some(first) = frames.first() else {
        return Vec::new();
    };
    let time_correction = REFERENCE_STEP / settings.time_step;
    let mut costs: Vec<Vec<f64>> = Vec::with_capacity(frames.len());
    let mut back: Vec<Vec<usize>> = Vec::with_capacity(frames.len());
    costs.push(first.iter().map(|c| -c.strength).collect());
    back.push(vec![0; first.len()]);

    for index in 1..frames.len() {
        let previous = &frames[index - 1];
        let previous_costs = &costs[index - 1];
        let mut row_costs = Vec::with_capacity(frames[index].len());
        let mut row_back = Vec::with_capacity(frames[index].len());
        for candidate in &frames[index] {
            let (best_from, best_cost) = previous
                .iter()
                .zip(previous_costs)
                .map(|(from, &cost)| cost + transition_cost(from, candidate, settings) * time_correction)
                .enumerate()
                .fold((0, f64::INFINITY), |best, (k, cost)| {
                    if cost < best.1 {
                        (k, cost)
                    } else {
                        best
                    }
                });
            row_costs.push(best_cost - candidate.strength);
            row_back.push(best_from);
        }
        costs.push(row_costs);
        back.push(row_back);
    }

    let last = costs.len() - 1;
    let mut choice = costs[last]
        .iter()
        .enumerate()
        .fold((0, f64::INFINITY), |best, (k, &cost)| {
            if cost < best.1 {
                (k, cost)
            } else {
                best
            }
        })
        .0;
    let mut path = vec![0; frames.len()];
    for index in (0..frames.len()).rev() {
        path[index] = choice;
        choice = back[index][choice];
    }
    path.iter()
        .zip(frames)
        .map(|(&k, candidates)| {
            let frequency = candidates[k].frequency;
            (frequency > 0.0).then_some(frequency)
        })
        .collect()
}

fn hann(len: usize) -> Vec<f64> {
    if len <= 1 {
        return vec![1.0; len];
    }
    let denominator = (len - 1) as f64;
    (0..len)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / denominator).cos())
        .collect()
}

/// Linear (non-circular) autocorrelation up to `max_lag`, via zero-padded FFT.
struct Autocorrelator {
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    fft_len: usize,
    max_lag: usize,
}

impl Autocorrelator {
    fn new(window_len: usize, max_lag: usize) -> Self {
        let fft_len = (window_len + max_lag + 1).next_power_of_two();
        let mut planner = FftPlanner::new();
        Self {
            forward: planner.plan_fft_forward(fft_len),
            inverse: planner.plan_fft_inverse(fft_len),
            fft_len,
            max_lag,
        }
    }

    fn compute(&self, frame: &[f64]) -> Vec<f64> {
        let mut buffer: Vec<Complex<f64>> = frame
            .iter()
            .map(|&x| Complex::new(x, 0.0))
            .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
            .take(self.fft_len)
            .collect();
        self.forward.process(&mut buffer);
        for bin in buffer.iter_mut() {
            *bin = Complex::new(bin.norm_sqr(), 0.0);
        }
        self.inverse.process(&mut buffer);
        let scale = 1.0 / self.fft_len as f64;
        buffer
            .iter()
            .take(self.max_lag + 1)
            .map(|bin| bin.re * scale)
            .collect()
    }

    /// Autocorrelation divided by its zero-lag value.
    fn normalized(&self, frame: &[f64]) -> Vec<f64> {
        let r = self.compute(frame);
        let zero_lag = r[0];
        if zero_lag <= 0.0 {
            return vec![0.0; r.len()];
        }
        r.iter().map(|value| value / zero_lag).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn fft_autocorrelation_matches_direct_sum() {
        let frame = [1.0, -2.0, 0.5, 3.0, -1.5];
        let correlator = Autocorrelator::new(frame.len(), 3);
        let r = correlator.compute(&frame);
        for lag in 0..=3 {
            let direct: f64 = (0..frame.len() - lag).map(|i| frame[i] * frame[i + lag]).sum();
            assert_abs_diff_eq!(r[lag], direct, epsilon = 1e-9);
        }
    }

    #[test]
    fn parabola_recovers_symmetric_peak() {
        let (offset, peak) = parabolic_peak(0.5, 1.0, 0.5);
        assert_abs_diff_eq!(offset, 0.0);
        assert_abs_diff_eq!(peak, 1.0);
        let (offset, _) = parabolic_peak(0.4, 1.0, 0.8);
        assert!(offset > 0.0);
    }

    #[test]
    fn quiet_frames_favour_unvoiced() {
        let settings = AnalysisSettings::default();
        assert_abs_diff_eq!(unvoiced_strength(1.0, &settings), settings.voicing_threshold);
        assert!(unvoiced_strength(0.0, &settings) > 2.0);
    }

    #[test]
    fn viterbi_avoids_single_octave_jump() {
        let settings = AnalysisSettings::default();
        let unvoiced = Candidate {
            frequency: 0.0,
            strength: 0.45,
        };
        let steady = |strength| Candidate {
            frequency: 200.0,
            strength,
        };
        let octave = Candidate {
            frequency: 100.0,
            strength: 0.92,
        };
        let frames = vec![
            vec![unvoiced, steady(0.9)],
            vec![unvoiced, octave, steady(0.9)],
            vec![unvoiced, steady(0.9)],
        ];
        let path = select_path(&frames, &settings);
        assert_eq!(path, vec![Some(200.0); 3]);
    }

    #[test]
    fn silent_signal_is_unvoiced() {
        let signal = WaveformSignal::from_samples(vec![0.0; 8_000], 16_000);
        let frames = track(&signal, &AnalysisSettings::default());
        assert!(!frames.is_empty());
        assert!(frames.iter().all(Option::is_none));
    }
}
