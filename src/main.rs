use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use prosody_scorer::audio::decode_audio;
use prosody_scorer::config::AppConfig;
use prosody_scorer::scoring::cli::{
    AnalysisArgs, Cli, Command, ContourArgs, OutputFormat, ReferenceSource, ScoreArgs,
};
use prosody_scorer::scoring::config::ScoringConfig;
use prosody_scorer::scoring::ScoringEngine;
use prosody_scorer::types::{ReportResponse, ScoreReport};

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Command::Score(args) => handle_score(&args),
        Command::Contours(args) => handle_contours(&args),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_score(args: &ScoreArgs) -> Result<()> {
    let engine = build_engine(&args.analysis)?;
    let reference_path = resolve_reference(args)?;
    let reference = decode_audio(&reference_path)?;
    info!(
        path = %reference_path.display(),
        duration = reference.duration_secs(),
        "analysing reference"
    );
    let profile = engine.analyze(&reference);

    let learners = args
        .learners
        .iter()
        .map(|path| decode_audio(path).with_context(|| format!("learner {}", path.display())))
        .collect::<Result<Vec<_>>>()?;
    let reports = engine.score_batch(&profile, &learners);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match args.format {
        OutputFormat::Json => write_json(&mut out, &args.learners, &reports)?,
        OutputFormat::Text => write_text(&mut out, &args.learners, &reports)?,
    }
    Ok(())
}

fn resolve_reference(args: &ScoreArgs) -> Result<PathBuf> {
    match args.source.source()? {
        ReferenceSource::File(path) => Ok(path.to_path_buf()),
        ReferenceSource::Sentence(id) => {
            let assets = AppConfig::from_override(args.analysis.assets_path.clone())?;
            assets.reference_path(id)
        }
    }
}

#[derive(Serialize)]
struct LearnerReport<'a> {
    learner: String,
    #[serde(flatten)]
    report: ReportResponse<'a>,
}

fn write_json(out: &mut impl Write, learners: &[PathBuf], reports: &[ScoreReport]) -> Result<()> {
    if let [report] = reports {
        serde_json::to_writer_pretty(&mut *out, &report.to_response())?;
    } else {
        let entries: Vec<LearnerReport<'_>> = learners
            .iter()
            .zip(reports)
            .map(|(path, report)| LearnerReport {
                learner: path.display().to_string(),
                report: report.to_response(),
            })
            .collect();
        serde_json::to_writer_pretty(&mut *out, &entries)?;
    }
    writeln!(out)?;
    Ok(())
}

fn write_text(out: &mut impl Write, learners: &[PathBuf], reports: &[ScoreReport]) -> Result<()> {
    for (path, report) in learners.iter().zip(reports) {
        let breakdown = &report.breakdown;
        writeln!(out, "{}", path.display())?;
        writeln!(out, "  score      {:>5.1}", breakdown.overall)?;
        writeln!(out, "  pitch      {:>5.1}", breakdown.pitch)?;
        writeln!(out, "  intensity  {:>5.1}", breakdown.intensity)?;
        writeln!(out, "  rhythm     {:>5.1}", breakdown.rhythm)?;
    }
    Ok(())
}

#[derive(Serialize)]
struct ContourDump {
    sample_rate: u32,
    duration: f64,
    frame_rate: f64,
    pitch: Vec<f64>,
    intensity: Vec<f64>,
}

fn handle_contours(args: &ContourArgs) -> Result<()> {
    let engine = build_engine(&args.analysis)?;
    let signal = decode_audio(&args.input)?;
    let profile = engine.analyze(&signal);
    let dump = ContourDump {
        sample_rate: profile.sample_rate,
        duration: profile.duration,
        frame_rate: profile.pitch.frame_rate(),
        pitch: profile.pitch.to_vec(),
        intensity: profile.intensity.to_vec(),
    };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &dump)?;
    writeln!(out)?;
    Ok(())
}

fn build_engine(args: &AnalysisArgs) -> Result<ScoringEngine> {
    let config = args.apply(load_scoring_config(args)?);
    Ok(ScoringEngine::new(config)?)
}

fn load_scoring_config(args: &AnalysisArgs) -> Result<ScoringConfig> {
    if let Some(path) = &args.config {
        return Ok(ScoringConfig::from_path(path)?);
    }
    match AppConfig::from_override(args.assets_path.clone()) {
        Ok(assets) => Ok(ScoringConfig::load_from_assets(&assets.assets_root)?),
        Err(err) if args.assets_path.is_none() => {
            warn!(error = %err, "no assets directory, using default scoring config");
            Ok(ScoringConfig::default())
        }
        Err(err) => Err(err),
    }
}
