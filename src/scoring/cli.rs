use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::scoring::config::{PitchMethod, ScoringConfig, UnvoicedPolicy};

#[derive(Parser, Debug)]
#[command(
    name = "prosody-scorer",
    version,
    about = "Score a learner recording against a native reference by pitch, intensity and rhythm"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Score one or more learner recordings against a reference.
    Score(ScoreArgs),
    /// Print the pitch and intensity contours of a recording as JSON.
    Contours(ContourArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ReferenceArgs {
    /// Path to the native reference recording.
    #[arg(long, value_name = "FILE", required_unless_present = "sentence")]
    pub reference: Option<PathBuf>,
    /// Sentence id (e.g. ch1_3) resolved through the assets directory.
    #[arg(long, value_name = "ID", conflicts_with = "reference")]
    pub sentence: Option<String>,
}

/// Where the reference recording comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceSource<'a> {
    File(&'a Path),
    Sentence(&'a str),
}

impl ReferenceArgs {
    pub fn source(&self) -> Result<ReferenceSource<'_>> {
        match (&self.reference, &self.sentence) {
            (Some(path), None) => Ok(ReferenceSource::File(path)),
            (None, Some(id)) => Ok(ReferenceSource::Sentence(id)),
            _ => bail!("provide exactly one of --reference or --sentence"),
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct AnalysisArgs {
    /// Optional override for the assets directory.
    #[arg(long = "assets-path")]
    pub assets_path: Option<PathBuf>,
    /// Scoring configuration file (defaults to scoring.json in the assets directory).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Pitch tracking algorithm, overriding the configuration.
    #[arg(long = "pitch-method", value_enum)]
    pub pitch_method: Option<PitchMethod>,
    /// Handling of unvoiced frames, overriding the configuration.
    #[arg(long = "unvoiced-policy", value_enum)]
    pub unvoiced_policy: Option<UnvoicedPolicy>,
}

impl AnalysisArgs {
    /// Applies command-line overrides on top of a loaded configuration.
    pub fn apply(&self, mut config: ScoringConfig) -> ScoringConfig {
        if let Some(method) = self.pitch_method {
            config.analysis.pitch_method = method;
        }
        if let Some(policy) = self.unvoiced_policy {
            config.analysis.unvoiced_policy = policy;
        }
        config
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    #[command(flatten)]
    pub source: ReferenceArgs,
    /// Learner recordings to score.
    #[arg(value_name = "LEARNER", required = true)]
    pub learners: Vec<PathBuf>,
    #[command(flatten)]
    pub analysis: AnalysisArgs,
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

#[derive(Args, Debug, Clone)]
pub struct ContourArgs {
    /// Recording to analyse.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,
    #[command(flatten)]
    pub analysis: AnalysisArgs,
}
