use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use tracing::debug;

/// Sentence list published next to the reference recordings.
pub const MANIFEST_FILE: &str = "sentences.json";
/// Directory searched for `<sentence id>.wav` when no manifest entry matches.
pub const REFERENCES_DIR: &str = "references";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub assets_root: PathBuf,
    pub sentences: Vec<SentenceEntry>,
}

/// One practice sentence and its native recording, relative to the assets root.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SentenceEntry {
    pub chapter: u32,
    pub number: u32,
    #[serde(default)]
    pub text: String,
    pub audio: PathBuf,
}

impl SentenceEntry {
    pub fn id(&self) -> String {
        format!("ch{}_{}", self.chapter, self.number)
    }
}

impl AppConfig {
    pub fn from_override(path: Option<PathBuf>) -> Result<Self> {
        let root = match path {
            Some(custom) => canonicalize_dir(&custom)?,
            None => default_assets_root()?,
        };
        let sentences = load_manifest(&root)?;
        Ok(Self {
            assets_root: root,
            sentences,
        })
    }

    pub fn sentence(&self, id: &str) -> Option<&SentenceEntry> {
        self.sentences.iter().find(|entry| entry.id() == id)
    }

    /// Resolves the native recording for a sentence id such as `ch1_3`.
    pub fn reference_path(&self, id: &str) -> Result<PathBuf> {
        if !is_valid_id(id) {
            bail!("invalid sentence id {id:?}");
        }
        let path = match self.sentence(id) {
            Some(entry) => self.assets_root.join(&entry.audio),
            None => self
                .assets_root
                .join(REFERENCES_DIR)
                .join(format!("{id}.wav")),
        };
        if !path.is_file() {
            bail!("no reference recording for sentence {id} at {}", path.display());
        }
        Ok(path)
    }
}

// Ids end up in file paths, so only plain names are accepted.
fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn load_manifest(root: &Path) -> Result<Vec<SentenceEntry>> {
    let path = root.join(MANIFEST_FILE);
    if !path.is_file() {
        debug!(path = %path.display(), "no sentence manifest");
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read sentence manifest {}", path.display()))?;
    let sentences: Vec<SentenceEntry> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid sentence manifest {}", path.display()))?;
    debug!(sentences = sentences.len(), "loaded sentence manifest");
    Ok(sentences)
}

fn canonicalize_dir(path: &Path) -> Result<PathBuf> {
    let canonical = path
        .canonicalize()
        .with_context(|| format!("failed to resolve assets directory at {:?}", path))?;
    if canonical.is_dir() {
        Ok(canonical)
    } else {
        Err(anyhow!("assets path {:?} is not a directory", canonical))
    }
}

fn default_assets_root() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("unable to resolve current executable path")?;
    let assets = exe
        .ancestors()
        .find_map(|dir| {
            let candidate = dir.join("assets");
            candidate.is_dir().then_some(candidate)
        })
        .ok_or_else(|| anyhow!("could not locate default assets directory alongside binary"))?;
    Ok(assets)
}
