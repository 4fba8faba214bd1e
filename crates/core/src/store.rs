use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::debug;

use crate::{error::Result, types::RiskReport};

pub const TRANSCRIPT_FILE: &str = "transcript.txt";
pub const REPORT_FILE: &str = "risk_report.txt";
pub const DIGEST_FILE: &str = "news_digest.txt";

/// Flat result files, one directory per run or subject.
#[derive(Clone, Debug)]
pub struct ResultStore {
    root: PathBuf,
}

impl ResultStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the directory for a label, without creating it
    pub fn dir_for(&self, label: &str) -> PathBuf {
        self.root.join(dir_name(label))
    }

    pub async fn save_transcript(&self, label: &str, text: &str) -> Result<PathBuf> {
        self.write(label, TRANSCRIPT_FILE, text).await
    }

    pub async fn save_report(&self, label: &str, report: &RiskReport) -> Result<PathBuf> {
        self.write(label, REPORT_FILE, report.text()).await
    }

    pub async fn save_digest(&self, label: &str, digest: &str) -> Result<PathBuf> {
        self.write(label, DIGEST_FILE, digest).await
    }

    async fn write(&self, label: &str, file_name: &str, contents: &str) -> Result<PathBuf> {
        let dir = self.dir_for(label);
        fs::create_dir_all(&dir).await?;
        let path = dir.join(file_name);
        fs::write(&path, contents).await?;
        debug!(path = %path.display(), bytes = contents.len(), "saved result file");
        Ok(path)
    }
}

/// Directory name for a label.
///
/// A label that is already its own slug is used as is. Any other label gets a
/// digest suffix, so labels that slug the same still land in distinct
/// directories.
pub fn dir_name(label: &str) -> String {
    let slugged = slug(label);
    if slugged == label {
        return slugged;
    }
    let digest = Sha256::digest(label.as_bytes());
    let suffix: String = digest[..4].iter().map(|b| format!("{b:02x}")).collect();
    format!("{slugged}-{suffix}")
}

/// Lowercase, filesystem-safe version of a label. Letters and digits of any
/// script are kept.
pub fn slug(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut last_dash = true;
    for c in label.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}
