use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    #[serde(default)]
    pub utterances: Vec<Utterance>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub speaker: String,
    pub text: String,
}

/// Text produced by a risk analysis call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum RiskReport {
    Findings(String),
    /// The service finished but returned no content.
    Empty,
}

impl RiskReport {
    pub fn from_content(content: &str) -> Self {
        if content.trim().is_empty() {
            RiskReport::Empty
        } else {
            RiskReport::Findings(content.to_string())
        }
    }

    pub fn text(&self) -> &str {
        match self {
            RiskReport::Findings(text) => text,
            RiskReport::Empty => "",
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RiskReport::Empty)
    }

    /// Removes markdown bold markers the model likes to emit.
    pub fn without_emphasis(self) -> Self {
        match self {
            RiskReport::Findings(text) => RiskReport::from_content(&text.replace("**", "")),
            RiskReport::Empty => RiskReport::Empty,
        }
    }
}

/// Up to two parties named in a source document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub names: Vec<String>,
}

impl CompanyRecord {
    pub const MAX_NAMES: usize = 2;

    pub fn from_lines(text: &str) -> Self {
        let names = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .take(Self::MAX_NAMES)
            .map(str::to_string)
            .collect();
        Self { names }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MediaAnalysis {
    pub run_id: Uuid,
    pub transcript_text: String,
    pub report: RiskReport,
    pub transcript_path: PathBuf,
    pub report_path: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentMode {
    /// Extract the contracting parties.
    Company,
    /// Single-subject risk analysis of a public case document.
    Risk,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentAnalysis {
    Companies(CompanyRecord),
    Risk(RiskReport),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompanyAssessment {
    pub company_name: String,
    pub outcome: CompanyOutcome,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompanyOutcome {
    Report { report: RiskReport, digest: String },
    /// The search succeeded but carried no `news_results`.
    NoResults,
    /// The search API answered with a non-success status.
    SearchUnavailable,
}

impl CompanyOutcome {
    pub const NO_RESULTS_MESSAGE: &'static str = "No news results found.";
}
