//! Riskscan Core Library
//!
//! Downloads social videos, transcribes them through a remote speech-to-text
//! service, searches company news, and runs AI risk analysis over the results.

pub mod analysis;
pub mod config;
pub mod document;
pub mod error;
pub mod format;
pub mod logging;
pub mod media;
pub mod news;
pub mod pipeline;
pub mod poll;
pub mod progress;
pub mod store;
pub mod transcription;
pub mod types;

// Re-export commonly used items at crate root
pub use analysis::{AgentId, Analyst, Julep, TaskExecutor};
pub use config::{Config, Credentials, HttpTimeouts, Service};
pub use error::{Error, Result};
pub use format::{format_duration, format_news_digest, format_transcript};
pub use media::{AudioExtractor, Downloader, Ffmpeg, Platform, YtDlp, detect_platform};
pub use news::{NewsSearch, SerpApi, build_query};
pub use pipeline::{MediaStages, Pipeline};
pub use poll::PollPolicy;
pub use progress::{ProgressRecord, ProgressRegistry, RunId, Stage};
pub use store::ResultStore;
pub use transcription::{AssemblyAi, SpeechToText, Transcriber};
pub use types::{
    CompanyAssessment, CompanyOutcome, CompanyRecord, DocumentAnalysis, DocumentMode,
    MediaAnalysis, RiskReport, Transcript, Utterance,
};
