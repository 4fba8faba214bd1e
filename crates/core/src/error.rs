use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unsupported URL domain: {url}. Please provide a TikTok, Instagram, or X/Twitter URL")]
    UnsupportedSource { url: String },

    #[error("Download failed for {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("Audio extraction failed for {video_path}: {reason}")]
    AudioExtractionFailed { video_path: PathBuf, reason: String },

    #[error("Upload failed: {reason}")]
    UploadFailed { reason: String },

    #[error("Transcription failed: {reason}")]
    TranscriptionFailed { reason: String },

    #[error("Risk analysis failed: {reason}")]
    AnalysisFailed { reason: String },

    #[error("Gave up waiting for {what} after {attempts} polls")]
    PollTimeout { what: String, attempts: u32 },

    #[error("Could not read document {path}: {reason}")]
    DocumentUnreadable { path: PathBuf, reason: String },

    #[error("Pipeline was built without {what}")]
    NotConfigured { what: &'static str },

    #[error("Missing API key: {env_var} environment variable is not set")]
    MissingApiKey { env_var: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API request failed: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
