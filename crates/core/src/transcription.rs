//! Speech-to-text through an upload / job / poll service.
//!
//! The audio is first uploaded, which gives back a URL only the service can
//! read. A transcript job is then created for that URL and polled until it
//! reaches `completed` or `error`. Job fields other than `status` are only
//! meaningful once `completed` has been observed.

use std::{fmt, path::Path, sync::Arc};

use async_trait::async_trait;
use futures_util::stream;
use reqwest::{StatusCode, header::AUTHORIZATION};
use serde::Deserialize;
use tokio::{fs, io::AsyncReadExt};
use tracing::{debug, info};

use crate::{
    config::{Credentials, HttpTimeouts, http_client},
    error::{Error, Result},
    poll::{Attempt, PollPolicy, poll_until},
    types::{Transcript, Utterance},
};

/// Audio is streamed to the upload endpoint in chunks of this size.
pub const UPLOAD_CHUNK_SIZE: usize = 5 * 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptStatus {
    Queued,
    Processing,
    Completed,
    Error,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for TranscriptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TranscriptStatus::Queued => "queued",
            TranscriptStatus::Processing => "processing",
            TranscriptStatus::Completed => "completed",
            TranscriptStatus::Error => "error",
            TranscriptStatus::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct TranscriptJob {
    pub id: String,
    pub status: TranscriptStatus,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub utterances: Option<Vec<JobUtterance>>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct JobUtterance {
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl TranscriptJob {
    fn into_transcript(self) -> Transcript {
        let utterances = self
            .utterances
            .unwrap_or_default()
            .into_iter()
            .map(|u| Utterance {
                speaker: u.speaker.unwrap_or_else(|| "N/A".to_string()),
                text: u.text.unwrap_or_default(),
            })
            .collect();

        Transcript {
            text: self.text.unwrap_or_default(),
            utterances,
        }
    }
}

#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Upload a local audio file, returning the service-side reference URL.
    async fn upload(&self, audio_path: &Path) -> Result<String>;

    /// Create a transcript job for an uploaded file, returning the job id.
    async fn submit(&self, audio_url: &str) -> Result<String>;

    async fn fetch(&self, job_id: &str) -> Result<TranscriptJob>;
}

/// Client for the AssemblyAI v2 API.
#[derive(Clone)]
pub struct AssemblyAi {
    client: reqwest::Client,
    upload_client: reqwest::Client,
    credentials: Credentials,
    speaker_labels: bool,
}

#[derive(Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Deserialize)]
struct SubmitResponse {
    id: String,
}

impl AssemblyAi {
    pub fn new(
        credentials: Credentials,
        speaker_labels: bool,
        timeouts: &HttpTimeouts,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeouts.assemblyai)?,
            upload_client: http_client(timeouts.upload)?,
            credentials,
            speaker_labels,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v2/{}", self.credentials.base_url, path)
    }
}

async fn chunked_body(audio_path: &Path) -> Result<reqwest::Body> {
    let file = fs::File::open(audio_path).await?;
    let chunks = stream::try_unfold(file, |mut file| async move {
        let mut buf = vec![0u8; UPLOAD_CHUNK_SIZE];
        let mut filled = 0;
        while filled < buf.len() {
            let n = file.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok::<_, std::io::Error>(None);
        }
        buf.truncate(filled);
        Ok(Some((buf, file)))
    });
    Ok(reqwest::Body::wrap_stream(chunks))
}

#[async_trait]
impl SpeechToText for AssemblyAi {
    async fn upload(&self, audio_path: &Path) -> Result<String> {
        info!(path = %audio_path.display(), "uploading audio");
        let response = self
            .upload_client
            .post(self.endpoint("upload"))
            .header(AUTHORIZATION, &self.credentials.api_key)
            .body(chunked_body(audio_path).await?)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(Error::UploadFailed {
                reason: response.text().await.unwrap_or_default(),
            });
        }

        let upload: UploadResponse = response.json().await?;
        debug!(upload_url = %upload.upload_url, "upload completed");
        Ok(upload.upload_url)
    }

    async fn submit(&self, audio_url: &str) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint("transcript"))
            .header(AUTHORIZATION, &self.credentials.api_key)
            .json(&serde_json::json!({
                "audio_url": audio_url,
                "speaker_labels": self.speaker_labels,
            }))
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(Error::TranscriptionFailed {
                reason: format!(
                    "transcription request failed: {}",
                    response.text().await.unwrap_or_default()
                ),
            });
        }

        let submitted: SubmitResponse = response.json().await?;
        Ok(submitted.id)
    }

    async fn fetch(&self, job_id: &str) -> Result<TranscriptJob> {
        let response = self
            .client
            .get(self.endpoint(&format!("transcript/{job_id}")))
            .header(AUTHORIZATION, &self.credentials.api_key)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(Error::TranscriptionFailed {
                reason: format!(
                    "error polling transcript: {}",
                    response.text().await.unwrap_or_default()
                ),
            });
        }

        Ok(response.json().await?)
    }
}

/// Runs the full upload, submit, poll sequence against a [`SpeechToText`] service.
#[derive(Clone)]
pub struct Transcriber {
    service: Arc<dyn SpeechToText>,
    policy: PollPolicy,
}

impl Transcriber {
    pub fn new(service: Arc<dyn SpeechToText>, policy: PollPolicy) -> Self {
        Self { service, policy }
    }

    pub async fn transcribe(&self, audio_path: &Path) -> Result<Transcript> {
        let audio_url = self.service.upload(audio_path).await?;
        let job_id = self.service.submit(&audio_url).await?;
        info!(%job_id, "transcription requested");
        self.wait(&job_id).await
    }

    pub async fn wait(&self, job_id: &str) -> Result<Transcript> {
        let service = &self.service;
        poll_until(&self.policy, "transcript", || async move {
            let job = service.fetch(job_id).await?;
            match job.status {
                TranscriptStatus::Completed => {
                    info!(job_id, "transcription completed");
                    Ok(Attempt::Ready(job.into_transcript()))
                }
                TranscriptStatus::Error => Err(Error::TranscriptionFailed {
                    reason: job.error.unwrap_or_else(|| "unknown error".to_string()),
                }),
                pending => Ok(Attempt::Pending(pending.to_string())),
            }
        })
        .await
    }
}
