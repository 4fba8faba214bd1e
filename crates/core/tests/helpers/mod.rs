#![allow(dead_code)]

use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use riskscan_core::{
    AgentId, AudioExtractor, Config, Downloader, Error, MediaStages, NewsSearch, Pipeline,
    PollPolicy, Result, SpeechToText, TaskExecutor,
    analysis::{Execution, ExecutionStatus, TaskSpec},
    config::AgentSettings,
    news::NewsPayload,
    transcription::{TranscriptJob, TranscriptStatus},
};
use tempfile::TempDir;

/// Writes a small fake video where it is asked to.
#[derive(Default)]
pub struct FakeDownloader {
    pub calls: AtomicU32,
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn download(&self, _url: &str, dest: &Path) -> Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::fs::write(dest, b"not really a video").await?;
        Ok(dest.to_path_buf())
    }
}

pub struct FakeExtractor {
    pub fail_with: Option<String>,
}

#[async_trait]
impl AudioExtractor for FakeExtractor {
    async fn extract(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        if let Some(reason) = &self.fail_with {
            // leave a partial artifact behind, like a real encoder would
            tokio::fs::write(audio_path, b"partial").await?;
            return Err(Error::AudioExtractionFailed {
                video_path: video_path.to_path_buf(),
                reason: reason.clone(),
            });
        }
        tokio::fs::write(audio_path, b"audio").await?;
        Ok(())
    }
}

pub struct FakeSpeech {
    pub text: String,
    pub pending_polls: u32,
    pub fetches: AtomicU32,
}

impl FakeSpeech {
    pub fn new(text: &str, pending_polls: u32) -> Self {
        Self {
            text: text.to_string(),
            pending_polls,
            fetches: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl SpeechToText for FakeSpeech {
    async fn upload(&self, audio_path: &Path) -> Result<String> {
        assert!(audio_path.exists(), "audio must exist while uploading");
        Ok("https://cdn.example/upload/abc".to_string())
    }

    async fn submit(&self, _audio_url: &str) -> Result<String> {
        Ok("transcript-1".to_string())
    }

    async fn fetch(&self, job_id: &str) -> Result<TranscriptJob> {
        let n = self.fetches.fetch_add(1, Ordering::SeqCst);
        let status = if n < self.pending_polls {
            TranscriptStatus::Processing
        } else {
            TranscriptStatus::Completed
        };
        Ok(TranscriptJob {
            id: job_id.to_string(),
            status,
            text: (status == TranscriptStatus::Completed).then(|| self.text.clone()),
            utterances: None,
            error: None,
        })
    }
}

/// Answers every execution with the next scripted content, or fails when
/// the script holds `Err`.
pub struct FakeExecutor {
    pub replies: Mutex<VecDeque<std::result::Result<String, String>>>,
    pub prompts: Mutex<Vec<TaskSpec>>,
}

impl FakeExecutor {
    pub fn new(replies: Vec<std::result::Result<&str, &str>>) -> Self {
        Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TaskExecutor for FakeExecutor {
    async fn create_agent(&self, _settings: &AgentSettings) -> Result<AgentId> {
        Ok(AgentId("agent-test".to_string()))
    }

    async fn create_task(&self, _agent: &AgentId, task: &TaskSpec) -> Result<String> {
        self.prompts.lock().unwrap().push(task.clone());
        Ok("task-test".to_string())
    }

    async fn start_execution(&self, _task_id: &str) -> Result<String> {
        Ok("exec-test".to_string())
    }

    async fn get_execution(&self, execution_id: &str) -> Result<Execution> {
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()));
        Ok(match reply {
            Ok(content) => Execution {
                id: execution_id.to_string(),
                status: ExecutionStatus::Succeeded,
                output: Some(serde_json::json!({
                    "choices": [{"message": {"role": "assistant", "content": content}}]
                })),
                error: None,
            },
            Err(error) => Execution {
                id: execution_id.to_string(),
                status: ExecutionStatus::Failed,
                output: None,
                error: Some(error),
            },
        })
    }
}

/// Search results keyed by the company name found in the query.
pub struct FakeNews {
    pub responses: Vec<(&'static str, Option<NewsPayload>)>,
    pub queries: Mutex<Vec<String>>,
}

#[async_trait]
impl NewsSearch for FakeNews {
    async fn search(&self, query: &str) -> Result<Option<NewsPayload>> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self
            .responses
            .iter()
            .find(|(company, _)| query.starts_with(&format!("\"{company}\"")))
            .and_then(|(_, payload)| payload.clone()))
    }
}

pub struct Harness {
    pub root: TempDir,
    pub config: Config,
}

impl Harness {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let config = Config {
            results_dir: root.path().join("results"),
            work_dir: root.path().join("work"),
            transcription_poll: PollPolicy::fixed(Duration::ZERO, 20),
            analysis_poll: PollPolicy::fixed(Duration::ZERO, 20),
            ..Config::default()
        };
        Self { root, config }
    }

    pub fn work_dir(&self) -> &Path {
        &self.config.work_dir
    }

    pub async fn pipeline(&self, executor: Arc<FakeExecutor>) -> Pipeline {
        let analyst = riskscan_core::Analyst::provision(
            executor,
            &self.config.agent,
            self.config.analysis_poll.clone(),
        )
        .await
        .unwrap();
        Pipeline::new(&self.config, analyst)
    }

    pub fn media(
        downloader: Arc<FakeDownloader>,
        extractor: FakeExtractor,
        speech: Arc<FakeSpeech>,
    ) -> MediaStages {
        MediaStages {
            downloader,
            extractor: Arc::new(extractor),
            speech,
        }
    }
}

pub fn dir_entries(path: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(path) {
        Ok(entries) => entries.flatten().map(|e| e.path()).collect(),
        Err(_) => Vec::new(),
    }
}
