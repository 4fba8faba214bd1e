//! Pipeline coordinator.
//!
//! Three flows share one analyst and one result store:
//!
//! - media: URL → download → audio → transcript → risk report, with a
//!   progress record per run (`downloading → processing_audio → transcribing
//!   → analyzing → completed`, or `error` from any of them);
//! - documents: uploaded file → text → company names or a risk report;
//! - companies: names → news search → per-company risk report.
//!
//! Failed stages are not retried and completed stages are not rolled back.
//! Intermediate media files live in a scoped temporary directory that is
//! removed however the run ends.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use tempfile::TempDir;
use tokio::fs;
use tracing::{info, warn};

use crate::{
    analysis::Analyst,
    config::Config,
    document::DocumentReader,
    error::{Error, Result},
    format::{format_news_digest, format_transcript},
    media::{AudioExtractor, Downloader, acquire},
    news::{DEFAULT_RISK_KEYWORDS, NewsSearch, build_query},
    poll::PollPolicy,
    progress::{ProgressHandle, ProgressRecord, ProgressRegistry, RunId, Stage},
    store::ResultStore,
    transcription::{SpeechToText, Transcriber},
    types::{
        CompanyAssessment, CompanyOutcome, DocumentAnalysis, DocumentMode, MediaAnalysis,
        Transcript,
    },
};

const VIDEO_FILE: &str = "video.mp4";
const AUDIO_FILE: &str = "audio.mp3";

/// Services the media flow needs.
pub struct MediaStages {
    pub downloader: Arc<dyn Downloader>,
    pub extractor: Arc<dyn AudioExtractor>,
    pub speech: Arc<dyn SpeechToText>,
}

struct MediaFlow {
    downloader: Arc<dyn Downloader>,
    extractor: Arc<dyn AudioExtractor>,
    transcriber: Transcriber,
}

pub struct Pipeline {
    analyst: Analyst,
    store: ResultStore,
    progress: ProgressRegistry,
    documents: DocumentReader,
    media: Option<MediaFlow>,
    news: Option<Arc<dyn NewsSearch>>,
    news_keywords: Vec<String>,
    work_dir: PathBuf,
    transcription_poll: PollPolicy,
    progress_ttl: Duration,
}

impl Pipeline {
    pub fn new(config: &Config, analyst: Analyst) -> Self {
        Self {
            analyst,
            store: ResultStore::new(&config.results_dir),
            progress: ProgressRegistry::new(),
            documents: DocumentReader::default(),
            media: None,
            news: None,
            news_keywords: DEFAULT_RISK_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            work_dir: config.work_dir.clone(),
            transcription_poll: config.transcription_poll.clone(),
            progress_ttl: config.progress_ttl,
        }
    }

    pub fn with_media(mut self, stages: MediaStages) -> Self {
        self.media = Some(MediaFlow {
            downloader: stages.downloader,
            extractor: stages.extractor,
            transcriber: Transcriber::new(stages.speech, self.transcription_poll.clone()),
        });
        self
    }

    pub fn with_news(mut self, search: Arc<dyn NewsSearch>) -> Self {
        self.news = Some(search);
        self
    }

    pub fn with_news_keywords(mut self, keywords: Vec<String>) -> Self {
        self.news_keywords = keywords;
        self
    }

    pub fn with_document_reader(mut self, reader: DocumentReader) -> Self {
        self.documents = reader;
        self
    }

    /// Share a registry with other pipelines or readers.
    pub fn with_progress(mut self, progress: ProgressRegistry) -> Self {
        self.progress = progress;
        self
    }

    pub fn progress(&self) -> &ProgressRegistry {
        &self.progress
    }

    pub fn progress_of(&self, run_id: RunId) -> Option<ProgressRecord> {
        self.progress.get(run_id)
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Register a new run. Finished runs older than the TTL are evicted first.
    pub fn start_run(&self) -> ProgressHandle {
        let evicted = self.progress.evict_expired(self.progress_ttl);
        if evicted > 0 {
            info!(evicted, "evicted finished runs");
        }
        self.progress.start_run()
    }

    pub async fn process_url(&self, url: &str) -> Result<MediaAnalysis> {
        let run = self.start_run();
        self.process_url_as(&run, url).await
    }

    /// Run the media flow, reporting into `run`.
    pub async fn process_url_as(&self, run: &ProgressHandle, url: &str) -> Result<MediaAnalysis> {
        match self.run_media(run, url).await {
            Ok(analysis) => {
                run.advance(Stage::Completed);
                Ok(analysis)
            }
            Err(e) => {
                run.fail(e.to_string());
                Err(e)
            }
        }
    }

    async fn run_media(&self, run: &ProgressHandle, url: &str) -> Result<MediaAnalysis> {
        let media = self.media.as_ref().ok_or(Error::NotConfigured {
            what: "media services",
        })?;

        fs::create_dir_all(&self.work_dir).await?;
        let scratch = tempfile::Builder::new()
            .prefix("riskscan-")
            .tempdir_in(&self.work_dir)?;

        let transcript = self.transcribe_media(media, run, url, &scratch).await?;

        run.advance(Stage::Analyzing);
        let label = run.run_id().to_string();
        let transcript_text = format_transcript(&transcript);
        let transcript_path = self.store.save_transcript(&label, &transcript_text).await?;

        let report = self
            .analyst
            .assess_risk(&transcript_text)
            .await?
            .without_emphasis();
        let report_path = self.store.save_report(&label, &report).await?;

        Ok(MediaAnalysis {
            run_id: run.run_id(),
            transcript_text,
            report,
            transcript_path,
            report_path,
        })
    }

    async fn transcribe_media(
        &self,
        media: &MediaFlow,
        run: &ProgressHandle,
        url: &str,
        scratch: &TempDir,
    ) -> Result<Transcript> {
        run.advance(Stage::Downloading);
        let video_path = acquire(
            media.downloader.as_ref(),
            url,
            &scratch.path().join(VIDEO_FILE),
        )
        .await?;

        run.advance(Stage::ProcessingAudio);
        let audio_path = scratch.path().join(AUDIO_FILE);
        media.extractor.extract(&video_path, &audio_path).await?;

        run.advance(Stage::Transcribing);
        media.transcriber.transcribe(&audio_path).await
    }

    pub async fn analyze_document(&self, path: &Path, mode: DocumentMode) -> Result<DocumentAnalysis> {
        let text = self.documents.read_text(path).await?;
        info!(path = %path.display(), ?mode, chars = text.chars().count(), "document loaded");

        match mode {
            DocumentMode::Company => {
                let record = self.analyst.extract_companies(&text).await?;
                Ok(DocumentAnalysis::Companies(record))
            }
            DocumentMode::Risk => {
                let report = self.analyst.assess_subject(&text).await?.without_emphasis();
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.store
                    .save_report(&format!("document-{stem}"), &report)
                    .await?;
                Ok(DocumentAnalysis::Risk(report))
            }
        }
    }

    pub async fn assess_companies<S: AsRef<str>>(
        &self,
        company_names: &[S],
    ) -> Result<Vec<CompanyAssessment>> {
        let search = self.news.as_ref().ok_or(Error::NotConfigured {
            what: "news search",
        })?;

        let mut assessments = Vec::with_capacity(company_names.len());
        for name in company_names {
            let company_name = name.as_ref().trim();
            if company_name.is_empty() {
                continue;
            }

            let query = build_query(company_name, self.news_keywords.as_slice());
            let outcome = match search.search(&query).await? {
                None => CompanyOutcome::SearchUnavailable,
                Some(payload) => match payload.news_results {
                    None => CompanyOutcome::NoResults,
                    Some(results) => {
                        let digest = format_news_digest(&results);
                        let report = self.analyst.assess_risk(&digest).await?;
                        let label = format!("news-{company_name}");
                        self.store.save_digest(&label, &digest).await?;
                        self.store.save_report(&label, &report).await?;
                        CompanyOutcome::Report { report, digest }
                    }
                },
            };

            if !matches!(outcome, CompanyOutcome::Report { .. }) {
                warn!(company = company_name, "no news results");
            }
            assessments.push(CompanyAssessment {
                company_name: company_name.to_string(),
                outcome,
            });
        }

        Ok(assessments)
    }
}
