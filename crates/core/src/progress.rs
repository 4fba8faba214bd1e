use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex},
    time::{Duration, Instant, SystemTime},
};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

pub type RunId = Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Downloading,
    ProcessingAudio,
    Transcribing,
    Analyzing,
    Completed,
    Error,
}

impl Stage {
    /// Percentage reported on entering the stage. `Error` keeps whatever was there.
    pub fn percentage(&self) -> Option<u8> {
        match self {
            Stage::Downloading => Some(10),
            Stage::ProcessingAudio => Some(30),
            Stage::Transcribing => Some(50),
            Stage::Analyzing => Some(80),
            Stage::Completed => Some(100),
            Stage::Error => None,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Stage::Downloading => "Downloading video...",
            Stage::ProcessingAudio => "Extracting audio...",
            Stage::Transcribing => "Transcribing audio...",
            Stage::Analyzing => "Analyzing risks...",
            Stage::Completed => "Analysis complete!",
            Stage::Error => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Completed | Stage::Error)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Downloading => "downloading",
            Stage::ProcessingAudio => "processing_audio",
            Stage::Transcribing => "transcribing",
            Stage::Analyzing => "analyzing",
            Stage::Completed => "completed",
            Stage::Error => "error",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub run_id: RunId,
    pub stage: Stage,
    pub message: String,
    pub percentage: u8,
    pub updated_at: SystemTime,
}

struct Entry {
    record: ProgressRecord,
    touched: Instant,
}

/// One progress record per pipeline run.
///
/// The coordinator owning a run is its only writer; anyone holding the
/// registry may read.
#[derive(Clone, Default)]
pub struct ProgressRegistry {
    runs: Arc<Mutex<HashMap<RunId, Entry>>>,
}

impl ProgressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_run(&self) -> ProgressHandle {
        let run_id = Uuid::new_v4();
        let record = ProgressRecord {
            run_id,
            stage: Stage::Downloading,
            message: "Queued".to_string(),
            percentage: 0,
            updated_at: SystemTime::now(),
        };
        self.runs.lock().expect("ProgressRegistry poisoned").insert(
            run_id,
            Entry {
                record,
                touched: Instant::now(),
            },
        );

        ProgressHandle {
            run_id,
            registry: self.clone(),
        }
    }

    pub fn get(&self, run_id: RunId) -> Option<ProgressRecord> {
        self.runs
            .lock()
            .expect("ProgressRegistry poisoned")
            .get(&run_id)
            .map(|entry| entry.record.clone())
    }

    pub fn len(&self) -> usize {
        self.runs.lock().expect("ProgressRegistry poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn remove(&self, run_id: RunId) -> Option<ProgressRecord> {
        self.runs
            .lock()
            .expect("ProgressRegistry poisoned")
            .remove(&run_id)
            .map(|entry| entry.record)
    }

    /// Drops finished runs whose last update is at least `ttl` old.
    pub fn evict_expired(&self, ttl: Duration) -> usize {
        let mut runs = self.runs.lock().expect("ProgressRegistry poisoned");
        let before = runs.len();
        runs.retain(|_, entry| !(entry.record.stage.is_terminal() && entry.touched.elapsed() >= ttl));
        before - runs.len()
    }

    fn write(&self, run_id: RunId, stage: Stage, message: String, percentage: Option<u8>) {
        let mut runs = self.runs.lock().expect("ProgressRegistry poisoned");
        let Some(entry) = runs.get_mut(&run_id) else {
            warn!(%run_id, %stage, "progress update for unknown run");
            return;
        };
        if entry.record.stage.is_terminal() {
            warn!(%run_id, %stage, "progress update after run finished");
            return;
        }

        entry.record.stage = stage;
        entry.record.message = message;
        if let Some(percentage) = percentage {
            entry.record.percentage = percentage;
        }
        entry.record.updated_at = SystemTime::now();
        entry.touched = Instant::now();
    }
}

/// Write side of a single run's record.
#[derive(Clone)]
pub struct ProgressHandle {
    run_id: RunId,
    registry: ProgressRegistry,
}

impl ProgressHandle {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn advance(&self, stage: Stage) {
        info!(run_id = %self.run_id, %stage, "{}", stage.message());
        self.registry
            .write(self.run_id, stage, stage.message().to_string(), stage.percentage());
    }

    pub fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(run_id = %self.run_id, %message, "run failed");
        self.registry.write(self.run_id, Stage::Error, message, None);
    }

    pub fn snapshot(&self) -> Option<ProgressRecord> {
        self.registry.get(self.run_id)
    }
}
