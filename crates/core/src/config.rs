use std::{path::PathBuf, time::Duration};

use crate::{
    error::{Error, Result},
    poll::PollPolicy,
};

/// Third-party services the pipeline talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Service {
    AssemblyAi,
    Julep,
    SerpApi,
}

pub struct ServiceConfig {
    pub api_url: &'static str,
    pub env_var: &'static str,
    pub url_override_var: &'static str,
}

impl Service {
    pub fn config(&self) -> ServiceConfig {
        match self {
            Service::AssemblyAi => ServiceConfig {
                api_url: "https://api.assemblyai.com",
                env_var: "ASSEMBLYAI_API_KEY",
                url_override_var: "RISKSCAN_ASSEMBLYAI_URL",
            },
            Service::Julep => ServiceConfig {
                api_url: "https://api.julep.ai/api",
                env_var: "JULEP_API_KEY",
                url_override_var: "RISKSCAN_JULEP_URL",
            },
            Service::SerpApi => ServiceConfig {
                api_url: "https://serpapi.com",
                env_var: "SERPAPI_KEY",
                url_override_var: "RISKSCAN_SERPAPI_URL",
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Service::AssemblyAi => "AssemblyAI",
            Service::Julep => "Julep",
            Service::SerpApi => "SerpApi",
        }
    }

    /// Validate that the API key is set for this service
    pub fn validate_api_key(&self) -> Result<String> {
        let config = self.config();
        match std::env::var(config.env_var) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(Error::MissingApiKey {
                env_var: config.env_var.to_string(),
            }),
        }
    }

    /// Base URL, honouring the override variable when set.
    pub fn base_url(&self) -> String {
        let config = self.config();
        std::env::var(config.url_override_var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| config.api_url.to_string())
            .trim_end_matches('/')
            .to_string()
    }
}

#[derive(Clone, Debug)]
pub struct Credentials {
    pub api_key: String,
    pub base_url: String,
}

impl Credentials {
    pub fn from_env(service: Service) -> Result<Self> {
        Ok(Self {
            api_key: service.validate_api_key()?,
            base_url: service.base_url(),
        })
    }
}

/// Whole-request timeouts for each remote service.
///
/// Uploads stream the entire audio file, so they get their own, longer limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub assemblyai: Duration,
    pub upload: Duration,
    pub julep: Duration,
    pub serpapi: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            assemblyai: Duration::from_secs(60),
            upload: Duration::from_secs(30 * 60),
            julep: Duration::from_secs(60),
            serpapi: Duration::from_secs(30),
        }
    }
}

impl HttpTimeouts {
    pub fn for_service(&self, service: Service) -> Duration {
        match service {
            Service::AssemblyAi => self.assemblyai,
            Service::Julep => self.julep,
            Service::SerpApi => self.serpapi,
        }
    }
}

/// HTTP client that gives up on any request taking longer than `timeout`.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

#[derive(Clone, Debug)]
pub struct AgentSettings {
    pub name: String,
    pub model: String,
    pub about: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            name: "Risk Analyzer".to_string(),
            model: "gpt-4o".to_string(),
            about: "Detects risk-related keywords and phrases in a transcript.".to_string(),
        }
    }
}

/// Everything a pipeline needs apart from the service clients themselves.
#[derive(Clone, Debug)]
pub struct Config {
    pub results_dir: PathBuf,
    pub work_dir: PathBuf,
    pub agent: AgentSettings,
    pub speaker_labels: bool,
    pub transcription_poll: PollPolicy,
    pub analysis_poll: PollPolicy,
    pub progress_ttl: Duration,
    pub timeouts: HttpTimeouts,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            results_dir: default_results_dir(),
            work_dir: std::env::temp_dir(),
            agent: AgentSettings::default(),
            speaker_labels: false,
            transcription_poll: PollPolicy::transcription(),
            analysis_poll: PollPolicy::analysis(),
            progress_ttl: Duration::from_secs(15 * 60),
            timeouts: HttpTimeouts::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(dir) = env_path("RISKSCAN_RESULTS_DIR") {
            config.results_dir = dir;
        }
        if let Some(dir) = env_path("RISKSCAN_WORK_DIR") {
            config.work_dir = dir;
        }
        if let Ok(model) = std::env::var("RISKSCAN_AGENT_MODEL")
            && !model.trim().is_empty()
        {
            config.agent.model = model;
        }
        if let Some(secs) = env_secs("RISKSCAN_HTTP_TIMEOUT_SECS") {
            config.timeouts.assemblyai = secs;
            config.timeouts.julep = secs;
            config.timeouts.serpapi = secs;
        }
        if let Some(secs) = env_secs("RISKSCAN_UPLOAD_TIMEOUT_SECS") {
            config.timeouts.upload = secs;
        }
        if let Ok(flag) = std::env::var("RISKSCAN_SPEAKER_LABELS") {
            config.speaker_labels = matches!(flag.trim(), "1" | "true" | "yes" | "on");
        }

        config
    }
}

pub fn default_results_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("riskscan")
        .join("results")
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn env_secs(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}
