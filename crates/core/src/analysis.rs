use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{StatusCode, header::AUTHORIZATION};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    config::{AgentSettings, Credentials, http_client},
    error::{Error, Result},
    poll::{Attempt, PollPolicy, poll_until},
    types::{CompanyRecord, RiskReport},
};

static RISK_SYSTEM_PROMPT: &str =
    "You are an assistant that identifies risk indicators in transcripts of spoken content.";

static RISK_TASK_PROMPT: &str = r#"
Analyze the following transcript and identify any risk-related keywords or phrases relevant to reputation, legal issues, financial instability, or controversies. For each item you identify, provide a brief explanation of why it might be a risk indicator.

Transcript:
{input}

Return the results as a numbered list.
"#;

static CONTRACT_SYSTEM_PROMPT: &str = "You are an assistant specialized in contract analysis.";

static CONTRACT_TASK_PROMPT: &str = r#"
You are an expert in contract analysis. Based on the text excerpt provided below from a contract agreement, give the 2 companies that are parties to the agreement. Return your answer as exactly 2 separate lines, each line containing one company name.

Text:
{input}
"#;

static SUBJECT_SYSTEM_PROMPT: &str =
    "You are an assistant that identifies risk indicators in public records about a single company.";

static SUBJECT_TASK_PROMPT: &str = r#"
The text below comes from a public case document concerning a single company. Identify risk indicators such as bankruptcy, fraud, litigation, regulatory action, or financial distress. For each item, quote or paraphrase the relevant passage and explain briefly why it is a risk.

Text:
{input}

Return the results as a numbered list.
"#;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AgentId(pub String);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single-step prompt task.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub system_prompt: &'static str,
    pub user_prompt: String,
    pub returns: &'static str,
}

impl TaskSpec {
    fn body(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "main": [{
                "prompt": [
                    {"role": "system", "content": self.system_prompt},
                    {"role": "user", "content": self.user_prompt},
                ],
                "return": {"result": self.returns},
            }],
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Queued,
    Starting,
    Running,
    AwaitingInput,
    Succeeded,
    Failed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExecutionStatus::Queued => "queued",
            ExecutionStatus::Starting => "starting",
            ExecutionStatus::Running => "running",
            ExecutionStatus::AwaitingInput => "awaiting_input",
            ExecutionStatus::Succeeded => "succeeded",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
            ExecutionStatus::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Execution {
    pub id: String,
    pub status: ExecutionStatus,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Execution {
    /// First message content of a succeeded execution, if the output has that shape.
    pub fn message_content(&self) -> Option<&str> {
        self.output.as_ref()?["choices"][0]["message"]["content"].as_str()
    }
}

#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn create_agent(&self, settings: &AgentSettings) -> Result<AgentId>;
    async fn create_task(&self, agent: &AgentId, task: &TaskSpec) -> Result<String>;
    async fn start_execution(&self, task_id: &str) -> Result<String>;
    async fn get_execution(&self, execution_id: &str) -> Result<Execution>;
}

/// Client for the Julep agents API.
#[derive(Clone)]
pub struct Julep {
    client: reqwest::Client,
    credentials: Credentials,
}

#[derive(Serialize)]
struct CreateAgent<'a> {
    name: &'a str,
    model: &'a str,
    about: &'a str,
}

#[derive(Deserialize)]
struct Created {
    id: String,
}

impl Julep {
    pub fn new(credentials: Credentials, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            credentials,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.credentials.base_url, path)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.credentials.api_key)
    }

    async fn checked<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
        action: &str,
    ) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::AnalysisFailed {
                reason: format!("{action} returned {status}: {body}"),
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl TaskExecutor for Julep {
    async fn create_agent(&self, settings: &AgentSettings) -> Result<AgentId> {
        let response = self
            .client
            .post(self.endpoint("agents"))
            .header(AUTHORIZATION, self.bearer())
            .json(&CreateAgent {
                name: &settings.name,
                model: &settings.model,
                about: &settings.about,
            })
            .send()
            .await?;
        let created: Created = Self::checked(response, "agent creation").await?;
        Ok(AgentId(created.id))
    }

    async fn create_task(&self, agent: &AgentId, task: &TaskSpec) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint(&format!("agents/{agent}/tasks")))
            .header(AUTHORIZATION, self.bearer())
            .json(&task.body())
            .send()
            .await?;
        let created: Created = Self::checked(response, "task creation").await?;
        Ok(created.id)
    }

    async fn start_execution(&self, task_id: &str) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint(&format!("tasks/{task_id}/executions")))
            .header(AUTHORIZATION, self.bearer())
            .json(&serde_json::json!({ "input": {} }))
            .send()
            .await?;
        let created: Created = Self::checked(response, "execution start").await?;
        Ok(created.id)
    }

    async fn get_execution(&self, execution_id: &str) -> Result<Execution> {
        let response = self
            .client
            .get(self.endpoint(&format!("executions/{execution_id}")))
            .header(AUTHORIZATION, self.bearer())
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::AnalysisFailed {
                reason: format!("execution {execution_id} not found"),
            });
        }
        Self::checked(response, "execution lookup").await
    }
}

/// Risk analysis on behalf of one provisioned agent.
#[derive(Clone)]
pub struct Analyst {
    executor: Arc<dyn TaskExecutor>,
    agent: AgentId,
    policy: PollPolicy,
}

impl Analyst {
    pub fn new(executor: Arc<dyn TaskExecutor>, agent: AgentId, policy: PollPolicy) -> Self {
        Self {
            executor,
            agent,
            policy,
        }
    }

    /// Create the agent on the service and bind an analyst to it.
    pub async fn provision(
        executor: Arc<dyn TaskExecutor>,
        settings: &AgentSettings,
        policy: PollPolicy,
    ) -> Result<Self> {
        let agent = executor.create_agent(settings).await?;
        info!(%agent, model = %settings.model, "analysis agent created");
        Ok(Self::new(executor, agent, policy))
    }

    pub fn agent(&self) -> &AgentId {
        &self.agent
    }

    /// Risk keywords and phrases in a transcript or news digest.
    pub async fn assess_risk(&self, text: &str) -> Result<RiskReport> {
        if text.trim().is_empty() {
            warn!("no text available for risk analysis");
            return Ok(RiskReport::Empty);
        }
        self.run(&TaskSpec {
            name: "AI Risk Analysis",
            description: "Analyze transcript for risk-related keywords and phrases.",
            system_prompt: RISK_SYSTEM_PROMPT,
            user_prompt: RISK_TASK_PROMPT.replace("{input}", text),
            returns: "Risk Analysis Report.",
        })
        .await
    }

    /// The two parties to a contract.
    pub async fn extract_companies(&self, text: &str) -> Result<CompanyRecord> {
        if text.trim().is_empty() {
            return Ok(CompanyRecord::default());
        }
        let report = self
            .run(&TaskSpec {
                name: "Contract Companies Extraction",
                description: "Extract the two companies that are parties to the contract agreement.",
                system_prompt: CONTRACT_SYSTEM_PROMPT,
                user_prompt: CONTRACT_TASK_PROMPT.replace("{input}", text),
                returns: "Two Companies Involved in the Contract Agreement.",
            })
            .await?;
        Ok(CompanyRecord::from_lines(report.text()))
    }

    /// Risk indicators in a public case document about one company.
    pub async fn assess_subject(&self, text: &str) -> Result<RiskReport> {
        if text.trim().is_empty() {
            return Ok(RiskReport::Empty);
        }
        self.run(&TaskSpec {
            name: "Single Company Risk Analysis",
            description: "Identify risk indicators in a public case document.",
            system_prompt: SUBJECT_SYSTEM_PROMPT,
            user_prompt: SUBJECT_TASK_PROMPT.replace("{input}", text),
            returns: "Risk Analysis Report.",
        })
        .await
    }

    async fn run(&self, task: &TaskSpec) -> Result<RiskReport> {
        let task_id = self.executor.create_task(&self.agent, task).await?;
        let execution_id = self.executor.start_execution(&task_id).await?;
        info!(task = task.name, %task_id, %execution_id, "execution started");

        let executor = &self.executor;
        let execution_id = execution_id.as_str();
        let execution = poll_until(&self.policy, "analysis execution", || async move {
            let execution = executor.get_execution(execution_id).await?;
            match execution.status {
                ExecutionStatus::Succeeded => Ok(Attempt::Ready(execution)),
                ExecutionStatus::Failed | ExecutionStatus::Cancelled => {
                    Err(Error::AnalysisFailed {
                        reason: execution
                            .error
                            .unwrap_or_else(|| format!("execution {}", execution.status)),
                    })
                }
                // nothing ever supplies input to a single-step task
                ExecutionStatus::AwaitingInput => {
                    warn!(%execution_id, "execution is waiting for input");
                    Err(Error::AnalysisFailed {
                        reason: format!("execution {execution_id} is awaiting input"),
                    })
                }
                pending => Ok(Attempt::Pending(pending.to_string())),
            }
        })
        .await?;

        match execution.message_content() {
            Some(content) => Ok(RiskReport::from_content(content)),
            None => {
                warn!(%execution_id, "execution output has no choices");
                Ok(RiskReport::Empty)
            }
        }
    }
}
