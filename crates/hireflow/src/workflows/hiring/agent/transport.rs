use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::session::SessionId;
use super::AgentError;

/// Remote agents the orchestrator can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    JobMatcher,
    AnswerEvaluator,
    Concierge,
}

impl AgentKind {
    pub const fn path(self) -> &'static str {
        match self {
            AgentKind::JobMatcher => "job_matcher",
            AgentKind::AnswerEvaluator => "answer_evaluator",
            AgentKind::Concierge => "concierge",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Body posted to an agent endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRequest {
    pub query: String,
    pub context: Value,
    pub agent_type: AgentKind,
    pub session_id: SessionId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyStatus {
    Success,
    Error,
}

/// Envelope returned by every agent. `result` may be structured JSON or a
/// string that itself contains JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReply {
    pub status: ReplyStatus,
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_mock: bool,
}

impl AgentReply {
    pub fn success(result: Value) -> Self {
        Self {
            status: ReplyStatus::Success,
            agent: None,
            result,
            message: None,
            timestamp: None,
            is_mock: false,
        }
    }

    /// Turn an error envelope into [`AgentError::Rejected`] and unwrap
    /// string-encoded JSON results.
    pub(crate) fn accept(self, agent: AgentKind) -> Result<Self, AgentError> {
        if self.status == ReplyStatus::Error {
            return Err(AgentError::Rejected {
                agent,
                message: self
                    .message
                    .unwrap_or_else(|| "agent reported an error".to_string()),
            });
        }

        let result = match self.result {
            Value::String(raw) => match serde_json::from_str::<Value>(raw.trim()) {
                Ok(parsed) if parsed.is_object() || parsed.is_array() => parsed,
                _ => Value::String(raw),
            },
            other => other,
        };

        Ok(Self { result, ..self })
    }
}

/// Seam between the orchestrator and whatever actually reaches the agent.
#[async_trait]
pub trait AgentTransport: Send + Sync {
    async fn dispatch(&self, request: AgentRequest) -> Result<AgentReply, AgentError>;
}

/// JSON-over-HTTP transport posting to `{base_url}/agents/{agent}`.
#[derive(Debug, Clone)]
pub struct HttpAgentTransport {
    client: Client,
    base_url: String,
}

impl HttpAgentTransport {
    pub fn new(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Build a transport with its own client. Per-request deadlines are enforced
    /// by the orchestrator, so only the connect phase is bounded here.
    pub fn connect(base_url: impl Into<String>, connect_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self::new(base_url, client))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, agent: AgentKind) -> String {
        format!("{}/agents/{}", self.base_url, agent.path())
    }
}

#[async_trait]
impl AgentTransport for HttpAgentTransport {
    async fn dispatch(&self, request: AgentRequest) -> Result<AgentReply, AgentError> {
        let agent = request.agent_type;
        let response = self
            .client
            .post(self.endpoint(agent))
            .json(&request)
            .send()
            .await
            .map_err(|error| AgentError::Dispatch {
                agent,
                message: error.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Dispatch {
                agent,
                message: format!("agent responded with {status}: {body}"),
            });
        }

        response
            .json::<AgentReply>()
            .await
            .map_err(|error| AgentError::Malformed {
                agent,
                message: error.to_string(),
            })
    }
}
