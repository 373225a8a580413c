//! Asynchronous exchanges with the external scoring and chat agents.
//!
//! Each request gets its own timeout and cancellation token. Nothing is retried
//! here; retry policy belongs to the caller.

mod session;
mod transport;

pub use session::{RequestPhase, SessionId, SessionRegistry, Ticket};
pub use transport::{
    AgentKind, AgentReply, AgentRequest, AgentTransport, HttpAgentTransport, ReplyStatus,
};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use super::domain::{Candidate, InterviewQuestion, Job, JobId};
use super::evaluation::AnswerEvaluation;
use super::matching::{AgentJobSignal, MatchReport, MatchingEngine};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgentError {
    #[error("{agent} agent could not be reached: {message}")]
    Dispatch { agent: AgentKind, message: String },
    #[error("{agent} agent did not respond within {timeout_ms}ms")]
    Timeout { agent: AgentKind, timeout_ms: u64 },
    #[error("{agent} request was cancelled")]
    Cancelled { agent: AgentKind },
    #[error("{agent} agent rejected the request: {message}")]
    Rejected { agent: AgentKind, message: String },
    #[error("{agent} agent returned an unusable payload: {message}")]
    Malformed { agent: AgentKind, message: String },
}

impl AgentError {
    pub fn agent(&self) -> AgentKind {
        match self {
            AgentError::Dispatch { agent, .. }
            | AgentError::Timeout { agent, .. }
            | AgentError::Cancelled { agent }
            | AgentError::Rejected { agent, .. }
            | AgentError::Malformed { agent, .. } => *agent,
        }
    }

    /// Terminal phase this error leaves the request in.
    pub fn phase(&self) -> RequestPhase {
        match self {
            AgentError::Timeout { .. } => RequestPhase::TimedOut,
            AgentError::Cancelled { .. } => RequestPhase::Cancelled,
            _ => RequestPhase::Failed,
        }
    }

    /// Failures a caller may reasonably retry. The orchestrator never does.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AgentError::Dispatch { .. } | AgentError::Timeout { .. })
    }

    /// Mock substitution covers failed and timed-out calls, never cancelled ones.
    pub fn allows_fallback(&self) -> bool {
        !matches!(self, AgentError::Cancelled { .. })
    }
}

/// What `match_jobs` does when the agent call fails or times out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    #[default]
    Fail,
    MockOnFailure,
}

/// Per-call knobs. The cancellation token is owned by this request only.
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    pub session_id: Option<SessionId>,
    pub timeout: Option<Duration>,
    pub cancel: CancellationToken,
}

impl DispatchOptions {
    pub fn in_session(session_id: SessionId) -> Self {
        Self {
            session_id: Some(session_id),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Audit record of one exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallTrace {
    pub request_id: Uuid,
    pub session_id: SessionId,
    pub agent: AgentKind,
    pub phase: RequestPhase,
    pub elapsed_ms: u64,
}

struct AgentCall {
    request_id: Uuid,
    session_id: SessionId,
    agent: AgentKind,
    phase: RequestPhase,
    started: Instant,
}

impl AgentCall {
    fn new(agent: AgentKind, session_id: SessionId) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            session_id,
            agent,
            phase: RequestPhase::Idle,
            started: Instant::now(),
        }
    }

    fn advance(&mut self, phase: RequestPhase) {
        debug_assert!(!self.phase.is_terminal(), "request already settled");
        debug!(
            request_id = %self.request_id,
            session_id = %self.session_id,
            agent = %self.agent,
            from = ?self.phase,
            to = ?phase,
            "agent request phase change"
        );
        self.phase = phase;
    }

    fn trace(&self) -> CallTrace {
        CallTrace {
            request_id: self.request_id,
            session_id: self.session_id.clone(),
            agent: self.agent,
            phase: self.phase,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
        }
    }
}

/// Ranked matches plus provenance of the scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub session_id: SessionId,
    pub trace: CallTrace,
    pub is_mock: bool,
    pub summary: Option<String>,
    pub fallback_reason: Option<String>,
    pub report: MatchReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub session_id: SessionId,
    pub trace: CallTrace,
    pub evaluation: AnswerEvaluation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConciergeReply {
    pub session_id: SessionId,
    pub trace: CallTrace,
    pub result: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
struct MatcherEnvelope {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default, alias = "results", alias = "matches")]
    recommended_jobs: Vec<Value>,
}

struct MatcherPayload {
    summary: Option<String>,
    signals: BTreeMap<JobId, AgentJobSignal>,
}

/// Dispatches requests to the agents and normalizes their replies.
pub struct AgentOrchestrator<T> {
    transport: Arc<T>,
    sessions: SessionRegistry,
    engine: Arc<MatchingEngine>,
    default_timeout: Duration,
}

impl<T> AgentOrchestrator<T>
where
    T: AgentTransport,
{
    pub fn new(transport: Arc<T>, engine: MatchingEngine, default_timeout: Duration) -> Self {
        Self {
            transport,
            sessions: SessionRegistry::new(),
            engine: Arc::new(engine),
            default_timeout,
        }
    }

    pub fn engine(&self) -> &MatchingEngine {
        &self.engine
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Rank `jobs` for `candidate` with agent-supplied signals.
    ///
    /// With [`FallbackPolicy::MockOnFailure`] a failed or timed-out call yields a
    /// locally ranked report flagged `is_mock`; otherwise the error propagates.
    pub async fn match_jobs(
        &self,
        candidate: &Candidate,
        jobs: &[Job],
        policy: FallbackPolicy,
        options: DispatchOptions,
    ) -> Result<MatchOutcome, AgentError> {
        let context = json!({ "candidate": candidate, "jobs": jobs });
        let query = format!("rank {} job(s) for candidate {}", jobs.len(), candidate.id);
        let (trace, reply) = self.exchange(AgentKind::JobMatcher, query, context, options).await;

        let parsed = reply.and_then(|reply| {
            let is_mock = reply.is_mock;
            parse_matcher_payload(reply.result).map(|payload| (payload, is_mock))
        });

        match parsed {
            Ok((payload, is_mock)) => {
                let report = self.engine.rank(candidate, jobs, &payload.signals);
                let report = if is_mock { report.mark_mock() } else { report };
                Ok(MatchOutcome {
                    session_id: trace.session_id.clone(),
                    trace,
                    is_mock,
                    summary: payload.summary,
                    fallback_reason: None,
                    report,
                })
            }
            Err(error) if policy == FallbackPolicy::MockOnFailure && error.allows_fallback() => {
                warn!(
                    request_id = %trace.request_id,
                    session_id = %trace.session_id,
                    %error,
                    "job matcher unavailable, serving mock ranking"
                );
                let report = self
                    .engine
                    .rank(candidate, jobs, &BTreeMap::new())
                    .mark_mock();
                Ok(MatchOutcome {
                    session_id: trace.session_id.clone(),
                    trace,
                    is_mock: true,
                    summary: None,
                    fallback_reason: Some(error.to_string()),
                    report,
                })
            }
            Err(error) => Err(error),
        }
    }

    /// Evaluate one answer. Failures always propagate; there is no mock path.
    pub async fn evaluate_answer(
        &self,
        question: &InterviewQuestion,
        answer: &str,
        options: DispatchOptions,
    ) -> Result<AnswerOutcome, AgentError> {
        let context = json!({
            "question": question.text,
            "question_type": question.question_type,
            "difficulty": question.difficulty,
            "answer": answer,
        });
        let query = "evaluate the candidate's interview answer".to_string();
        let (trace, reply) = self
            .exchange(AgentKind::AnswerEvaluator, query, context, options)
            .await;

        let reply = reply?;
        if !reply.result.is_object() {
            return Err(AgentError::Malformed {
                agent: AgentKind::AnswerEvaluator,
                message: "expected an evaluation object".to_string(),
            });
        }
        let evaluation = serde_json::from_value::<AnswerEvaluation>(reply.result).map_err(|error| {
            AgentError::Malformed {
                agent: AgentKind::AnswerEvaluator,
                message: error.to_string(),
            }
        })?;

        Ok(AnswerOutcome {
            session_id: trace.session_id.clone(),
            trace,
            evaluation,
        })
    }

    /// Free-text assistant exchange.
    pub async fn concierge(
        &self,
        query: &str,
        context: Value,
        options: DispatchOptions,
    ) -> Result<ConciergeReply, AgentError> {
        let (trace, reply) = self
            .exchange(AgentKind::Concierge, query.to_string(), context, options)
            .await;
        let reply = reply?;

        Ok(ConciergeReply {
            session_id: trace.session_id.clone(),
            trace,
            result: concierge_text(reply.result),
            timestamp: reply.timestamp.unwrap_or_else(Utc::now),
        })
    }

    async fn exchange(
        &self,
        agent: AgentKind,
        query: String,
        context: Value,
        options: DispatchOptions,
    ) -> (CallTrace, Result<AgentReply, AgentError>) {
        let session_id = self.sessions.resolve(options.session_id);
        let timeout = options.timeout.unwrap_or(self.default_timeout);
        let cancel = options.cancel;

        let mut call = AgentCall::new(agent, session_id.clone());
        let ticket = self.sessions.issue(&session_id);
        let request = AgentRequest {
            query,
            context,
            agent_type: agent,
            session_id,
        };

        // One deadline covers the dispatch and the wait for this session's turn.
        let deadline = tokio::time::Instant::now() + timeout;
        let expired = || AgentError::Timeout {
            agent,
            timeout_ms: timeout.as_millis() as u64,
        };

        call.advance(RequestPhase::Dispatched);
        let mut outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AgentError::Cancelled { agent }),
            reply = tokio::time::timeout_at(deadline, self.transport.dispatch(request)) => match reply {
                Ok(reply) => reply.and_then(|reply| reply.accept(agent)),
                Err(_) => Err(expired()),
            },
        };

        if !matches!(outcome, Err(AgentError::Cancelled { .. })) {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => outcome = Err(AgentError::Cancelled { agent }),
                turn = tokio::time::timeout_at(deadline, ticket.wait_turn()) => {
                    if turn.is_err() {
                        outcome = Err(expired());
                    }
                }
            }
        }
        drop(ticket);

        call.advance(match &outcome {
            Ok(_) => RequestPhase::Succeeded,
            Err(error) => error.phase(),
        });

        (call.trace(), outcome)
    }
}

fn parse_matcher_payload(result: Value) -> Result<MatcherPayload, AgentError> {
    let envelope = match result {
        Value::Array(items) => MatcherEnvelope {
            summary: None,
            recommended_jobs: items,
        },
        Value::Object(_) => serde_json::from_value(result).map_err(|error| AgentError::Malformed {
            agent: AgentKind::JobMatcher,
            message: error.to_string(),
        })?,
        other => {
            return Err(AgentError::Malformed {
                agent: AgentKind::JobMatcher,
                message: format!("expected ranked jobs, found {other}"),
            })
        }
    };

    let mut signals = BTreeMap::new();
    for entry in envelope.recommended_jobs {
        match serde_json::from_value::<AgentJobSignal>(entry) {
            Ok(signal) => {
                signals.entry(signal.job_id.clone()).or_insert(signal);
            }
            Err(error) => warn!(%error, "skipping unreadable job matcher entry"),
        }
    }

    Ok(MatcherPayload {
        summary: envelope.summary,
        signals,
    })
}

fn concierge_text(result: Value) -> String {
    match result {
        Value::String(text) => text,
        Value::Object(ref fields) => ["response", "answer", "message", "text"]
            .iter()
            .find_map(|key| fields.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| result.to_string()),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
