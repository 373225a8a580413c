use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::agent::{
    AgentError, AgentOrchestrator, AgentTransport, AnswerOutcome, ConciergeReply,
    DispatchOptions, FallbackPolicy, MatchOutcome, SessionId,
};
use super::domain::{
    Actor, ActorRole, Application, ApplicationId, ApplicationStatus, CandidateAnswers,
    CandidateId, Interview, InterviewId, InterviewPlan, InterviewQuestion, InterviewResult,
    JobId, RecruiterScores, ValidationError,
};
use super::evaluation::{
    AnswerEvaluation, ApplicationRecommendation, EvaluationThresholds, InterviewAggregator,
};
use super::lifecycle::{self, TransitionError};
use super::matching::{MatchThresholds, MatchWeights, MatchingEngine};
use super::repository::{FeedbackRecord, HiringRepository, RepositoryError};

/// Scoring and agent settings shared by every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HiringSettings {
    pub weights: MatchWeights,
    pub match_thresholds: MatchThresholds,
    pub evaluation_thresholds: EvaluationThresholds,
    pub agent_timeout: Duration,
}

impl Default for HiringSettings {
    fn default() -> Self {
        Self {
            weights: MatchWeights::default(),
            match_thresholds: MatchThresholds::default(),
            evaluation_thresholds: EvaluationThresholds::default(),
            agent_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyRequest {
    pub job_id: JobId,
    #[serde(default)]
    pub cover_letter: Option<String>,
    /// Save without submitting; the candidate submits later via a status change.
    #[serde(default)]
    pub draft: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChangeRequest {
    pub status: ApplicationStatus,
    #[serde(default)]
    pub interview: Option<InterviewPlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub application: Application,
    pub previous_status: ApplicationStatus,
    pub changed: bool,
    pub interview: Option<Interview>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSubmission {
    #[serde(default)]
    pub scores: RecruiterScores,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub result: InterviewResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerSubmission {
    pub questions: Vec<InterviewQuestion>,
    pub answers: BTreeMap<usize, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerReviewRequest {
    pub question_index: usize,
    #[serde(default)]
    pub session_id: Option<SessionId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchJobsRequest {
    pub candidate_id: CandidateId,
    /// Empty means every listed job.
    #[serde(default)]
    pub job_ids: Vec<JobId>,
    #[serde(default)]
    pub session_id: Option<SessionId>,
    #[serde(default)]
    pub allow_mock_fallback: bool,
    /// Store non-mock overall scores on the candidate's existing applications.
    #[serde(default)]
    pub persist_scores: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConciergeRequest {
    pub query: String,
    #[serde(default)]
    pub context: Value,
    #[serde(default)]
    pub session_id: Option<SessionId>,
}

/// Machine-readable error classification surfaced on every failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    IllegalTransition,
    UnauthorizedActor,
    AgentDispatchError,
    AgentTimeout,
    NotFound,
    Conflict,
    Cancelled,
    Internal,
}

impl ErrorKind {
    pub const fn label(self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::IllegalTransition => "illegal_transition",
            ErrorKind::UnauthorizedActor => "unauthorized_actor",
            ErrorKind::AgentDispatchError => "agent_dispatch_error",
            ErrorKind::AgentTimeout => "agent_timeout",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Error raised by the hiring service.
#[derive(Debug, thiserror::Error)]
pub enum HiringServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("candidate {candidate_id} already applied to job {job_id}")]
    DuplicateApplication {
        candidate_id: CandidateId,
        job_id: JobId,
    },
    #[error("job {0} is not accepting applications")]
    JobClosed(JobId),
}

impl HiringServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HiringServiceError::Validation(_) => ErrorKind::ValidationError,
            HiringServiceError::Transition(TransitionError::IllegalTransition { .. }) => {
                ErrorKind::IllegalTransition
            }
            HiringServiceError::Transition(TransitionError::UnauthorizedActor) => {
                ErrorKind::UnauthorizedActor
            }
            HiringServiceError::Transition(TransitionError::InterviewRoundRequired(_)) => {
                ErrorKind::ValidationError
            }
            HiringServiceError::Repository(RepositoryError::Conflict) => ErrorKind::Conflict,
            HiringServiceError::Repository(RepositoryError::NotFound) => ErrorKind::NotFound,
            HiringServiceError::Repository(RepositoryError::Invalid(_)) => ErrorKind::ValidationError,
            HiringServiceError::Repository(RepositoryError::Unavailable(_)) => ErrorKind::Internal,
            HiringServiceError::Agent(AgentError::Timeout { .. }) => ErrorKind::AgentTimeout,
            HiringServiceError::Agent(AgentError::Cancelled { .. }) => ErrorKind::Cancelled,
            HiringServiceError::Agent(_) => ErrorKind::AgentDispatchError,
            HiringServiceError::NotFound { .. } => ErrorKind::NotFound,
            HiringServiceError::DuplicateApplication { .. } | HiringServiceError::JobClosed(_) => {
                ErrorKind::Conflict
            }
        }
    }

    fn unauthorized() -> Self {
        HiringServiceError::Transition(TransitionError::UnauthorizedActor)
    }
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static INTERVIEW_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

fn next_interview_id() -> InterviewId {
    let id = INTERVIEW_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    InterviewId(format!("int-{id:06}"))
}

/// Facade composing the repository, lifecycle rules, aggregator, and agents.
///
/// Applications and interviews the actor does not own are reported exactly like
/// missing ones, as `UnauthorizedActor`.
pub struct HiringService<R, T> {
    repository: Arc<R>,
    orchestrator: Arc<AgentOrchestrator<T>>,
    aggregator: Arc<InterviewAggregator>,
}

impl<R, T> HiringService<R, T>
where
    R: HiringRepository + 'static,
    T: AgentTransport + 'static,
{
    pub fn new(repository: Arc<R>, transport: Arc<T>, settings: HiringSettings) -> Self {
        let engine = MatchingEngine::new(settings.weights, settings.match_thresholds);
        let orchestrator = AgentOrchestrator::new(transport, engine, settings.agent_timeout);

        Self {
            repository,
            orchestrator: Arc::new(orchestrator),
            aggregator: Arc::new(InterviewAggregator::new(settings.evaluation_thresholds)),
        }
    }

    pub fn orchestrator(&self) -> &AgentOrchestrator<T> {
        &self.orchestrator
    }

    pub fn aggregator(&self) -> &InterviewAggregator {
        &self.aggregator
    }

    /// Create an application for the acting candidate.
    pub fn apply(
        &self,
        actor: &Actor,
        request: ApplyRequest,
    ) -> Result<Application, HiringServiceError> {
        if !actor.is(ActorRole::Candidate) {
            return Err(HiringServiceError::unauthorized());
        }
        let candidate_id = CandidateId(actor.subject_id.clone());
        if !actor.owns(&candidate_id.0) {
            return Err(HiringServiceError::unauthorized());
        }

        self.repository
            .fetch_candidate(&candidate_id)?
            .ok_or_else(|| HiringServiceError::NotFound {
                entity: "candidate",
                id: candidate_id.0.clone(),
            })?;
        let job = self
            .repository
            .fetch_job(&request.job_id)?
            .ok_or_else(|| HiringServiceError::NotFound {
                entity: "job",
                id: request.job_id.0.clone(),
            })?;
        if !job.status.accepts_applications() {
            return Err(HiringServiceError::JobClosed(job.id));
        }

        let duplicate = || HiringServiceError::DuplicateApplication {
            candidate_id: candidate_id.clone(),
            job_id: job.id.clone(),
        };
        if self
            .repository
            .find_application(&candidate_id, &job.id)?
            .is_some()
        {
            return Err(duplicate());
        }

        let now = Utc::now();
        let application = if request.draft {
            let mut draft = Application::draft(next_application_id(), candidate_id.clone(), job.id.clone(), now);
            draft.cover_letter = request.cover_letter;
            draft
        } else {
            Application::submitted(
                next_application_id(),
                candidate_id.clone(),
                job.id.clone(),
                request.cover_letter,
                now,
            )
        };

        let stored = match self.repository.insert_application(application) {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict) => return Err(duplicate()),
            Err(other) => return Err(other.into()),
        };
        info!(
            application_id = %stored.id,
            candidate_id = %stored.candidate_id,
            job_id = %stored.job_id,
            status = %stored.status(),
            "application created"
        );
        Ok(stored)
    }

    pub fn application(
        &self,
        actor: &Actor,
        application_id: &ApplicationId,
    ) -> Result<Application, HiringServiceError> {
        let application = self
            .repository
            .fetch_application(application_id)?
            .ok_or_else(HiringServiceError::unauthorized)?;
        lifecycle::authorize(&application, actor)?;
        Ok(application)
    }

    /// Move an application to `request.status`.
    ///
    /// Entering `interview` creates round 1 from `request.interview` and stores
    /// it together with the new status.
    pub fn change_status(
        &self,
        actor: &Actor,
        application_id: &ApplicationId,
        request: StatusChangeRequest,
    ) -> Result<StatusChange, HiringServiceError> {
        let application = self.application(actor, application_id)?;

        let entering_interview = request.status == ApplicationStatus::Interview
            && application.status() != ApplicationStatus::Interview;
        let round_one = match request.interview {
            Some(plan) if entering_interview => Some(Interview::schedule(
                next_interview_id(),
                application.id.clone(),
                1,
                plan,
            )?),
            _ => None,
        };

        let transition =
            lifecycle::transition(&application, request.status, actor, round_one.as_ref())?;
        if !transition.changed {
            return Ok(StatusChange {
                application: transition.application,
                previous_status: transition.previous,
                changed: false,
                interview: None,
            });
        }

        self.repository.commit_status_change(
            transition.application.clone(),
            transition.previous,
            round_one.clone(),
        )?;
        info!(
            application_id = %transition.application.id,
            from = %transition.previous,
            to = %transition.application.status(),
            actor = actor.role.label(),
            "application status changed"
        );

        Ok(StatusChange {
            application: transition.application,
            previous_status: transition.previous,
            changed: true,
            interview: round_one,
        })
    }

    /// Add the next round to an application already in the interview stage.
    pub fn schedule_interview(
        &self,
        actor: &Actor,
        application_id: &ApplicationId,
        plan: InterviewPlan,
    ) -> Result<Interview, HiringServiceError> {
        let application = self.application(actor, application_id)?;
        if !actor.is(ActorRole::Recruiter) {
            return Err(HiringServiceError::unauthorized());
        }
        if application.status() != ApplicationStatus::Interview {
            return Err(ValidationError::InterviewStageRequired(application.status()).into());
        }

        let existing = self.repository.interviews_for(&application.id)?;
        let round = lifecycle::next_round_number(&existing);
        let interview = Interview::schedule(next_interview_id(), application.id.clone(), round, plan)?;
        let stored = self
            .repository
            .insert_interview(interview, ApplicationStatus::Interview)?;
        info!(
            application_id = %stored.application_id,
            interview_id = %stored.id,
            round = stored.round_number(),
            "interview round scheduled"
        );
        Ok(stored)
    }

    pub fn interviews(
        &self,
        actor: &Actor,
        application_id: &ApplicationId,
    ) -> Result<Vec<Interview>, HiringServiceError> {
        let application = self.application(actor, application_id)?;
        Ok(self.repository.interviews_for(&application.id)?)
    }

    pub fn interview(
        &self,
        actor: &Actor,
        interview_id: &InterviewId,
    ) -> Result<Interview, HiringServiceError> {
        let interview = self
            .repository
            .fetch_interview(interview_id)?
            .ok_or_else(HiringServiceError::unauthorized)?;
        self.application(actor, &interview.application_id)?;
        Ok(interview)
    }

    /// Record recruiter scores, free-text feedback, and the round result.
    pub fn submit_feedback(
        &self,
        actor: &Actor,
        interview_id: &InterviewId,
        submission: FeedbackSubmission,
    ) -> Result<Interview, HiringServiceError> {
        self.interview(actor, interview_id)?;
        if !actor.is(ActorRole::Recruiter) {
            return Err(HiringServiceError::unauthorized());
        }

        submission.scores.validate()?;
        let has_overall = submission.scores.overall.is_some_and(|overall| overall > 0);
        if submission.result != InterviewResult::Pending && !has_overall {
            return Err(ValidationError::MissingOverallScore.into());
        }

        let record = FeedbackRecord {
            scores: submission.scores,
            feedback: submission.feedback,
            notes: submission.notes,
            result: submission.result,
        };
        Ok(self.repository.record_feedback(interview_id, record)?)
    }

    /// Store the candidate's answers. Answers can be submitted once.
    pub fn submit_answers(
        &self,
        actor: &Actor,
        interview_id: &InterviewId,
        submission: AnswerSubmission,
    ) -> Result<Interview, HiringServiceError> {
        let interview = self.interview(actor, interview_id)?;
        if !actor.is(ActorRole::Candidate) {
            return Err(HiringServiceError::unauthorized());
        }
        if let Some(existing) = &interview.candidate_answers {
            return Err(ValidationError::AnswersAlreadySubmitted(existing.submitted_at()).into());
        }

        let answers = CandidateAnswers::new(submission.questions, submission.answers, Utc::now())?;
        match self.repository.store_answers_once(interview_id, answers) {
            Ok(stored) => Ok(stored),
            Err(RepositoryError::Conflict) => Err(self.answers_taken(interview_id)),
            Err(other) => Err(other.into()),
        }
    }

    /// Error for a submission that lost the race against an earlier one.
    fn answers_taken(&self, interview_id: &InterviewId) -> HiringServiceError {
        let submitted_at = match self.repository.fetch_interview(interview_id) {
            Ok(Some(interview)) => interview.candidate_answers.map(|answers| answers.submitted_at()),
            Ok(None) => None,
            Err(error) => return error.into(),
        };
        match submitted_at {
            Some(at) => ValidationError::AnswersAlreadySubmitted(at).into(),
            None => RepositoryError::Conflict.into(),
        }
    }

    /// Ask the answer evaluator about one submitted answer.
    pub async fn evaluate_answer(
        &self,
        actor: &Actor,
        interview_id: &InterviewId,
        request: AnswerReviewRequest,
    ) -> Result<AnswerOutcome, HiringServiceError> {
        let interview = self.interview(actor, interview_id)?;
        let answers = interview
            .candidate_answers
            .as_ref()
            .ok_or(ValidationError::NoAnswersSubmitted)?;
        let question = answers
            .questions()
            .get(request.question_index)
            .ok_or(ValidationError::UnknownQuestion(request.question_index))?;
        let answer = answers
            .answer(request.question_index)
            .ok_or(ValidationError::EmptyField { field: "answer" })?;

        let options = DispatchOptions {
            session_id: request.session_id,
            ..DispatchOptions::default()
        };
        Ok(self
            .orchestrator
            .evaluate_answer(question, answer, options)
            .await?)
    }

    /// Evaluate every answered question in one session and store the aggregate
    /// as the interview's `evaluation_report`. Any agent failure aborts the
    /// whole evaluation and nothing is stored.
    pub async fn evaluate_interview(
        &self,
        actor: &Actor,
        interview_id: &InterviewId,
        session_id: Option<SessionId>,
    ) -> Result<Interview, HiringServiceError> {
        let interview = self.interview(actor, interview_id)?;
        if !actor.is(ActorRole::Recruiter) {
            return Err(HiringServiceError::unauthorized());
        }
        let answers = interview
            .candidate_answers
            .clone()
            .ok_or(ValidationError::NoAnswersSubmitted)?;

        let session = self.orchestrator.sessions().resolve(session_id);
        let mut evaluations: BTreeMap<usize, AnswerEvaluation> = BTreeMap::new();
        for (index, question, answer) in answers.answered() {
            let outcome = self
                .orchestrator
                .evaluate_answer(question, answer, DispatchOptions::in_session(session.clone()))
                .await?;
            evaluations.insert(index, outcome.evaluation);
        }

        let report = self.aggregator.summarize(&answers, &evaluations);
        info!(
            interview_id = %interview.id,
            session_id = %session,
            answered = report.answered_questions,
            partial = report.partial,
            "interview evaluation stored"
        );
        Ok(self.repository.store_evaluation(&interview.id, report)?)
    }

    pub fn recommendation(
        &self,
        actor: &Actor,
        application_id: &ApplicationId,
    ) -> Result<ApplicationRecommendation, HiringServiceError> {
        let interviews = self.interviews(actor, application_id)?;
        Ok(self.aggregator.recommend(&interviews))
    }

    /// Rank jobs for a candidate through the job matcher agent.
    pub async fn match_jobs(
        &self,
        actor: &Actor,
        request: MatchJobsRequest,
    ) -> Result<MatchOutcome, HiringServiceError> {
        let may_read = match actor.role {
            ActorRole::Candidate => actor.owns(&request.candidate_id.0),
            ActorRole::Recruiter => true,
        };
        if !may_read {
            return Err(HiringServiceError::unauthorized());
        }

        let candidate = self
            .repository
            .fetch_candidate(&request.candidate_id)?
            .ok_or_else(|| HiringServiceError::NotFound {
                entity: "candidate",
                id: request.candidate_id.0.clone(),
            })?;
        candidate.validate()?;

        let jobs = if request.job_ids.is_empty() {
            self.repository.listed_jobs()?
        } else {
            let mut jobs = Vec::with_capacity(request.job_ids.len());
            for job_id in &request.job_ids {
                let job = self
                    .repository
                    .fetch_job(job_id)?
                    .ok_or_else(|| HiringServiceError::NotFound {
                        entity: "job",
                        id: job_id.0.clone(),
                    })?;
                jobs.push(job);
            }
            jobs
        };

        let policy = if request.allow_mock_fallback {
            FallbackPolicy::MockOnFailure
        } else {
            FallbackPolicy::Fail
        };
        let options = DispatchOptions {
            session_id: request.session_id,
            ..DispatchOptions::default()
        };
        let outcome = self
            .orchestrator
            .match_jobs(&candidate, &jobs, policy, options)
            .await?;

        if request.persist_scores && !outcome.is_mock {
            self.persist_scores(actor, &candidate.id, &outcome)?;
        }
        Ok(outcome)
    }

    fn persist_scores(
        &self,
        actor: &Actor,
        candidate_id: &CandidateId,
        outcome: &MatchOutcome,
    ) -> Result<(), HiringServiceError> {
        for result in &outcome.report.results {
            let Some(application) = self.repository.find_application(candidate_id, &result.job_id)?
            else {
                continue;
            };
            if lifecycle::authorize(&application, actor).is_err() {
                continue;
            }
            self.repository
                .set_matching_score(&application.id, result.overall_score)?;
        }
        Ok(())
    }

    pub async fn concierge(
        &self,
        actor: &Actor,
        request: ConciergeRequest,
    ) -> Result<ConciergeReply, HiringServiceError> {
        if request.query.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "query" }.into());
        }
        let context = serde_json::json!({
            "actor_role": actor.role,
            "context": request.context,
        });
        let options = DispatchOptions {
            session_id: request.session_id,
            ..DispatchOptions::default()
        };
        Ok(self
            .orchestrator
            .concierge(&request.query, context, options)
            .await?)
    }
}
