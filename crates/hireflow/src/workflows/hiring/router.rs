use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::agent::{AgentError, AgentTransport, SessionId};
use super::domain::{Actor, ActorRole, ApplicationId, InterviewId, InterviewPlan};
use super::lifecycle::TransitionError;
use super::repository::HiringRepository;
use super::service::{
    AnswerReviewRequest, AnswerSubmission, ApplyRequest, ConciergeRequest, ErrorKind,
    FeedbackSubmission, HiringService, HiringServiceError, MatchJobsRequest, StatusChangeRequest,
};

pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_OWNS_HEADER: &str = "x-actor-owns";

type SharedService<R, T> = State<Arc<HiringService<R, T>>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluateInterviewRequest {
    #[serde(default)]
    pub session_id: Option<SessionId>,
}

/// Router exposing the application, interview, and agent endpoints.
pub fn hiring_router<R, T>(service: Arc<HiringService<R, T>>) -> Router
where
    R: HiringRepository + 'static,
    T: AgentTransport + 'static,
{
    Router::new()
        .route("/applications", post(apply_handler::<R, T>))
        .route(
            "/applications/:application_id",
            get(application_handler::<R, T>).patch(status_handler::<R, T>),
        )
        .route(
            "/applications/:application_id/interviews",
            get(interviews_handler::<R, T>).post(schedule_handler::<R, T>),
        )
        .route(
            "/applications/:application_id/recommendation",
            get(recommendation_handler::<R, T>),
        )
        .route("/interviews/:interview_id", get(interview_handler::<R, T>))
        .route(
            "/interviews/:interview_id/submit_feedback",
            post(feedback_handler::<R, T>),
        )
        .route(
            "/interviews/:interview_id/submit_answers",
            post(answers_handler::<R, T>),
        )
        .route(
            "/interviews/:interview_id/evaluate_answer",
            post(evaluate_answer_handler::<R, T>),
        )
        .route(
            "/interviews/:interview_id/evaluate",
            post(evaluate_interview_handler::<R, T>),
        )
        .route("/agents/job_matcher", post(job_matcher_handler::<R, T>))
        .route("/agents/concierge", post(concierge_handler::<R, T>))
        .with_state(service)
}

/// Build the acting identity from request headers. A candidate always owns its
/// own id in addition to anything listed in `x-actor-owns`.
pub(crate) fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, Response> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    let (Some(role), Some(subject_id)) = (header(ACTOR_ROLE_HEADER), header(ACTOR_ID_HEADER)) else {
        return Err(unauthenticated("missing actor identity headers"));
    };
    let role: ActorRole = role
        .parse()
        .map_err(|_| unauthenticated("unknown actor role"))?;

    let mut owned_entity_ids: BTreeSet<String> = header(ACTOR_OWNS_HEADER)
        .map(|owned| {
            owned
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    if role == ActorRole::Candidate {
        owned_entity_ids.insert(subject_id.to_string());
    }

    Ok(Actor {
        role,
        subject_id: subject_id.to_string(),
        owned_entity_ids,
    })
}

fn unauthenticated(message: &str) -> Response {
    let payload = json!({
        "error": message,
        "kind": ErrorKind::UnauthorizedActor,
    });
    (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
}

pub(crate) fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::IllegalTransition | ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::UnauthorizedActor => StatusCode::FORBIDDEN,
        ErrorKind::AgentDispatchError => StatusCode::BAD_GATEWAY,
        ErrorKind::AgentTimeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn error_response(error: HiringServiceError) -> Response {
    let kind = error.kind();
    let mut payload = json!({
        "error": error.to_string(),
        "kind": kind,
    });

    match &error {
        HiringServiceError::Transition(TransitionError::IllegalTransition { from, to }) => {
            payload["from"] = json!(from);
            payload["to"] = json!(to);
        }
        HiringServiceError::Agent(agent_error) => {
            payload["agent"] = json!(agent_error.agent());
            payload["retryable"] = json!(agent_error.is_retryable());
            if let AgentError::Timeout { timeout_ms, .. } = agent_error {
                payload["timeout_ms"] = json!(timeout_ms);
            }
        }
        HiringServiceError::NotFound { entity, id } => {
            payload["entity"] = json!(entity);
            payload["id"] = json!(id);
        }
        _ => {}
    }

    (status_for(kind), axum::Json(payload)).into_response()
}

fn respond<B: Serialize>(status: StatusCode, result: Result<B, HiringServiceError>) -> Response {
    match result {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

macro_rules! actor_or_reject {
    ($headers:expr) => {
        match actor_from_headers(&$headers) {
            Ok(actor) => actor,
            Err(response) => return response,
        }
    };
}

pub(crate) async fn apply_handler<R, T>(
    State(service): SharedService<R, T>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<ApplyRequest>,
) -> Response
where
    R: HiringRepository + 'static,
    T: AgentTransport + 'static,
{
    let actor = actor_or_reject!(headers);
    respond(StatusCode::CREATED, service.apply(&actor, request))
}

pub(crate) async fn application_handler<R, T>(
    State(service): SharedService<R, T>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response
where
    R: HiringRepository + 'static,
    T: AgentTransport + 'static,
{
    let actor = actor_or_reject!(headers);
    respond(
        StatusCode::OK,
        service.application(&actor, &ApplicationId(application_id)),
    )
}

pub(crate) async fn status_handler<R, T>(
    State(service): SharedService<R, T>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<StatusChangeRequest>,
) -> Response
where
    R: HiringRepository + 'static,
    T: AgentTransport + 'static,
{
    let actor = actor_or_reject!(headers);
    respond(
        StatusCode::OK,
        service.change_status(&actor, &ApplicationId(application_id), request),
    )
}

pub(crate) async fn interviews_handler<R, T>(
    State(service): SharedService<R, T>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response
where
    R: HiringRepository + 'static,
    T: AgentTransport + 'static,
{
    let actor = actor_or_reject!(headers);
    respond(
        StatusCode::OK,
        service.interviews(&actor, &ApplicationId(application_id)),
    )
}

pub(crate) async fn schedule_handler<R, T>(
    State(service): SharedService<R, T>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    axum::Json(plan): axum::Json<InterviewPlan>,
) -> Response
where
    R: HiringRepository + 'static,
    T: AgentTransport + 'static,
{
    let actor = actor_or_reject!(headers);
    respond(
        StatusCode::CREATED,
        service.schedule_interview(&actor, &ApplicationId(application_id), plan),
    )
}

pub(crate) async fn recommendation_handler<R, T>(
    State(service): SharedService<R, T>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response
where
    R: HiringRepository + 'static,
    T: AgentTransport + 'static,
{
    let actor = actor_or_reject!(headers);
    respond(
        StatusCode::OK,
        service.recommendation(&actor, &ApplicationId(application_id)),
    )
}

pub(crate) async fn interview_handler<R, T>(
    State(service): SharedService<R, T>,
    headers: HeaderMap,
    Path(interview_id): Path<String>,
) -> Response
where
    R: HiringRepository + 'static,
    T: AgentTransport + 'static,
{
    let actor = actor_or_reject!(headers);
    respond(
        StatusCode::OK,
        service.interview(&actor, &InterviewId(interview_id)),
    )
}

pub(crate) async fn feedback_handler<R, T>(
    State(service): SharedService<R, T>,
    headers: HeaderMap,
    Path(interview_id): Path<String>,
    axum::Json(submission): axum::Json<FeedbackSubmission>,
) -> Response
where
    R: HiringRepository + 'static,
    T: AgentTransport + 'static,
{
    let actor = actor_or_reject!(headers);
    respond(
        StatusCode::OK,
        service.submit_feedback(&actor, &InterviewId(interview_id), submission),
    )
}

pub(crate) async fn answers_handler<R, T>(
    State(service): SharedService<R, T>,
    headers: HeaderMap,
    Path(interview_id): Path<String>,
    axum::Json(submission): axum::Json<AnswerSubmission>,
) -> Response
where
    R: HiringRepository + 'static,
    T: AgentTransport + 'static,
{
    let actor = actor_or_reject!(headers);
    respond(
        StatusCode::OK,
        service.submit_answers(&actor, &InterviewId(interview_id), submission),
    )
}

pub(crate) async fn evaluate_answer_handler<R, T>(
    State(service): SharedService<R, T>,
    headers: HeaderMap,
    Path(interview_id): Path<String>,
    axum::Json(request): axum::Json<AnswerReviewRequest>,
) -> Response
where
    R: HiringRepository + 'static,
    T: AgentTransport + 'static,
{
    let actor = actor_or_reject!(headers);
    let result = service
        .evaluate_answer(&actor, &InterviewId(interview_id), request)
        .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn evaluate_interview_handler<R, T>(
    State(service): SharedService<R, T>,
    headers: HeaderMap,
    Path(interview_id): Path<String>,
    axum::Json(request): axum::Json<EvaluateInterviewRequest>,
) -> Response
where
    R: HiringRepository + 'static,
    T: AgentTransport + 'static,
{
    let actor = actor_or_reject!(headers);
    let result = service
        .evaluate_interview(&actor, &InterviewId(interview_id), request.session_id)
        .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn job_matcher_handler<R, T>(
    State(service): SharedService<R, T>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<MatchJobsRequest>,
) -> Response
where
    R: HiringRepository + 'static,
    T: AgentTransport + 'static,
{
    let actor = actor_or_reject!(headers);
    let result = service.match_jobs(&actor, request).await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn concierge_handler<R, T>(
    State(service): SharedService<R, T>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<ConciergeRequest>,
) -> Response
where
    R: HiringRepository + 'static,
    T: AgentTransport + 'static,
{
    let actor = actor_or_reject!(headers);
    let result = service.concierge(&actor, request).await;
    respond(StatusCode::OK, result)
}
