use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

use crate::workflows::hiring::agent::{
    AgentError, AgentKind, AgentReply, AgentRequest, AgentTransport,
};
use crate::workflows::hiring::domain::{
    Actor, Application, ApplicationId, ApplicationStatus, Candidate, CandidateAnswers,
    CandidateId, CandidateSkill, EmploymentType, ExperienceLevel, Interview, InterviewEvaluation,
    InterviewId, InterviewPlan, InterviewQuestion, InterviewType, Job, JobId, JobStatus,
    SkillProficiency,
};
use crate::workflows::hiring::repository::{
    FeedbackRecord, HiringRepository, InMemoryHiringRepository, RepositoryError,
};
use crate::workflows::hiring::service::{HiringService, HiringSettings};

pub(super) fn candidate() -> Candidate {
    Candidate {
        id: CandidateId("cand-1".to_string()),
        user_id: "user-1".to_string(),
        display_name: "Ada Park".to_string(),
        current_role: Some("Data Engineer".to_string()),
        experience_years: 4,
        expected_salary: Some(120_000),
        skills: vec![
            CandidateSkill {
                name: "Python".to_string(),
                proficiency: SkillProficiency::Expert,
            },
            CandidateSkill {
                name: "SQL".to_string(),
                proficiency: SkillProficiency::Advanced,
            },
        ],
        work_preferences: vec!["remote".to_string(), "mentorship".to_string()],
        resume_url: None,
        portfolio_url: None,
    }
}

pub(super) fn job(id: &str, skills: &[&str]) -> Job {
    Job {
        id: JobId(id.to_string()),
        recruiter_id: "rec-1".to_string(),
        title: format!("Engineer {id}"),
        employment_type: EmploymentType::FullTime,
        experience_level: ExperienceLevel::Mid,
        salary_min: Some(100_000),
        salary_max: Some(130_000),
        description: "Build data pipelines.".to_string(),
        requirements: None,
        company_culture: Some("Remote-first team with strong mentorship".to_string()),
        skills_required: skills.iter().map(|skill| skill.to_string()).collect(),
        status: JobStatus::Published,
        posted_at: Some(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()),
    }
}

/// Job requiring Python, SQL, and Kubernetes.
pub(super) fn platform_job() -> Job {
    job("job-1", &["Python", "SQL", "Kubernetes"])
}

pub(super) fn candidate_actor() -> Actor {
    Actor::candidate(&candidate().id)
}

pub(super) fn recruiter_actor() -> Actor {
    Actor::recruiter("rec-1", [JobId("job-1".to_string()), JobId("job-2".to_string())])
}

pub(super) fn plan() -> InterviewPlan {
    InterviewPlan {
        interview_type: InterviewType::Technical,
        scheduled_date: Utc.with_ymd_and_hms(2025, 4, 2, 15, 0, 0).unwrap(),
        duration_minutes: 60,
        interviewers: vec!["rec-1".to_string()],
    }
}

pub(super) fn submitted_application() -> Application {
    Application::submitted(
        ApplicationId("app-test".to_string()),
        candidate().id,
        JobId("job-1".to_string()),
        None,
        Utc.with_ymd_and_hms(2025, 3, 2, 10, 0, 0).unwrap(),
    )
}

pub(super) fn round(application: &Application, number: u32) -> Interview {
    Interview::schedule(
        InterviewId(format!("int-test-{number}")),
        application.id.clone(),
        number,
        plan(),
    )
    .expect("valid round")
}

pub(super) fn questions(count: usize) -> Vec<InterviewQuestion> {
    (0..count)
        .map(|index| InterviewQuestion {
            text: format!("Question {index}"),
            question_type: Some("technical".to_string()),
            difficulty: None,
        })
        .collect()
}

pub(super) fn answers(pairs: &[(usize, &str)]) -> BTreeMap<usize, String> {
    pairs
        .iter()
        .map(|(index, text)| (*index, text.to_string()))
        .collect()
}

pub(super) fn evaluation_json(score: f64) -> Value {
    json!({
        "score": score,
        "completeness": score,
        "specificity": score - 1.0,
        "relevance": score,
        "communication": score,
        "strengths": ["clear structure"],
        "improvements": ["more metrics"],
    })
}

/// One scripted response for [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub(super) enum Scripted {
    Reply(AgentReply),
    Fail(AgentError),
    Delayed(Duration, Box<Scripted>),
    Hang,
}

impl Scripted {
    pub(super) fn success(result: Value) -> Self {
        Scripted::Reply(AgentReply::success(result))
    }

    pub(super) fn after(delay: Duration, inner: Scripted) -> Self {
        Scripted::Delayed(delay, Box::new(inner))
    }
}

/// Transport replaying queued responses per agent and recording every request.
#[derive(Default)]
pub(super) struct ScriptedTransport {
    scripts: Mutex<HashMap<AgentKind, VecDeque<Scripted>>>,
    requests: Mutex<Vec<AgentRequest>>,
}

impl ScriptedTransport {
    pub(super) fn with(agent: AgentKind, responses: Vec<Scripted>) -> Self {
        let transport = Self::default();
        transport.push(agent, responses);
        transport
    }

    pub(super) fn push(&self, agent: AgentKind, responses: Vec<Scripted>) {
        self.scripts
            .lock()
            .expect("script mutex poisoned")
            .entry(agent)
            .or_default()
            .extend(responses);
    }

    pub(super) fn requests(&self) -> Vec<AgentRequest> {
        self.requests.lock().expect("request mutex poisoned").clone()
    }
}

#[async_trait]
impl AgentTransport for ScriptedTransport {
    async fn dispatch(&self, request: AgentRequest) -> Result<AgentReply, AgentError> {
        let agent = request.agent_type;
        self.requests
            .lock()
            .expect("request mutex poisoned")
            .push(request);
        let next = self
            .scripts
            .lock()
            .expect("script mutex poisoned")
            .get_mut(&agent)
            .and_then(VecDeque::pop_front);

        let mut step = next.unwrap_or(Scripted::Fail(AgentError::Dispatch {
            agent,
            message: "no scripted response".to_string(),
        }));
        loop {
            match step {
                Scripted::Reply(reply) => return Ok(reply),
                Scripted::Fail(error) => return Err(error),
                Scripted::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    step = *inner;
                }
                Scripted::Hang => std::future::pending::<()>().await,
            }
        }
    }
}

pub(super) fn seeded_repository() -> Arc<InMemoryHiringRepository> {
    let repository = InMemoryHiringRepository::new();
    repository.save_candidate(candidate()).expect("seed candidate");
    repository.save_job(platform_job()).expect("seed job");
    repository
        .save_job(job("job-2", &["Python", "Airflow"]))
        .expect("seed job");
    let mut closed = job("job-3", &["Python"]);
    closed.status = JobStatus::Closed;
    repository.save_job(closed).expect("seed job");
    Arc::new(repository)
}

pub(super) fn fast_settings() -> HiringSettings {
    HiringSettings {
        agent_timeout: Duration::from_millis(100),
        ..HiringSettings::default()
    }
}

pub(super) type TestService = HiringService<InMemoryHiringRepository, ScriptedTransport>;

pub(super) fn build_service(
    transport: ScriptedTransport,
) -> (TestService, Arc<InMemoryHiringRepository>, Arc<ScriptedTransport>) {
    let repository = seeded_repository();
    let transport = Arc::new(transport);
    let service = HiringService::new(repository.clone(), transport.clone(), fast_settings());
    (service, repository, transport)
}

pub(super) struct UnavailableRepository;

impl HiringRepository for UnavailableRepository {
    fn fetch_candidate(&self, _id: &CandidateId) -> Result<Option<Candidate>, RepositoryError> {
        Err(offline())
    }

    fn fetch_job(&self, _id: &JobId) -> Result<Option<Job>, RepositoryError> {
        Err(offline())
    }

    fn listed_jobs(&self) -> Result<Vec<Job>, RepositoryError> {
        Err(offline())
    }

    fn insert_application(&self, _application: Application) -> Result<Application, RepositoryError> {
        Err(offline())
    }

    fn fetch_application(&self, _id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Err(offline())
    }

    fn find_application(
        &self,
        _candidate_id: &CandidateId,
        _job_id: &JobId,
    ) -> Result<Option<Application>, RepositoryError> {
        Err(offline())
    }

    fn set_matching_score(&self, _id: &ApplicationId, _score: f64) -> Result<(), RepositoryError> {
        Err(offline())
    }

    fn commit_status_change(
        &self,
        _application: Application,
        _expected: ApplicationStatus,
        _interview: Option<Interview>,
    ) -> Result<(), RepositoryError> {
        Err(offline())
    }

    fn insert_interview(
        &self,
        _interview: Interview,
        _required: ApplicationStatus,
    ) -> Result<Interview, RepositoryError> {
        Err(offline())
    }

    fn fetch_interview(&self, _id: &InterviewId) -> Result<Option<Interview>, RepositoryError> {
        Err(offline())
    }

    fn record_feedback(
        &self,
        _id: &InterviewId,
        _record: FeedbackRecord,
    ) -> Result<Interview, RepositoryError> {
        Err(offline())
    }

    fn store_answers_once(
        &self,
        _id: &InterviewId,
        _answers: CandidateAnswers,
    ) -> Result<Interview, RepositoryError> {
        Err(offline())
    }

    fn store_evaluation(
        &self,
        _id: &InterviewId,
        _report: InterviewEvaluation,
    ) -> Result<Interview, RepositoryError> {
        Err(offline())
    }

    fn interviews_for(&self, _application_id: &ApplicationId) -> Result<Vec<Interview>, RepositoryError> {
        Err(offline())
    }
}

fn offline() -> RepositoryError {
    RepositoryError::Unavailable("database offline".to_string())
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, found {actual}"
    );
}
