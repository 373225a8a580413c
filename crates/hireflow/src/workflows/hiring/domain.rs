use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for candidate profiles.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub String);

/// Identifier wrapper for job postings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

/// Identifier wrapper for submitted applications.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for interview rounds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InterviewId(pub String);

macro_rules! display_id {
    ($($name:ident),+) => {
        $(
            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }
        )+
    };
}

display_id!(CandidateId, JobId, ApplicationId, InterviewId);

/// Field-level validation failures raised by domain constructors and policy objects.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },
    #[error("{field} must be within {min}..={max} (found {found})")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        found: f64,
    },
    #[error("salary range is inverted (min {min} > max {max})")]
    InvertedSalaryRange { min: u32, max: u32 },
    #[error("interview rounds start at 1 (found {0})")]
    InvalidRound(u32),
    #[error("answer references unknown question index {0}")]
    UnknownQuestion(usize),
    #[error("answers were already submitted at {0}")]
    AnswersAlreadySubmitted(DateTime<Utc>),
    #[error("interview has no submitted answers")]
    NoAnswersSubmitted,
    #[error("a non-pending result requires a non-zero overall score")]
    MissingOverallScore,
    #[error("application must be in interview stage (currently {0})")]
    InterviewStageRequired(ApplicationStatus),
    #[error("thresholds must be strictly descending within {min}..={max}")]
    InvalidThresholds { min: f64, max: f64 },
    #[error("weights must be finite, non-negative, and sum above zero")]
    InvalidWeights,
    #[error("unknown {kind} '{value}'")]
    UnknownLabel { kind: &'static str, value: String },
}

fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::EmptyField { field })
    } else {
        Ok(())
    }
}

/// Check a 0–10 score entered by a recruiter.
pub fn check_ten_point(field: &'static str, value: Option<u8>) -> Result<(), ValidationError> {
    match value {
        Some(found) if found > 10 => Err(ValidationError::OutOfRange {
            field,
            min: 0.0,
            max: 10.0,
            found: found as f64,
        }),
        _ => Ok(()),
    }
}

/// Check a 0–100 composite score.
pub fn check_percentage(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            min: 0.0,
            max: 100.0,
            found: value,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillProficiency {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSkill {
    pub name: String,
    pub proficiency: SkillProficiency,
}

/// Candidate profile as seen by matching and application intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub current_role: Option<String>,
    #[serde(default)]
    pub experience_years: u32,
    #[serde(default)]
    pub expected_salary: Option<u32>,
    #[serde(default)]
    pub skills: Vec<CandidateSkill>,
    /// Culture keywords the candidate cares about ("remote", "mentorship", ...).
    #[serde(default)]
    pub work_preferences: Vec<String>,
    #[serde(default)]
    pub resume_url: Option<String>,
    #[serde(default)]
    pub portfolio_url: Option<String>,
}

impl Candidate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("candidate.id", &self.id.0)?;
        require_text("candidate.display_name", &self.display_name)?;
        for skill in &self.skills {
            require_text("candidate.skills.name", &skill.name)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
    Intern,
    Temporary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Entry,
    Junior,
    Mid,
    Senior,
    Lead,
}

impl ExperienceLevel {
    /// Expected years of experience for the level; `None` means open-ended.
    pub const fn year_band(self) -> (u32, Option<u32>) {
        match self {
            ExperienceLevel::Entry => (0, Some(1)),
            ExperienceLevel::Junior => (1, Some(3)),
            ExperienceLevel::Mid => (3, Some(5)),
            ExperienceLevel::Senior => (5, Some(8)),
            ExperienceLevel::Lead => (8, None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Draft,
    #[serde(alias = "active")]
    Published,
    Paused,
    Closed,
    Filled,
}

impl JobStatus {
    pub const fn label(self) -> &'static str {
        match self {
            JobStatus::Draft => "draft",
            JobStatus::Published => "published",
            JobStatus::Paused => "paused",
            JobStatus::Closed => "closed",
            JobStatus::Filled => "filled",
        }
    }

    pub const fn accepts_applications(self) -> bool {
        matches!(self, JobStatus::Published)
    }

    /// Whether the posting is still visible for matching.
    pub const fn is_listed(self) -> bool {
        matches!(self, JobStatus::Published | JobStatus::Paused)
    }
}

/// Job posting owned by a recruiter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub recruiter_id: String,
    pub title: String,
    pub employment_type: EmploymentType,
    pub experience_level: ExperienceLevel,
    #[serde(default)]
    pub salary_min: Option<u32>,
    #[serde(default)]
    pub salary_max: Option<u32>,
    pub description: String,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub company_culture: Option<String>,
    #[serde(default)]
    pub skills_required: Vec<String>,
    pub status: JobStatus,
    #[serde(default)]
    pub posted_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("job.id", &self.id.0)?;
        require_text("job.title", &self.title)?;
        require_text("job.description", &self.description)?;
        if let (Some(min), Some(max)) = (self.salary_min, self.salary_max) {
            if min > max {
                return Err(ValidationError::InvertedSalaryRange { min, max });
            }
        }
        Ok(())
    }

    /// Required skills with blanks removed.
    pub fn required_skills(&self) -> impl Iterator<Item = &str> {
        self.skills_required
            .iter()
            .map(|skill| skill.trim())
            .filter(|skill| !skill.is_empty())
    }
}

/// Lifecycle status of an application. Transitions are governed by `lifecycle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    Screening,
    Interview,
    Offer,
    Accepted,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 8] = [
        ApplicationStatus::Draft,
        ApplicationStatus::Submitted,
        ApplicationStatus::Screening,
        ApplicationStatus::Interview,
        ApplicationStatus::Offer,
        ApplicationStatus::Accepted,
        ApplicationStatus::Rejected,
        ApplicationStatus::Withdrawn,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "draft",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Screening => "screening",
            ApplicationStatus::Interview => "interview",
            ApplicationStatus::Offer => "offer",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Accepted | ApplicationStatus::Rejected | ApplicationStatus::Withdrawn
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ApplicationStatus {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.label() == normalized)
            .ok_or_else(|| ValidationError::UnknownLabel {
                kind: "application status",
                value: value.to_string(),
            })
    }
}

/// Binding between one candidate and one job.
///
/// `status` and `applied_at` are only reachable through the constructors and the
/// lifecycle module, so an application can never be built in an illegal status.
/// Decoding goes through the same checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawApplication")]
pub struct Application {
    pub id: ApplicationId,
    pub candidate_id: CandidateId,
    pub job_id: JobId,
    status: ApplicationStatus,
    #[serde(default)]
    matching_score: Option<f64>,
    #[serde(default)]
    pub cover_letter: Option<String>,
    #[serde(default)]
    pub recruiter_notes: Option<String>,
    applied_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawApplication {
    id: ApplicationId,
    candidate_id: CandidateId,
    job_id: JobId,
    status: ApplicationStatus,
    #[serde(default)]
    matching_score: Option<f64>,
    #[serde(default)]
    cover_letter: Option<String>,
    #[serde(default)]
    recruiter_notes: Option<String>,
    applied_at: DateTime<Utc>,
}

impl TryFrom<RawApplication> for Application {
    type Error = ValidationError;

    fn try_from(raw: RawApplication) -> Result<Self, Self::Error> {
        require_text("application.id", &raw.id.0)?;
        require_text("application.candidate_id", &raw.candidate_id.0)?;
        require_text("application.job_id", &raw.job_id.0)?;
        let mut application = Application::draft(raw.id, raw.candidate_id, raw.job_id, raw.applied_at)
            .with_status(raw.status);
        if let Some(score) = raw.matching_score {
            application.set_matching_score(score)?;
        }
        application.cover_letter = raw.cover_letter;
        application.recruiter_notes = raw.recruiter_notes;
        Ok(application)
    }
}

impl Application {
    pub fn draft(
        id: ApplicationId,
        candidate_id: CandidateId,
        job_id: JobId,
        applied_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            candidate_id,
            job_id,
            status: ApplicationStatus::Draft,
            matching_score: None,
            cover_letter: None,
            recruiter_notes: None,
            applied_at,
        }
    }

    pub fn submitted(
        id: ApplicationId,
        candidate_id: CandidateId,
        job_id: JobId,
        cover_letter: Option<String>,
        applied_at: DateTime<Utc>,
    ) -> Self {
        Self {
            status: ApplicationStatus::Submitted,
            cover_letter,
            ..Self::draft(id, candidate_id, job_id, applied_at)
        }
    }

    pub fn status(&self) -> ApplicationStatus {
        self.status
    }

    pub fn applied_at(&self) -> DateTime<Utc> {
        self.applied_at
    }

    pub fn matching_score(&self) -> Option<f64> {
        self.matching_score
    }

    pub fn set_matching_score(&mut self, score: f64) -> Result<(), ValidationError> {
        check_percentage("application.matching_score", score)?;
        self.matching_score = Some(score);
        Ok(())
    }

    pub(crate) fn with_status(&self, status: ApplicationStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewResult {
    #[default]
    Pending,
    Passed,
    Failed,
    OnHold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewType {
    Phone,
    Video,
    Onsite,
    Technical,
    Hr,
    Final,
}

/// Recruiter-entered scores, each on a 0–10 scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecruiterScores {
    #[serde(default)]
    pub technical: Option<u8>,
    #[serde(default)]
    pub communication: Option<u8>,
    #[serde(default)]
    pub cultural_fit: Option<u8>,
    #[serde(default)]
    pub overall: Option<u8>,
}

impl RecruiterScores {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_ten_point("scores.technical", self.technical)?;
        check_ten_point("scores.communication", self.communication)?;
        check_ten_point("scores.cultural_fit", self.cultural_fit)?;
        check_ten_point("scores.overall", self.overall)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewQuestion {
    pub text: String,
    #[serde(default)]
    pub question_type: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

/// Answers a candidate submitted for an interview. Frozen once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAnswers")]
pub struct CandidateAnswers {
    questions: Vec<InterviewQuestion>,
    answers: BTreeMap<usize, String>,
    submitted_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawAnswers {
    questions: Vec<InterviewQuestion>,
    #[serde(default)]
    answers: BTreeMap<usize, String>,
    submitted_at: DateTime<Utc>,
}

impl TryFrom<RawAnswers> for CandidateAnswers {
    type Error = ValidationError;

    fn try_from(raw: RawAnswers) -> Result<Self, Self::Error> {
        Self::new(raw.questions, raw.answers, raw.submitted_at)
    }
}

impl CandidateAnswers {
    pub fn new(
        questions: Vec<InterviewQuestion>,
        answers: BTreeMap<usize, String>,
        submitted_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if questions.is_empty() {
            return Err(ValidationError::EmptyField {
                field: "candidate_answers.questions",
            });
        }
        for question in &questions {
            require_text("candidate_answers.questions.text", &question.text)?;
        }
        if let Some(index) = answers.keys().find(|index| **index >= questions.len()) {
            return Err(ValidationError::UnknownQuestion(*index));
        }

        Ok(Self {
            questions,
            answers,
            submitted_at,
        })
    }

    pub fn questions(&self) -> &[InterviewQuestion] {
        &self.questions
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn answer(&self, index: usize) -> Option<&str> {
        self.answers
            .get(&index)
            .map(|answer| answer.trim())
            .filter(|answer| !answer.is_empty())
    }

    /// Questions with a non-blank answer, in question order.
    pub fn answered(&self) -> impl Iterator<Item = (usize, &InterviewQuestion, &str)> {
        self.questions
            .iter()
            .enumerate()
            .filter_map(|(index, question)| {
                self.answer(index).map(|answer| (index, question, answer))
            })
    }
}

/// Scheduling details supplied when a round is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewPlan {
    pub interview_type: InterviewType,
    pub scheduled_date: DateTime<Utc>,
    pub duration_minutes: u32,
    #[serde(default)]
    pub interviewers: Vec<String>,
}

/// One interview round attached to an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawInterview")]
pub struct Interview {
    pub id: InterviewId,
    pub application_id: ApplicationId,
    round_number: u32,
    pub interview_type: InterviewType,
    pub scheduled_date: DateTime<Utc>,
    pub duration_minutes: u32,
    pub interviewers: Vec<String>,
    pub result: InterviewResult,
    pub scores: RecruiterScores,
    pub feedback: String,
    pub notes: String,
    pub evaluation_report: Option<InterviewEvaluation>,
    pub candidate_answers: Option<CandidateAnswers>,
}

#[derive(Deserialize)]
struct RawInterview {
    id: InterviewId,
    application_id: ApplicationId,
    round_number: u32,
    interview_type: InterviewType,
    scheduled_date: DateTime<Utc>,
    duration_minutes: u32,
    #[serde(default)]
    interviewers: Vec<String>,
    #[serde(default)]
    result: InterviewResult,
    #[serde(default)]
    scores: RecruiterScores,
    #[serde(default)]
    feedback: String,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    evaluation_report: Option<InterviewEvaluation>,
    #[serde(default)]
    candidate_answers: Option<CandidateAnswers>,
}

impl TryFrom<RawInterview> for Interview {
    type Error = ValidationError;

    fn try_from(raw: RawInterview) -> Result<Self, Self::Error> {
        raw.scores.validate()?;
        let plan = InterviewPlan {
            interview_type: raw.interview_type,
            scheduled_date: raw.scheduled_date,
            duration_minutes: raw.duration_minutes,
            interviewers: raw.interviewers,
        };
        let mut interview = Interview::schedule(raw.id, raw.application_id, raw.round_number, plan)?;
        interview.result = raw.result;
        interview.scores = raw.scores;
        interview.feedback = raw.feedback;
        interview.notes = raw.notes;
        interview.evaluation_report = raw.evaluation_report;
        interview.candidate_answers = raw.candidate_answers;
        Ok(interview)
    }
}

impl Interview {
    pub fn schedule(
        id: InterviewId,
        application_id: ApplicationId,
        round_number: u32,
        plan: InterviewPlan,
    ) -> Result<Self, ValidationError> {
        if round_number == 0 {
            return Err(ValidationError::InvalidRound(round_number));
        }
        if plan.duration_minutes == 0 {
            return Err(ValidationError::OutOfRange {
                field: "interview.duration_minutes",
                min: 1.0,
                max: u32::MAX as f64,
                found: 0.0,
            });
        }
        for interviewer in &plan.interviewers {
            require_text("interview.interviewers", interviewer)?;
        }

        Ok(Self {
            id,
            application_id,
            round_number,
            interview_type: plan.interview_type,
            scheduled_date: plan.scheduled_date,
            duration_minutes: plan.duration_minutes,
            interviewers: plan.interviewers,
            result: InterviewResult::Pending,
            scores: RecruiterScores::default(),
            feedback: String::new(),
            notes: String::new(),
            evaluation_report: None,
            candidate_answers: None,
        })
    }

    pub fn round_number(&self) -> u32 {
        self.round_number
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationSignal {
    StrongPass,
    Pass,
    Borderline,
    Fail,
}

/// Where an aggregated score came from. AI-derived values are advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    Recruiter,
    AiAdvisory,
    Mixed,
}

/// Per-dimension means across answered questions; `None` when nothing contributed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionMeans {
    pub score: Option<f64>,
    pub completeness: Option<f64>,
    pub specificity: Option<f64>,
    pub relevance: Option<f64>,
    pub communication: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    NotEvaluated,
    Missing,
    NonFinite,
    Clamped,
}

/// Non-fatal note that a value was excluded from (or clamped before) an aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialAggregationWarning {
    pub question_index: usize,
    pub dimension: String,
    pub reason: ExclusionReason,
}

/// Interview-level summary of AI answer evaluations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewEvaluation {
    pub total_questions: usize,
    pub answered_questions: usize,
    pub evaluated_questions: usize,
    pub means: DimensionMeans,
    pub ai_overall_score: Option<f64>,
    pub signal: Option<EvaluationSignal>,
    pub score_source: ScoreSource,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub partial: bool,
    pub warnings: Vec<PartialAggregationWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Candidate,
    Recruiter,
}

impl ActorRole {
    pub const fn label(self) -> &'static str {
        match self {
            ActorRole::Candidate => "candidate",
            ActorRole::Recruiter => "recruiter",
        }
    }
}

impl FromStr for ActorRole {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "candidate" => Ok(ActorRole::Candidate),
            "recruiter" => Ok(ActorRole::Recruiter),
            _ => Err(ValidationError::UnknownLabel {
                kind: "actor role",
                value: value.to_string(),
            }),
        }
    }
}

/// Capability value passed into every lifecycle, service, and matching call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub role: ActorRole,
    pub subject_id: String,
    #[serde(default)]
    pub owned_entity_ids: BTreeSet<String>,
}

impl Actor {
    pub fn candidate(id: &CandidateId) -> Self {
        Self {
            role: ActorRole::Candidate,
            subject_id: id.0.clone(),
            owned_entity_ids: BTreeSet::from([id.0.clone()]),
        }
    }

    pub fn recruiter<I>(subject_id: impl Into<String>, jobs: I) -> Self
    where
        I: IntoIterator<Item = JobId>,
    {
        Self {
            role: ActorRole::Recruiter,
            subject_id: subject_id.into(),
            owned_entity_ids: jobs.into_iter().map(|job| job.0).collect(),
        }
    }

    pub fn owns(&self, entity_id: &str) -> bool {
        self.owned_entity_ids.contains(entity_id)
    }

    pub fn is(&self, role: ActorRole) -> bool {
        self.role == role
    }
}
