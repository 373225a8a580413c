//! Candidate applications, interview rounds, and AI-assisted matching.
//!
//! The lifecycle module owns status transitions, the evaluation and matching
//! modules are pure scorers, and the agent module is the only place that talks
//! to the external agents. `service` composes them behind a repository trait.

pub mod agent;
pub mod domain;
pub mod evaluation;
pub mod lifecycle;
pub mod matching;
pub mod repository;
pub mod router;
pub mod service;
mod wire;

#[cfg(test)]
mod tests;

pub use agent::{
    AgentError, AgentKind, AgentOrchestrator, AgentReply, AgentRequest, AgentTransport,
    CallTrace, ConciergeReply, DispatchOptions, FallbackPolicy, HttpAgentTransport, MatchOutcome,
    RequestPhase, SessionId, SessionRegistry,
};
pub use domain::{
    Actor, ActorRole, Application, ApplicationId, ApplicationStatus, Candidate, CandidateAnswers,
    CandidateId, CandidateSkill, EmploymentType, EvaluationSignal, ExperienceLevel, Interview,
    InterviewEvaluation, InterviewId, InterviewPlan, InterviewQuestion, InterviewResult,
    InterviewType, Job, JobId, JobStatus, RecruiterScores, ScoreSource, SkillProficiency,
    ValidationError,
};
pub use evaluation::{
    AnswerEvaluation, ApplicationRecommendation, EvaluationThresholds, InterviewAggregator,
};
pub use lifecycle::{Transition, TransitionError};
pub use matching::{
    AgentJobSignal, ExcludedJob, JobExclusion, MatchReport, MatchThresholds, MatchWeights,
    MatchingEngine, MatchingResult, RecommendationLevel,
};
pub use repository::{
    FeedbackRecord, HiringRepository, InMemoryHiringRepository, RepositoryError,
};
pub use router::hiring_router;
pub use service::{
    AnswerReviewRequest, AnswerSubmission, ApplyRequest, ConciergeRequest, ErrorKind,
    FeedbackSubmission, HiringService, HiringServiceError, HiringSettings, MatchJobsRequest,
    StatusChange, StatusChangeRequest,
};
