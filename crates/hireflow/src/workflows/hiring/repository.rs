use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, Candidate, CandidateAnswers, CandidateId,
    Interview, InterviewEvaluation, InterviewId, InterviewResult, Job, JobId, RecruiterScores,
    ValidationError,
};

/// Recruiter-owned fields of one interview round, written together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedbackRecord {
    pub scores: RecruiterScores,
    pub feedback: String,
    pub notes: String,
    pub result: InterviewResult,
}

/// Storage abstraction so the service can be exercised against any backend.
///
/// Writes touch only the fields they name and check the stored state they
/// depend on, so concurrent requests never overwrite each other's data.
/// `commit_status_change` applies the status and the optional interview insert
/// together or not at all, and only while the stored status is still `expected`.
pub trait HiringRepository: Send + Sync {
    fn fetch_candidate(&self, id: &CandidateId) -> Result<Option<Candidate>, RepositoryError>;
    fn fetch_job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError>;
    fn listed_jobs(&self) -> Result<Vec<Job>, RepositoryError>;

    fn insert_application(&self, application: Application) -> Result<Application, RepositoryError>;
    fn fetch_application(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError>;
    fn find_application(
        &self,
        candidate_id: &CandidateId,
        job_id: &JobId,
    ) -> Result<Option<Application>, RepositoryError>;
    fn set_matching_score(&self, id: &ApplicationId, score: f64) -> Result<(), RepositoryError>;
    fn commit_status_change(
        &self,
        application: Application,
        expected: ApplicationStatus,
        interview: Option<Interview>,
    ) -> Result<(), RepositoryError>;

    /// Add a round while the application is still in `required` status.
    fn insert_interview(
        &self,
        interview: Interview,
        required: ApplicationStatus,
    ) -> Result<Interview, RepositoryError>;
    fn fetch_interview(&self, id: &InterviewId) -> Result<Option<Interview>, RepositoryError>;
    fn record_feedback(
        &self,
        id: &InterviewId,
        record: FeedbackRecord,
    ) -> Result<Interview, RepositoryError>;
    /// Fails with `Conflict` when answers are already stored.
    fn store_answers_once(
        &self,
        id: &InterviewId,
        answers: CandidateAnswers,
    ) -> Result<Interview, RepositoryError>;
    fn store_evaluation(
        &self,
        id: &InterviewId,
        report: InterviewEvaluation,
    ) -> Result<Interview, RepositoryError>;
    /// Rounds for one application ordered by round number.
    fn interviews_for(&self, application_id: &ApplicationId) -> Result<Vec<Interview>, RepositoryError>;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists or changed concurrently")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Default)]
struct Store {
    candidates: BTreeMap<CandidateId, Candidate>,
    jobs: BTreeMap<JobId, Job>,
    applications: BTreeMap<ApplicationId, Application>,
    interviews: BTreeMap<InterviewId, Interview>,
}

impl Store {
    fn check_new_interview(&self, interview: &Interview) -> Result<(), RepositoryError> {
        if self.interviews.contains_key(&interview.id) {
            return Err(RepositoryError::Conflict);
        }
        let latest = self
            .interviews
            .values()
            .filter(|existing| existing.application_id == interview.application_id)
            .map(Interview::round_number)
            .max()
            .unwrap_or(0);
        if interview.round_number() <= latest {
            return Err(RepositoryError::Conflict);
        }
        Ok(())
    }

    fn status_of(&self, id: &ApplicationId) -> Result<ApplicationStatus, RepositoryError> {
        self.applications
            .get(id)
            .map(Application::status)
            .ok_or(RepositoryError::NotFound)
    }

    fn interview_mut(&mut self, id: &InterviewId) -> Result<&mut Interview, RepositoryError> {
        self.interviews.get_mut(id).ok_or(RepositoryError::NotFound)
    }
}

/// Process-local repository. Every operation runs under one lock, so each
/// check and the write that depends on it happen together.
#[derive(Debug, Default)]
pub struct InMemoryHiringRepository {
    store: Mutex<Store>,
}

impl InMemoryHiringRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_candidate(&self, candidate: Candidate) -> Result<(), RepositoryError> {
        self.store()?.candidates.insert(candidate.id.clone(), candidate);
        Ok(())
    }

    pub fn save_job(&self, job: Job) -> Result<(), RepositoryError> {
        self.store()?.jobs.insert(job.id.clone(), job);
        Ok(())
    }

    fn store(&self) -> Result<MutexGuard<'_, Store>, RepositoryError> {
        self.store
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository lock poisoned".to_string()))
    }
}

impl HiringRepository for InMemoryHiringRepository {
    fn fetch_candidate(&self, id: &CandidateId) -> Result<Option<Candidate>, RepositoryError> {
        Ok(self.store()?.candidates.get(id).cloned())
    }

    fn fetch_job(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        Ok(self.store()?.jobs.get(id).cloned())
    }

    fn listed_jobs(&self) -> Result<Vec<Job>, RepositoryError> {
        Ok(self
            .store()?
            .jobs
            .values()
            .filter(|job| job.status.is_listed())
            .cloned()
            .collect())
    }

    fn insert_application(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut store = self.store()?;
        let duplicate = store.applications.contains_key(&application.id)
            || store.applications.values().any(|existing| {
                existing.candidate_id == application.candidate_id
                    && existing.job_id == application.job_id
            });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        store
            .applications
            .insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn fetch_application(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Ok(self.store()?.applications.get(id).cloned())
    }

    fn find_application(
        &self,
        candidate_id: &CandidateId,
        job_id: &JobId,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(self
            .store()?
            .applications
            .values()
            .find(|application| {
                &application.candidate_id == candidate_id && &application.job_id == job_id
            })
            .cloned())
    }

    fn set_matching_score(&self, id: &ApplicationId, score: f64) -> Result<(), RepositoryError> {
        let mut store = self.store()?;
        let application = store
            .applications
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        application.set_matching_score(score)?;
        Ok(())
    }

    fn commit_status_change(
        &self,
        application: Application,
        expected: ApplicationStatus,
        interview: Option<Interview>,
    ) -> Result<(), RepositoryError> {
        let mut store = self.store()?;
        if store.status_of(&application.id)? != expected {
            return Err(RepositoryError::Conflict);
        }
        if let Some(interview) = &interview {
            store.check_new_interview(interview)?;
        }

        if let Some(interview) = interview {
            store.interviews.insert(interview.id.clone(), interview);
        }
        store
            .applications
            .insert(application.id.clone(), application);
        Ok(())
    }

    fn insert_interview(
        &self,
        interview: Interview,
        required: ApplicationStatus,
    ) -> Result<Interview, RepositoryError> {
        let mut store = self.store()?;
        if store.status_of(&interview.application_id)? != required {
            return Err(RepositoryError::Conflict);
        }
        store.check_new_interview(&interview)?;
        store
            .interviews
            .insert(interview.id.clone(), interview.clone());
        Ok(interview)
    }

    fn fetch_interview(&self, id: &InterviewId) -> Result<Option<Interview>, RepositoryError> {
        Ok(self.store()?.interviews.get(id).cloned())
    }

    fn record_feedback(
        &self,
        id: &InterviewId,
        record: FeedbackRecord,
    ) -> Result<Interview, RepositoryError> {
        let mut store = self.store()?;
        let interview = store.interview_mut(id)?;
        interview.scores = record.scores;
        interview.feedback = record.feedback;
        interview.notes = record.notes;
        interview.result = record.result;
        Ok(interview.clone())
    }

    fn store_answers_once(
        &self,
        id: &InterviewId,
        answers: CandidateAnswers,
    ) -> Result<Interview, RepositoryError> {
        let mut store = self.store()?;
        let interview = store.interview_mut(id)?;
        if interview.candidate_answers.is_some() {
            return Err(RepositoryError::Conflict);
        }
        interview.candidate_answers = Some(answers);
        Ok(interview.clone())
    }

    fn store_evaluation(
        &self,
        id: &InterviewId,
        report: InterviewEvaluation,
    ) -> Result<Interview, RepositoryError> {
        let mut store = self.store()?;
        let interview = store.interview_mut(id)?;
        interview.evaluation_report = Some(report);
        Ok(interview.clone())
    }

    fn interviews_for(&self, application_id: &ApplicationId) -> Result<Vec<Interview>, RepositoryError> {
        let mut rounds: Vec<Interview> = self
            .store()?
            .interviews
            .values()
            .filter(|interview| &interview.application_id == application_id)
            .cloned()
            .collect();
        rounds.sort_by_key(Interview::round_number);
        Ok(rounds)
    }
}
