use chrono::{TimeZone, Utc};
use hireflow::config::AgentConfig;
use hireflow::error::AppError;
use hireflow::workflows::hiring::{
    Candidate, CandidateId, CandidateSkill, EmploymentType, ExperienceLevel, HttpAgentTransport,
    InMemoryHiringRepository, Job, JobId, JobStatus, SkillProficiency,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Candidates and jobs loaded into the in-memory repository at startup.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SeedCatalog {
    #[serde(default)]
    pub(crate) candidates: Vec<Candidate>,
    #[serde(default)]
    pub(crate) jobs: Vec<Job>,
}

impl SeedCatalog {
    pub(crate) fn load(path: Option<&Path>) -> Result<Self, AppError> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                Ok(serde_json::from_str(&raw)?)
            }
            None => Ok(sample_catalog()),
        }
    }

    pub(crate) fn into_repository(self) -> Result<InMemoryHiringRepository, AppError> {
        let repository = InMemoryHiringRepository::new();
        for candidate in self.candidates {
            repository.save_candidate(candidate).map_err(into_app_error)?;
        }
        for job in self.jobs {
            repository.save_job(job).map_err(into_app_error)?;
        }
        Ok(repository)
    }
}

fn into_app_error(error: hireflow::workflows::hiring::RepositoryError) -> AppError {
    AppError::Hiring(error.into())
}

pub(crate) fn agent_transport(config: &AgentConfig) -> Result<HttpAgentTransport, AppError> {
    Ok(HttpAgentTransport::connect(config.base_url.clone(), config.timeout)?)
}

pub(crate) const DEMO_RECRUITER: &str = "rec-demo";

fn skill(name: &str, proficiency: SkillProficiency) -> CandidateSkill {
    CandidateSkill {
        name: name.to_string(),
        proficiency,
    }
}

fn posting(
    id: &str,
    title: &str,
    level: ExperienceLevel,
    salary: (u32, u32),
    culture: &str,
    skills: &[&str],
    day: u32,
) -> Job {
    Job {
        id: JobId(id.to_string()),
        recruiter_id: DEMO_RECRUITER.to_string(),
        title: title.to_string(),
        employment_type: EmploymentType::FullTime,
        experience_level: level,
        salary_min: Some(salary.0),
        salary_max: Some(salary.1),
        description: format!("{title} on the platform team."),
        requirements: None,
        company_culture: Some(culture.to_string()),
        skills_required: skills.iter().map(|skill| skill.to_string()).collect(),
        status: JobStatus::Published,
        posted_at: Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0).single(),
    }
}

pub(crate) fn sample_catalog() -> SeedCatalog {
    let candidates = vec![
        Candidate {
            id: CandidateId("cand-demo".to_string()),
            user_id: "user-demo".to_string(),
            display_name: "Jordan Lee".to_string(),
            current_role: Some("Data Engineer".to_string()),
            experience_years: 4,
            expected_salary: Some(125_000),
            skills: vec![
                skill("Python", SkillProficiency::Expert),
                skill("SQL", SkillProficiency::Advanced),
                skill("Airflow", SkillProficiency::Intermediate),
            ],
            work_preferences: vec!["remote".to_string(), "mentorship".to_string()],
            resume_url: None,
            portfolio_url: None,
        },
        Candidate {
            id: CandidateId("cand-frontend".to_string()),
            user_id: "user-frontend".to_string(),
            display_name: "Riley Chen".to_string(),
            current_role: Some("Frontend Developer".to_string()),
            experience_years: 2,
            expected_salary: Some(95_000),
            skills: vec![
                skill("TypeScript", SkillProficiency::Advanced),
                skill("React", SkillProficiency::Advanced),
            ],
            work_preferences: vec!["hybrid".to_string()],
            resume_url: None,
            portfolio_url: None,
        },
    ];

    let jobs = vec![
        posting(
            "job-data",
            "Data Platform Engineer",
            ExperienceLevel::Mid,
            (110_000, 140_000),
            "Remote-first team with strong mentorship",
            &["Python", "SQL", "Kubernetes"],
            3,
        ),
        posting(
            "job-analytics",
            "Analytics Engineer",
            ExperienceLevel::Junior,
            (90_000, 115_000),
            "Hybrid office with weekly demos",
            &["SQL", "dbt"],
            5,
        ),
        posting(
            "job-web",
            "Frontend Engineer",
            ExperienceLevel::Junior,
            (85_000, 105_000),
            "Hybrid team shipping weekly",
            &["TypeScript", "React"],
            7,
        ),
        posting(
            "job-lead",
            "Staff Data Engineer",
            ExperienceLevel::Lead,
            (170_000, 210_000),
            "Remote leadership role",
            &["Python", "Spark", "Kubernetes"],
            1,
        ),
    ];

    SeedCatalog { candidates, jobs }
}

pub(crate) fn demo_job_ids() -> Vec<JobId> {
    sample_catalog().jobs.into_iter().map(|job| job.id).collect()
}
