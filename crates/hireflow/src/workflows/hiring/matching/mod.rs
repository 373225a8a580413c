//! Weighted candidate–job fit scoring.
//!
//! Skill overlap is always computed locally. Experience, salary, and culture
//! start from local heuristics and may be replaced by agent-supplied values,
//! after which the overall score is recomputed with the configured weights.

mod config;
mod rules;

pub use config::{MatchThresholds, MatchWeights};

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Candidate, CandidateId, Job, JobId, JobStatus};
use rules::{culture_score, experience_score, partition_skills, round_score, salary_score};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationLevel {
    HighlyRecommended,
    Recommended,
    Consider,
    NotRecommended,
}

impl RecommendationLevel {
    pub const fn label(self) -> &'static str {
        match self {
            RecommendationLevel::HighlyRecommended => "highly recommended",
            RecommendationLevel::Recommended => "recommended",
            RecommendationLevel::Consider => "consider",
            RecommendationLevel::NotRecommended => "not recommended",
        }
    }
}

/// Per-job values returned by the job matcher agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentJobSignal {
    #[serde(deserialize_with = "crate::workflows::hiring::wire::flexible_job_id")]
    pub job_id: JobId,
    #[serde(
        default,
        alias = "experience_match",
        deserialize_with = "crate::workflows::hiring::wire::lenient_number"
    )]
    pub experience_match_score: Option<f64>,
    #[serde(
        default,
        alias = "salary_match",
        alias = "education_match_score",
        alias = "education_match",
        deserialize_with = "crate::workflows::hiring::wire::lenient_number"
    )]
    pub salary_match_score: Option<f64>,
    #[serde(
        default,
        alias = "culture_fit",
        alias = "culture_match",
        deserialize_with = "crate::workflows::hiring::wire::lenient_number"
    )]
    pub culture_fit_score: Option<f64>,
    #[serde(default, alias = "match_reason", alias = "ai_summary")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "crate::workflows::hiring::wire::lenient_strings")]
    pub concerns: Vec<String>,
}

/// Fit of one candidate against one job. Ephemeral and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingResult {
    pub job_id: JobId,
    pub job_title: String,
    pub candidate_id: CandidateId,
    pub overall_score: f64,
    pub skill_match_score: f64,
    pub experience_match_score: f64,
    #[serde(alias = "education_match_score")]
    pub salary_match_score: f64,
    pub culture_fit_score: f64,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub additional_skills: Vec<String>,
    pub ai_summary: String,
    pub concerns: Vec<String>,
    pub recommendation_level: RecommendationLevel,
    pub weights: MatchWeights,
    pub is_mock: bool,
    #[serde(default)]
    pub posted_at: Option<DateTime<Utc>>,
}

/// Why a job was left out of a ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum JobExclusion {
    #[error("job lists no required skills")]
    NoRequiredSkills,
    #[error("salary range is inverted ({min} > {max})")]
    InvertedSalaryRange { min: u32, max: u32 },
    #[error("job is {} and not open for matching", .status.label())]
    NotListed { status: JobStatus },
    #[error("job appears more than once in the request")]
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedJob {
    pub job_id: JobId,
    #[serde(flatten)]
    pub reason: JobExclusion,
    pub detail: String,
}

/// Ranked results plus diagnostics for every job that could not be scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub results: Vec<MatchingResult>,
    pub excluded: Vec<ExcludedJob>,
    pub weights: MatchWeights,
}

impl MatchReport {
    pub fn best(&self) -> Option<&MatchingResult> {
        self.results.first()
    }

    pub(crate) fn mark_mock(mut self) -> Self {
        for result in &mut self.results {
            result.is_mock = true;
        }
        self
    }
}

/// Deterministic scorer: identical inputs always produce identical rankings.
#[derive(Debug, Clone, Default)]
pub struct MatchingEngine {
    weights: MatchWeights,
    thresholds: MatchThresholds,
}

impl MatchingEngine {
    pub fn new(weights: MatchWeights, thresholds: MatchThresholds) -> Self {
        Self {
            weights,
            thresholds,
        }
    }

    pub fn weights(&self) -> &MatchWeights {
        &self.weights
    }

    pub fn thresholds(&self) -> &MatchThresholds {
        &self.thresholds
    }

    /// Score and order every eligible job.
    pub fn rank(
        &self,
        candidate: &Candidate,
        jobs: &[Job],
        signals: &BTreeMap<JobId, AgentJobSignal>,
    ) -> MatchReport {
        let mut seen = BTreeSet::new();
        let mut results = Vec::new();
        let mut excluded = Vec::new();

        for job in jobs {
            let outcome = if seen.insert(job.id.clone()) {
                self.score(candidate, job, signals.get(&job.id))
            } else {
                Err(JobExclusion::Duplicate)
            };

            match outcome {
                Ok(result) => results.push(result),
                Err(reason) => excluded.push(ExcludedJob {
                    job_id: job.id.clone(),
                    detail: reason.to_string(),
                    reason,
                }),
            }
        }

        results.sort_by(ranking_order);

        MatchReport {
            results,
            excluded,
            weights: self.weights,
        }
    }

    /// Score one job, or explain why it cannot be scored.
    pub fn score(
        &self,
        candidate: &Candidate,
        job: &Job,
        signal: Option<&AgentJobSignal>,
    ) -> Result<MatchingResult, JobExclusion> {
        check_eligible(job)?;

        let skills = partition_skills(candidate, job);
        let skill = skills.score();
        let experience = override_or(
            signal.and_then(|signal| signal.experience_match_score),
            experience_score(candidate.experience_years, job.experience_level),
        );
        let salary = override_or(
            signal.and_then(|signal| signal.salary_match_score),
            salary_score(candidate.expected_salary, job),
        );
        let culture = override_or(
            signal.and_then(|signal| signal.culture_fit_score),
            culture_score(candidate, job),
        );

        let overall = round_score(self.weights.combine(skill, experience, salary, culture));

        let ai_summary = signal
            .and_then(|signal| signal.summary.clone())
            .filter(|summary| !summary.trim().is_empty())
            .unwrap_or_else(|| local_summary(job, skills.matched.len(), skills.missing.len()));
        let concerns = match signal {
            Some(signal) if !signal.concerns.is_empty() => signal.concerns.clone(),
            _ => local_concerns(candidate, job, &skills.missing),
        };

        Ok(MatchingResult {
            job_id: job.id.clone(),
            job_title: job.title.clone(),
            candidate_id: candidate.id.clone(),
            overall_score: overall,
            skill_match_score: round_score(skill),
            experience_match_score: round_score(experience),
            salary_match_score: round_score(salary),
            culture_fit_score: round_score(culture),
            matched_skills: skills.matched,
            missing_skills: skills.missing,
            additional_skills: skills.additional,
            ai_summary,
            concerns,
            recommendation_level: self.thresholds.classify(overall),
            weights: self.weights,
            is_mock: false,
            posted_at: job.posted_at,
        })
    }
}

fn check_eligible(job: &Job) -> Result<(), JobExclusion> {
    if !job.status.is_listed() {
        return Err(JobExclusion::NotListed { status: job.status });
    }
    if let (Some(min), Some(max)) = (job.salary_min, job.salary_max) {
        if min > max {
            return Err(JobExclusion::InvertedSalaryRange { min, max });
        }
    }
    if job.required_skills().next().is_none() {
        return Err(JobExclusion::NoRequiredSkills);
    }
    Ok(())
}

/// Agent values replace local ones when finite; they are clamped into range.
fn override_or(agent: Option<f64>, local: f64) -> f64 {
    agent
        .filter(|value| value.is_finite())
        .map_or(local, |value| value.clamp(0.0, 100.0))
}

fn ranking_order(left: &MatchingResult, right: &MatchingResult) -> Ordering {
    right
        .overall_score
        .total_cmp(&left.overall_score)
        .then_with(|| match (left.posted_at, right.posted_at) {
            (Some(left), Some(right)) => right.cmp(&left),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| left.job_id.cmp(&right.job_id))
}

fn local_summary(job: &Job, matched: usize, missing: usize) -> String {
    format!(
        "Matches {matched} of {} required skills for {}",
        matched + missing,
        job.title
    )
}

fn local_concerns(candidate: &Candidate, job: &Job, missing: &[String]) -> Vec<String> {
    let mut concerns = Vec::new();
    if !missing.is_empty() {
        concerns.push(format!("Missing skills: {}", missing.join(", ")));
    }
    let (floor, _) = job.experience_level.year_band();
    if candidate.experience_years < floor {
        concerns.push(format!(
            "{} years of experience is below the {floor} expected",
            candidate.experience_years
        ));
    }
    if let (Some(expected), Some(max)) = (candidate.expected_salary, job.salary_max) {
        if expected > max {
            concerns.push(format!("Expected salary {expected} exceeds the posted maximum {max}"));
        }
    }
    concerns
}
