use crate::infra::{agent_transport, demo_job_ids, sample_catalog, DEMO_RECRUITER};
use chrono::{Duration as ChronoDuration, Utc};
use clap::Args;
use hireflow::config::AppConfig;
use hireflow::error::AppError;
use hireflow::workflows::hiring::{
    Actor, AnswerSubmission, ApplicationStatus, ApplyRequest, Candidate, CandidateId,
    FeedbackSubmission, HiringService, InterviewPlan, InterviewQuestion, InterviewResult,
    InterviewType, Job, MatchJobsRequest, MatchReport, MatchWeights, MatchingEngine,
    RecruiterScores, StatusChangeRequest,
};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug)]
pub(crate) struct MatchArgs {
    /// Candidate profile (JSON)
    #[arg(long)]
    pub(crate) candidate: PathBuf,
    /// Job postings (JSON array)
    #[arg(long)]
    pub(crate) jobs: PathBuf,
    /// Comma-separated skill,experience,salary,culture weights
    #[arg(long, value_parser = hireflow::config::parse_weights)]
    pub(crate) weights: Option<MatchWeights>,
    /// Print the full report as JSON instead of a summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Agent service base URL (defaults to AGENT_BASE_URL)
    #[arg(long)]
    pub(crate) agent_url: Option<String>,
    /// Per-call agent timeout in milliseconds (defaults to AGENT_TIMEOUT_MS)
    #[arg(long)]
    pub(crate) agent_timeout_ms: Option<u64>,
}

pub(crate) fn run_match_report(args: MatchArgs) -> Result<(), AppError> {
    let MatchArgs {
        candidate,
        jobs,
        weights,
        json,
    } = args;

    let config = AppConfig::load()?;
    let candidate: Candidate = read_json(&candidate)?;
    let jobs: Vec<Job> = read_json(&jobs)?;

    let engine = MatchingEngine::new(
        weights.unwrap_or(config.scoring.weights),
        config.scoring.match_thresholds,
    );
    let report = engine.rank(&candidate, &jobs, &BTreeMap::new());

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render_match_report(&candidate, &report);
    }
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn render_match_report(candidate: &Candidate, report: &MatchReport) {
    let weights = &report.weights;
    println!("Job matches for {} ({})", candidate.display_name, candidate.id);
    println!(
        "Weights: skill {:.2}, experience {:.2}, salary {:.2}, culture {:.2}",
        weights.skill(),
        weights.experience(),
        weights.salary(),
        weights.culture()
    );

    if report.results.is_empty() {
        println!("  No eligible jobs.");
    }
    for (rank, result) in report.results.iter().enumerate() {
        let mock = if result.is_mock { " (mock)" } else { "" };
        println!(
            "{:>2}. {} [{}] overall {:.1} - {}{}",
            rank + 1,
            result.job_title,
            result.job_id,
            result.overall_score,
            result.recommendation_level.label(),
            mock
        );
        println!(
            "    skill {:.1} | experience {:.1} | salary {:.1} | culture {:.1}",
            result.skill_match_score,
            result.experience_match_score,
            result.salary_match_score,
            result.culture_fit_score
        );
        if !result.missing_skills.is_empty() {
            println!("    missing: {}", result.missing_skills.join(", "));
        }
        for concern in &result.concerns {
            println!("    concern: {concern}");
        }
    }

    for excluded in &report.excluded {
        println!("  skipped {}: {}", excluded.job_id, excluded.detail);
    }
}

/// Walk one application through matching, interview, evaluation, and offer.
///
/// Agent failures never stop the walkthrough: matching falls back to the local
/// ranking and a failed AI evaluation leaves the recruiter score as the basis.
pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(agent_url) = args.agent_url {
        config.agent.base_url = agent_url;
    }
    if let Some(timeout_ms) = args.agent_timeout_ms.filter(|ms| *ms > 0) {
        config.agent.timeout = Duration::from_millis(timeout_ms);
    }

    let repository = Arc::new(sample_catalog().into_repository()?);
    let transport = Arc::new(agent_transport(&config.agent)?);
    let service = HiringService::new(repository, transport, config.hiring_settings());

    let candidate_id = CandidateId("cand-demo".to_string());
    let candidate = Actor::candidate(&candidate_id);
    let recruiter = Actor::recruiter(DEMO_RECRUITER, demo_job_ids());

    println!("Hiring workflow demo (agents at {})", config.agent.base_url);

    let outcome = service
        .match_jobs(
            &candidate,
            MatchJobsRequest {
                candidate_id: candidate_id.clone(),
                job_ids: Vec::new(),
                session_id: None,
                allow_mock_fallback: true,
                persist_scores: false,
            },
        )
        .await?;
    if let Some(reason) = &outcome.fallback_reason {
        println!("\nJob matcher unavailable, showing local ranking: {reason}");
    }
    let profile = sample_catalog()
        .candidates
        .into_iter()
        .find(|profile| profile.id == candidate_id);
    if let Some(profile) = &profile {
        println!();
        render_match_report(profile, &outcome.report);
    }

    let Some(best) = outcome.report.best() else {
        println!("\nNo eligible jobs; nothing to apply to.");
        return Ok(());
    };

    let application = service.apply(
        &candidate,
        ApplyRequest {
            job_id: best.job_id.clone(),
            cover_letter: Some("Excited about the data platform work.".to_string()),
            draft: false,
        },
    )?;
    println!(
        "\nApplied to {} as {} ({})",
        best.job_title,
        application.id,
        application.status()
    );

    service.change_status(
        &recruiter,
        &application.id,
        StatusChangeRequest {
            status: ApplicationStatus::Screening,
            interview: None,
        },
    )?;
    let change = service.change_status(
        &recruiter,
        &application.id,
        StatusChangeRequest {
            status: ApplicationStatus::Interview,
            interview: Some(InterviewPlan {
                interview_type: InterviewType::Technical,
                scheduled_date: Utc::now() + ChronoDuration::days(3),
                duration_minutes: 60,
                interviewers: vec![DEMO_RECRUITER.to_string()],
            }),
        },
    )?;
    let Some(interview) = change.interview else {
        println!("Application already in interview; stopping.");
        return Ok(());
    };
    println!(
        "Moved {} -> {}; scheduled round {} ({})",
        change.previous_status,
        change.application.status(),
        interview.round_number(),
        interview.id
    );

    service.submit_answers(
        &candidate,
        &interview.id,
        AnswerSubmission {
            questions: demo_questions(),
            answers: BTreeMap::from([
                (
                    0,
                    "Backfill with idempotent partitions and compare row counts per day.".to_string(),
                ),
                (
                    1,
                    "Alert on freshness lag and page only when downstream SLAs are at risk."
                        .to_string(),
                ),
            ]),
        },
    )?;
    println!("Candidate submitted 2 of 3 answers");

    match service.evaluate_interview(&recruiter, &interview.id, None).await {
        Ok(evaluated) => {
            if let Some(report) = evaluated.evaluation_report {
                let score = report
                    .ai_overall_score
                    .map(|score| format!("{score:.1}"))
                    .unwrap_or_else(|| "n/a".to_string());
                println!(
                    "AI evaluation (advisory): {} of {} answered, score {}{}",
                    report.evaluated_questions,
                    report.answered_questions,
                    score,
                    if report.partial { ", partial" } else { "" }
                );
            }
        }
        Err(error) => println!("AI evaluation unavailable: {error}"),
    }

    service.submit_feedback(
        &recruiter,
        &interview.id,
        FeedbackSubmission {
            scores: RecruiterScores {
                technical: Some(8),
                communication: Some(7),
                cultural_fit: Some(8),
                overall: Some(8),
            },
            feedback: "Strong pipeline fundamentals".to_string(),
            notes: String::new(),
            result: InterviewResult::Passed,
        },
    )?;
    let recommendation = service.recommendation(&recruiter, &application.id)?;
    println!("Recommendation: {}", recommendation.summary());

    let offer = service.change_status(
        &recruiter,
        &application.id,
        StatusChangeRequest {
            status: ApplicationStatus::Offer,
            interview: None,
        },
    )?;
    println!("Application {} is now {}", offer.application.id, offer.application.status());

    Ok(())
}

fn demo_questions() -> Vec<InterviewQuestion> {
    [
        ("How would you backfill a month of late-arriving events?", "hard"),
        ("How do you decide when a pipeline alert should page someone?", "medium"),
        ("Describe a schema migration you would do differently.", "medium"),
    ]
    .into_iter()
    .map(|(text, difficulty)| InterviewQuestion {
        text: text.to_string(),
        question_type: Some("technical".to_string()),
        difficulty: Some(difficulty.to_string()),
    })
    .collect()
}
