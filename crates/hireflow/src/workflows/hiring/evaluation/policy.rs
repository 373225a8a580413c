use serde::{Deserialize, Serialize};

use super::super::domain::{
    EvaluationSignal, Interview, InterviewId, InterviewResult, ScoreSource,
};
use super::config::EvaluationThresholds;
use super::rules::mean;

/// Score that one round contributes to the application-level recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundScore {
    pub round_number: u32,
    pub interview_id: InterviewId,
    pub score: f64,
    pub source: ScoreSource,
    pub result: InterviewResult,
}

/// Application-level hiring signal derived from every scored round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecommendation {
    pub rounds: Vec<RoundScore>,
    pub unscored_rounds: Vec<u32>,
    pub overall_score: Option<f64>,
    pub signal: Option<EvaluationSignal>,
    pub basis: Option<ScoreSource>,
}

impl ApplicationRecommendation {
    pub fn summary(&self) -> String {
        match (self.overall_score, self.signal) {
            (Some(score), Some(signal)) => format!(
                "{} across {} scored round(s) (mean {:.1})",
                signal_label(signal),
                self.rounds.len(),
                score
            ),
            _ => "no scored interview rounds".to_string(),
        }
    }
}

fn signal_label(signal: EvaluationSignal) -> &'static str {
    match signal {
        EvaluationSignal::StrongPass => "strong pass",
        EvaluationSignal::Pass => "pass",
        EvaluationSignal::Borderline => "borderline",
        EvaluationSignal::Fail => "fail",
    }
}

/// Recruiter overall score wins; the AI aggregate only fills in when it is absent.
pub(crate) fn round_score(interview: &Interview) -> Option<RoundScore> {
    let (score, source) = match interview.scores.overall {
        Some(overall) => (f64::from(overall), ScoreSource::Recruiter),
        None => {
            let advisory = interview
                .evaluation_report
                .as_ref()
                .and_then(|report| report.ai_overall_score)?;
            (advisory, ScoreSource::AiAdvisory)
        }
    };

    Some(RoundScore {
        round_number: interview.round_number(),
        interview_id: interview.id.clone(),
        score,
        source,
        result: interview.result,
    })
}

pub(crate) fn recommend(
    interviews: &[Interview],
    thresholds: &EvaluationThresholds,
) -> ApplicationRecommendation {
    let mut ordered: Vec<&Interview> = interviews.iter().collect();
    ordered.sort_by_key(|interview| interview.round_number());

    let mut rounds = Vec::new();
    let mut unscored_rounds = Vec::new();
    for interview in ordered {
        match round_score(interview) {
            Some(score) => rounds.push(score),
            None => unscored_rounds.push(interview.round_number()),
        }
    }

    let scores: Vec<f64> = rounds.iter().map(|round| round.score).collect();
    let overall_score = mean(&scores);
    let basis = combined_source(&rounds);

    ApplicationRecommendation {
        signal: overall_score.map(|score| thresholds.classify(score)),
        overall_score,
        basis,
        rounds,
        unscored_rounds,
    }
}

fn combined_source(rounds: &[RoundScore]) -> Option<ScoreSource> {
    let first = rounds.first()?.source;
    if rounds.iter().all(|round| round.source == first) {
        Some(first)
    } else {
        Some(ScoreSource::Mixed)
    }
}
