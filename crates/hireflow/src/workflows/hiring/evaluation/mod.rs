mod config;
mod policy;
mod rules;

pub use config::EvaluationThresholds;
pub use policy::{ApplicationRecommendation, RoundScore};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{CandidateAnswers, Interview, InterviewEvaluation, ScoreSource};
use rules::{merge_unique, DimensionTally};

/// AI evaluation of a single answer as returned by the answer evaluator agent.
///
/// Every numeric field is optional on the wire; numeric strings are accepted and
/// anything else decodes as missing so the aggregator can exclude it field by field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerEvaluation {
    #[serde(default, deserialize_with = "crate::workflows::hiring::wire::lenient_number")]
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "crate::workflows::hiring::wire::lenient_number")]
    pub completeness: Option<f64>,
    #[serde(default, deserialize_with = "crate::workflows::hiring::wire::lenient_number")]
    pub specificity: Option<f64>,
    #[serde(default, deserialize_with = "crate::workflows::hiring::wire::lenient_number")]
    pub relevance: Option<f64>,
    #[serde(default, deserialize_with = "crate::workflows::hiring::wire::lenient_number")]
    pub communication: Option<f64>,
    #[serde(default, deserialize_with = "crate::workflows::hiring::wire::lenient_strings")]
    pub strengths: Vec<String>,
    #[serde(default, deserialize_with = "crate::workflows::hiring::wire::lenient_strings")]
    pub improvements: Vec<String>,
}

/// Stateless aggregator turning per-answer evaluations into interview and
/// application level signals. It never touches `Interview::result`.
#[derive(Debug, Clone, Default)]
pub struct InterviewAggregator {
    thresholds: EvaluationThresholds,
}

impl InterviewAggregator {
    pub fn new(thresholds: EvaluationThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &EvaluationThresholds {
        &self.thresholds
    }

    /// Summarize evaluations keyed by question index.
    ///
    /// Only answered questions count toward denominators. Evaluations for
    /// unanswered questions are ignored; answered questions without an
    /// evaluation are reported as warnings.
    pub fn summarize(
        &self,
        answers: &CandidateAnswers,
        evaluations: &BTreeMap<usize, AnswerEvaluation>,
    ) -> InterviewEvaluation {
        let mut tally = DimensionTally::default();
        let mut strengths = Vec::new();
        let mut improvements = Vec::new();
        let mut answered_questions = 0;
        let mut evaluated_questions = 0;

        for (index, _, _) in answers.answered() {
            answered_questions += 1;
            match evaluations.get(&index) {
                Some(evaluation) => {
                    evaluated_questions += 1;
                    tally.record(index, evaluation);
                    merge_unique(&mut strengths, &evaluation.strengths);
                    merge_unique(&mut improvements, &evaluation.improvements);
                }
                None => tally.exclude_question(index),
            }
        }

        let means = tally.means();
        let ai_overall_score = means.score;

        InterviewEvaluation {
            total_questions: answers.questions().len(),
            answered_questions,
            evaluated_questions,
            means,
            ai_overall_score,
            signal: ai_overall_score.map(|score| self.thresholds.classify(score)),
            score_source: ScoreSource::AiAdvisory,
            strengths,
            improvements,
            partial: !tally.warnings.is_empty(),
            warnings: tally.warnings,
        }
    }

    /// Combine every round of one application into a single recommendation.
    pub fn recommend(&self, interviews: &[Interview]) -> ApplicationRecommendation {
        policy::recommend(interviews, &self.thresholds)
    }
}
