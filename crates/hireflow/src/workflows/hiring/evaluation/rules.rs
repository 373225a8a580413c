use super::super::domain::{DimensionMeans, ExclusionReason, PartialAggregationWarning};
use super::AnswerEvaluation;

const SCALE_MAX: f64 = 10.0;

#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Running means for the five scored dimensions.
#[derive(Debug, Default)]
pub(crate) struct DimensionTally {
    score: Accumulator,
    completeness: Accumulator,
    specificity: Accumulator,
    relevance: Accumulator,
    communication: Accumulator,
    pub(crate) warnings: Vec<PartialAggregationWarning>,
}

impl DimensionTally {
    /// Fold one question's evaluation in, excluding unusable fields one by one.
    pub(crate) fn record(&mut self, question_index: usize, evaluation: &AnswerEvaluation) {
        let fields = [
            ("score", evaluation.score),
            ("completeness", evaluation.completeness),
            ("specificity", evaluation.specificity),
            ("relevance", evaluation.relevance),
            ("communication", evaluation.communication),
        ];

        for (dimension, raw) in fields {
            let Some(value) = self.sanitize(question_index, dimension, raw) else {
                continue;
            };
            let slot = match dimension {
                "score" => &mut self.score,
                "completeness" => &mut self.completeness,
                "specificity" => &mut self.specificity,
                "relevance" => &mut self.relevance,
                _ => &mut self.communication,
            };
            slot.push(value);
        }
    }

    pub(crate) fn exclude_question(&mut self, question_index: usize) {
        self.warnings.push(PartialAggregationWarning {
            question_index,
            dimension: "all".to_string(),
            reason: ExclusionReason::NotEvaluated,
        });
    }

    fn sanitize(
        &mut self,
        question_index: usize,
        dimension: &str,
        raw: Option<f64>,
    ) -> Option<f64> {
        let reason = match raw {
            None => ExclusionReason::Missing,
            Some(value) if !value.is_finite() => ExclusionReason::NonFinite,
            Some(value) if (0.0..=SCALE_MAX).contains(&value) => return Some(value),
            Some(_) => ExclusionReason::Clamped,
        };

        self.warnings.push(PartialAggregationWarning {
            question_index,
            dimension: dimension.to_string(),
            reason,
        });

        match reason {
            ExclusionReason::Clamped => raw.map(|value| value.clamp(0.0, SCALE_MAX)),
            _ => None,
        }
    }

    pub(crate) fn means(&self) -> DimensionMeans {
        DimensionMeans {
            score: self.score.mean(),
            completeness: self.completeness.mean(),
            specificity: self.specificity.mean(),
            relevance: self.relevance.mean(),
            communication: self.communication.mean(),
        }
    }
}

/// Append items not already present, preserving first-seen order.
pub(crate) fn merge_unique(target: &mut Vec<String>, items: &[String]) {
    for item in items {
        let trimmed = item.trim();
        if !trimmed.is_empty() && !target.iter().any(|existing| existing == trimmed) {
            target.push(trimmed.to_string());
        }
    }
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}
