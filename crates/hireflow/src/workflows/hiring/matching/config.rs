use serde::{Deserialize, Serialize};

use super::super::domain::ValidationError;
use super::RecommendationLevel;

/// Relative importance of the four sub-scores. Always stored normalized so the
/// components sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWeights")]
pub struct MatchWeights {
    skill: f64,
    experience: f64,
    salary: f64,
    culture: f64,
}

#[derive(Deserialize)]
struct RawWeights {
    skill: f64,
    experience: f64,
    salary: f64,
    culture: f64,
}

impl TryFrom<RawWeights> for MatchWeights {
    type Error = ValidationError;

    fn try_from(raw: RawWeights) -> Result<Self, Self::Error> {
        Self::new(raw.skill, raw.experience, raw.salary, raw.culture)
    }
}

impl MatchWeights {
    pub fn new(skill: f64, experience: f64, salary: f64, culture: f64) -> Result<Self, ValidationError> {
        let parts = [skill, experience, salary, culture];
        if parts.iter().any(|part| !part.is_finite() || *part < 0.0) {
            return Err(ValidationError::InvalidWeights);
        }
        let total: f64 = parts.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            return Err(ValidationError::InvalidWeights);
        }

        Ok(Self {
            skill: skill / total,
            experience: experience / total,
            salary: salary / total,
            culture: culture / total,
        })
    }

    pub fn skill(&self) -> f64 {
        self.skill
    }

    pub fn experience(&self) -> f64 {
        self.experience
    }

    pub fn salary(&self) -> f64 {
        self.salary
    }

    pub fn culture(&self) -> f64 {
        self.culture
    }

    pub(crate) fn combine(&self, skill: f64, experience: f64, salary: f64, culture: f64) -> f64 {
        (skill * self.skill + experience * self.experience + salary * self.salary + culture * self.culture)
            .clamp(0.0, 100.0)
    }
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            skill: 0.25,
            experience: 0.25,
            salary: 0.25,
            culture: 0.25,
        }
    }
}

/// Overall-score cut-offs (0–100) for recommendation levels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawThresholds")]
pub struct MatchThresholds {
    highly_recommended: f64,
    recommended: f64,
    consider: f64,
}

#[derive(Deserialize)]
struct RawThresholds {
    highly_recommended: f64,
    recommended: f64,
    consider: f64,
}

impl TryFrom<RawThresholds> for MatchThresholds {
    type Error = ValidationError;

    fn try_from(raw: RawThresholds) -> Result<Self, Self::Error> {
        Self::new(raw.highly_recommended, raw.recommended, raw.consider)
    }
}

impl MatchThresholds {
    pub fn new(highly_recommended: f64, recommended: f64, consider: f64) -> Result<Self, ValidationError> {
        let ordered = consider >= 0.0 && consider < recommended && recommended < highly_recommended;
        if !ordered || highly_recommended > 100.0 || !highly_recommended.is_finite() {
            return Err(ValidationError::InvalidThresholds {
                min: 0.0,
                max: 100.0,
            });
        }

        Ok(Self {
            highly_recommended,
            recommended,
            consider,
        })
    }

    pub fn classify(&self, overall_score: f64) -> RecommendationLevel {
        if overall_score >= self.highly_recommended {
            RecommendationLevel::HighlyRecommended
        } else if overall_score >= self.recommended {
            RecommendationLevel::Recommended
        } else if overall_score >= self.consider {
            RecommendationLevel::Consider
        } else {
            RecommendationLevel::NotRecommended
        }
    }
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            highly_recommended: 85.0,
            recommended: 70.0,
            consider: 50.0,
        }
    }
}
