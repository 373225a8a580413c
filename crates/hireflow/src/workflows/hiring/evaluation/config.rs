use serde::{Deserialize, Serialize};

use super::super::domain::{EvaluationSignal, ValidationError};

/// Score cut-offs (0–10 scale) used to label an interview or application.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawThresholds")]
pub struct EvaluationThresholds {
    strong_pass: f64,
    pass: f64,
    borderline: f64,
}

#[derive(Deserialize)]
struct RawThresholds {
    strong_pass: f64,
    pass: f64,
    borderline: f64,
}

impl TryFrom<RawThresholds> for EvaluationThresholds {
    type Error = ValidationError;

    fn try_from(raw: RawThresholds) -> Result<Self, Self::Error> {
        Self::new(raw.strong_pass, raw.pass, raw.borderline)
    }
}

impl EvaluationThresholds {
    pub fn new(strong_pass: f64, pass: f64, borderline: f64) -> Result<Self, ValidationError> {
        let ordered = borderline >= 0.0 && borderline < pass && pass < strong_pass;
        if !ordered || strong_pass > 10.0 || !strong_pass.is_finite() {
            return Err(ValidationError::InvalidThresholds {
                min: 0.0,
                max: 10.0,
            });
        }

        Ok(Self {
            strong_pass,
            pass,
            borderline,
        })
    }

    pub fn strong_pass(&self) -> f64 {
        self.strong_pass
    }

    pub fn pass(&self) -> f64 {
        self.pass
    }

    pub fn borderline(&self) -> f64 {
        self.borderline
    }

    pub fn classify(&self, score: f64) -> EvaluationSignal {
        if score >= self.strong_pass {
            EvaluationSignal::StrongPass
        } else if score >= self.pass {
            EvaluationSignal::Pass
        } else if score >= self.borderline {
            EvaluationSignal::Borderline
        } else {
            EvaluationSignal::Fail
        }
    }
}

impl Default for EvaluationThresholds {
    fn default() -> Self {
        Self {
            strong_pass: 8.0,
            pass: 6.0,
            borderline: 4.0,
        }
    }
}
