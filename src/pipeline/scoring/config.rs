use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Share of each dimension in the final score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RubricWeights {
    pub inquiry: f64,
    pub diagnosis: f64,
    pub communication: f64,
}

impl Default for RubricWeights {
    fn default() -> Self {
        Self {
            inquiry: 0.40,
            diagnosis: 0.35,
            communication: 0.25,
        }
    }
}

/// Point caps and thresholds of the rubric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RubricStandards {
    pub key_question_score: f64,
    pub symptom_detail_score: f64,
    pub logic_score: f64,
    pub etiquette_score: f64,
    pub correct_score: f64,
    pub partial_score: f64,
    pub wrong_score: f64,
    /// At or above this many student turns the turn sub-score is full.
    pub full_turns: u32,
    /// Below this many turns the degraded formula applies.
    pub pass_turns: u32,
}

impl Default for RubricStandards {
    fn default() -> Self {
        Self {
            key_question_score: 40.0,
            symptom_detail_score: 20.0,
            logic_score: 20.0,
            etiquette_score: 20.0,
            correct_score: 35.0,
            partial_score: 15.0,
            wrong_score: 0.0,
            full_turns: 10,
            pass_turns: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RubricConfig {
    pub weights: RubricWeights,
    pub standards: RubricStandards,
}

impl RubricConfig {
    /// Rejects configurations that could push a score outside [0, 100].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.weights;
        let weights = [w.inquiry, w.diagnosis, w.communication];
        if weights.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(ConfigError::InvalidRubric(
                "weights must be finite and non-negative".into(),
            ));
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::InvalidRubric(format!(
                "weights must sum to 1, got {sum}"
            )));
        }

        let s = &self.standards;
        let caps = [
            s.key_question_score,
            s.symptom_detail_score,
            s.logic_score,
            s.etiquette_score,
            s.correct_score,
            s.partial_score,
            s.wrong_score,
        ];
        if caps.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(ConfigError::InvalidRubric(
                "scores must be finite and non-negative".into(),
            ));
        }
        let inquiry_cap =
            s.key_question_score + s.symptom_detail_score + s.logic_score + s.etiquette_score;
        if inquiry_cap > 100.0 {
            return Err(ConfigError::InvalidRubric(format!(
                "inquiry caps sum to {inquiry_cap}, above 100"
            )));
        }
        if s.correct_score > 35.0 || s.partial_score > 35.0 || s.wrong_score > 35.0 {
            return Err(ConfigError::InvalidRubric(
                "diagnosis base scores must not exceed 35".into(),
            ));
        }
        if s.pass_turns >= s.full_turns {
            return Err(ConfigError::InvalidRubric(format!(
                "pass_turns ({}) must be below full_turns ({})",
                s.pass_turns, s.full_turns
            )));
        }
        Ok(())
    }
}
