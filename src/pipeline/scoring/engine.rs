use super::communication::score_communication;
use super::config::RubricConfig;
use super::diagnosis::score_diagnosis;
use super::feedback::{grade_for, overall_comment, suggestions};
use super::inquiry::score_inquiry;
use super::text::round2;
use crate::models::enums::MessageRole;
use crate::models::{Case, Message, ScoreResult};

/// Final scores at or above this pass.
pub const PASS_MARK: f64 = 60.0;

/// Deterministic rubric over a finished transcript. Holds only its
/// configuration, so one instance serves every session concurrently.
#[derive(Debug, Clone, Default)]
pub struct RubricScorer {
    config: RubricConfig,
}

impl RubricScorer {
    pub fn new(config: RubricConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RubricConfig {
        &self.config
    }

    /// Score `transcript` against `case`. Never fails; identical input gives
    /// an identical result.
    pub fn score(&self, case: &Case, transcript: &[Message], submitted_diagnosis: &str) -> ScoreResult {
        let standards = &self.config.standards;
        let weights = &self.config.weights;

        let questions: Vec<&str> = transcript
            .iter()
            .filter(|m| m.role == MessageRole::Student)
            .map(|m| m.content.as_str())
            .collect();
        let all_text: Vec<&str> = transcript.iter().map(|m| m.content.as_str()).collect();

        let mut inquiry = score_inquiry(&case.key_questions, &questions, standards);
        let mut diagnosis = score_diagnosis(
            submitted_diagnosis,
            &case.standard_diagnosis,
            &case.differential_diagnosis,
            &all_text,
            inquiry.coverage_rate,
            standards,
        );
        let communication = score_communication(&questions, standards);

        // No student turns: nothing was demonstrated, every sub-score is 0.
        if questions.is_empty() {
            inquiry.key_question_score = 0.0;
            inquiry.symptom_score = 0.0;
            inquiry.logic_score = 0.0;
            inquiry.etiquette_score = 0.0;
            inquiry.total = 0.0;
            diagnosis.accuracy_score = 0.0;
            diagnosis.reasoning_score = 0.0;
            diagnosis.total = 0.0;
        }

        let weighted = inquiry.total * weights.inquiry
            + diagnosis.total * weights.diagnosis
            + communication.total * weights.communication;
        let final_score = round2(weighted).clamp(0.0, 100.0);
        let grade = grade_for(final_score);

        tracing::debug!(
            student_turns = questions.len(),
            coverage_rate = inquiry.coverage_rate,
            accuracy = %diagnosis.accuracy,
            final_score,
            grade = %grade,
            "Rubric scored"
        );

        ScoreResult {
            suggestions: suggestions(&inquiry, &diagnosis, &communication),
            overall_comment: overall_comment(grade, inquiry.coverage_rate, diagnosis.accuracy),
            inquiry,
            diagnosis,
            communication,
            final_score,
            grade,
            passed: final_score >= PASS_MARK,
        }
    }
}
