use serde::{Deserialize, Serialize};

use super::enums::{DiagnosisAccuracy, Grade, ScoreDimension};

/// Full rubric outcome for one finished session. Derived and immutable:
/// the same transcript, diagnosis, case and rubric always give the same value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub inquiry: InquiryScore,
    pub diagnosis: DiagnosisScore,
    pub communication: CommunicationScore,
    pub final_score: f64,
    pub grade: Grade,
    pub passed: bool,
    pub suggestions: Vec<Suggestion>,
    pub overall_comment: String,
}

impl ScoreResult {
    pub fn summary(&self) -> ScoreSummary {
        ScoreSummary {
            final_score: self.final_score,
            grade: self.grade,
            passed: self.passed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InquiryScore {
    pub covered_questions: Vec<String>,
    pub missed_questions: Vec<String>,
    pub covered_count: usize,
    pub total_questions: usize,
    /// covered / total, 0 when the case lists no key questions.
    pub coverage_rate: f64,
    pub key_question_score: f64,
    pub symptom_score: f64,
    pub logic_score: f64,
    pub etiquette_score: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisScore {
    pub accuracy: DiagnosisAccuracy,
    pub accuracy_score: f64,
    pub differential_count: usize,
    pub reasoning_score: f64,
    /// Capped at 35.
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunicationScore {
    pub turn_count: usize,
    pub turn_score: f64,
    pub average_length: f64,
    pub politeness_rate: f64,
    pub politeness_score: f64,
    pub empathy_score: f64,
    /// Capped at 25.
    pub total: f64,
}

/// One improvement hint, tagged with the dimension it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub dimension: ScoreDimension,
    pub text: String,
}

/// The part of a score kept on the session row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub final_score: f64,
    pub grade: Grade,
    pub passed: bool,
}
