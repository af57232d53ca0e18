use serde::{Deserialize, Serialize};

use crate::models::enums::{RefusalCategory, SignalKind};

/// Outcome of the crisis/violence scan on a student message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputClassification {
    /// False when a danger signal matched; the turn must not reach the provider.
    pub safe: bool,
    pub signal: Option<SignalKind>,
    /// The text that was classified, unchanged.
    pub text: String,
}

/// A question the simulated patient deflects instead of answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Refusal {
    pub category: RefusalCategory,
    pub canned_reply: &'static str,
}

/// Why a generated reply was discarded wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyRejection {
    DiagnosisAsserted,
    TreatmentAsserted,
}

/// Result of the output gate on a generated patient reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedReply {
    /// False when the reply was replaced by a fixed deflection.
    pub accepted: bool,
    pub text: String,
    pub rejection: Option<ReplyRejection>,
    /// Number of jargon terms rewritten into lay wording.
    pub substituted_terms: usize,
}

/// Result of input sanitization (pre-classification).
#[derive(Debug, Clone)]
pub struct SanitizedInput {
    /// The cleaned text that is classified, stored and sent on.
    pub text: String,
    /// Whether any modifications were made.
    pub was_modified: bool,
    /// What was stripped (for audit, no student text).
    pub modifications: Vec<InputModification>,
}

/// A modification made during input sanitization.
#[derive(Debug, Clone)]
pub struct InputModification {
    pub kind: InputModificationKind,
    pub description: String,
}

/// Types of input sanitization applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputModificationKind {
    InvisibleUnicodeRemoved,
    ControlCharacterRemoved,
    InjectionPatternRemoved,
    ExcessiveLengthTruncated,
}
