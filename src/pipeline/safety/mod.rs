//! Safety gate: deterministic pattern classification of both directions of
//! the conversation. Stateless and safe to call from any number of sessions.

pub mod gate;
pub mod keywords;
pub mod output_sanitize;
pub mod sanitize;
pub mod types;

pub use gate::{
    check_persona_consistency, classify_student_input, sanitize_patient_reply, should_refuse,
};
pub use keywords::{danger_warning, refusal_reply, CONFUSED_PATIENT_LINE, THINKING_PLACEHOLDER};
pub use output_sanitize::normalize_generated_text;
pub use sanitize::{sanitize_student_input, FILTERED_MARKER};
pub use types::*;
