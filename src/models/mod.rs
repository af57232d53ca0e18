pub mod case;
pub mod enums;
pub mod score;
pub mod session;

pub use case::{Case, PatientPersona, SymptomProfile};
pub use enums::*;
pub use score::{
    CommunicationScore, DiagnosisScore, InquiryScore, ScoreResult, ScoreSummary, Suggestion,
};
pub use session::{Message, MessageMetadata, Session};
