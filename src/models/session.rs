use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{Emotion, FallbackReason, MessageRole, RefusalCategory, SessionStatus, SignalKind};
use super::score::ScoreSummary;

/// One student's attempt at one case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: String,
    pub case_id: String,
    pub status: SessionStatus,
    /// Number of student messages in the transcript.
    pub turn_count: u32,
    pub submitted_diagnosis: Option<String>,
    pub score: Option<ScoreSummary>,
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Session {
    /// A fresh `active` session with no turns.
    pub fn new(user_id: &str, case_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            case_id: case_id.to_string(),
            status: SessionStatus::Active,
            turn_count: 0,
            submitted_diagnosis: None,
            score: None,
            started_at: now,
            last_activity_at: now,
            completed_at: None,
        }
    }
}

/// One entry of the append-only transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub metadata: MessageMetadata,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(session_id: Uuid, role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            role,
            content: content.into(),
            metadata: MessageMetadata::default(),
            timestamp: crate::db::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Closed set of annotations a message may carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub opening: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<Emotion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pain_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub danger: Option<SignalKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refusal: Option<RefusalCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackReason>,
    /// Student text was altered by input sanitation.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub input_filtered: bool,
}
