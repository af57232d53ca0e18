//! Dialogue orchestrator: sequences a student's interview with the simulated
//! patient, gating both directions through the safety module and handing the
//! finished transcript to the rubric scorer.

pub mod chat_client;
pub mod emotion;
pub mod orchestrator;
pub mod persona;
pub mod provider;
pub mod sweeper;

pub use chat_client::ChatCompletionClient;
pub use emotion::infer_emotion;
pub use orchestrator::{DialogueOrchestrator, ReplyKind, SessionStart, TurnReply};
pub use provider::{
    ChatMessage, ChatRole, GenerationParams, GenerationRequest, ProviderError, TextGenerator,
};
pub use sweeper::{start_idle_sweeper, IdleSweeperHandle};

use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::SessionStatus;

#[derive(Error, Debug)]
pub enum DialogueError {
    #[error("Session {session_id} is {status}; the operation needs a different state")]
    InvalidState {
        session_id: Uuid,
        status: SessionStatus,
    },

    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Storage error: {0}")]
    Storage(DatabaseError),

    #[error("Dialogue lock poisoned")]
    LockPoisoned,
}

impl From<DatabaseError> for DialogueError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::SessionNotActive { session_id, status } => {
                Self::InvalidState { session_id, status }
            }
            DatabaseError::NotFound { entity_type, id } if entity_type == "Session" => {
                match Uuid::parse_str(&id) {
                    Ok(uuid) => Self::SessionNotFound(uuid),
                    Err(_) => Self::Storage(DatabaseError::NotFound { entity_type, id }),
                }
            }
            other => Self::Storage(other),
        }
    }
}
