pub mod sqlite;
pub mod repository;
pub mod store;

pub use sqlite::*;
pub use repository::*;
pub use store::{SessionStore, SqliteSessionStore, StartOutcome};

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::SessionStatus;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("JSON column error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Session {session_id} is {status}, not active")]
    SessionNotActive {
        session_id: Uuid,
        status: SessionStatus,
    },

    #[error("Database lock poisoned")]
    LockPoisoned,
}

/// Current time at the precision the store keeps.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// RFC 3339, milliseconds, `Z` suffix. Text order equals time order.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad timestamp {text}: {e}")))
}

pub(crate) fn parse_uuid(text: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(text).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_round_trip_at_millisecond_precision() {
        let ts = now();
        let text = format_timestamp(&ts);
        assert!(text.ends_with('Z'));
        assert_eq!(parse_timestamp(&text).unwrap(), ts);
    }

    #[test]
    fn timestamp_text_sorts_chronologically() {
        let earlier = parse_timestamp("2026-03-01T09:00:00.000Z").unwrap();
        let later = earlier + chrono::Duration::milliseconds(1500);
        assert!(format_timestamp(&earlier) < format_timestamp(&later));
    }

    #[test]
    fn malformed_uuid_is_constraint_violation() {
        assert!(matches!(
            parse_uuid("not-a-uuid"),
            Err(DatabaseError::ConstraintViolation(_))
        ));
    }
}
