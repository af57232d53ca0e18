use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::{format_timestamp, DatabaseError};
use crate::models::ScoreResult;

/// Stores the full result, replacing any previous score for the session.
pub fn upsert_session_score(
    conn: &Connection,
    session_id: &Uuid,
    result: &ScoreResult,
    scored_at: &DateTime<Utc>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO session_scores (session_id, final_score, grade, passed, coverage_rate,
         diagnosis_accuracy, result_json, scored_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(session_id) DO UPDATE SET
            final_score = excluded.final_score,
            grade = excluded.grade,
            passed = excluded.passed,
            coverage_rate = excluded.coverage_rate,
            diagnosis_accuracy = excluded.diagnosis_accuracy,
            result_json = excluded.result_json,
            scored_at = excluded.scored_at",
        params![
            session_id.to_string(),
            result.final_score,
            result.grade.as_str(),
            result.passed as i32,
            result.inquiry.coverage_rate,
            result.diagnosis.accuracy.as_str(),
            serde_json::to_string(result)?,
            format_timestamp(scored_at),
        ],
    )?;
    Ok(())
}

pub fn get_session_score(
    conn: &Connection,
    session_id: &Uuid,
) -> Result<Option<ScoreResult>, DatabaseError> {
    let json = conn
        .query_row(
            "SELECT result_json FROM session_scores WHERE session_id = ?1",
            params![session_id.to_string()],
            |row| row.get::<_, String>(0),
        )
        .optional()?;

    match json {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}
