use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{format_timestamp, parse_timestamp, parse_uuid, DatabaseError};
use crate::models::enums::*;
use crate::models::{ScoreSummary, Session};

const SESSION_COLUMNS: &str = "id, user_id, case_id, status, turn_count, submitted_diagnosis,
     final_score, grade, passed, started_at, last_activity_at, completed_at";

pub fn insert_session(conn: &Connection, session: &Session) -> Result<(), DatabaseError> {
    let summary = session.score.as_ref();
    conn.execute(
        "INSERT INTO sessions (id, user_id, case_id, status, turn_count, submitted_diagnosis,
         final_score, grade, passed, started_at, last_activity_at, completed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            session.id.to_string(),
            session.user_id,
            session.case_id,
            session.status.as_str(),
            session.turn_count,
            session.submitted_diagnosis,
            summary.map(|s| s.final_score),
            summary.map(|s| s.grade.as_str()),
            summary.map(|s| s.passed as i32),
            format_timestamp(&session.started_at),
            format_timestamp(&session.last_activity_at),
            session.completed_at.as_ref().map(format_timestamp),
        ],
    )?;
    Ok(())
}

pub fn get_session(conn: &Connection, id: &Uuid) -> Result<Option<Session>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
            params![id.to_string()],
            read_session_row,
        )
        .optional()?;
    row.map(session_from_row).transpose()
}

/// Most recently started `active` session for the pair, if any.
pub fn find_active_session(
    conn: &Connection,
    user_id: &str,
    case_id: &str,
) -> Result<Option<Session>, DatabaseError> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {SESSION_COLUMNS} FROM sessions
                 WHERE user_id = ?1 AND case_id = ?2 AND status = 'active'
                 ORDER BY started_at DESC, rowid DESC LIMIT 1"
            ),
            params![user_id, case_id],
            read_session_row,
        )
        .optional()?;
    row.map(session_from_row).transpose()
}

pub fn list_sessions_by_user(conn: &Connection, user_id: &str) -> Result<Vec<Session>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SESSION_COLUMNS} FROM sessions WHERE user_id = ?1
         ORDER BY started_at DESC, rowid DESC"
    ))?;
    let rows = stmt.query_map(params![user_id], read_session_row)?;

    let mut sessions = Vec::new();
    for row in rows {
        sessions.push(session_from_row(row?)?);
    }
    Ok(sessions)
}

/// Fails with `SessionNotActive` unless the session exists and is `active`.
pub fn require_active(conn: &Connection, id: &Uuid) -> Result<Session, DatabaseError> {
    let session = get_session(conn, id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "Session".into(),
        id: id.to_string(),
    })?;
    if session.status != SessionStatus::Active {
        return Err(DatabaseError::SessionNotActive {
            session_id: *id,
            status: session.status,
        });
    }
    Ok(session)
}

pub fn record_turn(
    conn: &Connection,
    id: &Uuid,
    student_messages: u32,
    at: &DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE sessions SET turn_count = turn_count + ?2, last_activity_at = ?3
         WHERE id = ?1 AND status = 'active'",
        params![id.to_string(), student_messages, format_timestamp(at)],
    )?;
    ensure_changed(changed, id)
}

pub fn update_session_status(
    conn: &Connection,
    id: &Uuid,
    status: SessionStatus,
    at: &DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let completed_at = status.is_terminal().then(|| format_timestamp(at));
    let changed = conn.execute(
        "UPDATE sessions SET status = ?2, completed_at = COALESCE(?3, completed_at),
         last_activity_at = ?4
         WHERE id = ?1 AND status = 'active'",
        params![id.to_string(), status.as_str(), completed_at, format_timestamp(at)],
    )?;
    ensure_changed(changed, id)
}

pub fn record_diagnosis(conn: &Connection, id: &Uuid, diagnosis: &str) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE sessions SET submitted_diagnosis = ?2 WHERE id = ?1",
        params![id.to_string(), diagnosis],
    )?;
    ensure_changed(changed, id)
}

pub fn update_score_summary(
    conn: &Connection,
    id: &Uuid,
    summary: &ScoreSummary,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE sessions SET final_score = ?2, grade = ?3, passed = ?4 WHERE id = ?1",
        params![
            id.to_string(),
            summary.final_score,
            summary.grade.as_str(),
            summary.passed as i32,
        ],
    )?;
    ensure_changed(changed, id)
}

/// Ids of `active` sessions whose last activity is older than `cutoff`.
pub fn list_idle_sessions(
    conn: &Connection,
    cutoff: &DateTime<Utc>,
) -> Result<Vec<Uuid>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id FROM sessions WHERE status = 'active' AND last_activity_at < ?1
         ORDER BY last_activity_at ASC",
    )?;
    let rows = stmt.query_map(params![format_timestamp(cutoff)], |row| row.get::<_, String>(0))?;

    let mut ids = Vec::new();
    for row in rows {
        ids.push(parse_uuid(&row?)?);
    }
    Ok(ids)
}

fn ensure_changed(changed: usize, id: &Uuid) -> Result<(), DatabaseError> {
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Session".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

struct SessionRow {
    id: String,
    user_id: String,
    case_id: String,
    status: String,
    turn_count: u32,
    submitted_diagnosis: Option<String>,
    final_score: Option<f64>,
    grade: Option<String>,
    passed: Option<i32>,
    started_at: String,
    last_activity_at: String,
    completed_at: Option<String>,
}

fn read_session_row(row: &Row<'_>) -> rusqlite::Result<SessionRow> {
    Ok(SessionRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        case_id: row.get(2)?,
        status: row.get(3)?,
        turn_count: row.get(4)?,
        submitted_diagnosis: row.get(5)?,
        final_score: row.get(6)?,
        grade: row.get(7)?,
        passed: row.get(8)?,
        started_at: row.get(9)?,
        last_activity_at: row.get(10)?,
        completed_at: row.get(11)?,
    })
}

fn session_from_row(row: SessionRow) -> Result<Session, DatabaseError> {
    let score = match (row.final_score, row.grade, row.passed) {
        (Some(final_score), Some(grade), Some(passed)) => Some(ScoreSummary {
            final_score,
            grade: Grade::from_str(&grade)?,
            passed: passed != 0,
        }),
        _ => None,
    };

    Ok(Session {
        id: parse_uuid(&row.id)?,
        user_id: row.user_id,
        case_id: row.case_id,
        status: SessionStatus::from_str(&row.status)?,
        turn_count: row.turn_count,
        submitted_diagnosis: row.submitted_diagnosis,
        score,
        started_at: parse_timestamp(&row.started_at)?,
        last_activity_at: parse_timestamp(&row.last_activity_at)?,
        completed_at: row.completed_at.as_deref().map(parse_timestamp).transpose()?,
    })
}
