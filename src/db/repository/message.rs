use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::{format_timestamp, parse_timestamp, parse_uuid, DatabaseError};
use crate::models::enums::*;
use crate::models::{Message, MessageMetadata};

/// Appends to the transcript. Order is the insertion order (`seq`).
pub fn insert_message(conn: &Connection, msg: &Message) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO messages (id, session_id, role, content, metadata, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            msg.id.to_string(),
            msg.session_id.to_string(),
            msg.role.as_str(),
            msg.content,
            serde_json::to_string(&msg.metadata)?,
            format_timestamp(&msg.timestamp),
        ],
    )?;
    Ok(())
}

pub fn get_messages_by_session(
    conn: &Connection,
    session_id: &Uuid,
) -> Result<Vec<Message>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, session_id, role, content, metadata, timestamp
         FROM messages WHERE session_id = ?1 ORDER BY seq ASC",
    )?;

    let rows = stmt.query_map(params![session_id.to_string()], |row| {
        Ok(MessageRow {
            id: row.get(0)?,
            session_id: row.get(1)?,
            role: row.get(2)?,
            content: row.get(3)?,
            metadata: row.get(4)?,
            timestamp: row.get(5)?,
        })
    })?;

    let mut messages = Vec::new();
    for row in rows {
        messages.push(message_from_row(row?)?);
    }
    Ok(messages)
}

pub fn count_messages_by_role(
    conn: &Connection,
    session_id: &Uuid,
    role: MessageRole,
) -> Result<u32, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM messages WHERE session_id = ?1 AND role = ?2",
        params![session_id.to_string(), role.as_str()],
        |row| row.get::<_, u32>(0),
    )?;
    Ok(count)
}

struct MessageRow {
    id: String,
    session_id: String,
    role: String,
    content: String,
    metadata: String,
    timestamp: String,
}

fn message_from_row(row: MessageRow) -> Result<Message, DatabaseError> {
    let metadata: MessageMetadata = if row.metadata.trim().is_empty() {
        MessageMetadata::default()
    } else {
        serde_json::from_str(&row.metadata)?
    };

    Ok(Message {
        id: parse_uuid(&row.id)?,
        session_id: parse_uuid(&row.session_id)?,
        role: MessageRole::from_str(&row.role)?,
        content: row.content,
        metadata,
        timestamp: parse_timestamp(&row.timestamp)?,
    })
}
