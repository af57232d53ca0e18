//! Session Store: the durable record behind the dialogue orchestrator.
//!
//! Every multi-row write runs in one SQLite transaction, so a turn or a
//! completion is either fully visible or not at all.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use super::repository::*;
use super::DatabaseError;
use crate::models::enums::*;
use crate::models::{Message, ScoreResult, Session};

/// Result of an atomic find-or-create.
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    Created(Session),
    Resumed(Session),
}

impl StartOutcome {
    pub fn session(&self) -> &Session {
        match self {
            Self::Created(s) | Self::Resumed(s) => s,
        }
    }

    pub fn into_session(self) -> Session {
        match self {
            Self::Created(s) | Self::Resumed(s) => s,
        }
    }
}

pub trait SessionStore: Send + Sync {
    fn find_active(&self, user_id: &str, case_id: &str) -> Result<Option<Session>, DatabaseError>;

    /// Inserts `session` with its opening message unless an `active` session
    /// already exists for the same (user, case); that one is returned instead.
    fn create(&self, session: &Session, opening: &Message) -> Result<StartOutcome, DatabaseError>;

    fn get(&self, session_id: &Uuid) -> Result<Option<Session>, DatabaseError>;

    /// Appends `messages` in order and bumps `turn_count` by the number of
    /// student messages among them. Rejected unless the session is `active`.
    fn append_turn(
        &self,
        session_id: &Uuid,
        messages: &[Message],
        at: &DateTime<Utc>,
    ) -> Result<Session, DatabaseError>;

    fn list_messages(&self, session_id: &Uuid) -> Result<Vec<Message>, DatabaseError>;

    /// Moves an `active` session to `status`.
    fn set_status(
        &self,
        session_id: &Uuid,
        status: SessionStatus,
        at: &DateTime<Utc>,
    ) -> Result<(), DatabaseError>;

    /// Records the diagnosis and score and marks the session `completed`.
    fn complete(
        &self,
        session_id: &Uuid,
        diagnosis: &str,
        result: &ScoreResult,
        at: &DateTime<Utc>,
    ) -> Result<Session, DatabaseError>;

    fn set_score(
        &self,
        session_id: &Uuid,
        result: &ScoreResult,
        at: &DateTime<Utc>,
    ) -> Result<(), DatabaseError>;

    fn get_score(&self, session_id: &Uuid) -> Result<Option<ScoreResult>, DatabaseError>;

    /// Abandons every `active` session idle since before `cutoff`.
    fn abandon_idle(
        &self,
        cutoff: &DateTime<Utc>,
        at: &DateTime<Utc>,
    ) -> Result<Vec<Uuid>, DatabaseError>;

    fn list_for_user(&self, user_id: &str) -> Result<Vec<Session>, DatabaseError>;
}

/// `SessionStore` over a single SQLite connection.
pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
}

impl SqliteSessionStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }
}

impl SessionStore for SqliteSessionStore {
    fn find_active(&self, user_id: &str, case_id: &str) -> Result<Option<Session>, DatabaseError> {
        let conn = self.lock()?;
        find_active_session(&conn, user_id, case_id)
    }

    fn create(&self, session: &Session, opening: &Message) -> Result<StartOutcome, DatabaseError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        if let Some(existing) = find_active_session(&tx, &session.user_id, &session.case_id)? {
            return Ok(StartOutcome::Resumed(existing));
        }

        insert_session(&tx, session)?;
        insert_message(&tx, opening)?;
        tx.commit()?;
        Ok(StartOutcome::Created(session.clone()))
    }

    fn get(&self, session_id: &Uuid) -> Result<Option<Session>, DatabaseError> {
        let conn = self.lock()?;
        get_session(&conn, session_id)
    }

    fn append_turn(
        &self,
        session_id: &Uuid,
        messages: &[Message],
        at: &DateTime<Utc>,
    ) -> Result<Session, DatabaseError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        require_active(&tx, session_id)?;
        for message in messages {
            if message.session_id != *session_id {
                return Err(DatabaseError::ConstraintViolation(format!(
                    "message {} belongs to another session",
                    message.id
                )));
            }
            insert_message(&tx, message)?;
        }
        let students = messages
            .iter()
            .filter(|m| m.role == MessageRole::Student)
            .count() as u32;
        record_turn(&tx, session_id, students, at)?;

        let session = require_active(&tx, session_id)?;
        tx.commit()?;
        Ok(session)
    }

    fn list_messages(&self, session_id: &Uuid) -> Result<Vec<Message>, DatabaseError> {
        let conn = self.lock()?;
        get_messages_by_session(&conn, session_id)
    }

    fn set_status(
        &self,
        session_id: &Uuid,
        status: SessionStatus,
        at: &DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        require_active(&tx, session_id)?;
        update_session_status(&tx, session_id, status, at)?;
        tx.commit()?;
        Ok(())
    }

    fn complete(
        &self,
        session_id: &Uuid,
        diagnosis: &str,
        result: &ScoreResult,
        at: &DateTime<Utc>,
    ) -> Result<Session, DatabaseError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        require_active(&tx, session_id)?;
        record_diagnosis(&tx, session_id, diagnosis)?;
        update_session_status(&tx, session_id, SessionStatus::Completed, at)?;
        update_score_summary(&tx, session_id, &result.summary())?;
        upsert_session_score(&tx, session_id, result, at)?;

        let session = get_session(&tx, session_id)?.ok_or_else(|| DatabaseError::NotFound {
            entity_type: "Session".into(),
            id: session_id.to_string(),
        })?;
        tx.commit()?;
        Ok(session)
    }

    fn set_score(
        &self,
        session_id: &Uuid,
        result: &ScoreResult,
        at: &DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        update_score_summary(&tx, session_id, &result.summary())?;
        upsert_session_score(&tx, session_id, result, at)?;
        tx.commit()?;
        Ok(())
    }

    fn get_score(&self, session_id: &Uuid) -> Result<Option<ScoreResult>, DatabaseError> {
        let conn = self.lock()?;
        get_session_score(&conn, session_id)
    }

    fn abandon_idle(
        &self,
        cutoff: &DateTime<Utc>,
        at: &DateTime<Utc>,
    ) -> Result<Vec<Uuid>, DatabaseError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let idle = list_idle_sessions(&tx, cutoff)?;
        for id in &idle {
            update_session_status(&tx, id, SessionStatus::Abandoned, at)?;
        }
        tx.commit()?;
        Ok(idle)
    }

    fn list_for_user(&self, user_id: &str) -> Result<Vec<Session>, DatabaseError> {
        let conn = self.lock()?;
        list_sessions_by_user(&conn, user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{now, open_memory_database};
    use chrono::Duration;
    use std::sync::Arc;

    fn store() -> SqliteSessionStore {
        SqliteSessionStore::new(open_memory_database().unwrap())
    }

    fn new_session(user: &str, case: &str) -> (Session, Message) {
        let session = Session::new(user, case, now());
        let opening = Message::new(session.id, MessageRole::Patient, "医生，我不舒服");
        (session, opening)
    }

    #[test]
    fn create_then_resume_same_pair() {
        let store = store();
        let (first, opening) = new_session("u1", "case_001");
        let created = store.create(&first, &opening).unwrap();
        assert!(matches!(created, StartOutcome::Created(_)));

        let (second, opening2) = new_session("u1", "case_001");
        let resumed = store.create(&second, &opening2).unwrap();
        assert!(matches!(resumed, StartOutcome::Resumed(_)));
        assert_eq!(resumed.session().id, first.id);

        // The losing candidate left no trace.
        assert!(store.get(&second.id).unwrap().is_none());
        assert_eq!(store.list_messages(&first.id).unwrap().len(), 1);
    }

    #[test]
    fn concurrent_creates_yield_one_session() {
        let store = Arc::new(store());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let (session, opening) = new_session("u1", "case_001");
                    store.create(&session, &opening).unwrap().into_session().id
                })
            })
            .collect();

        let ids: Vec<Uuid> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(store.list_for_user("u1").unwrap().len(), 1);
    }

    #[test]
    fn append_turn_counts_student_messages() {
        let store = store();
        let (session, opening) = new_session("u1", "case_001");
        store.create(&session, &opening).unwrap();

        let turn = [
            Message::new(session.id, MessageRole::Student, "您好，哪里不舒服？"),
            Message::new(session.id, MessageRole::Patient, "胸口疼"),
        ];
        let updated = store.append_turn(&session.id, &turn, &now()).unwrap();
        assert_eq!(updated.turn_count, 1);

        let transcript = store.list_messages(&session.id).unwrap();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[1].role, MessageRole::Student);
    }

    #[test]
    fn append_turn_rolls_back_on_failure() {
        let store = store();
        let (session, opening) = new_session("u1", "case_001");
        store.create(&session, &opening).unwrap();

        let student = Message::new(session.id, MessageRole::Student, "请问疼多久了？");
        let foreign = Message::new(Uuid::new_v4(), MessageRole::Patient, "x");
        assert!(store
            .append_turn(&session.id, &[student, foreign], &now())
            .is_err());

        assert_eq!(store.list_messages(&session.id).unwrap().len(), 1);
        assert_eq!(store.get(&session.id).unwrap().unwrap().turn_count, 0);
    }

    #[test]
    fn terminal_session_rejects_messages() {
        let store = store();
        let (session, opening) = new_session("u1", "case_001");
        store.create(&session, &opening).unwrap();
        store
            .set_status(&session.id, SessionStatus::Abandoned, &now())
            .unwrap();

        let msg = Message::new(session.id, MessageRole::Student, "还在吗？");
        assert!(matches!(
            store.append_turn(&session.id, &[msg], &now()),
            Err(DatabaseError::SessionNotActive {
                status: SessionStatus::Abandoned,
                ..
            })
        ));
    }

    #[test]
    fn abandon_idle_returns_reaped_ids() {
        let store = store();
        let base = now();
        let stale = Session::new("u1", "a", base - Duration::hours(48));
        let fresh = Session::new("u2", "a", base);
        for s in [&stale, &fresh] {
            let opening = Message::new(s.id, MessageRole::Patient, "…");
            store.create(s, &opening).unwrap();
        }

        let reaped = store
            .abandon_idle(&(base - Duration::hours(24)), &base)
            .unwrap();
        assert_eq!(reaped, vec![stale.id]);
        assert_eq!(
            store.get(&stale.id).unwrap().unwrap().status,
            SessionStatus::Abandoned
        );
        assert_eq!(
            store.get(&fresh.id).unwrap().unwrap().status,
            SessionStatus::Active
        );
        assert!(store
            .abandon_idle(&(base - Duration::hours(24)), &base)
            .unwrap()
            .is_empty());
    }
}
