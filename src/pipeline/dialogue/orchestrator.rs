use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Duration as ChronoDuration;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use super::emotion::infer_emotion;
use super::persona::{build_system_prompt, opening_statement, pain_level};
use super::provider::{history_window, GenerationParams, GenerationRequest, ProviderError, TextGenerator};
use super::DialogueError;
use crate::case_library::{case_or_placeholder, CaseProvider};
use crate::config::DialogueConfig;
use crate::db::{self, SessionStore, StartOutcome};
use crate::models::enums::{FallbackReason, MessageRole, SessionStatus};
use crate::models::{Case, Message, MessageMetadata, ScoreResult, Session};
use crate::pipeline::safety::{
    check_persona_consistency, classify_student_input, danger_warning, normalize_generated_text,
    sanitize_patient_reply, sanitize_student_input, should_refuse, ReplyRejection,
    CONFUSED_PATIENT_LINE, THINKING_PLACEHOLDER,
};
use crate::pipeline::scoring::RubricScorer;

/// Upper bound for an idle timeout that does not fit a chrono duration.
const MAX_IDLE_DAYS: i64 = 36_500;

/// How the reply to a turn was produced. Exactly one per turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// Generated by the provider and passed the output gate.
    Reply,
    /// Canned deflection; the provider was not called.
    Refusal,
    /// Supportive warning after a danger signal; the provider was not called.
    DangerWarning,
    /// Fixed text substituted for a failed or rejected generation.
    Fallback,
}

#[derive(Debug, Clone)]
pub struct TurnReply {
    pub session_id: Uuid,
    pub kind: ReplyKind,
    pub role: MessageRole,
    pub text: String,
    pub metadata: MessageMetadata,
    pub turn_count: u32,
}

#[derive(Debug, Clone)]
pub struct SessionStart {
    pub session: Session,
    pub opening: Message,
    pub resumed: bool,
}

struct Generated {
    text: String,
    fallback: Option<FallbackReason>,
}

impl Generated {
    fn fallback(text: &str, reason: FallbackReason) -> Self {
        Self {
            text: text.to_string(),
            fallback: Some(reason),
        }
    }
}

/// Drives sessions from start to score.
///
/// Turns on the same session are serialized by a per-session async lock;
/// turns on different sessions run in parallel. A turn's messages are
/// written in one store call after the provider has answered, so a turn
/// dropped mid-flight leaves the transcript untouched.
pub struct DialogueOrchestrator {
    store: Arc<dyn SessionStore>,
    cases: Arc<dyn CaseProvider>,
    generator: Arc<dyn TextGenerator>,
    scorer: RubricScorer,
    config: DialogueConfig,
    params: GenerationParams,
    turn_locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl DialogueOrchestrator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        cases: Arc<dyn CaseProvider>,
        generator: Arc<dyn TextGenerator>,
        scorer: RubricScorer,
        config: DialogueConfig,
        params: GenerationParams,
    ) -> Self {
        Self {
            store,
            cases,
            generator,
            scorer,
            config,
            params,
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &DialogueConfig {
        &self.config
    }

    fn case_for(&self, case_id: &str) -> Case {
        case_or_placeholder(self.cases.as_ref(), case_id)
    }

    fn session_lock(&self, session_id: &Uuid) -> Result<Arc<tokio::sync::Mutex<()>>, DialogueError> {
        let mut locks = self
            .turn_locks
            .lock()
            .map_err(|_| DialogueError::LockPoisoned)?;
        Ok(Arc::clone(locks.entry(*session_id).or_default()))
    }

    fn release_lock(&self, session_id: &Uuid) {
        if let Ok(mut locks) = self.turn_locks.lock() {
            locks.remove(session_id);
        }
    }

    /// Waits for the session's turn lock and returns the session, still
    /// active. Unknown or terminal ids never leave a lock entry behind.
    async fn lock_active(&self, session_id: &Uuid) -> Result<(OwnedMutexGuard<()>, Session), DialogueError> {
        self.require_active(session_id)?;
        let guard = self.session_lock(session_id)?.lock_owned().await;
        match self.require_active(session_id) {
            Ok(session) => Ok((guard, session)),
            Err(e) => {
                drop(guard);
                self.release_lock(session_id);
                Err(e)
            }
        }
    }

    fn require_session(&self, session_id: &Uuid) -> Result<Session, DialogueError> {
        self.store
            .get(session_id)?
            .ok_or(DialogueError::SessionNotFound(*session_id))
    }

    fn require_active(&self, session_id: &Uuid) -> Result<Session, DialogueError> {
        let session = self.require_session(session_id)?;
        if session.status != SessionStatus::Active {
            return Err(DialogueError::InvalidState {
                session_id: *session_id,
                status: session.status,
            });
        }
        Ok(session)
    }

    /// Resumes the active session for (user, case), or creates one with the
    /// persona's opening line as its first message.
    pub async fn start(&self, user_id: &str, case_id: &str) -> Result<SessionStart, DialogueError> {
        if let Some(existing) = self.store.find_active(user_id, case_id)? {
            return self.resume(existing);
        }

        let case = self.case_for(case_id);
        let session = Session::new(user_id, case_id, db::now());
        let opening = Message::new(session.id, MessageRole::Patient, opening_statement(&case))
            .with_metadata(MessageMetadata {
                opening: true,
                pain_level: Some(pain_level(&case)),
                ..MessageMetadata::default()
            });

        match self.store.create(&session, &opening)? {
            StartOutcome::Created(session) => {
                tracing::info!(session_id = %session.id, case_id, "Session started");
                Ok(SessionStart {
                    session,
                    opening,
                    resumed: false,
                })
            }
            StartOutcome::Resumed(existing) => self.resume(existing),
        }
    }

    fn resume(&self, session: Session) -> Result<SessionStart, DialogueError> {
        let transcript = self.store.list_messages(&session.id)?;
        let opening = transcript
            .iter()
            .find(|m| m.metadata.opening)
            .or_else(|| transcript.first())
            .cloned()
            .ok_or_else(|| DialogueError::Storage(db::DatabaseError::NotFound {
                entity_type: "OpeningMessage".into(),
                id: session.id.to_string(),
            }))?;
        tracing::info!(session_id = %session.id, turn_count = session.turn_count, "Session resumed");
        Ok(SessionStart {
            session,
            opening,
            resumed: true,
        })
    }

    /// One student message in, one reply out.
    pub async fn turn(&self, session_id: &Uuid, text: &str) -> Result<TurnReply, DialogueError> {
        let (_guard, session) = self.lock_active(session_id).await?;

        let input = sanitize_student_input(text, self.config.max_input_chars);
        let student = Message::new(*session_id, MessageRole::Student, input.text.clone())
            .with_metadata(MessageMetadata {
                input_filtered: input.was_modified,
                ..MessageMetadata::default()
            });

        let classification = classify_student_input(&input.text);
        let (kind, role, reply_text, metadata) = if let Some(signal) = classification.signal {
            tracing::warn!(session_id = %session_id, signal = %signal, "Danger signal, provider skipped");
            (
                ReplyKind::DangerWarning,
                MessageRole::System,
                danger_warning(signal).to_string(),
                MessageMetadata {
                    danger: Some(signal),
                    ..MessageMetadata::default()
                },
            )
        } else if let Some(refusal) = should_refuse(&input.text) {
            (
                ReplyKind::Refusal,
                MessageRole::Patient,
                refusal.canned_reply.to_string(),
                MessageMetadata {
                    refusal: Some(refusal.category),
                    ..MessageMetadata::default()
                },
            )
        } else {
            let case = self.case_for(&session.case_id);
            let generated = self.generate_reply(&session, &case, &input.text).await?;
            let emotion = match generated.fallback {
                Some(
                    FallbackReason::ProviderError
                    | FallbackReason::ProviderTimeout
                    | FallbackReason::EmptyCompletion,
                ) => None,
                _ => Some(infer_emotion(&generated.text)),
            };
            let kind = if generated.fallback.is_some() {
                ReplyKind::Fallback
            } else {
                ReplyKind::Reply
            };
            (
                kind,
                MessageRole::Patient,
                generated.text,
                MessageMetadata {
                    emotion,
                    pain_level: Some(pain_level(&case)),
                    fallback: generated.fallback,
                    ..MessageMetadata::default()
                },
            )
        };

        let reply = Message::new(*session_id, role, reply_text).with_metadata(metadata);
        let updated = self
            .store
            .append_turn(session_id, &[student, reply.clone()], &reply.timestamp)
            .map_err(|e| {
                tracing::error!(session_id = %session_id, error = %e, "Failed to record turn");
                DialogueError::from(e)
            })?;

        tracing::debug!(
            session_id = %session_id,
            turn_count = updated.turn_count,
            kind = ?kind,
            "Turn recorded"
        );

        Ok(TurnReply {
            session_id: *session_id,
            kind,
            role,
            text: reply.content,
            metadata: reply.metadata,
            turn_count: updated.turn_count,
        })
    }

    async fn generate_reply(
        &self,
        session: &Session,
        case: &Case,
        question: &str,
    ) -> Result<Generated, DialogueError> {
        let transcript = self.store.list_messages(&session.id)?;
        let request = GenerationRequest {
            system_prompt: build_system_prompt(case),
            history: history_window(&transcript, self.config.history_window),
            new_message: question.to_string(),
            params: self.params,
        };

        let outcome = tokio::time::timeout(self.params.timeout, self.generator.generate(&request)).await;
        let raw = match outcome {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                tracing::warn!(session_id = %session.id, error = %e, "Generation failed, using placeholder");
                let reason = match e {
                    ProviderError::Timeout(_) => FallbackReason::ProviderTimeout,
                    ProviderError::EmptyCompletion => FallbackReason::EmptyCompletion,
                    _ => FallbackReason::ProviderError,
                };
                return Ok(Generated::fallback(THINKING_PLACEHOLDER, reason));
            }
            Err(_) => {
                tracing::warn!(
                    session_id = %session.id,
                    timeout_secs = self.params.timeout.as_secs_f32(),
                    "Generation timed out, using placeholder"
                );
                return Ok(Generated::fallback(THINKING_PLACEHOLDER, FallbackReason::ProviderTimeout));
            }
        };

        let normalized = normalize_generated_text(&raw);
        if normalized.is_empty() {
            tracing::warn!(session_id = %session.id, "Empty generation, using placeholder");
            return Ok(Generated::fallback(THINKING_PLACEHOLDER, FallbackReason::EmptyCompletion));
        }

        let sanitized = sanitize_patient_reply(&normalized);
        if !check_persona_consistency(&sanitized.text) {
            tracing::warn!(session_id = %session.id, "Reply broke persona, substituting");
            return Ok(Generated::fallback(CONFUSED_PATIENT_LINE, FallbackReason::PersonaBreak));
        }

        let fallback = sanitized.rejection.map(|r| match r {
            ReplyRejection::DiagnosisAsserted => FallbackReason::DiagnosisAsserted,
            ReplyRejection::TreatmentAsserted => FallbackReason::TreatmentAsserted,
        });
        Ok(Generated {
            text: sanitized.text,
            fallback,
        })
    }

    /// Records the diagnosis, scores the transcript and completes the session.
    pub async fn end(&self, session_id: &Uuid, diagnosis: &str) -> Result<ScoreResult, DialogueError> {
        let (guard, session) = self.lock_active(session_id).await?;
        let case = self.case_for(&session.case_id);
        let transcript = self.store.list_messages(session_id)?;
        let diagnosis = diagnosis.trim();

        let result = self.scorer.score(&case, &transcript, diagnosis);
        self.store
            .complete(session_id, diagnosis, &result, &db::now())
            .map_err(|e| {
                tracing::error!(session_id = %session_id, error = %e, "Failed to complete session");
                DialogueError::from(e)
            })?;

        tracing::info!(
            session_id = %session_id,
            turn_count = session.turn_count,
            final_score = result.final_score,
            grade = %result.grade,
            passed = result.passed,
            "Session completed"
        );
        drop(guard);
        self.release_lock(session_id);
        Ok(result)
    }

    /// Re-scores a completed session from its saved transcript and diagnosis
    /// and overwrites the stored score.
    pub async fn rescore(&self, session_id: &Uuid) -> Result<ScoreResult, DialogueError> {
        let session = self.require_session(session_id)?;
        if session.status != SessionStatus::Completed {
            return Err(DialogueError::InvalidState {
                session_id: *session_id,
                status: session.status,
            });
        }

        let case = self.case_for(&session.case_id);
        let transcript = self.store.list_messages(session_id)?;
        let diagnosis = session.submitted_diagnosis.as_deref().unwrap_or_default();
        let result = self.scorer.score(&case, &transcript, diagnosis);
        self.store.set_score(session_id, &result, &db::now())?;

        tracing::info!(session_id = %session_id, final_score = result.final_score, "Session rescored");
        Ok(result)
    }

    pub fn session(&self, session_id: &Uuid) -> Result<Session, DialogueError> {
        self.require_session(session_id)
    }

    pub fn transcript(&self, session_id: &Uuid) -> Result<Vec<Message>, DialogueError> {
        self.require_session(session_id)?;
        Ok(self.store.list_messages(session_id)?)
    }

    /// Persisted score of a completed session.
    pub fn score(&self, session_id: &Uuid) -> Result<Option<ScoreResult>, DialogueError> {
        self.require_session(session_id)?;
        Ok(self.store.get_score(session_id)?)
    }

    pub fn user_sessions(&self, user_id: &str) -> Result<Vec<Session>, DialogueError> {
        Ok(self.store.list_for_user(user_id)?)
    }

    /// Abandons sessions idle longer than the configured timeout.
    pub fn reap_idle(&self) -> Result<Vec<Uuid>, DialogueError> {
        let now = db::now();
        let idle = ChronoDuration::from_std(self.config.idle_timeout)
            .unwrap_or_else(|_| ChronoDuration::days(MAX_IDLE_DAYS));
        let cutoff = now
            .checked_sub_signed(idle)
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MIN_UTC);

        let reaped = self.store.abandon_idle(&cutoff, &now)?;
        for id in &reaped {
            self.release_lock(id);
        }
        tracing::info!(reaped = reaped.len(), "Idle sweep");
        Ok(reaped)
    }
}
