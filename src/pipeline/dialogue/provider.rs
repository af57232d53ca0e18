use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::ProviderConfig;
use crate::models::enums::MessageRole;
use crate::models::Message;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Text generation service unreachable at {0}")]
    Connection(String),

    #[error("Text generation timed out after {0}s")]
    Timeout(u64),

    #[error("Text generation service returned error (status {status}): {body}")]
    Http { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Text generation returned no content")]
    EmptyCompletion,
}

/// Role names on the chat wire: the student speaks as `user`, the simulated
/// patient answers as `assistant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Sampling parameters forwarded with every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl From<&ProviderConfig> for GenerationParams {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: config.timeout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub history: Vec<ChatMessage>,
    pub new_message: String,
    pub params: GenerationParams,
}

impl GenerationRequest {
    /// Full message list in wire order: system prompt, history, new message.
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut out = Vec::with_capacity(self.history.len() + 2);
        out.push(ChatMessage::new(ChatRole::System, self.system_prompt.clone()));
        out.extend(self.history.iter().cloned());
        out.push(ChatMessage::new(ChatRole::User, self.new_message.clone()));
        out
    }
}

/// Last `window` student/patient messages of `transcript` as chat history.
/// System notices never reach the model and do not use up the window.
pub fn history_window(transcript: &[Message], window: usize) -> Vec<ChatMessage> {
    let mut history: Vec<ChatMessage> = transcript
        .iter()
        .rev()
        .filter_map(|m| {
            let role = match m.role {
                MessageRole::Student => ChatRole::User,
                MessageRole::Patient => ChatRole::Assistant,
                MessageRole::System => return None,
            };
            Some(ChatMessage::new(role, m.content.clone()))
        })
        .take(window)
        .collect();
    history.reverse();
    history
}

/// Text generation seam for the simulated patient.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn params() -> GenerationParams {
        GenerationParams::from(&ProviderConfig::default())
    }

    #[test]
    fn messages_in_wire_order() {
        let request = GenerationRequest {
            system_prompt: "你是病人".into(),
            history: vec![
                ChatMessage::new(ChatRole::User, "哪里疼"),
                ChatMessage::new(ChatRole::Assistant, "胸口"),
            ],
            new_message: "多久了".into(),
            params: params(),
        };
        let roles: Vec<ChatRole> = request.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![ChatRole::System, ChatRole::User, ChatRole::Assistant, ChatRole::User]
        );
        assert_eq!(request.messages().last().unwrap().content, "多久了");
    }

    #[test]
    fn history_keeps_last_window_and_drops_system() {
        let sid = Uuid::new_v4();
        let mut transcript = vec![Message::new(sid, MessageRole::Patient, "开场")];
        for i in 0..8 {
            transcript.push(Message::new(sid, MessageRole::Student, format!("问{i}")));
            transcript.push(Message::new(sid, MessageRole::Patient, format!("答{i}")));
        }
        transcript.push(Message::new(sid, MessageRole::System, "请注意文明用语"));

        let history = history_window(&transcript, 10);
        assert_eq!(history.len(), 10);
        assert_eq!(history[0].content, "问3");
        assert_eq!(history[0].role, ChatRole::User);
        assert_eq!(history.last().unwrap().content, "答7");
    }

    #[test]
    fn system_notices_do_not_shrink_window() {
        let sid = Uuid::new_v4();
        let mut transcript = Vec::new();
        for i in 0..6 {
            transcript.push(Message::new(sid, MessageRole::Student, format!("问{i}")));
            transcript.push(Message::new(sid, MessageRole::System, "请及时就医"));
        }

        let history = history_window(&transcript, 4);
        let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["问2", "问3", "问4", "问5"]);
    }

    #[test]
    fn short_transcript_fully_included() {
        let sid = Uuid::new_v4();
        let transcript = vec![Message::new(sid, MessageRole::Patient, "医生您好")];
        let history = history_window(&transcript, 10);
        assert_eq!(history, vec![ChatMessage::new(ChatRole::Assistant, "医生您好")]);
    }

    #[test]
    fn params_follow_provider_config() {
        let p = params();
        assert_eq!(p.max_tokens, 500);
        assert_eq!(p.timeout, Duration::from_secs(30));
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_string(&ChatMessage::new(ChatRole::Assistant, "嗯")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"嗯"}"#);
    }
}
