//! Conversation state: message history, in-flight buffer, and phase

use chrono::{DateTime, Utc};
use manglo_api::{Role, Turn};
use serde::{Deserialize, Serialize};

/// Greeting that seeds every fresh conversation
pub const GREETING: &str = "Hello! I'm your mango disease assistant. I can help you with \
questions about mango diseases, treatments, and farming practices. How can I help you today?";

/// A committed transcript entry. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a user message stamped now
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    /// Create an assistant message stamped now
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    /// Role-tagged turn for the wire
    pub fn to_turn(&self) -> Turn {
        Turn {
            role: self.role,
            content: self.text.clone(),
        }
    }
}

/// Lifecycle phase of the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No exchange in flight
    #[default]
    Idle,
    /// Request issued, no reply events yet
    Sending,
    /// Reply events arriving
    Streaming,
    /// Authentication rejected; sending is disabled
    Error,
}

/// Conversation state: history, the single in-flight buffer, and phase.
///
/// History is append-only during normal operation; `reset` is the one
/// operation that replaces it (with the greeting seed). At most one stream
/// buffer exists at a time.
#[derive(Debug)]
pub struct Conversation {
    /// Committed messages, in causal order
    pub messages: Vec<ChatMessage>,
    /// Accumulated text of the in-flight exchange
    pub stream_buffer: Option<String>,
    /// Current lifecycle phase
    pub phase: Phase,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::seeded()
    }
}

impl Conversation {
    /// A fresh conversation opened by the greeting
    pub fn seeded() -> Self {
        Self {
            messages: vec![ChatMessage::assistant(GREETING)],
            stream_buffer: None,
            phase: Phase::Idle,
        }
    }

    /// Append a committed message
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Replace history with the greeting seed and drop any buffer
    pub fn reset(&mut self) {
        self.messages = vec![ChatMessage::assistant(GREETING)];
        self.stream_buffer = None;
    }

    /// The full history as role-tagged wire turns
    pub fn turns(&self) -> Vec<Turn> {
        self.messages.iter().map(ChatMessage::to_turn).collect()
    }

    /// Grow the in-flight buffer by one delta
    pub fn push_delta(&mut self, delta: &str) {
        match &mut self.stream_buffer {
            Some(buffer) => buffer.push_str(delta),
            None => self.stream_buffer = Some(delta.to_string()),
        }
    }
}
