//! Session event types

use crate::conversation::ChatMessage;
use serde::{Deserialize, Serialize};

/// Events emitted while a session processes an exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A user message was committed and an exchange began
    SendStart { message: ChatMessage },

    /// First reply event arrived; the exchange is streaming
    StreamStart,

    /// An incremental fragment arrived; the buffer grew by `text`
    Delta { text: String },

    /// Exactly one assistant message was committed for the exchange
    /// (streamed reply, fallback reply, or the apology)
    Final { message: ChatMessage },

    /// The exchange was cancelled; nothing was committed
    Aborted,

    /// Authentication was rejected; sending is disabled
    AuthRequired,

    /// History was reset to the greeting seed
    Cleared,
}

impl SessionEvent {
    /// Check if this event ends an exchange
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionEvent::Final { .. } | SessionEvent::Aborted)
    }
}
