//! Core types for the assistant wire contract

use serde::{Deserialize, Serialize};

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Get the wire name for this role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One role-tagged turn of the conversation, as the streaming endpoint
/// expects it: prior history plus the new user turn, in causal order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Request body for the streaming endpoint
#[derive(Debug, Serialize)]
pub(crate) struct StreamRequest<'a> {
    pub messages: &'a [Turn],
}

/// Request body for the simplified (non-streaming) endpoint
#[derive(Debug, Serialize)]
pub(crate) struct CompleteRequest<'a> {
    pub message: &'a str,
}

/// Response body of the simplified endpoint: `response` on success,
/// `error` alongside a non-success status otherwise.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CompleteResponse {
    pub response: Option<String>,
    pub error: Option<String>,
}

/// Response body of the auth-check endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct AuthCheckResponse {
    pub authenticated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn test_turn_wire_shape() {
        let turn = Turn::user("How to treat anthracnose?");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"role": "user", "content": "How to treat anthracnose?"})
        );
    }

    #[test]
    fn test_complete_response_error_shape() {
        let body: CompleteResponse =
            serde_json::from_str(r#"{"error": "Authentication required"}"#).unwrap();
        assert!(body.response.is_none());
        assert_eq!(body.error.as_deref(), Some("Authentication required"));
    }
}
