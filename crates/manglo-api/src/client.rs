//! HTTP client for the assistant service

use crate::{
    error::{Error, Result},
    stream::{DeltaStream, delta_stream},
    types::{AuthCheckResponse, CompleteRequest, CompleteResponse, StreamRequest, Turn},
};
use reqwest::StatusCode;

/// Client for the assistant backend endpoints
#[derive(Debug, Clone)]
pub struct AssistantClient {
    client: reqwest::Client,
    base_url: String,
}

impl AssistantClient {
    /// Create a new client for the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Get the configured base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Open the streaming chat endpoint for the given turns.
    ///
    /// The request carries the ordered prior history plus the new user turn.
    /// Fails fast on a non-success status (401-class maps to [`Error::Auth`]);
    /// otherwise returns the reply as a [`DeltaStream`].
    pub async fn stream(&self, turns: &[Turn]) -> Result<DeltaStream> {
        let url = format!("{}/api/chat/stream", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&StreamRequest { messages: turns })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        tracing::debug!(url = %url, turns = turns.len(), "stream opened");
        Ok(Box::pin(delta_stream(response.bytes_stream())))
    }

    /// Single-shot completion against the simplified endpoint.
    ///
    /// Carries only the latest user text, matching that endpoint's contract.
    pub async fn complete(&self, message: &str) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&CompleteRequest { message })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: CompleteResponse = response.json().await.unwrap_or_default();
            let message = body
                .error
                .unwrap_or_else(|| format!("request failed with status {}", status));
            return Err(status_error(status, message));
        }

        let body: CompleteResponse = response.json().await?;
        body.response
            .ok_or_else(|| Error::Protocol("response field missing from completion".to_string()))
    }

    /// Ask the server to drop its stored history.
    ///
    /// Fire-and-forget: failures are logged and never surfaced, and the
    /// caller's local reset proceeds regardless.
    pub async fn clear_history(&self) {
        let url = format!("{}/api/chat/clear", self.base_url);
        match self.client.post(&url).send().await {
            Ok(response) if !response.status().is_success() => {
                tracing::warn!(status = %response.status(), "server history clear rejected");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("server history clear failed: {}", e);
            }
        }
    }

    /// Mount-time capability gate: whether send/stream actions are permitted
    pub async fn check_auth(&self) -> Result<bool> {
        let url = format!("{}/api/check-auth", self.base_url);
        let body: AuthCheckResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.authenticated)
    }
}

/// Map a non-success status to the error taxonomy
fn status_error(status: StatusCode, message: String) -> Error {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        Error::Auth(message)
    } else {
        Error::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = AssistantClient::new("http://localhost:5000/");
        assert_eq!(client.base_url(), "http://localhost:5000");
    }

    #[test]
    fn test_status_error_maps_401_to_auth() {
        let err = status_error(StatusCode::UNAUTHORIZED, "Authentication required".into());
        assert!(err.is_auth());
    }

    #[test]
    fn test_status_error_maps_500_to_api() {
        let err = status_error(StatusCode::INTERNAL_SERVER_ERROR, "boom".into());
        assert!(matches!(err, Error::Api { status: 500, .. }));
        assert!(!err.is_auth());
    }
}
