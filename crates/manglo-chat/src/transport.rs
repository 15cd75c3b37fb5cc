//! Transport abstraction between the session and the wire client

use async_trait::async_trait;
use manglo_api::{AssistantClient, DeltaStream, Result, Turn};

/// Transport for reaching the assistant service.
///
/// The seam exists so the session state machine can be exercised against
/// scripted transports in tests; production code uses [`ClientTransport`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the streaming reply for the given turns
    async fn stream(&self, turns: Vec<Turn>) -> Result<DeltaStream>;

    /// Non-streaming completion carrying only the latest user text
    async fn complete(&self, message: &str) -> Result<String>;

    /// Fire-and-forget server-side history reset
    async fn clear_history(&self);

    /// Whether send/stream actions are permitted
    async fn check_auth(&self) -> Result<bool>;
}

/// Direct transport that calls the service endpoints through [`AssistantClient`]
pub struct ClientTransport {
    client: AssistantClient,
}

impl ClientTransport {
    /// Create a transport over the given client
    pub fn new(client: AssistantClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ClientTransport {
    async fn stream(&self, turns: Vec<Turn>) -> Result<DeltaStream> {
        self.client.stream(&turns).await
    }

    async fn complete(&self, message: &str) -> Result<String> {
        self.client.complete(message).await
    }

    async fn clear_history(&self) {
        self.client.clear_history().await;
    }

    async fn check_auth(&self) -> Result<bool> {
        self.client.check_auth().await
    }
}
