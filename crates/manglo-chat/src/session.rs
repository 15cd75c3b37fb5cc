//! Chat session: the exchange state machine
//!
//! One session drives one conversation. An exchange moves through
//! `Idle → Sending → Streaming → Idle`; a transport failure triggers the
//! fallback protocol, an abort discards the buffer and commits nothing, and
//! every failed exchange still resolves to a normal assistant message so the
//! transcript stays renderable.

use std::sync::Arc;

use futures::StreamExt;
use manglo_api::{DeltaStream, StreamEvent};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::{
    conversation::{ChatMessage, Conversation, Phase},
    error::{Error, Result},
    events::SessionEvent,
    handle::SessionHandle,
    transport::Transport,
};

/// Fixed apology committed when both request paths fail
pub const FALLBACK_APOLOGY: &str =
    "Sorry, I'm having trouble connecting. Please check your internet connection and try again.";

/// Committed when the service rejects the caller's credentials
pub const LOGIN_PROMPT: &str = "Please log in to use the chatbot feature.";

/// How consuming the reply stream ended
enum StreamOutcome {
    /// Sentinel seen; carries the full reply text
    Completed(String),
    /// Transport or protocol failure; fallback should run
    Failed(String),
    /// Cancelled by the user
    Aborted,
}

/// The session owning conversation state and the exchange lifecycle
pub struct ChatSession {
    conversation: Conversation,
    transport: Arc<dyn Transport>,
    event_tx: broadcast::Sender<SessionEvent>,
    handle: SessionHandle,
    authenticated: bool,
}

impl ChatSession {
    /// Create a session over the given transport
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            conversation: Conversation::seeded(),
            transport,
            event_tx,
            handle: SessionHandle::new(),
            authenticated: true,
        }
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Get a cloneable handle for aborting from outside the session task
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Get the conversation state
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Get the committed history
    pub fn messages(&self) -> &[ChatMessage] {
        &self.conversation.messages
    }

    /// Get the current phase
    pub fn phase(&self) -> Phase {
        self.conversation.phase
    }

    /// Whether sending is currently permitted
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Abort the in-flight exchange, if any
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Query the capability gate, updating the session's auth state.
    ///
    /// Called once at mount; a gate failure counts as unauthenticated.
    pub async fn check_auth(&mut self) -> bool {
        self.authenticated = match self.transport.check_auth().await {
            Ok(authenticated) => authenticated,
            Err(e) => {
                tracing::warn!("auth check failed: {}", e);
                false
            }
        };
        if self.authenticated {
            if self.conversation.phase == Phase::Error {
                self.conversation.phase = Phase::Idle;
            }
        } else {
            self.conversation.phase = Phase::Error;
            let _ = self.event_tx.send(SessionEvent::AuthRequired);
        }
        self.authenticated
    }

    /// Send a user message and drive the exchange to completion.
    ///
    /// Commits the user turn, streams the reply into the in-flight buffer
    /// (emitting `Delta` per fragment), and resolves to exactly one committed
    /// assistant message (streamed, fallback, or apology) unless aborted.
    /// Rejects with [`Error::Busy`] while another exchange is in flight.
    pub async fn send(&mut self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        match self.conversation.phase {
            Phase::Idle => {}
            Phase::Error => {
                self.fail_auth();
                return Ok(());
            }
            Phase::Sending | Phase::Streaming => return Err(Error::Busy),
        }
        if !self.authenticated {
            self.fail_auth();
            return Ok(());
        }

        let exchange = uuid::Uuid::new_v4();
        let user = ChatMessage::user(text);
        self.conversation.push(user.clone());
        let _ = self.event_tx.send(SessionEvent::SendStart { message: user });
        self.conversation.phase = Phase::Sending;
        let cancel = self.handle.arm();

        tracing::debug!(exchange = %exchange, "opening reply stream");
        let turns = self.conversation.turns();
        let outcome = match self.transport.stream(turns).await {
            Ok(stream) => self.consume_stream(stream, &cancel).await,
            Err(e) if e.is_auth() => {
                self.fail_auth();
                return Ok(());
            }
            Err(e) => StreamOutcome::Failed(e.to_string()),
        };

        match outcome {
            StreamOutcome::Completed(reply) => {
                self.conversation.stream_buffer = None;
                if reply.trim().is_empty() {
                    // Degenerate upstream reply; nothing worth committing.
                    tracing::debug!(exchange = %exchange, "empty reply, nothing committed");
                    self.conversation.phase = Phase::Idle;
                } else {
                    tracing::debug!(exchange = %exchange, chars = reply.len(), "reply committed");
                    self.commit(ChatMessage::assistant(reply));
                }
            }
            StreamOutcome::Aborted => {
                tracing::debug!(exchange = %exchange, "exchange aborted");
                self.conversation.stream_buffer = None;
                self.conversation.phase = Phase::Idle;
                let _ = self.event_tx.send(SessionEvent::Aborted);
            }
            StreamOutcome::Failed(reason) => {
                tracing::warn!(exchange = %exchange, "stream failed: {}", reason);
                self.conversation.stream_buffer = None;
                self.fallback(text, &cancel).await;
            }
        }
        Ok(())
    }

    /// Reset the conversation to the greeting seed.
    ///
    /// The server-side clear is fire-and-forget; the local reset never
    /// depends on its outcome.
    pub async fn clear(&mut self) -> Result<()> {
        if matches!(self.conversation.phase, Phase::Sending | Phase::Streaming) {
            return Err(Error::Busy);
        }
        self.transport.clear_history().await;
        self.conversation.reset();
        let _ = self.event_tx.send(SessionEvent::Cleared);
        Ok(())
    }

    /// Drain the reply stream, growing the buffer per delta.
    ///
    /// The cancellation token is observed at every stream read; processing
    /// between reads runs to completion.
    async fn consume_stream(
        &mut self,
        mut stream: DeltaStream,
        cancel: &CancellationToken,
    ) -> StreamOutcome {
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => return StreamOutcome::Aborted,
                event = stream.next() => event,
            };
            let Some(event) = event else {
                return StreamOutcome::Failed("reply stream ended unexpectedly".to_string());
            };
            if self.conversation.phase == Phase::Sending {
                self.conversation.phase = Phase::Streaming;
                let _ = self.event_tx.send(SessionEvent::StreamStart);
            }
            match event {
                StreamEvent::Delta { text } => {
                    self.conversation.push_delta(&text);
                    let _ = self.event_tx.send(SessionEvent::Delta { text });
                }
                StreamEvent::Done { text } => return StreamOutcome::Completed(text),
                StreamEvent::Error { message } => return StreamOutcome::Failed(message),
            }
        }
    }

    /// Fallback protocol: one non-streaming request with the latest user
    /// text, then exactly one committed assistant message.
    async fn fallback(&mut self, user_text: &str, cancel: &CancellationToken) {
        tracing::info!("falling back to non-streaming request");
        let result = tokio::select! {
            _ = cancel.cancelled() => {
                self.conversation.phase = Phase::Idle;
                let _ = self.event_tx.send(SessionEvent::Aborted);
                return;
            }
            result = self.transport.complete(user_text) => result,
        };
        match result {
            Ok(reply) => self.commit(ChatMessage::assistant(reply)),
            Err(e) if e.is_auth() => self.fail_auth(),
            Err(e) => {
                tracing::warn!("fallback request failed: {}", e);
                self.commit(ChatMessage::assistant(FALLBACK_APOLOGY));
            }
        }
    }

    /// Commit one assistant message and return to Idle
    fn commit(&mut self, message: ChatMessage) {
        self.conversation.stream_buffer = None;
        self.conversation.push(message.clone());
        self.conversation.phase = Phase::Idle;
        let _ = self.event_tx.send(SessionEvent::Final { message });
    }

    /// Authentication is missing or was rejected: disable sending and leave
    /// a login prompt in the transcript so it explains itself
    fn fail_auth(&mut self) {
        self.authenticated = false;
        self.commit(ChatMessage::assistant(LOGIN_PROMPT));
        self.conversation.phase = Phase::Error;
        let _ = self.event_tx.send(SessionEvent::AuthRequired);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manglo_api::{Role, Turn};
    use parking_lot::Mutex;

    /// What `complete` should answer with
    enum CompleteScript {
        Reply(String),
        AuthError,
        Failure,
    }

    /// Scripted transport for exercising the state machine without a network
    struct FakeTransport {
        /// Events the stream yields, in order
        events: Vec<StreamEvent>,
        /// `stream()` itself fails with this status instead of opening
        stream_status_error: Option<u16>,
        /// After the scripted events, abort via this handle and hang
        abort_after_events: Mutex<Option<SessionHandle>>,
        complete: CompleteScript,
        complete_calls: Mutex<Vec<String>>,
        cleared: Mutex<bool>,
        auth_ok: bool,
    }

    impl FakeTransport {
        fn streaming(events: Vec<StreamEvent>) -> Self {
            Self {
                events,
                stream_status_error: None,
                abort_after_events: Mutex::new(None),
                complete: CompleteScript::Failure,
                complete_calls: Mutex::new(Vec::new()),
                cleared: Mutex::new(false),
                auth_ok: true,
            }
        }

        fn with_complete(mut self, script: CompleteScript) -> Self {
            self.complete = script;
            self
        }

        fn complete_calls(&self) -> Vec<String> {
            self.complete_calls.lock().clone()
        }
    }

    #[async_trait::async_trait]
    impl Transport for FakeTransport {
        async fn stream(&self, _turns: Vec<Turn>) -> manglo_api::Result<DeltaStream> {
            if let Some(status) = self.stream_status_error {
                return Err(manglo_api::Error::api(status, "stream rejected"));
            }
            let events = self.events.clone();
            let abort = self.abort_after_events.lock().clone();
            Ok(Box::pin(async_stream::stream! {
                for event in events {
                    yield event;
                }
                if let Some(handle) = abort {
                    handle.abort();
                    futures::future::pending::<()>().await;
                }
            }))
        }

        async fn complete(&self, message: &str) -> manglo_api::Result<String> {
            self.complete_calls.lock().push(message.to_string());
            match &self.complete {
                CompleteScript::Reply(text) => Ok(text.clone()),
                CompleteScript::AuthError => {
                    Err(manglo_api::Error::Auth("Authentication required".into()))
                }
                CompleteScript::Failure => Err(manglo_api::Error::api(503, "unavailable")),
            }
        }

        async fn clear_history(&self) {
            *self.cleared.lock() = true;
        }

        async fn check_auth(&self) -> manglo_api::Result<bool> {
            Ok(self.auth_ok)
        }
    }

    fn delta(text: &str) -> StreamEvent {
        StreamEvent::Delta { text: text.into() }
    }

    fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_streamed_reply_commits_exactly_once() {
        let transport = Arc::new(FakeTransport::streaming(vec![
            delta("Hel"),
            delta("lo"),
            StreamEvent::Done {
                text: "Hello".into(),
            },
        ]));
        let mut session = ChatSession::new(transport);
        let mut rx = session.subscribe();

        session.send("hi there").await.unwrap();

        // greeting + user + assistant
        assert_eq!(session.messages().len(), 3);
        let last = session.messages().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.text, "Hello");
        assert!(session.conversation().stream_buffer.is_none());
        assert_eq!(session.phase(), Phase::Idle);

        let events = drain(&mut rx);
        let deltas: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Delta { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(deltas, vec!["Hel", "lo"]);
        assert!(events.iter().any(|e| matches!(e, SessionEvent::Final { .. })));
    }

    #[tokio::test]
    async fn test_abort_mid_stream_commits_nothing() {
        let transport = Arc::new(FakeTransport::streaming(vec![delta("Hel")]));
        let mut session = ChatSession::new(Arc::clone(&transport) as Arc<dyn Transport>);
        *transport.abort_after_events.lock() = Some(session.handle());
        let mut rx = session.subscribe();

        session.send("hi").await.unwrap();

        // greeting + user only; the partial buffer is discarded
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages().last().unwrap().role, Role::User);
        assert!(session.conversation().stream_buffer.is_none());
        assert_eq!(session.phase(), Phase::Idle);
        assert!(
            drain(&mut rx)
                .iter()
                .any(|e| matches!(e, SessionEvent::Aborted))
        );
    }

    #[tokio::test]
    async fn test_midstream_failure_runs_fallback_once() {
        let transport = Arc::new(
            FakeTransport::streaming(vec![
                delta("par"),
                StreamEvent::Error {
                    message: "connection reset".into(),
                },
            ])
            .with_complete(CompleteScript::Reply("Use copper-based fungicides.".into())),
        );
        let mut session = ChatSession::new(Arc::clone(&transport) as Arc<dyn Transport>);

        session.send("How to treat anthracnose?").await.unwrap();

        assert_eq!(
            transport.complete_calls(),
            vec!["How to treat anthracnose?"]
        );
        assert_eq!(session.messages().len(), 3);
        assert_eq!(
            session.messages().last().unwrap().text,
            "Use copper-based fungicides."
        );
        assert!(session.conversation().stream_buffer.is_none());
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_open_failure_runs_fallback() {
        let mut transport =
            FakeTransport::streaming(vec![]).with_complete(CompleteScript::Reply("ok".into()));
        transport.stream_status_error = Some(500);
        let transport = Arc::new(transport);
        let mut session = ChatSession::new(Arc::clone(&transport) as Arc<dyn Transport>);

        session.send("hi").await.unwrap();

        assert_eq!(transport.complete_calls(), vec!["hi"]);
        assert_eq!(session.messages().last().unwrap().text, "ok");
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_secondary_failure_commits_apology() {
        let transport = Arc::new(
            FakeTransport::streaming(vec![StreamEvent::Error {
                message: "boom".into(),
            }])
            .with_complete(CompleteScript::Failure),
        );
        let mut session = ChatSession::new(Arc::clone(&transport) as Arc<dyn Transport>);

        session.send("hi").await.unwrap();

        assert_eq!(transport.complete_calls().len(), 1);
        assert_eq!(session.messages().len(), 3);
        assert_eq!(session.messages().last().unwrap().text, FALLBACK_APOLOGY);
        assert_eq!(session.messages().last().unwrap().role, Role::Assistant);
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_fallback_auth_rejection_disables_sending() {
        let transport = Arc::new(
            FakeTransport::streaming(vec![StreamEvent::Error {
                message: "boom".into(),
            }])
            .with_complete(CompleteScript::AuthError),
        );
        let mut session = ChatSession::new(Arc::clone(&transport) as Arc<dyn Transport>);

        session.send("hi").await.unwrap();

        assert!(!session.is_authenticated());
        assert_eq!(session.phase(), Phase::Error);
        assert_eq!(session.messages().last().unwrap().text, LOGIN_PROMPT);
    }

    #[tokio::test]
    async fn test_auth_gate_blocks_send_without_network() {
        let mut transport = FakeTransport::streaming(vec![]);
        transport.auth_ok = false;
        let transport = Arc::new(transport);
        let mut session = ChatSession::new(Arc::clone(&transport) as Arc<dyn Transport>);

        assert!(!session.check_auth().await);
        session.send("hi").await.unwrap();

        // no user turn appended, no fallback issued
        assert!(transport.complete_calls().is_empty());
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages().last().unwrap().text, LOGIN_PROMPT);
        assert_eq!(session.phase(), Phase::Error);
    }

    #[tokio::test]
    async fn test_empty_input_is_a_no_op() {
        let transport = Arc::new(FakeTransport::streaming(vec![]));
        let mut session = ChatSession::new(transport);
        session.send("   ").await.unwrap();
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_clear_reseeds_history() {
        let transport = Arc::new(FakeTransport::streaming(vec![StreamEvent::Done {
            text: "Hi!".into(),
        }]));
        let mut session = ChatSession::new(Arc::clone(&transport) as Arc<dyn Transport>);

        session.send("hello").await.unwrap();
        assert_eq!(session.messages().len(), 3);

        session.clear().await.unwrap();
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].text, crate::conversation::GREETING);
        assert!(*transport.cleared.lock());
    }
}
