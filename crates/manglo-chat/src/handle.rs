//! A cloneable handle for aborting the in-flight exchange

use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Cloneable handle that can abort the in-flight exchange from outside the
/// session task (e.g. the UI's Esc handler) without borrowing the session.
///
/// The token behind the handle is 1:1 with an exchange: [`arm`](Self::arm)
/// installs a fresh one at send, and it is consumed exactly once, by natural
/// completion or by [`abort`](Self::abort).
#[derive(Clone, Default)]
pub struct SessionHandle {
    cancel: Arc<Mutex<CancellationToken>>,
}

impl SessionHandle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Abort the current exchange, if any
    pub fn abort(&self) {
        self.cancel.lock().cancel();
    }

    /// Install a fresh token for a new exchange, returning it
    pub(crate) fn arm(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.cancel.lock() = token.clone();
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_cancels_armed_token() {
        let handle = SessionHandle::new();
        let token = handle.arm();
        assert!(!token.is_cancelled());
        handle.abort();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_arm_replaces_consumed_token() {
        let handle = SessionHandle::new();
        let first = handle.arm();
        handle.abort();
        let second = handle.arm();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }
}
