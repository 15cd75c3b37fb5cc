//! manglo-chat: conversation state machine and session runtime
//!
//! This crate owns the message history, the single in-flight stream buffer,
//! and the exchange lifecycle: send, stream, abort, and the transparent
//! fallback to the non-streaming request path.

pub mod conversation;
pub mod error;
pub mod events;
pub mod handle;
pub mod session;
pub mod transport;

pub use conversation::{ChatMessage, Conversation, GREETING, Phase};
pub use error::{Error, Result};
pub use events::SessionEvent;
pub use handle::SessionHandle;
pub use session::ChatSession;
pub use transport::{ClientTransport, Transport};
