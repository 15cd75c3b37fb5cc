//! manglo-api: wire protocol and HTTP client for the assistant service
//!
//! This crate owns the network-facing half of the chat client: the
//! newline-delimited event protocol (framing, frame parsing, delta
//! accumulation) and the HTTP endpoints of the assistant backend.

pub mod client;
pub mod error;
pub mod stream;
pub mod types;
pub mod wire;

pub use client::AssistantClient;
pub use error::{Error, Result};
pub use stream::{DeltaStream, StreamEvent};
pub use types::{Role, Turn};
