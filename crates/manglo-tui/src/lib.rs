//! manglo-tui: terminal UI components
//!
//! Widgets for the chat transcript plus the response formatter that turns
//! assistant prose into typed content blocks.

pub mod format;
pub mod input;
pub mod theme;
pub mod widgets;

pub use format::{ContentBlock, Emphasis, InlineSpan, format_response, normalize};
pub use theme::Theme;
