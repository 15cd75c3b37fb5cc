//! Custom widgets for the TUI

pub mod input_box;
pub mod message_list;
pub mod response;
pub mod spinner;

pub use input_box::InputBox;
pub use message_list::{DisplayMessage, MessageList, Speaker, transcript_height};
pub use response::render_response;
pub use spinner::Spinner;
