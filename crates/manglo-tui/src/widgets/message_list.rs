//! Message list widget for displaying the chat transcript

use crate::theme::Theme;
use crate::widgets::response::render_response;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};

/// Who a transcript entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
    /// Local notices (topics list, auth warnings), never sent anywhere
    Notice,
}

/// A single displayable entry in the transcript
#[derive(Debug, Clone)]
pub struct DisplayMessage {
    pub speaker: Speaker,
    pub text: String,
    /// Entry is the live, still-growing reply
    pub is_streaming: bool,
}

impl DisplayMessage {
    /// Create a user entry
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            is_streaming: false,
        }
    }

    /// Create a committed assistant entry
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
            is_streaming: false,
        }
    }

    /// Create the live streaming assistant entry
    pub fn streaming(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
            is_streaming: true,
        }
    }

    /// Create a local notice entry
    pub fn notice(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Notice,
            text: text.into(),
            is_streaming: false,
        }
    }
}

/// Widget for the scrollable transcript
pub struct MessageList<'a> {
    messages: &'a [DisplayMessage],
    theme: &'a Theme,
    scroll: usize,
}

impl<'a> MessageList<'a> {
    /// Create a new message list
    pub fn new(messages: &'a [DisplayMessage], theme: &'a Theme) -> Self {
        Self {
            messages,
            theme,
            scroll: 0,
        }
    }

    /// Set scroll offset (in lines)
    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }
}

fn render_message(msg: &DisplayMessage, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    let (label, style, prefix) = match msg.speaker {
        Speaker::User => ("You", theme.accent_bold(), "▶ "),
        Speaker::Assistant => (
            "Assistant",
            theme.assistant_style().add_modifier(Modifier::BOLD),
            "◀ ",
        ),
        Speaker::Notice => ("Notice", theme.dim_style(), "● "),
    };
    let header = if msg.is_streaming {
        format!("{}{} ▌", prefix, label)
    } else {
        format!("{}{}", prefix, label)
    };
    lines.push(Line::from(Span::styled(header, style)));

    let content_width = width.saturating_sub(2);
    match msg.speaker {
        Speaker::Assistant => {
            if msg.text.is_empty() && msg.is_streaming {
                lines.push(Line::from(Span::styled(
                    "  thinking...".to_string(),
                    theme.warning_style(),
                )));
            } else {
                for line in render_response(&msg.text, theme) {
                    let mut indented = vec![Span::raw("  ")];
                    indented.extend(
                        line.spans
                            .into_iter()
                            .map(|s| Span::styled(s.content.into_owned(), s.style)),
                    );
                    lines.push(Line::from(indented));
                }
            }
        }
        Speaker::User | Speaker::Notice => {
            let style = if msg.speaker == Speaker::Notice {
                theme.dim_style()
            } else {
                theme.base_style()
            };
            for raw_line in msg.text.lines() {
                for wrapped in textwrap::wrap(raw_line, content_width.max(1)) {
                    lines.push(Line::from(Span::styled(format!("  {}", wrapped), style)));
                }
            }
        }
    }

    lines.push(Line::from("")); // gap between entries
    lines
}

impl Widget for MessageList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let width = area.width as usize;
        let mut all_lines: Vec<Line> = Vec::new();
        for msg in self.messages {
            all_lines.extend(render_message(msg, self.theme, width));
        }

        let visible: Vec<Line> = all_lines
            .into_iter()
            .skip(self.scroll)
            .take(area.height as usize)
            .collect();

        Paragraph::new(visible)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}

/// Total rendered height of the transcript, for scroll clamping
pub fn transcript_height(messages: &[DisplayMessage], theme: &Theme, width: usize) -> usize {
    messages
        .iter()
        .map(|msg| render_message(msg, theme, width).len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streaming_header_shows_cursor() {
        let theme = Theme::dark();
        let msg = DisplayMessage::streaming("partial");
        let lines = render_message(&msg, &theme, 80);
        assert!(lines[0].spans[0].content.contains('▌'));
    }

    #[test]
    fn test_height_matches_render() {
        let theme = Theme::dark();
        let messages = vec![
            DisplayMessage::user("How to treat anthracnose?"),
            DisplayMessage::assistant("**Treatment**\n- Apply copper-based fungicides"),
        ];
        let total: usize = messages
            .iter()
            .map(|m| render_message(m, &theme, 60).len())
            .sum();
        assert_eq!(transcript_height(&messages, &theme, 60), total);
    }
}
