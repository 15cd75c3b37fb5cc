//! Single-line text input widget

use crate::input::Action;
use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    widgets::{Block, Borders, Paragraph, Widget},
};
use unicode_width::UnicodeWidthChar;

/// Single-line text input with cursor editing
#[derive(Debug, Default)]
pub struct InputBox {
    /// Current input text
    content: String,
    /// Cursor position as a character index
    cursor: usize,
    /// Placeholder shown while empty
    placeholder: String,
    /// Whether the input is focused
    focused: bool,
}

impl InputBox {
    /// Create a new input box
    pub fn new() -> Self {
        Self::default()
    }

    /// Set placeholder text
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// Set focus state
    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    /// Get the current content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Clear the content
    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
    }

    /// Take the content, leaving the box empty
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.content)
    }

    fn byte_offset(&self, char_idx: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    fn insert_char(&mut self, c: char) {
        let at = self.byte_offset(self.cursor);
        self.content.insert(at, c);
        self.cursor += 1;
    }

    fn remove_char(&mut self, char_idx: usize) {
        let start = self.byte_offset(char_idx);
        let end = self.byte_offset(char_idx + 1);
        self.content.drain(start..end);
    }

    /// Handle an input action, returning whether it changed the box
    pub fn handle_action(&mut self, action: &Action) -> bool {
        match action {
            Action::Char(c) => {
                self.insert_char(*c);
                true
            }
            Action::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.remove_char(self.cursor);
                    true
                } else {
                    false
                }
            }
            Action::Delete => {
                if self.cursor < self.char_count() {
                    self.remove_char(self.cursor);
                    true
                } else {
                    false
                }
            }
            Action::Left => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    true
                } else {
                    false
                }
            }
            Action::Right => {
                if self.cursor < self.char_count() {
                    self.cursor += 1;
                    true
                } else {
                    false
                }
            }
            Action::Home => {
                self.cursor = 0;
                true
            }
            Action::End => {
                self.cursor = self.char_count();
                true
            }
            Action::ClearLine => {
                self.clear();
                true
            }
            Action::DeleteWord => {
                let chars: Vec<char> = self.content.chars().collect();
                let mut target = self.cursor;
                while target > 0 && chars[target - 1] == ' ' {
                    target -= 1;
                }
                while target > 0 && chars[target - 1] != ' ' {
                    target -= 1;
                }
                let start = self.byte_offset(target);
                let end = self.byte_offset(self.cursor);
                self.content.drain(start..end);
                self.cursor = target;
                true
            }
            Action::Paste(text) => {
                for c in text.chars() {
                    // single-line input: newlines become spaces
                    if c == '\n' || c == '\r' {
                        if !self.content.ends_with(' ') && self.cursor > 0 {
                            self.insert_char(' ');
                        }
                    } else {
                        self.insert_char(c);
                    }
                }
                true
            }
            _ => false,
        }
    }

    /// Render the input box
    pub fn render(&self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(if self.focused {
                theme.accent_style()
            } else {
                theme.border_style()
            });
        let inner = block.inner(area);
        block.render(area, buf);
        if inner.width == 0 {
            return;
        }

        // Window the text so the cursor stays visible: walk back from the
        // cursor until the visible width is filled.
        let visible_width = inner.width as usize;
        let chars: Vec<char> = self.content.chars().collect();
        let mut start = self.cursor.min(chars.len());
        let mut used = 0;
        while start > 0 {
            let w = chars[start - 1].width().unwrap_or(0);
            if used + w >= visible_width {
                break;
            }
            used += w;
            start -= 1;
        }

        let mut visible = String::new();
        let mut width_taken = 0;
        for &c in &chars[start..] {
            let w = c.width().unwrap_or(0);
            if width_taken + w > visible_width {
                break;
            }
            visible.push(c);
            width_taken += w;
        }

        let (text, style) = if self.content.is_empty() {
            (self.placeholder.clone(), theme.dim_style())
        } else {
            (visible, theme.base_style())
        };
        Paragraph::new(text).style(style).render(inner, buf);

        if self.focused {
            let cursor_x: usize = chars[start..self.cursor.min(chars.len())]
                .iter()
                .map(|c| c.width().unwrap_or(0))
                .sum();
            if cursor_x < inner.width as usize {
                let pos = (inner.x + cursor_x as u16, inner.y);
                if let Some(cell) = buf.cell_mut(pos) {
                    cell.set_style(Style::default().bg(theme.accent));
                }
            }
        }
    }
}
