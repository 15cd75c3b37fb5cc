//! Color theme support

use ratatui::style::{Color, Modifier, Style};

/// Color theme for the UI
#[derive(Debug, Clone)]
pub struct Theme {
    /// Background color
    pub bg: Color,
    /// Primary text color
    pub fg: Color,
    /// Dimmed/secondary text (markers, timestamps, separators)
    pub dim: Color,
    /// Accent color (headers, prompts, spinner)
    pub accent: Color,
    /// Error color
    pub error: Color,
    /// Assistant role color
    pub assistant: Color,
    /// Warning color (auth notices)
    pub warning: Color,
    /// Border color
    pub border: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    /// Dark theme (default)
    pub fn dark() -> Self {
        Self {
            bg: Color::Reset,
            fg: Color::White,
            dim: Color::DarkGray,
            accent: Color::Cyan,
            error: Color::Red,
            assistant: Color::Green,
            warning: Color::Yellow,
            border: Color::DarkGray,
        }
    }

    /// Light theme
    pub fn light() -> Self {
        Self {
            bg: Color::White,
            fg: Color::Black,
            dim: Color::Gray,
            accent: Color::Blue,
            error: Color::Red,
            assistant: Color::Rgb(0, 120, 0),
            warning: Color::Rgb(180, 120, 0),
            border: Color::Gray,
        }
    }

    /// Get base style
    pub fn base_style(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    /// Get dimmed style
    pub fn dim_style(&self) -> Style {
        Style::default().fg(self.dim)
    }

    /// Get accent style
    pub fn accent_style(&self) -> Style {
        Style::default().fg(self.accent)
    }

    /// Get bold accent style
    pub fn accent_bold(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    /// Get error style
    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error)
    }

    /// Get assistant role style
    pub fn assistant_style(&self) -> Style {
        Style::default().fg(self.assistant)
    }

    /// Get warning style
    pub fn warning_style(&self) -> Style {
        Style::default().fg(self.warning)
    }

    /// Get border style
    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    /// Style for section headers in formatted replies
    pub fn header_style(&self) -> Style {
        self.accent_bold().add_modifier(Modifier::UNDERLINED)
    }
}
