//! Animated spinner widget

use crate::theme::Theme;
use ratatui::{buffer::Buffer, layout::Rect, text::Span, widgets::Widget};
use std::time::{Duration, Instant};

/// Spinner animation frames
const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Frame hold time
const FRAME_DURATION: Duration = Duration::from_millis(80);

/// Animated spinner with a label, shown while an exchange is in flight
pub struct Spinner<'a> {
    label: &'a str,
    theme: &'a Theme,
    start_time: Instant,
}

impl<'a> Spinner<'a> {
    /// Create a new spinner
    pub fn new(label: &'a str, theme: &'a Theme) -> Self {
        Self {
            label,
            theme,
            start_time: Instant::now(),
        }
    }

    /// Use a fixed start time so the animation is continuous across frames
    pub fn with_start_time(mut self, start: Instant) -> Self {
        self.start_time = start;
        self
    }

    fn current_frame(&self) -> &'static str {
        let elapsed = self.start_time.elapsed().as_millis();
        let index = (elapsed / FRAME_DURATION.as_millis()) as usize;
        SPINNER_FRAMES[index % SPINNER_FRAMES.len()]
    }
}

impl Widget for Spinner<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 3 {
            return;
        }
        let text = format!("{} {}", self.current_frame(), self.label);
        let span = Span::styled(&text, self.theme.accent_style());
        buf.set_span(area.x, area.y, &span, area.width);
    }
}
