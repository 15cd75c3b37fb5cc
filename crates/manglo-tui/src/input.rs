//! Input handling

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};

/// Processed input action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Regular character input
    Char(char),
    /// Enter/submit
    Submit,
    /// Backspace
    Backspace,
    /// Delete
    Delete,
    /// Move cursor left
    Left,
    /// Move cursor right
    Right,
    /// Scroll up one line
    Up,
    /// Scroll down one line
    Down,
    /// Move to start of line
    Home,
    /// Move to end of line
    End,
    /// Page up
    PageUp,
    /// Page down
    PageDown,
    /// Escape (abort in-flight exchange)
    Escape,
    /// Ctrl+C (interrupt/abort)
    Interrupt,
    /// Ctrl+D (EOF)
    Eof,
    /// Ctrl+U (clear line)
    ClearLine,
    /// Ctrl+W (delete word)
    DeleteWord,
    /// Paste (bracketed paste)
    Paste(String),
    /// Quit application
    Quit,
    /// Unknown/unhandled
    Unknown,
}

/// Convert a crossterm key event to an action
pub fn key_to_action(event: KeyEvent) -> Action {
    let KeyEvent {
        code, modifiers, ..
    } = event;

    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c') => Action::Interrupt,
            KeyCode::Char('d') => Action::Eof,
            KeyCode::Char('u') => Action::ClearLine,
            KeyCode::Char('w') => Action::DeleteWord,
            KeyCode::Char('q') => Action::Quit,
            _ => Action::Unknown,
        };
    }

    match code {
        KeyCode::Char(c) => Action::Char(c),
        KeyCode::Enter => Action::Submit,
        KeyCode::Backspace => Action::Backspace,
        KeyCode::Delete => Action::Delete,
        KeyCode::Left => Action::Left,
        KeyCode::Right => Action::Right,
        KeyCode::Up => Action::Up,
        KeyCode::Down => Action::Down,
        KeyCode::Home => Action::Home,
        KeyCode::End => Action::End,
        KeyCode::PageUp => Action::PageUp,
        KeyCode::PageDown => Action::PageDown,
        KeyCode::Esc => Action::Escape,
        _ => Action::Unknown,
    }
}

/// Convert a crossterm event to an action
pub fn event_to_action(event: Event) -> Option<Action> {
    match event {
        Event::Key(key_event) => Some(key_to_action(key_event)),
        Event::Paste(text) => Some(Action::Paste(text)),
        _ => None,
    }
}
