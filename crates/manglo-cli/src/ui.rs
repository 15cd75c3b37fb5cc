//! TUI implementation for manglo

use std::io::Write as _;
use std::time::Instant;

use crossterm::event::{Event, EventStream};
use futures::StreamExt;
use tokio::sync::mpsc;

use manglo_api::Role;
use manglo_chat::{ChatMessage, ChatSession, GREETING, SessionEvent};
use manglo_tui::{
    Theme,
    input::{Action, key_to_action},
    widgets::{DisplayMessage, InputBox, MessageList, Spinner, transcript_height},
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::widgets::Paragraph;

/// Suggested starter questions, surfaced by /topics
pub const QUICK_QUESTIONS: &[&str] = &[
    "What are common mango diseases?",
    "How to treat anthracnose?",
    "Signs of healthy mango trees?",
    "Best farming practices?",
    "Organic treatment options?",
    "How to prevent black mould rot?",
    "What causes alternaria in mangoes?",
    "When to apply fungicides?",
];

/// Messages sent from UI handlers to the session driver
#[derive(Debug)]
enum UiMessage {
    /// User submitted input
    Submit(String),
    /// User requested quit
    Quit,
    /// User requested a history reset
    Clear,
}

/// TUI application state
struct TuiState {
    /// Rendered transcript entries
    messages: Vec<DisplayMessage>,
    /// Input box
    input: InputBox,
    /// Scroll offset in lines
    scroll: usize,
    /// Keep the view pinned to the latest line
    follow: bool,
    /// Whether an exchange is in flight
    is_processing: bool,
    /// Status line text
    status: String,
    theme: Theme,
    /// Spinner start for continuous animation
    spinner_start: Instant,
    authenticated: bool,
    ui_tx: mpsc::Sender<UiMessage>,
}

impl TuiState {
    fn new(
        theme: Theme,
        history: &[ChatMessage],
        authenticated: bool,
        ui_tx: mpsc::Sender<UiMessage>,
    ) -> Self {
        let mut input = InputBox::new().with_placeholder(if authenticated {
            "Type your message... (/topics for ideas)"
        } else {
            "Please log in to chat..."
        });
        input.set_focused(true);

        Self {
            messages: history.iter().map(display_message).collect(),
            input,
            scroll: 0,
            follow: true,
            is_processing: false,
            status: "Ready".to_string(),
            theme,
            spinner_start: Instant::now(),
            authenticated,
            ui_tx,
        }
    }

    /// Mirror a session event into the rendered transcript
    fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::SendStart { message } => {
                self.messages.push(DisplayMessage::user(message.text));
                self.messages.push(DisplayMessage::streaming(""));
                self.is_processing = true;
                self.spinner_start = Instant::now();
                self.status = "Thinking...".to_string();
                self.follow = true;
            }
            SessionEvent::StreamStart => {
                self.status = "Streaming...".to_string();
            }
            SessionEvent::Delta { text } => {
                if let Some(last) = self.messages.last_mut() {
                    if last.is_streaming {
                        last.text.push_str(&text);
                    }
                }
            }
            SessionEvent::Final { message } => {
                match self.messages.last_mut() {
                    Some(last) if last.is_streaming => {
                        last.text = message.text;
                        last.is_streaming = false;
                    }
                    _ => self.messages.push(DisplayMessage::assistant(message.text)),
                }
                self.is_processing = false;
                self.status = "Ready".to_string();
            }
            SessionEvent::Aborted => {
                if self.messages.last().is_some_and(|m| m.is_streaming) {
                    self.messages.pop();
                }
                self.is_processing = false;
                self.status = "Stopped".to_string();
            }
            SessionEvent::AuthRequired => {
                self.authenticated = false;
                self.status = "Not authenticated".to_string();
            }
            SessionEvent::Cleared => {
                self.messages = vec![DisplayMessage::assistant(GREETING)];
                self.scroll = 0;
                self.follow = true;
                self.status = "Cleared".to_string();
            }
        }
    }

    /// Handle an idle-state action; returns false to quit
    async fn handle_action(&mut self, action: Action) -> bool {
        match action {
            Action::Submit => {
                let text = self.input.take().trim().to_string();
                if text.is_empty() {
                    return true;
                }
                if let Some(command) = text.strip_prefix('/') {
                    return self.handle_command(command).await;
                }
                let _ = self.ui_tx.send(UiMessage::Submit(text)).await;
            }
            Action::Interrupt | Action::Eof | Action::Quit => {
                let _ = self.ui_tx.send(UiMessage::Quit).await;
            }
            Action::Up => self.scroll_by(-1),
            Action::Down => self.scroll_by(1),
            Action::PageUp => self.scroll_by(-10),
            Action::PageDown => self.scroll_by(10),
            Action::Escape => {}
            other => {
                self.input.handle_action(&other);
            }
        }
        true
    }

    async fn handle_command(&mut self, command: &str) -> bool {
        match command.trim() {
            "quit" | "exit" => {
                let _ = self.ui_tx.send(UiMessage::Quit).await;
            }
            "clear" => {
                let _ = self.ui_tx.send(UiMessage::Clear).await;
            }
            "topics" => {
                let mut notice = String::from("Things you can ask:");
                for question in QUICK_QUESTIONS {
                    notice.push_str("\n  - ");
                    notice.push_str(question);
                }
                self.messages.push(DisplayMessage::notice(notice));
                self.follow = true;
            }
            "help" => {
                self.messages.push(DisplayMessage::notice(
                    "Commands: /topics /clear /quit. Esc stops a reply, Ctrl+Q quits.",
                ));
                self.follow = true;
            }
            unknown => {
                self.messages.push(DisplayMessage::notice(format!(
                    "Unknown command: /{} (try /help)",
                    unknown
                )));
            }
        }
        true
    }

    fn scroll_by(&mut self, delta: isize) {
        self.follow = false;
        if delta < 0 {
            self.scroll = self.scroll.saturating_sub(delta.unsigned_abs());
        } else {
            self.scroll = self.scroll.saturating_add(delta as usize);
        }
    }

    /// Render the UI
    fn render(&mut self, frame: &mut ratatui::Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),    // transcript
                Constraint::Length(3), // input
                Constraint::Length(1), // status
            ])
            .split(frame.area());

        // Clamp scroll against the rendered height, pinning to the bottom
        // while following.
        let transcript_area = chunks[0];
        let height = transcript_height(&self.messages, &self.theme, transcript_area.width as usize);
        let max_scroll = height.saturating_sub(transcript_area.height as usize);
        if self.follow {
            self.scroll = max_scroll;
        } else {
            self.scroll = self.scroll.min(max_scroll);
        }

        frame.render_widget(
            MessageList::new(&self.messages, &self.theme).scroll(self.scroll),
            transcript_area,
        );

        self.input
            .render(chunks[1], frame.buffer_mut(), &self.theme);

        if self.is_processing {
            frame.render_widget(
                Spinner::new(&self.status, &self.theme).with_start_time(self.spinner_start),
                chunks[2],
            );
        } else {
            let style = if self.authenticated {
                self.theme.dim_style()
            } else {
                self.theme.warning_style()
            };
            frame.render_widget(
                Paragraph::new(format!(
                    "{} · Enter send · Esc stop · Ctrl+Q quit",
                    self.status
                ))
                .style(style),
                chunks[2],
            );
        }
    }
}

fn display_message(message: &ChatMessage) -> DisplayMessage {
    match message.role {
        Role::User => DisplayMessage::user(message.text.clone()),
        Role::Assistant => DisplayMessage::assistant(message.text.clone()),
    }
}

/// Run the TUI application
pub async fn run_tui(session: &mut ChatSession, theme: Theme) -> anyhow::Result<()> {
    use crossterm::{
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    };
    use ratatui::{Terminal, backend::CrosstermBackend};
    use std::io;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (ui_tx, mut ui_rx) = mpsc::channel::<UiMessage>(32);
    let mut state = TuiState::new(theme, session.messages(), session.is_authenticated(), ui_tx);
    let mut session_rx = session.subscribe();
    let abort_handle = session.handle();

    let mut event_stream = EventStream::new();
    let mut tick_interval = tokio::time::interval(std::time::Duration::from_millis(80));

    // Pending submitted text; the send future is created at the top of the
    // next loop iteration so it can borrow the session.
    let mut pending_prompt: Option<String> = None;

    let result = loop {
        if let Some(content) = pending_prompt.take() {
            let mut send_future = std::pin::pin!(session.send(&content));

            // Drive the send future alongside events so the UI stays live
            // (spinner, deltas, abort) while the exchange runs.
            loop {
                terminal.draw(|frame| state.render(frame))?;

                tokio::select! {
                    biased;

                    result = &mut send_future => {
                        if let Err(e) = result {
                            tracing::warn!("send rejected: {}", e);
                            state.status = format!("Error: {}", e);
                            state.is_processing = false;
                        }
                        break;
                    }

                    event = session_rx.recv() => {
                        if let Ok(session_event) = event {
                            state.handle_session_event(session_event);
                        }
                    }

                    event = event_stream.next() => {
                        match event {
                            Some(Ok(Event::Key(key))) => {
                                match key_to_action(key) {
                                    Action::Interrupt | Action::Escape => {
                                        abort_handle.abort();
                                        state.status = "Stopping...".to_string();
                                    }
                                    Action::Quit => {
                                        disable_raw_mode()?;
                                        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
                                        terminal.show_cursor()?;
                                        return Ok(());
                                    }
                                    other => {
                                        // typing stays live during streaming
                                        state.input.handle_action(&other);
                                    }
                                }
                            }
                            Some(Ok(Event::Paste(text))) => {
                                state.input.handle_action(&Action::Paste(text));
                            }
                            Some(Ok(_)) => {}
                            Some(Err(_)) | None => {
                                disable_raw_mode()?;
                                execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
                                terminal.show_cursor()?;
                                return Ok(());
                            }
                        }
                    }

                    _ = tick_interval.tick() => {}
                }
            }

            // Pick up events emitted right before the future resolved
            while let Ok(session_event) = session_rx.try_recv() {
                state.handle_session_event(session_event);
            }
            // An exchange can end without a terminal event (empty reply);
            // drop the stale placeholder if so.
            if state.is_processing {
                if state.messages.last().is_some_and(|m| m.is_streaming) {
                    state.messages.pop();
                }
                state.is_processing = false;
                state.status = "Ready".to_string();
            }
            terminal.draw(|frame| state.render(frame))?;
            continue;
        }

        terminal.draw(|frame| state.render(frame))?;

        tokio::select! {
            biased;

            event = session_rx.recv() => {
                if let Ok(session_event) = event {
                    state.handle_session_event(session_event);
                }
            }

            event = event_stream.next() => {
                match event {
                    Some(Ok(Event::Key(key))) => {
                        if !state.handle_action(key_to_action(key)).await {
                            break Ok(());
                        }
                    }
                    Some(Ok(Event::Paste(text))) => {
                        state.input.handle_action(&Action::Paste(text));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        break Err(anyhow::anyhow!("event error: {}", e));
                    }
                    None => {
                        break Ok(());
                    }
                }
            }

            _ = tick_interval.tick() => {}

            msg = ui_rx.recv() => {
                match msg {
                    Some(UiMessage::Submit(content)) => {
                        pending_prompt = Some(content);
                    }
                    Some(UiMessage::Clear) => {
                        if let Err(e) = session.clear().await {
                            state.status = format!("Error: {}", e);
                        }
                    }
                    Some(UiMessage::Quit) | None => {
                        break Ok(());
                    }
                }
            }
        }
    };

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

/// Run in plain stdin/stdout mode (no TUI)
pub async fn run_plain(session: &mut ChatSession) -> anyhow::Result<()> {
    use tokio::io::AsyncBufReadExt;

    println!("{}", GREETING);
    println!("(/topics for suggested questions, /clear to reset, /quit to exit)\n");

    // Print streamed output as it arrives; the send call below blocks until
    // the exchange resolves.
    let mut rx = session.subscribe();
    tokio::spawn(async move {
        let mut streamed = false;
        loop {
            match rx.recv().await {
                Ok(SessionEvent::SendStart { .. }) => streamed = false,
                Ok(SessionEvent::Delta { text }) => {
                    streamed = true;
                    print!("{}", text);
                    let _ = std::io::stdout().flush();
                }
                Ok(SessionEvent::Final { message }) => {
                    if streamed {
                        println!();
                    } else {
                        println!("{}", message.text);
                    }
                }
                Ok(SessionEvent::Aborted) => println!("\n[stopped]"),
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        match line.as_str() {
            "/quit" | "/exit" => break,
            "/clear" => {
                session.clear().await?;
                println!("(history cleared)");
                continue;
            }
            "/topics" => {
                for question in QUICK_QUESTIONS {
                    println!("  - {}", question);
                }
                continue;
            }
            _ => {}
        }

        // Ctrl+C aborts the in-flight exchange instead of killing the process
        let abort = session.handle();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                abort.abort();
            }
        });
        session.send(&line).await?;
        watcher.abort();
    }

    Ok(())
}
