//! Interactive two-pane chat view

use anyhow::Result;
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use legal_eaze_chat::{ChatService, IgnoreReason, SendOutcome};
use legal_eaze_core::session::{Conversation, Role, SessionEvent};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::{backend::CrosstermBackend, Frame, Terminal};
use std::io;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::welcome;

const GOLD: Color = Color::Rgb(255, 215, 0);
const SIDEBAR_WIDTH: u16 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Sidebar,
    Input,
}

/// What the frame needs from the session, copied out under the lock
struct ViewSnapshot {
    chats: Vec<(String, String)>,
    selected: Option<Conversation>,
    send_error: Option<String>,
}

struct TuiApp {
    service: ChatService,
    events: broadcast::Receiver<SessionEvent>,
    outcome_tx: mpsc::UnboundedSender<SendOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<SendOutcome>,
    in_flight: Vec<JoinHandle<()>>,
    focus: Focus,
    cursor: usize,
    input: String,
    scroll_back: u16,
    status: String,
    endpoint: String,
    should_quit: bool,
}

impl TuiApp {
    fn new(service: ChatService, endpoint: String) -> Self {
        let events = service.session().lock().subscribe();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            service,
            events,
            outcome_tx,
            outcome_rx,
            in_flight: Vec::new(),
            focus: Focus::Sidebar,
            cursor: 0,
            input: String::new(),
            scroll_back: 0,
            status: "n new · Enter open · d delete · Tab switch · Ctrl+X cancel · q quit"
                .to_string(),
            endpoint,
            should_quit: false,
        }
    }

    fn snapshot(&self) -> ViewSnapshot {
        let session = self.service.session().lock();
        let selected = session.selected().cloned();
        let send_error = selected
            .as_ref()
            .and_then(|c| session.send_error(&c.id))
            .map(ToString::to_string);
        ViewSnapshot {
            chats: session
                .conversations()
                .iter()
                .map(|c| (c.id.clone(), c.name.clone()))
                .collect(),
            selected,
            send_error,
        }
    }

    fn pending(&mut self) -> usize {
        self.in_flight.retain(|handle| !handle.is_finished());
        self.in_flight.len()
    }

    fn drain_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.apply_session_event(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    debug!("View skipped {} session events", skipped);
                }
                Err(_) => break,
            }
        }
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            self.apply_outcome(outcome);
        }
    }

    fn apply_session_event(&mut self, event: SessionEvent) {
        let selected = self.service.session().lock().selected_id().map(ToString::to_string);
        match event {
            SessionEvent::Created { .. } => {
                let len = self.service.session().lock().len();
                self.cursor = len.saturating_sub(1);
            }
            SessionEvent::Deleted { .. } => {
                let len = self.service.session().lock().len();
                self.cursor = self.cursor.min(len.saturating_sub(1));
            }
            SessionEvent::MessageAppended { id, .. } if selected.as_deref() == Some(id.as_str()) => {
                self.scroll_back = 0;
            }
            SessionEvent::SendFailed { detail, .. } => {
                self.status = format!("send failed: {}", detail);
            }
            _ => {}
        }
    }

    fn apply_outcome(&mut self, outcome: SendOutcome) {
        match outcome {
            SendOutcome::Replied { .. } => self.status = "reply received".to_string(),
            SendOutcome::Dropped { .. } => {
                self.status = "reply discarded: conversation was deleted".to_string();
            }
            // Already reported through SendFailed.
            SendOutcome::Failed { .. } => {}
            SendOutcome::Ignored(reason) => self.status = ignore_message(reason).to_string(),
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => {
                self.should_quit = true;
                return;
            }
            KeyCode::Char('n') if ctrl => {
                self.new_conversation();
                return;
            }
            KeyCode::Char('x') if ctrl => {
                self.cancel_in_flight();
                return;
            }
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Sidebar => Focus::Input,
                    Focus::Input => Focus::Sidebar,
                };
                return;
            }
            KeyCode::PageUp => {
                self.scroll_back = self.scroll_back.saturating_add(5);
                return;
            }
            KeyCode::PageDown => {
                self.scroll_back = self.scroll_back.saturating_sub(5);
                return;
            }
            _ => {}
        }

        match self.focus {
            Focus::Sidebar => self.handle_sidebar_key(key.code),
            Focus::Input => self.handle_input_key(key.code),
        }
    }

    fn handle_sidebar_key(&mut self, code: KeyCode) {
        let len = self.service.session().lock().len();
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.cursor + 1 < len {
                    self.cursor += 1;
                }
            }
            KeyCode::Enter => {
                let mut session = self.service.session().lock();
                let id = session.conversations().get(self.cursor).map(|c| c.id.clone());
                if let Some(id) = id {
                    session.select_conversation(Some(&id));
                    drop(session);
                    self.scroll_back = 0;
                    self.focus = Focus::Input;
                }
            }
            KeyCode::Char('n') => self.new_conversation(),
            KeyCode::Char('d') | KeyCode::Delete => {
                let mut session = self.service.session().lock();
                let target = session
                    .conversations()
                    .get(self.cursor)
                    .map(|c| (c.id.clone(), c.name.clone()));
                if let Some((id, name)) = target {
                    session.delete_conversation(&id);
                    drop(session);
                    info!("Deleted conversation {} from the sidebar", id);
                    self.status = format!("deleted {}", name);
                }
            }
            KeyCode::Esc => self.service.session().lock().select_conversation(None),
            KeyCode::Char(ch) if ch.is_ascii_digit() => {
                let has_selection = self.service.session().lock().selected().is_some();
                let number = ch.to_digit(10).unwrap_or(0) as usize;
                if !has_selection {
                    if let Some(text) = welcome::suggestion(number) {
                        self.new_conversation();
                        self.input = text.to_string();
                    }
                }
            }
            _ => {}
        }
    }

    fn handle_input_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => self.focus = Focus::Sidebar,
            KeyCode::Enter => self.submit(),
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(ch) => self.input.push(ch),
            _ => {}
        }
    }

    fn new_conversation(&mut self) {
        let id = self.service.session().lock().create_conversation();
        debug!("Created conversation {} from the view", id);
        self.scroll_back = 0;
        self.focus = Focus::Input;
    }

    fn cancel_in_flight(&mut self) {
        let count = self.pending();
        for handle in self.in_flight.drain(..) {
            handle.abort();
        }
        if count > 0 {
            info!("Cancelled {} in-flight questions", count);
            self.status = format!("cancelled {} pending question(s)", count);
        }
    }

    /// Send the input to the selected conversation in the background
    fn submit(&mut self) {
        if self.input.trim().is_empty() {
            return;
        }
        let target = self
            .service
            .session()
            .lock()
            .selected()
            .map(|c| c.id.clone());
        let Some(conversation_id) = target else {
            self.status = ignore_message(IgnoreReason::NoSelection).to_string();
            return;
        };

        let question = std::mem::take(&mut self.input);
        let service = self.service.clone();
        let outcome_tx = self.outcome_tx.clone();
        self.status = "waiting for reply...".to_string();
        self.in_flight.push(tokio::spawn(async move {
            let outcome = service.send_to(&conversation_id, &question).await;
            let _ = outcome_tx.send(outcome);
        }));
    }

    fn draw(&mut self, frame: &mut Frame) {
        let snapshot = self.snapshot();
        let pending = self.pending();

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
            .split(frame.area());

        self.draw_sidebar(frame, columns[0], &snapshot);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(if snapshot.send_error.is_some() { 3 } else { 0 }),
                Constraint::Length(3),
            ])
            .split(columns[1]);

        let title = snapshot
            .selected
            .as_ref()
            .map(|c| c.name.clone())
            .unwrap_or_else(|| welcome::TITLE.to_string());
        let state = if pending > 0 {
            format!("{} pending", pending)
        } else {
            "idle".to_string()
        };
        frame.render_widget(
            Paragraph::new(format!("{} | {}", self.status, state)).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("{} · {}", title, self.endpoint)),
            ),
            rows[0],
        );

        match &snapshot.selected {
            Some(conversation) => self.draw_messages(frame, rows[1], conversation),
            None => draw_landing(frame, rows[1]),
        }

        if let Some(error) = &snapshot.send_error {
            frame.render_widget(
                Paragraph::new(format!("No reply: {}", error))
                    .style(Style::default().fg(Color::Red))
                    .block(Block::default().borders(Borders::ALL).title("error"))
                    .wrap(Wrap { trim: true }),
                rows[2],
            );
        }

        let input_style = if self.focus == Focus::Input {
            Style::default().fg(GOLD)
        } else {
            Style::default()
        };
        frame.render_widget(
            Paragraph::new(self.input.clone()).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(input_style)
                    .title("Ask your legal question..."),
            ),
            rows[3],
        );
        if self.focus == Focus::Input {
            let typed = u16::try_from(Line::from(self.input.as_str()).width()).unwrap_or(u16::MAX);
            let x = rows[3].x.saturating_add(1).saturating_add(typed);
            frame.set_cursor_position((
                x.min(rows[3].right().saturating_sub(2)),
                rows[3].y.saturating_add(1),
            ));
        }
    }

    fn draw_sidebar(&self, frame: &mut Frame, area: Rect, snapshot: &ViewSnapshot) {
        let selected_id = snapshot.selected.as_ref().map(|c| c.id.as_str());
        let items: Vec<ListItem> = snapshot
            .chats
            .iter()
            .map(|(id, name)| {
                let marker = if Some(id.as_str()) == selected_id { "● " } else { "  " };
                ListItem::new(format!("{}{}", marker, name))
            })
            .collect();

        let border = if self.focus == Focus::Sidebar {
            Style::default().fg(GOLD)
        } else {
            Style::default()
        };
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border)
                    .title("Chats (n: new)"),
            )
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

        let mut state = ListState::default();
        if !snapshot.chats.is_empty() {
            state.select(Some(self.cursor.min(snapshot.chats.len() - 1)));
        }
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_messages(&self, frame: &mut Frame, area: Rect, conversation: &Conversation) {
        let mut lines: Vec<Line> = Vec::new();
        for message in &conversation.messages {
            let (label, color, alignment) = match message.role {
                Role::User => ("you", GOLD, Alignment::Right),
                Role::Assistant => ("assistant", Color::White, Alignment::Left),
            };
            lines.push(
                Line::from(Span::styled(
                    label,
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ))
                .alignment(alignment),
            );
            for text in message.content.lines() {
                lines.push(
                    Line::from(Span::styled(text.to_string(), Style::default().fg(color)))
                        .alignment(alignment),
                );
            }
            lines.push(Line::from(""));
        }

        let inner_width = area.width.saturating_sub(2);
        let in_view = usize::from(area.height.saturating_sub(2)) + usize::from(self.scroll_back);
        let (start, offset) = tail_window(&lines, inner_width, in_view);
        lines.drain(..start);

        frame.render_widget(
            Paragraph::new(lines)
                .block(Block::default().borders(Borders::ALL))
                .wrap(Wrap { trim: false })
                .scroll((offset, 0)),
            area,
        );
    }
}

fn draw_landing(frame: &mut Frame, area: Rect) {
    let mut lines = vec![
        Line::from(Span::styled(
            welcome::TITLE,
            Style::default().fg(GOLD).add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center),
        Line::from(welcome::SUBTITLE).alignment(Alignment::Center),
        Line::from(""),
    ];

    let mut number = 1;
    for card in &welcome::FEATURE_CARDS {
        lines.push(Line::from(Span::styled(
            card.title,
            Style::default().fg(GOLD).add_modifier(Modifier::BOLD),
        )));
        for item in card.items {
            lines.push(Line::from(format!("  {}", item)));
        }
        lines.push(Line::from(Span::styled(
            "  Try asking:",
            Style::default().fg(GOLD),
        )));
        for suggestion in card.suggestions {
            lines.push(Line::from(format!("    [{}] {}", number, suggestion)));
            number += 1;
        }
        lines.push(Line::from(""));
    }

    frame.render_widget(
        Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("press 1-9 in the sidebar"))
            .wrap(Wrap { trim: false }),
        area,
    );
}

fn ignore_message(reason: IgnoreReason) -> &'static str {
    match reason {
        IgnoreReason::EmptyQuestion => "type a question first",
        IgnoreReason::NoSelection => "select or create a chat first",
        IgnoreReason::UnknownConversation => "that chat no longer exists",
    }
}

/// Rows `line` takes once ratatui wraps it to `width` columns
fn line_rows(line: &Line, width: u16) -> usize {
    if width == 0 {
        return 1;
    }
    Paragraph::new(line.clone())
        .wrap(Wrap { trim: false })
        .line_count(width)
        .max(1)
}

/// First line to render, and the row offset into the remaining text, that
/// keep the last `rows_from_end` wrapped rows in view
fn tail_window(lines: &[Line], width: u16, rows_from_end: usize) -> (usize, u16) {
    let heights: Vec<usize> = lines.iter().map(|line| line_rows(line, width)).collect();
    let total: usize = heights.iter().sum();
    let mut skip = total.saturating_sub(rows_from_end);
    for (index, height) in heights.into_iter().enumerate() {
        if skip < height {
            return (index, u16::try_from(skip).unwrap_or(u16::MAX));
        }
        skip -= height;
    }
    (lines.len(), 0)
}

/// Run the interactive chat until the user quits
pub async fn run_tui(service: ChatService, endpoint: String) -> Result<()> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = TuiApp::new(service, endpoint);
    let result = event_loop(&mut terminal, &mut app).await;

    app.cancel_in_flight();
    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut TuiApp,
) -> Result<()> {
    loop {
        app.drain_events();
        terminal.draw(|frame| app.draw(frame))?;

        if event::poll(Duration::from_millis(60))? {
            if let CEvent::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
        // Let background sends make progress between frames.
        tokio::task::yield_now().await;
    }
}
