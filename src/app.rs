use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::actions::Action;
use crate::config::Config;
use crate::fuzzy;
use crate::preview::{self, Preview};
use crate::tmux::{PaneCapture, Target, TargetType};

const PROMPT: &str = ">> ";

/// Theme colors
pub struct Theme {
    pub bg: Color,
    pub fg: Color,
    pub accent: Color,
    pub dim: Color,
    pub selection: Color,
    pub error: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            bg: Color::Reset,
            fg: Color::Rgb(220, 220, 220),
            accent: Color::Rgb(217, 119, 87),
            dim: Color::Rgb(100, 100, 100),
            selection: Color::Rgb(60, 60, 60),
            error: Color::Rgb(220, 53, 69),
        }
    }
}

/// Single-line text input with a cursor, counted in chars
#[derive(Debug, Default, Clone)]
pub struct QueryInput {
    value: String,
    cursor: usize,
}

impl QueryInput {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn byte_index(&self, cursor: usize) -> usize {
        self.value
            .char_indices()
            .nth(cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    fn len(&self) -> usize {
        self.value.chars().count()
    }

    pub fn insert(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    /// Delete before the cursor. Returns whether the value changed.
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.value.remove(at);
        true
    }

    /// Delete under the cursor. Returns whether the value changed.
    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.len() {
            return false;
        }
        let at = self.byte_index(self.cursor);
        self.value.remove(at);
        true
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.len());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.len();
    }
}

/// Main application state
pub struct App {
    /// Whether sessions or windows are listed
    pub target_type: TargetType,
    /// Everything tmux reported, in tmux's order
    pub targets: Vec<Target>,
    /// Targets matching the query, best first
    pub entries: Vec<Target>,
    /// Currently selected entry index
    pub list_state: ListState,
    /// Fuzzy query
    pub input: QueryInput,
    /// Panes of the selected target, if captured
    pub preview: Option<Preview>,
    /// Target whose preview is being captured
    pub loading: Option<String>,
    /// Current message to display
    pub error_message: Option<String>,
    /// Theme
    pub theme: Theme,
    /// Horizontal scale for the preview
    pub scale_x: f64,
    pub sidebar_percent: u16,
    pub picker_percent: u16,
    /// Pending action queue
    pub pending_actions: Vec<Action>,
}

impl App {
    pub fn new(target_type: TargetType, config: &Config) -> Self {
        Self {
            target_type,
            targets: Vec::new(),
            entries: Vec::new(),
            list_state: ListState::default(),
            input: QueryInput::default(),
            preview: None,
            loading: None,
            error_message: None,
            theme: Theme::default(),
            scale_x: config.scale_x,
            sidebar_percent: config.sidebar_percent,
            picker_percent: config.picker_percent,
            pending_actions: Vec::new(),
        }
    }

    /// Get the currently selected target
    pub fn selected_target(&self) -> Option<&Target> {
        self.list_state
            .selected()
            .and_then(|i| self.entries.get(i))
    }

    /// Take pending actions (drains the queue)
    pub fn take_pending_actions(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.pending_actions)
    }

    /// Handle an action and return whether to quit
    pub fn handle_action(&mut self, action: Action) -> Result<bool> {
        match action {
            Action::KeyPress(key) => return Ok(self.handle_key(key)),
            Action::TargetsUpdated(targets) => self.set_targets(targets),
            Action::PreviewLoaded { target_id, panes } => self.preview_loaded(target_id, panes),
            Action::PreviewFailed { target_id, message } => {
                if self.loading.as_deref() == Some(target_id.as_str()) {
                    self.loading = None;
                }
                if self.selected_id() == Some(target_id.as_str()) {
                    tracing::warn!(%target_id, %message, "preview failed");
                    self.preview = None;
                    self.error_message = Some(message);
                }
            }
            Action::Error(msg) => {
                tracing::warn!("{}", msg);
                self.error_message = Some(msg);
            }
            _ => {}
        }
        Ok(false)
    }

    fn selected_id(&self) -> Option<&str> {
        self.selected_target().map(|t| t.id.as_str())
    }

    fn set_targets(&mut self, targets: Vec<Target>) {
        let previous = self.selected_id().map(str::to_string);
        self.targets = targets;
        self.refilter();

        // Keep the same target selected across refreshes when it survives
        if let Some(id) = previous {
            if let Some(i) = self.entries.iter().position(|t| t.id == id) {
                self.list_state.select(Some(i));
            }
        }
        self.selection_changed();
        // Refresh the mirror of an unchanged selection too
        if let Some(id) = self.selected_id().map(str::to_string) {
            self.request_preview(id);
        }
    }

    fn refilter(&mut self) {
        self.entries = fuzzy::filter(self.input.value(), &self.targets, |t| t.name.as_str())
            .into_iter()
            .cloned()
            .collect();
        self.list_state
            .select(if self.entries.is_empty() { None } else { Some(0) });
    }

    fn preview_loaded(&mut self, target_id: String, panes: Vec<PaneCapture>) {
        if self.loading.as_deref() == Some(target_id.as_str()) {
            self.loading = None;
        }
        if self.selected_id() != Some(target_id.as_str()) {
            tracing::debug!(%target_id, "discarding stale preview");
            return;
        }
        self.error_message = None;
        self.preview = Some(Preview::new(target_id, panes));
    }

    /// Drop a preview that no longer matches the selection and ask for a new one
    fn selection_changed(&mut self) {
        let selected = self.selected_id().map(str::to_string);
        let current = self.preview.as_ref().map(|p| p.target_id().to_string());
        if selected == current {
            return;
        }
        self.preview = None;
        if let Some(id) = selected {
            self.request_preview(id);
        }
    }

    fn request_preview(&mut self, target_id: String) {
        if self.loading.as_deref() == Some(target_id.as_str()) {
            return;
        }
        self.loading = Some(target_id.clone());
        self.pending_actions.push(Action::LoadPreview(target_id));
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return matches!(key.code, KeyCode::Char('c'));
        }

        match key.code {
            KeyCode::Esc => return true,
            KeyCode::Up => self.previous_entry(),
            KeyCode::Down => self.next_entry(),
            KeyCode::Enter => {
                if let Some(target) = self.selected_target() {
                    self.pending_actions
                        .push(Action::EnterTarget(target.id.clone()));
                }
            }
            KeyCode::Left => self.input.left(),
            KeyCode::Right => self.input.right(),
            KeyCode::Home => self.input.home(),
            KeyCode::End => self.input.end(),
            KeyCode::Backspace => {
                if self.input.backspace() {
                    self.query_changed();
                }
            }
            KeyCode::Delete => {
                if self.input.delete() {
                    self.query_changed();
                }
            }
            KeyCode::Char(c) => {
                self.input.insert(c);
                self.query_changed();
            }
            _ => {}
        }
        false
    }

    fn query_changed(&mut self) {
        self.error_message = None;
        self.refilter();
        self.selection_changed();
    }

    fn next_entry(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1) % self.entries.len(),
            None => 0,
        };
        self.list_state.select(Some(i));
        self.selection_changed();
    }

    fn previous_entry(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => self.entries.len() - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
        self.selection_changed();
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(self.sidebar_percent), // Picker
                Constraint::Min(0),                           // Pane mirror
            ])
            .split(frame.area());

        let sidebar = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(self.picker_percent),
                Constraint::Min(3),
            ])
            .split(chunks[0]);

        self.render_picker(frame, sidebar[0]);
        self.render_input(frame, sidebar[1]);
        self.render_preview(frame, chunks[1]);
    }

    fn render_picker(&mut self, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .entries
            .iter()
            .map(|target| {
                ListItem::new(Line::from(Span::styled(
                    target.name.as_str(),
                    Style::default().fg(self.theme.fg),
                )))
            })
            .collect();

        let kind = match self.target_type {
            TargetType::Sessions => "Sessions",
            TargetType::Windows => "Windows",
        };
        let title = format!(" {} {}/{} ", kind, self.entries.len(), self.targets.len());

        let list = List::new(items)
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.dim)),
            )
            .highlight_style(
                Style::default()
                    .bg(self.theme.selection)
                    .add_modifier(Modifier::BOLD),
            );

        frame.render_stateful_widget(list, area, &mut self.list_state);
    }

    fn render_input(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.accent));
        let inner = block.inner(area);

        let line = Line::from(vec![
            Span::styled(PROMPT, Style::default().fg(self.theme.accent)),
            Span::styled(self.input.value(), Style::default().fg(self.theme.fg)),
        ]);
        frame.render_widget(Paragraph::new(line).block(block), area);

        if inner.width > 0 && inner.height > 0 {
            let offset = (PROMPT.len() + self.input.cursor()) as u16;
            let x = inner.x.saturating_add(offset).min(inner.right().saturating_sub(1));
            frame.set_cursor_position(Position::new(x, inner.y));
        }
    }

    fn render_preview(&self, frame: &mut Frame, area: Rect) {
        let (area, status) = match self.error_message {
            Some(_) if area.height > 1 => {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Min(0), Constraint::Length(1)])
                    .split(area);
                (chunks[0], Some(chunks[1]))
            }
            _ => (area, None),
        };

        let pane_style = Style::default().fg(self.theme.fg).bg(self.theme.bg);
        let dim = Style::default().fg(self.theme.dim);
        match &self.preview {
            Some(preview) if !preview.areas().is_empty() => {
                preview.render(frame, area, self.scale_x, pane_style);
            }
            Some(_) => preview::render_placeholder(frame, area, "No layout available", dim),
            None if self.loading.is_some() => {
                preview::render_placeholder(frame, area, "Loading…", dim)
            }
            None => {}
        }

        if let (Some(status), Some(msg)) = (status, self.error_message.as_ref()) {
            let line = Line::from(Span::styled(
                format!(" {} ", msg),
                Style::default().fg(self.theme.error),
            ));
            frame.render_widget(Paragraph::new(line), status);
        }
    }
}
