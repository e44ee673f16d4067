//! UrlInput — wraps tui-input for the URL entry field.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use crate::theme::{C_ACCENT, C_INPUT_BG, C_INPUT_INVALID, C_MUTED, C_PRIMARY};

pub enum UrlAction {
    Changed(String),
    Submitted,
    Cleared,
}

pub struct UrlInput {
    input: Input,
    placeholder: String,
}

impl UrlInput {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            input: Input::default(),
            placeholder: placeholder.into(),
        }
    }

    pub fn clear(&mut self) {
        self.input = Input::default();
    }

    pub fn text(&self) -> &str {
        self.input.value()
    }

    /// Handle a key event. Returns what happened.
    ///
    /// Esc behaviour:
    ///   - If the input has text: clear it, emit `Changed("")`
    ///   - If already empty: emit `Cleared` (the app decides what that means)
    pub fn handle_key(&mut self, key: KeyEvent) -> UrlAction {
        match key.code {
            KeyCode::Esc => {
                if !self.input.value().is_empty() {
                    self.input = Input::default();
                    UrlAction::Changed(String::new())
                } else {
                    UrlAction::Cleared
                }
            }
            KeyCode::Enter => UrlAction::Submitted,
            _ => {
                self.input
                    .handle_event(&ratatui::crossterm::event::Event::Key(key));
                UrlAction::Changed(self.input.value().to_string())
            }
        }
    }

    /// Render the input bar into `area`. `valid` drives the visual feedback:
    /// a non-empty value that fails validation is shown in the invalid color.
    pub fn draw(&self, frame: &mut Frame, area: Rect, valid: bool) {
        let scroll = self
            .input
            .visual_scroll(area.width.saturating_sub(4) as usize);
        let value = self.input.value();
        let display = if value.is_empty() {
            Span::styled(
                format!("> {}", self.placeholder),
                Style::default().fg(C_MUTED),
            )
        } else {
            let color = if valid { C_ACCENT } else { C_INPUT_INVALID };
            // Skip by characters; the scroll offset is not a byte index.
            let visible: String = value.chars().skip(scroll).collect();
            Span::styled(format!("> {}", visible), Style::default().fg(color))
        };

        let paragraph =
            Paragraph::new(Line::from(vec![display])).style(Style::default().bg(C_INPUT_BG).fg(C_PRIMARY));
        frame.render_widget(paragraph, area);

        // Keep the cursor visible at the edit position
        let cursor_x = area.x + 2 + (self.input.visual_cursor().saturating_sub(scroll)) as u16;
        frame.set_cursor_position((cursor_x.min(area.x + area.width.saturating_sub(1)), area.y));
    }
}

impl Default for UrlInput {
    fn default() -> Self {
        Self::new("paste a spotify link…")
    }
}
