use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted by the prompt overlay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptEvent {
  Submitted(String),
  Cancelled,
}

/// Titled one-line text prompt (e.g. the file path for an upload).
#[derive(Debug, Clone, Default)]
pub struct PromptInput {
  input: TextInput,
  title: String,
  active: bool,
}

impl PromptInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn show(&mut self, title: impl Into<String>) {
    self.active = true;
    self.title = title.into();
    self.input.clear();
  }

  /// Handle a key event while active
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<PromptEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match self.input.handle_key(key) {
      InputResult::Submitted(value) => {
        self.active = false;
        if value.trim().is_empty() {
          KeyResult::Event(PromptEvent::Cancelled)
        } else {
          KeyResult::Event(PromptEvent::Submitted(value.trim().to_string()))
        }
      }
      InputResult::Cancelled => {
        self.active = false;
        KeyResult::Event(PromptEvent::Cancelled)
      }
      InputResult::Consumed => KeyResult::Handled,
      InputResult::NotHandled => KeyResult::Handled,
    }
  }

  /// Render the prompt overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (area.width * 70 / 100).clamp(30, 70).min(area.width);
    let height = 3;

    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let overlay_area = Rect::new(x, y, width, height.min(area.height));

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let line = Line::from(vec![
      Span::raw(self.input.value()),
      Span::styled("_", Style::default().fg(Color::Yellow)),
    ]);
    frame.render_widget(Paragraph::new(line), inner);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::{KeyCode, KeyModifiers};

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_submit_trims_value() {
    let mut prompt = PromptInput::new();
    prompt.show("Upload file");

    for c in " /tmp/cv.pdf ".chars() {
      prompt.handle_key(key(KeyCode::Char(c)));
    }

    assert_eq!(
      prompt.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(PromptEvent::Submitted("/tmp/cv.pdf".to_string()))
    );
    assert!(!prompt.is_active());
  }

  #[test]
  fn test_empty_submit_cancels() {
    let mut prompt = PromptInput::new();
    prompt.show("Upload file");

    assert_eq!(
      prompt.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(PromptEvent::Cancelled)
    );
  }
}
