use crossterm::event::KeyEvent;
use ratatui::prelude::*;

use crate::backend::types::{AttachmentRecord, JobRecord};

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone, Copy)]
pub struct Shortcut {
  pub key: &'static str,
  pub label: &'static str,
}

impl Shortcut {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self { key, label }
  }
}

/// Data a child view hands back to its parent when it pops. The root list
/// view owns the in-memory collections, so every mutation made deeper in the
/// stack flows back up through one of these.
pub enum ViewOutcome {
  JobsChanged(Vec<JobRecord>),
  AttachmentsChanged(Vec<AttachmentRecord>),
}

/// Actions that a view can request in response to input or async completion
pub enum ViewAction {
  /// No action needed
  None,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back)
  Pop,
  /// Pop and deliver an outcome to the view below
  PopWith(ViewOutcome),
  /// Exit the application
  Quit,
}

/// Trait for view behavior
///
/// Views handle their own input modes (search, form editing, confirmations)
/// and return actions for the App to execute. Views that load data
/// asynchronously should use Query/Action internally and poll them in
/// `tick()`.
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self) -> String;

  /// Called on each tick to poll async work. A view may request navigation
  /// from here, e.g. a form popping itself once its submit lands.
  fn tick(&mut self) -> ViewAction {
    ViewAction::None
  }

  /// Receive the outcome of a child view that popped.
  fn on_outcome(&mut self, _outcome: ViewOutcome) {}

  /// Keyboard shortcuts to display in the header
  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![Shortcut::new("j/k", "move"), Shortcut::new("q", "back")]
  }
}
