mod confirm;
mod input;
mod prompt;
mod search_input;

pub use confirm::{ConfirmDialog, ConfirmEvent};
pub use input::{InputResult, TextInput};
pub use prompt::{PromptEvent, PromptInput};
pub use search_input::{SearchEvent, SearchInput};

/// Result of offering a key event to a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<E> {
  /// Key was consumed, nothing for the parent to do
  Handled,
  /// Key not handled, pass to the next handler
  NotHandled,
  /// Key produced an event the parent needs to act on
  Event(E),
}
