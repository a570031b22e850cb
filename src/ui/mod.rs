pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use ratatui::widgets::ListState;

/// Keep the list selection inside the current row count: clamp it when rows
/// shrink, select the first row when rows appear.
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  if len == 0 {
    state.select(None);
    return;
  }

  match state.selected() {
    Some(i) if i < len => {}
    Some(_) => state.select(Some(len - 1)),
    None => state.select(Some(0)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_selection_cleared_when_empty() {
    let mut state = ListState::default();
    state.select(Some(3));
    ensure_valid_selection(&mut state, 0);
    assert_eq!(state.selected(), None);
  }

  #[test]
  fn test_selection_clamped_when_rows_shrink() {
    let mut state = ListState::default();
    state.select(Some(9));
    ensure_valid_selection(&mut state, 4);
    assert_eq!(state.selected(), Some(3));
  }

  #[test]
  fn test_selection_initialized_when_rows_appear() {
    let mut state = ListState::default();
    ensure_valid_selection(&mut state, 4);
    assert_eq!(state.selected(), Some(0));
  }

  #[test]
  fn test_valid_selection_untouched() {
    let mut state = ListState::default();
    state.select(Some(1));
    ensure_valid_selection(&mut state, 4);
    assert_eq!(state.selected(), Some(1));
  }
}
