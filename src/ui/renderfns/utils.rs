use ratatui::prelude::Color;

use crate::backend::types::JobStatus;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", cut)
  }
}

/// Display color for a job status
pub fn status_color(status: JobStatus) -> Color {
  match status {
    JobStatus::Offer => Color::Green,
    JobStatus::Interview => Color::Yellow,
    JobStatus::Pending => Color::Cyan,
    JobStatus::Rejected => Color::Red,
    JobStatus::NotApplied => Color::White,
  }
}

/// Column mark for the applied flag
pub fn applied_mark(applied: bool) -> &'static str {
  if applied {
    "yes"
  } else {
    "-"
  }
}
