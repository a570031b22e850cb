use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use tracing::warn;

use crate::backend::types::{JobDraft, JobRecord, JobStatus};
use crate::context::SharedContext;
use crate::query::Action;
use crate::ui::components::TextInput;
use crate::ui::view::{Shortcut, View, ViewAction, ViewOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
  Company,
  Position,
  Url,
  DateFound,
  Description,
  Applied,
  AppliedDate,
  Status,
}

const FIELDS: [Field; 8] = [
  Field::Company,
  Field::Position,
  Field::Url,
  Field::DateFound,
  Field::Description,
  Field::Applied,
  Field::AppliedDate,
  Field::Status,
];

impl Field {
  fn label(&self) -> &'static str {
    match self {
      Field::Company => "Company",
      Field::Position => "Position",
      Field::Url => "URL",
      Field::DateFound => "Date found",
      Field::Description => "Description",
      Field::Applied => "Applied",
      Field::AppliedDate => "Applied date",
      Field::Status => "Status",
    }
  }
}

/// Create/edit form for a job. Validation runs on submit; nothing is sent
/// while required fields are missing, and the form stays open on a remote
/// failure.
pub struct JobFormView {
  ctx: SharedContext,
  editing: Option<JobRecord>,

  company: TextInput,
  position: TextInput,
  url: TextInput,
  date_found: TextInput,
  description: TextInput,
  applied_date: TextInput,
  applied: bool,
  status: JobStatus,

  focus: usize,
  problems: Vec<String>,
  error: Option<String>,
  submit: Action<Vec<JobRecord>>,
}

impl JobFormView {
  pub fn create(ctx: SharedContext) -> Self {
    Self {
      ctx,
      editing: None,
      company: TextInput::new(),
      position: TextInput::new(),
      url: TextInput::new(),
      date_found: TextInput::with_value(Utc::now().date_naive().to_string()),
      description: TextInput::new(),
      applied_date: TextInput::new(),
      applied: false,
      status: JobStatus::NotApplied,
      focus: 0,
      problems: Vec::new(),
      error: None,
      submit: Action::idle(),
    }
  }

  pub fn edit(ctx: SharedContext, record: JobRecord) -> Self {
    let draft = JobDraft::from_record(&record);
    Self {
      ctx,
      company: TextInput::with_value(draft.company),
      position: TextInput::with_value(draft.position),
      url: TextInput::with_value(draft.url),
      date_found: TextInput::with_value(draft.date_found),
      description: TextInput::with_value(draft.description),
      applied_date: TextInput::with_value(draft.applied_date),
      applied: draft.applied,
      status: draft.status,
      editing: Some(record),
      focus: 0,
      problems: Vec::new(),
      error: None,
      submit: Action::idle(),
    }
  }

  fn draft(&self) -> JobDraft {
    JobDraft {
      company: self.company.value().to_string(),
      position: self.position.value().to_string(),
      url: self.url.value().to_string(),
      date_found: self.date_found.value().to_string(),
      description: self.description.value().to_string(),
      applied: self.applied,
      applied_date: self.applied_date.value().to_string(),
      status: self.status,
    }
  }

  fn focused(&self) -> Field {
    FIELDS[self.focus]
  }

  fn focused_input(&mut self) -> Option<&mut TextInput> {
    match self.focused() {
      Field::Company => Some(&mut self.company),
      Field::Position => Some(&mut self.position),
      Field::Url => Some(&mut self.url),
      Field::DateFound => Some(&mut self.date_found),
      Field::Description => Some(&mut self.description),
      Field::AppliedDate => Some(&mut self.applied_date),
      Field::Applied | Field::Status => None,
    }
  }

  /// Validate and, if clean, send the mutation. Validation failures keep the
  /// form local: no request goes out.
  fn submit_draft(&mut self) {
    let draft = self.draft();
    self.problems = draft.problems();
    if !self.problems.is_empty() {
      return;
    }

    self.error = None;
    let store = self.ctx.store.clone();
    let editing = self.editing.as_ref().map(|record| record.id.clone());
    self.submit.start(async move {
      match editing {
        Some(id) => store.update_job(&id, draft).await.map_err(|e| e.to_string()),
        None => store.create_job(draft).await.map_err(|e| e.to_string()),
      }
    });
  }

  fn field_line(&self, field: Field) -> Line<'_> {
    let focused = self.focused() == field;
    let label_style = if focused {
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::DarkGray)
    };

    let value = match field {
      Field::Company => self.company.value().to_string(),
      Field::Position => self.position.value().to_string(),
      Field::Url => self.url.value().to_string(),
      Field::DateFound => self.date_found.value().to_string(),
      Field::Description => self.description.value().to_string(),
      Field::AppliedDate => self.applied_date.value().to_string(),
      Field::Applied => {
        if self.applied {
          "[x]".to_string()
        } else {
          "[ ]".to_string()
        }
      }
      Field::Status => format!("{} (Space cycles)", self.status.label()),
    };

    let mut spans = vec![
      Span::styled(format!(" {:<13}", field.label()), label_style),
      Span::raw(value),
    ];
    if focused && !matches!(field, Field::Applied | Field::Status) {
      spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
    }

    Line::from(spans)
  }
}

impl View for JobFormView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.submit.is_running() {
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Esc => return ViewAction::Pop,
      KeyCode::Tab | KeyCode::Down => {
        self.focus = (self.focus + 1) % FIELDS.len();
        return ViewAction::None;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.focus = if self.focus == 0 {
          FIELDS.len() - 1
        } else {
          self.focus - 1
        };
        return ViewAction::None;
      }
      KeyCode::Enter => {
        self.submit_draft();
        return ViewAction::None;
      }
      _ => {}
    }

    match self.focused() {
      Field::Applied => {
        if key.code == KeyCode::Char(' ') {
          self.applied = !self.applied;
        }
      }
      Field::Status => {
        if key.code == KeyCode::Char(' ') {
          self.status = self.status.next();
        }
      }
      _ => {
        if let Some(input) = self.focused_input() {
          input.handle_key(key);
        }
      }
    }
    ViewAction::None
  }

  fn tick(&mut self) -> ViewAction {
    if let Some(result) = self.submit.poll() {
      match result {
        Ok(jobs) => return ViewAction::PopWith(ViewOutcome::JobsChanged(jobs)),
        Err(e) => {
          warn!("Job save failed: {}", e);
          self.error = Some(e);
        }
      }
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let title = if self.editing.is_some() {
      " Edit job "
    } else {
      " New job "
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let mut lines: Vec<Line> = Vec::new();
    for field in FIELDS {
      lines.push(self.field_line(field));
    }

    lines.push(Line::from(""));
    if self.submit.is_running() {
      lines.push(Line::from(Span::styled(
        " Saving...",
        Style::default().fg(Color::Yellow),
      )));
    }
    for problem in &self.problems {
      lines.push(Line::from(Span::styled(
        format!(" {}", problem),
        Style::default().fg(Color::Red),
      )));
    }
    if let Some(error) = &self.error {
      lines.push(Line::from(Span::styled(
        format!(" Save failed: {}", error),
        Style::default().fg(Color::Red),
      )));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
      Span::styled(" <Tab>", Style::default().fg(Color::Cyan)),
      Span::styled(" next field  ", Style::default().fg(Color::DarkGray)),
      Span::styled("<Space>", Style::default().fg(Color::Cyan)),
      Span::styled(" toggle/cycle  ", Style::default().fg(Color::DarkGray)),
      Span::styled("<Enter>", Style::default().fg(Color::Cyan)),
      Span::styled(" save  ", Style::default().fg(Color::DarkGray)),
      Span::styled("<Esc>", Style::default().fg(Color::Cyan)),
      Span::styled(" cancel", Style::default().fg(Color::DarkGray)),
    ]));

    frame.render_widget(Paragraph::new(lines).block(block), area);
  }

  fn breadcrumb_label(&self) -> String {
    match &self.editing {
      Some(record) => format!("Edit {}", record.company),
      None => "New job".to_string(),
    }
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("Tab", "next"),
      Shortcut::new("Enter", "save"),
      Shortcut::new("Esc", "cancel"),
    ]
  }
}
