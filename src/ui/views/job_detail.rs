use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use std::path::PathBuf;
use tracing::warn;

use crate::backend::types::{AttachmentRecord, JobRecord};
use crate::context::SharedContext;
use crate::query::Action;
use crate::ui::components::{
  ConfirmDialog, ConfirmEvent, KeyResult, PromptEvent, PromptInput,
};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{applied_mark, status_color, truncate};
use crate::ui::view::{Shortcut, View, ViewAction, ViewOutcome};

/// Detail view for one job: the record's fields plus its attachments, with
/// upload and delete. Carries the full attachment collection so mutations
/// can be handed back to the list view on pop.
pub struct JobDetailView {
  ctx: SharedContext,
  job: JobRecord,
  attachments: Vec<AttachmentRecord>,

  list_state: ListState,
  prompt: PromptInput,
  confirm: ConfirmDialog,
  pending_delete: Option<AttachmentRecord>,
  upload: Action<Vec<AttachmentRecord>>,
  remove: Action<Vec<AttachmentRecord>>,
  notice: Option<String>,
}

impl JobDetailView {
  pub fn new(ctx: SharedContext, job: JobRecord, attachments: Vec<AttachmentRecord>) -> Self {
    Self {
      ctx,
      job,
      attachments,
      list_state: ListState::default(),
      prompt: PromptInput::new(),
      confirm: ConfirmDialog::new(),
      pending_delete: None,
      upload: Action::idle(),
      remove: Action::idle(),
      notice: None,
    }
  }

  fn job_attachments(&self) -> Vec<&AttachmentRecord> {
    self
      .attachments
      .iter()
      .filter(|attachment| attachment.job_id == self.job.id)
      .collect()
  }

  fn selected_attachment(&self) -> Option<AttachmentRecord> {
    let rows = self.job_attachments();
    let idx = self.list_state.selected()?;
    rows.get(idx).map(|attachment| (*attachment).clone())
  }

  fn start_upload(&mut self, path: String) {
    let store = self.ctx.store.clone();
    let job_id = self.job.id.clone();
    let attachments = self.attachments.clone();
    let file = PathBuf::from(path);

    self.notice = Some(format!("Uploading {}...", file.display()));
    self.upload.start(async move {
      store
        .upload_attachment(&job_id, &file, &attachments)
        .await
        .map_err(|e| e.to_string())
    });
  }

  fn start_remove(&mut self) {
    let Some(attachment) = self.pending_delete.take() else {
      return;
    };

    let store = self.ctx.store.clone();
    let attachments = self.attachments.clone();
    self.remove.start(async move {
      store
        .delete_attachment(&attachment, &attachments)
        .await
        .map_err(|e| e.to_string())
    });
  }

  fn render_record(&self, frame: &mut Frame, area: Rect) {
    let job = &self.job;
    let mut lines = vec![
      Line::from(vec![
        Span::styled(" Company     ", Style::default().fg(Color::DarkGray)),
        Span::styled(job.company.clone(), Style::default().fg(Color::Cyan).bold()),
      ]),
      Line::from(vec![
        Span::styled(" Position    ", Style::default().fg(Color::DarkGray)),
        Span::raw(job.position.clone()),
      ]),
      Line::from(vec![
        Span::styled(" Status      ", Style::default().fg(Color::DarkGray)),
        Span::styled(
          job.status.label(),
          Style::default().fg(status_color(job.status)),
        ),
      ]),
      Line::from(vec![
        Span::styled(" Applied     ", Style::default().fg(Color::DarkGray)),
        Span::raw(applied_mark(job.applied)),
        Span::styled(
          job
            .applied_date
            .map(|d| format!("  ({})", d))
            .unwrap_or_default(),
          Style::default().fg(Color::DarkGray),
        ),
      ]),
      Line::from(vec![
        Span::styled(" Found       ", Style::default().fg(Color::DarkGray)),
        Span::raw(job.date_found.to_string()),
      ]),
    ];

    if let Some(url) = &job.url {
      lines.push(Line::from(vec![
        Span::styled(" URL         ", Style::default().fg(Color::DarkGray)),
        Span::styled(url.clone(), Style::default().fg(Color::Blue)),
      ]));
    }

    if !job.description.is_empty() {
      lines.push(Line::from(""));
      lines.push(Line::from(Span::raw(format!(" {}", job.description))));
    }

    let block = Block::default()
      .title(format!(" {} ", truncate(&job.company, 40)))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    frame.render_widget(
      Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
      area,
    );
  }

  fn render_attachments(&mut self, frame: &mut Frame, area: Rect) {
    // Filtered inline so the borrow stays on `attachments` while the list
    // state is updated.
    let rows: Vec<&AttachmentRecord> = self
      .attachments
      .iter()
      .filter(|attachment| attachment.job_id == self.job.id)
      .collect();
    ensure_valid_selection(&mut self.list_state, rows.len());

    let busy = self.upload.is_running() || self.remove.is_running();
    let title = if busy {
      format!(" Attachments ({}) (working...) ", rows.len())
    } else {
      format!(" Attachments ({}) ", rows.len())
    };

    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if rows.is_empty() {
      let paragraph = Paragraph::new("No attachments. Press 'u' to upload a file.")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = rows
      .iter()
      .map(|attachment| {
        let line = Line::from(vec![
          Span::styled(
            format!("{:<32} ", truncate(&attachment.file_name, 31)),
            Style::default().fg(Color::Cyan),
          ),
          Span::styled(
            format!(
              "{:<28} ",
              attachment.mime_type.as_deref().unwrap_or("unknown type")
            ),
            Style::default().fg(Color::DarkGray),
          ),
          Span::styled(
            attachment.created_at.format("%Y-%m-%d").to_string(),
            Style::default().fg(Color::DarkGray),
          ),
        ]);
        ListItem::new(line)
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  fn render_notice(&self, frame: &mut Frame, area: Rect) {
    let Some(notice) = &self.notice else {
      return;
    };
    let paragraph =
      Paragraph::new(format!(" {}", notice)).style(Style::default().fg(Color::Yellow));
    frame.render_widget(paragraph, area);
  }
}

impl View for JobDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.prompt.handle_key(key) {
      KeyResult::Event(PromptEvent::Submitted(path)) => {
        self.start_upload(path);
        return ViewAction::None;
      }
      KeyResult::Event(PromptEvent::Cancelled) => return ViewAction::None,
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match self.confirm.handle_key(key) {
      KeyResult::Event(ConfirmEvent::Confirmed) => {
        self.start_remove();
        return ViewAction::None;
      }
      KeyResult::Event(ConfirmEvent::Cancelled) => {
        self.pending_delete = None;
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        let len = self.job_attachments().len();
        if len > 0 {
          let current = self.list_state.selected().unwrap_or(0);
          self.list_state.select(Some((current + 1) % len));
        }
      }
      KeyCode::Char('k') | KeyCode::Up => {
        let len = self.job_attachments().len();
        if len > 0 {
          let current = self.list_state.selected().unwrap_or(0);
          self
            .list_state
            .select(Some(if current == 0 { len - 1 } else { current - 1 }));
        }
      }
      KeyCode::Char('u') => self.prompt.show("Upload file path"),
      KeyCode::Char('d') | KeyCode::Char('x') => {
        if let Some(attachment) = self.selected_attachment() {
          let message = format!("Delete attachment {}?", attachment.file_name);
          self.pending_delete = Some(attachment);
          self.confirm.show("Delete attachment", message);
        }
      }
      KeyCode::Char('o') => {
        if let Some(attachment) = self.selected_attachment() {
          match self.ctx.store.attachment_url(&attachment) {
            Ok(url) => self.notice = Some(url.to_string()),
            Err(e) => self.notice = Some(format!("No URL: {}", e)),
          }
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => {
        return ViewAction::PopWith(ViewOutcome::AttachmentsChanged(self.attachments.clone()));
      }
      _ => {}
    }
    ViewAction::None
  }

  fn tick(&mut self) -> ViewAction {
    if let Some(result) = self.upload.poll() {
      match result {
        Ok(attachments) => {
          self.attachments = attachments;
          self.notice = Some("Upload complete".to_string());
        }
        Err(e) => {
          warn!("Attachment upload failed: {}", e);
          self.notice = Some(format!("Upload failed: {}", e));
        }
      }
    }

    if let Some(result) = self.remove.poll() {
      match result {
        Ok(attachments) => {
          self.attachments = attachments;
          self.notice = None;
        }
        Err(e) => {
          warn!("Attachment delete failed: {}", e);
          self.notice = Some(format!("Delete failed: {}", e));
        }
      }
    }

    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(10), // Record panel
        Constraint::Min(3),     // Attachments
        Constraint::Length(1),  // Notice line
      ])
      .split(area);

    self.render_record(frame, chunks[0]);
    self.render_attachments(frame, chunks[1]);
    self.render_notice(frame, chunks[2]);

    self.prompt.render_overlay(frame, area);
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    truncate(&self.job.company, 24)
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("u", "upload"),
      Shortcut::new("d", "delete"),
      Shortcut::new("o", "url"),
      Shortcut::new("q", "back"),
    ]
  }
}
