use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use tracing::warn;

use crate::backend::types::{AttachmentRecord, JobRecord};
use crate::context::SharedContext;
use crate::listing::{ListQuery, SortDir, SortKey};
use crate::query::{Action, Query, QueryState};
use crate::snapshot::RefreshPlan;
use crate::ui::components::{ConfirmDialog, ConfirmEvent, KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{applied_mark, status_color, truncate};
use crate::ui::view::{Shortcut, View, ViewAction, ViewOutcome};
use crate::ui::views::{JobDetailView, JobFormView};

/// Root view: the job list with search, filters, sorting and pagination.
///
/// This view owns the in-memory collections for the whole session. It is
/// hydrated from the local snapshot, refreshed per the staleness plan, and
/// receives mutation outcomes back from the form and detail views.
pub struct JobListView {
  ctx: SharedContext,
  jobs: Vec<JobRecord>,
  attachments: Vec<AttachmentRecord>,
  loaded: bool,

  refresh: Query<(Vec<JobRecord>, Vec<AttachmentRecord>)>,
  delete: Action<(Vec<JobRecord>, Vec<AttachmentRecord>)>,
  pending_delete: Option<JobRecord>,

  query: ListQuery,
  list_state: ListState,
  search: SearchInput,
  confirm: ConfirmDialog,
  status_line: Option<String>,
}

impl JobListView {
  pub fn new(ctx: SharedContext) -> Result<Self> {
    let hydration = ctx.store.hydrate()?;

    let store = ctx.store.clone();
    let mut refresh = Query::new(move || {
      let store = store.clone();
      async move { store.refresh_all().await.map_err(|e| e.to_string()) }
    });

    // With nothing cached the view stays "loading" until the first fetch
    // lands; a stale cache renders immediately while the refresh runs.
    let loaded = hydration.plan != RefreshPlan::InitialFetch;
    if hydration.plan != RefreshPlan::CacheOnly {
      refresh.fetch();
    }

    Ok(Self {
      ctx,
      jobs: hydration.jobs,
      attachments: hydration.attachments,
      loaded,
      refresh,
      delete: Action::idle(),
      pending_delete: None,
      query: ListQuery::default(),
      list_state: ListState::default(),
      search: SearchInput::new(),
      confirm: ConfirmDialog::new(),
      status_line: None,
    })
  }

  fn selected_job(&self) -> Option<JobRecord> {
    let listing = self.query.apply(&self.jobs);
    let idx = self.list_state.selected()?;
    listing.rows.get(idx).map(|job| (*job).clone())
  }

  fn move_selection(&mut self, delta: i32) {
    let len = self.query.apply(&self.jobs).rows.len();
    if len == 0 {
      return;
    }
    let current = self.list_state.selected().unwrap_or(0);
    let next = (current as i32 + delta).rem_euclid(len as i32) as usize;
    self.list_state.select(Some(next));
  }

  fn start_delete(&mut self) {
    let Some(job) = self.pending_delete.take() else {
      return;
    };

    let store = self.ctx.store.clone();
    let jobs = self.jobs.clone();
    let attachments = self.attachments.clone();
    self.delete.start(async move {
      store
        .delete_job(&job.id, &jobs, &attachments)
        .await
        .map_err(|e| e.to_string())
    });
  }

  fn render_filter_bar(&self, frame: &mut Frame, area: Rect) {
    let line = Line::from(vec![
      Span::styled("<f>", Style::default().fg(Color::Cyan)),
      Span::styled(" status: ", Style::default().fg(Color::DarkGray)),
      Span::styled(self.query.status.label(), Style::default().fg(Color::Yellow)),
      Span::styled("  <a>", Style::default().fg(Color::Cyan)),
      Span::styled(" applied: ", Style::default().fg(Color::DarkGray)),
      Span::styled(self.query.applied.label(), Style::default().fg(Color::Yellow)),
      Span::styled("  </>", Style::default().fg(Color::Cyan)),
      Span::styled(" search: ", Style::default().fg(Color::DarkGray)),
      Span::styled(
        if self.query.search.is_empty() {
          "-".to_string()
        } else {
          self.query.search.clone()
        },
        Style::default().fg(Color::Yellow),
      ),
      Span::styled("  <z>", Style::default().fg(Color::Cyan)),
      Span::styled(" size: ", Style::default().fg(Color::DarkGray)),
      Span::styled(
        self.query.page_size().to_string(),
        Style::default().fg(Color::Yellow),
      ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
  }

  fn render_column_header(&self, frame: &mut Frame, area: Rect) {
    let columns = [
      (SortKey::Company, "1", 22usize),
      (SortKey::Position, "2", 24),
      (SortKey::DateFound, "3", 10),
      (SortKey::Applied, "4", 7),
      (SortKey::Status, "5", 12),
    ];

    let mut spans = vec![Span::raw("  ")];
    for (key, hotkey, width) in columns {
      let active = self.query.sort_key() == key;
      let indicator = if active {
        self.query.sort_dir().indicator()
      } else {
        " "
      };
      let label = format!("{}[{}]{}", key.label(), hotkey, indicator);
      let style = if active {
        Style::default().fg(Color::Cyan).bold()
      } else {
        Style::default().fg(Color::DarkGray)
      };
      spans.push(Span::styled(format!("{:<width$} ", label, width = width), style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let listing = self.query.apply(&self.jobs);
    ensure_valid_selection(&mut self.list_state, listing.rows.len());

    let title = if self.refresh.is_loading() && !self.loaded {
      " Jobs (loading...) ".to_string()
    } else if self.refresh.is_loading() {
      format!(" Jobs ({}) (refreshing...) ", listing.total)
    } else {
      format!(" Jobs ({}) ", listing.total)
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if !self.loaded {
      let paragraph = Paragraph::new("Loading...")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    if listing.rows.is_empty() {
      let content = if self.jobs.is_empty() {
        "No jobs yet. Press 'c' to add the first one."
      } else {
        "No jobs match the current filters. Press 'F' to clear them."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = listing
      .rows
      .iter()
      .map(|job| {
        let line = Line::from(vec![
          Span::styled(
            format!("{:<22} ", truncate(&job.company, 21)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(format!("{:<24} ", truncate(&job.position, 23))),
          Span::styled(
            format!("{:<10} ", job.date_found),
            Style::default().fg(Color::DarkGray),
          ),
          Span::raw(format!("{:<7} ", applied_mark(job.applied))),
          Span::styled(
            format!("{:<12}", job.status.label()),
            Style::default().fg(status_color(job.status)),
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

  fn render_pagination(&self, frame: &mut Frame, area: Rect) {
    let listing = self.query.apply(&self.jobs);
    let line = Line::from(vec![
      Span::styled(
        format!(" Page {}/{} ", listing.page, listing.page_count),
        Style::default().fg(Color::White),
      ),
      Span::styled(
        format!(
          "({}-{} of {})",
          listing.start_display, listing.end_display, listing.total
        ),
        Style::default().fg(Color::DarkGray),
      ),
      Span::styled("  <p>", Style::default().fg(Color::Cyan)),
      Span::styled(" prev ", Style::default().fg(Color::DarkGray)),
      Span::styled("<n>", Style::default().fg(Color::Cyan)),
      Span::styled(" next", Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
  }

  fn render_status(&self, frame: &mut Frame, area: Rect) {
    let Some(message) = &self.status_line else {
      return;
    };
    let paragraph =
      Paragraph::new(format!(" {}", message)).style(Style::default().fg(Color::Red));
    frame.render_widget(paragraph, area);
  }
}

impl View for JobListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    // Modal layers get first refusal.
    match self.confirm.handle_key(key) {
      KeyResult::Event(ConfirmEvent::Confirmed) => {
        self.start_delete();
        return ViewAction::None;
      }
      KeyResult::Event(ConfirmEvent::Cancelled) => {
        self.pending_delete = None;
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(term)) => {
        self.query.set_search(term);
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) => return ViewAction::None,
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    let page_count = self.query.apply(&self.jobs).page_count;

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
      KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
      KeyCode::Char('r') => self.refresh.refetch(),

      KeyCode::Char('f') => self.query.cycle_status(),
      KeyCode::Char('a') => self.query.cycle_applied(),
      KeyCode::Char('F') => self.query.clear_filters(),
      KeyCode::Char('z') => self.query.cycle_page_size(),

      KeyCode::Char('1') => self.query.select_sort(SortKey::Company),
      KeyCode::Char('2') => self.query.select_sort(SortKey::Position),
      KeyCode::Char('3') => self.query.select_sort(SortKey::DateFound),
      KeyCode::Char('4') => self.query.select_sort(SortKey::Applied),
      KeyCode::Char('5') => self.query.select_sort(SortKey::Status),

      KeyCode::Char('n') | KeyCode::Right => {
        self.query.set_page(self.query.page() + 1, page_count)
      }
      KeyCode::Char('p') | KeyCode::Left => self
        .query
        .set_page(self.query.page().saturating_sub(1), page_count),

      KeyCode::Char('c') => {
        return ViewAction::Push(Box::new(JobFormView::create(self.ctx.clone())));
      }
      KeyCode::Char('e') => {
        if let Some(job) = self.selected_job() {
          return ViewAction::Push(Box::new(JobFormView::edit(self.ctx.clone(), job)));
        }
      }
      KeyCode::Char('d') => {
        if let Some(job) = self.selected_job() {
          let message = format!(
            "Delete {} at {}? Its attachments go with it.",
            job.position, job.company
          );
          self.pending_delete = Some(job);
          self.confirm.show("Delete job", message);
        }
      }
      KeyCode::Enter => {
        if let Some(job) = self.selected_job() {
          return ViewAction::Push(Box::new(JobDetailView::new(
            self.ctx.clone(),
            job,
            self.attachments.clone(),
          )));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Quit,
      _ => {}
    }
    ViewAction::None
  }

  fn tick(&mut self) -> ViewAction {
    if self.refresh.poll() {
      match self.refresh.state() {
        QueryState::Success((jobs, attachments)) => {
          self.jobs = jobs.clone();
          self.attachments = attachments.clone();
          self.loaded = true;
          self.status_line = None;
        }
        QueryState::Error(e) => {
          warn!("Refresh failed: {}", e);
          self.status_line = Some(format!("Refresh failed: {}", e));
          // Prior state stays; an empty first load still counts as loaded so
          // the failure is visible instead of an eternal spinner.
          self.loaded = true;
        }
        _ => {}
      }
    }

    if let Some(result) = self.delete.poll() {
      match result {
        Ok((jobs, attachments)) => {
          self.jobs = jobs;
          self.attachments = attachments;
          self.status_line = None;
        }
        Err(e) => {
          warn!("Delete failed: {}", e);
          self.status_line = Some(format!("Delete failed: {}", e));
        }
      }
    }

    ViewAction::None
  }

  fn on_outcome(&mut self, outcome: ViewOutcome) {
    match outcome {
      ViewOutcome::JobsChanged(jobs) => self.jobs = jobs,
      ViewOutcome::AttachmentsChanged(attachments) => self.attachments = attachments,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Filter bar
        Constraint::Length(1), // Column header
        Constraint::Min(1),    // Table
        Constraint::Length(1), // Pagination
        Constraint::Length(1), // Status line
      ])
      .split(area);

    self.render_filter_bar(frame, chunks[0]);
    self.render_column_header(frame, chunks[1]);
    self.render_table(frame, chunks[2]);
    self.render_pagination(frame, chunks[3]);
    self.render_status(frame, chunks[4]);

    self.search.render_overlay(frame, chunks[2]);
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Jobs".to_string()
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("c", "add"),
      Shortcut::new("e", "edit"),
      Shortcut::new("d", "delete"),
      Shortcut::new("r", "refresh"),
      Shortcut::new("q", "quit"),
    ]
  }
}
