use crate::backend::auth::AuthClient;
use crate::backend::cached_client::CachedStoreClient;
use crate::backend::client::StoreClient;
use crate::backend::storage::BlobClient;
use crate::backend::types::Session;
use crate::config::Config;
use crate::context::{AppContext, SharedContext};
use crate::event::{Event, EventHandler};
use crate::snapshot::{SnapshotStore, SqliteSnapshot};
use crate::ui::renderfns::draw_header;
use crate::ui::view::{View, ViewAction};
use crate::ui::views::JobListView;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::warn;

/// Main application: signs in, builds the context, and drives the view stack.
pub struct App {
  ctx: SharedContext,
  view_stack: Vec<Box<dyn View>>,
  session_watch: watch::Receiver<Option<Session>>,
  should_quit: bool,
}

impl App {
  pub async fn new(config: Config, register: bool) -> Result<Self> {
    let auth = AuthClient::new(&config)?;
    let password = Config::get_password()?;

    if register {
      auth.sign_up(&config.email, &password).await?;
    }
    let session = auth.sign_in(&config.email, &password).await?;
    let session_watch = auth.subscribe();

    let store = StoreClient::new(&config)?;
    let blob = BlobClient::new(&config)?;
    let snapshot: Arc<dyn SnapshotStore> = Arc::new(SqliteSnapshot::open()?);
    let cached = CachedStoreClient::new(store, blob, snapshot, session);

    let ctx: SharedContext = Arc::new(AppContext {
      config,
      auth,
      store: cached,
    });

    let root = JobListView::new(ctx.clone())?;

    Ok(Self {
      ctx,
      view_stack: vec![Box::new(root)],
      session_watch,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(250));

    // Main loop
    while !self.should_quit {
      terminal.draw(|frame| self.draw(frame))?;

      if let Some(event) = events.next().await {
        match event {
          Event::Key(key) => {
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
              self.should_quit = true;
            } else if let Some(view) = self.view_stack.last_mut() {
              let action = view.handle_key(key);
              self.apply(action);
            }
          }
          Event::Tick => {
            if let Some(view) = self.view_stack.last_mut() {
              let action = view.tick();
              self.apply(action);
            }
            // A revoked session ends the run.
            if self.session_watch.borrow().is_none() {
              self.should_quit = true;
            }
          }
        }
      }
    }

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    // Best-effort sign-out; the session dies with the process either way.
    let session = self.session_watch.borrow().clone();
    if let Some(session) = session {
      if let Err(e) = self.ctx.auth.sign_out(&session).await {
        warn!("Sign-out failed: {}", e);
      }
    }

    Ok(())
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
      ViewAction::PopWith(outcome) => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
          if let Some(view) = self.view_stack.last_mut() {
            view.on_outcome(outcome);
          }
        } else {
          self.should_quit = true;
        }
      }
      ViewAction::Quit => self.should_quit = true,
    }
  }

  fn draw(&mut self, frame: &mut Frame) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Header
        Constraint::Min(1),    // Current view
      ])
      .split(frame.area());

    let title = self.ctx.config.display_title();
    let account = self.ctx.store.session().email.clone();
    let breadcrumb: Vec<String> = self
      .view_stack
      .iter()
      .map(|view| view.breadcrumb_label())
      .collect();
    let shortcuts = self
      .view_stack
      .last()
      .map(|view| view.shortcuts())
      .unwrap_or_default();

    draw_header(frame, chunks[0], &title, &account, &breadcrumb, &shortcuts);

    if let Some(view) = self.view_stack.last_mut() {
      view.render(frame, chunks[1]);
    }
  }
}
