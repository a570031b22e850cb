mod app;
mod backend;
mod config;
mod context;
mod event;
mod listing;
mod logging;
mod query;
mod snapshot;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "jobtrack")]
#[command(about = "A terminal UI for tracking job applications")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/jobtrack/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Register the configured account before signing in
  #[arg(long)]
  register: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Logging goes to a file; the terminal belongs to the UI.
  let _log_guard = logging::init()?;

  // Initialize and run the app
  let mut app = app::App::new(config, args.register).await?;
  app.run().await?;

  Ok(())
}
