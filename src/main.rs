mod admin;
mod api;
mod app;
mod auth;
mod config;
mod debounce;
mod editor;
mod error;
mod form;
mod models;
mod request;
mod session;
mod tasks;
#[cfg(test)]
mod testing;
mod ui;
mod validate;

use crate::api::ApiClient;
use crate::app::{App, Settings};
use crate::config::Config;
use crate::session::SessionStore;
use clap::{ArgAction, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use dotenv::dotenv;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "taskdeck", version, about = "Terminal client for the task manager API")]
struct Cli {
    /// Config file (defaults to the user config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base URL of the task manager API
    #[arg(long)]
    api_url: Option<String>,

    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// Forget the stored session and exit
    #[arg(long)]
    logout: bool,
}

// The terminal belongs to the UI, so logs go to a daily file.
fn init_tracing(config: &Config, verbose: u8) -> Result<WorkerGuard, Box<dyn std::error::Error>> {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    std::fs::create_dir_all(&config.log_dir)?;
    let appender = tracing_appender::rolling::daily(&config.log_dir, "taskdeck.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|err| err.to_string())?;
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv().ok();
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref(), cli.api_url.as_deref())?;
    let _guard = init_tracing(&config, cli.verbose)?;
    info!(api_url = %config.api_url, "starting");

    let session = SessionStore::new(&config.session_file);
    if cli.logout {
        session.clear()?;
        println!("Signed out.");
        return Ok(());
    }

    let settings = Settings {
        page_size: config.page_size,
        search_debounce: config.search_debounce,
        otp_signup: config.otp_signup,
    };
    let mut app = App::new(ApiClient::new(config.api_url.clone()), session, settings);
    app.start().await;

    // Setup terminal UI
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    terminal.hide_cursor()?;

    let res = ui::run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}
