// main.rs

mod ai;
mod api;
mod app;
mod config;
mod error;
mod models;
mod parser;
mod server;
mod store;
mod timestamp;
mod ui;

use crate::api::ApiClient;
use crate::app::App;
use crate::config::Config;
use anyhow::Context;
use clap::{Parser, Subcommand};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use dotenv::dotenv;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "daily_tasks=info,tower_http=info";

#[derive(Parser, Debug)]
#[command(name = "daily-tasks", version, about = "Dated tasks with an AI day planner")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the task store and AI proxy over HTTP
    Serve {
        /// Address to listen on, e.g. 127.0.0.1:3000
        #[arg(long)]
        bind: Option<String>,
        /// sqlite:// URL; tasks stay in memory when unset
        #[arg(long)]
        database_url: Option<String>,
    },
    /// Open the terminal client (default)
    Tui {
        /// Base URL of a running `daily-tasks serve`
        #[arg(long)]
        server: Option<String>,
    },
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into())
}

fn init_server_logging() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// The terminal belongs to the UI, so logs go to a file
fn init_tui_logging() -> anyhow::Result<()> {
    let Some(dir) = dirs::cache_dir().map(|d| d.join("daily-tasks")) else {
        return Ok(());
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating log directory {}", dir.display()))?;
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("tui.log"))?;

    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file)),
        )
        .init();
    Ok(())
}

async fn run_tui(config: Config) -> anyhow::Result<()> {
    init_tui_logging()?;
    let backend = ApiClient::new(&config.server_url);

    let mut app = App::default();
    if let Err(err) = app.refresh_tasks(&backend).await {
        tracing::warn!("initial fetch failed: {}", err);
        app.apply(app::Action::Status(format!(
            "Could not reach {}: {}",
            config.server_url, err
        )));
    }

    // Setup terminal UI
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.hide_cursor()?;

    let res = ui::run_app(&mut terminal, app, &backend).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res.context("terminal UI failed")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();
    let mut config = Config::load()?;

    match cli.command.unwrap_or(Command::Tui { server: None }) {
        Command::Serve { bind, database_url } => {
            init_server_logging();
            if let Some(bind) = bind {
                config.bind = bind;
            }
            if database_url.is_some() {
                config.database_url = database_url;
            }
            server::serve(config).await
        }
        Command::Tui { server } => {
            if let Some(server) = server {
                config.server_url = server;
            }
            run_tui(config).await
        }
    }
}
