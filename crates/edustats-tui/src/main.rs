//! Edustats - a terminal dashboard for education platform statistics.
//!
//! The last fetched numbers are shown straight from the local cache while a
//! fresh copy is fetched in the background.

mod app;
mod cli;
mod ui;

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use edustats_core::{
    ApiClient, Config, FileStore, MemoryStore, Revalidator, Role, StatsView, DB_NAME, STORE_NAME,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::{App, AppState, StoreBackend};
use cli::{Args, Mode};
use ui::input::handle_input;
use ui::render::render;

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Log file name inside the cache directory
const LOG_FILE: &str = "edustats.log";

/// Initialize the tracing subscriber.
///
/// The dashboard owns the terminal, so it logs to a file in `log_dir`;
/// headless runs log to stderr. Use RUST_LOG to control the level.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_dir {
        Some(dir) => {
            if std::fs::create_dir_all(dir).is_err() {
                return None;
            }
            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

/// Open the persistent cache. A cache that cannot be opened is not fatal:
/// the run continues with an in-memory store.
fn open_store(cache_root: &Path, no_cache: bool) -> StoreBackend {
    if no_cache {
        return StoreBackend::Memory(MemoryStore::new());
    }
    match FileStore::open(cache_root, DB_NAME, STORE_NAME) {
        Ok(store) => StoreBackend::File(store),
        Err(e) => {
            warn!(error = %e, root = ?cache_root, "Failed to open cache, using memory only");
            StoreBackend::Memory(MemoryStore::new())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    let print_role = match args.mode() {
        Mode::Print(role) => Some(role),
        Mode::Dashboard => None,
    };

    let (mut config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    let cache_root = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));

    let _log_guard = match print_role {
        Some(_) => init_tracing(None),
        None => init_tracing(Some(&cache_root)),
    };
    if let Some(e) = config_error {
        warn!(error = %e, "Failed to load config, using defaults");
    }
    config.apply_env();

    let store = open_store(&cache_root, args.no_cache);

    match print_role {
        Some(role) => print_statistics(config, store, role).await,
        None => run_dashboard(config, store).await,
    }
}

/// Hydrate, revalidate once and print whatever ends up on display.
async fn print_statistics(config: Config, store: StoreBackend, role: Option<Role>) -> Result<()> {
    let context = config
        .session_context()
        .with_role(role.unwrap_or(config.role));
    let api = ApiClient::new(config.api_base_url.clone())?.with_context(&context);
    let revalidator = Revalidator::new(store);
    let mut view = StatsView::new();

    let refreshed = view
        .mount(&revalidator, context.role.resource().key, || {
            api.fetch_statistics(context.role)
        })
        .await;
    if let Err(e) = refreshed {
        warn!("{:#}", anyhow::Error::new(e));
    }

    let payload = view.payload().ok_or_else(|| {
        anyhow!(
            "No {} statistics available: nothing cached and the refresh failed",
            context.role
        )
    })?;
    println!("{}", serde_json::to_string_pretty(payload)?);
    Ok(())
}

async fn run_dashboard(config: Config, store: StoreBackend) -> Result<()> {
    info!("Edustats starting");
    let initial_role = config.role;

    let mut app = App::new(config, store)?;
    app.select_role(initial_role);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if app.role() != initial_role {
        remember_role(app.role());
    }

    info!("Edustats shutting down");
    result
}

/// Persist the last viewed dashboard without writing environment overrides
/// back to the config file.
fn remember_role(role: Role) {
    let mut saved = Config::load().unwrap_or_default();
    saved.role = role;
    if let Err(e) = saved.save() {
        warn!(error = %e, "Failed to save config");
    }
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| render(f, app))?;

        // Poll with a timeout so background results get applied
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                if handle_input(app, key) {
                    return Ok(());
                }
            }
        }

        app.check_background_tasks();

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
