//! arbordb - A keyboard-driven terminal browser for database schemas and
//! query results
//!
//! Entry point: loads configuration, starts the tokio runtime that backs
//! the database layer, and runs the synchronous draw/input loop.

use std::cell::RefCell;
use std::io;
use std::rc::Rc;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing_subscriber::EnvFilter;

use arbordb::app::App;
use arbordb::config::{self, Registry};
use arbordb::db::browser::TreeContext;
use arbordb::db::pool::ConnectionPool;
use arbordb::ui::render;

#[derive(Parser, Debug)]
#[command(name = "arbordb")]
#[command(about = "Terminal browser for database schemas and query results")]
#[command(version)]
struct Args {
    /// Configuration directory (default: ~/.arbordb)
    #[arg(short, long)]
    config_dir: Option<std::path::PathBuf>,

    /// Only load the server profile with this name
    #[arg(short, long)]
    server: Option<String>,

    /// Log filter (overrides the config file, e.g. "debug")
    #[arg(long)]
    log: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config_dir = config::config_dir(args.config_dir.clone())?;
    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("creating {}", config_dir.display()))?;

    let settings = config::settings::load_settings(&config_dir)?;
    init_logging(&config_dir, args.log.as_deref().unwrap_or(&settings.log_filter))?;
    tracing::info!("starting up, config dir {}", config_dir.display());

    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;

    let registry = Rc::new(Registry::load(&config_dir)?);
    let mut servers = config::servers::load_servers(&config_dir)?;
    if let Some(only) = &args.server {
        servers.retain(|(name, _)| name == only);
        if servers.is_empty() {
            anyhow::bail!("no server named '{only}' in servers.toml");
        }
    }

    let pool = Rc::new(RefCell::new(ConnectionPool::new(
        runtime.handle().clone(),
        servers.clone(),
    )));
    let ctx = Rc::new(TreeContext {
        registry,
        pool: pool.clone(),
    });

    let mut app = App::new(ctx, settings.clone());
    // iterate in reverse so the first configured server ends up first
    // (new roots prepend)
    for (name, cfg) in servers.iter().rev() {
        app.add_server(name, cfg)?;
    }

    let tick = Duration::from_millis(settings.tick_ms);
    setup_terminal()?;
    let result = run(&mut app, tick);
    restore_terminal();
    pool.borrow_mut().disconnect_all();

    result
}

fn run(app: &mut App, tick: Duration) -> Result<()> {
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    while app.running {
        terminal.draw(|frame| render::render(frame, app))?;

        if event::poll(tick)? {
            match event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    app.handle_key(key);
                }
                // the next draw picks the new size up
                Event::Resize(..) => {}
                _ => {}
            }
        }
    }
    Ok(())
}

fn setup_terminal() -> Result<()> {
    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen)?;
    Ok(())
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
}

fn init_logging(config_dir: &std::path::Path, filter: &str) -> Result<()> {
    let path = config_dir.join("arbordb.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
