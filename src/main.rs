use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tripchat_core::Config;

mod app;
mod handler;
mod markup;
mod tui;
mod ui;
mod view;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "tripchat")]
#[command(version, about = "Plan trips by chatting with a travel backend, with live weather")]
struct Cli {
    /// Base URL of the travel backend
    #[arg(short, long)]
    backend_url: Option<String>,

    /// Destination to open with (overrides the saved default)
    #[arg(short, long)]
    location: Option<String>,

    /// Log file (defaults to the user cache directory)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn default_log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("tripchat").join("tripchat.log"))
}

/// Log to a file so the terminal UI is left alone.
fn init_logging(path: Option<PathBuf>) {
    let Some(path) = path.or_else(default_log_path) else {
        return;
    };
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let Ok(file) = std::fs::File::create(&path) else {
        return;
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tripchat=info,tripchat_core=info"));

    tracing_subscriber::fmt()
        .with_writer(std::sync::Mutex::new(file))
        .with_env_filter(filter)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.log_file);

    // Load config
    let config = Config::load_or_default();
    let backend_url = config.resolve_backend_url(cli.backend_url.as_deref());

    // An explicit --location is a one-off and is not saved as the default
    let remember_location = cli.location.is_none();
    let default_location = cli.location.or(config.default_location);

    info!(backend = %backend_url, "Starting tripchat");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let mut app = App::new(&backend_url, default_location, remember_location, events.sender());
    app.request_locations();

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    Ok(())
}
