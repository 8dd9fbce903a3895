use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use clipboard_history_lib::core::clipboard::{HistoryStore, JsonFileStore};
use clipboard_history_lib::shared::errors::EngineResult;
use clipboard_history_lib::shared::settings::EngineSettings;
use clipboard_history_lib::system::clipboard::SystemClipboard;
use clipboard_history_lib::{AppContext, HistoryEvent};

const PREVIEW_CHARS: usize = 60;

#[derive(Parser, Debug)]
#[command(name = "clipboard-history", version, about = "Clipboard history engine")]
struct Cli {
    /// Maximum number of entries to keep
    #[arg(long, global = true)]
    capacity: Option<usize>,

    /// Clipboard polling period in milliseconds
    #[arg(long, global = true)]
    interval_ms: Option<u64>,

    /// History file location
    #[arg(long, global = true)]
    history_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watch the clipboard and record history (default)
    Watch,
    /// Print the saved history
    List {
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Print effective settings and file locations
    Config,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_settings(cli: &Cli) -> EngineSettings {
    let mut settings = EngineSettings::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load settings, using defaults");
        EngineSettings::default()
    });
    if let Some(capacity) = cli.capacity {
        settings.capacity = capacity.max(1);
    }
    if let Some(interval) = cli.interval_ms {
        settings.poll_interval_ms = interval.max(1);
    }
    if let Some(path) = &cli.history_file {
        settings.history_path = Some(path.clone());
    }
    settings
}

async fn watch(settings: EngineSettings) {
    let ctx = AppContext::new(settings, Arc::new(SystemClipboard::new()));
    if let Some(path) = ctx.history_path() {
        tracing::info!(path = %path.display(), "using history file");
    }
    let mut events = ctx.engine().subscribe();
    ctx.start();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("shutting down");
                break;
            }
            event = events.recv() => match event {
                Ok(HistoryEvent::Ingested(entry)) => {
                    tracing::info!(
                        id = %entry.id,
                        pinned = entry.pinned,
                        preview = %entry.preview(PREVIEW_CHARS),
                        "copied"
                    );
                }
                Ok(HistoryEvent::Evicted { ids }) => {
                    tracing::info!(count = ids.len(), "evicted old entries");
                }
                Ok(other) => tracing::debug!(event = ?other, "history changed"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "event receiver lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    ctx.shutdown();
}

fn list(settings: &EngineSettings, limit: Option<usize>) -> EngineResult<()> {
    let path = settings.resolve_history_path()?;
    let entries = JsonFileStore::new(&path).load()?;
    let limit = limit.unwrap_or(entries.len());

    for entry in entries.iter().take(limit) {
        let marker = if entry.pinned { "*" } else { " " };
        println!(
            "{} {}  {}  {}",
            marker,
            entry.id,
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.preview(PREVIEW_CHARS)
        );
    }
    Ok(())
}

fn print_config(settings: &EngineSettings) -> EngineResult<()> {
    let json = serde_json::to_string_pretty(settings)?;
    println!("{}", json);
    if let Ok(path) = EngineSettings::get_settings_path() {
        println!("settings file: {}", path.display());
    }
    if let Ok(path) = settings.resolve_history_path() {
        println!("history file:  {}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let settings = load_settings(&cli);

    let result = match cli.command.unwrap_or(Command::Watch) {
        Command::Watch => {
            watch(settings).await;
            Ok(())
        }
        Command::List { limit } => list(&settings, limit),
        Command::Config => print_config(&settings),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        std::process::exit(1);
    }
}
