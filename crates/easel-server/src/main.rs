//! Easel server binary.
//!
//! # Usage
//!
//! ```bash
//! # Serve the canvas protocol on stdin/stdout, JSON files under ./data
//! easel-server run
//!
//! # redb backend, faster flushes, shorter chat history
//! easel-server run --backend redb --flush-interval-ms 1000 --chat-history 20
//!
//! # List rooms with persisted documents
//! easel-server rooms --data-dir data
//! ```
//!
//! Logs go to stderr; stdout carries only protocol lines.

use std::{
    io::Write,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{Args, Parser, Subcommand};
use easel_server::{Backend, FileStorage, RedbStorage, ServerConfig, ServerError, Storage};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Collaborative canvas state server
#[derive(Parser, Debug)]
#[command(name = "easel-server")]
#[command(about = "Room-scoped stroke and chat store for a collaborative canvas")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the line-delimited JSON protocol on stdin/stdout
    Run(RunArgs),
    /// List rooms with persisted strokes or chat
    Rooms(StorageArgs),
}

#[derive(Args, Debug)]
struct StorageArgs {
    /// Directory holding room documents
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Storage backend
    #[arg(long, value_enum, default_value_t = Backend::File)]
    backend: Backend,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    storage: StorageArgs,

    /// Milliseconds between background flush cycles
    #[arg(long, default_value = "5000")]
    flush_interval_ms: u64,

    /// Chat messages kept per room
    #[arg(long, default_value = "50")]
    chat_history: NonZeroUsize,

    /// Retry rooms whose background write failed on the next cycle
    #[arg(long)]
    retry_failed_flushes: bool,
}

impl RunArgs {
    fn into_config(self) -> Result<ServerConfig, ServerError> {
        if self.flush_interval_ms == 0 {
            return Err(ServerError::Config("--flush-interval-ms must be positive".to_string()));
        }
        Ok(ServerConfig {
            data_dir: self.storage.data_dir,
            backend: self.storage.backend,
            flush_interval: Duration::from_millis(self.flush_interval_ms),
            chat_history: self.chat_history,
            retry_failed_flushes: self.retry_failed_flushes,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let cli = Cli::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

    match cli.command {
        Command::Run(args) => run(args.into_config()?).await,
        Command::Rooms(args) => rooms(&args),
    }
}

async fn run(config: ServerConfig) -> Result<(), ServerError> {
    tracing::info!(
        data_dir = %config.data_dir.display(),
        backend = ?config.backend,
        flush_interval_ms = config.flush_interval.as_millis(),
        chat_history = config.chat_history.get(),
        "easel server starting"
    );

    let report = match config.backend {
        Backend::File => easel_server::run_stdio(open_file(&config.data_dir)?, &config).await?,
        Backend::Redb => {
            easel_server::run_stdio(open_redb(&config.data_dir)?, &config).await?
        },
    };

    if !report.is_clean() {
        tracing::error!(
            strokes = ?report.strokes.failed,
            chat = ?report.chat.failed,
            "some rooms were not persisted on shutdown"
        );
    }
    Ok(())
}

fn rooms(args: &StorageArgs) -> Result<(), ServerError> {
    match args.backend {
        Backend::File => print_rooms(&open_file(&args.data_dir)?),
        Backend::Redb => print_rooms(&open_redb(&args.data_dir)?),
    }
}

fn print_rooms<S: Storage>(storage: &S) -> Result<(), ServerError> {
    let mut out = std::io::stdout().lock();
    for (kind, rooms) in easel_server::persisted_rooms(storage)? {
        for room in rooms {
            writeln!(out, "{kind}\t{room}")?;
        }
    }
    Ok(())
}

fn open_file(dir: &Path) -> Result<FileStorage, ServerError> {
    FileStorage::open(dir).map_err(|e| ServerError::Config(format!("{}: {e}", dir.display())))
}

fn open_redb(dir: &Path) -> Result<RedbStorage, ServerError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| ServerError::Config(format!("{}: {e}", dir.display())))?;
    RedbStorage::open(dir.join(easel_server::REDB_FILE_NAME))
        .map_err(|e| ServerError::Config(format!("{}: {e}", dir.display())))
}
