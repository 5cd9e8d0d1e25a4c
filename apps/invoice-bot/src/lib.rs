//! # Invoice Bot Library
//!
//! Runtime for the chat-driven invoice bot: configuration, sessions, the
//! message dispatcher, document rendering and the line transport.
//!
//! ## Module Organization
//! ```text
//! invoice_bot/
//! ├── lib.rs          ◄─── You are here (startup & run)
//! ├── config.rs       ◄─── BotConfig: file + env, locale loading
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   └── session.rs  ◄─── Per-user carts
//! ├── bot.rs          ◄─── Message dispatcher + effect execution
//! ├── logo.rs         ◄─── Logo decode / PNG normalization
//! ├── document.rs     ◄─── Text renderer and pagination
//! ├── archive.rs      ◄─── Invoice archive paths and writes
//! ├── transport.rs    ◄─── JSON lines on stdin / stdout
//! └── error.rs        ◄─── BotError + ErrorCode
//! ```

pub mod archive;
pub mod bot;
pub mod config;
pub mod document;
pub mod error;
pub mod logo;
pub mod state;
pub mod transport;

use std::sync::Arc;

use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bot::Bot;
use config::BotConfig;
use error::BotResult;
use invoice_db::{Database, DbConfig};

/// Runs the bot until stdin closes.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                       Bot Startup                                       │
/// │                                                                         │
/// │  1. Initialize Logging ───────────────────────────────────────────────► │
/// │     • tracing-subscriber with env filter, written to stderr             │
/// │     • Default: INFO, can be overridden with RUST_LOG                    │
/// │                                                                         │
/// │  2. Load Configuration ───────────────────────────────────────────────► │
/// │     • config.toml + INVOICE_BOT_* overrides                             │
/// │     • locale overlay (locales/fa.toml for Persian)                      │
/// │                                                                         │
/// │  3. Connect to Database ──────────────────────────────────────────────► │
/// │     • SQLite with WAL mode                                              │
/// │     • Run pending migrations                                            │
/// │                                                                         │
/// │  4. Serve ────────────────────────────────────────────────────────────► │
/// │     • JSON lines in on stdin, replies out on stdout                     │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run() -> BotResult<()> {
    init_tracing();

    info!("Starting invoice bot");

    let config = BotConfig::load()?;
    let locale = config.load_locale()?;

    if let Some(parent) = config.database_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    info!(db_path = %config.database_path.display(), output_dir = %config.output_dir.display(), "Configuration loaded");

    let db = Database::new(DbConfig::new(&config.database_path)).await?;
    info!("Database connected and migrations applied");

    let bot = Arc::new(Bot::new(db.clone(), config, locale));
    let result = transport::serve(bot, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await;

    db.close().await;
    info!("Invoice bot stopped");
    result
}

/// Initializes the tracing subscriber for structured logging.
///
/// Logs go to stderr; stdout carries the transport.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=invoice=trace` - Show trace for invoice crates only
/// - Default: INFO level
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,invoice=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
