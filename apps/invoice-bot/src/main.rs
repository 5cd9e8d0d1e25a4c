//! # Invoice Bot Entry Point
//!
//! Reads chat messages as JSON lines on stdin and answers on stdout.
//! Configuration: `INVOICE_BOT_*` variables or `config.toml` (see
//! `config.example.toml`). Logging: `RUST_LOG`, written to stderr.

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match invoice_bot::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("invoice-bot: {e} ({:?})", e.code());
            ExitCode::FAILURE
        }
    }
}
