//! # Bot Error Type
//!
//! Unified error type for the runtime.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Bot                                │
//! │                                                                         │
//! │  Inbound message                                                       │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Machine::handle  (never fails: input errors are replies)        │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Effect execution  BotResult<T>                                  │  │
//! │  │         │                                                        │  │
//! │  │         ├── image decode failed ─► BotError::Logo ─► logo_failed │  │
//! │  │         │                                           (state ready)│  │
//! │  │         ├── DbError / io::Error ─► error! log ─► "try later"     │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use invoice_core::CoreError;
use invoice_db::DbError;

/// Machine-readable category of a [`BotError`], logged with every failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed user input.
    ValidationError,

    /// A well-formed request whose preconditions do not hold.
    Precondition,

    /// An uploaded resource (the logo) could not be processed.
    ResourceError,

    /// Record store failure.
    DatabaseError,

    /// Bad configuration or locale file.
    ConfigError,

    /// Malformed transport line.
    TransportError,

    /// Anything else.
    Internal,
}

/// Runtime errors.
#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The uploaded logo could not be decoded or re-encoded.
    #[error("{0}")]
    Logo(String),

    #[error("Invalid inbound message: {0}")]
    Transport(String),
}

impl BotError {
    /// Returns the category of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            BotError::Core(CoreError::Validation(_)) => ErrorCode::ValidationError,
            BotError::Core(err) if err.is_precondition() => ErrorCode::Precondition,
            BotError::Core(_) => ErrorCode::Internal,
            BotError::Db(_) => ErrorCode::DatabaseError,
            BotError::Config(_) => ErrorCode::ConfigError,
            BotError::Io(_) => ErrorCode::Internal,
            BotError::Logo(_) => ErrorCode::ResourceError,
            BotError::Transport(_) => ErrorCode::TransportError,
        }
    }
}

impl From<image::ImageError> for BotError {
    fn from(err: image::ImageError) -> Self {
        BotError::Logo(err.to_string())
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::Transport(err.to_string())
    }
}

/// Result type for runtime operations.
pub type BotResult<T> = Result<T, BotError>;
