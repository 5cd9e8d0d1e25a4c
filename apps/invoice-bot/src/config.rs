//! # Bot Configuration
//!
//! Configuration loaded at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`INVOICE_BOT_*`)
//! 2. Config file (`INVOICE_BOT_CONFIG`, else `<config dir>/config.toml`)
//! 3. Defaults (this file)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BotConfig::default()                                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  config.toml present? ── yes ──► toml::from_str (partial files ok)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INVOICE_BOT_FEE_MULTIPLIER / _DATABASE_PATH / _OUTPUT_DIR /           │
//! │  _LOCALE_PATH / _CALENDAR                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate() ── bad value? ──► ConfigError                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Read-only after initialization.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use invoice_core::calendar::DisplayCalendar;
use invoice_core::conversation::Locale;
use invoice_core::layout::LayoutConfig;
use invoice_core::{FeeMultiplier, DEFAULT_FEE_MULTIPLIER};

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "INVOICE_BOT_";

/// Environment variable naming the config file.
pub const CONFIG_PATH_VAR: &str = "INVOICE_BOT_CONFIG";

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

impl ConfigError {
    fn invalid(key: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Multiplier applied to raw unit prices.
    /// Default: 83600
    pub fee_multiplier: i64,

    /// SQLite record store file.
    pub database_path: PathBuf,

    /// Root of the invoice archive.
    pub output_dir: PathBuf,

    /// Optional TOML file overriding the built-in English texts.
    pub locale_path: Option<PathBuf>,

    /// Calendar used for the date printed on invoices.
    /// Default: persian
    pub calendar: DisplayCalendar,

    /// Document geometry.
    pub layout: LayoutConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        let data_dir = project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        BotConfig {
            fee_multiplier: DEFAULT_FEE_MULTIPLIER,
            database_path: data_dir.join("invoice-bot.db"),
            output_dir: data_dir.join("invoices"),
            locale_path: None,
            calendar: DisplayCalendar::default(),
            layout: LayoutConfig::default(),
        }
    }
}

impl BotConfig {
    /// Loads configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let env = |key: &str| std::env::var(key).ok();
        let path = env(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .or_else(default_config_path);

        Self::load_from(path.as_deref(), env)
    }

    /// Loads configuration from an optional file plus an environment lookup.
    ///
    /// A missing file is not an error; the defaults apply.
    pub fn load_from(
        path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => {
                info!(path = %path.display(), "Loading config file");
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                toml::from_str(&text).map_err(|e| ConfigError::Parse {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?
            }
            _ => {
                debug!("No config file, using defaults");
                BotConfig::default()
            }
        };

        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let var = |name: &str| env(&format!("{ENV_PREFIX}{name}"));

        if let Some(value) = var("FEE_MULTIPLIER") {
            self.fee_multiplier = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid("fee_multiplier", format!("'{value}' is not an integer")))?;
        }
        if let Some(value) = var("DATABASE_PATH") {
            self.database_path = PathBuf::from(value);
        }
        if let Some(value) = var("OUTPUT_DIR") {
            self.output_dir = PathBuf::from(value);
        }
        if let Some(value) = var("LOCALE_PATH") {
            self.locale_path = Some(PathBuf::from(value));
        }
        if let Some(value) = var("CALENDAR") {
            self.calendar = value
                .parse()
                .map_err(|e: String| ConfigError::invalid("calendar", e))?;
        }
        Ok(())
    }

    /// Rejects values the pricing and layout code cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fee_multiplier <= 0 {
            return Err(ConfigError::invalid("fee_multiplier", "must be positive"));
        }

        let layout = &self.layout;
        if layout.line_height == 0 {
            return Err(ConfigError::invalid("layout.line_height", "must be positive"));
        }
        if layout.name_wrap_chars == 0 {
            return Err(ConfigError::invalid("layout.name_wrap_chars", "must be positive"));
        }
        let cols = &layout.columns;
        if [cols.total, cols.unit_price, cols.quantity, cols.name, cols.index].contains(&0) {
            return Err(ConfigError::invalid("layout.columns", "every width must be positive"));
        }
        // The tallest fixed block (logo + title + spacer) must fit on a page.
        let first_block = layout.logo_height + layout.line_height + layout.spacer_height;
        if layout.page_height < first_block {
            return Err(ConfigError::invalid(
                "layout.page_height",
                format!("must be at least {first_block}"),
            ));
        }
        Ok(())
    }

    pub fn fee(&self) -> FeeMultiplier {
        FeeMultiplier::new(self.fee_multiplier)
    }

    /// Loads the locale: built-in English, overlaid by `locale_path` if set.
    pub fn load_locale(&self) -> Result<Locale, ConfigError> {
        let Some(path) = &self.locale_path else {
            return Ok(Locale::default());
        };

        info!(path = %path.display(), "Loading locale");
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            message: e.to_string(),
        })
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "invoicebot", "invoice-bot")
}

/// `<platform config dir>/config.toml`
///
/// - **macOS**: `~/Library/Application Support/com.invoicebot.invoice-bot/config.toml`
/// - **Linux**: `~/.config/invoice-bot/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}
