//! Command-line configuration.
//!
//! # Configuration Sources
//!
//! Configuration can be provided via:
//! - CLI arguments (`tallykv data.csv --no-prompt`)
//! - Environment variables (`TALLYKV_FILE`, `TALLYKV_PROMPT`, `TALLYKV_LOG`)
//! - Default values

use crate::error::StoreError;
use clap::Parser;
use std::path::PathBuf;

/// Default backing file.
pub const DEFAULT_FILE: &str = "db.csv";

/// Default prompt printed before each command.
pub const DEFAULT_PROMPT: &str = "> ";

/// Session configuration loaded from CLI args and environment variables.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "tallykv",
    about = "Interactive key-value store with value counts and transactions",
    version
)]
pub struct SessionConfig {
    /// Backing file, created on first save if missing
    #[arg(env = "TALLYKV_FILE", default_value = DEFAULT_FILE)]
    pub file: PathBuf,

    /// Prompt printed before each command
    #[arg(long, env = "TALLYKV_PROMPT", default_value = DEFAULT_PROMPT)]
    pub prompt: String,

    /// Do not print a prompt (for piped input)
    #[arg(long)]
    pub no_prompt: bool,

    /// Log filter directive, e.g. `debug` or `tallykv=trace`
    #[arg(long, env = "TALLYKV_LOG", default_value = "warn")]
    pub log_level: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_FILE),
            prompt: DEFAULT_PROMPT.to_string(),
            no_prompt: false,
            log_level: "warn".to_string(),
        }
    }
}

impl SessionConfig {
    /// Parse configuration from command-line arguments.
    #[must_use]
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Prompt to print, or `None` when disabled.
    pub fn prompt(&self) -> Option<&str> {
        (!self.no_prompt && !self.prompt.is_empty()).then_some(self.prompt.as_str())
    }

    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Config` if the backing path is a directory.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.file.is_dir() {
            return Err(StoreError::Config(format!(
                "backing file is a directory: {}",
                self.file.display()
            )));
        }
        Ok(())
    }
}
