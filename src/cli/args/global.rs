//! Global CLI options shared across all commands
//!
//! Collected once in `main.rs` so handlers take a single `&GlobalOptions`
//! instead of every flag separately.

use std::path::PathBuf;

use crate::cli::{Cli, OutputFormat};
use crate::error::Result;
use crate::store::SqliteCacheStorage;

/// Global CLI options passed to all command handlers.
///
/// Precedence is CLI flag > environment variable > config file > default.
/// This struct captures the CLI/env layer; config file values are merged in
/// `CommandContext`.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    /// Output format (pretty, table, json)
    pub format: OutputFormat,

    /// Custom config file path (defaults to ~/.nearly/config.yaml)
    pub config: Option<String>,

    /// Custom cache directory (defaults to the platform cache dir)
    pub cache_dir: Option<String>,

    /// App origin override
    pub origin: Option<String>,
}

impl GlobalOptions {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            format: cli.format,
            config: cli.config.clone(),
            cache_dir: cli.cache_dir.clone(),
            origin: cli.origin.clone(),
        }
    }

    pub fn config_ref(&self) -> Option<&str> {
        self.config.as_deref()
    }

    /// Cache directory: the override if given, else the platform default
    pub fn resolve_cache_dir(&self) -> Result<PathBuf> {
        match self.cache_dir.as_deref() {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => Ok(SqliteCacheStorage::cache_dir()?),
        }
    }
}
