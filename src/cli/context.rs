//! Command execution context
//!
//! Loads configuration, opens the store, restores the persisted lifecycle
//! state and starts the worker loop. Commands that deliver events build one
//! of these and call [`CommandContext::finish`] when done.

use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::config::Config;
use crate::error::Result;
use crate::network::HttpNetwork;
use crate::output::WorkerMeta;
use crate::store::SqliteCacheStorage;
use crate::worker::{CacheRouter, RouterSettings, WorkerHandle, WorkerRecord, WorkerState};

/// Context for command execution.
pub struct CommandContext {
    /// Loaded configuration with CLI overrides applied
    pub config: Config,
    /// Directory holding the database, blobs and `worker.yaml`
    pub cache_dir: PathBuf,
    pub format: OutputFormat,
    /// Running worker loop
    pub worker: WorkerHandle,
    initial_state: WorkerState,
}

impl CommandContext {
    /// Build the context. Must run inside the tokio runtime.
    pub fn new(opts: &GlobalOptions) -> Result<Self> {
        let config = load_config(opts)?;
        let settings = RouterSettings::from_config(&config)?;

        let cache_dir = opts.resolve_cache_dir()?;
        let storage = Arc::new(SqliteCacheStorage::open_at(&cache_dir)?);

        let record = WorkerRecord::load(&cache_dir)?;
        let initial_state = WorkerRecord::effective_state(record.as_ref(), &config.cache_version);
        log::debug!(
            "Worker state for {}: {}",
            config.cache_version,
            initial_state
        );

        let network = HttpNetwork::new(Duration::from_secs(config.request_timeout_secs))?;
        let router =
            CacheRouter::new(Arc::new(network), storage, settings).with_state(initial_state);

        Ok(Self {
            config,
            cache_dir,
            format: opts.format,
            worker: WorkerHandle::spawn(router),
            initial_state,
        })
    }

    /// Stop the worker loop and persist the lifecycle state if it changed.
    ///
    /// Returns the worker context for JSON output.
    pub async fn finish(self) -> Result<WorkerMeta> {
        let router = self.worker.shutdown().await?;
        let state = router.state().await;
        let meta = WorkerMeta {
            cache_version: self.config.cache_version.clone(),
            static_cache: self.config.static_cache_name(),
            api_cache: self.config.api_cache_name(),
            state,
        };
        if state == self.initial_state {
            return Ok(meta);
        }

        log::debug!("Persisting worker state {}", state);
        WorkerRecord {
            state,
            version: self.config.cache_version.clone(),
            updated_at: Utc::now(),
        }
        .save(&self.cache_dir)?;
        Ok(meta)
    }
}

/// Load configuration and apply the CLI origin override
pub fn load_config(opts: &GlobalOptions) -> Result<Config> {
    let mut config = Config::load_or_default(opts.config_ref())?;
    if let Some(origin) = opts.origin.as_deref() {
        config.origin = origin.to_string();
    }
    config.validate()?;
    Ok(config)
}
