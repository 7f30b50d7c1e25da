//! Status command implementation

use colored::Colorize;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::cli::context::load_config;
use crate::config::Config;
use crate::error::Result;
use crate::output::{WorkerMeta, format_worker_json};
use crate::store::{CacheStorage, SqliteCacheStorage, StoreStats};
use crate::worker::{WorkerRecord, WorkerState};

#[derive(Serialize)]
struct StatusView {
    config_path: String,
    config_found: bool,
    origin: String,
    cache_version: String,
    cache_dir: String,
    state: WorkerState,
    updated_at: Option<String>,
    static_cache: StoreView,
    api_cache: StoreView,
    stale_caches: Vec<String>,
}

#[derive(Serialize)]
struct StoreView {
    name: String,
    exists: bool,
    entries: usize,
}

impl StoreView {
    fn new(name: String, stats: &[StoreStats]) -> Self {
        let found = stats.iter().find(|s| s.name == name);
        Self {
            exists: found.is_some(),
            entries: found.map(|s| s.entries).unwrap_or(0),
            name,
        }
    }
}

/// Show worker state, configuration and store names
pub fn run(opts: &GlobalOptions) -> Result<()> {
    let config_path = Config::resolve_path(opts.config_ref())?;
    let config = load_config(opts)?;
    let cache_dir = opts.resolve_cache_dir()?;

    let record = WorkerRecord::load(&cache_dir)?;
    let state = WorkerRecord::effective_state(record.as_ref(), &config.cache_version);

    let storage = SqliteCacheStorage::open_at(&cache_dir)?;
    let stats = storage.stats()?;
    let static_cache = StoreView::new(config.static_cache_name(), &stats);
    let api_cache = StoreView::new(config.api_cache_name(), &stats);
    let stale_caches = stats
        .iter()
        .map(|s| s.name.clone())
        .filter(|name| *name != static_cache.name && *name != api_cache.name)
        .collect();

    let view = StatusView {
        config_path: config_path.display().to_string(),
        config_found: config_path.exists(),
        origin: config.origin.clone(),
        cache_version: config.cache_version.clone(),
        cache_dir: cache_dir.display().to_string(),
        state,
        updated_at: record
            .as_ref()
            .filter(|r| r.version == config.cache_version)
            .map(|r| r.updated_at.to_rfc3339()),
        static_cache,
        api_cache,
        stale_caches,
    };

    if opts.format == OutputFormat::Json {
        let worker = WorkerMeta {
            cache_version: view.cache_version.clone(),
            static_cache: view.static_cache.name.clone(),
            api_cache: view.api_cache.name.clone(),
            state,
        };
        println!("{}", format_worker_json(&view, &worker)?);
        return Ok(());
    }

    println!("{}\n", "Nearly Worker Status".bold());

    if view.config_found {
        println!("Config file: {}", view.config_path.cyan());
    } else {
        println!(
            "Config file: {} {}",
            view.config_path.cyan(),
            "(not found, using defaults)".dimmed()
        );
    }
    println!("Origin:      {}", view.origin);
    println!("Version:     {}", view.cache_version);
    println!("Cache dir:   {}", view.cache_dir);
    println!();

    let state = match view.state {
        WorkerState::Active => format!("{} {}", "✓".green(), "active".green()),
        WorkerState::Installed => format!("{} {}", "○".yellow(), "installed (not yet active)"),
        WorkerState::Redundant => format!("{} {}", "✗".red(), "redundant (install failed)"),
        other => format!("{} {}", "○".dimmed(), other),
    };
    println!("State: {}", state);
    if let Some(ref at) = view.updated_at {
        println!("  Since {}", at.dimmed());
    }

    for store in [&view.static_cache, &view.api_cache] {
        if store.exists {
            println!("{} {} ({} entries)", "✓".green(), store.name, store.entries);
        } else {
            println!("{} {} (not created)", "○".dimmed(), store.name);
        }
    }
    if !view.stale_caches.is_empty() {
        println!(
            "{} Stale caches: {}",
            "⚠".yellow(),
            view.stale_caches.join(", ")
        );
        println!("  → Run 'nearly activate' after installing to delete them");
    }
    if view.state != WorkerState::Active {
        println!();
        println!("Run {} to get started.", "nearly install".cyan());
    }

    Ok(())
}
