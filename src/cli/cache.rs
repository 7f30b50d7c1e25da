//! Cache management commands

use colored::Colorize;
use dialoguer::Confirm;
use tabled::Tabled;

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::error::Result;
use crate::output::{format_json, format_size, format_table, format_timestamp};
use crate::store::{CacheStorage, EntryInfo, SqliteCacheStorage, StoreStats};

#[derive(Tabled)]
struct StoreRow {
    #[tabled(rename = "STORE")]
    name: String,
    #[tabled(rename = "ENTRIES")]
    entries: usize,
    #[tabled(rename = "SIZE")]
    size: String,
}

impl From<&StoreStats> for StoreRow {
    fn from(stats: &StoreStats) -> Self {
        Self {
            name: stats.name.clone(),
            entries: stats.entries,
            size: format_size(stats.size_bytes),
        }
    }
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "STORE")]
    store: String,
    #[tabled(rename = "METHOD")]
    method: String,
    #[tabled(rename = "URL")]
    url: String,
    #[tabled(rename = "STATUS")]
    status: u16,
    #[tabled(rename = "SIZE")]
    size: String,
    #[tabled(rename = "CACHED AT")]
    cached_at: String,
}

impl From<&EntryInfo> for EntryRow {
    fn from(entry: &EntryInfo) -> Self {
        Self {
            store: entry.store.clone(),
            method: entry.method.clone(),
            url: entry.url.clone(),
            status: entry.status,
            size: format_size(entry.size_bytes),
            cached_at: format_timestamp(entry.created_at),
        }
    }
}

fn open(opts: &GlobalOptions) -> Result<SqliteCacheStorage> {
    Ok(SqliteCacheStorage::open_at(&opts.resolve_cache_dir()?)?)
}

/// Show per-store statistics
pub fn status(opts: &GlobalOptions) -> Result<()> {
    let storage = open(opts)?;
    let stats = storage.stats()?;
    let total_entries: usize = stats.iter().map(|s| s.entries).sum();
    let total_size: usize = stats.iter().map(|s| s.size_bytes).sum();

    match opts.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "stores": stats,
                "total_entries": total_entries,
                "total_size_bytes": total_size,
                "total_size_human": format_size(total_size),
                "path": opts.resolve_cache_dir()?.display().to_string(),
            });
            println!("{}", format_json(&json)?);
        }
        OutputFormat::Table => {
            let rows: Vec<StoreRow> = stats.iter().map(StoreRow::from).collect();
            println!("{}", format_table(&rows));
        }
        OutputFormat::Pretty => {
            println!("Cache Status");
            println!("────────────────────────────────────────");
            println!("Location:       {}", opts.resolve_cache_dir()?.display());
            println!("Stores:         {}", stats.len());
            println!("Total entries:  {}", total_entries);
            println!("Total size:     {}", format_size(total_size));
            if !stats.is_empty() {
                println!();
                for store in &stats {
                    println!(
                        "  {:<28} {:>5} entries  {}",
                        store.name,
                        store.entries,
                        format_size(store.size_bytes).dimmed()
                    );
                }
            }
        }
    }

    Ok(())
}

/// List cached entries, optionally for one store
pub fn list(opts: &GlobalOptions, store: Option<&str>) -> Result<()> {
    let storage = open(opts)?;
    let entries = storage.entries(store)?;

    match opts.format {
        OutputFormat::Json => println!("{}", format_json(&entries)?),
        _ => {
            let rows: Vec<EntryRow> = entries.iter().map(EntryRow::from).collect();
            println!("{}", format_table(&rows));
        }
    }

    Ok(())
}

/// Delete every store
pub fn clear(opts: &GlobalOptions, yes: bool) -> Result<()> {
    let storage = open(opts)?;
    let names = storage.store_names()?;

    if names.is_empty() {
        match opts.format {
            OutputFormat::Json => println!(
                "{}",
                format_json(&serde_json::json!({ "deleted": names, "success": true }))?
            ),
            _ => println!("Cache was already empty"),
        }
        return Ok(());
    }

    if !yes {
        eprintln!(
            "{} Delete {} cache stores? The app shell must be installed again.",
            "⚠".yellow(),
            names.len()
        );
        let confirm = Confirm::new()
            .with_prompt("Confirm deletion?")
            .default(false)
            .interact()?;
        if !confirm {
            eprintln!("Cancelled.");
            return Ok(());
        }
    }

    let mut deleted = Vec::new();
    for name in names {
        if storage.delete_store(&name)? {
            log::info!("Deleted cache {}", name);
            deleted.push(name);
        }
    }

    match opts.format {
        OutputFormat::Json => println!(
            "{}",
            format_json(&serde_json::json!({ "deleted": deleted, "success": true }))?
        ),
        _ => println!("Deleted {} cache stores", deleted.len()),
    }

    Ok(())
}

/// Print the cache directory
pub fn path(opts: &GlobalOptions) -> Result<()> {
    println!("{}", opts.resolve_cache_dir()?.display());
    Ok(())
}
