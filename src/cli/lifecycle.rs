//! Install and activate commands

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::cli::context::CommandContext;
use crate::error::Result;
use crate::output::format_worker_json;

/// Run the install phase and persist the resulting state
pub async fn install(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let format = ctx.format;
    let entries = ctx.config.static_manifest.len();

    let spinner = (format == OutputFormat::Pretty).then(|| {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("Precaching {} app shell files...", entries));
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    });

    let result = ctx.worker.install().await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    // A failed first install still persists the redundant state
    let worker = ctx.finish().await?;
    let outcome = result?;

    match format {
        OutputFormat::Json => println!("{}", format_worker_json(&outcome, &worker)?),
        _ => {
            println!(
                "{} Installed {} ({} files cached)",
                "✓".green(),
                outcome.store.bold(),
                outcome.cached.len()
            );
            for url in &outcome.cached {
                println!("  {}", url.dimmed());
            }
            if outcome.activated {
                println!("Already active; the new shell is in use.");
            } else {
                println!("Run {} to take control.", "nearly activate".cyan());
            }
        }
    }

    Ok(())
}

/// Run the activate phase and report deleted stores
pub async fn activate(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let format = ctx.format;

    let result = ctx.worker.activate().await;
    let worker = ctx.finish().await?;
    let outcome = result?;

    match format {
        OutputFormat::Json => println!("{}", format_worker_json(&outcome, &worker)?),
        _ => {
            println!("{} Activated; now routing fetches", "✓".green());
            if outcome.deleted.is_empty() {
                println!("  No stale caches");
            } else {
                for name in &outcome.deleted {
                    println!("  {} {}", "deleted".yellow(), name);
                }
            }
        }
    }

    Ok(())
}
