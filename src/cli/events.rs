//! Sync, push and notification click commands

use colored::Colorize;
use serde_json::Value;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::cli::context::CommandContext;
use crate::error::Result;
use crate::output::format_worker_json;
use crate::worker::{ClickOutcome, NotificationClick};

pub async fn sync(opts: &GlobalOptions, tag: &str) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let format = ctx.format;

    let result = ctx.worker.sync(tag).await;
    let worker = ctx.finish().await?;
    let outcome = result?;

    match format {
        OutputFormat::Json => println!("{}", format_worker_json(&outcome, &worker)?),
        _ if outcome.matched => println!("{} Sync '{}' handled", "✓".green(), outcome.tag),
        _ => println!("{} Sync tag '{}' ignored", "○".dimmed(), outcome.tag),
    }

    Ok(())
}

pub async fn push(opts: &GlobalOptions, payload: Option<&str>, file: Option<&Path>) -> Result<()> {
    let payload = match (payload, file) {
        (_, Some(path)) => Some(std::fs::read(path)?),
        (Some(raw), None) => Some(raw.as_bytes().to_vec()),
        (None, None) => None,
    };

    let ctx = CommandContext::new(opts)?;
    let format = ctx.format;

    let result = ctx.worker.push(payload).await;
    let worker = ctx.finish().await?;
    let notification = result?;

    match (format, notification) {
        (OutputFormat::Json, notification) => {
            println!("{}", format_worker_json(&notification, &worker)?)
        }
        (_, Some(n)) => {
            println!("{} {}", "🔔".yellow(), n.title.bold());
            if !n.body.is_empty() {
                println!("  {}", n.body);
            }
            println!("  {} {}  {} {}", "icon".dimmed(), n.icon, "badge".dimmed(), n.badge);
            for action in &n.actions {
                println!("  [{}] {}", action.action.cyan(), action.title);
            }
            if n.data.as_object().is_some_and(|o| !o.is_empty()) {
                println!("  {} {}", "data".dimmed(), n.data);
            }
        }
        (_, None) => println!("No notification shown"),
    }

    Ok(())
}

pub async fn click(opts: &GlobalOptions, action: Option<&str>, data: Option<&str>) -> Result<()> {
    let data: Value = match data {
        Some(raw) => serde_json::from_str(raw)?,
        None => Value::Null,
    };
    let click = NotificationClick {
        action: action.map(str::to_string),
        data,
    };

    let ctx = CommandContext::new(opts)?;
    let format = ctx.format;

    let result = ctx.worker.notification_click(click).await;
    let worker = ctx.finish().await?;
    let outcome = result?;

    match (format, &outcome) {
        (OutputFormat::Json, _) => println!("{}", format_worker_json(&outcome, &worker)?),
        (_, ClickOutcome::OpenOrFocus { url }) => println!("{} Open {}", "→".green(), url),
        (_, ClickOutcome::Dismissed) => println!("No navigation"),
    }

    Ok(())
}
