//! Init command implementation

use colored::Colorize;
use dialoguer::{Confirm, Input, theme::ColorfulTheme};

use crate::cli::args::GlobalOptions;
use crate::config::Config;
use crate::error::Result;

/// Write a configuration file, prompting for the origin unless `--origin`
/// was given.
pub fn run(opts: &GlobalOptions, force: bool) -> Result<()> {
    let path = Config::resolve_path(opts.config_ref())?;

    if path.exists() && !force {
        let overwrite = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("{} exists. Overwrite?", path.display()))
            .default(false)
            .interact()?;
        if !overwrite {
            eprintln!("Cancelled.");
            return Ok(());
        }
    }

    let mut config = Config::default();
    config.origin = match opts.origin.as_deref() {
        Some(origin) => origin.to_string(),
        None => Input::with_theme(&ColorfulTheme::default())
            .with_prompt("App origin")
            .default(config.origin.clone())
            .interact_text()?,
    };
    config.validate()?;
    config.save_to(&path)?;

    println!("{} Configuration saved to: {}", "✓".green(), path.display());
    println!("  Origin: {}", config.origin.bold());
    println!(
        "  Stores: {}, {}",
        config.static_cache_name(),
        config.api_cache_name()
    );

    println!("\n{}", "Next steps:".bold());
    println!("  {} - Precache the app shell", "nearly install".cyan());
    println!("  {} - Take control", "nearly activate".cyan());

    Ok(())
}
