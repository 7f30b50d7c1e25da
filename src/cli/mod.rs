//! CLI command definitions and handlers

use clap::{Parser, Subcommand};
pub use clap_complete::Shell;
use std::path::PathBuf;

pub mod args;
pub mod cache;
pub mod context;
pub mod events;
pub mod fetch;
pub mod init;
pub mod lifecycle;
pub mod status;

pub use args::OutputFormat;

/// Nearly offline router - drive the app's cache routing from the terminal
#[derive(Parser, Debug)]
#[command(name = "nearly")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (pretty, table, json)
    #[arg(
        long,
        global = true,
        env = "NEARLY_FORMAT",
        default_value = "pretty",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "NEARLY_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Override cache directory
    #[arg(long, global = true, env = "NEARLY_CACHE_DIR", hide_env = true)]
    pub cache_dir: Option<String>,

    /// Override the app origin
    #[arg(long, global = true, env = "NEARLY_ORIGIN", hide_env = true)]
    pub origin: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "NEARLY_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Precache the app shell
    Install,

    /// Take control and delete stale caches
    Activate,

    /// Route one request through the caches
    #[command(after_help = "\
Examples:
  nearly fetch /api/news
  nearly fetch /api/polls/3/vote -X POST --body '{\"choice\":1}'
  nearly fetch https://nearly.example/index.html -H 'Accept: text/html'")]
    Fetch {
        /// Absolute URL, or a path resolved against the origin
        url: String,

        /// HTTP method
        #[arg(long, short = 'X', default_value = "GET")]
        method: String,

        /// Request header as NAME:VALUE (repeatable)
        #[arg(long = "header", short = 'H', value_name = "NAME:VALUE")]
        headers: Vec<String>,

        /// Request body
        #[arg(long)]
        body: Option<String>,
    },

    /// Deliver a background sync event
    Sync {
        /// Sync tag
        tag: String,
    },

    /// Deliver a push message
    Push {
        /// JSON payload; omit for an empty push
        payload: Option<String>,

        /// Read the payload from a file
        #[arg(long, conflicts_with = "payload")]
        file: Option<PathBuf>,
    },

    /// Deliver a notification click
    Click {
        /// Clicked action id (view, dismiss)
        #[arg(long)]
        action: Option<String>,

        /// Notification data as JSON
        #[arg(long)]
        data: Option<String>,
    },

    /// Show worker state and configuration
    Status,

    /// Inspect and manage cache stores
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Generate shell completions
    #[command(after_help = "\
Examples:
  bash:   nearly completion bash > /etc/bash_completion.d/nearly
  zsh:    nearly completion zsh > \"${fpath[1]}/_nearly\"
  fish:   nearly completion fish > ~/.config/fish/completions/nearly.fish")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Display version information
    Version,
}

/// Cache store subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show per-store statistics
    Status,
    /// List cached entries
    List {
        /// Only show one store
        #[arg(long)]
        store: Option<String>,
    },
    /// Delete every store
    Clear {
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Print cache directory path
    Path,
}
