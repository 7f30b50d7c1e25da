//! Nearly offline router - cache routing for the Nearly app, driven from the CLI

use clap::{CommandFactory, Parser};

mod cli;
mod config;
mod error;
mod http;
mod network;
mod output;
mod store;
mod worker;

use cli::args::GlobalOptions;
use cli::{CacheCommands, Cli, Commands};
use error::Result;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

fn init_logging(debug: bool) {
    let default_filter = if debug {
        concat!(env!("CARGO_CRATE_NAME"), "=debug")
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let opts = GlobalOptions::from_cli(&cli);

    match cli.command {
        Commands::Init { force } => cli::init::run(&opts, force),
        Commands::Install => cli::lifecycle::install(&opts).await,
        Commands::Activate => cli::lifecycle::activate(&opts).await,
        Commands::Fetch {
            url,
            method,
            headers,
            body,
        } => cli::fetch::run(&opts, &url, &method, &headers, body.as_deref()).await,
        Commands::Sync { tag } => cli::events::sync(&opts, &tag).await,
        Commands::Push { payload, file } => {
            cli::events::push(&opts, payload.as_deref(), file.as_deref()).await
        }
        Commands::Click { action, data } => {
            cli::events::click(&opts, action.as_deref(), data.as_deref()).await
        }
        Commands::Status => cli::status::run(&opts),
        Commands::Cache(cache_cmd) => match cache_cmd {
            CacheCommands::Status => cli::cache::status(&opts),
            CacheCommands::List { store } => cli::cache::list(&opts, store.as_deref()),
            CacheCommands::Clear { yes } => cli::cache::clear(&opts, yes),
            CacheCommands::Path => cli::cache::path(&opts),
        },
        Commands::Completion { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "nearly", &mut std::io::stdout());
            Ok(())
        }
        Commands::Version => {
            println!("nearly version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
