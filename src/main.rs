//! tasklink CLI binary entry point.

use std::sync::Arc;

use clap::Parser;
use tasklink::cli::commands::{self, Stores};
use tasklink::cli::{Cli, Commands};
use tasklink::config::ClientConfig;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Install the subscriber. `TASKLINK_LOG` takes precedence over settings.
fn init_tracing(log_enabled: bool) {
    let default = if log_enabled {
        LevelFilter::INFO
    } else {
        LevelFilter::OFF
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .with_env_var("TASKLINK_LOG")
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let stores = Stores::open(cli.data_dir.as_deref());

    let settings = match stores.settings.load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Warning: {e}; using default settings");
            Default::default()
        }
    };
    init_tracing(settings.log_enabled);

    let config = Arc::new(ClientConfig::from_env());
    let result = match cli.command {
        Commands::Card(args) => commands::handle_card(&args.url, config).await,
        Commands::Send(args) => commands::handle_send(args, config).await,
        Commands::Get(args) => commands::handle_get(args, config).await,
        Commands::Agents(args) => commands::handle_agents(args.command, &stores, config).await,
        Commands::Chat(args) => commands::handle_chat(args, config).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
