mod cli;

use cinefeed::{config, recommend::MemoryProfileStore, server};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::sync::Arc;

async fn start_server(
    host: String,
    port: u16,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    config.server.host = host;
    config.server.port = port;

    tracing::info!("Starting Cinefeed server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );
    tracing::info!("Upstream catalog: {}", config.catalog.base_url);

    // Profiles live with an external collaborator in production; the binary
    // wires an in-memory store so the recommendation routes are servable.
    let profiles = Arc::new(MemoryProfileStore::new());

    server::start_server(config, profiles).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "cinefeed=trace,tower_http=debug".to_string()
        } else {
            "cinefeed=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Serve { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::CheckConfig {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            check_config(path.as_deref())
        }
        Commands::Version => {
            println!("cinefeed {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn check_config(path: Option<&std::path::Path>) -> Result<()> {
    let config = config::load_config_or_default(path)?;

    println!("Configuration OK");
    println!("  server: {}:{}", config.server.host, config.server.port);
    println!("  catalog: {}", config.catalog.base_url);
    println!(
        "  api key: {}",
        if config.catalog.api_key.is_empty() {
            "not set"
        } else {
            "set"
        }
    );
    println!("  genre table: {} entries", config.catalog.genres.len());
    println!(
        "  aggregation: target {}, max {} pages, abort after {} consecutive failures",
        config.aggregation.default_target_count,
        config.aggregation.max_pages,
        config.aggregation.max_consecutive_failures
    );
    println!(
        "  session budget: {}s",
        config.aggregation.session_budget_secs
    );

    Ok(())
}
