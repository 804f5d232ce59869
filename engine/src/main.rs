// Study Swarm
// Main entry point for the swarm binary

use anyhow::Context;
use clap::Parser;
use swarm_engine::cli::{Cli, Command};
use swarm_engine::config::Config;
use swarm_engine::handlers::{
    handle_ask, handle_chat, handle_config, handle_key, handle_memory, user_hint, OutputFormat,
};
use swarm_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_config_path()?,
    };

    let config = if cli.config.is_some() {
        Config::load_from_path(&config_path)
            .with_context(|| format!("Failed to load {}", config_path.display()))?
    } else {
        Config::load_or_create()?
    };

    // --log beats the config file; RUST_LOG beats both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    tracing::info!(
        "Swarm v{} ({} - {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_COMMIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );

    let result = match cli.command {
        Command::Chat { session } => {
            tracing::info!("Starting interactive session");
            handle_chat(session, &config, format).await
        }

        Command::Ask { query, session } => {
            tracing::info!("Answering: {}", query);
            handle_ask(query, session, &config, format).await
        }

        Command::Memory { action } => {
            tracing::info!("Memory management: {:?}", action);
            handle_memory(action, &config, format).await
        }

        Command::Key { action } => {
            tracing::info!("Key management: {:?}", action);
            handle_key(action, &config, format).await
        }

        Command::Config { action } => {
            tracing::info!("Config management: {:?}", action);
            handle_config(action, &config, &config_path, format)
        }
    };

    if let Err(e) = &result {
        if let Some(hint) = user_hint(e) {
            eprintln!("Hint: {}", hint);
        }
    }

    result
}
