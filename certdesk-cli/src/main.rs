mod cli;
mod commands;
mod logger;
mod terminal;

use std::sync::Arc;

use anyhow::Result;
use certdesk_client::{ApiClient, ClientConfig};
use clap::Parser;

use cli::Cli;
use terminal::{TerminalNavigator, TerminalNotifier, TerminalPrompt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init_logger(&cli.log_level, cli.json_logs);

    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    tracing::debug!(base_url = %config.base_url, storage = %config.storage_dir.display(), "Configuration loaded");

    let client = ApiClient::builder()
        .config(config)
        .notifier(Arc::new(TerminalNotifier))
        .prompt(Arc::new(TerminalPrompt))
        .navigator(Arc::new(TerminalNavigator))
        .build()?;
    client.store().restore();

    commands::run(cli.command, client).await
}
