//! evlog dump tool entry point.

use std::error::Error;

use evlog_cli::{Command, DumpConfig};
use evlog_message_store::DefaultConnectionManager;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Logs go to stderr; stdout carries the dump.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let config = DumpConfig::from_env()?;
    let command = Command::from_args(std::env::args().skip(1));
    tracing::info!(table = %config.table, ?command, "dumping messages");

    let connections = DefaultConnectionManager::from_config(&config.connection)?;
    let repository = evlog_cli::repository(connections, &config);

    let mut out = std::io::stdout().lock();
    let written = evlog_cli::run(&repository, &command, config.page_size, &mut out).await?;

    tracing::info!(messages = written, "dump complete");
    Ok(())
}
