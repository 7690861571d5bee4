//! AskBridge - exposes assistant CLI tools over a line-delimited JSON channel
//!
//! Requests arrive on stdin and responses leave on stdout, one JSON document
//! per line. Logs go to stderr so stdout stays a clean protocol channel.

mod protocol;

use askbridge_agent::ToolExecutor;
use askbridge_core::Config;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Initialize tracing for logging
fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "askbridge=debug,askbridge_core=debug,askbridge_agent=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let project_root = std::env::current_dir()?;
    let config = Config::load(&project_root)?;
    tracing::info!(
        "AskBridge starting in {} (cli: {}, chunk budget: {} chars)",
        project_root.display(),
        config.cli.command,
        config.change_mode.max_chunk_chars
    );

    let executor = ToolExecutor::new(&config)
        .with_progress(Arc::new(|line: &str| tracing::debug!("cli> {}", line)));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = protocol::handle_line(&executor, &line).await;
        let mut encoded = serde_json::to_string(&response)?;
        encoded.push('\n');
        stdout.write_all(encoded.as_bytes()).await?;
        stdout.flush().await?;
    }

    tracing::info!("stdin closed, shutting down");
    Ok(())
}
