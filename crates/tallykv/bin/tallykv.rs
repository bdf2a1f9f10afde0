//! tallykv binary entry point.
//!
//! Thin wrapper around the library that:
//! 1. Parses command-line arguments
//! 2. Initializes logging on stderr
//! 3. Opens the store
//! 4. Runs the command loop on stdin/stdout until `END`, end of input or Ctrl-C

use anyhow::{Context, Result};
use tallykv::{SessionConfig, SessionEnd, Store, session};
use tokio::io::BufReader;

fn main() -> Result<()> {
    let config = SessionConfig::from_args();

    // Replies own stdout; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    config.validate()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    let result = runtime.block_on(run(&config));

    // A pending stdin read sits on a blocking thread and never finishes
    runtime.shutdown_background();

    let end = result?;
    tracing::debug!("Session finished: {end:?}");
    Ok(())
}

async fn run(config: &SessionConfig) -> Result<SessionEnd> {
    let mut store = Store::open(&config.file)
        .with_context(|| format!("Failed to open store {}", config.file.display()))?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for interrupt signal: {e}");
            std::future::pending::<()>().await;
        }
    };

    let end = session::run(
        &mut store,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        config.prompt(),
        shutdown,
    )
    .await?;

    Ok(end)
}
