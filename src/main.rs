use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use sigae_bulk::{logger, App, Config, Credentials};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise logging
    logger::init();

    // Load configuration
    let config = Config::from_env()?;
    let credentials = Credentials::from_env().context("SIGAE_USER and SIGAE_PASSWORD must be set")?;

    // Ctrl-C stops the batch after the current record
    let cancel = CancellationToken::new();
    let stop = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 Stop requested, finishing the current record...");
            stop.cancel();
        }
    });

    // Initialise and run
    App::initialize(config, credentials).await?.run(cancel).await?;

    Ok(())
}
