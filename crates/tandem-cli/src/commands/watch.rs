use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use tandem_watch::NotifySource;
use tracing::{info, warn};

use crate::output;

/// Synchronize the vault as files change until Ctrl-C.
pub async fn execute(
    vault: &Path,
    config: Option<&Path>,
    debounce: Duration,
    reconcile_first: bool,
) -> Result<()> {
    let (store, service) = super::open_vault(vault, config).await?;

    if reconcile_first {
        let reports = service.reconcile_all().await?;
        info!("{}", output::summary(&reports));
    }

    let (source, notifications) =
        NotifySource::start(&store, debounce).context("Failed to start file watcher")?;
    let tracked = service.start(notifications).await?;
    println!(
        "Watching {} ({} tracked resources). Press Ctrl-C to stop.",
        source.root().display(),
        tracked
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
    }

    drop(source);
    service.shutdown().await;

    let stats = service.engine().stats();
    println!(
        "Stopped. {} events handled, {} fields written, {} failures",
        stats.events_handled, stats.writes, stats.failures
    );
    Ok(())
}
