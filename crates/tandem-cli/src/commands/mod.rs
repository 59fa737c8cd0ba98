pub mod check;
pub mod reconcile;
pub mod watch;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tandem_config::ConfigLoader;
use tandem_sync::SyncService;
use tandem_watch::MarkdownStore;

/// Open the vault at `vault` and build a service over it.
pub async fn open_vault(
    vault: &Path,
    config_path: Option<&Path>,
) -> Result<(MarkdownStore, SyncService)> {
    if !vault.is_dir() {
        anyhow::bail!("Vault directory not found: {}", vault.display());
    }
    let config = ConfigLoader::load_or_default(config_path)
        .await
        .context("Failed to load configuration")?;

    let store = MarkdownStore::new(vault);
    let service = SyncService::new(Arc::new(store.clone()), config)
        .context("Failed to build sync service")?;
    Ok((store, service))
}
