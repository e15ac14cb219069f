use anyhow::Result;

use crate::catalog::CatalogStore;
use crate::config::Settings;
use crate::runtime::Runtime;

/// Rewrite the catalog in canonical key order.
#[tracing::instrument(skip(runtime, settings))]
pub fn sort<R: Runtime>(runtime: R, settings: Settings) -> Result<()> {
    let store = CatalogStore::new(&runtime, settings.catalog_path, settings.backup_path);
    let catalog = store.sort()?;
    println!("Sorted {} records in {}", catalog.len(), store.path().display());
    Ok(())
}
