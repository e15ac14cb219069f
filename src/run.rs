//! One full update pass over the catalog.

use anyhow::{Result, bail};
use log::{info, warn};

use crate::catalog::{CatalogRecord, CatalogStore};
use crate::download::Downloader;
use crate::error::{CatalogError, ErrorKind};
use crate::http::HttpClient;
use crate::page::PageSource;
use crate::reconcile::ReconciliationEngine;
use crate::runtime::Runtime;

/// What a completed pass produced.
#[derive(Debug, Default, PartialEq)]
pub struct PassReport {
    /// Entries that were reconciled (stubs excluded).
    pub reconciled: usize,
    /// Failing entries by catalog name.
    pub errors: Vec<(String, ErrorKind)>,
}

/// Make sure the site answers before touching the catalog.
#[tracing::instrument(skip(http))]
pub async fn check_connection(http: &HttpClient, site_url: &str) -> Result<()> {
    println!("Checking connection to {}", site_url);
    println!("Please wait...");

    let status = http.status(site_url).await?;
    if !status.is_success() {
        println!("Unsuccessful connection!");
        bail!("Status code {} from {}", status.as_u16(), site_url);
    }

    println!("Connection successful");
    Ok(())
}

pub struct RunController<'a, R: Runtime, P: PageSource, D: Downloader> {
    runtime: &'a R,
    store: CatalogStore<'a, R>,
    engine: ReconciliationEngine<'a, P, D>,
    today: String,
    skip_remove: bool,
}

impl<'a, R: Runtime, P: PageSource, D: Downloader> RunController<'a, R, P, D> {
    pub fn new(runtime: &'a R, store: CatalogStore<'a, R>, engine: ReconciliationEngine<'a, P, D>, today: String) -> Self {
        Self {
            runtime,
            store,
            engine,
            today,
            skip_remove: false,
        }
    }

    pub fn with_skip_remove(mut self, skip_remove: bool) -> Self {
        self.skip_remove = skip_remove;
        self
    }

    /// Reconcile every entry, persisting the catalog after each one.
    pub async fn run_pass(&self) -> Result<PassReport, CatalogError> {
        let mut catalog = self.store.load()?;
        let mut report = PassReport::default();

        for name in catalog.names() {
            println!("-----------------------------------------");
            println!("Checking {}...", name);

            let entry = match catalog.get(&name) {
                Some(CatalogRecord::Entry(entry)) => entry.clone(),
                _ => {
                    info!("Skipping inert record {:?}", name);
                    self.store.save(&catalog)?;
                    continue;
                }
            };

            let outcome = self.engine.reconcile(&entry, &self.today).await;
            report.reconciled += 1;
            if let Some(kind) = outcome.failure() {
                report.errors.push((name.clone(), kind.clone()));
            }

            catalog.insert_entry(outcome.into_entry());
            self.store.save(&catalog)?;
        }

        Ok(report)
    }

    /// Run a pass with corrupt-catalog recovery, refresh the backup, then
    /// report failures and offer to remove them.
    ///
    /// Returns `None` when neither the catalog nor its backup holds any tools.
    pub async fn run(&self) -> Result<Option<PassReport>> {
        self.store.ensure_files()?;

        let report = match self.run_pass().await {
            Ok(report) => report,
            Err(CatalogError::Corrupt { path, reason }) => {
                warn!("Catalog {:?} unreadable ({}), restoring backup", path, reason);
                println!("Catalog is unreadable ({}), restoring from backup.", reason);
                self.store.restore_backup()?;
                match self.run_pass().await {
                    Ok(report) => report,
                    Err(CatalogError::Corrupt { .. }) => {
                        println!("No tools detected.");
                        return Ok(None);
                    }
                    Err(CatalogError::Io(e)) => return Err(e),
                }
            }
            Err(CatalogError::Io(e)) => return Err(e),
        };

        self.store.refresh_backup()?;

        if !report.errors.is_empty() {
            println!();
            println!("Errors:");
            for (name, kind) in &report.errors {
                println!("  {}: {}", name, kind);
            }

            if !self.skip_remove {
                self.offer_removal(&report.errors)?;
            }
        }

        Ok(Some(report))
    }

    fn offer_removal(&self, errors: &[(String, ErrorKind)]) -> Result<()> {
        if !self
            .runtime
            .confirm("Would you like to remove any of these tools from the tool list?")?
        {
            return Ok(());
        }

        let mut catalog = self.store.load()?;
        let mut removed = 0;
        for (name, _) in errors {
            if self.runtime.confirm(&format!("Would you like to remove {}?", name))?
                && catalog.remove(name).is_some()
            {
                println!("Removed {} from tool list.", name);
                removed += 1;
            }
        }

        if removed > 0 {
            self.store.save(&catalog)?;
            self.store.refresh_backup()?;
        }
        Ok(())
    }
}
