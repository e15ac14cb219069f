//! Durable storage for the catalog and its backup copy.

use anyhow::Context;
use log::{debug, info};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::CatalogError;
use crate::runtime::Runtime;

use super::Catalog;

/// Contents written when a catalog or backup file does not exist yet.
pub const PLACEHOLDER_DOCUMENT: &str = "none:\n";

/// Reads and writes the primary catalog file and its backup.
///
/// The backup is only ever produced by copying the primary file, and only
/// ever restored by copying it back wholesale.
pub struct CatalogStore<'a, R: Runtime> {
    runtime: &'a R,
    path: PathBuf,
    backup_path: PathBuf,
}

impl<'a, R: Runtime> CatalogStore<'a, R> {
    pub fn new(runtime: &'a R, path: PathBuf, backup_path: PathBuf) -> Self {
        Self {
            runtime,
            path,
            backup_path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    /// Create missing catalog and backup files with a placeholder document.
    pub fn ensure_files(&self) -> anyhow::Result<()> {
        for (label, path) in [("catalog", &self.path), ("backup", &self.backup_path)] {
            if !self.runtime.exists(path) {
                println!("No {} found at {}, creating one", label, path.display());
                self.runtime
                    .write(path, PLACEHOLDER_DOCUMENT.as_bytes())
                    .with_context(|| format!("Failed to create {} file {:?}", label, path))?;
            }
        }
        Ok(())
    }

    /// Load and classify the primary catalog.
    #[tracing::instrument(skip(self))]
    pub fn load(&self) -> Result<Catalog, CatalogError> {
        let content = self.runtime.read_to_string(&self.path).map_err(|e| {
            match e.downcast_ref::<std::io::Error>() {
                Some(io) if io.kind() == std::io::ErrorKind::InvalidData => {
                    self.corrupt(io.to_string())
                }
                _ => CatalogError::Io(e),
            }
        })?;

        let document: serde_yaml::Value =
            serde_yaml::from_str(&content).map_err(|e| self.corrupt(e.to_string()))?;
        let catalog = Catalog::from_yaml(document).map_err(|reason| self.corrupt(reason))?;

        debug!("Loaded {} records from {:?}", catalog.len(), self.path);
        Ok(catalog)
    }

    /// Persist the whole catalog.
    ///
    /// The document is written to a sibling temporary file and renamed over
    /// the catalog, so a crash leaves either the old or the new file.
    #[tracing::instrument(skip(self, catalog))]
    pub fn save(&self, catalog: &Catalog) -> anyhow::Result<()> {
        let content = catalog.to_yaml().context("Failed to serialize catalog")?;
        let staging = self.staging_path();

        self.runtime.write(&staging, content.as_bytes())?;
        self.runtime
            .rename(&staging, &self.path)
            .with_context(|| format!("Failed to save catalog to {:?}", self.path))
    }

    /// Rewrite the catalog in canonical order.
    pub fn sort(&self) -> Result<Catalog, CatalogError> {
        let catalog = self.load()?;
        self.save(&catalog)?;
        Ok(catalog)
    }

    /// Snapshot the primary file as the new backup.
    #[tracing::instrument(skip(self))]
    pub fn refresh_backup(&self) -> anyhow::Result<()> {
        self.runtime.copy(&self.path, &self.backup_path)?;
        info!("Backed up catalog to {:?}", self.backup_path);
        Ok(())
    }

    /// Overwrite the primary file with the backup.
    #[tracing::instrument(skip(self))]
    pub fn restore_backup(&self) -> anyhow::Result<()> {
        self.runtime
            .copy(&self.backup_path, &self.path)
            .with_context(|| format!("Failed to restore catalog from {:?}", self.backup_path))?;
        info!("Restored catalog from {:?}", self.backup_path);
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn corrupt(&self, reason: String) -> CatalogError {
        CatalogError::Corrupt {
            path: self.path.clone(),
            reason,
        }
    }
}
