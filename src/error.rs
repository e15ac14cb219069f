//! Error taxonomy for reconciliation and catalog handling.

use std::path::PathBuf;

/// Why a single catalog entry could not be brought up to date.
///
/// Every variant is recoverable: the run records it on the entry and moves
/// on to the next one.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ErrorKind {
    /// The tool page was unreachable or lacked a required field.
    #[error("Unknown link error: {0}")]
    ConnectionFailure(String),

    /// A newer version exists but the site disabled its download.
    #[error("Download is disabled")]
    DistributionDisabled,

    /// The binary is only offered by a third-party site.
    #[error("Download not available directly from the site")]
    RemoteDownloadUnavailable,

    /// The transfer exceeded the configured size limit.
    #[error("Too large to download")]
    DownloadTooLarge,

    /// An artifact for this version is already stored locally.
    #[error("Version already downloaded")]
    VersionExists,

    #[error("Unknown error: {0}")]
    UnknownTransport(String),
}

impl ErrorKind {
    /// `VersionExists` means the work was already done; everything else is a failure.
    pub fn is_failure(&self) -> bool {
        !matches!(self, ErrorKind::VersionExists)
    }
}

/// Failures reading or writing the catalog file as a whole.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The file is empty, unparsable, or not a mapping of tools.
    #[error("Catalog {path:?} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] anyhow::Error),
}
