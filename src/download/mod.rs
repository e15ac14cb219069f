//! Artifact downloads.
//!
//! Artifacts live in `{root}/{name}/` and are named `{name} {version}.{ext}`.
//! At most one artifact per name and version is ever stored.

use anyhow::Context;
use async_trait::async_trait;
use log::{debug, info};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::ErrorKind;
use crate::http::{HttpClient, NonRetryableError};
use crate::page::{PageSource, download_page_url};
use crate::runtime::Runtime;
use crate::sniff;

/// Leading bytes inspected to pick an artifact's extension.
const SNIFF_BYTES: u64 = 1024 * 1024;

/// Fetches the binary for a confirmed version.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `version` of `name` using the tool page at `page_link`.
    /// Returns the final artifact path.
    async fn download(&self, name: &str, version: &str, page_link: &str) -> Result<PathBuf, ErrorKind>;
}

/// File name of an artifact before its extension is known.
pub fn artifact_stem(name: &str, version: &str) -> String {
    format!("{} {}", name, version)
}

/// Reduce a display name to a single path component below the tools root.
///
/// Separators become `-` and leading dots are dropped.
pub fn artifact_dir_name(name: &str) -> String {
    let flattened: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '-' } else { c })
        .collect();
    let trimmed = flattened.trim_start_matches('.').trim();
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}

pub struct DownloadManager<'a, R: Runtime, P: PageSource> {
    runtime: &'a R,
    pages: &'a P,
    http: HttpClient,
    root: PathBuf,
    max_bytes: u64,
}

impl<'a, R: Runtime, P: PageSource> DownloadManager<'a, R, P> {
    pub fn new(runtime: &'a R, pages: &'a P, http: HttpClient, root: PathBuf, max_bytes: u64) -> Self {
        Self {
            runtime,
            pages,
            http,
            root,
            max_bytes,
        }
    }

    /// Whether `dir` already holds a file whose stem is `stem`.
    fn has_artifact(&self, dir: &Path, stem: &str) -> anyhow::Result<bool> {
        Ok(self
            .runtime
            .read_dir(dir)?
            .iter()
            .any(|file| file.file_stem().and_then(|s| s.to_str()) == Some(stem)))
    }

    fn sniff_extension(&self, path: &Path) -> anyhow::Result<&'static str> {
        let mut head = Vec::new();
        self.runtime
            .open(path)?
            .take(SNIFF_BYTES)
            .read_to_end(&mut head)
            .with_context(|| format!("Failed to read {:?}", path))?;
        Ok(sniff::extension_or_default(&head))
    }

    async fn transfer(&self, url: &str, staged: &Path) -> Result<u64, ErrorKind> {
        let result = self
            .http
            .download_file(url, self.max_bytes, || self.runtime.create_file(staged))
            .await;

        result.map_err(|e| {
            if self.runtime.exists(staged)
                && let Err(cleanup) = self.runtime.remove_file(staged)
            {
                log::warn!("Failed to remove partial download {:?}: {}", staged, cleanup);
            }
            match e.downcast_ref::<NonRetryableError>() {
                Some(NonRetryableError::TooLarge { .. }) => ErrorKind::DownloadTooLarge,
                _ => ErrorKind::UnknownTransport(format!("{:#}", e)),
            }
        })
    }
}

fn local_failure(e: anyhow::Error) -> ErrorKind {
    ErrorKind::UnknownTransport(format!("{:#}", e))
}

#[async_trait]
impl<R: Runtime, P: PageSource> Downloader for DownloadManager<'_, R, P> {
    #[tracing::instrument(skip(self))]
    async fn download(&self, name: &str, version: &str, page_link: &str) -> Result<PathBuf, ErrorKind> {
        let name = artifact_dir_name(name);
        let dir = self.root.join(&name);
        self.runtime.ensure_dir(&dir).map_err(local_failure)?;

        println!("Checking to see if version already exists on system.");
        let stem = artifact_stem(&name, version);
        if self.has_artifact(&dir, &stem).map_err(local_failure)? {
            return Err(ErrorKind::VersionExists);
        }

        let page = self
            .pages
            .download_page(&download_page_url(page_link))
            .await
            .map_err(local_failure)?;
        if page.off_site {
            return Err(ErrorKind::RemoteDownloadUnavailable);
        }
        let url = page.binary_url.ok_or_else(|| {
            ErrorKind::ConnectionFailure("download page has no download link".to_string())
        })?;

        println!("Version not found on system, downloading...");
        let staged = dir.join(&stem);
        let bytes = self.transfer(&url, &staged).await?;
        debug!("Transferred {} bytes into {:?}", bytes, staged);

        let extension = self.sniff_extension(&staged).map_err(local_failure)?;
        let artifact = dir.join(format!("{}.{}", stem, extension));
        self.runtime
            .rename(&staged, &artifact)
            .map_err(local_failure)?;

        info!("Stored {:?}", artifact);
        Ok(artifact)
    }
}
