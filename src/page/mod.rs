//! Remote tool pages.
//!
//! A [`PageSource`] turns a tool page URL into a [`Snapshot`] and a download
//! page URL into a [`DownloadPage`]. The reconciliation engine only sees
//! these structured reads.

mod html;

use anyhow::Result;
use async_trait::async_trait;

use crate::catalog::{SecurityStatus, ToolType};

pub use html::HtmlPageSource;

/// Point-in-time read of a tool page.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Raw "software version" label, e.g. `"ToolX 1.1"`.
    pub label: String,
    pub tool_type: ToolType,
    pub size: String,
    pub status: SecurityStatus,
    pub platforms: String,
    pub website: String,
    pub rating: f64,
}

/// What the download page offers.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadPage {
    /// First no-follow/no-opener link, the actual binary.
    pub binary_url: Option<String>,
    /// The site only links to a third-party host.
    pub off_site: bool,
}

/// Fallible remote lookups of tool pages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch and extract the tool page at `link`.
    async fn snapshot(&self, link: &str) -> Result<Snapshot>;

    /// Fetch and extract the download page at `url`.
    async fn download_page(&self, url: &str) -> Result<DownloadPage>;
}

/// Download page URL for a tool page: `{link}/download/`.
pub fn download_page_url(link: &str) -> String {
    format!("{}/download/", link.trim_end_matches('/'))
}
