//! Field extraction from the site's HTML.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use log::debug;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

use crate::catalog::{SecurityStatus, ToolType};
use crate::http::HttpClient;

use super::{DownloadPage, PageSource, Snapshot};

static SIZE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.?\d*\s*(M|K|G)B").expect("size pattern is valid"));

static WINDOWS_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[Ww]indows ?").expect("windows pattern is valid"));

static BITNESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" ?64").expect("bitness pattern is valid"));

/// [`PageSource`] backed by live HTTP requests.
pub struct HtmlPageSource {
    http: HttpClient,
}

impl HtmlPageSource {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl PageSource for HtmlPageSource {
    #[tracing::instrument(skip(self))]
    async fn snapshot(&self, link: &str) -> Result<Snapshot> {
        let body = self.http.get_text(link).await?;
        parse_snapshot(&body).with_context(|| format!("Unexpected page layout at {}", link))
    }

    #[tracing::instrument(skip(self))]
    async fn download_page(&self, url: &str) -> Result<DownloadPage> {
        let body = self.http.get_text(url).await?;
        Ok(parse_download_page(&body))
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid selector {:?}: {}", css, e))
}

fn first<'a>(document: &'a Html, css: &str) -> Result<ElementRef<'a>> {
    document
        .select(&selector(css)?)
        .next()
        .ok_or_else(|| anyhow!("Missing {} on page", css))
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Extract every snapshot field from a tool page.
pub fn parse_snapshot(html: &str) -> Result<Snapshot> {
    let document = Html::parse_document(html);

    let below_name = text_of(first(&document, ".program-below-name-container")?);
    let tool_type = ToolType::detect(&below_name);
    let size = SIZE_PATTERN
        .find(&below_name)
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| anyhow!("No file size in {:?}", below_name.trim()))?;

    let status = first(&document, ".below-download-link p")?
        .value()
        .classes()
        .map(SecurityStatus::from_class)
        .find(|s| *s != SecurityStatus::Unknown)
        .unwrap_or_default();

    let platforms = normalize_platforms(&text_of(first(&document, r#"[itemprop="operatingSystem"]"#)?));

    let website = document
        .select(&selector(r#"[itemprop="publisher"] p > a"#)?)
        .nth(1)
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Missing publisher website"))?;

    let rating = first(&document, r#"[itemprop="ratingValue"]"#)?
        .value()
        .attr("content")
        .ok_or_else(|| anyhow!("Missing rating value"))?
        .trim()
        .parse::<f64>()
        .context("Invalid rating value")?;

    let label = version_label(first(&document, r#"[itemprop="softwareVersion"]"#)?)
        .ok_or_else(|| anyhow!("Empty software version"))?;

    debug!("Extracted label {:?}, size {}, status {}", label, size, status);

    Ok(Snapshot {
        label,
        tool_type,
        size,
        status,
        platforms,
        website,
        rating,
    })
}

/// The label is the element's first child; trailing children hold extra markup.
fn version_label(element: ElementRef<'_>) -> Option<String> {
    let child = element.children().next()?;
    if let Some(text) = child.value().as_text() {
        return Some((**text).to_string());
    }
    ElementRef::wrap(child).map(text_of)
}

/// `"Windows 10 / Windows 11 64"` becomes `"10 / 11 (64-bit)"`.
fn normalize_platforms(raw: &str) -> String {
    let without_prefix = WINDOWS_WORD.replace_all(raw, "");
    BITNESS
        .replace_all(&without_prefix, " (64-bit)")
        .trim()
        .to_string()
}

/// Extract the binary link and the off-site marker from a download page.
pub fn parse_download_page(html: &str) -> DownloadPage {
    let document = Html::parse_document(html);

    let binary_url = selector(r#"[rel="nofollow noopener"]"#)
        .ok()
        .and_then(|s| {
            document
                .select(&s)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(str::to_string)
        });

    let off_site = selector("div.dl-right")
        .ok()
        .and_then(|s| document.select(&s).next().map(text_of))
        .is_some_and(|text| text.contains("external website"));

    DownloadPage {
        binary_url,
        off_site,
    }
}
