//! Per-entry reconciliation.
//!
//! One entry moves through `Fetching -> Comparing -> {UpToDate | UpdateFound
//! -> Downloading -> {Completed | Failed}}`. Every path ends in an
//! [`Outcome`] carrying the entry as it should be persisted; nothing here
//! returns an error to the caller.

use log::debug;

use crate::catalog::{CatalogEntry, SecurityStatus};
use crate::download::Downloader;
use crate::error::ErrorKind;
use crate::page::{PageSource, Snapshot};
use crate::version::{self, ZERO_VERSION};

/// Result of reconciling one entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Nothing newer is published. Display fields are refreshed.
    NoUpdate(CatalogEntry),
    /// A new version was downloaded and recorded.
    Updated(CatalogEntry),
    /// The update could not be completed; `entry` records why.
    Error { kind: ErrorKind, entry: CatalogEntry },
}

impl Outcome {
    pub fn entry(&self) -> &CatalogEntry {
        match self {
            Outcome::NoUpdate(entry) | Outcome::Updated(entry) => entry,
            Outcome::Error { entry, .. } => entry,
        }
    }

    pub fn into_entry(self) -> CatalogEntry {
        match self {
            Outcome::NoUpdate(entry) | Outcome::Updated(entry) => entry,
            Outcome::Error { entry, .. } => entry,
        }
    }

    /// The failure to report, if any. `VersionExists` is not one.
    pub fn failure(&self) -> Option<&ErrorKind> {
        match self {
            Outcome::Error { kind, .. } if kind.is_failure() => Some(kind),
            _ => None,
        }
    }
}

pub struct ReconciliationEngine<'a, P: PageSource, D: Downloader> {
    pages: &'a P,
    downloader: &'a D,
    verify: bool,
}

impl<'a, P: PageSource, D: Downloader> ReconciliationEngine<'a, P, D> {
    pub fn new(pages: &'a P, downloader: &'a D) -> Self {
        Self {
            pages,
            downloader,
            verify: false,
        }
    }

    /// Re-run the download path for up-to-date entries to confirm the
    /// artifact is present locally.
    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Fetch the entry's page and reconcile against it.
    /// `today` is the display date recorded on a successful download.
    #[tracing::instrument(skip(self, entry), fields(name = %entry.name))]
    pub async fn reconcile(&self, entry: &CatalogEntry, today: &str) -> Outcome {
        match self.pages.snapshot(&entry.link).await {
            Ok(snapshot) => self.apply_snapshot(entry, &snapshot, today).await,
            Err(e) => {
                println!("Possible broken link, unable to continue.");
                fail(entry.clone(), ErrorKind::ConnectionFailure(format!("{:#}", e)))
            }
        }
    }

    /// Compare `entry` with a fetched `snapshot` and download when newer.
    pub async fn apply_snapshot(&self, entry: &CatalogEntry, snapshot: &Snapshot, today: &str) -> Outcome {
        let parsed = version::parse(&snapshot.label, &entry.name);
        let mut refreshed = entry.clone();
        refresh_display(&mut refreshed, snapshot);

        debug!(
            "Parsed {:?} as {:?} (stored {})",
            snapshot.label, parsed.version, entry.latest_version
        );

        let candidate = match parsed.version {
            Some(found) if version::is_newer(&found, &entry.latest_version) => found,
            found => {
                refreshed.error = None;
                let target = verify_target(&entry.latest_version, found);
                return match target {
                    Some(target) if self.verify && snapshot.status != SecurityStatus::Disabled => {
                        println!("Verifying download");
                        self.download(refreshed, &parsed.name, target, today).await
                    }
                    _ => {
                        println!("Up to date");
                        Outcome::NoUpdate(refreshed)
                    }
                };
            }
        };

        if snapshot.status == SecurityStatus::Disabled {
            println!("New version found, but download is disabled");
            return fail(refreshed, ErrorKind::DistributionDisabled);
        }

        println!(
            "New version found. Attempting download of {} {} ({})",
            parsed.name, candidate, snapshot.size
        );
        self.download(refreshed, &parsed.name, candidate, today).await
    }

    async fn download(&self, mut entry: CatalogEntry, display_name: &str, version: String, today: &str) -> Outcome {
        match self
            .downloader
            .download(display_name, &version, &entry.link)
            .await
        {
            Ok(artifact) => {
                println!(
                    "{} version {} was successfully downloaded to {}.",
                    display_name,
                    version,
                    artifact.display()
                );
                entry.latest_version = version;
                entry.downloaded = Some(today.to_string());
                entry.error = None;
                Outcome::Updated(entry)
            }
            Err(ErrorKind::VersionExists) => {
                println!("Version appears to already be downloaded.");
                entry.latest_version = version;
                entry.error = None;
                Outcome::Error {
                    kind: ErrorKind::VersionExists,
                    entry,
                }
            }
            Err(kind) => {
                println!("{}", kind);
                fail(entry, kind)
            }
        }
    }
}

/// In verify mode the stored version is checked; an entry that never
/// downloaded anything checks the published one instead. A page without a
/// parseable version is never verified.
fn verify_target(stored: &str, published: Option<String>) -> Option<String> {
    let published = published?;
    if stored == ZERO_VERSION {
        Some(published)
    } else {
        Some(stored.to_string())
    }
}

fn refresh_display(entry: &mut CatalogEntry, snapshot: &Snapshot) {
    entry.size = Some(snapshot.size.clone());
    entry.status = snapshot.status;
    entry.platforms = Some(snapshot.platforms.clone());
    entry.rating = snapshot.rating;
    entry.tool_type = snapshot.tool_type;
    entry.website = Some(snapshot.website.clone());
}

fn fail(mut entry: CatalogEntry, kind: ErrorKind) -> Outcome {
    entry.error = Some(kind.to_string());
    Outcome::Error { kind, entry }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ToolType;
    use crate::download::MockDownloader;
    use crate::page::MockPageSource;
    use mockall::predicate::eq;
    use std::path::PathBuf;

    const TODAY: &str = "October 14, 2026";

    fn toolx(version: &str) -> CatalogEntry {
        let mut entry = CatalogEntry::new("ToolX", "https://site/toolx/");
        entry.latest_version = version.to_string();
        entry.downloaded = Some("January 01, 2026".to_string());
        entry
    }

    fn snapshot(label: &str, status: SecurityStatus) -> Snapshot {
        Snapshot {
            label: label.to_string(),
            tool_type: ToolType::Freeware,
            size: "12.3 MB".to_string(),
            status,
            platforms: "10 / 11".to_string(),
            website: "https://toolx.example".to_string(),
            rating: 4.5,
        }
    }

    fn pages_returning(snap: Snapshot) -> MockPageSource {
        let mut pages = MockPageSource::new();
        pages
            .expect_snapshot()
            .with(eq("https://site/toolx/"))
            .returning(move |_| Ok(snap.clone()));
        pages
    }

    fn downloader_never() -> MockDownloader {
        let mut downloader = MockDownloader::new();
        downloader.expect_download().never();
        downloader
    }

    #[tokio::test]
    async fn test_newer_version_is_downloaded_and_recorded() {
        let pages = pages_returning(snapshot("ToolX 1.1", SecurityStatus::Clean));
        let mut downloader = MockDownloader::new();
        downloader
            .expect_download()
            .with(eq("ToolX"), eq("1.1"), eq("https://site/toolx/"))
            .times(1)
            .returning(|_, _, _| Ok(PathBuf::from("tools/ToolX/ToolX 1.1.exe")));
        let engine = ReconciliationEngine::new(&pages, &downloader);

        let mut stale = toolx("1.0");
        stale.error = Some("Unknown error: earlier".to_string());
        let outcome = engine.reconcile(&stale, TODAY).await;

        let Outcome::Updated(entry) = outcome else {
            panic!("expected Updated, got {:?}", outcome);
        };
        assert_eq!(entry.latest_version, "1.1");
        assert_eq!(entry.downloaded.as_deref(), Some(TODAY));
        assert_eq!(entry.status, SecurityStatus::Clean);
        assert_eq!(entry.size.as_deref(), Some("12.3 MB"));
        assert_eq!(entry.rating, 4.5);
        assert_eq!(entry.error, None);
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent_without_site_change() {
        let pages = pages_returning(snapshot("ToolX 1.1", SecurityStatus::Clean));
        let downloader = downloader_never();
        let engine = ReconciliationEngine::new(&pages, &downloader);

        let first = engine.reconcile(&toolx("1.1"), TODAY).await;
        let second = engine.reconcile(first.entry(), TODAY).await;

        for outcome in [&first, &second] {
            let Outcome::NoUpdate(entry) = outcome else {
                panic!("expected NoUpdate, got {:?}", outcome);
            };
            assert_eq!(entry.downloaded.as_deref(), Some("January 01, 2026"));
            assert_eq!(entry.latest_version, "1.1");
        }
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_lower_or_equal_versions_never_update() {
        for (label, stored) in [("ToolX 1.0", "1.0"), ("ToolX 0.9", "1.0"), ("ToolX 10.0", "9.0")] {
            let pages = pages_returning(snapshot(label, SecurityStatus::Clean));
            let downloader = downloader_never();
            let engine = ReconciliationEngine::new(&pages, &downloader);

            let outcome = engine.reconcile(&toolx(stored), TODAY).await;
            assert!(
                matches!(outcome, Outcome::NoUpdate(_)),
                "{} vs {} gave {:?}",
                label,
                stored,
                outcome
            );
        }
    }

    #[tokio::test]
    async fn test_unparseable_label_is_no_update() {
        let pages = pages_returning(snapshot("ToolX Nightly", SecurityStatus::Clean));
        let downloader = downloader_never();
        let engine = ReconciliationEngine::new(&pages, &downloader);

        let outcome = engine.reconcile(&toolx("1.0"), TODAY).await;
        assert!(matches!(outcome, Outcome::NoUpdate(_)));
    }

    #[tokio::test]
    async fn test_disabled_distribution_is_never_downloaded() {
        let pages = pages_returning(snapshot("ToolX 1.1", SecurityStatus::Disabled));
        let downloader = downloader_never();
        let engine = ReconciliationEngine::new(&pages, &downloader);

        let outcome = engine.reconcile(&toolx("1.0"), TODAY).await;

        assert_eq!(outcome.failure(), Some(&ErrorKind::DistributionDisabled));
        let entry = outcome.into_entry();
        assert_eq!(entry.latest_version, "1.0");
        assert_eq!(entry.status, SecurityStatus::Disabled);
        assert_eq!(entry.error.as_deref(), Some("Download is disabled"));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_connection_failure() {
        let mut pages = MockPageSource::new();
        pages
            .expect_snapshot()
            .returning(|_| Err(anyhow::anyhow!("dns error")));
        let downloader = downloader_never();
        let engine = ReconciliationEngine::new(&pages, &downloader);

        let original = toolx("1.0");
        let outcome = engine.reconcile(&original, TODAY).await;

        assert!(matches!(
            outcome.failure(),
            Some(ErrorKind::ConnectionFailure(msg)) if msg.contains("dns error")
        ));
        let entry = outcome.into_entry();
        assert_eq!(entry.latest_version, original.latest_version);
        assert_eq!(entry.error.as_deref(), Some("Unknown link error: dns error"));
    }

    #[tokio::test]
    async fn test_download_failures_keep_stored_version() {
        for kind in [
            ErrorKind::RemoteDownloadUnavailable,
            ErrorKind::DownloadTooLarge,
            ErrorKind::UnknownTransport("connection reset".to_string()),
        ] {
            let pages = pages_returning(snapshot("ToolX 1.1", SecurityStatus::Clean));
            let mut downloader = MockDownloader::new();
            let returned = kind.clone();
            downloader
                .expect_download()
                .times(1)
                .returning(move |_, _, _| Err(returned.clone()));
            let engine = ReconciliationEngine::new(&pages, &downloader);

            let outcome = engine.reconcile(&toolx("1.0"), TODAY).await;

            assert_eq!(outcome.failure(), Some(&kind));
            let entry = outcome.into_entry();
            assert_eq!(entry.latest_version, "1.0");
            assert_eq!(entry.downloaded.as_deref(), Some("January 01, 2026"));
            assert_eq!(entry.error, Some(kind.to_string()));
        }
    }

    #[tokio::test]
    async fn test_existing_version_records_without_timestamp() {
        let pages = pages_returning(snapshot("ToolX 1.1", SecurityStatus::Clean));
        let mut downloader = MockDownloader::new();
        downloader
            .expect_download()
            .returning(|_, _, _| Err(ErrorKind::VersionExists));
        let engine = ReconciliationEngine::new(&pages, &downloader);

        let outcome = engine.reconcile(&toolx("1.0"), TODAY).await;

        assert!(outcome.failure().is_none());
        let entry = outcome.into_entry();
        assert_eq!(entry.latest_version, "1.1");
        assert_eq!(entry.downloaded.as_deref(), Some("January 01, 2026"));
        assert_eq!(entry.error, None);
    }

    #[tokio::test]
    async fn test_display_name_comes_from_label() {
        let pages = pages_returning(snapshot(
            "Winaero Tweaker 1.30.1 Build 4",
            SecurityStatus::Clean,
        ));
        let mut downloader = MockDownloader::new();
        downloader
            .expect_download()
            .with(eq("Winaero Tweaker"), eq("1.30.1.4"), eq("https://site/toolx/"))
            .times(1)
            .returning(|_, _, _| Ok(PathBuf::from("artifact")));
        let engine = ReconciliationEngine::new(&pages, &downloader);

        let outcome = engine.reconcile(&toolx("1.30.1.3"), TODAY).await;
        assert!(matches!(outcome, Outcome::Updated(_)));
    }

    #[tokio::test]
    async fn test_verify_mode_checks_stored_version() {
        let pages = pages_returning(snapshot("ToolX 1.1", SecurityStatus::Clean));
        let mut downloader = MockDownloader::new();
        downloader
            .expect_download()
            .with(eq("ToolX"), eq("1.1"), eq("https://site/toolx/"))
            .times(1)
            .returning(|_, _, _| Err(ErrorKind::VersionExists));
        let engine = ReconciliationEngine::new(&pages, &downloader).with_verify(true);

        let outcome = engine.reconcile(&toolx("1.1"), TODAY).await;

        assert!(outcome.failure().is_none());
        assert_eq!(
            outcome.entry().downloaded.as_deref(),
            Some("January 01, 2026")
        );
    }

    #[tokio::test]
    async fn test_verify_mode_skips_disabled_tools() {
        let pages = pages_returning(snapshot("ToolX 1.1", SecurityStatus::Disabled));
        let downloader = downloader_never();
        let engine = ReconciliationEngine::new(&pages, &downloader).with_verify(true);

        let outcome = engine.reconcile(&toolx("1.1"), TODAY).await;
        assert!(matches!(outcome, Outcome::NoUpdate(_)));
    }

    #[tokio::test]
    async fn test_verify_mode_skips_unparseable_label() {
        let pages = pages_returning(snapshot("ToolX", SecurityStatus::Clean));
        let downloader = downloader_never();
        let engine = ReconciliationEngine::new(&pages, &downloader).with_verify(true);

        let outcome = engine.reconcile(&toolx("1.1"), TODAY).await;
        assert!(matches!(outcome, Outcome::NoUpdate(_)));
        assert_eq!(outcome.entry().latest_version, "1.1");
    }

    #[test]
    fn test_verify_target() {
        assert_eq!(verify_target("1.0", Some("1.1".into())), Some("1.0".into()));
        assert_eq!(verify_target("0", Some("1.1".into())), Some("1.1".into()));
        assert_eq!(verify_target("0", None), None);
        assert_eq!(verify_target("1.0", None), None);
    }
}
