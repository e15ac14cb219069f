use anyhow::Result;
use log::debug;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;

use crate::http::HttpClient;
use crate::page::HtmlPageSource;

pub const DEFAULT_SITE_URL: &str = "https://www.filehorse.com/";
pub const DEFAULT_CATALOG_FILE: &str = "toollist.yml";
pub const DEFAULT_BACKUP_FILE: &str = "toollist_backup.yml";
pub const DEFAULT_TOOLS_ROOT: &str = "tools";

/// Downloads larger than this are refused (2 GiB).
pub const DEFAULT_MAX_DOWNLOAD_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// Everything a run needs to know, resolved from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub catalog_path: PathBuf,
    pub backup_path: PathBuf,
    pub tools_root: PathBuf,
    pub site_url: String,
    /// Re-download up-to-date tools whose artifact is missing.
    pub verify: bool,
    /// Do not offer to remove failing entries after a pass.
    pub skip_remove: bool,
    /// Per-request timeout; requests never time out when unset.
    pub timeout: Option<Duration>,
    pub max_download_bytes: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from(DEFAULT_CATALOG_FILE),
            backup_path: PathBuf::from(DEFAULT_BACKUP_FILE),
            tools_root: PathBuf::from(DEFAULT_TOOLS_ROOT),
            site_url: DEFAULT_SITE_URL.to_string(),
            verify: false,
            skip_remove: false,
            timeout: None,
            max_download_bytes: DEFAULT_MAX_DOWNLOAD_BYTES,
        }
    }
}

/// Settings plus the network collaborators built from them.
pub struct Config {
    pub settings: Settings,
    pub http: HttpClient,
    pub pages: HtmlPageSource,
}

impl Config {
    pub fn new(settings: Settings) -> Result<Self> {
        let mut builder =
            Client::builder().user_agent(concat!("toolwatch/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = settings.timeout {
            debug!("Using a request timeout of {:?}", timeout);
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let http = HttpClient::new(client);
        let pages = HtmlPageSource::new(http.clone());

        Ok(Self {
            settings,
            http,
            pages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.catalog_path, PathBuf::from("toollist.yml"));
        assert_eq!(settings.backup_path, PathBuf::from("toollist_backup.yml"));
        assert_eq!(settings.site_url, DEFAULT_SITE_URL);
        assert!(settings.timeout.is_none());
        assert!(!settings.verify);
    }

    #[tokio::test]
    async fn test_config_client_identifies_itself() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_header("user-agent", Matcher::Regex("^toolwatch/".to_string()))
            .create_async()
            .await;

        let config = Config::new(Settings::default()).unwrap();
        config.http.status(&server.url()).await.unwrap();

        mock.assert_async().await;
    }

    #[test]
    fn test_config_accepts_timeout() {
        let settings = Settings {
            timeout: Some(Duration::from_secs(30)),
            ..Settings::default()
        };
        let config = Config::new(settings.clone()).unwrap();
        assert_eq!(config.settings, settings);
    }
}
