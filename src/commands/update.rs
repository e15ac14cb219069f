use anyhow::Result;
use log::info;

use crate::catalog::CatalogStore;
use crate::config::{Config, Settings};
use crate::download::DownloadManager;
use crate::reconcile::ReconciliationEngine;
use crate::run::{RunController, check_connection};
use crate::runtime::Runtime;

use super::today;

#[tracing::instrument(skip(runtime, settings))]
pub async fn update<R: Runtime>(runtime: R, settings: Settings) -> Result<()> {
    let config = Config::new(settings)?;
    run(&runtime, config).await
}

/// Check the site, then run one update pass with `config`.
#[tracing::instrument(skip(runtime, config))]
pub async fn run<R: Runtime>(runtime: &R, config: Config) -> Result<()> {
    let settings = &config.settings;
    check_connection(&config.http, &settings.site_url).await?;

    let store = CatalogStore::new(
        runtime,
        settings.catalog_path.clone(),
        settings.backup_path.clone(),
    );
    let downloader = DownloadManager::new(
        runtime,
        &config.pages,
        config.http.clone(),
        settings.tools_root.clone(),
        settings.max_download_bytes,
    );
    let engine = ReconciliationEngine::new(&config.pages, &downloader).with_verify(settings.verify);
    let controller =
        RunController::new(runtime, store, engine, today()).with_skip_remove(settings.skip_remove);

    if let Some(report) = controller.run().await? {
        info!(
            "Reconciled {} tools, {} failed",
            report.reconciled,
            report.errors.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RealRuntime;
    use mockito::Server;
    use std::path::Path;
    use tempfile::tempdir;

    fn tool_page(label: &str) -> String {
        format!(
            r#"<html><body>
            <div class="program-below-name-container">Freeware | 1.2 MB</div>
            <div class="below-download-link"><p class="green">Safe</p></div>
            <span itemprop="operatingSystem">Windows 11</span>
            <div itemprop="publisher"><p><a href="/p/">Labs</a> <a href="https://toolx.example">Home</a></p></div>
            <meta itemprop="ratingValue" content="4.0">
            <div itemprop="softwareVersion">{label}</div>
            </body></html>"#
        )
    }

    fn settings_in(dir: &Path, site_url: String) -> Settings {
        Settings {
            catalog_path: dir.join("toollist.yml"),
            backup_path: dir.join("toollist_backup.yml"),
            tools_root: dir.join("tools"),
            site_url,
            skip_remove: true,
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn test_update_downloads_new_version() {
        let mut server = Server::new_async().await;
        let url = server.url();
        let _home = server.mock("GET", "/").with_status(200).create_async().await;
        let _page = server
            .mock("GET", "/toolx/")
            .with_status(200)
            .with_body(tool_page("ToolX 1.1"))
            .create_async()
            .await;
        let _download_page = server
            .mock("GET", "/toolx/download/")
            .with_status(200)
            .with_body(format!(
                r#"<a rel="nofollow noopener" href="{}/files/toolx">get</a>"#,
                url
            ))
            .create_async()
            .await;
        let binary = server
            .mock("GET", "/files/toolx")
            .with_status(200)
            .with_body(b"PK\x03\x04payload")
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let settings = settings_in(dir.path(), url.clone());
        std::fs::write(
            &settings.catalog_path,
            format!("ToolX:\n  link: {}/toolx/\n  latest version: '1.0'\n", url),
        )
        .unwrap();

        let config = Config::new(settings.clone()).unwrap();
        run(&RealRuntime, config).await.unwrap();

        binary.assert_async().await;
        assert!(dir.path().join("tools/ToolX/ToolX 1.1.zip").exists());
        let catalog = std::fs::read_to_string(&settings.catalog_path).unwrap();
        let document: serde_yaml::Value = serde_yaml::from_str(&catalog).unwrap();
        assert_eq!(
            document["ToolX"]["latest version"],
            serde_yaml::Value::String("1.1".to_string())
        );
        assert_eq!(
            std::fs::read_to_string(&settings.backup_path).unwrap(),
            catalog
        );
    }

    #[tokio::test]
    async fn test_update_stops_when_site_is_down() {
        let mut server = Server::new_async().await;
        let _home = server.mock("GET", "/").with_status(503).create_async().await;

        let dir = tempdir().unwrap();
        let settings = settings_in(dir.path(), server.url());
        let config = Config::new(settings.clone()).unwrap();

        assert!(run(&RealRuntime, config).await.is_err());
        assert!(!settings.catalog_path.exists());
    }
}
