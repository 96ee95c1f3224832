//! Load-or-refresh handling for the persisted product table.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::ScoreConfig;
use crate::etl::{load_table, products_to_table, save_table};
use crate::fetch::{HttpClient, ProductFetcher};
use crate::product::ProductTable;

/// The on-disk product table and how long it stays fresh.
#[derive(Debug, Clone)]
pub struct DataStore {
    path: PathBuf,
    staleness: Duration,
}

impl DataStore {
    pub fn new(path: impl Into<PathBuf>, staleness: Duration) -> Self {
        Self {
            path: path.into(),
            staleness,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the table file was last written, if it exists.
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        let modified = fs::metadata(&self.path).and_then(|m| m.modified()).ok()?;
        Some(DateTime::<Utc>::from(modified))
    }

    /// True when the file is missing or older than the staleness window at `now`.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        let Some(modified) = self.modified_at() else {
            return true;
        };
        match chrono::Duration::from_std(self.staleness) {
            Ok(window) => modified < now - window,
            Err(_) => false,
        }
    }

    pub fn load(&self) -> Result<ProductTable> {
        load_table(&self.path)
    }

    /// Fetches, normalizes and saves a fresh table regardless of its age.
    ///
    /// # Errors
    ///
    /// Fails without touching the saved file when pages failed and no
    /// product came back at all.
    pub async fn refresh<C: HttpClient>(
        &self,
        fetcher: &ProductFetcher<C>,
        max_pages: u32,
        score: &ScoreConfig,
    ) -> Result<ProductTable> {
        let report = fetcher.fetch_all(max_pages).await?;
        if report.products.is_empty() && !report.is_complete() {
            bail!(
                "fetch failed for pages {:?} and returned no products; keeping {}",
                report.failed_pages,
                self.path.display()
            );
        }
        if !report.is_complete() {
            warn!(failed_pages = ?report.failed_pages, "Saving a table built from an incomplete fetch");
        }

        let table = products_to_table(&report.products, score);
        save_table(&table, &self.path)
            .with_context(|| format!("saving product table to {}", self.path.display()))?;
        Ok(table)
    }

    /// Returns the persisted table, refetching it first when stale.
    ///
    /// A stale table that exists on disk is still returned when the refetch fails.
    pub async fn load_or_refresh<C: HttpClient>(
        &self,
        fetcher: &ProductFetcher<C>,
        max_pages: u32,
        score: &ScoreConfig,
    ) -> Result<ProductTable> {
        if self.is_stale(Utc::now()) {
            info!(path = %self.path.display(), "Product table missing or stale, fetching fresh data");
            match self.refresh(fetcher, max_pages, score).await {
                Ok(table) => Ok(table),
                Err(e) if self.path.exists() => {
                    warn!(error = %e, path = %self.path.display(), "Refresh failed, using the stale table");
                    self.load()
                }
                Err(e) => Err(e),
            }
        } else {
            info!(path = %self.path.display(), "Loading cached product table");
            self.load()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchConfig;
    use crate::fetch::BasicClient;
    use crate::product::ProductRow;
    use std::time::SystemTime;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn saved_table(path: &Path) -> ProductTable {
        let table = ProductTable::new(vec![ProductRow {
            code: "old".into(),
            nutrient_score: 7.0,
            ..Default::default()
        }]);
        save_table(&table, path).unwrap();
        table
    }

    async fn unavailable_api() -> (MockServer, ProductFetcher<BasicClient>) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cgi/search.pl"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let config = FetchConfig {
            base_url: server.uri(),
            retries: 0,
            retry_backoff: Duration::ZERO,
            ..FetchConfig::default()
        };
        let fetcher = ProductFetcher::new(BasicClient::new().unwrap(), config);
        (server, fetcher)
    }

    #[test]
    fn test_missing_file_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let store = DataStore::new(dir.path().join("products.csv"), Duration::from_secs(3600));
        assert!(store.is_stale(Utc::now()));
        assert!(store.modified_at().is_none());
    }

    #[test]
    fn test_fresh_file_then_stale_after_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.csv");
        let table = ProductTable::new(vec![ProductRow {
            code: "1".into(),
            nutrient_score: 5.0,
            ..Default::default()
        }]);
        save_table(&table, &path).unwrap();

        let store = DataStore::new(&path, Duration::from_secs(3600));
        let now = Utc::now();
        assert!(!store.is_stale(now));
        assert!(store.is_stale(now + chrono::Duration::hours(2)));

        assert_eq!(store.load().unwrap(), table);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.csv");
        saved_table(&path);
        let before = fs::read(&path).unwrap();

        let (_server, fetcher) = unavailable_api().await;
        let store = DataStore::new(&path, Duration::from_secs(3600));
        let err = store
            .refresh(&fetcher, 3, &ScoreConfig::default())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("no products"));
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_stale_table_served_when_refresh_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.csv");
        let table = saved_table(&path);
        let two_hours_ago = SystemTime::now() - Duration::from_secs(2 * 3600);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(two_hours_ago)
            .unwrap();

        let (_server, fetcher) = unavailable_api().await;
        let store = DataStore::new(&path, Duration::from_secs(3600));
        assert!(store.is_stale(Utc::now()));

        let loaded = store
            .load_or_refresh(&fetcher, 3, &ScoreConfig::default())
            .await
            .unwrap();
        assert_eq!(loaded, table);
    }

    #[tokio::test]
    async fn test_failed_first_fetch_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.csv");

        let (_server, fetcher) = unavailable_api().await;
        let store = DataStore::new(&path, Duration::from_secs(3600));
        assert!(
            store
                .load_or_refresh(&fetcher, 3, &ScoreConfig::default())
                .await
                .is_err()
        );
        assert!(!path.exists());
    }
}
