//! Paginated product retrieval from the OpenFoodFacts search API.

use anyhow::{Result, anyhow};
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{HttpClient, fetch_json};
use crate::config::{FetchConfig, PageFailurePolicy};
use crate::product::RawProduct;

/// Upper bound on the wait between two attempts at the same page.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(300);

/// Exponential backoff for `attempt` (0-based), saturating and capped at [`MAX_RETRY_DELAY`].
pub fn retry_delay(backoff: Duration, attempt: u32) -> Duration {
    backoff
        .saturating_mul(2u32.saturating_pow(attempt))
        .min(MAX_RETRY_DELAY)
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    products: Vec<Value>,
}

#[derive(Deserialize)]
struct ProductResponse {
    status: Option<Value>,
    product: Option<Value>,
}

/// Outcome of a paginated fetch.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub products: Vec<RawProduct>,
    /// HTTP requests issued, retries included.
    pub requests: u32,
    /// Pages that returned at least one record.
    pub pages_fetched: u32,
    /// Pages given up on after exhausting retries.
    pub failed_pages: Vec<u32>,
}

impl FetchReport {
    pub fn is_complete(&self) -> bool {
        self.failed_pages.is_empty()
    }
}

pub struct ProductFetcher<C> {
    client: C,
    config: FetchConfig,
}

impl<C: HttpClient> ProductFetcher<C> {
    pub fn new(client: C, config: FetchConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.config.base_url)?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("base URL '{}' cannot carry a path", self.config.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// URL of one search page filtered by the configured country tag.
    pub fn search_url(&self, page: u32) -> Result<Url> {
        let mut url = self.endpoint(&["cgi", "search.pl"])?;
        url.query_pairs_mut()
            .append_pair("action", "process")
            .append_pair("tagtype_0", "countries")
            .append_pair("tag_contains_0", "contains")
            .append_pair("tag_0", &self.config.country)
            .append_pair("page_size", &self.config.page_size.to_string())
            .append_pair("page", &page.to_string())
            .append_pair("json", "1");
        Ok(url)
    }

    pub fn product_url(&self, code: &str) -> Result<Url> {
        self.endpoint(&["api", "v0", "product", &format!("{code}.json")])
    }

    /// Fetches one page and projects each record to the configured fields.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures, non-2xx statuses and
    /// undecodable bodies.
    #[tracing::instrument(skip(self), fields(country = %self.config.country))]
    pub async fn fetch_page(&self, page: u32) -> Result<Vec<RawProduct>> {
        let url = self.search_url(page)?;
        let body: SearchResponse = fetch_json(&self.client, url).await?;

        let products: Vec<RawProduct> = body
            .products
            .iter()
            .filter_map(Value::as_object)
            .map(|record| RawProduct::project(record, &self.config.fields))
            .collect();

        debug!(count = products.len(), "Page decoded");
        Ok(products)
    }

    async fn fetch_page_with_retry(&self, page: u32, requests: &mut u32) -> Result<Vec<RawProduct>> {
        let mut attempt = 0;
        loop {
            *requests += 1;
            match self.fetch_page(page).await {
                Ok(products) => return Ok(products),
                Err(e) if attempt < self.config.retries => {
                    let delay = retry_delay(self.config.retry_backoff, attempt);
                    warn!(page, attempt, error = %e, delay_ms = delay.as_millis() as u64, "Page fetch failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Requests pages 1..=`max_pages` one at a time until a page comes back empty.
    ///
    /// A page that keeps failing after its retries is handled per
    /// [`PageFailurePolicy`]: skipped pages are listed in
    /// [`FetchReport::failed_pages`] and do not stop the loop.
    #[tracing::instrument(skip(self), fields(country = %self.config.country))]
    pub async fn fetch_all(&self, max_pages: u32) -> Result<FetchReport> {
        let mut report = FetchReport::default();

        for page in 1..=max_pages {
            let products = match self.fetch_page_with_retry(page, &mut report.requests).await {
                Ok(products) => products,
                Err(e) => match self.config.on_page_failure {
                    PageFailurePolicy::Abort => {
                        return Err(e.context(format!("fetching page {page} failed")));
                    }
                    PageFailurePolicy::Skip => {
                        warn!(page, error = %e, "Giving up on page, continuing with the next one");
                        report.failed_pages.push(page);
                        continue;
                    }
                },
            };

            if products.is_empty() {
                debug!(page, "Empty page, no more products");
                break;
            }

            info!(page, count = products.len(), "Page fetched");
            report.pages_fetched += 1;
            report.products.extend(products);
        }

        info!(
            total = report.products.len(),
            requests = report.requests,
            failed_pages = report.failed_pages.len(),
            "Fetch finished"
        );
        Ok(report)
    }

    /// Looks up a single product. Absent when the API reports no match or on any error.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_product_by_code(&self, code: &str) -> Option<RawProduct> {
        let url = match self.product_url(code) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Could not build product URL");
                return None;
            }
        };

        match fetch_json::<_, ProductResponse>(&self.client, url).await {
            Ok(body) if body.status.as_ref().and_then(Value::as_i64) == Some(1) => {
                body.product.and_then(RawProduct::from_value)
            }
            Ok(_) => {
                debug!("Product not found");
                None
            }
            Err(e) => {
                warn!(error = %e, "Product lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BasicClient;

    fn fetcher(base_url: &str) -> ProductFetcher<BasicClient> {
        let config = FetchConfig {
            base_url: base_url.to_string(),
            page_size: 2,
            ..FetchConfig::default()
        };
        ProductFetcher::new(BasicClient::new().unwrap(), config)
    }

    #[test]
    fn test_search_url_carries_country_and_paging() {
        let url = fetcher("https://world.openfoodfacts.org").search_url(3).unwrap();
        assert_eq!(url.path(), "/cgi/search.pl");

        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("tag_0".into(), "india".into())));
        assert!(query.contains(&("page_size".into(), "2".into())));
        assert!(query.contains(&("page".into(), "3".into())));
        assert!(query.contains(&("json".into(), "1".into())));
    }

    #[test]
    fn test_product_url_with_trailing_slash_base() {
        let url = fetcher("https://world.openfoodfacts.org/").product_url("8901063").unwrap();
        assert_eq!(url.as_str(), "https://world.openfoodfacts.org/api/v0/product/8901063.json");
    }

    #[test]
    fn test_product_url_escapes_code() {
        let url = fetcher("https://world.openfoodfacts.org").product_url("a/b").unwrap();
        assert_eq!(url.path(), "/api/v0/product/a%2Fb.json");
    }

    #[test]
    fn test_report_completeness() {
        let mut report = FetchReport::default();
        assert!(report.is_complete());
        report.failed_pages.push(2);
        assert!(!report.is_complete());
    }

    #[test]
    fn test_retry_delay_doubles_then_caps() {
        let base = Duration::from_secs(1);
        assert_eq!(retry_delay(base, 0), Duration::from_secs(1));
        assert_eq!(retry_delay(base, 3), Duration::from_secs(8));
        assert_eq!(retry_delay(base, 40), MAX_RETRY_DELAY);
        assert_eq!(retry_delay(base, u32::MAX), MAX_RETRY_DELAY);
        assert_eq!(retry_delay(Duration::ZERO, 40), Duration::ZERO);
    }
}
