mod basic;
mod client;
mod header;
mod products;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use header::WithHeader;
pub use products::{FetchReport, MAX_RETRY_DELAY, ProductFetcher, retry_delay};

use anyhow::Result;
use serde::de::DeserializeOwned;

/// Issues a GET for `url` and decodes the JSON body, failing on non-2xx statuses.
pub async fn fetch_json<C: HttpClient, T: DeserializeOwned>(
    client: &C,
    url: reqwest::Url,
) -> Result<T> {
    let req = reqwest::Request::new(reqwest::Method::GET, url);

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.json::<T>().await?)
}
