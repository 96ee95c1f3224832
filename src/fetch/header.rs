use crate::fetch::client::HttpClient;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, USER_AGENT};

/// An [`HttpClient`] wrapper that sets a fixed header on every request.
///
/// OpenFoodFacts asks API consumers to identify themselves with a custom
/// `User-Agent`, which is what [`WithHeader::user_agent`] builds.
pub struct WithHeader<C> {
    inner: C,
    name: HeaderName,
    value: HeaderValue,
}

impl<C> WithHeader<C> {
    /// Validates `name` and `value` up front so sending never fails on them.
    pub fn new(inner: C, name: &str, value: &str) -> Result<Self> {
        Ok(Self {
            inner,
            name: HeaderName::from_bytes(name.as_bytes())?,
            value: HeaderValue::from_str(value)?,
        })
    }

    pub fn user_agent(inner: C, value: &str) -> Result<Self> {
        Ok(Self {
            inner,
            name: USER_AGENT,
            value: HeaderValue::from_str(value)?,
        })
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for WithHeader<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut().insert(self.name.clone(), self.value.clone());
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BasicClient;

    #[test]
    fn test_rejects_invalid_header_name() {
        let client = BasicClient::new().unwrap();
        assert!(WithHeader::new(client, "bad header", "x").is_err());
    }

    #[test]
    fn test_rejects_invalid_header_value() {
        let client = BasicClient::new().unwrap();
        assert!(WithHeader::user_agent(client, "line\nbreak").is_err());
    }
}
