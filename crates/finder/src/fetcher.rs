// ABOUTME: The fetching seam for discovery: a trait plus the reqwest-backed default.
// ABOUTME: Tests substitute canned fetchers here so the engine can run without a network.

use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::FinderError;

const DEFAULT_USER_AGENT: &str =
    concat!("feedsift/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One completed request. `final_url` differs from `url` after redirects.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub url: String,
    pub final_url: String,
    pub status: u16,
    pub body: Bytes,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Anything that can fetch a URL for the discovery engine.
pub trait Fetcher: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FetchResponse, FinderError>>;
}

/// Builder for the reqwest-backed fetcher.
pub struct HttpFetcherBuilder {
    user_agent: String,
    timeout: Duration,
}

impl Default for HttpFetcherBuilder {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl HttpFetcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<HttpFetcher, FinderError> {
        let client = reqwest::Client::builder()
            .user_agent(self.user_agent)
            .timeout(self.timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(HttpFetcher { client })
    }
}

/// The production fetcher.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FinderError> {
        HttpFetcherBuilder::new().build()
    }
}

impl Fetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FetchResponse, FinderError>> {
        async move {
            let response = self.client.get(url).send().await?;
            let status = response.status().as_u16();
            let final_url = response.url().to_string();
            let body = response.bytes().await?;
            Ok(FetchResponse {
                url: url.to_string(),
                final_url,
                status,
                body,
            })
        }
        .boxed()
    }
}
