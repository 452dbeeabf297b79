//! Google Scholar search provider.
//!
//! Phrase searches use the exact-phrase parameter (`as_epq`); cluster
//! expansion lists every version Scholar grouped under one cluster id.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{COOKIE, USER_AGENT};
use tracing::{debug, instrument, warn};
use url::Url;

use super::extract::{find_block_marker, parse_results_page};
use super::http_client::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS, build_search_http_client};
use super::{Identity, ResultRecord, SearchError, SearchProvider};

/// Default Scholar base URL.
pub const DEFAULT_SCHOLAR_BASE_URL: &str = "https://scholar.google.com";

/// Results requested per cluster page (Scholar's maximum page size).
const CLUSTER_PAGE_SIZE: usize = 20;

/// Scraping client for Google Scholar result pages.
pub struct ScholarProvider {
    client: Client,
    base_url: String,
}

impl ScholarProvider {
    /// Creates a provider for the public Scholar host with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if HTTP client construction fails.
    pub fn new() -> Result<Self, SearchError> {
        Self::with_base_url(DEFAULT_SCHOLAR_BASE_URL)
    }

    /// Creates a provider against a custom base URL (mirrors, wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the base URL is invalid or client construction fails.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, SearchError> {
        Self::with_timeouts(base_url, CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a provider with explicit connect/read timeouts in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the base URL is invalid or client construction fails.
    #[tracing::instrument(skip_all, fields(connect_timeout_secs, read_timeout_secs))]
    pub fn with_timeouts(
        base_url: impl Into<String>,
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, SearchError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| {
            SearchError::invalid_request(format!("invalid provider base URL '{base_url}': {e}"))
        })?;
        let client = build_search_http_client(connect_timeout_secs, read_timeout_secs)?;
        Ok(Self { client, base_url })
    }

    /// Returns the configured base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn phrase_url(&self, phrase: &str, page_size: usize) -> String {
        format!(
            "{}/scholar?hl=en&as_epq={}&num={}",
            self.base_url,
            urlencoding::encode(phrase),
            page_size
        )
    }

    fn cluster_url(&self, cluster_id: &str) -> String {
        format!(
            "{}/scholar?hl=en&cluster={}&num={}",
            self.base_url,
            urlencoding::encode(cluster_id),
            CLUSTER_PAGE_SIZE
        )
    }

    async fn fetch(&self, url: &str, identity: &Identity) -> Result<Vec<ResultRecord>, SearchError> {
        debug!(url = %url, "querying provider");

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, identity.user_agent())
            .header(COOKIE, identity.cookie_header())
            .send()
            .await
            .map_err(|e| SearchError::network(url, e))?;

        let status = response.status().as_u16();
        if matches!(status, 403 | 429) {
            warn!(status, "provider refused request");
            return Err(SearchError::blocked(url, format!("HTTP {status}")));
        }
        if !response.status().is_success() {
            return Err(SearchError::http_status(url, status));
        }
        if response.url().path().starts_with("/sorry") {
            return Err(SearchError::blocked(url, "redirected to unusual-traffic page"));
        }

        let page_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| SearchError::network(url, e))?;

        if let Some(marker) = find_block_marker(&body) {
            warn!(marker, "provider served a captcha page");
            return Err(SearchError::blocked(url, format!("captcha marker '{marker}'")));
        }

        Ok(parse_results_page(&body, &page_url))
    }
}

impl std::fmt::Debug for ScholarProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScholarProvider")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SearchProvider for ScholarProvider {
    fn name(&self) -> &'static str {
        "scholar"
    }

    #[instrument(skip(self, identity), fields(provider = "scholar"))]
    async fn search(
        &self,
        phrase: &str,
        page_size: usize,
        identity: &Identity,
    ) -> Result<Vec<ResultRecord>, SearchError> {
        if phrase.trim().is_empty() {
            return Err(SearchError::invalid_request("search phrase is empty"));
        }
        let url = self.phrase_url(phrase.trim(), page_size.max(1));
        let mut records = self.fetch(&url, identity).await?;
        records.truncate(page_size.max(1));
        Ok(records)
    }

    #[instrument(skip(self, identity), fields(provider = "scholar"))]
    async fn search_cluster(
        &self,
        cluster_id: &str,
        identity: &Identity,
    ) -> Result<Vec<ResultRecord>, SearchError> {
        if cluster_id.trim().is_empty() {
            return Err(SearchError::invalid_request("cluster id is empty"));
        }
        let url = self.cluster_url(cluster_id.trim());
        self.fetch(&url, identity).await
    }
}
