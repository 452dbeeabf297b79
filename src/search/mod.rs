//! Search provider capability and the result records it produces.
//!
//! The resolution engine only sees the [`SearchProvider`] trait. The bundled
//! [`ScholarProvider`] fetches Google Scholar result pages and extracts
//! [`ResultRecord`]s from the HTML.
//!
//! # Example
//!
//! ```no_run
//! use bibdl_core::search::{ScholarProvider, SearchProvider};
//! use bibdl_core::Identity;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = ScholarProvider::new()?;
//! let identity = Identity::new("Mozilla/5.0", "0123456789abcdef");
//! let records = provider
//!     .search("Structure and Interpretation of Computer Programs", 1, &identity)
//!     .await?;
//! for record in &records {
//!     println!("{} -> {:?}", record.title(), record.pdf_url());
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod extract;
mod http_client;
mod scholar;

pub use error::SearchError;
pub use http_client::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
pub use scholar::{DEFAULT_SCHOLAR_BASE_URL, ScholarProvider};

use async_trait::async_trait;
use serde::Serialize;

pub use crate::user_agent::Identity;

/// One normalized search hit.
///
/// Records are built once per provider response and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRecord {
    title: String,
    year: Option<String>,
    url: Option<String>,
    pdf_url: Option<String>,
    cluster_id: Option<String>,
}

impl ResultRecord {
    /// Creates a record with only a title.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            year: None,
            url: None,
            pdf_url: None,
            cluster_id: None,
        }
    }

    /// Sets the publication year.
    #[must_use]
    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        self.year = Some(year.into());
        self
    }

    /// Sets the raw result URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the candidate document URL.
    #[must_use]
    pub fn with_pdf_url(mut self, pdf_url: impl Into<String>) -> Self {
        self.pdf_url = Some(pdf_url.into());
        self
    }

    /// Sets the provider cluster identifier.
    #[must_use]
    pub fn with_cluster_id(mut self, cluster_id: impl Into<String>) -> Self {
        self.cluster_id = Some(cluster_id.into());
        self
    }

    /// Result title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Publication year, when the provider reported one.
    #[must_use]
    pub fn year(&self) -> Option<&str> {
        self.year.as_deref()
    }

    /// Raw result URL (landing page).
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Candidate document URL as reported by the provider.
    #[must_use]
    pub fn pdf_url(&self) -> Option<&str> {
        self.pdf_url.as_deref()
    }

    /// Cluster identifier grouping versions of the same work.
    #[must_use]
    pub fn cluster_id(&self) -> Option<&str> {
        self.cluster_id.as_deref()
    }
}

/// A scholarly search backend.
///
/// Implementations may legitimately return an empty set. Every call carries
/// the identity the caller wants presented to the provider.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Searches for an exact phrase, returning at most `page_size` records.
    async fn search(
        &self,
        phrase: &str,
        page_size: usize,
        identity: &Identity,
    ) -> Result<Vec<ResultRecord>, SearchError>;

    /// Lists the records of one cluster.
    async fn search_cluster(
        &self,
        cluster_id: &str,
        identity: &Identity,
    ) -> Result<Vec<ResultRecord>, SearchError>;
}

#[async_trait]
impl<P: SearchProvider + ?Sized> SearchProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn search(
        &self,
        phrase: &str,
        page_size: usize,
        identity: &Identity,
    ) -> Result<Vec<ResultRecord>, SearchError> {
        (**self).search(phrase, page_size, identity).await
    }

    async fn search_cluster(
        &self,
        cluster_id: &str,
        identity: &Identity,
    ) -> Result<Vec<ResultRecord>, SearchError> {
        (**self).search_cluster(cluster_id, identity).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_record_builder_sets_fields() {
        let record = ResultRecord::new("A Paper")
            .with_year("1996")
            .with_url("https://example.com/landing")
            .with_pdf_url("https://example.com/paper.pdf")
            .with_cluster_id("42");
        assert_eq!(record.title(), "A Paper");
        assert_eq!(record.year(), Some("1996"));
        assert_eq!(record.url(), Some("https://example.com/landing"));
        assert_eq!(record.pdf_url(), Some("https://example.com/paper.pdf"));
        assert_eq!(record.cluster_id(), Some("42"));
    }

    #[test]
    fn test_result_record_defaults_to_absent_fields() {
        let record = ResultRecord::new("Only a title");
        assert!(record.year().is_none());
        assert!(record.url().is_none());
        assert!(record.pdf_url().is_none());
        assert!(record.cluster_id().is_none());
    }
}
