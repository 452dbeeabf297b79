//! Primary search, cluster fallback and candidate walk.

use serde::Serialize;
use tracing::{debug, info, instrument};

use super::error::ResolveError;
use super::filter::CandidateFilter;
use super::session::{
    FIELD_CLUSTER, FIELD_PDF, FIELD_TITLE, FIELD_URL, FIELD_YEAR, ResolutionSession,
};
use super::utils::unwrap_proxied_url;
use crate::search::{ResultRecord, SearchError, SearchProvider};
use crate::throttle::ThrottleController;

/// Advisory emitted when the result looks like a book rather than a paper.
pub const BOOK_ADVISORY: &str = "Might be a book";

/// Where the adopted URL came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CandidateSource {
    /// The first result of the phrase search.
    Primary,
    /// A result of the cluster listing.
    Cluster {
        /// Cluster that was expanded.
        cluster_id: String,
        /// Zero-based position within the cluster listing.
        position: usize,
    },
}

/// A validated, non-blacklisted document location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Document URL with search-host proxying removed.
    pub url: String,
    /// Title of the adopted record.
    pub title: String,
    /// Year of the adopted record.
    pub year: Option<String>,
    /// Which result supplied the URL.
    pub source: CandidateSource,
    /// The adopted or primary URL points at a book.
    pub book_hint: bool,
}

/// Resolves a phrase to a document URL through a [`SearchProvider`].
pub struct ResolutionEngine<P> {
    provider: P,
    filter: CandidateFilter,
}

impl<P: SearchProvider> ResolutionEngine<P> {
    /// Creates an engine over `provider` using `filter` for candidate checks.
    #[must_use]
    pub fn new(provider: P, filter: CandidateFilter) -> Self {
        Self { provider, filter }
    }

    /// The underlying provider.
    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The candidate filter in use.
    #[must_use]
    pub fn filter(&self) -> &CandidateFilter {
        &self.filter
    }

    /// Resolves `phrase` to a usable document URL.
    ///
    /// Every provider call goes through `throttle`. Provider failures are not
    /// retried here.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::NoResults`] when the primary search is empty
    /// - [`ResolveError::NoPdfFound`] when no candidate had a usable URL
    /// - [`ResolveError::Provider`] when a provider call failed
    #[instrument(skip(self, throttle, session), fields(provider = self.provider.name()))]
    pub async fn resolve(
        &self,
        phrase: &str,
        throttle: &mut ThrottleController,
        session: &mut ResolutionSession<'_>,
    ) -> Result<Resolution, ResolveError> {
        let provider = &self.provider;
        let records = throttle
            .wrap(|identity| async move { provider.search(phrase, 1, &identity).await })
            .await
            .map_err(|source| provider_error(phrase, source))?;

        let Some(primary) = records.into_iter().next() else {
            debug!(phrase, "primary search returned nothing");
            return Err(ResolveError::NoResults {
                phrase: phrase.to_string(),
            });
        };

        session.result(FIELD_TITLE, Some(primary.title()));
        session.result(FIELD_YEAR, primary.year());
        let primary_pdf = primary.pdf_url().map(unwrap_proxied_url);
        session.info(FIELD_PDF, primary_pdf.as_deref());

        let mut candidates_checked = 1;
        let adopted = match primary_pdf {
            Some(url) if self.filter.is_usable(Some(&url)) => Some(Resolution {
                url,
                title: primary.title().to_string(),
                year: primary.year().map(str::to_string),
                source: CandidateSource::Primary,
                book_hint: false,
            }),
            _ => {
                session.info(FIELD_URL, primary.url());
                self.walk_cluster(&primary, throttle, session, &mut candidates_checked)
                    .await
                    .map_err(|source| provider_error(phrase, source))?
            }
        };

        let book_hint = self
            .filter
            .looks_like_book(adopted.as_ref().map(|resolution| resolution.url.as_str()))
            || self.filter.looks_like_book(primary.url());
        if book_hint {
            session.warning(BOOK_ADVISORY);
        }

        match adopted {
            Some(mut resolution) => {
                resolution.book_hint = book_hint;
                info!(url = %resolution.url, source = ?resolution.source, "resolved document URL");
                Ok(resolution)
            }
            None => Err(ResolveError::NoPdfFound {
                phrase: phrase.to_string(),
                candidates_checked,
            }),
        }
    }

    /// Expands the primary record's cluster and adopts the first usable candidate.
    async fn walk_cluster(
        &self,
        primary: &ResultRecord,
        throttle: &mut ThrottleController,
        session: &mut ResolutionSession<'_>,
        candidates_checked: &mut usize,
    ) -> Result<Option<Resolution>, SearchError> {
        let Some(cluster_id) = primary.cluster_id() else {
            debug!("primary candidate unusable and has no cluster");
            return Ok(None);
        };

        let provider = &self.provider;
        let records = throttle
            .wrap(|identity| async move { provider.search_cluster(cluster_id, &identity).await })
            .await?;

        for (position, record) in records.iter().enumerate() {
            *candidates_checked += 1;
            let Some(url) = record.pdf_url().map(unwrap_proxied_url) else {
                continue;
            };
            if !self.filter.is_usable(Some(&url)) {
                debug!(position, url = %url, "skipping unusable cluster candidate");
                continue;
            }

            session.info(FIELD_CLUSTER, Some(cluster_id));
            session.result(FIELD_TITLE, Some(record.title()));
            session.result(FIELD_YEAR, record.year());
            session.info(FIELD_PDF, Some(&url));
            return Ok(Some(Resolution {
                url,
                title: record.title().to_string(),
                year: record.year().map(str::to_string),
                source: CandidateSource::Cluster {
                    cluster_id: cluster_id.to_string(),
                    position,
                },
                book_hint: false,
            }));
        }

        debug!(cluster_id, checked = records.len(), "no usable candidate in cluster");
        Ok(None)
    }
}

fn provider_error(phrase: &str, source: SearchError) -> ResolveError {
    ResolveError::Provider {
        phrase: phrase.to_string(),
        source,
    }
}

impl<P: SearchProvider> std::fmt::Debug for ResolutionEngine<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionEngine")
            .field("provider", &self.provider.name())
            .field("filter", &self.filter)
            .finish()
    }
}
