//! Operator-driven marketplace search for the manual link workflow.
//!
//! Candidate lists are memoised in memory for 5 minutes so an operator paging
//! back and forth between results does not re-query the provider. This memo
//! has nothing to do with the durable scan cache.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use heatcheck_core::ResolvedProduct;

use crate::providers::{MarketplaceCatalog, ProviderResponse, ProviderUnavailable};
use crate::resolution::DEFAULT_PROVIDER_TIMEOUT;

const MEMO_CAPACITY: u64 = 1000;
const MEMO_TTL: Duration = Duration::from_secs(300);

/// Errors from a manual search.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The query was blank.
    #[error("search query is empty")]
    EmptyQuery,

    /// The marketplace could not answer.
    #[error("marketplace unavailable: {0}")]
    Unavailable(#[from] ProviderUnavailable),
}

/// Manual marketplace search with a short-lived memo.
#[derive(Clone)]
pub struct ManualSearch<M> {
    marketplace: M,
    memo: Cache<String, Arc<Vec<ResolvedProduct>>>,
    timeout: Duration,
}

impl<M: MarketplaceCatalog> ManualSearch<M> {
    /// Create a search over the given catalog.
    #[must_use]
    pub fn new(marketplace: M) -> Self {
        let memo = Cache::builder()
            .max_capacity(MEMO_CAPACITY)
            .time_to_live(MEMO_TTL)
            .build();
        Self {
            marketplace,
            memo,
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    /// Override the upper bound on a provider call.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Candidates for an operator query, in provider rank order.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::EmptyQuery` for blank input and
    /// `SearchError::Unavailable` if the provider fails or exceeds the timeout.
    /// Failures are not memoised.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Arc<Vec<ResolvedProduct>>, SearchError> {
        let key = memo_key(query).ok_or(SearchError::EmptyQuery)?;

        if let Some(hit) = self.memo.get(&key).await {
            debug!(count = hit.len(), "Manual search memo hit");
            return Ok(hit);
        }

        let response = tokio::time::timeout(self.timeout, self.marketplace.search(query.trim()))
            .await
            .unwrap_or_else(|_| {
                ProviderResponse::Unavailable(ProviderUnavailable::Timeout(self.timeout))
            });

        match response {
            ProviderResponse::Found(candidates) => {
                let candidates: Vec<ResolvedProduct> = candidates
                    .into_iter()
                    .filter(ResolvedProduct::is_found)
                    .collect();
                let candidates = Arc::new(candidates);
                self.memo.insert(key, Arc::clone(&candidates)).await;
                Ok(candidates)
            }
            ProviderResponse::Unavailable(reason) => {
                warn!(provider = self.marketplace.name(), reason = %reason, "Manual search failed");
                Err(SearchError::Unavailable(reason))
            }
        }
    }
}

impl<M> std::fmt::Debug for ManualSearch<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualSearch")
            .field("memo_entries", &self.memo.entry_count())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Normalised memo key; `None` for blank queries.
fn memo_key(query: &str) -> Option<String> {
    let trimmed = query.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}
