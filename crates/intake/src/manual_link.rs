//! Manual link workflow for codes no source could resolve.
//!
//! When resolution ends unresolved the code is held as pending. The operator
//! searches the marketplace independently, picks a record, and the selection
//! is bound to the original code in the scan cache exactly once. The next
//! scan of that code is a cache hit.

use std::time::Duration;

use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, info, instrument};

use heatcheck_core::{CodeError, ProductSource, ResolvedProduct, ScannedCode};

use crate::cache::{CacheStore, InsertOutcome, StoreError};

/// Most pending codes held at once; the least used are evicted first.
pub const PENDING_CAPACITY: u64 = 10_000;
/// How long an abandoned pending code is kept.
pub const PENDING_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Errors from a manual link attempt.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The pending code was blank.
    #[error("invalid code: {0}")]
    InvalidCode(#[from] CodeError),

    /// The chosen record has no name or was itself served from the cache.
    #[error("selection cannot be linked: {0}")]
    InvalidSelection(String),

    /// The scan cache could not be written.
    #[error(transparent)]
    StoreUnavailable(StoreError),
}

/// Result of linking a pending code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOutcome {
    /// The record now bound to the code: the selection tagged `MANUAL`, or the
    /// existing binding tagged `CACHE` if the code was already bound.
    pub product: ResolvedProduct,
    /// Whether this call wrote the binding.
    pub newly_linked: bool,
}

/// Pending codes and the one-time bind into the scan cache.
pub struct ManualLinkWorkflow<C> {
    cache: C,
    pending: Cache<String, ()>,
}

impl<C: CacheStore> ManualLinkWorkflow<C> {
    /// Create a workflow writing to the given scan cache.
    #[must_use]
    pub fn new(cache: C) -> Self {
        Self::with_limits(cache, PENDING_CAPACITY, PENDING_TTL)
    }

    /// Create a workflow with explicit bounds on the pending set.
    #[must_use]
    pub fn with_limits(cache: C, capacity: u64, ttl: Duration) -> Self {
        let pending = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        Self { cache, pending }
    }

    /// Hold a code that failed automatic resolution.
    pub async fn mark_pending(&self, code: &str) {
        self.pending.insert(code.to_string(), ()).await;
    }

    /// Drop a code from the pending set (it resolved or was linked).
    pub async fn clear_pending(&self, code: &str) {
        self.pending.invalidate(code).await;
    }

    /// Whether a code is awaiting a manual link.
    #[must_use]
    pub fn is_pending(&self, code: &str) -> bool {
        self.pending.contains_key(code)
    }

    /// Pending codes, sorted.
    #[must_use]
    pub fn pending_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.pending.iter().map(|(code, ())| (*code).clone()).collect();
        codes.sort();
        codes
    }

    /// Bind an operator-chosen record to a pending code.
    ///
    /// Linking a code that is already bound (a repeated selection, or another
    /// operator got there first) writes nothing and returns the record the
    /// cache actually holds.
    ///
    /// # Errors
    ///
    /// Returns `LinkError::InvalidSelection` if the record has no name or came
    /// from the cache, and `LinkError::StoreUnavailable` if the store fails.
    #[instrument(skip(self, chosen), fields(chosen = %chosen.name))]
    pub async fn link(
        &self,
        pending_code: &str,
        chosen: &ResolvedProduct,
    ) -> Result<LinkOutcome, LinkError> {
        let code = ScannedCode::parse(pending_code)?;
        if !chosen.is_found() {
            return Err(LinkError::InvalidSelection(
                "selected product has no name".to_string(),
            ));
        }
        if chosen.source == ProductSource::Cache {
            return Err(LinkError::InvalidSelection(
                "selected product is already a cache entry".to_string(),
            ));
        }

        let product = chosen.with_source(ProductSource::Manual);
        let outcome = self
            .cache
            .insert(code.as_str(), &product)
            .await
            .map_err(LinkError::StoreUnavailable)?;
        self.clear_pending(code.as_str()).await;

        if outcome == InsertOutcome::Inserted {
            info!(code = %code, "Manually linked scanned code");
            return Ok(LinkOutcome {
                product,
                newly_linked: true,
            });
        }

        debug!(code = %code, "Code already linked, nothing written");
        let bound = self
            .cache
            .peek(code.as_str())
            .await
            .map_err(LinkError::StoreUnavailable)?
            .map_or(product, |entry| entry.product.with_source(ProductSource::Cache));
        Ok(LinkOutcome {
            product: bound,
            newly_linked: false,
        })
    }
}

impl<C> std::fmt::Debug for ManualLinkWorkflow<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualLinkWorkflow")
            .field("pending_entries", &self.pending.entry_count())
            .finish_non_exhaustive()
    }
}
