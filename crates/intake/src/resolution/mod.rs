//! Product identification for the inventory scan workflow.
//!
//! Resolves a scanned barcode, typed style code or free-text query to a
//! canonical product record, trying the cheapest source first:
//!
//! 1. Scan cache (keyed by the original code, counts a hit)
//! 2. Barcode registry → marketplace search for the registry title
//!    (barcode-shaped codes only; the result is cached under the original code)
//! 3. Marketplace search with the code itself (never cached; free text is not a
//!    stable key)
//!
//! Each step short-circuits. Provider failures count as "no candidate" and the
//! chain moves on; only scan cache failures abort the request.

pub mod plan;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use heatcheck_core::{CodeError, ProductSource, ResolvedProduct, ScannedCode};

use crate::cache::{CacheStore, InsertOutcome, StoreError};
use crate::providers::{
    BarcodeRegistry, MarketplaceCatalog, ProviderResponse, ProviderUnavailable,
};

pub use plan::{ResolutionPlan, Step};

/// Default upper bound on a single provider call.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(8);

/// Errors that abort a resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The input was not a usable code.
    #[error("invalid code: {0}")]
    InvalidCode(#[from] CodeError),

    /// The scan cache could not be read or written.
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),
}

/// Terminal outcome of a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A source produced a record.
    Resolved(ResolvedProduct),
    /// No source matched; the code awaits a manual link.
    Unresolved {
        /// The original code as entered (trimmed).
        pending_code: String,
    },
}

impl Resolution {
    /// The resolved record, if any.
    #[must_use]
    pub const fn product(&self) -> Option<&ResolvedProduct> {
        match self {
            Self::Resolved(product) => Some(product),
            Self::Unresolved { .. } => None,
        }
    }
}

/// Resolution orchestrator over a scan cache and two providers.
#[derive(Debug, Clone)]
pub struct Resolver<C, R, M> {
    cache: C,
    registry: R,
    marketplace: M,
    provider_timeout: Duration,
}

impl<C, R, M> Resolver<C, R, M>
where
    C: CacheStore,
    R: BarcodeRegistry,
    M: MarketplaceCatalog,
{
    /// Create a resolver with the default provider timeout.
    #[must_use]
    pub fn new(cache: C, registry: R, marketplace: M) -> Self {
        Self {
            cache,
            registry,
            marketplace,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    /// Override the per-call provider timeout.
    #[must_use]
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// The scan cache this resolver reads and appends to.
    #[must_use]
    pub const fn cache(&self) -> &C {
        &self.cache
    }

    /// Upper bound on a single provider call.
    #[must_use]
    pub const fn provider_timeout(&self) -> Duration {
        self.provider_timeout
    }

    /// The marketplace catalog used for the final step.
    #[must_use]
    pub const fn marketplace(&self) -> &M {
        &self.marketplace
    }

    /// Resolve operator input to a product record.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::InvalidCode` for blank input and
    /// `ResolveError::StoreUnavailable` if the scan cache fails. Provider
    /// failures never surface here.
    #[instrument(skip(self))]
    pub async fn resolve(&self, input: &str) -> Result<Resolution, ResolveError> {
        let code = ScannedCode::parse(input)?;
        let plan = ResolutionPlan::for_code(&code);

        for step in plan.steps() {
            let found = match step {
                Step::Cache => self.from_cache(&code).await?,
                Step::RegistryThenMarketplace => self.from_registry(&code).await?,
                Step::Marketplace => self.from_marketplace(&code).await,
            };

            if let Some(product) = found {
                info!(
                    code = %code,
                    step = ?step,
                    source = %product.source,
                    name = %product.name,
                    "Resolved scanned code"
                );
                return Ok(Resolution::Resolved(product));
            }
            debug!(code = %code, step = ?step, "No match from step");
        }

        info!(code = %code, "Scanned code unresolved, awaiting manual link");
        Ok(Resolution::Unresolved {
            pending_code: code.to_string(),
        })
    }

    async fn from_cache(&self, code: &ScannedCode) -> Result<Option<ResolvedProduct>, StoreError> {
        let entry = self.cache.lookup(code.as_str()).await?;
        Ok(entry.map(|entry| {
            debug!(hit_count = entry.hit_count, origin = %entry.origin, "Scan cache hit");
            entry.product.with_source(ProductSource::Cache)
        }))
    }

    async fn from_registry(
        &self,
        code: &ScannedCode,
    ) -> Result<Option<ResolvedProduct>, StoreError> {
        let Some(barcode) = code.as_barcode() else {
            return Ok(None);
        };

        let titles = self
            .call(self.registry.name(), self.registry.lookup(&barcode))
            .await;
        let Some(title) = first(self.registry.name(), titles) else {
            return Ok(None);
        };
        debug!(title = %title, "Registry title found, searching marketplace");

        let candidates = self
            .call(self.marketplace.name(), self.marketplace.search(&title))
            .await;
        let Some(candidate) = first_found(self.marketplace.name(), candidates) else {
            // A bare registry title is not cached; fall through to the next step.
            return Ok(None);
        };

        let product = candidate.with_source(ProductSource::BarcodeRegistry);
        match self.cache.insert(code.as_str(), &product).await? {
            InsertOutcome::Inserted => debug!("Cached registry resolution"),
            InsertOutcome::AlreadyExists => {
                debug!("Code already cached by a concurrent scan");
            }
        }
        Ok(Some(product))
    }

    async fn from_marketplace(&self, code: &ScannedCode) -> Option<ResolvedProduct> {
        let candidates = self
            .call(self.marketplace.name(), self.marketplace.search(code.as_str()))
            .await;
        first_found(self.marketplace.name(), candidates)
            .map(|candidate| candidate.with_source(ProductSource::Marketplace))
    }

    /// Await a provider call under the provider timeout.
    async fn call<T>(
        &self,
        provider: &'static str,
        call: impl Future<Output = ProviderResponse<T>> + Send,
    ) -> ProviderResponse<T> {
        if let Ok(response) = tokio::time::timeout(self.provider_timeout, call).await {
            response
        } else {
            debug!(provider, "Provider call timed out");
            ProviderResponse::Unavailable(ProviderUnavailable::Timeout(self.provider_timeout))
        }
    }
}

/// Rank-0 candidate, logging unavailability.
fn first<T>(provider: &'static str, response: ProviderResponse<T>) -> Option<T> {
    if let ProviderResponse::Unavailable(reason) = &response {
        warn!(provider, reason = %reason, "Provider unavailable, continuing");
    }
    response.into_first()
}

/// Rank-0 candidate if it carries a name.
fn first_found(
    provider: &'static str,
    response: ProviderResponse<ResolvedProduct>,
) -> Option<ResolvedProduct> {
    first(provider, response).filter(ResolvedProduct::is_found)
}
