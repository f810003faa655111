//! Product lookup providers.
//!
//! Two capabilities sit behind a uniform contract:
//!
//! - [`BarcodeRegistry`] - barcode → product titles (UPCitemdb)
//! - [`MarketplaceCatalog`] - free text → ranked catalog candidates (KicksDB)
//!
//! Every call answers with a [`ProviderResponse`]: either the (possibly empty)
//! candidates or the reason the provider could not answer. Zero results is a
//! successful, empty `Found`.

pub mod kicksdb;
pub mod upcitemdb;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use heatcheck_core::{Barcode, ResolvedProduct};
use thiserror::Error;

pub use kicksdb::KicksDbClient;
pub use upcitemdb::UpcItemDbClient;

/// Why a provider could not answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderUnavailable {
    /// Call exceeded the provider timeout.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Rate limited by the provider.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Credentials rejected.
    #[error("unauthorized")]
    Unauthorized,

    /// Provider answered with something we could not interpret.
    #[error("bad response: {0}")]
    BadResponse(String),
}

impl From<reqwest::Error> for ProviderUnavailable {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::BadResponse(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}

/// Outcome of a single provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderResponse<T> {
    /// Candidates in provider rank order (possibly empty).
    Found(Vec<T>),
    /// The provider could not answer.
    Unavailable(ProviderUnavailable),
}

impl<T> ProviderResponse<T> {
    /// A successful response with no candidates.
    #[must_use]
    pub const fn empty() -> Self {
        Self::Found(Vec::new())
    }

    /// The rank-0 candidate, treating unavailability as no candidate.
    #[must_use]
    pub fn into_first(self) -> Option<T> {
        match self {
            Self::Found(candidates) => candidates.into_iter().next(),
            Self::Unavailable(_) => None,
        }
    }
}

impl<T> From<Result<Vec<T>, ProviderUnavailable>> for ProviderResponse<T> {
    fn from(result: Result<Vec<T>, ProviderUnavailable>) -> Self {
        match result {
            Ok(candidates) => Self::Found(candidates),
            Err(reason) => Self::Unavailable(reason),
        }
    }
}

/// Barcode → product title lookup.
///
/// Takes a [`Barcode`], so free text can never reach the registry.
pub trait BarcodeRegistry: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &'static str;

    /// Titles registered for the barcode, best first.
    fn lookup(&self, barcode: &Barcode) -> impl Future<Output = ProviderResponse<String>> + Send;
}

/// Free-text catalog search.
pub trait MarketplaceCatalog: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &'static str;

    /// Candidates for the query in provider rank order.
    ///
    /// Candidates carry `source = MARKETPLACE`; the caller re-tags them.
    fn search(&self, query: &str) -> impl Future<Output = ProviderResponse<ResolvedProduct>> + Send;
}

impl<T: BarcodeRegistry> BarcodeRegistry for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn lookup(&self, barcode: &Barcode) -> impl Future<Output = ProviderResponse<String>> + Send {
        (**self).lookup(barcode)
    }
}

impl<T: MarketplaceCatalog> MarketplaceCatalog for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn search(&self, query: &str) -> impl Future<Output = ProviderResponse<ResolvedProduct>> + Send {
        (**self).search(query)
    }
}

/// Map a non-success HTTP status to a provider failure.
///
/// Shared by the concrete clients; `None` means the status is handled by the
/// caller (success or client-specific codes).
pub(crate) fn status_failure(response: &reqwest::Response) -> Option<ProviderUnavailable> {
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);
        return Some(ProviderUnavailable::RateLimited(retry_after));
    }

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Some(ProviderUnavailable::Unauthorized);
    }

    if status.is_server_error() {
        return Some(ProviderUnavailable::Http(format!("server error {status}")));
    }

    None
}
