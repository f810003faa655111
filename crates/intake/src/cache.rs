//! Scan cache contract.
//!
//! The scan cache durably binds a scanned code to the product it resolved to,
//! so repeat scans of the same physical item skip every provider. The store
//! owns the entry lifecycle: callers can look up (which counts a hit) and
//! insert, but never update or delete.
//!
//! Implementations must make `lookup` increment atomically per code and make
//! concurrent `insert`s for one code leave exactly one row, with the losers
//! observing [`InsertOutcome::AlreadyExists`].

use std::future::Future;

use heatcheck_core::{CacheEntry, ProductSource, ResolvedProduct};
use thiserror::Error;

/// Errors from the scan cache backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backing store could not be reached or rejected the query.
    #[error("scan cache unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be decoded.
    #[error("scan cache entry corrupt: {0}")]
    Corrupt(String),

    /// The product may not be bound: it has no name, or its source is not
    /// `BARCODE_REGISTRY` or `MANUAL`.
    #[error("product from {0} cannot be cached")]
    NotCacheable(ProductSource),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Result of an insert attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new binding was written.
    Inserted,
    /// The code was already bound; nothing was written.
    AlreadyExists,
}

/// Durable code → product store.
pub trait CacheStore: Send + Sync {
    /// Look up a code, counting a hit if found.
    ///
    /// On a hit the returned entry already reflects the increment and its
    /// product carries `source = CACHE`.
    fn lookup(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<Option<CacheEntry>, StoreError>> + Send;

    /// Read the entry bound to a code without counting a hit.
    fn peek(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<Option<CacheEntry>, StoreError>> + Send;

    /// Bind a code to a product if it is not bound yet.
    ///
    /// Products rejected by [`ensure_bindable`] fail with
    /// [`StoreError::NotCacheable`] before touching storage.
    fn insert(
        &self,
        code: &str,
        product: &ResolvedProduct,
    ) -> impl Future<Output = Result<InsertOutcome, StoreError>> + Send;
}

/// Check that a product may be written under a scanned code.
///
/// Only barcode-registry resolutions and manual links are bound. Cache hits
/// are never re-cached and free-text marketplace matches are not stable keys.
///
/// # Errors
///
/// Returns `StoreError::NotCacheable` for any other product.
pub fn ensure_bindable(product: &ResolvedProduct) -> Result<(), StoreError> {
    let bindable_source = matches!(
        product.source,
        ProductSource::BarcodeRegistry | ProductSource::Manual
    );
    if bindable_source && product.is_cacheable() {
        Ok(())
    } else {
        Err(StoreError::NotCacheable(product.source))
    }
}

impl<T: CacheStore> CacheStore for std::sync::Arc<T> {
    fn lookup(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<Option<CacheEntry>, StoreError>> + Send {
        (**self).lookup(code)
    }

    fn peek(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<Option<CacheEntry>, StoreError>> + Send {
        (**self).peek(code)
    }

    fn insert(
        &self,
        code: &str,
        product: &ResolvedProduct,
    ) -> impl Future<Output = Result<InsertOutcome, StoreError>> + Send {
        (**self).insert(code, product)
    }
}
