//! Persisted scan cache bindings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ProductSource, ResolvedProduct, ScanCacheId};

/// A durable binding from a scanned code to the product it resolved to.
///
/// Entries are created on the first successful barcode resolution or manual
/// link and are never deleted by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Row ID.
    pub id: ScanCacheId,
    /// The original scanned code (cache key).
    pub code: String,
    /// The product bound to the code. `source` is always `CACHE` on lookup.
    pub product: ResolvedProduct,
    /// Source that produced the binding (`BARCODE_REGISTRY` or `MANUAL`).
    pub origin: ProductSource,
    /// Number of resolutions served by this entry, including the one that created it.
    pub hit_count: i32,
    /// When the binding was created.
    pub first_seen_at: DateTime<Utc>,
    /// When the binding was last resolved.
    pub last_seen_at: DateTime<Utc>,
}
