//! Database operations for the scan cache.
//!
//! Hit accounting is a single `UPDATE ... RETURNING`, so concurrent scans of
//! one code serialize on the row lock and never lose an increment. Inserts use
//! `ON CONFLICT DO NOTHING` against the unique `code` column.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::{debug, instrument};

use heatcheck_core::{CacheEntry, ProductSource, ResolvedProduct, ScanCacheId};

use crate::cache::{CacheStore, InsertOutcome, StoreError, ensure_bindable};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for scan cache queries.
#[derive(Debug, sqlx::FromRow)]
struct ScanCacheRow {
    id: ScanCacheId,
    code: String,
    product: JsonValue,
    source: String,
    hit_count: i32,
    first_seen_at: DateTime<Utc>,
    last_seen_at: DateTime<Utc>,
}

impl TryFrom<ScanCacheRow> for CacheEntry {
    type Error = StoreError;

    fn try_from(row: ScanCacheRow) -> Result<Self, Self::Error> {
        let product: ResolvedProduct = serde_json::from_value(row.product)
            .map_err(|e| StoreError::Corrupt(format!("product for {}: {e}", row.code)))?;
        let origin = row
            .source
            .parse::<ProductSource>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        Ok(Self {
            id: row.id,
            product: product.with_source(ProductSource::Cache),
            origin,
            code: row.code,
            hit_count: row.hit_count,
            first_seen_at: row.first_seen_at,
            last_seen_at: row.last_seen_at,
        })
    }
}

// =============================================================================
// Store
// =============================================================================

/// `PostgreSQL`-backed scan cache.
#[derive(Debug, Clone)]
pub struct PgScanCache {
    pool: PgPool,
}

impl PgScanCache {
    /// Create a scan cache over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, code: &str) -> Result<Option<CacheEntry>, StoreError> {
        let row = sqlx::query_as::<_, ScanCacheRow>(
            r"
            SELECT id, code, product, source, hit_count, first_seen_at, last_seen_at
            FROM scan_cache
            WHERE code = $1
            ",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CacheEntry::try_from).transpose()
    }

    async fn lookup_and_count(&self, code: &str) -> Result<Option<CacheEntry>, StoreError> {
        let row = sqlx::query_as::<_, ScanCacheRow>(
            r"
            UPDATE scan_cache
            SET hit_count = hit_count + 1, last_seen_at = NOW()
            WHERE code = $1
            RETURNING id, code, product, source, hit_count, first_seen_at, last_seen_at
            ",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        let entry = row.map(CacheEntry::try_from).transpose()?;
        if let Some(entry) = &entry {
            debug!(id = %entry.id, hit_count = entry.hit_count, "Scan cache hit");
        }
        Ok(entry)
    }

    async fn insert_if_absent(
        &self,
        code: &str,
        product: &ResolvedProduct,
    ) -> Result<InsertOutcome, StoreError> {
        ensure_bindable(product)?;

        let inserted: Option<(ScanCacheId,)> = sqlx::query_as(
            r"
            INSERT INTO scan_cache (code, product, source, hit_count)
            VALUES ($1, $2, $3, 1)
            ON CONFLICT (code) DO NOTHING
            RETURNING id
            ",
        )
        .bind(code)
        .bind(Json(product))
        .bind(product.source.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(match inserted {
            Some((id,)) => {
                debug!(id = %id, source = %product.source, "Inserted scan cache entry");
                InsertOutcome::Inserted
            }
            None => InsertOutcome::AlreadyExists,
        })
    }
}

impl CacheStore for PgScanCache {
    #[instrument(skip(self))]
    async fn lookup(&self, code: &str) -> Result<Option<CacheEntry>, StoreError> {
        self.lookup_and_count(code).await
    }

    #[instrument(skip(self))]
    async fn peek(&self, code: &str) -> Result<Option<CacheEntry>, StoreError> {
        self.fetch(code).await
    }

    #[instrument(skip(self, product), fields(source = %product.source))]
    async fn insert(
        &self,
        code: &str,
        product: &ResolvedProduct,
    ) -> Result<InsertOutcome, StoreError> {
        self.insert_if_absent(code, product).await
    }
}
