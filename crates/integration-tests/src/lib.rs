//! Integration tests for Heatcheck.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory pipeline tests
//! cargo test -p heatcheck-integration-tests
//!
//! # Include the PostgreSQL scan cache tests
//! DATABASE_URL=postgres://... cargo test -p heatcheck-integration-tests -- --ignored
//! ```
//!
//! This library holds the test doubles shared by the test files: an
//! in-memory scan cache and scripted providers.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use heatcheck_core::{Barcode, CacheEntry, ProductSource, ResolvedProduct, ScanCacheId};
use heatcheck_intake::cache::ensure_bindable;
use heatcheck_intake::providers::{
    BarcodeRegistry, MarketplaceCatalog, ProviderResponse, ProviderUnavailable,
};
use heatcheck_intake::{CacheStore, InsertOutcome, StoreError};

/// In-memory scan cache with the same guarantees as the `PostgreSQL` store.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
    next_id: AtomicI32,
    inserts: AtomicUsize,
    write_delay: Option<Duration>,
}

impl MemoryCacheStore {
    /// Sleep before every insert so concurrent writers overlap.
    #[must_use]
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    /// Number of rows written.
    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    /// Entry for a code, without counting a hit.
    pub fn entry(&self, code: &str) -> Option<CacheEntry> {
        self.entries.lock().ok()?.get(code).cloned()
    }

    /// Number of bound codes.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or_default()
    }

    /// Whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn locked(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, CacheEntry>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".to_string()))
    }
}

impl CacheStore for MemoryCacheStore {
    async fn lookup(&self, code: &str) -> Result<Option<CacheEntry>, StoreError> {
        let mut entries = self.locked()?;
        Ok(entries.get_mut(code).map(|entry| {
            entry.hit_count += 1;
            entry.last_seen_at = Utc::now();
            let mut hit = entry.clone();
            hit.product = hit.product.with_source(ProductSource::Cache);
            hit
        }))
    }

    async fn peek(&self, code: &str) -> Result<Option<CacheEntry>, StoreError> {
        Ok(self.locked()?.get(code).cloned())
    }

    async fn insert(
        &self,
        code: &str,
        product: &ResolvedProduct,
    ) -> Result<InsertOutcome, StoreError> {
        ensure_bindable(product)?;
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        let mut entries = self.locked()?;
        if entries.contains_key(code) {
            return Ok(InsertOutcome::AlreadyExists);
        }

        let now = Utc::now();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        entries.insert(
            code.to_string(),
            CacheEntry {
                id: ScanCacheId::new(id),
                code: code.to_string(),
                product: product.clone(),
                origin: product.source,
                hit_count: 1,
                first_seen_at: now,
                last_seen_at: now,
            },
        );
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(InsertOutcome::Inserted)
    }
}

/// Scan cache whose backing store is always down.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingStore;

impl CacheStore for FailingStore {
    async fn lookup(&self, _code: &str) -> Result<Option<CacheEntry>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn peek(&self, _code: &str) -> Result<Option<CacheEntry>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn insert(
        &self,
        _code: &str,
        _product: &ResolvedProduct,
    ) -> Result<InsertOutcome, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

/// Barcode registry answering from a fixed table.
#[derive(Debug, Default)]
pub struct ScriptedRegistry {
    titles: HashMap<String, Vec<String>>,
    failure: Option<ProviderUnavailable>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedRegistry {
    /// Register a title for a barcode.
    #[must_use]
    pub fn with_title(mut self, barcode: &str, title: &str) -> Self {
        self.titles
            .entry(barcode.to_string())
            .or_default()
            .push(title.to_string());
        self
    }

    /// Fail every lookup.
    #[must_use]
    pub fn failing(mut self, reason: ProviderUnavailable) -> Self {
        self.failure = Some(reason);
        self
    }

    /// Sleep before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of lookups received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl BarcodeRegistry for ScriptedRegistry {
    fn name(&self) -> &'static str {
        "scripted-registry"
    }

    async fn lookup(&self, barcode: &Barcode) -> ProviderResponse<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = &self.failure {
            return ProviderResponse::Unavailable(reason.clone());
        }
        ProviderResponse::Found(
            self.titles
                .get(barcode.as_str())
                .cloned()
                .unwrap_or_default(),
        )
    }
}

/// Marketplace catalog answering from a fixed table keyed by exact query.
#[derive(Debug, Default)]
pub struct ScriptedMarketplace {
    results: HashMap<String, Vec<ResolvedProduct>>,
    failure: Option<ProviderUnavailable>,
    failing_calls: Option<usize>,
    delay: Option<Duration>,
    queries: Mutex<Vec<String>>,
}

impl ScriptedMarketplace {
    /// Register candidates for a query.
    #[must_use]
    pub fn with_results(mut self, query: &str, candidates: Vec<ResolvedProduct>) -> Self {
        self.results.insert(query.to_string(), candidates);
        self
    }

    /// Fail every search.
    #[must_use]
    pub fn failing(mut self, reason: ProviderUnavailable) -> Self {
        self.failure = Some(reason);
        self
    }

    /// Fail only the first `calls` searches, then answer normally.
    #[must_use]
    pub fn failing_first(mut self, reason: ProviderUnavailable, calls: usize) -> Self {
        self.failure = Some(reason);
        self.failing_calls = Some(calls);
        self
    }

    /// Sleep before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queries received, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }

    /// Number of searches received.
    pub fn calls(&self) -> usize {
        self.queries.lock().map(|q| q.len()).unwrap_or_default()
    }
}

impl MarketplaceCatalog for ScriptedMarketplace {
    fn name(&self) -> &'static str {
        "scripted-marketplace"
    }

    async fn search(&self, query: &str) -> ProviderResponse<ResolvedProduct> {
        let earlier_calls = self
            .queries
            .lock()
            .map(|mut queries| {
                queries.push(query.to_string());
                queries.len() - 1
            })
            .unwrap_or_default();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = &self.failure
            && self.failing_calls.is_none_or(|calls| earlier_calls < calls)
        {
            return ProviderResponse::Unavailable(reason.clone());
        }
        ProviderResponse::Found(self.results.get(query).cloned().unwrap_or_default())
    }
}

/// A marketplace candidate with the fields a catalog hit usually carries.
pub fn sneaker(identifier: &str, name: &str, style_id: &str) -> ResolvedProduct {
    let mut product = ResolvedProduct::new(name, ProductSource::Marketplace);
    product.identifier = identifier.to_string();
    product.style_id = Some(style_id.to_string());
    product
}
