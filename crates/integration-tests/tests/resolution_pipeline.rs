//! Resolution pipeline tests over the in-memory scan cache and scripted
//! providers.
//!
//! Run with: cargo test -p heatcheck-integration-tests

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use rust_decimal::Decimal;

use heatcheck_core::ProductSource;
use heatcheck_integration_tests::{
    FailingStore, MemoryCacheStore, ScriptedMarketplace, ScriptedRegistry, sneaker,
};
use heatcheck_intake::providers::ProviderUnavailable;
use heatcheck_intake::{Resolution, ResolveError, Resolver, ScanPipeline, StoreError};

const AJ4_BARCODE: &str = "012345678905";
const AJ4_TITLE: &str = "Air Jordan 4 Retro";

type TestPipeline =
    ScanPipeline<Arc<MemoryCacheStore>, Arc<ScriptedRegistry>, Arc<ScriptedMarketplace>>;

struct Harness {
    pipeline: Arc<TestPipeline>,
    cache: Arc<MemoryCacheStore>,
    registry: Arc<ScriptedRegistry>,
    marketplace: Arc<ScriptedMarketplace>,
}

fn harness(registry: ScriptedRegistry, marketplace: ScriptedMarketplace) -> Harness {
    harness_with_timeout(registry, marketplace, Duration::from_secs(8))
}

fn harness_with_timeout(
    registry: ScriptedRegistry,
    marketplace: ScriptedMarketplace,
    timeout: Duration,
) -> Harness {
    let cache = Arc::new(MemoryCacheStore::default());
    let registry = Arc::new(registry);
    let marketplace = Arc::new(marketplace);
    let resolver = Resolver::new(
        Arc::clone(&cache),
        Arc::clone(&registry),
        Arc::clone(&marketplace),
    )
    .with_provider_timeout(timeout);

    Harness {
        pipeline: Arc::new(ScanPipeline::new(resolver)),
        cache,
        registry,
        marketplace,
    }
}

fn bred() -> heatcheck_core::ResolvedProduct {
    sneaker("kd-aj4-bred", "Air Jordan 4 Retro 'Bred'", "308497-060")
        .with_retail_price(Some(Decimal::new(210, 0)))
}

fn aj4_harness() -> Harness {
    harness(
        ScriptedRegistry::default().with_title(AJ4_BARCODE, AJ4_TITLE),
        ScriptedMarketplace::default().with_results(AJ4_TITLE, vec![bred()]),
    )
}

/// Run `scans` resolutions of one code on separate tasks.
async fn scan_concurrently(
    pipeline: &Arc<TestPipeline>,
    code: &'static str,
    scans: usize,
) -> Vec<Resolution> {
    let handles: Vec<_> = (0..scans)
        .map(|_| {
            let pipeline = Arc::clone(pipeline);
            tokio::spawn(async move { pipeline.resolve(code).await })
        })
        .collect();

    join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect()
}

// ============================================================================
// Barcode resolution and caching
// ============================================================================

#[tokio::test]
async fn test_barcode_resolves_via_registry_and_is_cached() {
    let h = aj4_harness();

    let resolution = h.pipeline.resolve(AJ4_BARCODE).await.unwrap();
    let product = resolution.product().unwrap();
    assert_eq!(product.name, "Air Jordan 4 Retro 'Bred'");
    assert_eq!(product.source, ProductSource::BarcodeRegistry);
    assert_eq!(product.retail_price, Some(Decimal::new(210, 0)));

    let entry = h.cache.entry(AJ4_BARCODE).unwrap();
    assert_eq!(entry.origin, ProductSource::BarcodeRegistry);
    assert_eq!(entry.hit_count, 1);
    assert_eq!(entry.product.style_id.as_deref(), Some("308497-060"));
    assert_eq!(h.marketplace.queries(), vec![AJ4_TITLE.to_string()]);
}

#[tokio::test]
async fn test_rescan_is_cache_hit_without_provider_calls() {
    let h = aj4_harness();
    h.pipeline.resolve(AJ4_BARCODE).await.unwrap();

    let resolution = h.pipeline.resolve(AJ4_BARCODE).await.unwrap();
    let product = resolution.product().unwrap();
    assert_eq!(product.source, ProductSource::Cache);
    assert_eq!(product.name, "Air Jordan 4 Retro 'Bred'");
    assert_eq!(product.retail_price, Some(Decimal::new(210, 0)));

    assert_eq!(h.cache.entry(AJ4_BARCODE).unwrap().hit_count, 2);
    assert_eq!(h.registry.calls(), 1);
    assert_eq!(h.marketplace.calls(), 1);
    assert_eq!(h.cache.insert_count(), 1);
}

#[tokio::test]
async fn test_cache_key_is_original_barcode() {
    let h = aj4_harness();
    h.pipeline.resolve("  012345678905 ").await.unwrap();

    assert!(h.cache.entry(AJ4_BARCODE).is_some());
    assert!(h.cache.entry(AJ4_TITLE).is_none());
    assert!(h.cache.entry("kd-aj4-bred").is_none());
    assert_eq!(h.cache.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rescans_count_every_hit() {
    let h = aj4_harness();
    h.pipeline.resolve(AJ4_BARCODE).await.unwrap();

    for resolution in scan_concurrently(&h.pipeline, AJ4_BARCODE, 10).await {
        assert_eq!(resolution.product().unwrap().source, ProductSource::Cache);
    }

    assert_eq!(h.cache.entry(AJ4_BARCODE).unwrap().hit_count, 11);
    assert_eq!(h.cache.insert_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_scans_leave_one_entry() {
    // The registry delay holds every scan past its cache miss, so all five
    // race to insert the same code.
    let h = harness(
        ScriptedRegistry::default()
            .with_title(AJ4_BARCODE, AJ4_TITLE)
            .with_delay(Duration::from_millis(100)),
        ScriptedMarketplace::default().with_results(AJ4_TITLE, vec![bred()]),
    );

    for resolution in scan_concurrently(&h.pipeline, AJ4_BARCODE, 5).await {
        let product = resolution.product().unwrap();
        assert_eq!(product.source, ProductSource::BarcodeRegistry);
        assert_eq!(product.name, "Air Jordan 4 Retro 'Bred'");
    }

    assert_eq!(h.registry.calls(), 5);
    assert_eq!(h.cache.insert_count(), 1);
    assert_eq!(h.cache.len(), 1);
    assert_eq!(h.cache.entry(AJ4_BARCODE).unwrap().hit_count, 1);
}

#[tokio::test]
async fn test_dropped_resolution_leaves_cache_untouched() {
    let h = harness(
        ScriptedRegistry::default().with_title(AJ4_BARCODE, AJ4_TITLE),
        ScriptedMarketplace::default()
            .with_results(AJ4_TITLE, vec![bred()])
            .with_delay(Duration::from_secs(30)),
    );

    let abandoned =
        tokio::time::timeout(Duration::from_millis(50), h.pipeline.resolve(AJ4_BARCODE)).await;
    assert!(abandoned.is_err());

    assert_eq!(h.marketplace.queries(), vec![AJ4_TITLE.to_string()]);
    assert!(h.cache.is_empty());
    assert_eq!(h.cache.insert_count(), 0);
    assert!(!h.pipeline.links().is_pending(AJ4_BARCODE));
}

// ============================================================================
// Marketplace fallback
// ============================================================================

#[tokio::test]
async fn test_style_code_unresolved_writes_nothing() {
    let h = aj4_harness();

    let resolution = h.pipeline.resolve("DH6927-111").await.unwrap();
    assert_eq!(
        resolution,
        Resolution::Unresolved {
            pending_code: "DH6927-111".to_string()
        }
    );
    assert!(h.cache.is_empty());
    assert_eq!(h.registry.calls(), 0);
    assert_eq!(h.marketplace.queries(), vec!["DH6927-111".to_string()]);
    assert!(h.pipeline.links().is_pending("DH6927-111"));
}

#[tokio::test]
async fn test_code_that_later_resolves_is_no_longer_pending() {
    let panda = sneaker("kd-panda", "Dunk Low 'Panda'", "DD1391-100");
    let h = harness(
        ScriptedRegistry::default(),
        ScriptedMarketplace::default()
            .with_results("DD1391-100", vec![panda])
            .failing_first(ProviderUnavailable::Http("connection reset".to_string()), 1),
    );

    let first = h.pipeline.resolve("DD1391-100").await.unwrap();
    assert!(matches!(first, Resolution::Unresolved { .. }));
    assert!(h.pipeline.links().is_pending("DD1391-100"));

    let second = h.pipeline.resolve(" DD1391-100 ").await.unwrap();
    assert_eq!(second.product().unwrap().source, ProductSource::Marketplace);
    assert!(!h.pipeline.links().is_pending("DD1391-100"));
    assert!(h.pipeline.links().pending_codes().is_empty());
}

#[tokio::test]
async fn test_marketplace_match_is_not_cached() {
    let panda = sneaker("kd-panda", "Dunk Low 'Panda'", "DD1391-100");
    let h = harness(
        ScriptedRegistry::default(),
        ScriptedMarketplace::default().with_results("DD1391-100", vec![panda]),
    );

    let resolution = h.pipeline.resolve("DD1391-100").await.unwrap();
    let product = resolution.product().unwrap();
    assert_eq!(product.source, ProductSource::Marketplace);
    assert_eq!(product.name, "Dunk Low 'Panda'");
    assert!(h.cache.is_empty());

    // Free text is searched again every time.
    h.pipeline.resolve("DD1391-100").await.unwrap();
    assert_eq!(h.marketplace.calls(), 2);
}

#[tokio::test]
async fn test_registry_miss_falls_back_to_raw_code_search() {
    let h = harness(
        ScriptedRegistry::default(),
        ScriptedMarketplace::default()
            .with_results(AJ4_BARCODE, vec![sneaker("kd-1", "Air Jordan 4 Retro 'Bred'", "308497-060")]),
    );

    let resolution = h.pipeline.resolve(AJ4_BARCODE).await.unwrap();
    assert_eq!(
        resolution.product().unwrap().source,
        ProductSource::Marketplace
    );
    assert_eq!(h.registry.calls(), 1);
    assert_eq!(h.marketplace.queries(), vec![AJ4_BARCODE.to_string()]);
    assert!(h.cache.is_empty());
}

#[tokio::test]
async fn test_registry_title_without_marketplace_hit_is_not_cached() {
    let h = harness(
        ScriptedRegistry::default().with_title(AJ4_BARCODE, AJ4_TITLE),
        ScriptedMarketplace::default(),
    );

    let resolution = h.pipeline.resolve(AJ4_BARCODE).await.unwrap();
    assert!(matches!(resolution, Resolution::Unresolved { .. }));
    assert_eq!(
        h.marketplace.queries(),
        vec![AJ4_TITLE.to_string(), AJ4_BARCODE.to_string()]
    );
    assert!(h.cache.is_empty());
}

#[tokio::test]
async fn test_unnamed_candidates_are_skipped() {
    let h = harness(
        ScriptedRegistry::default().with_title(AJ4_BARCODE, AJ4_TITLE),
        ScriptedMarketplace::default().with_results(AJ4_TITLE, vec![sneaker("kd-0", "  ", "")]),
    );

    let resolution = h.pipeline.resolve(AJ4_BARCODE).await.unwrap();
    assert!(matches!(resolution, Resolution::Unresolved { .. }));
    assert!(h.cache.is_empty());
}

// ============================================================================
// Failure handling
// ============================================================================

#[tokio::test]
async fn test_registry_unavailable_continues_to_marketplace() {
    let h = harness(
        ScriptedRegistry::default().failing(ProviderUnavailable::RateLimited(60)),
        ScriptedMarketplace::default()
            .with_results(AJ4_BARCODE, vec![sneaker("kd-1", "Air Jordan 4 Retro", "308497-060")]),
    );

    let resolution = h.pipeline.resolve(AJ4_BARCODE).await.unwrap();
    assert_eq!(
        resolution.product().unwrap().source,
        ProductSource::Marketplace
    );
    assert!(h.cache.is_empty());
}

#[tokio::test]
async fn test_marketplace_unavailable_ends_unresolved() {
    let h = harness(
        ScriptedRegistry::default().with_title(AJ4_BARCODE, AJ4_TITLE),
        ScriptedMarketplace::default().failing(ProviderUnavailable::Http("connection reset".to_string())),
    );

    let resolution = h.pipeline.resolve(AJ4_BARCODE).await.unwrap();
    assert_eq!(
        resolution,
        Resolution::Unresolved {
            pending_code: AJ4_BARCODE.to_string()
        }
    );
    assert!(h.cache.is_empty());
}

#[tokio::test]
async fn test_slow_registry_times_out() {
    let h = harness_with_timeout(
        ScriptedRegistry::default()
            .with_title(AJ4_BARCODE, AJ4_TITLE)
            .with_delay(Duration::from_secs(30)),
        ScriptedMarketplace::default()
            .with_results(AJ4_TITLE, vec![bred()])
            .with_results(AJ4_BARCODE, vec![sneaker("kd-1", "Air Jordan 4 Retro", "")]),
        Duration::from_millis(50),
    );

    let resolution = tokio::time::timeout(Duration::from_secs(5), h.pipeline.resolve(AJ4_BARCODE))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        resolution.product().unwrap().source,
        ProductSource::Marketplace
    );
    assert_eq!(h.marketplace.queries(), vec![AJ4_BARCODE.to_string()]);
    assert!(h.cache.is_empty());
}

#[tokio::test]
async fn test_store_failure_aborts_resolution() {
    let registry = ScriptedRegistry::default().with_title(AJ4_BARCODE, AJ4_TITLE);
    let marketplace = Arc::new(ScriptedMarketplace::default().with_results(AJ4_TITLE, vec![bred()]));
    let resolver = Resolver::new(FailingStore, registry, Arc::clone(&marketplace));
    let pipeline = ScanPipeline::new(resolver);

    let err = pipeline.resolve(AJ4_BARCODE).await.unwrap_err();
    assert!(matches!(
        err,
        ResolveError::StoreUnavailable(StoreError::Unavailable(_))
    ));
    assert_eq!(marketplace.calls(), 0);
}

#[tokio::test]
async fn test_blank_code_is_rejected() {
    let h = aj4_harness();

    let err = h.pipeline.resolve("   ").await.unwrap_err();
    assert!(matches!(err, ResolveError::InvalidCode(_)));
    assert_eq!(h.registry.calls(), 0);
    assert_eq!(h.marketplace.calls(), 0);
}
