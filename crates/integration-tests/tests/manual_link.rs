//! Manual link workflow tests: pending codes, one-time binding, and the
//! cache hit that follows.
//!
//! Run with: cargo test -p heatcheck-integration-tests

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use heatcheck_core::{ProductSource, ResolvedProduct};
use heatcheck_integration_tests::{
    MemoryCacheStore, ScriptedMarketplace, ScriptedRegistry, sneaker,
};
use heatcheck_intake::providers::ProviderUnavailable;
use heatcheck_intake::routes::scan::{
    LinkRequest, ResolveRequest, ScanResponse, SearchQuery, link_code, resolve_code,
    search_candidates,
};
use heatcheck_intake::{
    CacheStore, LinkError, ManualLinkWorkflow, Resolver, ScanPipeline, SearchError, Trust,
};

const STYLE_CODE: &str = "DH6927-111";

type TestPipeline =
    ScanPipeline<Arc<MemoryCacheStore>, Arc<ScriptedRegistry>, Arc<ScriptedMarketplace>>;

fn pipeline_with(
    marketplace: ScriptedMarketplace,
) -> (TestPipeline, Arc<MemoryCacheStore>, Arc<ScriptedMarketplace>) {
    let cache = Arc::new(MemoryCacheStore::default());
    let marketplace = Arc::new(marketplace);
    let resolver = Resolver::new(
        Arc::clone(&cache),
        Arc::new(ScriptedRegistry::default()),
        Arc::clone(&marketplace),
    );
    (ScanPipeline::new(resolver), cache, marketplace)
}

fn aj1() -> ResolvedProduct {
    sneaker("kd-aj1-chicago", "Air Jordan 1 Retro High OG 'Chicago'", "DZ5485-612")
}

fn search_pipeline() -> (TestPipeline, Arc<MemoryCacheStore>, Arc<ScriptedMarketplace>) {
    pipeline_with(ScriptedMarketplace::default().with_results("jordan 1 chicago", vec![aj1()]))
}

// ============================================================================
// End-to-end link flow
// ============================================================================

#[tokio::test]
async fn test_unresolved_then_linked_then_cache_hit() {
    let (pipeline, cache, _) = search_pipeline();

    let resolution = pipeline.resolve(STYLE_CODE).await.unwrap();
    assert!(resolution.product().is_none());
    assert_eq!(pipeline.links().pending_codes(), vec![STYLE_CODE.to_string()]);

    let candidates = pipeline.search("jordan 1 chicago").await.unwrap();
    let chosen = candidates.first().unwrap();

    let outcome = pipeline.link_manually(STYLE_CODE, chosen).await.unwrap();
    assert!(outcome.newly_linked);
    assert_eq!(outcome.product.source, ProductSource::Manual);
    assert!(!pipeline.links().is_pending(STYLE_CODE));

    let entry = cache.entry(STYLE_CODE).unwrap();
    assert_eq!(entry.origin, ProductSource::Manual);
    assert_eq!(entry.hit_count, 1);

    let rescan = pipeline.resolve(STYLE_CODE).await.unwrap();
    let product = rescan.product().unwrap();
    assert_eq!(product.source, ProductSource::Cache);
    assert_eq!(product.style_id.as_deref(), Some("DZ5485-612"));
    assert_eq!(cache.entry(STYLE_CODE).unwrap().hit_count, 2);
}

#[tokio::test]
async fn test_linking_twice_writes_once() {
    let (pipeline, cache, _) = search_pipeline();
    pipeline.resolve(STYLE_CODE).await.unwrap();

    let first = pipeline.link_manually(STYLE_CODE, &aj1()).await.unwrap();
    let second = pipeline.link_manually(STYLE_CODE, &aj1()).await.unwrap();

    assert!(first.newly_linked);
    assert!(!second.newly_linked);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.insert_count(), 1);
}

#[tokio::test]
async fn test_first_link_wins_against_later_selection() {
    let (pipeline, cache, _) = search_pipeline();

    pipeline.link_manually(STYLE_CODE, &aj1()).await.unwrap();
    let other = sneaker("kd-other", "Air Jordan 1 Mid", "554724-069");
    let outcome = pipeline.link_manually(STYLE_CODE, &other).await.unwrap();

    assert!(!outcome.newly_linked);
    assert_eq!(outcome.product.name, "Air Jordan 1 Retro High OG 'Chicago'");
    assert_eq!(outcome.product.style_id.as_deref(), Some("DZ5485-612"));
    assert_eq!(outcome.product.source, ProductSource::Cache);
    assert_eq!(
        cache.entry(STYLE_CODE).unwrap().product.name,
        "Air Jordan 1 Retro High OG 'Chicago'"
    );
}

#[tokio::test]
async fn test_link_over_registry_binding_returns_stored_record() {
    let (pipeline, cache, _) = search_pipeline();
    let registry_hit = aj1().with_source(ProductSource::BarcodeRegistry);
    cache.insert("012345678905", &registry_hit).await.unwrap();

    let other = sneaker("kd-other", "Air Jordan 1 Mid", "554724-069");
    let outcome = pipeline.link_manually("012345678905", &other).await.unwrap();

    assert!(!outcome.newly_linked);
    assert_eq!(outcome.product.identifier, "kd-aj1-chicago");
    assert_eq!(cache.entry("012345678905").unwrap().origin, ProductSource::BarcodeRegistry);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_links_leave_one_entry() {
    // The write delay keeps every link in flight at once.
    let cache = Arc::new(MemoryCacheStore::default().with_write_delay(Duration::from_millis(50)));
    let workflow = Arc::new(ManualLinkWorkflow::new(Arc::clone(&cache)));
    workflow.mark_pending(STYLE_CODE).await;

    let handles: Vec<_> = (0..8)
        .map(|n| {
            let workflow = Arc::clone(&workflow);
            let chosen = sneaker(&format!("kd-{n}"), &format!("Air Jordan 1 #{n}"), "DZ5485-612");
            tokio::spawn(async move { workflow.link(STYLE_CODE, &chosen).await })
        })
        .collect();
    let outcomes: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let bound = cache.entry(STYLE_CODE).unwrap().product;
    assert_eq!(outcomes.iter().filter(|o| o.newly_linked).count(), 1);
    assert!(outcomes.iter().all(|o| o.product.name == bound.name));
    assert_eq!(cache.insert_count(), 1);
    assert!(workflow.pending_codes().is_empty());
}

// ============================================================================
// Rejected selections
// ============================================================================

#[tokio::test]
async fn test_rejects_unnamed_selection() {
    let (pipeline, cache, _) = search_pipeline();
    pipeline.resolve(STYLE_CODE).await.unwrap();

    let blank = ResolvedProduct::new("   ", ProductSource::Marketplace);
    let err = pipeline.link_manually(STYLE_CODE, &blank).await.unwrap_err();

    assert!(matches!(err, LinkError::InvalidSelection(_)));
    assert!(cache.is_empty());
    assert!(pipeline.links().is_pending(STYLE_CODE));
}

#[tokio::test]
async fn test_rejects_cache_entry_selection() {
    let (pipeline, cache, _) = search_pipeline();

    let cached = aj1().with_source(ProductSource::Cache);
    let err = pipeline.link_manually(STYLE_CODE, &cached).await.unwrap_err();

    assert!(matches!(err, LinkError::InvalidSelection(_)));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_rejects_blank_pending_code() {
    let (pipeline, _, _) = search_pipeline();

    let err = pipeline.link_manually(" ", &aj1()).await.unwrap_err();
    assert!(matches!(err, LinkError::InvalidCode(_)));
}

// ============================================================================
// Manual search
// ============================================================================

#[tokio::test]
async fn test_search_is_memoised() {
    let (pipeline, _, marketplace) = search_pipeline();

    let first = pipeline.search("jordan 1 chicago").await.unwrap();
    let second = pipeline.search("  Jordan 1 CHICAGO ").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(marketplace.calls(), 1);
}

#[tokio::test]
async fn test_search_failure_is_not_memoised() {
    let (pipeline, _, marketplace) =
        pipeline_with(ScriptedMarketplace::default().failing(ProviderUnavailable::Unauthorized));

    let err = pipeline.search("jordan 1 chicago").await.unwrap_err();
    assert!(matches!(err, SearchError::Unavailable(ProviderUnavailable::Unauthorized)));
    pipeline.search("jordan 1 chicago").await.unwrap_err();
    assert_eq!(marketplace.calls(), 2);
}

#[tokio::test]
async fn test_slow_search_times_out() {
    let marketplace = Arc::new(
        ScriptedMarketplace::default()
            .with_results("jordan 1 chicago", vec![aj1()])
            .with_delay(Duration::from_secs(30)),
    );
    let resolver = Resolver::new(
        Arc::new(MemoryCacheStore::default()),
        Arc::new(ScriptedRegistry::default()),
        Arc::clone(&marketplace),
    )
    .with_provider_timeout(Duration::from_millis(50));
    let pipeline = ScanPipeline::new(resolver);

    let err = tokio::time::timeout(Duration::from_secs(5), pipeline.search("jordan 1 chicago"))
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, SearchError::Unavailable(ProviderUnavailable::Timeout(_))));
    assert_eq!(marketplace.calls(), 1);
}

#[tokio::test]
async fn test_blank_search_is_rejected() {
    let (pipeline, _, marketplace) = search_pipeline();

    let err = pipeline.search("  ").await.unwrap_err();
    assert!(matches!(err, SearchError::EmptyQuery));
    assert_eq!(marketplace.calls(), 0);
}

// ============================================================================
// Request handlers
// ============================================================================

#[tokio::test]
async fn test_handlers_drive_manual_link_flow() {
    let (pipeline, _, _) = search_pipeline();

    let response = resolve_code(
        &pipeline,
        &ResolveRequest {
            code: STYLE_CODE.to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(
        response,
        ScanResponse::Unresolved {
            pending_code: STYLE_CODE.to_string(),
            next: "manual_link",
        }
    );

    let results = search_candidates(
        &pipeline,
        &SearchQuery {
            q: "jordan 1 chicago".to_string(),
        },
    )
    .await
    .unwrap();
    let product = results.candidates.into_iter().next().unwrap();

    let response = link_code(
        &pipeline,
        &LinkRequest {
            pending_code: STYLE_CODE.to_string(),
            product,
        },
    )
    .await
    .unwrap();
    let ScanResponse::Linked { form, newly_linked } = response else {
        panic!("expected a linked response");
    };
    assert!(newly_linked);
    assert_eq!(form.source, ProductSource::Manual);
    assert_eq!(form.trust, Trust::Verified);
    assert_eq!(form.style_id.as_deref(), Some("DZ5485-612"));

    let response = resolve_code(
        &pipeline,
        &ResolveRequest {
            code: STYLE_CODE.to_string(),
        },
    )
    .await
    .unwrap();
    let ScanResponse::Resolved { form } = response else {
        panic!("expected a resolved response");
    };
    assert_eq!(form.source, ProductSource::Cache);
    assert_eq!(form.catalog_id.as_deref(), Some("kd-aj1-chicago"));
}
