//! Scan workflow route handlers.
//!
//! Handlers are thin wrappers over generic functions so the request logic can
//! be exercised against any scan pipeline.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use heatcheck_core::ResolvedProduct;

use crate::cache::CacheStore;
use crate::error::AppError;
use crate::intake_form::IntakeForm;
use crate::pipeline::ScanPipeline;
use crate::providers::{BarcodeRegistry, MarketplaceCatalog};
use crate::resolution::Resolution;
use crate::state::AppState;

/// Body of a resolve request.
#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub code: String,
}

/// Query parameters for a manual search.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

/// Body of a manual link request.
#[derive(Debug, Deserialize)]
pub struct LinkRequest {
    pub pending_code: String,
    pub product: ResolvedProduct,
}

/// Outcome of a scan workflow request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanResponse {
    /// The code resolved; the form is pre-filled.
    Resolved { form: IntakeForm },
    /// Nothing matched; the client should offer the manual link flow.
    Unresolved {
        pending_code: String,
        next: &'static str,
    },
    /// A pending code was linked; the form is pre-filled.
    Linked { form: IntakeForm, newly_linked: bool },
}

/// Manual search results.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub candidates: Vec<ResolvedProduct>,
}

/// Pending codes awaiting a manual link.
#[derive(Debug, Clone, Serialize)]
pub struct PendingResponse {
    pub pending_codes: Vec<String>,
}

/// Resolve a scanned code.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for blank codes and `AppError::Store` when
/// the scan cache is unavailable.
pub async fn resolve_code<C, R, M>(
    pipeline: &ScanPipeline<C, R, M>,
    request: &ResolveRequest,
) -> Result<ScanResponse, AppError>
where
    C: CacheStore + Clone,
    R: BarcodeRegistry,
    M: MarketplaceCatalog + Clone,
{
    Ok(match pipeline.resolve(&request.code).await? {
        Resolution::Resolved(product) => ScanResponse::Resolved {
            form: IntakeForm::from_resolved(&product),
        },
        Resolution::Unresolved { pending_code } => ScanResponse::Unresolved {
            pending_code,
            next: "manual_link",
        },
    })
}

/// Run an operator search.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for blank queries and
/// `AppError::Marketplace` when the catalog is unavailable.
pub async fn search_candidates<C, R, M>(
    pipeline: &ScanPipeline<C, R, M>,
    query: &SearchQuery,
) -> Result<SearchResponse, AppError>
where
    C: CacheStore + Clone,
    R: BarcodeRegistry,
    M: MarketplaceCatalog + Clone,
{
    let candidates = pipeline.search(&query.q).await?;
    Ok(SearchResponse {
        query: query.q.trim().to_string(),
        candidates: candidates.as_ref().clone(),
    })
}

/// Link a pending code to an operator-chosen record.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for unusable selections and
/// `AppError::Store` when the scan cache is unavailable.
pub async fn link_code<C, R, M>(
    pipeline: &ScanPipeline<C, R, M>,
    request: &LinkRequest,
) -> Result<ScanResponse, AppError>
where
    C: CacheStore + Clone,
    R: BarcodeRegistry,
    M: MarketplaceCatalog + Clone,
{
    let outcome = pipeline
        .link_manually(&request.pending_code, &request.product)
        .await?;
    Ok(ScanResponse::Linked {
        form: IntakeForm::from_resolved(&outcome.product),
        newly_linked: outcome.newly_linked,
    })
}

/// `POST /api/scan/resolve`
#[instrument(skip(state))]
pub async fn resolve(
    State(state): State<AppState>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<ScanResponse>, AppError> {
    resolve_code(state.pipeline(), &request).await.map(Json)
}

/// `GET /api/scan/search?q=`
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    search_candidates(state.pipeline(), &query).await.map(Json)
}

/// `POST /api/scan/link`
#[instrument(skip(state, request), fields(pending_code = %request.pending_code))]
pub async fn link(
    State(state): State<AppState>,
    Json(request): Json<LinkRequest>,
) -> Result<Json<ScanResponse>, AppError> {
    link_code(state.pipeline(), &request).await.map(Json)
}

/// `GET /api/scan/pending`
#[allow(clippy::unused_async)]
pub async fn pending(State(state): State<AppState>) -> Json<PendingResponse> {
    Json(PendingResponse {
        pending_codes: state.pipeline().links().pending_codes(),
    })
}
