//! KicksDB marketplace catalog client.
//!
//! Searches the StockX-backed sneaker catalog by free text (shoe name, style
//! ID or a registry title) and maps each hit to a [`ResolvedProduct`].
//!
//! # API Reference
//!
//! - Search: `GET {base}/v3/stockx/products?query=<text>&limit=<n>`
//! - Authentication: `Authorization: Bearer <key>`
//!
//! Ranking is the provider's; candidates are returned in the order received.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, instrument};
use url::Url;

use heatcheck_core::{ProductSource, ResolvedProduct};

use super::{MarketplaceCatalog, ProviderResponse, ProviderUnavailable, status_failure};
use crate::config::KicksDbConfig;

/// Candidates requested per search.
const SEARCH_LIMIT: u32 = 10;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<CatalogProduct>,
}

#[derive(Debug, Deserialize)]
struct CatalogProduct {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    brand: Option<String>,
    #[serde(default)]
    sku: Option<String>,
    #[serde(default)]
    colorway: Option<String>,
    #[serde(default)]
    retail_price: Option<JsonValue>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    gallery: Vec<String>,
    #[serde(default)]
    traits: Vec<CatalogTrait>,
}

#[derive(Debug, Deserialize)]
struct CatalogTrait {
    #[serde(rename = "trait")]
    name: String,
    #[serde(default)]
    value: Option<JsonValue>,
}

impl CatalogProduct {
    fn trait_value(&self, name: &str) -> Option<&JsonValue> {
        self.traits
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .and_then(|t| t.value.as_ref())
    }

    /// Convert to a candidate record; `None` if the hit has no title.
    fn into_candidate(self) -> Option<ResolvedProduct> {
        let name = self.title.as_deref().map(str::trim).unwrap_or_default();
        if name.is_empty() {
            return None;
        }

        let colorway = self
            .colorway
            .clone()
            .or_else(|| self.trait_value("Colorway").and_then(json_text));
        let retail_price = self
            .retail_price
            .as_ref()
            .or_else(|| self.trait_value("Retail Price"))
            .and_then(parse_price);

        let mut product = ResolvedProduct::new(name, ProductSource::Marketplace)
            .with_retail_price(retail_price);
        product.identifier = self.id.unwrap_or_default();
        product.brand = non_empty(self.brand);
        product.style_id = non_empty(self.sku);
        product.colorway = non_empty(colorway);
        product.primary_image = non_empty(self.image);
        product.image_list = self.gallery.into_iter().filter(|u| !u.is_empty()).collect();
        Some(product)
    }
}

/// KicksDB API client.
#[derive(Clone)]
pub struct KicksDbClient {
    inner: Arc<KicksDbClientInner>,
}

struct KicksDbClientInner {
    client: reqwest::Client,
    search_url: Url,
}

impl KicksDbClient {
    /// Create a new catalog client.
    ///
    /// # Errors
    ///
    /// Returns `ProviderUnavailable::BadResponse` if the base URL or key is
    /// malformed, or `Http` if the HTTP client fails to build.
    pub fn new(config: &KicksDbConfig) -> Result<Self, ProviderUnavailable> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.api_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value).map_err(|e| {
                ProviderUnavailable::BadResponse(format!("Invalid API key format: {e}"))
            })?,
        );
        headers.insert("Accept", HeaderValue::from_static("application/json"));

        let search_url = Url::parse(&format!(
            "{}/v3/stockx/products",
            config.base_url.trim_end_matches('/')
        ))
        .map_err(|e| ProviderUnavailable::BadResponse(format!("Invalid base URL: {e}")))?;

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            inner: Arc::new(KicksDbClientInner { client, search_url }),
        })
    }

    async fn fetch_candidates(&self, query: &str) -> Result<Vec<ResolvedProduct>, ProviderUnavailable> {
        let mut url = self.inner.search_url.clone();
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("limit", &SEARCH_LIMIT.to_string());

        let response = self.inner.client.get(url).send().await?;
        if let Some(failure) = status_failure(&response) {
            return Err(failure);
        }
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(ProviderUnavailable::BadResponse(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        let body: SearchResponse = response.json().await?;
        Ok(candidates_from_response(body))
    }
}

impl std::fmt::Debug for KicksDbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KicksDbClient")
            .field("search_url", &self.inner.search_url.as_str())
            .finish_non_exhaustive()
    }
}

impl MarketplaceCatalog for KicksDbClient {
    fn name(&self) -> &'static str {
        "kicksdb"
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> ProviderResponse<ResolvedProduct> {
        let result = self.fetch_candidates(query).await;
        if let Ok(candidates) = &result {
            debug!(count = candidates.len(), "Catalog search complete");
        }
        result.into()
    }
}

fn candidates_from_response(body: SearchResponse) -> Vec<ResolvedProduct> {
    body.data
        .into_iter()
        .filter_map(CatalogProduct::into_candidate)
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn json_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a retail price given as a number or a string like `"$210"`.
fn parse_price(value: &JsonValue) -> Option<Decimal> {
    let text = json_text(value)?;
    let cleaned = text.trim().trim_start_matches('$').replace(',', "");
    Decimal::from_str(&cleaned).ok()
}
