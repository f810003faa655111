//! UPCitemdb barcode registry client.
//!
//! # API Reference
//!
//! - Trial: `GET {base}/prod/trial/lookup?upc=<code>` (no key, tight daily quota)
//! - Paid: `GET {base}/prod/v1/lookup?upc=<code>` with `user_key` / `key_type` headers
//!
//! The registry only knows retail titles, not catalog-grade metadata, so its
//! titles feed a marketplace search rather than becoming records themselves.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use heatcheck_core::Barcode;

use super::{BarcodeRegistry, ProviderResponse, ProviderUnavailable, status_failure};
use crate::config::UpcItemDbConfig;

/// Registry error codes that mean "no such barcode" rather than a failure.
const NOT_FOUND_CODES: &[&str] = &["INVALID_UPC", "NOT_FOUND"];

#[derive(Debug, Deserialize)]
struct LookupResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    items: Vec<LookupItem>,
}

#[derive(Debug, Deserialize)]
struct LookupItem {
    #[serde(default)]
    title: Option<String>,
}

/// UPCitemdb API client.
#[derive(Clone)]
pub struct UpcItemDbClient {
    inner: Arc<UpcItemDbClientInner>,
}

struct UpcItemDbClientInner {
    client: reqwest::Client,
    lookup_url: Url,
}

impl UpcItemDbClient {
    /// Create a new registry client.
    ///
    /// Uses the paid endpoint when a user key is configured.
    ///
    /// # Errors
    ///
    /// Returns `ProviderUnavailable::BadResponse` if the base URL or key is
    /// malformed, or `Http` if the HTTP client fails to build.
    pub fn new(config: &UpcItemDbConfig) -> Result<Self, ProviderUnavailable> {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));

        let path = if let Some(user_key) = &config.user_key {
            headers.insert(
                "user_key",
                HeaderValue::from_str(user_key.expose_secret()).map_err(|e| {
                    ProviderUnavailable::BadResponse(format!("Invalid user key format: {e}"))
                })?,
            );
            headers.insert(
                "key_type",
                HeaderValue::from_str(&config.key_type).map_err(|e| {
                    ProviderUnavailable::BadResponse(format!("Invalid key type: {e}"))
                })?,
            );
            "/prod/v1/lookup"
        } else {
            "/prod/trial/lookup"
        };

        let lookup_url = Url::parse(&format!("{}{path}", config.base_url.trim_end_matches('/')))
            .map_err(|e| ProviderUnavailable::BadResponse(format!("Invalid base URL: {e}")))?;

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            inner: Arc::new(UpcItemDbClientInner { client, lookup_url }),
        })
    }

    async fn fetch_titles(&self, barcode: &Barcode) -> Result<Vec<String>, ProviderUnavailable> {
        let mut url = self.inner.lookup_url.clone();
        url.query_pairs_mut().append_pair("upc", barcode.as_str());

        let response = self.inner.client.get(url).send().await?;
        if let Some(failure) = status_failure(&response) {
            return Err(failure);
        }

        let status = response.status();
        let body: LookupResponse = response.json().await?;
        if !status.is_success() && !NOT_FOUND_CODES.contains(&body.code.as_str()) {
            return Err(ProviderUnavailable::BadResponse(format!(
                "status {status}: {}",
                body.message.as_deref().unwrap_or(&body.code)
            )));
        }
        titles_from_response(body)
    }
}

impl std::fmt::Debug for UpcItemDbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpcItemDbClient")
            .field("lookup_url", &self.inner.lookup_url.as_str())
            .finish_non_exhaustive()
    }
}

impl BarcodeRegistry for UpcItemDbClient {
    fn name(&self) -> &'static str {
        "upcitemdb"
    }

    #[instrument(skip(self), fields(barcode = %barcode))]
    async fn lookup(&self, barcode: &Barcode) -> ProviderResponse<String> {
        let result = self.fetch_titles(barcode).await;
        if let Ok(titles) = &result {
            debug!(count = titles.len(), "Registry lookup complete");
        }
        result.into()
    }
}

/// Extract non-empty titles from a registry response body.
fn titles_from_response(body: LookupResponse) -> Result<Vec<String>, ProviderUnavailable> {
    if NOT_FOUND_CODES.contains(&body.code.as_str()) {
        return Ok(Vec::new());
    }
    if body.code != "OK" {
        return Err(ProviderUnavailable::BadResponse(
            body.message.unwrap_or(body.code),
        ));
    }

    Ok(body
        .items
        .into_iter()
        .filter_map(|item| item.title)
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
        .collect())
}
