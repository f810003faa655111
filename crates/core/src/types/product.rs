//! Canonical product records produced by the resolution pipeline.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which subsystem produced a [`ResolvedProduct`].
///
/// Used for trust signaling in the intake form and for deciding whether a
/// record may be written back to the scan cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductSource {
    /// Served from the scan cache.
    Cache,
    /// First candidate of a free-text marketplace search.
    Marketplace,
    /// Barcode registry title followed by a marketplace search.
    BarcodeRegistry,
    /// Selected by an operator through the manual link workflow.
    Manual,
}

impl ProductSource {
    /// Stable text form used in storage and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cache => "CACHE",
            Self::Marketplace => "MARKETPLACE",
            Self::BarcodeRegistry => "BARCODE_REGISTRY",
            Self::Manual => "MANUAL",
        }
    }
}

impl fmt::Display for ProductSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised product source text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown product source: {0}")]
pub struct UnknownSource(pub String);

impl FromStr for ProductSource {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CACHE" => Ok(Self::Cache),
            "MARKETPLACE" => Ok(Self::Marketplace),
            "BARCODE_REGISTRY" => Ok(Self::BarcodeRegistry),
            "MANUAL" => Ok(Self::Manual),
            other => Err(UnknownSource(other.to_string())),
        }
    }
}

/// A product record as produced by any source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedProduct {
    /// Opaque id assigned by the source provider (empty if none).
    #[serde(default)]
    pub identifier: String,
    /// Display name. Required for the record to count as found.
    pub name: String,
    pub brand: Option<String>,
    pub colorway: Option<String>,
    pub style_id: Option<String>,
    /// Only set when the source itself is size-specific.
    pub size: Option<String>,
    /// Retail price in USD. Never negative.
    pub retail_price: Option<Decimal>,
    pub primary_image: Option<String>,
    #[serde(default)]
    pub image_list: Vec<String>,
    pub source: ProductSource,
}

impl ResolvedProduct {
    /// Create a record with just a name and provenance.
    #[must_use]
    pub fn new(name: impl Into<String>, source: ProductSource) -> Self {
        Self {
            identifier: String::new(),
            name: name.into(),
            brand: None,
            colorway: None,
            style_id: None,
            size: None,
            retail_price: None,
            primary_image: None,
            image_list: Vec::new(),
            source,
        }
    }

    /// Whether the record carries a display name.
    #[must_use]
    pub fn is_found(&self) -> bool {
        !self.name.trim().is_empty()
    }

    /// Whether the record may be written to the scan cache.
    ///
    /// Records served from the cache are never cached again.
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        self.is_found() && self.source != ProductSource::Cache
    }

    /// A copy of this record with different provenance.
    #[must_use]
    pub fn with_source(&self, source: ProductSource) -> Self {
        Self {
            source,
            ..self.clone()
        }
    }

    /// Set the retail price, discarding negative values.
    #[must_use]
    pub fn with_retail_price(mut self, price: Option<Decimal>) -> Self {
        self.retail_price = price.filter(|p| !p.is_sign_negative());
        self
    }

    /// All image URLs, primary first, without duplicates.
    #[must_use]
    pub fn images(&self) -> Vec<&str> {
        let mut images: Vec<&str> = Vec::with_capacity(self.image_list.len() + 1);
        for url in self.primary_image.iter().chain(self.image_list.iter()) {
            if !url.is_empty() && !images.contains(&url.as_str()) {
                images.push(url);
            }
        }
        images
    }
}
