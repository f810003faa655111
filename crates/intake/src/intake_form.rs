//! New-inventory-item form pre-population from a resolved product.

use rust_decimal::Decimal;
use serde::Serialize;

use heatcheck_core::{ProductSource, ResolvedProduct};

/// How much the operator should trust the pre-filled fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trust {
    /// Bound to this exact code (cache, barcode registry or operator selection).
    Verified,
    /// Best free-text match; the operator should double check.
    Review,
}

impl From<ProductSource> for Trust {
    fn from(source: ProductSource) -> Self {
        match source {
            ProductSource::Cache | ProductSource::BarcodeRegistry | ProductSource::Manual => {
                Self::Verified
            }
            ProductSource::Marketplace => Self::Review,
        }
    }
}

/// Pre-filled fields for a new inventory item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntakeForm {
    pub catalog_id: Option<String>,
    pub name: String,
    pub brand: Option<String>,
    pub style_id: Option<String>,
    pub colorway: Option<String>,
    pub size: Option<String>,
    pub retail_price: Option<Decimal>,
    pub primary_image: Option<String>,
    pub images: Vec<String>,
    pub source: ProductSource,
    pub trust: Trust,
}

impl IntakeForm {
    /// Pre-populate the form. Blank optional strings are left empty.
    #[must_use]
    pub fn from_resolved(product: &ResolvedProduct) -> Self {
        let images: Vec<String> = product.images().into_iter().map(String::from).collect();
        Self {
            catalog_id: blank_to_none(Some(&product.identifier)),
            name: product.name.trim().to_string(),
            brand: blank_to_none(product.brand.as_ref()),
            style_id: blank_to_none(product.style_id.as_ref()),
            colorway: blank_to_none(product.colorway.as_ref()),
            size: blank_to_none(product.size.as_ref()),
            retail_price: product.retail_price,
            primary_image: images.first().cloned(),
            images,
            source: product.source,
            trust: product.source.into(),
        }
    }
}

fn blank_to_none(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
}
