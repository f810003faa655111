//! Core types for Heatcheck.
//!
//! This module provides type-safe wrappers for the scan pipeline's domain concepts.

pub mod cache;
pub mod code;
pub mod id;
pub mod product;

pub use cache::CacheEntry;
pub use code::{Barcode, CodeError, ScannedCode};
pub use id::*;
pub use product::{ProductSource, ResolvedProduct, UnknownSource};
