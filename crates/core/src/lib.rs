//! Heatcheck Core - Shared types library.
//!
//! This crate provides the types used by every Heatcheck component:
//! - `intake` - Product identification pipeline behind the inventory scan workflow
//! - `cli` - Command-line tools for migrations and cache inspection
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Scanned codes, resolved product records, cache entries and IDs

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
