//! Heatcheck intake library.
//!
//! Identifies a scanned or typed product code for new-inventory intake.
//! A code is looked up in the durable scan cache first, then in the barcode
//! registry and the sneaker marketplace. Codes nothing can identify are held
//! for an operator to link manually.
//!
//! # Sources
//!
//! - `PostgreSQL` scan cache (authoritative once a code is bound)
//! - UPCitemdb barcode registry
//! - KicksDB marketplace catalog

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod intake_form;
pub mod manual_link;
pub mod pipeline;
pub mod providers;
pub mod resolution;
pub mod routes;
pub mod search;
pub mod state;

pub use cache::{CacheStore, InsertOutcome, StoreError};
pub use intake_form::{IntakeForm, Trust};
pub use manual_link::{LinkError, LinkOutcome, ManualLinkWorkflow};
pub use pipeline::ScanPipeline;
pub use resolution::{Resolution, ResolutionPlan, ResolveError, Resolver, Step};
pub use search::{ManualSearch, SearchError};
