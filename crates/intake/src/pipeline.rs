//! Inbound operations of the scan workflow.
//!
//! Wires the resolver, the manual link workflow and manual search around one
//! scan cache and one marketplace catalog. Unresolved codes are handed to the
//! manual link workflow as pending.

use std::sync::Arc;

use heatcheck_core::ResolvedProduct;

use crate::cache::CacheStore;
use crate::manual_link::{LinkError, LinkOutcome, ManualLinkWorkflow};
use crate::providers::{BarcodeRegistry, MarketplaceCatalog};
use crate::resolution::{Resolution, ResolveError, Resolver};
use crate::search::{ManualSearch, SearchError};

/// Resolve, search and link against shared collaborators.
#[derive(Debug)]
pub struct ScanPipeline<C, R, M> {
    resolver: Resolver<C, R, M>,
    links: ManualLinkWorkflow<C>,
    search: ManualSearch<M>,
}

impl<C, R, M> ScanPipeline<C, R, M>
where
    C: CacheStore + Clone,
    R: BarcodeRegistry,
    M: MarketplaceCatalog + Clone,
{
    /// Build a pipeline around a configured resolver.
    #[must_use]
    pub fn new(resolver: Resolver<C, R, M>) -> Self {
        let links = ManualLinkWorkflow::new(resolver.cache().clone());
        let search = ManualSearch::new(resolver.marketplace().clone())
            .with_timeout(resolver.provider_timeout());
        Self {
            resolver,
            links,
            search,
        }
    }

    /// Resolve operator input; unresolved codes become pending and resolved
    /// codes stop being pending.
    ///
    /// # Errors
    ///
    /// See [`Resolver::resolve`].
    pub async fn resolve(&self, input: &str) -> Result<Resolution, ResolveError> {
        let resolution = self.resolver.resolve(input).await?;
        match &resolution {
            Resolution::Unresolved { pending_code } => self.links.mark_pending(pending_code).await,
            Resolution::Resolved(_) => self.links.clear_pending(input.trim()).await,
        }
        Ok(resolution)
    }

    /// Bind an operator-chosen record to a pending code.
    ///
    /// # Errors
    ///
    /// See [`ManualLinkWorkflow::link`].
    pub async fn link_manually(
        &self,
        pending_code: &str,
        chosen: &ResolvedProduct,
    ) -> Result<LinkOutcome, LinkError> {
        self.links.link(pending_code, chosen).await
    }

    /// Operator search used to pick a record for a pending code.
    ///
    /// # Errors
    ///
    /// See [`ManualSearch::search`].
    pub async fn search(&self, query: &str) -> Result<Arc<Vec<ResolvedProduct>>, SearchError> {
        self.search.search(query).await
    }

    /// The manual link workflow (pending code inspection).
    #[must_use]
    pub const fn links(&self) -> &ManualLinkWorkflow<C> {
        &self.links
    }

}
