use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    domain::{Candidate, UserId},
    error::NegotiationResult,
};

pub mod debounce;
pub mod pager;

/// One page of a vendor's catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPage {
    pub items: Vec<Candidate>,
    pub total_count: u64,
}

/// A page fetch issued by the pager.
///
/// `generation` identifies the search the request belongs to; a result
/// carrying an older generation than the pager's current one is stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub generation: u64,
    /// 1-based.
    pub page: u32,
    pub limit: u32,
    pub term: Option<String>,
}

/// Read access to vendor catalogs.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Lists `vendor_id`'s products, `page` is 1-based. `term` filters by
    /// name when present.
    async fn list_vendor_products(
        &self,
        vendor_id: UserId,
        page: u32,
        limit: u32,
        term: Option<&str>,
    ) -> NegotiationResult<CatalogPage>;
}
