use std::collections::HashSet;

use crate::{
    catalog::{CatalogPage, CatalogService, PageRequest},
    domain::{Candidate, ProductId, UserId},
    error::NegotiationResult,
};

/// What a completed fetch did to the accumulated list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page was appended; `added` counts candidates not seen before.
    Applied { added: usize },
    /// The page belonged to a superseded search and was dropped.
    Stale,
    /// Nothing was fetched: a fetch is in flight or the catalog is exhausted.
    Skipped,
}

/// Accumulates a vendor's catalog page by page for the substitution picker.
///
/// Fetching is split into `begin_*` and [`CandidatePager::complete`] so the
/// caller may run the request concurrently with further input. Every
/// [`CandidatePager::begin_reset`] starts a new generation; results of older
/// generations are discarded on arrival.
#[derive(Debug, Clone)]
pub struct CandidatePager {
    vendor_id: UserId,
    page_size: u32,

    generation: u64,
    term: Option<String>,
    /// Last successfully loaded page, 0 before the first one.
    page: u32,
    in_flight: bool,
    has_more: bool,
    has_error: bool,

    candidates: Vec<Candidate>,
    seen: HashSet<ProductId>,
}

impl CandidatePager {
    pub fn new(vendor_id: UserId, page_size: u32) -> Self {
        Self {
            vendor_id,
            page_size: page_size.max(1),
            generation: 0,
            term: None,
            page: 0,
            in_flight: false,
            has_more: true,
            has_error: false,
            candidates: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub fn vendor_id(&self) -> UserId {
        self.vendor_id
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn term(&self) -> Option<&str> {
        self.term.as_deref()
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn has_error(&self) -> bool {
        self.has_error
    }

    /// Starts a new search for `term`, superseding any fetch still in flight.
    ///
    /// Blank terms list the whole catalog.
    pub fn begin_reset(&mut self, term: Option<&str>) -> PageRequest {
        self.generation += 1;
        self.term = term.map(str::trim).filter(|t| !t.is_empty()).map(String::from);
        self.page = 0;
        self.has_more = true;
        self.has_error = false;
        self.candidates.clear();
        self.seen.clear();

        self.request_next()
    }

    /// Requests the next page of the current search.
    ///
    /// Returns `None` while a fetch is in flight or once the last page was short.
    pub fn begin_load_more(&mut self) -> Option<PageRequest> {
        if self.in_flight || !self.has_more {
            return None;
        }
        Some(self.request_next())
    }

    fn request_next(&mut self) -> PageRequest {
        self.in_flight = true;
        PageRequest {
            generation: self.generation,
            page: self.page + 1,
            limit: self.page_size,
            term: self.term.clone(),
        }
    }

    /// Applies the result of `request`.
    ///
    /// A failure keeps the accumulated candidates and the page cursor, raises
    /// the error flag and is returned to the caller.
    pub fn complete(
        &mut self,
        request: PageRequest,
        result: NegotiationResult<CatalogPage>,
    ) -> NegotiationResult<PageOutcome> {
        if request.generation != self.generation {
            tracing::debug!(
                stale = request.generation,
                current = self.generation,
                page = request.page,
                outcome = "stale",
                "Discarding superseded catalog page"
            );
            return Ok(PageOutcome::Stale);
        }
        self.in_flight = false;

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                self.has_error = true;
                tracing::warn!(
                    error = %e,
                    page = request.page,
                    outcome = "rejected",
                    "Catalog fetch failed"
                );
                return Err(e);
            }
        };

        self.has_error = false;
        self.page = request.page;
        self.has_more = page.items.len() == request.limit as usize;

        let before = self.candidates.len();
        for item in page.items {
            if self.seen.insert(item.id) {
                self.candidates.push(item);
            }
        }
        let added = self.candidates.len() - before;

        tracing::debug!(
            page = self.page,
            added,
            has_more = self.has_more,
            outcome = "applied",
            "Catalog page applied"
        );
        Ok(PageOutcome::Applied { added })
    }

    /// Runs a reset to completion against `catalog`.
    #[tracing::instrument(skip(self, catalog), fields(vendor = %self.vendor_id), err)]
    pub async fn reset(
        &mut self,
        catalog: &dyn CatalogService,
        term: Option<&str>,
    ) -> NegotiationResult<PageOutcome> {
        let request = self.begin_reset(term);
        let result = self.fetch(catalog, &request).await;
        self.complete(request, result)
    }

    /// Loads the next page against `catalog`, if there is one to load.
    #[tracing::instrument(
        skip(self, catalog),
        fields(vendor = %self.vendor_id, page = self.page + 1),
        err
    )]
    pub async fn load_more(
        &mut self,
        catalog: &dyn CatalogService,
    ) -> NegotiationResult<PageOutcome> {
        let Some(request) = self.begin_load_more() else {
            return Ok(PageOutcome::Skipped);
        };
        let result = self.fetch(catalog, &request).await;
        self.complete(request, result)
    }

    async fn fetch(
        &self,
        catalog: &dyn CatalogService,
        request: &PageRequest,
    ) -> NegotiationResult<CatalogPage> {
        catalog
            .list_vendor_products(
                self.vendor_id,
                request.page,
                request.limit,
                request.term.as_deref(),
            )
            .await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::{NegotiationError, TransportError};

    const VENDOR: UserId = UserId(2);

    fn candidate(id: u64) -> Candidate {
        Candidate {
            id: ProductId(id),
            name: format!("Product {id}"),
            image: None,
            list_price: None,
        }
    }

    fn page(ids: &[u64]) -> NegotiationResult<CatalogPage> {
        Ok(CatalogPage {
            items: ids.iter().copied().map(candidate).collect(),
            total_count: 100,
        })
    }

    fn ids(pager: &CandidatePager) -> Vec<u64> {
        pager.candidates().iter().map(|c| c.id.0).collect()
    }

    #[test]
    fn test_reset_requests_first_page_with_trimmed_term() {
        let mut pager = CandidatePager::new(VENDOR, 3);
        let req = pager.begin_reset(Some("  bolts "));
        assert_eq!(req.page, 1);
        assert_eq!(req.limit, 3);
        assert_eq!(req.term.as_deref(), Some("bolts"));
        assert!(pager.is_loading());

        let req = pager.begin_reset(Some("   "));
        assert_eq!(req.term, None);
    }

    #[test]
    fn test_load_more_is_noop_while_in_flight() {
        let mut pager = CandidatePager::new(VENDOR, 3);
        let _req = pager.begin_reset(None);
        assert!(pager.begin_load_more().is_none());
    }

    #[test]
    fn test_pages_append_without_duplicates() {
        let mut pager = CandidatePager::new(VENDOR, 3);
        let req = pager.begin_reset(None);
        pager.complete(req, page(&[1, 2, 3])).unwrap();

        let req = pager.begin_load_more().unwrap();
        assert_eq!(req.page, 2);
        let outcome = pager.complete(req, page(&[3, 4, 5])).unwrap();

        assert_eq!(outcome, PageOutcome::Applied { added: 2 });
        assert_eq!(ids(&pager), vec![1, 2, 3, 4, 5]);
        assert_eq!(pager.page(), 2);
    }

    #[test]
    fn test_short_page_exhausts_catalog() {
        let mut pager = CandidatePager::new(VENDOR, 3);
        let req = pager.begin_reset(None);
        pager.complete(req, page(&[1, 2])).unwrap();
        assert!(!pager.has_more());
        assert!(pager.begin_load_more().is_none());
    }

    #[test]
    fn test_stale_page_is_discarded() {
        let mut pager = CandidatePager::new(VENDOR, 3);
        let old = pager.begin_reset(Some("a"));
        let new = pager.begin_reset(Some("ab"));

        assert_eq!(pager.complete(old, page(&[1, 2, 3])).unwrap(), PageOutcome::Stale);
        assert!(pager.candidates().is_empty());
        assert!(pager.is_loading());

        pager.complete(new, page(&[7])).unwrap();
        assert_eq!(ids(&pager), vec![7]);
        assert!(!pager.is_loading());
    }

    #[test]
    fn test_failure_keeps_results_and_page() {
        let mut pager = CandidatePager::new(VENDOR, 2);
        let req = pager.begin_reset(None);
        pager.complete(req, page(&[1, 2])).unwrap();

        let req = pager.begin_load_more().unwrap();
        let err = pager
            .complete(req, Err(TransportError::Connection("timeout".into()).into()))
            .unwrap_err();
        assert!(matches!(err, NegotiationError::Transport(_)));
        assert!(pager.has_error());
        assert_eq!(pager.page(), 1);
        assert_eq!(ids(&pager), vec![1, 2]);

        // Retrying asks for the same page again.
        assert_eq!(pager.begin_load_more().unwrap().page, 2);
    }
}
