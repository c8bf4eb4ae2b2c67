use std::sync::Arc;

use crate::{
    catalog::{
        CatalogService,
        debounce::{DebounceTicket, Debouncer},
        pager::{CandidatePager, PageOutcome},
    },
    config::NegotiationConfig,
    domain::{Price, ProductId, Quantity, RequestedLineItem, UserId},
    error::{NegotiationResult, RoomError, SystemError, ValidationError},
    notify::{CacheKey, Notifier},
    room::{
        Participants, RoomService,
        binding::{Posted, RoomBinding},
    },
    suggestion::{
        NegotiationEvent, SuggestionBook,
        reconcile::{ChangeKind, reconcile},
        selection::{Selection, Toggle},
    },
};

/// External services a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub catalog: Arc<dyn CatalogService>,
    pub rooms: Arc<dyn RoomService>,
    pub notifier: Arc<dyn Notifier>,
}

/// Result of [`SubstitutionSession::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The selection matches the confirmed suggestions; nothing was sent.
    Unchanged,
    /// The event was posted to the negotiation room and folded into the book.
    Sent {
        posted: Posted,
        event: NegotiationEvent,
    },
}

/// The seller's substitution picker for one line item.
///
/// Owns the working selection, the paginated candidate list and the room
/// binding. The working selection lives only as long as the session;
/// [`SubstitutionSession::close`] hands back the confirmed book.
pub struct SubstitutionSession {
    line_item: RequestedLineItem,
    participants: Participants,
    vendor_id: UserId,
    config: NegotiationConfig,

    book: SuggestionBook,
    selection: Selection,
    pager: CandidatePager,
    debouncer: Debouncer,
    binding: RoomBinding,

    catalog: Arc<dyn CatalogService>,
    notifier: Arc<dyn Notifier>,
}

impl SubstitutionSession {
    /// Opens the picker with the selection seeded from `book`.
    ///
    /// # Errors
    /// An invalid config, a line item without vendor, or a book that belongs
    /// to another line item.
    pub fn open(
        line_item: RequestedLineItem,
        book: SuggestionBook,
        config: NegotiationConfig,
        collaborators: Collaborators,
    ) -> NegotiationResult<Self> {
        config.validate()?;

        if book.line_item_id() != line_item.id {
            return Err(SystemError::InvariantViolation(format!(
                "suggestions of line item {} opened for line item {}",
                book.line_item_id(),
                line_item.id
            ))
            .into());
        }
        let vendor_id = line_item
            .vendor_id
            .ok_or(RoomError::MissingVendor(line_item.id))?;

        let selection = Selection::seed_from(book.suggestions(), config.default_quantity());
        tracing::debug!(
            line_item = %line_item.id,
            vendor = %vendor_id,
            seeded = selection.len(),
            %config,
            "Substitution session opened"
        );

        Ok(Self {
            participants: Participants::from(&line_item),
            vendor_id,
            pager: CandidatePager::new(vendor_id, config.page_size()),
            debouncer: Debouncer::new(config.search_debounce()),
            binding: RoomBinding::new(collaborators.rooms),
            catalog: collaborators.catalog,
            notifier: collaborators.notifier,
            line_item,
            config,
            book,
            selection,
        })
    }

    pub fn line_item(&self) -> &RequestedLineItem {
        &self.line_item
    }

    pub fn config(&self) -> &NegotiationConfig {
        &self.config
    }

    pub fn book(&self) -> &SuggestionBook {
        &self.book
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn pager(&self) -> &CandidatePager {
        &self.pager
    }

    // ============================================================================
    // Candidates
    // ============================================================================

    /// Starts a new catalog search. Earlier searches still in flight are superseded.
    pub async fn search(&mut self, term: Option<&str>) -> NegotiationResult<PageOutcome> {
        self.pager.reset(self.catalog.as_ref(), term).await
    }

    pub async fn load_more(&mut self) -> NegotiationResult<PageOutcome> {
        self.pager.load_more(self.catalog.as_ref()).await
    }

    /// Arms the search debounce; run [`SubstitutionSession::search`] once the ticket fires.
    pub fn debounce_search(&mut self) -> DebounceTicket {
        self.debouncer.trigger()
    }

    // ============================================================================
    // Working Selection
    // ============================================================================

    /// Selects a loaded candidate, or deselects a selected product.
    pub fn toggle(&mut self, product_id: ProductId) -> NegotiationResult<Toggle> {
        if self.selection.remove(product_id).is_some() {
            return Ok(Toggle::Deselected);
        }
        let candidate = self
            .pager
            .candidates()
            .iter()
            .find(|c| c.id == product_id)
            .ok_or(ValidationError::UnknownCandidate(product_id))?;
        Ok(self
            .selection
            .toggle(candidate, self.config.default_quantity()))
    }

    pub fn set_offer_price(
        &mut self,
        product_id: ProductId,
        price: Option<Price>,
    ) -> NegotiationResult<()> {
        self.selection.set_offer_price(product_id, price)
    }

    pub fn set_quantity(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> NegotiationResult<()> {
        self.selection.set_quantity(product_id, quantity)
    }

    /// Drops unsent edits and returns to the confirmed suggestions.
    pub fn revert(&mut self) {
        let default_quantity = self.config.default_quantity();
        self.selection = Selection::seed_from(self.book.suggestions(), default_quantity);
    }

    // ============================================================================
    // Sending
    // ============================================================================

    /// Sends the difference between the working selection and the confirmed
    /// suggestions to the negotiation room.
    ///
    /// Nothing leaves the process when there is no difference. When the room
    /// cannot be resolved or the post fails, the book and selection are left
    /// as they were.
    #[tracing::instrument(skip(self), fields(line_item = %self.line_item.id), err)]
    pub async fn submit(&mut self) -> NegotiationResult<SubmitOutcome> {
        self.selection.validate()?;

        let default_quantity = self.config.default_quantity();
        let reconciliation = reconcile(
            self.line_item.id,
            self.book.suggestions(),
            &self.selection,
            default_quantity,
        );
        if reconciliation.is_noop() {
            tracing::debug!(outcome = "suppressed", "Selection unchanged, nothing to send");
            return Ok(SubmitOutcome::Unchanged);
        }

        let created = reconciliation.count(ChangeKind::Create);
        let updated = reconciliation.count(ChangeKind::Update);
        let withdrawn = reconciliation.count(ChangeKind::Withdraw);
        let event = reconciliation.into_event()?;

        let posted = self
            .binding
            .post_suggestions(&self.participants, event.clone())
            .await?;

        self.book.apply(&event);
        self.selection = Selection::seed_from(self.book.suggestions(), default_quantity);

        self.notifier
            .invalidate(CacheKey::LineItemSuggestions(self.line_item.id));
        self.notifier.invalidate(CacheKey::RoomThread(posted.room_id));

        tracing::info!(
            room = %posted.room_id,
            message = %posted.message_id,
            created,
            updated,
            withdrawn,
            outcome = "applied",
            "Suggestions sent"
        );
        Ok(SubmitOutcome::Sent { posted, event })
    }

    /// Posts an ordinary chat message from the vendor into the negotiation room.
    pub async fn send_text(&mut self, body: impl Into<String>) -> NegotiationResult<Posted> {
        let posted = self
            .binding
            .post_text(self.line_item.id, &self.participants, self.vendor_id, body.into())
            .await?;
        self.notifier.invalidate(CacheKey::RoomThread(posted.room_id));
        Ok(posted)
    }

    /// Closes the picker, discarding the working selection.
    pub fn close(self) -> SuggestionBook {
        tracing::debug!(
            line_item = %self.line_item.id,
            discarded = self.selection.len(),
            "Substitution session closed"
        );
        self.book
    }
}

impl std::fmt::Debug for SubstitutionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubstitutionSession")
            .field("line_item", &self.line_item.id)
            .field("book", &self.book)
            .field("selection", &self.selection)
            .field("pager", &self.pager)
            .finish_non_exhaustive()
    }
}
