use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::{
    domain::{LineItemId, MessageId, ProductId, ProposalId, Quantity, UserId},
    error::{ConflictError, NegotiationResult, SystemError},
    negotiation::{
        Decision, PriceNegotiationStatus, StatusAck, TransitionCmd,
        proposal::{Pending, Proposal, ProposalEntry},
    },
    suggestion::{NegotiationEvent, Suggestion, SuggestionRecord},
};

/// Proposals surfaced or withdrawn by one ingested event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardUpdate {
    pub surfaced: Vec<ProposalId>,
    pub withdrawn: Vec<ProposalId>,
}

impl BoardUpdate {
    pub fn is_empty(&self) -> bool {
        self.surfaced.is_empty() && self.withdrawn.is_empty()
    }
}

/// An applied status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub id: ProposalId,
    pub product_id: ProductId,
    pub status: PriceNegotiationStatus,
    pub updated_at: DateTime<Utc>,
}

/// The price proposals of one line item, as the buyer sees them.
///
/// Pending proposals live in `live`; once decided they move to `archive`
/// and are never touched again. A product has at most one current proposal,
/// tracked in `latest`.
///
/// Events are keyed by the room message that carried them. The room log is
/// append-only, so anything at or below `last_message` was already folded in.
#[derive(Debug, Clone)]
pub struct PriceBoard {
    line_item_id: LineItemId,
    /// When set, only this account may decide proposals.
    buyer_id: Option<UserId>,
    next_id: u64,
    last_message: Option<MessageId>,

    live: HashMap<ProposalId, Proposal<Pending>>,
    archive: HashMap<ProposalId, ProposalEntry>,
    latest: HashMap<ProductId, ProposalId>,
}

impl PriceBoard {
    pub fn new(line_item_id: LineItemId, buyer_id: Option<UserId>) -> Self {
        Self {
            line_item_id,
            buyer_id,
            next_id: 1,
            last_message: None,
            live: HashMap::new(),
            archive: HashMap::new(),
            latest: HashMap::new(),
        }
    }

    /// Restores proposals previously persisted by the server.
    ///
    /// The current proposal of a product is the one with the highest id,
    /// whatever the order of `entries`.
    pub fn restore(&mut self, entries: impl IntoIterator<Item = ProposalEntry>) {
        for entry in entries {
            let id = entry.id();
            self.next_id = self.next_id.max(id.0 + 1);
            self.latest
                .entry(entry.product_id())
                .and_modify(|current| *current = (*current).max(id))
                .or_insert(id);
            match entry {
                ProposalEntry::Pending(p) => {
                    self.live.insert(id, p);
                }
                decided => {
                    self.archive.insert(id, decided);
                }
            }
        }
    }

    /// Marks every room message up to `message_id` as already folded in,
    /// typically after [`PriceBoard::restore`] from a server snapshot.
    pub fn resume_after(&mut self, message_id: MessageId) {
        self.last_message = self.last_message.max(Some(message_id));
    }

    pub fn line_item_id(&self) -> LineItemId {
        self.line_item_id
    }

    /// The last room message folded into the board.
    pub fn last_message(&self) -> Option<MessageId> {
        self.last_message
    }

    pub fn status(&self, id: ProposalId) -> Option<PriceNegotiationStatus> {
        if self.live.contains_key(&id) {
            return Some(PriceNegotiationStatus::Pending);
        }
        self.archive.get(&id).map(ProposalEntry::status)
    }

    /// The current proposal for a product, if the product is still suggested with a price.
    pub fn current(&self, product_id: ProductId) -> Option<(ProposalId, PriceNegotiationStatus)> {
        let id = *self.latest.get(&product_id)?;
        self.status(id).map(|s| (id, s))
    }

    /// Pending proposals ordered by id.
    pub fn pending(&self) -> Vec<&Proposal<Pending>> {
        let mut out: Vec<_> = self.live.values().collect();
        out.sort_by_key(|p| p.id());
        out
    }

    pub fn decided(&self) -> Vec<&ProposalEntry> {
        let mut out: Vec<_> = self.archive.values().collect();
        out.sort_by_key(|p| p.id());
        out
    }

    // ============================================================================
    // Ingestion
    // ============================================================================

    /// Surfaces the priced suggestions already confirmed when the buyer opens the line item.
    pub fn surface_existing(
        &mut self,
        suggestions: &[Suggestion],
        default_quantity: Quantity,
        at: DateTime<Utc>,
    ) -> BoardUpdate {
        let mut update = BoardUpdate::default();
        for s in suggestions {
            let record = SuggestionRecord::offer(
                s.suggested_product_id,
                s.offer_price,
                s.effective_quantity(default_quantity),
            );
            self.ingest_record(&record, at, &mut update);
        }
        update
    }

    /// Folds a suggestion event, carried by room message `message_id`, into the board.
    ///
    /// Replaying a room thread is harmless: messages at or below the last
    /// ingested one are skipped, and an offer identical to the product's
    /// current proposal surfaces nothing.
    pub fn ingest(
        &mut self,
        message_id: MessageId,
        event: &NegotiationEvent,
        at: DateTime<Utc>,
    ) -> NegotiationResult<BoardUpdate> {
        if event.line_item_id != self.line_item_id {
            return Err(SystemError::InvariantViolation(format!(
                "event for line item {} delivered to board of line item {}",
                event.line_item_id, self.line_item_id
            ))
            .into());
        }

        if let Some(last) = self.last_message
            && message_id <= last
        {
            tracing::debug!(
                line_item = %self.line_item_id,
                message = %message_id,
                last = %last,
                outcome = "stale",
                "Suggestion event already ingested"
            );
            return Ok(BoardUpdate::default());
        }

        let mut update = BoardUpdate::default();
        for record in event.records() {
            self.ingest_record(record, at, &mut update);
        }
        self.last_message = Some(message_id);

        tracing::debug!(
            line_item = %self.line_item_id,
            message = %message_id,
            surfaced = update.surfaced.len(),
            withdrawn = update.withdrawn.len(),
            outcome = "applied",
            "Suggestion event ingested"
        );
        Ok(update)
    }

    fn ingest_record(
        &mut self,
        record: &SuggestionRecord,
        at: DateTime<Utc>,
        update: &mut BoardUpdate,
    ) {
        let product_id = record.suggested_product_id;

        if !record.is_withdrawal()
            && let Some(id) = self.latest.get(&product_id)
            && self.matches(*id, record)
        {
            return;
        }

        // Anything else supersedes the current pending proposal, if there is one.
        if let Some(prev) = self.latest.remove(&product_id)
            && self.live.remove(&prev).is_some()
        {
            update.withdrawn.push(prev);
        }

        if record.is_withdrawal() {
            return;
        }

        let Some(price) = record.offer_price else {
            return;
        };

        let id = ProposalId(self.next_id);
        self.next_id += 1;
        self.live.insert(
            id,
            Proposal::surface(id, self.line_item_id, product_id, price, record.quantity, at),
        );
        self.latest.insert(product_id, id);
        update.surfaced.push(id);
    }

    fn matches(&self, id: ProposalId, record: &SuggestionRecord) -> bool {
        let (price, quantity) = match (self.live.get(&id), self.archive.get(&id)) {
            (Some(p), _) => (p.offer_price(), p.quantity()),
            (None, Some(ProposalEntry::Approved(p))) => (p.offer_price(), p.quantity()),
            (None, Some(ProposalEntry::Rejected(p))) => (p.offer_price(), p.quantity()),
            _ => return false,
        };
        record.offer_price == Some(price) && record.quantity == quantity
    }

    // ============================================================================
    // Transitions
    // ============================================================================

    /// Checks that `cmd` may be applied, without applying it.
    ///
    /// Terminal and unknown proposals are conflicts whatever the requested
    /// target; a `PENDING` target is a validation error.
    pub fn check(&self, cmd: &TransitionCmd) -> NegotiationResult<Decision> {
        self.admit(cmd).inspect_err(|e| {
            tracing::debug!(
                line_item = %self.line_item_id,
                proposal = %cmd.id,
                target = %cmd.status,
                error = %e,
                outcome = "rejected",
                "Transition refused"
            );
        })
    }

    fn admit(&self, cmd: &TransitionCmd) -> NegotiationResult<Decision> {
        if let Some(decided) = self.archive.get(&cmd.id) {
            return Err(ConflictError::AlreadyDecided {
                id: cmd.id,
                status: decided.status(),
            }
            .into());
        }
        if !self.live.contains_key(&cmd.id) {
            return Err(ConflictError::UnknownProposal(cmd.id).into());
        }
        if let Some(buyer) = self.buyer_id
            && buyer != cmd.user_id
        {
            return Err(SystemError::AccessDenied(format!(
                "user {} is not the buyer of line item {}",
                cmd.user_id, self.line_item_id
            ))
            .into());
        }
        Ok(Decision::try_from(cmd.status)?)
    }

    /// Applies a transition locally. This is the authoritative path on the server side.
    pub fn transition(
        &mut self,
        cmd: &TransitionCmd,
        at: DateTime<Utc>,
    ) -> NegotiationResult<StatusChange> {
        let decision = self.check(cmd)?;
        self.decide(cmd.id, decision, cmd.user_id, at)
    }

    /// Records the server's acknowledgement of a transition this client requested.
    pub fn acknowledge(
        &mut self,
        cmd: &TransitionCmd,
        ack: &StatusAck,
    ) -> NegotiationResult<StatusChange> {
        let decision = Decision::try_from(ack.status).map_err(|_| {
            SystemError::InvariantViolation(format!(
                "endpoint acknowledged proposal {} as still {}",
                cmd.id, ack.status
            ))
        })?;
        self.decide(cmd.id, decision, cmd.user_id, ack.updated_at)
    }

    fn decide(
        &mut self,
        id: ProposalId,
        decision: Decision,
        by: UserId,
        at: DateTime<Utc>,
    ) -> NegotiationResult<StatusChange> {
        let pending = match self.live.remove(&id) {
            Some(p) => p,
            None => {
                return Err(match self.archive.get(&id) {
                    Some(d) => ConflictError::AlreadyDecided {
                        id,
                        status: d.status(),
                    },
                    None => ConflictError::UnknownProposal(id),
                }
                .into());
            }
        };

        let product_id = pending.product_id();
        let entry = pending.decide(decision, by, at);
        let status = entry.status();
        self.archive.insert(id, entry);

        tracing::info!(
            line_item = %self.line_item_id,
            proposal = %id,
            product = %product_id,
            %status,
            outcome = "applied",
            "Price proposal decided"
        );

        Ok(StatusChange {
            id,
            product_id,
            status,
            updated_at: at,
        })
    }
}
