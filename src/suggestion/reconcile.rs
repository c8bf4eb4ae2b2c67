//! Minimal diff between the confirmed suggestions and the seller's working set.

use std::collections::HashSet;

use strum::{Display, EnumString};

use crate::{
    domain::{LineItemId, ProductId, Quantity},
    error::{NegotiationResult, ValidationError},
    suggestion::{NegotiationEvent, Suggestion, SuggestionRecord, selection::Selection},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ChangeKind {
    Create,
    Update,
    Withdraw,
}

/// A single suggestion mutation, tagged with why it was emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// The product was not suggested before.
    Create(SuggestionRecord),
    /// The product was suggested before with a different price or quantity.
    Update(SuggestionRecord),
    /// The product was suggested before and the seller deselected it.
    Withdraw(ProductId),
}

impl Change {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Change::Create(_) => ChangeKind::Create,
            Change::Update(_) => ChangeKind::Update,
            Change::Withdraw(_) => ChangeKind::Withdraw,
        }
    }

    pub fn product_id(&self) -> ProductId {
        match self {
            Change::Create(r) | Change::Update(r) => r.suggested_product_id,
            Change::Withdraw(id) => *id,
        }
    }

    pub fn into_record(self) -> SuggestionRecord {
        match self {
            Change::Create(r) | Change::Update(r) => r,
            Change::Withdraw(id) => SuggestionRecord::withdrawal(id),
        }
    }
}

/// The outcome of [`reconcile`]: offers first, then withdrawals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    line_item_id: LineItemId,
    changes: Vec<Change>,
}

impl Reconciliation {
    /// Nothing to send; the caller must not touch the network.
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn count(&self, kind: ChangeKind) -> usize {
        self.changes.iter().filter(|c| c.kind() == kind).count()
    }

    pub fn into_records(self) -> Vec<SuggestionRecord> {
        self.changes.into_iter().map(Change::into_record).collect()
    }

    /// Converts the diff into the wire event.
    ///
    /// # Errors
    /// [`ValidationError::EmptyDiff`] when there is nothing to send.
    pub fn into_event(self) -> NegotiationResult<NegotiationEvent> {
        if self.is_noop() {
            return Err(ValidationError::EmptyDiff.into());
        }
        let line_item_id = self.line_item_id;
        Ok(NegotiationEvent {
            line_item_id,
            suggestions: self.into_records(),
        })
    }
}

/// Computes the minimal set of suggestion changes for one line item.
///
/// - Selected products that were never suggested produce a create, unconditionally.
/// - Selected products that were suggested produce an update only when the
///   effective quantity (falling back to `default_quantity`) or the offer price differs.
/// - Suggested products missing from the selection produce a tombstone
///   (`quantity: 0`, no price).
///
/// Pure and total; `selection` is expected to have passed [`Selection::validate`].
pub fn reconcile(
    line_item_id: LineItemId,
    existing: &[Suggestion],
    selection: &Selection,
    default_quantity: Quantity,
) -> Reconciliation {
    let find = |product_id: ProductId| {
        existing
            .iter()
            .find(|s| s.suggested_product_id == product_id)
    };

    let offers = selection.iter().filter_map(|(&product_id, entry)| {
        let Some(prev) = find(product_id) else {
            return Some(Change::Create(
                SuggestionRecord::offer(product_id, entry.offer_price, entry.quantity)
                    .with_details(entry.details.clone()),
            ));
        };

        let qty_changed = prev.effective_quantity(default_quantity) != entry.quantity;
        let price_changed = prev.offer_price != entry.offer_price;
        (qty_changed || price_changed).then(|| {
            Change::Update(SuggestionRecord::offer(
                product_id,
                entry.offer_price,
                entry.quantity,
            ))
        })
    });

    let mut withdrawn = HashSet::new();
    let withdrawals = existing
        .iter()
        .map(|s| s.suggested_product_id)
        .filter(|id| !selection.contains(*id))
        // A malformed snapshot listing a product twice still yields one tombstone.
        .filter(|id| withdrawn.insert(*id))
        .map(Change::Withdraw);

    let changes: Vec<Change> = offers.chain(withdrawals).collect();

    tracing::debug!(
        line_item = %line_item_id,
        existing = existing.len(),
        selected = selection.len(),
        changes = changes.len(),
        "Suggestions reconciled"
    );

    Reconciliation {
        line_item_id,
        changes,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        domain::{Price, ProductDetails},
        suggestion::selection::SelectionEntry,
    };

    const LINE: LineItemId = LineItemId(1);

    fn existing(id: u64, qty: u32, price: i64) -> Suggestion {
        Suggestion::new(ProductId(id))
            .with_quantity(Quantity(qty))
            .with_offer_price(Price::from(price))
    }

    fn entry(price: i64, qty: u32) -> SelectionEntry {
        SelectionEntry::new(Some(Price::from(price)), Quantity(qty))
    }

    fn selection(entries: Vec<(u64, SelectionEntry)>) -> Selection {
        entries
            .into_iter()
            .map(|(id, e)| (ProductId(id), e))
            .collect()
    }

    fn run(existing: &[Suggestion], sel: &Selection) -> Vec<SuggestionRecord> {
        reconcile(LINE, existing, sel, Quantity::ONE).into_records()
    }

    // ============================================================================
    // Reference Scenarios
    // ============================================================================

    #[test]
    fn test_unchanged_selection_is_noop() {
        let ex = vec![existing(5, 2, 10)];
        let sel = selection(vec![(5, entry(10, 2))]);
        assert!(run(&ex, &sel).is_empty());
    }

    #[test]
    fn test_deselect_emits_tombstone() {
        let ex = vec![existing(5, 2, 10)];
        let out = run(&ex, &Selection::new());
        assert_eq!(out, vec![SuggestionRecord::withdrawal(ProductId(5))]);
        assert_eq!(out[0].offer_price, None);
    }

    #[test]
    fn test_new_selection_emits_create() {
        let sel = selection(vec![(7, entry(15, 3))]);
        assert_eq!(
            run(&[], &sel),
            vec![SuggestionRecord::offer(
                ProductId(7),
                Some(Price::from(15)),
                Quantity(3)
            )]
        );
    }

    #[test]
    fn test_price_change_emits_update() {
        let ex = vec![existing(5, 2, 10)];
        let sel = selection(vec![(5, entry(12, 2))]);
        let rec = reconcile(LINE, &ex, &sel, Quantity::ONE);
        assert_eq!(rec.count(ChangeKind::Update), 1);
        assert_eq!(
            rec.into_records(),
            vec![SuggestionRecord::offer(
                ProductId(5),
                Some(Price::from(12)),
                Quantity(2)
            )]
        );
    }

    #[test]
    fn test_mixed_changes() {
        let ex = vec![existing(5, 2, 10), existing(6, 1, 5)];
        let sel = selection(vec![(5, entry(10, 2)), (7, entry(20, 1))]);
        let out = run(&ex, &sel);
        assert_eq!(
            out,
            vec![
                SuggestionRecord::offer(ProductId(7), Some(Price::from(20)), Quantity(1)),
                SuggestionRecord::withdrawal(ProductId(6)),
            ]
        );
    }

    // ============================================================================
    // Properties
    // ============================================================================

    #[test]
    fn test_reconcile_twice_is_idempotent() {
        let ex = vec![existing(5, 2, 10), existing(6, 3, 1)];
        let sel = Selection::seed_from(&ex, Quantity::ONE);
        assert!(reconcile(LINE, &ex, &sel, Quantity::ONE).is_noop());
        assert!(reconcile(LINE, &ex, &sel, Quantity::ONE).is_noop());
    }

    #[test]
    fn test_every_missing_suggestion_gets_exactly_one_tombstone() {
        let ex: Vec<_> = (1..=6).map(|i| existing(i, 1, 1)).collect();
        let sel = selection(vec![(2, entry(1, 1)), (4, entry(1, 1))]);
        let out = run(&ex, &sel);

        let tombstones: Vec<_> = out
            .iter()
            .filter(|r| r.is_withdrawal())
            .map(|r| r.suggested_product_id.0)
            .collect();
        assert_eq!(tombstones, vec![1, 3, 5, 6]);
        assert!(out.iter().all(|r| r.offer_price.is_none()));
    }

    #[test]
    fn test_duplicate_existing_rows_yield_one_tombstone() {
        let ex = vec![existing(5, 1, 1), existing(5, 1, 1)];
        assert_eq!(
            run(&ex, &Selection::new()),
            vec![SuggestionRecord::withdrawal(ProductId(5))]
        );
    }

    #[test]
    fn test_offers_precede_withdrawals() {
        let ex = vec![existing(1, 1, 1), existing(9, 1, 1)];
        let sel = selection(vec![(9, entry(2, 1)), (20, entry(3, 1))]);
        let kinds: Vec<_> = reconcile(LINE, &ex, &sel, Quantity::ONE)
            .changes()
            .iter()
            .map(Change::kind)
            .collect();
        assert_eq!(
            kinds,
            vec![ChangeKind::Update, ChangeKind::Create, ChangeKind::Withdraw]
        );
    }

    // ============================================================================
    // Defaults & Optional Fields
    // ============================================================================

    #[test]
    fn test_missing_existing_quantity_falls_back_to_default() {
        let ex = vec![Suggestion::new(ProductId(5)).with_offer_price(Price::from(10))];
        let sel = selection(vec![(5, entry(10, 3))]);
        assert!(reconcile(LINE, &ex, &sel, Quantity(3)).is_noop());
        assert!(!reconcile(LINE, &ex, &sel, Quantity(1)).is_noop());
    }

    #[test]
    fn test_price_removed_is_an_update() {
        let ex = vec![existing(5, 2, 10)];
        let sel = selection(vec![(5, SelectionEntry::new(None, Quantity(2)))]);
        assert_eq!(
            run(&ex, &sel),
            vec![SuggestionRecord::offer(ProductId(5), None, Quantity(2))]
        );
    }

    #[test]
    fn test_price_scale_does_not_trigger_update() {
        let ex = vec![existing(5, 2, 10)];
        let sel = selection(vec![(
            5,
            SelectionEntry::new(Some(Price::new(1000, 2)), Quantity(2)),
        )]);
        assert!(run(&ex, &sel).is_empty());
    }

    #[test]
    fn test_create_carries_product_details() {
        let details = ProductDetails {
            name: "Widget".into(),
            image: None,
            list_price: None,
        };
        let mut e = entry(4, 1);
        e.details = Some(details.clone());
        let out = run(&[], &selection(vec![(3, e)]));
        assert_eq!(out[0].product_details, Some(details));
    }

    #[test]
    fn test_empty_diff_refuses_event() {
        let err = reconcile(LINE, &[], &Selection::new(), Quantity::ONE)
            .into_event()
            .unwrap_err();
        assert!(err.is_noop());
    }

    #[test]
    fn test_event_keeps_line_item() {
        let event = reconcile(LINE, &[], &selection(vec![(3, entry(1, 1))]), Quantity::ONE)
            .into_event()
            .unwrap();
        assert_eq!(event.line_item_id, LINE);
        assert_eq!(event.len(), 1);
    }
}
