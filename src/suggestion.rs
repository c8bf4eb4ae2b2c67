use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    domain::{LineItemId, Price, ProductDetails, ProductId, Quantity, SuggestionId},
    error::{NegotiationResult, ValidationError},
};

pub mod reconcile;
pub mod selection;

// ================================================================================================
// Persisted Suggestions
// ================================================================================================

/// A seller's server-confirmed proposal to substitute a product for a line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub suggested_product_id: ProductId,
    #[serde(default)]
    pub offer_price: Option<Price>,
    #[serde(default)]
    pub quantity: Option<Quantity>,
    /// Absent until the server has acknowledged the suggestion.
    #[serde(default)]
    pub id: Option<SuggestionId>,
}

impl Suggestion {
    pub fn new(suggested_product_id: ProductId) -> Self {
        Self {
            suggested_product_id,
            offer_price: None,
            quantity: None,
            id: None,
        }
    }

    pub fn with_offer_price(self, price: Price) -> Self {
        Self {
            offer_price: Some(price),
            ..self
        }
    }

    pub fn with_quantity(self, quantity: Quantity) -> Self {
        Self {
            quantity: Some(quantity),
            ..self
        }
    }

    pub fn with_id(self, id: SuggestionId) -> Self {
        Self {
            id: Some(id),
            ..self
        }
    }

    /// The quantity the suggestion effectively offers.
    pub fn effective_quantity(&self, default_quantity: Quantity) -> Quantity {
        self.quantity.unwrap_or(default_quantity)
    }
}

// ================================================================================================
// Wire Format
// ================================================================================================

/// One entry of a [`NegotiationEvent`].
///
/// A record with `quantity == 0` is a tombstone: the seller withdrew the
/// suggestion. Tombstones never carry a price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRecord {
    pub suggested_product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_price: Option<Price>,
    pub quantity: Quantity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_details: Option<ProductDetails>,
}

impl SuggestionRecord {
    pub fn offer(product_id: ProductId, offer_price: Option<Price>, quantity: Quantity) -> Self {
        Self {
            suggested_product_id: product_id,
            offer_price,
            quantity,
            product_details: None,
        }
    }

    pub fn withdrawal(product_id: ProductId) -> Self {
        Self {
            suggested_product_id: product_id,
            offer_price: None,
            quantity: Quantity::WITHDRAWN,
            product_details: None,
        }
    }

    pub fn with_details(self, details: Option<ProductDetails>) -> Self {
        Self {
            product_details: details,
            ..self
        }
    }

    pub fn is_withdrawal(&self) -> bool {
        self.quantity.is_withdrawn()
    }
}

/// The unit sent over the wire: an ordered batch of suggestion changes for one line item.
///
/// Only ever produced by [`reconcile::Reconciliation::into_event`], so an
/// event is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiationEvent {
    pub line_item_id: LineItemId,
    pub suggestions: Vec<SuggestionRecord>,
}

impl NegotiationEvent {
    pub fn records(&self) -> &[SuggestionRecord] {
        &self.suggestions
    }

    pub fn len(&self) -> usize {
        self.suggestions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suggestions.is_empty()
    }

    pub fn withdrawals(&self) -> impl Iterator<Item = &SuggestionRecord> {
        self.suggestions.iter().filter(|r| r.is_withdrawal())
    }

    pub fn offers(&self) -> impl Iterator<Item = &SuggestionRecord> {
        self.suggestions.iter().filter(|r| !r.is_withdrawal())
    }
}

// ================================================================================================
// Confirmed Set
// ================================================================================================

/// The server-confirmed suggestions of one line item.
///
/// Holds at most one suggestion per product. Order is the order in which the
/// server first reported each suggestion; tombstones are emitted in this order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestionBook {
    line_item_id: LineItemId,
    // Vec keeps arrival order; N is a handful per line item so linear scans are fine.
    entries: Vec<Suggestion>,
}

impl SuggestionBook {
    pub fn empty(line_item_id: LineItemId) -> Self {
        Self {
            line_item_id,
            entries: Vec::new(),
        }
    }

    /// Builds the book from a server snapshot, refusing snapshots that list a product twice.
    pub fn from_snapshot(
        line_item_id: LineItemId,
        suggestions: Vec<Suggestion>,
    ) -> NegotiationResult<Self> {
        if let Some(dup) = suggestions
            .iter()
            .map(|s| s.suggested_product_id)
            .duplicates()
            .next()
        {
            return Err(ValidationError::DuplicateSuggestion(dup).into());
        }
        Ok(Self {
            line_item_id,
            entries: suggestions,
        })
    }

    pub fn line_item_id(&self) -> LineItemId {
        self.line_item_id
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.entries
    }

    pub fn get(&self, product_id: ProductId) -> Option<&Suggestion> {
        self.entries
            .iter()
            .find(|s| s.suggested_product_id == product_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Folds an acknowledged event into the confirmed set.
    ///
    /// Offers upsert (keeping the persisted id of an existing suggestion),
    /// tombstones remove.
    pub fn apply(&mut self, event: &NegotiationEvent) {
        for record in event.records() {
            let pos = self
                .entries
                .iter()
                .position(|s| s.suggested_product_id == record.suggested_product_id);

            match (pos, record.is_withdrawal()) {
                (Some(pos), true) => {
                    self.entries.remove(pos);
                }
                (None, true) => {
                    tracing::debug!(
                        product = %record.suggested_product_id,
                        "Tombstone for unknown suggestion ignored"
                    );
                }
                (Some(pos), false) => {
                    let entry = &mut self.entries[pos];
                    entry.offer_price = record.offer_price;
                    entry.quantity = Some(record.quantity);
                }
                (None, false) => self.entries.push(Suggestion {
                    suggested_product_id: record.suggested_product_id,
                    offer_price: record.offer_price,
                    quantity: Some(record.quantity),
                    id: None,
                }),
            }
        }
    }
}
