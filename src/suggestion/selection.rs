use std::collections::{BTreeMap, btree_map};

use serde::{Deserialize, Serialize};

use crate::{
    domain::{Candidate, Price, ProductDetails, ProductId, Quantity},
    error::{NegotiationResult, ValidationError},
    suggestion::Suggestion,
};

/// Working-set entry for one candidate in the substitution picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionEntry {
    pub offer_price: Option<Price>,
    pub quantity: Quantity,
    /// Display data captured when the candidate was toggled from the catalog.
    /// Entries seeded from confirmed suggestions have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ProductDetails>,
}

impl SelectionEntry {
    pub fn new(offer_price: Option<Price>, quantity: Quantity) -> Self {
        Self {
            offer_price,
            quantity,
            details: None,
        }
    }
}

/// What a [`Selection::toggle`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Selected,
    Deselected,
}

/// The seller's ephemeral working set, keyed by suggested product.
///
/// Iteration is in ascending product id, which fixes the order of offer
/// records in the reconciled event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection(BTreeMap<ProductId, SelectionEntry>);

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the picker pre-populated with the confirmed suggestions.
    pub fn seed_from(existing: &[Suggestion], default_quantity: Quantity) -> Self {
        Self(
            existing
                .iter()
                .map(|s| {
                    (
                        s.suggested_product_id,
                        SelectionEntry::new(s.offer_price, s.effective_quantity(default_quantity)),
                    )
                })
                .collect(),
        )
    }

    /// Adds the candidate at its list price and the default quantity, or removes it if present.
    pub fn toggle(&mut self, candidate: &Candidate, default_quantity: Quantity) -> Toggle {
        match self.0.entry(candidate.id) {
            btree_map::Entry::Occupied(e) => {
                e.remove();
                Toggle::Deselected
            }
            btree_map::Entry::Vacant(e) => {
                e.insert(SelectionEntry {
                    offer_price: candidate.list_price,
                    quantity: default_quantity,
                    details: Some(candidate.details()),
                });
                Toggle::Selected
            }
        }
    }

    pub fn insert(&mut self, product_id: ProductId, entry: SelectionEntry) {
        self.0.insert(product_id, entry);
    }

    pub fn remove(&mut self, product_id: ProductId) -> Option<SelectionEntry> {
        self.0.remove(&product_id)
    }

    pub fn set_offer_price(
        &mut self,
        product_id: ProductId,
        price: Option<Price>,
    ) -> NegotiationResult<()> {
        self.entry_mut(product_id)?.offer_price = price;
        Ok(())
    }

    pub fn set_quantity(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> NegotiationResult<()> {
        self.entry_mut(product_id)?.quantity = quantity;
        Ok(())
    }

    pub fn get(&self, product_id: ProductId) -> Option<&SelectionEntry> {
        self.0.get(&product_id)
    }

    pub fn contains(&self, product_id: ProductId) -> bool {
        self.0.contains_key(&product_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ProductId, &SelectionEntry)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Every active entry offers at least one unit at a non-negative price.
    pub fn validate(&self) -> NegotiationResult<()> {
        for (&product_id, entry) in &self.0 {
            if entry.quantity.is_withdrawn() {
                return Err(ValidationError::InvalidQuantity {
                    product_id,
                    quantity: entry.quantity,
                }
                .into());
            }
            if let Some(price) = entry.offer_price.filter(Price::is_negative) {
                return Err(ValidationError::NegativePrice { product_id, price }.into());
            }
        }
        Ok(())
    }

    fn entry_mut(&mut self, product_id: ProductId) -> NegotiationResult<&mut SelectionEntry> {
        self.0
            .get_mut(&product_id)
            .ok_or_else(|| ValidationError::NotSelected(product_id).into())
    }
}

impl FromIterator<(ProductId, SelectionEntry)> for Selection {
    fn from_iter<I: IntoIterator<Item = (ProductId, SelectionEntry)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::NegotiationError;

    fn candidate(id: u64, price: Option<i64>) -> Candidate {
        Candidate {
            id: ProductId(id),
            name: format!("product-{id}"),
            image: None,
            list_price: price.map(Price::from),
        }
    }

    #[test]
    fn test_toggle_adds_then_removes() {
        let mut sel = Selection::new();
        let c = candidate(3, Some(20));

        assert_eq!(sel.toggle(&c, Quantity(2)), Toggle::Selected);
        let entry = sel.get(ProductId(3)).unwrap();
        assert_eq!(entry.offer_price, Some(Price::from(20)));
        assert_eq!(entry.quantity, Quantity(2));
        assert_eq!(entry.details.as_ref().unwrap().name, "product-3");

        assert_eq!(sel.toggle(&c, Quantity(2)), Toggle::Deselected);
        assert!(sel.is_empty());
    }

    #[test]
    fn test_seed_from_applies_default_quantity() {
        let existing = vec![
            Suggestion::new(ProductId(5)).with_offer_price(Price::from(10)),
            Suggestion::new(ProductId(6)).with_quantity(Quantity(4)),
        ];
        let sel = Selection::seed_from(&existing, Quantity(3));
        assert_eq!(sel.get(ProductId(5)).unwrap().quantity, Quantity(3));
        assert_eq!(sel.get(ProductId(6)).unwrap().quantity, Quantity(4));
        assert_eq!(sel.get(ProductId(6)).unwrap().offer_price, None);
    }

    #[test]
    fn test_edit_unselected_is_rejected() {
        let mut sel = Selection::new();
        let err = sel.set_quantity(ProductId(1), Quantity(2)).unwrap_err();
        assert!(matches!(
            err,
            NegotiationError::Validation(ValidationError::NotSelected(ProductId(1)))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_quantity() {
        let mut sel = Selection::new();
        sel.insert(ProductId(1), SelectionEntry::new(None, Quantity(0)));
        assert!(matches!(
            sel.validate(),
            Err(NegotiationError::Validation(ValidationError::InvalidQuantity { .. }))
        ));
    }

    #[test]
    fn test_validate_rejects_negative_price() {
        let mut sel = Selection::new();
        sel.insert(
            ProductId(1),
            SelectionEntry::new(Some(Price::from(-5)), Quantity(1)),
        );
        assert!(matches!(
            sel.validate(),
            Err(NegotiationError::Validation(ValidationError::NegativePrice { .. }))
        ));
    }

    #[test]
    fn test_validate_accepts_free_and_unpriced_entries() {
        let mut sel = Selection::new();
        sel.insert(ProductId(1), SelectionEntry::new(Some(Price::from(0)), Quantity(1)));
        sel.insert(ProductId(2), SelectionEntry::new(None, Quantity(1)));
        assert!(sel.validate().is_ok());
    }
}
