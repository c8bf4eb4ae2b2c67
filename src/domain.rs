use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{define_id, impl_display_inner, impl_from_primitive};

// ================================================================================================
// Identifiers
// ================================================================================================

define_id!(
    /// A single requested product within an RFQ; the anchor of every negotiation.
    LineItemId
);

define_id!(
    /// A catalog product, used both for the requested product and for substitutes.
    ProductId
);

define_id!(
    /// Server-assigned id of a persisted suggestion.
    SuggestionId
);

define_id!(
    /// A marketplace account (buyer or vendor).
    UserId
);

define_id!(
    /// The durable conversation bound to one line item.
    RoomId
);

define_id!(
    /// A message appended to a negotiation room.
    MessageId
);

define_id!(
    /// A buyer-facing price proposal derived from a priced suggestion.
    ProposalId
);

// ================================================================================================
// Monetary & Quantity Types
// ================================================================================================

/// An offer price in the marketplace currency.
///
/// Wraps a [`Decimal`] so that `10` and `10.00` compare equal and no
/// floating-point drift can turn an unchanged price into a spurious update.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Price(pub Decimal);
impl_from_primitive!(Price, Decimal);
impl_display_inner!(Price);

impl Price {
    /// Builds a price from an integer mantissa and a decimal scale.
    ///
    /// `Price::new(1050, 2)` is 10.50.
    pub fn new(num: i64, scale: u32) -> Self {
        Self(Decimal::new(num, scale))
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
}

impl From<i64> for Price {
    fn from(value: i64) -> Self {
        Self(Decimal::from(value))
    }
}

/// A whole number of units.
///
/// On the wire `0` is reserved: it marks a withdrawn suggestion (a tombstone),
/// never an active offer for zero units.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Quantity(pub u32);
impl_from_primitive!(Quantity, u32);
impl_display_inner!(Quantity);

impl Quantity {
    /// The tombstone sentinel.
    pub const WITHDRAWN: Self = Self(0);
    pub const ONE: Self = Self(1);

    pub fn is_withdrawn(&self) -> bool {
        self.0 == 0
    }
}

// ================================================================================================
// RFQ Entities
// ================================================================================================

/// The buyer's originally requested product within an RFQ.
///
/// Owned by the RFQ subsystem and immutable once created. Buyer and vendor
/// may be absent when the record was loaded without its counterparties; the
/// room binding refuses to negotiate on such a line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestedLineItem {
    pub id: LineItemId,
    pub requested_product_id: ProductId,
    pub requested_quantity: Quantity,
    pub requested_offer_price: Option<Price>,
    pub buyer_id: Option<UserId>,
    pub vendor_id: Option<UserId>,
}

/// Display data shipped alongside a newly suggested product so the buyer can
/// render it without a catalog round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetails {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_price: Option<Price>,
}

/// A product from the vendor's own catalog offered as a substitution candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub list_price: Option<Price>,
}

impl Candidate {
    pub fn details(&self) -> ProductDetails {
        ProductDetails {
            name: self.name.clone(),
            image: self.image.clone(),
            list_price: self.list_price,
        }
    }
}
