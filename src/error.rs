use thiserror::Error;

use crate::{
    domain::{LineItemId, Price, ProductId, ProposalId, Quantity, UserId},
    negotiation::PriceNegotiationStatus,
};

pub type NegotiationResult<T> = Result<T, NegotiationError>;

#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    System(#[from] SystemError),
}

impl NegotiationError {
    /// Only network failures are worth retrying, and only on explicit user action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// True for the empty-diff signal, which callers swallow silently.
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::Validation(ValidationError::EmptyDiff))
    }

    /// The text shown to the user when an operation is refused.
    ///
    /// Returns `None` for the empty-diff signal: a no-op submit shows nothing.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::Validation(ValidationError::EmptyDiff) => None,
            Self::Validation(_) => Some("Please check the quantities and prices you entered."),
            Self::Conflict(_) => Some("This offer has already been decided."),
            Self::Room(_) => Some("The conversation for this request could not be opened."),
            Self::Transport(_) => Some("Something went wrong. Please try again."),
            Self::System(_) => Some("Something went wrong. Please try again."),
        }
    }
}

/// Errors raised before any network call is made.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Nothing changed since the last submitted suggestions")]
    EmptyDiff,

    #[error("Invalid quantity {quantity} for product {product_id}: must be at least 1")]
    InvalidQuantity {
        product_id: ProductId,
        quantity: Quantity,
    },

    #[error("Invalid offer price {price} for product {product_id}: must not be negative")]
    NegativePrice { product_id: ProductId, price: Price },

    #[error("Product {0} is not part of the current selection")]
    NotSelected(ProductId),

    #[error("Product {0} is not among the loaded candidates")]
    UnknownCandidate(ProductId),

    #[error("Duplicate suggestion for product {0}")]
    DuplicateSuggestion(ProductId),

    #[error("Status {0} is not a valid transition target")]
    InvalidTarget(PriceNegotiationStatus),

    #[error("Invalid negotiation configuration: {0}")]
    InvalidConfig(String),
}

/// A state-machine transition that the current state refuses.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConflictError {
    #[error("Unknown price proposal {0}")]
    UnknownProposal(ProposalId),

    #[error("Price proposal {id} was already {status}")]
    AlreadyDecided {
        id: ProposalId,
        status: PriceNegotiationStatus,
    },
}

/// Failure to bind a line item and its participants to a negotiation room.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoomError {
    #[error("Line item {0} has no buyer")]
    MissingBuyer(LineItemId),

    #[error("Line item {0} has no vendor")]
    MissingVendor(LineItemId),

    #[error("Line item {line_item_id}: buyer and vendor are the same account ({user_id})")]
    SelfNegotiation {
        line_item_id: LineItemId,
        user_id: UserId,
    },

    #[error("Room service could not resolve a room for line item {line_item_id}: {msg}")]
    Unresolved { line_item_id: LineItemId, msg: String },
}

/// Network failures talking to an external collaborator.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request failed with status {code}: {msg}")]
    Status { code: u16, msg: String },

    #[error("Failed to encode or decode payload")]
    Encoding(#[from] serde_json::Error),
}

/// Errors related to internal invariants and access control.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SystemError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}
