use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{LineItemId, Price, ProductId, ProposalId, Quantity, UserId},
    error::ConflictError,
    negotiation::{Decision, PriceNegotiationStatus},
};

// ================================================================================================
// Typestate
// ================================================================================================

pub trait ProposalState: Debug + Clone + Send + Sync + 'static {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pending {
    surfaced_at: DateTime<Utc>,
}

impl Pending {
    pub fn surfaced_at(&self) -> DateTime<Utc> {
        self.surfaced_at
    }
}

impl ProposalState for Pending {}

/// Terminal state data shared by both verdicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    surfaced_at: DateTime<Utc>,
    decided_at: DateTime<Utc>,
    decided_by: UserId,
}

impl Verdict {
    pub fn surfaced_at(&self) -> DateTime<Utc> {
        self.surfaced_at
    }

    pub fn decided_at(&self) -> DateTime<Utc> {
        self.decided_at
    }

    pub fn decided_by(&self) -> UserId {
        self.decided_by
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approved(Verdict);

impl Approved {
    pub fn verdict(&self) -> &Verdict {
        &self.0
    }
}

impl ProposalState for Approved {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejected(Verdict);

impl Rejected {
    pub fn verdict(&self) -> &Verdict {
        &self.0
    }
}

impl ProposalState for Rejected {}

/// A price offered on one suggested product, as shown to the buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal<S: ProposalState> {
    id: ProposalId,
    line_item_id: LineItemId,
    product_id: ProductId,
    offer_price: Price,
    quantity: Quantity,
    state: S,
}

impl<S: ProposalState> Proposal<S> {
    pub fn id(&self) -> ProposalId {
        self.id
    }

    pub fn line_item_id(&self) -> LineItemId {
        self.line_item_id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn offer_price(&self) -> Price {
        self.offer_price
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn state(&self) -> &S {
        &self.state
    }
}

impl Proposal<Pending> {
    /// Every proposal starts out pending.
    pub fn surface(
        id: ProposalId,
        line_item_id: LineItemId,
        product_id: ProductId,
        offer_price: Price,
        quantity: Quantity,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            line_item_id,
            product_id,
            offer_price,
            quantity,
            state: Pending { surfaced_at: at },
        }
    }

    pub fn approve(self, by: UserId, at: DateTime<Utc>) -> Proposal<Approved> {
        let verdict = self.verdict(by, at);
        self.with_state(Approved(verdict))
    }

    pub fn reject(self, by: UserId, at: DateTime<Utc>) -> Proposal<Rejected> {
        let verdict = self.verdict(by, at);
        self.with_state(Rejected(verdict))
    }

    pub fn decide(self, decision: Decision, by: UserId, at: DateTime<Utc>) -> ProposalEntry {
        match decision {
            Decision::Approve => ProposalEntry::Approved(self.approve(by, at)),
            Decision::Reject => ProposalEntry::Rejected(self.reject(by, at)),
        }
    }

    fn verdict(&self, by: UserId, at: DateTime<Utc>) -> Verdict {
        Verdict {
            surfaced_at: self.state.surfaced_at,
            decided_at: at,
            decided_by: by,
        }
    }

    fn with_state<T: ProposalState>(self, state: T) -> Proposal<T> {
        Proposal {
            id: self.id,
            line_item_id: self.line_item_id,
            product_id: self.product_id,
            offer_price: self.offer_price,
            quantity: self.quantity,
            state,
        }
    }
}

// ================================================================================================
// Storage Wrapper (Enum)
// ================================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalEntry {
    Pending(Proposal<Pending>),
    Approved(Proposal<Approved>),
    Rejected(Proposal<Rejected>),
}

impl ProposalEntry {
    pub fn id(&self) -> ProposalId {
        match self {
            ProposalEntry::Pending(p) => p.id,
            ProposalEntry::Approved(p) => p.id,
            ProposalEntry::Rejected(p) => p.id,
        }
    }

    pub fn product_id(&self) -> ProductId {
        match self {
            ProposalEntry::Pending(p) => p.product_id,
            ProposalEntry::Approved(p) => p.product_id,
            ProposalEntry::Rejected(p) => p.product_id,
        }
    }

    pub fn offer_price(&self) -> Price {
        match self {
            ProposalEntry::Pending(p) => p.offer_price,
            ProposalEntry::Approved(p) => p.offer_price,
            ProposalEntry::Rejected(p) => p.offer_price,
        }
    }

    pub fn status(&self) -> PriceNegotiationStatus {
        match self {
            ProposalEntry::Pending(_) => PriceNegotiationStatus::Pending,
            ProposalEntry::Approved(_) => PriceNegotiationStatus::Approved,
            ProposalEntry::Rejected(_) => PriceNegotiationStatus::Rejected,
        }
    }

    pub fn verdict(&self) -> Option<&Verdict> {
        match self {
            ProposalEntry::Pending(_) => None,
            ProposalEntry::Approved(p) => Some(p.state.verdict()),
            ProposalEntry::Rejected(p) => Some(p.state.verdict()),
        }
    }
}

impl TryFrom<ProposalEntry> for Proposal<Pending> {
    type Error = ConflictError;

    fn try_from(entry: ProposalEntry) -> Result<Self, Self::Error> {
        match entry {
            ProposalEntry::Pending(p) => Ok(p),
            other => Err(ConflictError::AlreadyDecided {
                id: other.id(),
                status: other.status(),
            }),
        }
    }
}
