use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::{
    domain::{ProposalId, UserId},
    error::{NegotiationResult, ValidationError},
};

pub mod board;
pub mod negotiator;
pub mod proposal;

/// Lifecycle status of a buyer-facing price proposal.
///
/// ```md
/// Current State | Decision | Next State
/// --------------|----------|-----------
/// `Pending`     | approve  | `Approved`
/// `Pending`     | reject   | `Rejected`
/// `Approved`    | any      | refused (conflict)
/// `Rejected`    | any      | refused (conflict)
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceNegotiationStatus {
    Pending,
    Approved,
    Rejected,
}

impl PriceNegotiationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// The buyer's verdict on a pending proposal; the only transitions that exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Approve,
    Reject,
}

impl TryFrom<PriceNegotiationStatus> for Decision {
    type Error = ValidationError;

    fn try_from(status: PriceNegotiationStatus) -> Result<Self, Self::Error> {
        match status {
            PriceNegotiationStatus::Approved => Ok(Self::Approve),
            PriceNegotiationStatus::Rejected => Ok(Self::Reject),
            PriceNegotiationStatus::Pending => Err(ValidationError::InvalidTarget(status)),
        }
    }
}

impl From<Decision> for PriceNegotiationStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approve => Self::Approved,
            Decision::Reject => Self::Rejected,
        }
    }
}

/// A requested status transition, as sent to the price-status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionCmd {
    pub id: ProposalId,
    pub status: PriceNegotiationStatus,
    /// The buyer who acted.
    pub user_id: UserId,
}

/// The endpoint's acknowledgement of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusAck {
    pub status: PriceNegotiationStatus,
    pub updated_at: DateTime<Utc>,
}

/// Server side of the transition contract.
///
/// Implementations report unknown or already-decided proposals as
/// [`crate::error::ConflictError`] and network failures as
/// [`crate::error::TransportError`].
#[async_trait]
pub trait PriceStatusEndpoint: Send + Sync {
    async fn update_status(&self, cmd: &TransitionCmd) -> NegotiationResult<StatusAck>;
}
