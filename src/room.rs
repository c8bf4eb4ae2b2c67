use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    domain::{LineItemId, MessageId, RequestedLineItem, RoomId, UserId},
    error::{NegotiationResult, RoomError},
    suggestion::{NegotiationEvent, SuggestionRecord},
};

pub mod binding;
pub mod memory;

/// The identity of a negotiation room.
///
/// A room is a pure function of this triple: the same key always resolves
/// to the same room, whatever the call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomKey {
    pub line_item_id: LineItemId,
    pub buyer_id: UserId,
    pub vendor_id: UserId,
}

/// The two sides of a negotiation, as known to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participants {
    pub buyer_id: Option<UserId>,
    pub vendor_id: Option<UserId>,
}

impl Participants {
    pub fn new(buyer_id: UserId, vendor_id: UserId) -> Self {
        Self {
            buyer_id: Some(buyer_id),
            vendor_id: Some(vendor_id),
        }
    }

    /// Binds the participants to a line item.
    ///
    /// # Errors
    /// A missing side, or the same account on both sides.
    pub fn bind(&self, line_item_id: LineItemId) -> Result<RoomKey, RoomError> {
        let buyer_id = self.buyer_id.ok_or(RoomError::MissingBuyer(line_item_id))?;
        let vendor_id = self
            .vendor_id
            .ok_or(RoomError::MissingVendor(line_item_id))?;
        if buyer_id == vendor_id {
            return Err(RoomError::SelfNegotiation {
                line_item_id,
                user_id: buyer_id,
            });
        }
        Ok(RoomKey {
            line_item_id,
            buyer_id,
            vendor_id,
        })
    }
}

impl From<&RequestedLineItem> for Participants {
    fn from(item: &RequestedLineItem) -> Self {
        Self {
            buyer_id: item.buyer_id,
            vendor_id: item.vendor_id,
        }
    }
}

/// Room lookup-or-creation request.
///
/// `suggested_products` seeds a room that is created by a suggestion event;
/// the chat service ignores it when the room already exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRequest {
    pub key: RoomKey,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggested_products: Vec<SuggestionRecord>,
}

/// Body of a room message. Suggestion events travel inline with ordinary chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageBody {
    Text { body: String },
    Suggestions { event: NegotiationEvent },
}

impl MessageBody {
    pub fn is_suggestions(&self) -> bool {
        matches!(self, Self::Suggestions { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMessage {
    pub sender_id: UserId,
    #[serde(flatten)]
    pub body: MessageBody,
}

/// The chat subsystem, as far as negotiation needs it.
///
/// `create_or_find_room` must be idempotent per [`RoomKey`]. Rooms are
/// append-only: posted messages are never edited or removed.
#[async_trait]
pub trait RoomService: Send + Sync {
    async fn create_or_find_room(&self, request: &RoomRequest) -> NegotiationResult<RoomId>;

    async fn post_message(
        &self,
        room_id: RoomId,
        message: RoomMessage,
    ) -> NegotiationResult<MessageId>;
}
