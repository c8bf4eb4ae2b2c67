use std::{collections::HashMap, sync::Arc};

use crate::{
    domain::{LineItemId, MessageId, RoomId, UserId},
    error::{NegotiationError, NegotiationResult, RoomError},
    room::{MessageBody, Participants, RoomKey, RoomMessage, RoomRequest, RoomService},
    suggestion::NegotiationEvent,
};

/// A message accepted by the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posted {
    pub room_id: RoomId,
    pub message_id: MessageId,
}

/// Resolves line items to their negotiation rooms and posts into them.
///
/// Resolved rooms are memoised per [`RoomKey`], so repeated sends for the
/// same line item hit the chat service's lookup only once.
pub struct RoomBinding {
    service: Arc<dyn RoomService>,
    resolved: HashMap<RoomKey, RoomId>,
}

impl RoomBinding {
    pub fn new(service: Arc<dyn RoomService>) -> Self {
        Self {
            service,
            resolved: HashMap::new(),
        }
    }

    /// The memoised room for `key`, if it has been resolved before.
    pub fn cached(&self, key: &RoomKey) -> Option<RoomId> {
        self.resolved.get(key).copied()
    }

    /// Finds the room of a line item, creating it on first use.
    ///
    /// # Errors
    /// [`RoomError`] when the participants cannot be bound; the chat service
    /// is not contacted in that case.
    #[tracing::instrument(
        skip(self, participants, request_seed),
        fields(line_item = %line_item_id),
        err
    )]
    pub async fn resolve_or_create(
        &mut self,
        line_item_id: LineItemId,
        participants: &Participants,
        request_seed: Option<&NegotiationEvent>,
    ) -> NegotiationResult<RoomId> {
        let key = participants.bind(line_item_id)?;

        if let Some(room_id) = self.cached(&key) {
            return Ok(room_id);
        }

        let request = RoomRequest {
            key,
            suggested_products: request_seed
                .map(|e| e.suggestions.clone())
                .unwrap_or_default(),
        };
        let room_id = self
            .service
            .create_or_find_room(&request)
            .await
            .map_err(|e| match e {
                NegotiationError::Transport(_) | NegotiationError::Room(_) => e,
                other => RoomError::Unresolved {
                    line_item_id,
                    msg: other.to_string(),
                }
                .into(),
            })?;

        tracing::info!(
            %room_id,
            buyer = %key.buyer_id,
            vendor = %key.vendor_id,
            "Negotiation room resolved"
        );
        self.resolved.insert(key, room_id);
        Ok(room_id)
    }

    /// Posts a suggestion event from the vendor into the line item's room.
    ///
    /// Nothing is posted unless the room resolves first.
    pub async fn post_suggestions(
        &mut self,
        participants: &Participants,
        event: NegotiationEvent,
    ) -> NegotiationResult<Posted> {
        let room_id = self
            .resolve_or_create(event.line_item_id, participants, Some(&event))
            .await?;
        let sender_id = participants
            .vendor_id
            .ok_or(RoomError::MissingVendor(event.line_item_id))?;

        let records = event.len();
        let message_id = self
            .service
            .post_message(
                room_id,
                RoomMessage {
                    sender_id,
                    body: MessageBody::Suggestions { event },
                },
            )
            .await?;

        tracing::debug!(%room_id, %message_id, records, "Suggestion event posted");
        Ok(Posted {
            room_id,
            message_id,
        })
    }

    /// Posts an ordinary chat message into the line item's room.
    pub async fn post_text(
        &mut self,
        line_item_id: LineItemId,
        participants: &Participants,
        sender_id: UserId,
        body: String,
    ) -> NegotiationResult<Posted> {
        let room_id = self
            .resolve_or_create(line_item_id, participants, None)
            .await?;
        let message_id = self
            .service
            .post_message(
                room_id,
                RoomMessage {
                    sender_id,
                    body: MessageBody::Text { body },
                },
            )
            .await?;
        Ok(Posted {
            room_id,
            message_id,
        })
    }
}

impl std::fmt::Debug for RoomBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomBinding")
            .field("resolved", &self.resolved)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::{
        domain::{Price, ProductId, Quantity},
        error::SystemError,
        room::memory::InMemoryRoomService,
        suggestion::SuggestionRecord,
    };

    /// A chat service whose room lookup breaks internally.
    #[derive(Default)]
    struct BrokenLookup {
        posts: AtomicUsize,
    }

    #[async_trait]
    impl RoomService for BrokenLookup {
        async fn create_or_find_room(&self, _request: &RoomRequest) -> NegotiationResult<RoomId> {
            Err(SystemError::InvariantViolation("room index corrupted".into()).into())
        }

        async fn post_message(
            &self,
            _room_id: RoomId,
            _message: RoomMessage,
        ) -> NegotiationResult<MessageId> {
            self.posts.fetch_add(1, Ordering::SeqCst);
            Ok(MessageId(1))
        }
    }

    const LINE: LineItemId = LineItemId(11);

    fn participants() -> Participants {
        Participants::new(UserId(1), UserId(2))
    }

    fn event() -> NegotiationEvent {
        NegotiationEvent {
            line_item_id: LINE,
            suggestions: vec![SuggestionRecord::offer(
                ProductId(7),
                Some(Price::from(15)),
                Quantity(3),
            )],
        }
    }

    #[tokio::test]
    async fn test_resolve_twice_returns_same_room() {
        let service = Arc::new(InMemoryRoomService::default());
        let mut binding = RoomBinding::new(service.clone());

        let a = binding.resolve_or_create(LINE, &participants(), None).await.unwrap();
        let b = binding.resolve_or_create(LINE, &participants(), None).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(service.room_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_independent_bindings_share_room() {
        let service = Arc::new(InMemoryRoomService::default());
        let a = RoomBinding::new(service.clone())
            .resolve_or_create(LINE, &participants(), None)
            .await
            .unwrap();
        let b = RoomBinding::new(service.clone())
            .resolve_or_create(LINE, &participants(), Some(&event()))
            .await
            .unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_unbound_participants_post_nothing() {
        let service = Arc::new(InMemoryRoomService::default());
        let mut binding = RoomBinding::new(service.clone());
        let missing_buyer = Participants {
            buyer_id: None,
            vendor_id: Some(UserId(2)),
        };

        let err = binding
            .post_suggestions(&missing_buyer, event())
            .await
            .unwrap_err();
        assert!(matches!(err, NegotiationError::Room(RoomError::MissingBuyer(_))));
        assert_eq!(service.room_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_unresolved_room() {
        let service = Arc::new(BrokenLookup::default());
        let mut binding = RoomBinding::new(service.clone());

        let err = binding
            .post_suggestions(&participants(), event())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NegotiationError::Room(RoomError::Unresolved {
                line_item_id: LINE,
                ..
            })
        ));
        assert!(err.to_string().contains("room index corrupted"));
        assert_eq!(service.posts.load(Ordering::SeqCst), 0);
        assert!(binding.resolved.is_empty());
    }

    #[tokio::test]
    async fn test_suggestions_and_text_share_the_thread() {
        let service = Arc::new(InMemoryRoomService::default());
        let mut binding = RoomBinding::new(service.clone());

        let first = binding.post_suggestions(&participants(), event()).await.unwrap();
        let second = binding
            .post_text(LINE, &participants(), UserId(1), "Looks good".into())
            .await
            .unwrap();
        assert_eq!(first.room_id, second.room_id);

        let log = service.messages(first.room_id).unwrap();
        assert_eq!(log.len(), 2);
        assert!(log[0].body.is_suggestions());
        assert_eq!(log[0].sender_id, UserId(2));
        assert!(!log[1].body.is_suggestions());
    }
}
