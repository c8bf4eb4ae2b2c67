use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;

use crate::{
    domain::{MessageId, RoomId},
    error::{NegotiationResult, SystemError},
    room::{RoomKey, RoomMessage, RoomRequest, RoomService},
};

#[derive(Debug, Default)]
struct Inner {
    rooms: HashMap<RoomKey, RoomId>,
    logs: HashMap<RoomId, Vec<(MessageId, RoomMessage)>>,
    next_room: u64,
    next_message: u64,
}

/// A process-local chat service.
///
/// Backs the demo and tests. Rooms are keyed by [`RoomKey`] and their logs
/// only ever grow.
#[derive(Debug, Default)]
pub struct InMemoryRoomService {
    inner: Mutex<Inner>,
}

impl InMemoryRoomService {
    fn lock(&self) -> NegotiationResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|e| SystemError::LockPoisoned(e.to_string()).into())
    }

    pub fn room_count(&self) -> NegotiationResult<usize> {
        Ok(self.lock()?.rooms.len())
    }

    pub fn room_of(&self, key: &RoomKey) -> NegotiationResult<Option<RoomId>> {
        Ok(self.lock()?.rooms.get(key).copied())
    }

    /// Messages of a room with their ids, in posting order.
    pub fn thread(&self, room_id: RoomId) -> NegotiationResult<Vec<(MessageId, RoomMessage)>> {
        Ok(self
            .lock()?
            .logs
            .get(&room_id)
            .cloned()
            .unwrap_or_default())
    }

    /// Messages of a room in posting order.
    pub fn messages(&self, room_id: RoomId) -> NegotiationResult<Vec<RoomMessage>> {
        Ok(self.thread(room_id)?.into_iter().map(|(_, m)| m).collect())
    }
}

#[async_trait]
impl RoomService for InMemoryRoomService {
    async fn create_or_find_room(&self, request: &RoomRequest) -> NegotiationResult<RoomId> {
        let mut inner = self.lock()?;
        if let Some(room_id) = inner.rooms.get(&request.key) {
            return Ok(*room_id);
        }

        inner.next_room += 1;
        let room_id = RoomId(inner.next_room);
        inner.rooms.insert(request.key, room_id);
        inner.logs.insert(room_id, Vec::new());

        tracing::debug!(
            %room_id,
            line_item = %request.key.line_item_id,
            seeded = request.suggested_products.len(),
            "Room created"
        );
        Ok(room_id)
    }

    async fn post_message(
        &self,
        room_id: RoomId,
        message: RoomMessage,
    ) -> NegotiationResult<MessageId> {
        let mut inner = self.lock()?;
        inner.next_message += 1;
        let message_id = MessageId(inner.next_message);

        let log = inner.logs.get_mut(&room_id).ok_or_else(|| {
            SystemError::InvariantViolation(format!("message posted to unknown room {room_id}"))
        })?;
        log.push((message_id, message));
        Ok(message_id)
    }
}
