use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::sync::broadcast;

use crate::domain::{LineItemId, RoomId};

/// A cached view that must be refetched after a successful operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum CacheKey {
    /// The seller's and buyer's list of suggestions for a line item.
    #[strum(to_string = "line-item-suggestions:{0}")]
    LineItemSuggestions(LineItemId),

    /// The message thread of a negotiation room.
    #[strum(to_string = "room-thread:{0}")]
    RoomThread(RoomId),

    /// Price proposal statuses of a line item.
    #[strum(to_string = "price-status:{0}")]
    PriceStatus(LineItemId),
}

/// Fire-and-forget cache invalidation.
///
/// Called only after an operation has succeeded; implementations must not block.
pub trait Notifier: Send + Sync {
    fn invalidate(&self, key: CacheKey);
}

/// Drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn invalidate(&self, _key: CacheKey) {}
}

/// Fans invalidations out to any number of subscribers.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<CacheKey>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheKey> {
        self.tx.subscribe()
    }
}

impl Notifier for BroadcastNotifier {
    fn invalidate(&self, key: CacheKey) {
        // No subscribers is not an error: nobody has anything cached.
        if self.tx.send(key).is_err() {
            tracing::trace!(%key, "Invalidation dropped, no subscribers");
        }
    }
}
