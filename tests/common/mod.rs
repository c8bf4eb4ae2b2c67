#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rfq_negotiation::prelude::*;

pub const LINE: LineItemId = LineItemId(1001);
pub const BUYER: UserId = UserId(7);
pub const VENDOR: UserId = UserId(8);

pub fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .expect("valid RFC 3339 timestamp")
        .with_timezone(&Utc)
}

pub fn setup_line_item() -> RequestedLineItem {
    RequestedLineItem {
        id: LINE,
        requested_product_id: ProductId(1),
        requested_quantity: Quantity(20),
        requested_offer_price: Some(Price::new(1250, 2)),
        buyer_id: Some(BUYER),
        vendor_id: Some(VENDOR),
    }
}

pub fn candidate(id: u64) -> Candidate {
    Candidate {
        id: ProductId(id),
        name: format!("Substitute {id}"),
        image: Some(format!("https://cdn.example.test/{id}.png")),
        list_price: Some(Price::from(id as i64)),
    }
}

// ================================================================================================
// Catalog
// ================================================================================================

/// A vendor catalog of `total` products whose pages overlap by one item,
/// as happens when the catalog grows between two page fetches.
pub struct OverlappingCatalog {
    total: u64,
    calls: AtomicUsize,
}

impl OverlappingCatalog {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogService for OverlappingCatalog {
    async fn list_vendor_products(
        &self,
        _vendor_id: UserId,
        page: u32,
        limit: u32,
        term: Option<&str>,
    ) -> NegotiationResult<CatalogPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let matching: Vec<Candidate> = (1..=self.total)
            .map(candidate)
            .filter(|c| term.is_none_or(|t| c.name.contains(t)))
            .collect();

        let start = ((page as usize - 1) * limit as usize).saturating_sub(usize::from(page > 1));
        let items = matching
            .iter()
            .skip(start)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(CatalogPage {
            items,
            total_count: matching.len() as u64,
        })
    }
}

// ================================================================================================
// Rooms
// ================================================================================================

/// A chat service that is unreachable.
pub struct UnreachableRoomService;

#[async_trait]
impl RoomService for UnreachableRoomService {
    async fn create_or_find_room(&self, _request: &RoomRequest) -> NegotiationResult<RoomId> {
        Err(TransportError::Connection("chat service unreachable".into()).into())
    }

    async fn post_message(
        &self,
        _room_id: RoomId,
        _message: RoomMessage,
    ) -> NegotiationResult<MessageId> {
        Err(TransportError::Connection("chat service unreachable".into()).into())
    }
}

/// Suggestion events of a room with their message ids, in posting order.
pub fn events_in(
    rooms: &InMemoryRoomService,
    room_id: RoomId,
) -> Vec<(MessageId, NegotiationEvent)> {
    rooms
        .thread(room_id)
        .expect("room log readable")
        .into_iter()
        .filter_map(|(id, m)| match m.body {
            MessageBody::Suggestions { event } => Some((id, event)),
            MessageBody::Text { .. } => None,
        })
        .collect()
}

// ================================================================================================
// Notifications
// ================================================================================================

#[derive(Default)]
pub struct RecordingNotifier(Mutex<Vec<CacheKey>>);

impl RecordingNotifier {
    pub fn keys(&self) -> Vec<CacheKey> {
        self.0.lock().expect("notifier lock").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn invalidate(&self, key: CacheKey) {
        self.0.lock().expect("notifier lock").push(key);
    }
}

// ================================================================================================
// Price Status
// ================================================================================================

/// The server's authoritative board behind the price-status endpoint.
pub struct ServerEndpoint {
    board: Mutex<PriceBoard>,
    now: DateTime<Utc>,
    calls: AtomicUsize,
}

impl ServerEndpoint {
    pub fn new(board: PriceBoard, now: DateTime<Utc>) -> Self {
        Self {
            board: Mutex::new(board),
            now,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn status(&self, id: ProposalId) -> Option<PriceNegotiationStatus> {
        self.board.lock().expect("server board lock").status(id)
    }
}

#[async_trait]
impl PriceStatusEndpoint for ServerEndpoint {
    async fn update_status(&self, cmd: &TransitionCmd) -> NegotiationResult<StatusAck> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let change = self
            .board
            .lock()
            .expect("server board lock")
            .transition(cmd, self.now)?;
        Ok(StatusAck {
            status: change.status,
            updated_at: change.updated_at,
        })
    }
}

pub fn setup_collaborators(
    catalog: Arc<dyn CatalogService>,
    rooms: Arc<dyn RoomService>,
    notifier: Arc<dyn Notifier>,
) -> Collaborators {
    Collaborators {
        catalog,
        rooms,
        notifier,
    }
}
