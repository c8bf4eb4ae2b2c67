use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use rfq_negotiation::prelude::*;
use time::macros::format_description;
use tracing::info;
use tracing_subscriber::EnvFilter;

const LINE: LineItemId = LineItemId(1);
const BUYER: UserId = UserId(10);
const VENDOR: UserId = UserId(20);

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let rooms = Arc::new(InMemoryRoomService::default());
    let notifier = Arc::new(BroadcastNotifier::new(16));
    let mut invalidations = notifier.subscribe();

    // ---------------------------------------------------------------- seller
    let config = NegotiationConfig::from_json(r#"{ "pageSize": 2, "searchDebounce": 300 }"#)?;
    let mut session = SubstitutionSession::open(
        line_item(),
        SuggestionBook::empty(LINE),
        config,
        Collaborators {
            catalog: Arc::new(DemoCatalog),
            rooms: rooms.clone(),
            notifier: notifier.clone(),
        },
    )?;

    if session.debounce_search().fired().await {
        session.search(Some("cable")).await?;
    }
    while session.pager().has_more() {
        session.load_more().await?;
    }
    info!(candidates = session.pager().candidates().len(), "Catalog loaded");

    session.toggle(ProductId(102))?;
    session.toggle(ProductId(103))?;
    session.set_offer_price(ProductId(103), Some(Price::new(1899, 2)))?;
    session.set_quantity(ProductId(103), Quantity(4))?;

    let SubmitOutcome::Sent { posted, event } = session.submit().await? else {
        return Err(anyhow!("first submission should not be empty"));
    };
    println!(
        "Seller sent {} suggestion(s) to room {}",
        event.len(),
        posted.room_id
    );

    let resubmit = session.submit().await?;
    println!("Immediate resubmit: {resubmit:?}");

    // ----------------------------------------------------------------- buyer
    let now = chrono::Utc::now();
    let mut board = PriceBoard::new(LINE, Some(BUYER));
    let mut server = PriceBoard::new(LINE, Some(BUYER));
    for (message_id, message) in rooms.thread(posted.room_id)? {
        if let MessageBody::Suggestions { event } = message.body {
            board.ingest(message_id, &event, now)?;
            server.ingest(message_id, &event, now)?;
        }
    }

    let endpoint = Arc::new(DemoEndpoint(Mutex::new(server)));
    let negotiator = PriceNegotiator::new(endpoint, notifier.clone());
    let (id, _) = board
        .current(ProductId(103))
        .context("priced suggestion should surface a proposal")?;

    let change = negotiator
        .transition(
            &mut board,
            TransitionCmd {
                id,
                status: PriceNegotiationStatus::Approved,
                user_id: BUYER,
            },
        )
        .await?;
    println!("Proposal {} is now {}", change.id, change.status);

    let again = negotiator
        .transition(
            &mut board,
            TransitionCmd {
                id,
                status: PriceNegotiationStatus::Rejected,
                user_id: BUYER,
            },
        )
        .await;
    if let Err(e) = again {
        println!("Second decision refused: {}", e.user_message().unwrap_or_default());
    }

    let book = session.close();
    println!("Confirmed suggestions: {}", book.len());

    while let Ok(key) = invalidations.try_recv() {
        println!("invalidate {key}");
    }
    Ok(())
}

// ================================================================================================
// Tracing Configuration
// ================================================================================================

fn init_tracing() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::NONE)
        .with_current_span(true)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let run = time::OffsetDateTime::now_utc()
        .format(&format_description!(
            "[year][month][day]-[hour][minute][second]"
        ))
        .context("Failed to format timestamp")?;
    info!(%run, "Negotiation demo started");
    Ok(())
}

// ================================================================================================
// Collaborators
// ================================================================================================

fn line_item() -> RequestedLineItem {
    RequestedLineItem {
        id: LINE,
        requested_product_id: ProductId(100),
        requested_quantity: Quantity(4),
        requested_offer_price: Some(Price::new(2000, 2)),
        buyer_id: Some(BUYER),
        vendor_id: Some(VENDOR),
    }
}

struct DemoCatalog;

#[async_trait]
impl CatalogService for DemoCatalog {
    async fn list_vendor_products(
        &self,
        _vendor_id: UserId,
        page: u32,
        limit: u32,
        term: Option<&str>,
    ) -> NegotiationResult<CatalogPage> {
        let all = [
            (101, "HDMI cable 1m", 799),
            (102, "HDMI cable 2m", 1099),
            (103, "HDMI cable 3m braided", 1999),
            (104, "USB-C hub", 3499),
        ];
        let matching: Vec<Candidate> = all
            .iter()
            .filter(|(_, name, _)| term.is_none_or(|t| name.to_lowercase().contains(t)))
            .map(|&(id, name, cents)| Candidate {
                id: ProductId(id),
                name: name.to_string(),
                image: None,
                list_price: Some(Price::new(cents, 2)),
            })
            .collect();
        let total_count = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(((page - 1) * limit) as usize)
            .take(limit as usize)
            .collect();
        Ok(CatalogPage { items, total_count })
    }
}

struct DemoEndpoint(Mutex<PriceBoard>);

#[async_trait]
impl PriceStatusEndpoint for DemoEndpoint {
    async fn update_status(&self, cmd: &TransitionCmd) -> NegotiationResult<StatusAck> {
        let change = self
            .0
            .lock()
            .map_err(|e| SystemError::LockPoisoned(e.to_string()))?
            .transition(cmd, chrono::Utc::now())?;
        Ok(StatusAck {
            status: change.status,
            updated_at: change.updated_at,
        })
    }
}
