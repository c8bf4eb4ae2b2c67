// 1. Traits
pub use crate::catalog::CatalogService;
pub use crate::negotiation::PriceStatusEndpoint;
pub use crate::notify::Notifier;
pub use crate::room::RoomService;

// 2. Seller Side
pub use crate::catalog::{
    CatalogPage, PageRequest,
    debounce::{DebounceTicket, Debouncer},
    pager::{CandidatePager, PageOutcome},
};
pub use crate::session::{Collaborators, SubmitOutcome, SubstitutionSession};
pub use crate::suggestion::{
    NegotiationEvent, Suggestion, SuggestionBook, SuggestionRecord,
    reconcile::{Change, ChangeKind, Reconciliation, reconcile},
    selection::{Selection, SelectionEntry, Toggle},
};

// 3. Buyer Side
pub use crate::negotiation::{
    Decision, PriceNegotiationStatus, StatusAck, TransitionCmd,
    board::{BoardUpdate, PriceBoard, StatusChange},
    negotiator::PriceNegotiator,
    proposal::{Approved, Pending, Proposal, ProposalEntry, Rejected},
};

// 4. Rooms & Notifications
pub use crate::notify::{BroadcastNotifier, CacheKey, NoopNotifier};
pub use crate::room::{
    MessageBody, Participants, RoomKey, RoomMessage, RoomRequest,
    binding::{Posted, RoomBinding},
    memory::InMemoryRoomService,
};

// 5. Domain Types
pub use crate::domain::{
    Candidate, LineItemId, MessageId, Price, ProductDetails, ProductId, ProposalId, Quantity,
    RequestedLineItem, RoomId, SuggestionId, UserId,
};

// 6. Errors & Config
pub use crate::config::NegotiationConfig;
pub use crate::error::{
    ConflictError, NegotiationError, NegotiationResult, RoomError, SystemError, TransportError,
    ValidationError,
};
