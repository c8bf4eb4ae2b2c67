//! Negotiation core for product substitutions on marketplace RFQs.
//!
//! A vendor answers a requested line item with substitute products from
//! their own catalog. The working selection is reconciled against the
//! confirmed suggestions into a minimal event, posted into the line item's
//! negotiation room, and surfaced to the buyer as price proposals that can
//! be approved or rejected exactly once.

mod macros;

pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod negotiation;
pub mod notify;
pub mod prelude;
pub mod room;
pub mod session;
pub mod suggestion;
