use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};

use crate::{
    domain::Quantity,
    error::{NegotiationResult, ValidationError},
};

/// Tuning knobs of a substitution session.
///
/// # Example
///
/// ```
/// # use rfq_negotiation::prelude::*;
/// # use std::time::Duration;
/// let cfg = NegotiationConfig::default()
///     .with_page_size(25)
///     .with_search_debounce(Duration::from_millis(300));
/// assert!(cfg.validate().is_ok());
/// ```
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NegotiationConfig {
    /// Number of candidates requested per catalog page. A page shorter than
    /// this marks the end of the catalog.
    page_size: u32,

    /// Quantity assumed when a suggestion carries none, and the quantity a
    /// freshly toggled candidate starts with.
    default_quantity: Quantity,

    /// Quiet period after the last keystroke before a search is issued.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    search_debounce: Duration,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            default_quantity: Quantity::ONE,
            search_debounce: Duration::from_millis(500),
        }
    }
}

impl NegotiationConfig {
    pub fn with_page_size(self, page_size: u32) -> Self {
        Self { page_size, ..self }
    }

    pub fn with_default_quantity(self, default_quantity: Quantity) -> Self {
        Self {
            default_quantity,
            ..self
        }
    }

    pub fn with_search_debounce(self, search_debounce: Duration) -> Self {
        Self {
            search_debounce,
            ..self
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn default_quantity(&self) -> Quantity {
        self.default_quantity
    }

    pub fn search_debounce(&self) -> Duration {
        self.search_debounce
    }

    pub fn validate(&self) -> NegotiationResult<()> {
        if self.page_size == 0 {
            return Err(
                ValidationError::InvalidConfig("page size must be at least 1".into()).into(),
            );
        }
        if self.default_quantity.is_withdrawn() {
            return Err(ValidationError::InvalidConfig(
                "default quantity must be at least 1".into(),
            )
            .into());
        }
        Ok(())
    }

    /// Parses and validates a JSON configuration document. Missing fields take their defaults.
    pub fn from_json(raw: &str) -> NegotiationResult<Self> {
        let cfg: Self = serde_json::from_str(raw)
            .map_err(|e| ValidationError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

impl fmt::Display for NegotiationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "page_size={} default_quantity={} search_debounce={}",
            self.page_size,
            self.default_quantity,
            humantime::format_duration(self.search_debounce)
        )
    }
}
