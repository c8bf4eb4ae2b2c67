use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Single-shot cancellable timer for search-as-you-type.
///
/// Each [`Debouncer::trigger`] cancels the ticket handed out before it, so
/// of a burst of keystrokes only the last one fires.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<CancellationToken>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn trigger(&mut self) -> DebounceTicket {
        self.cancel();
        let token = CancellationToken::new();
        self.pending = Some(token.clone());

        tracing::trace!(delay = %humantime::format_duration(self.delay), "Debounce armed");
        DebounceTicket {
            delay: self.delay,
            token,
        }
    }

    /// Cancels the outstanding ticket, if any.
    pub fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Debug)]
#[must_use = "a ticket does nothing unless awaited"]
pub struct DebounceTicket {
    delay: Duration,
    token: CancellationToken,
}

impl DebounceTicket {
    /// Resolves `true` once the delay elapsed, `false` if the ticket was superseded first.
    pub async fn fired(self) -> bool {
        tokio::select! {
        _ = self.token.cancelled() => false,
        _ = tokio::time::sleep(self.delay) => !self.token.is_cancelled(),
        }
    }
}
