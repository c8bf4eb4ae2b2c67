use std::sync::Arc;

use crate::{
    error::NegotiationResult,
    negotiation::{
        PriceStatusEndpoint, TransitionCmd,
        board::{PriceBoard, StatusChange},
    },
    notify::{CacheKey, Notifier},
};

/// Drives buyer decisions on price proposals through the status endpoint.
///
/// A transition the board already refuses never reaches the network. The
/// board is only updated once the endpoint has acknowledged, and a failed
/// call leaves the proposal pending; retrying is up to the user.
#[derive(Clone)]
pub struct PriceNegotiator {
    endpoint: Arc<dyn PriceStatusEndpoint>,
    notifier: Arc<dyn Notifier>,
}

impl PriceNegotiator {
    pub fn new(endpoint: Arc<dyn PriceStatusEndpoint>, notifier: Arc<dyn Notifier>) -> Self {
        Self { endpoint, notifier }
    }

    #[tracing::instrument(
        skip(self, board),
        fields(line_item = %board.line_item_id(), proposal = %cmd.id, target = %cmd.status),
        err
    )]
    pub async fn transition(
        &self,
        board: &mut PriceBoard,
        cmd: TransitionCmd,
    ) -> NegotiationResult<StatusChange> {
        board.check(&cmd)?;

        let ack = self.endpoint.update_status(&cmd).await?;
        let change = board.acknowledge(&cmd, &ack)?;

        self.notifier
            .invalidate(CacheKey::PriceStatus(board.line_item_id()));
        Ok(change)
    }
}

impl std::fmt::Debug for PriceNegotiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceNegotiator").finish_non_exhaustive()
    }
}
