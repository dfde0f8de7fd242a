//! Escrow state tracker
//!
//! Read-only refresher for one chain's escrows: polls point-in-time state
//! at a bounded interval, deduplicates repeated observations of the same
//! transition, and never initiates writes. Deadlines handed to the tracker
//! come from escrow timelocks, not wall-clock request timeouts.

use crate::chain::ChainClient;
use crate::error::{ResolverError, ResolverResult};
use crate::swap::{EscrowRef, EscrowStatus, SwapId, SwapSide};

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

pub struct EscrowTracker {
    client: Arc<dyn ChainClient>,
    poll_interval: Duration,
}

impl EscrowTracker {
    pub fn new(client: Arc<dyn ChainClient>, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
        }
    }

    /// Poll until the escrow reaches (or passes) `target`, or `deadline`
    /// elapses. Returns the refreshed escrow view on success. Repeated
    /// observations of the same status are deduplicated; only transitions
    /// are reported.
    pub async fn wait_for_status(
        &self,
        swap_id: SwapId,
        side: SwapSide,
        escrow: &EscrowRef,
        target: EscrowStatus,
        deadline: Instant,
    ) -> ResolverResult<EscrowRef> {
        let mut last_seen = escrow.status;
        loop {
            if Instant::now() >= deadline {
                return Err(ResolverError::TimelockExpired {
                    swap_id: swap_id.to_string(),
                    side: side.to_string(),
                });
            }

            match self.client.escrow_state(escrow).await {
                Ok(refreshed) => {
                    if refreshed.status != last_seen {
                        info!(
                            "Swap {} {} escrow {} -> {}",
                            swap_id, side, last_seen, refreshed.status
                        );
                        last_seen = refreshed.status;
                    }
                    // A terminal status other than the target means the
                    // escrow can no longer reach it.
                    if refreshed.status.is_terminal() && refreshed.status != target {
                        return Err(ResolverError::EscrowNotReady {
                            swap_id: swap_id.to_string(),
                            side: side.to_string(),
                            status: refreshed.status.to_string(),
                        });
                    }
                    if status_reached(refreshed.status, target) {
                        return Ok(refreshed);
                    }
                }
                Err(e) if e.is_transient() => {
                    debug!("Swap {} {} escrow poll failed transiently: {}", swap_id, side, e);
                }
                Err(e) => return Err(e),
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Point-in-time refresh of one escrow.
    pub async fn refresh(&self, escrow: &EscrowRef) -> ResolverResult<EscrowRef> {
        self.client.escrow_state(escrow).await
    }
}

/// Whether `current` satisfies a wait for `target`: equal, or already past
/// it on the forward-only escrow lifecycle.
fn status_reached(current: EscrowStatus, target: EscrowStatus) -> bool {
    current == target || target.can_advance_to(current)
}
