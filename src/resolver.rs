//! Cross-chain orchestrator
//!
//! Drives each swap through its state machine: source escrow, destination
//! escrow, secret reveal, mirrored withdrawal. Each swap is advanced by one
//! driver task reacting to chain events and timelock expirations; multiple
//! swaps proceed independently, serialized only per swap id through the
//! store's per-swap lock.

use crate::chain::{with_retry_counted, ChainClient, ChainEvent, EscrowParams, RetryPolicy};
use crate::config::ResolverConfig;
use crate::error::{ResolverError, ResolverResult};
use crate::metrics::{self, MetricsSnapshot, SwapMetrics};
use crate::secret::{Secret, SecretHash};
use crate::store::{SwapEntry, SwapStore};
use crate::swap::{
    Direction, EscrowStatus, OpKind, SwapContext, SwapId, SwapParams, SwapPhase, SwapStatus,
    SwapSide, SwapUpdate, TxRef,
};
use crate::tracker::EscrowTracker;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Orchestrator for cross-chain atomic swaps between two configured chains.
pub struct Resolver {
    config: ResolverConfig,
    chain_a: Arc<dyn ChainClient>,
    chain_b: Arc<dyn ChainClient>,
    store: SwapStore,
    metrics: Arc<SwapMetrics>,
    retry: RetryPolicy,
    shutdown_tx: watch::Sender<bool>,
    tasks: std::sync::Mutex<Vec<JoinHandle<()>>>,
    running: AtomicBool,
    started_at: DateTime<Utc>,
}

impl Resolver {
    pub fn new(
        config: ResolverConfig,
        chain_a: Arc<dyn ChainClient>,
        chain_b: Arc<dyn ChainClient>,
        metrics: Arc<SwapMetrics>,
    ) -> Arc<Self> {
        let retry = RetryPolicy::new(config.retry_max_attempts, config.retry_base_delay_ms);
        let store = SwapStore::new(config.max_concurrent_swaps);
        let (shutdown_tx, _) = watch::channel(false);
        Arc::new(Self {
            config,
            chain_a,
            chain_b,
            store,
            metrics,
            retry,
            shutdown_tx,
            tasks: std::sync::Mutex::new(Vec::new()),
            running: AtomicBool::new(true),
            started_at: Utc::now(),
        })
    }

    /// (source, dest) clients for a swap direction.
    fn legs(&self, direction: Direction) -> (Arc<dyn ChainClient>, Arc<dyn ChainClient>) {
        match direction {
            Direction::AToB => (self.chain_a.clone(), self.chain_b.clone()),
            Direction::BToA => (self.chain_b.clone(), self.chain_a.clone()),
        }
    }

    fn client_for(&self, chain_id: u64) -> ResolverResult<Arc<dyn ChainClient>> {
        if self.chain_a.chain_id() == chain_id {
            Ok(self.chain_a.clone())
        } else if self.chain_b.chain_id() == chain_id {
            Ok(self.chain_b.clone())
        } else {
            Err(ResolverError::ChainNotFound { chain_id })
        }
    }

    /// Validate a swap request, admit it, and start its driver task. The
    /// id returns synchronously; the swap proceeds asynchronously. A
    /// validation or capacity failure leaves no side effects anywhere.
    pub async fn initiate_swap(self: &Arc<Self>, params: SwapParams) -> ResolverResult<SwapId> {
        if !self.is_running() {
            return Err(ResolverError::Internal("resolver is stopped".to_string()));
        }
        params.validate(&self.config)?;

        let (src, dst) = self.legs(params.direction);
        if !src.validate_address(&params.source_counterparty) {
            return Err(ResolverError::InvalidParameter(format!(
                "invalid source counterparty address for chain {}",
                src.chain_id()
            )));
        }
        if !dst.validate_address(&params.dest_counterparty) {
            return Err(ResolverError::InvalidParameter(format!(
                "invalid dest counterparty address for chain {}",
                dst.chain_id()
            )));
        }

        let secret = Secret::generate();
        let ctx = SwapContext::new(params, secret, src.chain_id(), dst.chain_id());
        let id = ctx.id;
        let entry = self.store.admit(ctx)?;

        metrics::record_swap_initiated();
        metrics::record_active_swaps(self.store.active_count());
        info!("Swap {} initiated", id);

        let resolver = self.clone();
        let handle = tokio::spawn(async move {
            resolver.drive_swap(entry).await;
        });
        let mut tasks = self.tasks.lock().unwrap();
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);

        Ok(id)
    }

    /// Read-only snapshot. Never fails for a known swap id, including after
    /// the swap has failed.
    pub async fn get_status(&self, id: &SwapId) -> ResolverResult<SwapStatus> {
        let entry = self.store.get(id).ok_or_else(|| ResolverError::SwapNotFound {
            swap_id: id.to_string(),
        })?;
        let ctx = entry.ctx.lock().await;
        Ok(ctx.status())
    }

    /// Subscribe to a swap's phase-change notifications. Dropping the
    /// monitor cancels observation only; the swap continues regardless.
    pub fn monitor_swap(&self, id: &SwapId) -> ResolverResult<SwapMonitor> {
        let entry = self.store.get(id).ok_or_else(|| ResolverError::SwapNotFound {
            swap_id: id.to_string(),
        })?;
        Ok(SwapMonitor {
            rx: entry.subscribe(),
        })
    }

    /// Submit the withdrawal for one side using the stored secret.
    /// Idempotent: a side already withdrawn returns the cached tx ref.
    pub async fn withdraw(&self, id: &SwapId, side: SwapSide) -> ResolverResult<TxRef> {
        let entry = self.store.get(id).ok_or_else(|| ResolverError::SwapNotFound {
            swap_id: id.to_string(),
        })?;
        self.do_withdraw(&entry, side).await
    }

    /// Gracefully drain driver tasks. On-chain escrows are untouched; a
    /// restarted resolver (or an operator) picks them up from chain state.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown_tx.send(true);
        let handles: Vec<_> = std::mem::take(&mut *self.tasks.lock().unwrap());
        for handle in handles {
            let _ = handle.await;
        }
        info!("Resolver stopped ({} swaps in store)", self.store.len());
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn active_swaps(&self) -> usize {
        self.store.active_count()
    }

    /// Operational snapshot for the status surface.
    pub async fn health(&self) -> HealthSnapshot {
        HealthSnapshot {
            is_running: self.is_running(),
            started_at: self.started_at,
            active_swaps: self.store.active_count(),
            total_swaps: self.store.len(),
            chains: vec![
                ChainHealth {
                    chain_id: self.chain_a.chain_id(),
                    name: self.chain_a.name().to_string(),
                    healthy: self.chain_a.health_check().await,
                },
                ChainHealth {
                    chain_id: self.chain_b.chain_id(),
                    name: self.chain_b.name().to_string(),
                    healthy: self.chain_b.health_check().await,
                },
            ],
            config: ConfigSummary {
                max_concurrent_swaps: self.config.max_concurrent_swaps,
                retry_max_attempts: self.config.retry_max_attempts,
                min_timelock_secs: self.config.min_timelock_secs,
                max_timelock_secs: self.config.max_timelock_secs,
                timelock_safety_margin_secs: self.config.timelock_safety_margin_secs,
            },
            metrics: self.metrics.snapshot(),
        }
    }

    // ---- driver -----------------------------------------------------------

    async fn drive_swap(self: Arc<Self>, entry: Arc<SwapEntry>) {
        let started = Instant::now();
        let (id, volume) = {
            let ctx = entry.ctx.lock().await;
            (ctx.id, ctx.params.amount)
        };

        let mut result = self.run_swap(&entry).await;

        // An unrecoverable error with an escrow still open on-chain must
        // not strand funds: run the secret-free cancellation path before
        // settling the outcome.
        if let Err(e) = &result {
            let funds_at_risk = {
                let mut ctx = entry.ctx.lock().await;
                ctx.last_error = Some(e.to_string());
                !ctx.phase.is_terminal()
                    && !ctx.secret_revealed
                    && [SwapSide::Source, SwapSide::Dest].iter().any(|side| {
                        matches!(
                            ctx.escrow(*side).status,
                            EscrowStatus::Created | EscrowStatus::Funded
                        )
                    })
            };
            if funds_at_risk {
                warn!("Swap {} failed with escrows still open, cancelling: {}", id, e);
                result = self.cancel_swap(&entry, "recovering escrows after failure").await;
            }
        }

        let phase = {
            let mut ctx = entry.ctx.lock().await;
            if let Err(e) = &result {
                ctx.last_error = Some(e.to_string());
                if !ctx.phase.is_terminal() {
                    // Unrecoverable: the swap stays in the store for
                    // operator recovery, flagged Failed.
                    if ctx.set_phase(SwapPhase::Failed).is_ok() {
                        error!("Swap {} failed: {}", id, e);
                    }
                }
            }
            ctx.phase
        };
        if let Err(e) = &result {
            entry.publish(SwapUpdate::new(id, phase, Some(e.to_string())));
        }

        match phase {
            SwapPhase::Completed => {
                let latency_ms = started.elapsed().as_millis() as u64;
                let display_volume = volume.low_u128() as f64 / 1e18;
                self.metrics.record_success(latency_ms, Some(display_volume));
                info!("Swap {} completed in {}ms", id, latency_ms);
            }
            SwapPhase::Cancelled | SwapPhase::Failed => {
                self.metrics.record_failure();
            }
            _ => {
                // Shutdown mid-flight; the slot stays occupied on purpose.
                debug!("Swap {} driver exiting at phase {}", id, phase);
            }
        }

        if phase.is_terminal() {
            self.store.release(&id);
            metrics::record_active_swaps(self.store.active_count());
        }
    }

    async fn run_swap(&self, entry: &Arc<SwapEntry>) -> ResolverResult<()> {
        let mut shutdown = self.shutdown_tx.subscribe();

        let (id, params, hashlock) = {
            let ctx = entry.ctx.lock().await;
            (ctx.id, ctx.params.clone(), ctx.secret_hash)
        };
        let (src, dst) = self.legs(params.direction);
        let poll = Duration::from_millis(self.config.escrow_poll_interval_ms);
        let src_tracker = EscrowTracker::new(src.clone(), poll);
        let dst_tracker = EscrowTracker::new(dst.clone(), poll);
        let margin = Duration::from_secs(self.config.timelock_safety_margin_secs);

        // --- source leg ---------------------------------------------------
        self.transition(entry, SwapPhase::SourceEscrowPending, None).await?;
        self.create_and_fund(entry, &src, SwapSide::Source, &params, hashlock)
            .await?;

        let (src_escrow, src_deadline) = {
            let ctx = entry.ctx.lock().await;
            let escrow = ctx.source_escrow.clone();
            let deadline = escrow.deadline.ok_or_else(|| {
                ResolverError::Internal("source escrow missing deadline".to_string())
            })?;
            (escrow, deadline)
        };
        // Progress must land before the safety threshold, not the raw
        // timelock, so cancellation still has room to confirm.
        let src_threshold = src_deadline - margin;

        let funded = tokio::select! {
            _ = shutdown.changed() => return Ok(()),
            r = src_tracker.wait_for_status(id, SwapSide::Source, &src_escrow, EscrowStatus::Funded, src_threshold) => r,
        };
        match funded {
            Ok(_) => {
                let mut ctx = entry.ctx.lock().await;
                ctx.source_escrow.advance(EscrowStatus::Funded)?;
            }
            Err(ResolverError::TimelockExpired { .. }) => {
                return self.cancel_swap(entry, "source funding unconfirmed").await;
            }
            Err(e) => return Err(e),
        }
        self.transition(entry, SwapPhase::SourceEscrowFunded, None).await?;

        // --- destination leg ----------------------------------------------
        self.transition(entry, SwapPhase::DestEscrowPending, None).await?;
        let dest_outcome = tokio::select! {
            _ = shutdown.changed() => return Ok(()),
            r = self.run_dest_leg(entry, &dst, &dst_tracker, &params, hashlock, id) => r,
        };
        if let Err(e) = dest_outcome {
            // Core atomicity rule: the destination leg failed, so the
            // secret must never leave this process. Hold position until the
            // source safety threshold, then walk the cancellation path.
            warn!("Swap {} destination leg failed, will cancel: {}", id, e);
            {
                let mut ctx = entry.ctx.lock().await;
                ctx.last_error = Some(e.to_string());
            }
            tokio::select! {
                _ = shutdown.changed() => return Ok(()),
                _ = tokio::time::sleep_until(src_threshold) => {}
            }
            return self.cancel_swap(entry, "destination leg failed").await;
        }

        // Subscribe before announcing DestEscrowFunded so a withdrawal
        // triggered by that notification cannot be missed.
        let mut src_events = src.subscribe_events();
        let mut dst_events = dst.subscribe_events();
        self.transition(entry, SwapPhase::DestEscrowFunded, None).await?;

        // --- reveal wait --------------------------------------------------
        let dest_deadline = {
            let ctx = entry.ctx.lock().await;
            ctx.dest_escrow.deadline.ok_or_else(|| {
                ResolverError::Internal("dest escrow missing deadline".to_string())
            })?
        };

        let reveal_side = loop {
            tokio::select! {
                _ = shutdown.changed() => return Ok(()),
                _ = tokio::time::sleep_until(dest_deadline) => {
                    return self.cancel_swap(entry, "no withdrawal before destination timelock").await;
                }
                ev = src_events.recv() => {
                    if reveal_from_event(ev, hashlock, id) {
                        break SwapSide::Source;
                    }
                }
                ev = dst_events.recv() => {
                    if reveal_from_event(ev, hashlock, id) {
                        break SwapSide::Dest;
                    }
                }
            }
        };

        // First observed reveal is authoritative; any later reveal event
        // for this swap is ignored because the driver has moved on.
        {
            let mut ctx = entry.ctx.lock().await;
            ctx.secret_revealed = true;
            ctx.escrow_mut(reveal_side).advance(EscrowStatus::Withdrawn)?;
            if ctx.executed_op(reveal_side, OpKind::Withdraw).is_none() {
                ctx.record_op(reveal_side, OpKind::Withdraw, "observed-on-chain".to_string());
            }
        }
        self.transition(
            entry,
            SwapPhase::SecretRevealed,
            Some(format!("revealed on {} chain", reveal_side)),
        )
        .await?;

        // --- mirrored withdrawal ------------------------------------------
        let mirror = reveal_side.other();
        tokio::select! {
            _ = shutdown.changed() => return Ok(()),
            r = self.do_withdraw(entry, mirror) => { r?; }
        }
        self.transition(entry, SwapPhase::Completed, None).await?;
        Ok(())
    }

    /// Create and fund one escrow leg, keyed by (side, op) so a confirmed
    /// operation is never repeated for the same phase.
    async fn create_and_fund(
        &self,
        entry: &Arc<SwapEntry>,
        client: &Arc<dyn ChainClient>,
        side: SwapSide,
        params: &SwapParams,
        hashlock: SecretHash,
    ) -> ResolverResult<()> {
        let (timelock_secs, counterparty, token) = match side {
            SwapSide::Source => (
                params.source_timelock_secs,
                params.source_counterparty.clone(),
                params.token.clone(),
            ),
            SwapSide::Dest => (params.dest_timelock_secs, params.dest_counterparty.clone(), None),
        };

        let need_create = {
            let ctx = entry.ctx.lock().await;
            ctx.executed_op(side, OpKind::Create).is_none()
        };
        if need_create {
            let escrow_params = EscrowParams {
                hashlock,
                initiator: client.signer_address(),
                counterparty,
                timelock_secs,
                amount: params.amount,
                token,
            };
            let (handle, retries) = with_retry_counted(self.retry, "create escrow", || {
                client.create_escrow(&escrow_params)
            })
            .await?;

            let mut ctx = entry.ctx.lock().await;
            ctx.retry_count += retries;
            let escrow = ctx.escrow_mut(side);
            escrow.address = handle.address;
            escrow.advance(EscrowStatus::Created)?;
            escrow.deadline = Some(Instant::now() + Duration::from_secs(timelock_secs));
            ctx.record_op(side, OpKind::Create, handle.tx_ref);
        }

        let need_fund = {
            let ctx = entry.ctx.lock().await;
            ctx.executed_op(side, OpKind::Fund).is_none()
        };
        if need_fund {
            let escrow = entry.ctx.lock().await.escrow(side).clone();
            let (tx, retries) =
                with_retry_counted(self.retry, "fund escrow", || client.fund(&escrow)).await?;
            let mut ctx = entry.ctx.lock().await;
            ctx.retry_count += retries;
            ctx.record_op(side, OpKind::Fund, tx);
        }

        Ok(())
    }

    async fn run_dest_leg(
        &self,
        entry: &Arc<SwapEntry>,
        dst: &Arc<dyn ChainClient>,
        tracker: &EscrowTracker,
        params: &SwapParams,
        hashlock: SecretHash,
        id: SwapId,
    ) -> ResolverResult<()> {
        self.create_and_fund(entry, dst, SwapSide::Dest, params, hashlock)
            .await?;

        let (escrow, deadline) = {
            let ctx = entry.ctx.lock().await;
            let escrow = ctx.dest_escrow.clone();
            let deadline = escrow.deadline.ok_or_else(|| {
                ResolverError::Internal("dest escrow missing deadline".to_string())
            })?;
            (escrow, deadline)
        };
        tracker
            .wait_for_status(id, SwapSide::Dest, &escrow, EscrowStatus::Funded, deadline)
            .await?;

        let mut ctx = entry.ctx.lock().await;
        ctx.dest_escrow.advance(EscrowStatus::Funded)?;
        Ok(())
    }

    /// Withdrawal with full state-machine preconditions, shared by the
    /// public API and the driver's mirrored replay. Holds the per-swap lock
    /// for the whole operation.
    async fn do_withdraw(&self, entry: &Arc<SwapEntry>, side: SwapSide) -> ResolverResult<TxRef> {
        let mut ctx = entry.ctx.lock().await;
        let id = ctx.id;

        if let Some(tx) = ctx.executed_op(side, OpKind::Withdraw) {
            return Ok(tx.clone());
        }

        let escrow = ctx.escrow(side).clone();
        if escrow.status != EscrowStatus::Funded {
            return Err(ResolverError::EscrowNotReady {
                swap_id: id.to_string(),
                side: side.to_string(),
                status: escrow.status.to_string(),
            });
        }

        // The secret is only released once the destination escrow is
        // confirmed funded and the swap is not on the cancellation path.
        let phase_ok = matches!(
            ctx.phase,
            SwapPhase::DestEscrowFunded | SwapPhase::SecretRevealed
        );
        if !phase_ok {
            return Err(ResolverError::SwapNotReady {
                swap_id: id.to_string(),
                message: format!("secret withheld in phase {}", ctx.phase),
            });
        }
        if side == SwapSide::Source && !ctx.secret_revealed {
            return Err(ResolverError::SwapNotReady {
                swap_id: id.to_string(),
                message: "secret not yet revealed on-chain".to_string(),
            });
        }

        let client = self.client_for(escrow.chain_id)?;
        let recipient = match side {
            SwapSide::Dest => ctx.params.dest_counterparty.clone(),
            SwapSide::Source => client.signer_address(),
        };
        let secret = ctx.secret.clone();

        let (tx, retries) = with_retry_counted(self.retry, "withdraw", || {
            client.withdraw(&escrow, &secret, &recipient)
        })
        .await?;

        ctx.retry_count += retries;
        ctx.escrow_mut(side).advance(EscrowStatus::Withdrawn)?;
        ctx.record_op(side, OpKind::Withdraw, tx.clone());
        if side == SwapSide::Dest {
            ctx.secret_revealed = true;
        }
        let update = SwapUpdate::new(id, ctx.phase, Some(format!("{} escrow withdrawn", side)));
        drop(ctx);
        entry.publish(update);
        Ok(tx)
    }

    /// Cancellation path: wait out each funded escrow's own timelock, then
    /// return funds to the depositor. Requires no secret.
    async fn cancel_swap(&self, entry: &Arc<SwapEntry>, reason: &str) -> ResolverResult<()> {
        self.transition(entry, SwapPhase::Cancelling, Some(reason.to_string()))
            .await?;

        let (id, direction) = {
            let ctx = entry.ctx.lock().await;
            (ctx.id, ctx.direction)
        };
        let (src, dst) = self.legs(direction);

        // Destination first: its timelock is the shorter one.
        for (side, client) in [(SwapSide::Dest, &dst), (SwapSide::Source, &src)] {
            let escrow = {
                let ctx = entry.ctx.lock().await;
                if ctx.executed_op(side, OpKind::Cancel).is_some() {
                    continue;
                }
                ctx.escrow(side).clone()
            };
            if !matches!(escrow.status, EscrowStatus::Created | EscrowStatus::Funded) {
                continue;
            }

            // Cancel is only accepted on-chain after the escrow's expiry.
            if let Some(deadline) = escrow.deadline {
                tokio::time::sleep_until(deadline).await;
            }

            match with_retry_counted(self.retry, "cancel escrow", || client.cancel(&escrow)).await {
                Ok((tx, retries)) => {
                    let mut ctx = entry.ctx.lock().await;
                    ctx.retry_count += retries;
                    ctx.escrow_mut(side).advance(EscrowStatus::Cancelled)?;
                    ctx.record_op(side, OpKind::Cancel, tx);
                    info!("Swap {} {} escrow cancelled", id, side);
                }
                Err(e) => {
                    error!("Swap {} {} escrow cancel failed: {}", id, side, e);
                    return Err(e);
                }
            }
        }

        self.transition(entry, SwapPhase::Cancelled, None).await?;
        Ok(())
    }

    async fn transition(
        &self,
        entry: &Arc<SwapEntry>,
        phase: SwapPhase,
        detail: Option<String>,
    ) -> ResolverResult<()> {
        let update = {
            let mut ctx = entry.ctx.lock().await;
            ctx.set_phase(phase)?;
            SwapUpdate::new(ctx.id, phase, detail)
        };
        debug!("Swap {} -> {}", update.swap_id, phase);
        entry.publish(update);
        Ok(())
    }
}

/// Whether a chain event is a secret reveal for this swap. Events for other
/// swaps, non-withdrawal events, and reveals whose secret does not match the
/// commitment are all ignored.
fn reveal_from_event(
    ev: Result<ChainEvent, broadcast::error::RecvError>,
    hashlock: SecretHash,
    id: SwapId,
) -> bool {
    match ev {
        Ok(ChainEvent::EscrowWithdrawal {
            hashlock: observed,
            secret,
            chain_id,
            ..
        }) if observed == hashlock => {
            if hashlock.verify(&secret) {
                true
            } else {
                warn!(
                    "Swap {} observed reveal on chain {} with non-matching secret, ignoring",
                    id, chain_id
                );
                false
            }
        }
        Ok(ChainEvent::ConnectionLost { chain_id }) => {
            warn!("Swap {} lost event transport on chain {}", id, chain_id);
            false
        }
        Ok(_) => false,
        Err(broadcast::error::RecvError::Lagged(n)) => {
            warn!("Swap {} event stream lagged by {} events", id, n);
            false
        }
        Err(broadcast::error::RecvError::Closed) => false,
    }
}

/// Caller-held subscription to one swap's phase changes.
pub struct SwapMonitor {
    rx: broadcast::Receiver<SwapUpdate>,
}

impl SwapMonitor {
    /// Next phase-change notification; `None` once the channel closes.
    /// Lagged gaps are skipped; `get_status` always has the full picture.
    pub async fn recv(&mut self) -> Option<SwapUpdate> {
        loop {
            match self.rx.recv().await {
                Ok(update) => return Some(update),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainHealth {
    pub chain_id: u64,
    pub name: String,
    pub healthy: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub max_concurrent_swaps: usize,
    pub retry_max_attempts: u32,
    pub min_timelock_secs: u64,
    pub max_timelock_secs: u64,
    pub timelock_safety_margin_secs: u64,
}

/// Read-only operational snapshot exposed on the status surface.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub is_running: bool,
    pub started_at: DateTime<Utc>,
    pub active_swaps: usize,
    pub total_swaps: usize,
    pub chains: Vec<ChainHealth>,
    pub config: ConfigSummary,
    pub metrics: MetricsSnapshot,
}
