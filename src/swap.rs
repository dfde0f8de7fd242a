//! Swap data model: contexts, escrow references, and the phase state machine

use crate::config::ResolverConfig;
use crate::error::{ResolverError, ResolverResult};
use crate::secret::{Secret, SecretHash};

use chrono::{DateTime, Utc};
use ethers::types::U256;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::time::Instant;
use uuid::Uuid;

/// Opaque swap identifier, assigned at creation.
pub type SwapId = Uuid;

/// Transaction reference returned by chain writes (hash, hex-encoded).
pub type TxRef = String;

/// Which configured chain is the source of funds for a swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    AToB,
    BToA,
}

/// The two legs of a swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapSide {
    Source,
    Dest,
}

impl SwapSide {
    pub fn other(self) -> SwapSide {
        match self {
            SwapSide::Source => SwapSide::Dest,
            SwapSide::Dest => SwapSide::Source,
        }
    }
}

impl fmt::Display for SwapSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapSide::Source => write!(f, "source"),
            SwapSide::Dest => write!(f, "dest"),
        }
    }
}

/// On-chain escrow lifecycle. Transitions only move forward; Withdrawn and
/// Cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowStatus {
    None,
    Created,
    Funded,
    Withdrawn,
    Cancelled,
}

impl EscrowStatus {
    fn rank(self) -> u8 {
        match self {
            EscrowStatus::None => 0,
            EscrowStatus::Created => 1,
            EscrowStatus::Funded => 2,
            EscrowStatus::Withdrawn | EscrowStatus::Cancelled => 3,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, EscrowStatus::Withdrawn | EscrowStatus::Cancelled)
    }

    /// Whether a transition to `next` is a legal forward move.
    pub fn can_advance_to(self, next: EscrowStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

impl fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EscrowStatus::None => "none",
            EscrowStatus::Created => "created",
            EscrowStatus::Funded => "funded",
            EscrowStatus::Withdrawn => "withdrawn",
            EscrowStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Last-known view of one escrow leg.
#[derive(Debug, Clone)]
pub struct EscrowRef {
    pub chain_id: u64,
    /// Contract address; empty until the escrow is created.
    pub address: String,
    pub status: EscrowStatus,
    pub hashlock: SecretHash,
    /// Lock duration in seconds, counted from escrow creation.
    pub timelock_secs: u64,
    pub amount: U256,
    /// Token contract address; `None` means the chain's native asset.
    pub token: Option<String>,
    /// Monotonic expiry instant, set when the escrow is created on-chain.
    pub deadline: Option<Instant>,
}

impl EscrowRef {
    pub fn new(
        chain_id: u64,
        hashlock: SecretHash,
        timelock_secs: u64,
        amount: U256,
        token: Option<String>,
    ) -> Self {
        Self {
            chain_id,
            address: String::new(),
            status: EscrowStatus::None,
            hashlock,
            timelock_secs,
            amount,
            token,
            deadline: None,
        }
    }

    /// Advance the escrow status, rejecting backward moves.
    pub fn advance(&mut self, next: EscrowStatus) -> ResolverResult<()> {
        if self.status == next {
            return Ok(());
        }
        if !self.status.can_advance_to(next) {
            return Err(ResolverError::Internal(format!(
                "illegal escrow transition {} -> {}",
                self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    /// Whether the timelock has elapsed.
    pub fn expired(&self) -> bool {
        self.deadline.map(|d| Instant::now() >= d).unwrap_or(false)
    }
}

/// Position in the swap state machine. Ordinals are monotonically
/// non-decreasing over a swap's lifetime; the cancellation path sits above
/// the happy path so the monotonicity invariant holds on both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapPhase {
    Initiated,
    SourceEscrowPending,
    SourceEscrowFunded,
    DestEscrowPending,
    DestEscrowFunded,
    SecretRevealed,
    Completed,
    Cancelling,
    Cancelled,
    Failed,
}

impl SwapPhase {
    pub fn ordinal(self) -> u8 {
        match self {
            SwapPhase::Initiated => 0,
            SwapPhase::SourceEscrowPending => 1,
            SwapPhase::SourceEscrowFunded => 2,
            SwapPhase::DestEscrowPending => 3,
            SwapPhase::DestEscrowFunded => 4,
            SwapPhase::SecretRevealed => 5,
            SwapPhase::Completed => 6,
            SwapPhase::Cancelling => 7,
            SwapPhase::Cancelled => 8,
            SwapPhase::Failed => 9,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SwapPhase::Completed | SwapPhase::Cancelled | SwapPhase::Failed
        )
    }
}

impl fmt::Display for SwapPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SwapPhase::Initiated => "initiated",
            SwapPhase::SourceEscrowPending => "source_escrow_pending",
            SwapPhase::SourceEscrowFunded => "source_escrow_funded",
            SwapPhase::DestEscrowPending => "dest_escrow_pending",
            SwapPhase::DestEscrowFunded => "dest_escrow_funded",
            SwapPhase::SecretRevealed => "secret_revealed",
            SwapPhase::Completed => "completed",
            SwapPhase::Cancelling => "cancelling",
            SwapPhase::Cancelled => "cancelled",
            SwapPhase::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Chain-write operations cached for idempotence, keyed per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Create,
    Fund,
    Withdraw,
    Cancel,
}

/// Caller-supplied swap request.
#[derive(Debug, Clone)]
pub struct SwapParams {
    pub direction: Direction,
    pub amount: U256,
    /// Token address on the source chain; `None` for the native asset.
    pub token: Option<String>,
    pub source_timelock_secs: u64,
    pub dest_timelock_secs: u64,
    /// Counterparty address on the source chain.
    pub source_counterparty: String,
    /// Counterparty (recipient) address on the destination chain.
    pub dest_counterparty: String,
}

impl SwapParams {
    /// Validate amount and timelock constraints against configured bounds.
    /// Address formats are checked separately against each chain client.
    pub fn validate(&self, config: &ResolverConfig) -> ResolverResult<()> {
        if self.amount.is_zero() {
            return Err(ResolverError::InvalidParameter(
                "amount must be greater than zero".to_string(),
            ));
        }
        for (name, timelock) in [
            ("source", self.source_timelock_secs),
            ("dest", self.dest_timelock_secs),
        ] {
            if timelock < config.min_timelock_secs || timelock > config.max_timelock_secs {
                return Err(ResolverError::InvalidParameter(format!(
                    "{} timelock {}s outside configured bounds [{}s, {}s]",
                    name, timelock, config.min_timelock_secs, config.max_timelock_secs
                )));
            }
        }
        // The source lock must outlive the destination lock by the safety
        // margin, or the counterparty can be left unable to react.
        if self.source_timelock_secs
            < self
                .dest_timelock_secs
                .saturating_add(config.timelock_safety_margin_secs)
        {
            return Err(ResolverError::InvalidParameter(format!(
                "source timelock {}s must exceed dest timelock {}s by at least {}s",
                self.source_timelock_secs,
                self.dest_timelock_secs,
                config.timelock_safety_margin_secs
            )));
        }
        Ok(())
    }
}

/// Aggregate root for one atomic swap. Mutated only by the orchestrator,
/// under the store's per-swap lock.
#[derive(Debug)]
pub struct SwapContext {
    pub id: SwapId,
    pub direction: Direction,
    pub secret: Secret,
    pub secret_hash: SecretHash,
    pub source_escrow: EscrowRef,
    pub dest_escrow: EscrowRef,
    pub phase: SwapPhase,
    pub params: SwapParams,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub retry_count: u32,
    /// Whether the secret has been observed on a public chain.
    pub secret_revealed: bool,
    /// Confirmed chain writes, keyed by (side, operation). A confirmed
    /// operation is never repeated for the same swap.
    pub executed: HashMap<(SwapSide, OpKind), TxRef>,
    pub last_error: Option<String>,
}

impl SwapContext {
    pub fn new(
        params: SwapParams,
        secret: Secret,
        source_chain_id: u64,
        dest_chain_id: u64,
    ) -> Self {
        let secret_hash = secret.hash();
        let now = Utc::now();
        let source_escrow = EscrowRef::new(
            source_chain_id,
            secret_hash,
            params.source_timelock_secs,
            params.amount,
            params.token.clone(),
        );
        let dest_escrow = EscrowRef::new(
            dest_chain_id,
            secret_hash,
            params.dest_timelock_secs,
            params.amount,
            None,
        );
        Self {
            id: Uuid::new_v4(),
            direction: params.direction,
            secret,
            secret_hash,
            source_escrow,
            dest_escrow,
            phase: SwapPhase::Initiated,
            params,
            created_at: now,
            updated_at: now,
            retry_count: 0,
            secret_revealed: false,
            executed: HashMap::new(),
            last_error: None,
        }
    }

    pub fn escrow(&self, side: SwapSide) -> &EscrowRef {
        match side {
            SwapSide::Source => &self.source_escrow,
            SwapSide::Dest => &self.dest_escrow,
        }
    }

    pub fn escrow_mut(&mut self, side: SwapSide) -> &mut EscrowRef {
        match side {
            SwapSide::Source => &mut self.source_escrow,
            SwapSide::Dest => &mut self.dest_escrow,
        }
    }

    /// Move to a new phase. Phase ordinals never decrease.
    pub fn set_phase(&mut self, phase: SwapPhase) -> ResolverResult<()> {
        if phase == self.phase {
            return Ok(());
        }
        if self.phase.is_terminal() || phase.ordinal() < self.phase.ordinal() {
            return Err(ResolverError::Internal(format!(
                "illegal phase transition {} -> {} for swap {}",
                self.phase, phase, self.id
            )));
        }
        self.phase = phase;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn record_op(&mut self, side: SwapSide, op: OpKind, tx: TxRef) {
        self.executed.insert((side, op), tx);
        self.updated_at = Utc::now();
    }

    pub fn executed_op(&self, side: SwapSide, op: OpKind) -> Option<&TxRef> {
        self.executed.get(&(side, op))
    }

    /// Read-only snapshot for callers. Never fails, even for failed swaps.
    pub fn status(&self) -> SwapStatus {
        let can_withdraw = self.phase == SwapPhase::DestEscrowFunded;
        let can_cancel = !self.phase.is_terminal()
            && ((self.source_escrow.expired()
                && self.source_escrow.status != EscrowStatus::Withdrawn)
                || (self.dest_escrow.expired()
                    && self.dest_escrow.status != EscrowStatus::Withdrawn));
        SwapStatus {
            id: self.id,
            direction: self.direction,
            phase: self.phase,
            secret_hash: self.secret_hash,
            source: EscrowSummary::of(&self.source_escrow),
            dest: EscrowSummary::of(&self.dest_escrow),
            can_withdraw,
            can_cancel,
            retry_count: self.retry_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_error: self.last_error.clone(),
        }
    }
}

/// Serializable view of one escrow leg.
#[derive(Debug, Clone, Serialize)]
pub struct EscrowSummary {
    pub chain_id: u64,
    pub address: String,
    pub status: EscrowStatus,
    pub timelock_secs: u64,
    pub amount: String,
    pub token: Option<String>,
}

impl EscrowSummary {
    fn of(escrow: &EscrowRef) -> Self {
        Self {
            chain_id: escrow.chain_id,
            address: escrow.address.clone(),
            status: escrow.status,
            timelock_secs: escrow.timelock_secs,
            amount: escrow.amount.to_string(),
            token: escrow.token.clone(),
        }
    }
}

/// Read-only swap snapshot returned by `get_status`.
#[derive(Debug, Clone, Serialize)]
pub struct SwapStatus {
    pub id: SwapId,
    pub direction: Direction,
    pub phase: SwapPhase,
    pub secret_hash: SecretHash,
    pub source: EscrowSummary,
    pub dest: EscrowSummary,
    pub can_withdraw: bool,
    pub can_cancel: bool,
    /// Transient-failure retries spent on this swap's chain writes.
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

/// Phase-change notification delivered on a swap's monitor channel.
#[derive(Debug, Clone)]
pub struct SwapUpdate {
    pub swap_id: SwapId,
    pub phase: SwapPhase,
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl SwapUpdate {
    pub fn new(swap_id: SwapId, phase: SwapPhase, detail: Option<String>) -> Self {
        Self {
            swap_id,
            phase,
            detail,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverConfig;

    fn test_config() -> ResolverConfig {
        ResolverConfig {
            chain_a: "evm".to_string(),
            chain_b: "counter".to_string(),
            max_concurrent_swaps: 16,
            retry_max_attempts: 3,
            retry_base_delay_ms: 10,
            min_timelock_secs: 600,
            max_timelock_secs: 86400,
            timelock_safety_margin_secs: 1800,
            escrow_poll_interval_ms: 50,
            metrics_interval_secs: 60,
            health_check_interval_secs: 30,
        }
    }

    fn params(source_timelock: u64, dest_timelock: u64) -> SwapParams {
        SwapParams {
            direction: Direction::AToB,
            amount: U256::from(1_000u64),
            token: None,
            source_timelock_secs: source_timelock,
            dest_timelock_secs: dest_timelock,
            source_counterparty: "0xaaaa".to_string(),
            dest_counterparty: "0xbbbb".to_string(),
        }
    }

    #[test]
    fn timelock_margin_enforced() {
        let config = test_config();
        assert!(params(7200, 3600).validate(&config).is_ok());
        // Exactly at the margin is allowed; one second under is not.
        assert!(params(5400, 3600).validate(&config).is_ok());
        assert!(matches!(
            params(5399, 3600).validate(&config),
            Err(ResolverError::InvalidParameter(_))
        ));
    }

    #[test]
    fn timelock_bounds_enforced() {
        let config = test_config();
        assert!(matches!(
            params(90000, 3600).validate(&config),
            Err(ResolverError::InvalidParameter(_))
        ));
        assert!(matches!(
            params(7200, 300).validate(&config),
            Err(ResolverError::InvalidParameter(_))
        ));
    }

    #[test]
    fn zero_amount_rejected() {
        let config = test_config();
        let mut p = params(7200, 3600);
        p.amount = U256::zero();
        assert!(matches!(
            p.validate(&config),
            Err(ResolverError::InvalidParameter(_))
        ));
    }

    #[test]
    fn phase_ordinals_strictly_increase_on_happy_path() {
        let order = [
            SwapPhase::Initiated,
            SwapPhase::SourceEscrowPending,
            SwapPhase::SourceEscrowFunded,
            SwapPhase::DestEscrowPending,
            SwapPhase::DestEscrowFunded,
            SwapPhase::SecretRevealed,
            SwapPhase::Completed,
        ];
        for pair in order.windows(2) {
            assert!(pair[0].ordinal() < pair[1].ordinal());
        }
    }

    #[test]
    fn phase_never_moves_backward() {
        let mut ctx = SwapContext::new(params(7200, 3600), Secret::generate(), 1, 2);
        ctx.set_phase(SwapPhase::SourceEscrowFunded).unwrap();
        assert!(ctx.set_phase(SwapPhase::Initiated).is_err());
        // Cancellation path reachable from a mid-flight phase.
        ctx.set_phase(SwapPhase::Cancelling).unwrap();
        ctx.set_phase(SwapPhase::Cancelled).unwrap();
        assert!(ctx.set_phase(SwapPhase::Completed).is_err());
    }

    #[test]
    fn escrow_status_forward_only() {
        let mut escrow = EscrowRef::new(
            1,
            Secret::generate().hash(),
            3600,
            U256::from(1u64),
            None,
        );
        escrow.advance(EscrowStatus::Created).unwrap();
        escrow.advance(EscrowStatus::Funded).unwrap();
        assert!(escrow.advance(EscrowStatus::Created).is_err());
        escrow.advance(EscrowStatus::Withdrawn).unwrap();
        assert!(escrow.advance(EscrowStatus::Cancelled).is_err());
    }

    #[test]
    fn secret_hash_matches_context() {
        let secret = Secret::generate();
        let ctx = SwapContext::new(params(7200, 3600), secret.clone(), 1, 2);
        assert!(ctx.secret_hash.verify(&secret));
        assert_eq!(ctx.source_escrow.hashlock, ctx.dest_escrow.hashlock);
    }

    #[test]
    fn can_withdraw_only_when_dest_funded() {
        let mut ctx = SwapContext::new(params(7200, 3600), Secret::generate(), 1, 2);
        assert!(!ctx.status().can_withdraw);
        ctx.set_phase(SwapPhase::SourceEscrowPending).unwrap();
        ctx.set_phase(SwapPhase::SourceEscrowFunded).unwrap();
        ctx.set_phase(SwapPhase::DestEscrowPending).unwrap();
        ctx.set_phase(SwapPhase::DestEscrowFunded).unwrap();
        assert!(ctx.status().can_withdraw);
        ctx.set_phase(SwapPhase::SecretRevealed).unwrap();
        assert!(!ctx.status().can_withdraw);
    }
}
