//! Chain client abstraction
//!
//! Both sides of a swap are driven through one `ChainClient` contract:
//! submit escrow operations, read escrow state, and subscribe to escrow
//! events. Chain-specific behavior (EVM today, Tron-style EVM via the same
//! implementation) lives behind the trait; the orchestrator never branches
//! on chain id.

pub mod evm;

pub use evm::EvmChainClient;

use crate::error::{ResolverError, ResolverResult};
use crate::secret::{Secret, SecretHash};
use crate::swap::{EscrowRef, TxRef};

use async_trait::async_trait;
use ethers::types::U256;
use std::future::Future;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::warn;

/// Inputs for creating one escrow leg.
#[derive(Debug, Clone)]
pub struct EscrowParams {
    pub hashlock: SecretHash,
    /// Depositor address (the resolver's wallet on this chain).
    pub initiator: String,
    /// Counterparty allowed to withdraw with the secret.
    pub counterparty: String,
    pub timelock_secs: u64,
    pub amount: U256,
    /// Token contract; `None` for the native asset.
    pub token: Option<String>,
}

/// Result of escrow creation: the (deterministic) contract address and the
/// transaction that created it.
#[derive(Debug, Clone)]
pub struct EscrowHandle {
    pub address: String,
    pub tx_ref: TxRef,
}

/// Escrow lifecycle events observed on a chain, plus transport-loss
/// notifications for observability. Reconnection itself is handled inside
/// the client.
#[derive(Debug, Clone)]
pub enum ChainEvent {
    EscrowCreated {
        chain_id: u64,
        address: String,
        hashlock: SecretHash,
    },
    EscrowFunded {
        chain_id: u64,
        address: String,
        amount: U256,
    },
    /// A withdrawal necessarily reveals the secret in public calldata.
    EscrowWithdrawal {
        chain_id: u64,
        address: String,
        hashlock: SecretHash,
        secret: Secret,
    },
    EscrowCancelled {
        chain_id: u64,
        address: String,
        hashlock: SecretHash,
    },
    ConnectionLost {
        chain_id: u64,
    },
}

impl ChainEvent {
    pub fn chain_id(&self) -> u64 {
        match self {
            ChainEvent::EscrowCreated { chain_id, .. } => *chain_id,
            ChainEvent::EscrowFunded { chain_id, .. } => *chain_id,
            ChainEvent::EscrowWithdrawal { chain_id, .. } => *chain_id,
            ChainEvent::EscrowCancelled { chain_id, .. } => *chain_id,
            ChainEvent::ConnectionLost { chain_id } => *chain_id,
        }
    }
}

/// Capability set each chain implementation provides.
#[async_trait]
pub trait ChainClient: Send + Sync {
    fn chain_id(&self) -> u64;

    fn name(&self) -> &str;

    /// Validate an address in this chain's format.
    fn validate_address(&self, address: &str) -> bool;

    /// The resolver's own signing address on this chain; used as the
    /// escrow depositor and the default withdrawal recipient.
    fn signer_address(&self) -> String;

    /// Create an escrow at its deterministic address. The address is
    /// derivable from (hashlock, participants, chain id) before deployment,
    /// which lets the caller verify the deployment landed where expected.
    async fn create_escrow(&self, params: &EscrowParams) -> ResolverResult<EscrowHandle>;

    /// Transfer funds into the escrow. For token escrows, allowance is a
    /// caller prerequisite; a missing allowance surfaces as a permanent
    /// chain error.
    async fn fund(&self, escrow: &EscrowRef) -> ResolverResult<TxRef>;

    /// Reveal the secret on-chain and release funds to `recipient`.
    async fn withdraw(
        &self,
        escrow: &EscrowRef,
        secret: &Secret,
        recipient: &str,
    ) -> ResolverResult<TxRef>;

    /// Return funds to the depositor after timelock expiry.
    async fn cancel(&self, escrow: &EscrowRef) -> ResolverResult<TxRef>;

    /// Point-in-time read of the escrow, returned as a refreshed copy.
    async fn escrow_state(&self, escrow: &EscrowRef) -> ResolverResult<EscrowRef>;

    /// Subscribe to escrow events on this chain. The stream is restartable:
    /// a new receiver can be taken at any time, and the client reconnects
    /// transport loss on its own, surfacing `ConnectionLost` events.
    fn subscribe_events(&self) -> broadcast::Receiver<ChainEvent>;

    async fn health_check(&self) -> bool;
}

/// Retry policy for chain writes: exponential backoff, transient errors
/// only.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_millis(base_delay_ms),
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Run a chain write, retrying transient failures with exponential backoff
/// up to the attempt cap. Permanent failures propagate immediately.
pub async fn with_retry<T, F, Fut>(
    policy: RetryPolicy,
    operation: &str,
    f: F,
) -> ResolverResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ResolverResult<T>>,
{
    with_retry_counted(policy, operation, f).await.map(|(value, _)| value)
}

/// As `with_retry`, but also reports how many retries a successful call
/// needed so the caller can account for them.
pub async fn with_retry_counted<T, F, Fut>(
    policy: RetryPolicy,
    operation: &str,
    mut f: F,
) -> ResolverResult<(T, u32)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ResolverResult<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match f().await {
            Ok(value) => return Ok((value, attempt - 1)),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "{} failed (attempt {}/{}), retrying in {:?}: {}",
                    operation, attempt, policy.max_attempts, delay, e
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Classify a raw RPC/provider error message: recognizable transport and
/// ordering failures are transient, everything else is permanent.
pub fn classify_rpc_error(chain_id: u64, message: &str) -> ResolverError {
    let lowered = message.to_lowercase();
    let transient = lowered.contains("timeout")
        || lowered.contains("timed out")
        || lowered.contains("connection")
        || lowered.contains("rate limit")
        || lowered.contains("429")
        || lowered.contains("nonce too low")
        || lowered.contains("underpriced");
    ResolverError::ChainOperation {
        chain_id,
        transient,
        message: message.to_string(),
    }
}
