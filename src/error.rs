//! Error types for the resolver

use thiserror::Error;

/// Main error type for the resolver
#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Chain operation failed on chain {chain_id} ({}): {message}", if *transient { "transient" } else { "permanent" })]
    ChainOperation {
        chain_id: u64,
        transient: bool,
        message: String,
    },

    #[error("Escrow not ready for swap {swap_id}: {side} escrow is {status}")]
    EscrowNotReady {
        swap_id: String,
        side: String,
        status: String,
    },

    #[error("Swap {swap_id} not ready: {message}")]
    SwapNotReady { swap_id: String, message: String },

    #[error("Capacity exceeded: {active} active swaps, limit {limit}")]
    CapacityExceeded { active: usize, limit: usize },

    #[error("Timelock expired for swap {swap_id} on the {side} escrow")]
    TimelockExpired { swap_id: String, side: String },

    #[error("Swap {swap_id} not found")]
    SwapNotFound { swap_id: String },

    #[error("Chain {chain_id} not found")]
    ChainNotFound { chain_id: u64 },

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResolverError {
    /// Check if the error may succeed on retry. Only transient chain
    /// failures (RPC timeouts, rate limits, nonce races) qualify;
    /// everything else propagates immediately.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ResolverError::ChainOperation {
                transient: true,
                ..
            }
        )
    }

    /// Transient chain-write failure.
    pub fn transient(chain_id: u64, message: impl Into<String>) -> Self {
        ResolverError::ChainOperation {
            chain_id,
            transient: true,
            message: message.into(),
        }
    }

    /// Permanent chain-write failure (revert, bad signature). Never retried.
    pub fn permanent(chain_id: u64, message: impl Into<String>) -> Self {
        ResolverError::ChainOperation {
            chain_id,
            transient: false,
            message: message.into(),
        }
    }
}

/// Result type for resolver operations
pub type ResolverResult<T> = Result<T, ResolverError>;
