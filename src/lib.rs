//! Fusion Resolver - Cross-chain atomic swap orchestration
//!
//! The resolver watches two chains, coordinates hashlock/timelock escrows on
//! both, and guarantees that a swap either completes on both chains or is
//! cancelled on both. The secret underlying the hashlock never leaves the
//! process until the destination escrow is confirmed funded.

pub mod api;
pub mod chain;
pub mod config;
pub mod error;
pub mod metrics;
pub mod resolver;
pub mod secret;
pub mod store;
pub mod swap;
pub mod tracker;

pub use chain::{ChainClient, ChainEvent, EscrowHandle, EscrowParams, RetryPolicy};
pub use config::{ChainConfig, ResolverConfig, Settings};
pub use error::{ResolverError, ResolverResult};
pub use resolver::{HealthSnapshot, Resolver, SwapMonitor};
pub use secret::{Secret, SecretHash};
pub use swap::{
    Direction, EscrowStatus, SwapId, SwapParams, SwapPhase, SwapSide, SwapStatus, SwapUpdate,
};
