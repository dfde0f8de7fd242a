//! In-memory chain client for orchestrator tests
//!
//! Escrow operations mutate a per-chain map instead of submitting
//! transactions. Failure injection flags simulate reverts, flaky RPC
//! endpoints, and unreachable chains; every accepted operation is recorded
//! for assertions.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use fusion_resolver::chain::{ChainClient, ChainEvent, EscrowHandle, EscrowParams};
use fusion_resolver::error::{ResolverError, ResolverResult};
use fusion_resolver::secret::Secret;
use fusion_resolver::swap::{EscrowRef, EscrowStatus, TxRef};

const EVENT_CAPACITY: usize = 64;

struct MockEscrow {
    status: EscrowStatus,
}

pub struct MockChain {
    chain_id: u64,
    name: String,
    escrows: Mutex<HashMap<String, MockEscrow>>,
    events: broadcast::Sender<ChainEvent>,
    next_address: AtomicU64,
    calls: Mutex<Vec<String>>,
    /// Every create reverts (permanent error).
    pub fail_creates: AtomicBool,
    /// This many creates fail transiently before one succeeds.
    pub transient_creates: AtomicU32,
    /// Every operation fails transiently, forever.
    pub unreachable: AtomicBool,
    /// Every escrow state read reverts (permanent error).
    pub fail_state_reads: AtomicBool,
}

impl MockChain {
    pub fn new(chain_id: u64, name: &str) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            chain_id,
            name: name.to_string(),
            escrows: Mutex::new(HashMap::new()),
            events,
            next_address: AtomicU64::new(1),
            calls: Mutex::new(Vec::new()),
            fail_creates: AtomicBool::new(false),
            transient_creates: AtomicU32::new(0),
            unreachable: AtomicBool::new(false),
            fail_state_reads: AtomicBool::new(false),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == op)
            .count()
    }

    /// Inject a raw chain event, as if observed from the event transport.
    pub fn emit(&self, event: ChainEvent) {
        let _ = self.events.send(event);
    }

    fn record(&self, op: &str) {
        self.calls.lock().unwrap().push(op.to_string());
    }

    fn check_reachable(&self) -> ResolverResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(ResolverError::ChainOperation {
                chain_id: self.chain_id,
                transient: true,
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ChainClient for MockChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn validate_address(&self, address: &str) -> bool {
        address.starts_with("0x") && address.len() > 2
    }

    fn signer_address(&self) -> String {
        format!("0xresolver{:032x}", self.chain_id)
    }

    async fn create_escrow(&self, params: &EscrowParams) -> ResolverResult<EscrowHandle> {
        self.check_reachable()?;
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(ResolverError::ChainOperation {
                chain_id: self.chain_id,
                transient: false,
                message: "execution reverted".to_string(),
            });
        }
        let remaining = self.transient_creates.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_creates.store(remaining - 1, Ordering::SeqCst);
            return Err(ResolverError::ChainOperation {
                chain_id: self.chain_id,
                transient: true,
                message: "request timed out".to_string(),
            });
        }

        self.record("create");
        let n = self.next_address.fetch_add(1, Ordering::SeqCst);
        let address = format!("0x{:040x}", n);
        self.escrows.lock().unwrap().insert(
            address.clone(),
            MockEscrow {
                status: EscrowStatus::Created,
            },
        );
        self.emit(ChainEvent::EscrowCreated {
            chain_id: self.chain_id,
            address: address.clone(),
            hashlock: params.hashlock,
        });
        Ok(EscrowHandle {
            address,
            tx_ref: format!("0xcreate{:02x}{:08x}", self.chain_id, n),
        })
    }

    async fn fund(&self, escrow: &EscrowRef) -> ResolverResult<TxRef> {
        self.check_reachable()?;
        self.record("fund");
        let mut escrows = self.escrows.lock().unwrap();
        let entry = escrows
            .get_mut(&escrow.address)
            .ok_or_else(|| ResolverError::ChainOperation {
                chain_id: self.chain_id,
                transient: false,
                message: "unknown escrow".to_string(),
            })?;
        entry.status = EscrowStatus::Funded;
        drop(escrows);
        self.emit(ChainEvent::EscrowFunded {
            chain_id: self.chain_id,
            address: escrow.address.clone(),
            amount: escrow.amount,
        });
        Ok(format!("0xfund{:02x}", self.chain_id))
    }

    async fn withdraw(
        &self,
        escrow: &EscrowRef,
        secret: &Secret,
        _recipient: &str,
    ) -> ResolverResult<TxRef> {
        self.check_reachable()?;
        if !escrow.hashlock.verify(secret) {
            return Err(ResolverError::ChainOperation {
                chain_id: self.chain_id,
                transient: false,
                message: "execution reverted: invalid secret".to_string(),
            });
        }
        self.record("withdraw");
        let mut escrows = self.escrows.lock().unwrap();
        let entry = escrows
            .get_mut(&escrow.address)
            .ok_or_else(|| ResolverError::ChainOperation {
                chain_id: self.chain_id,
                transient: false,
                message: "unknown escrow".to_string(),
            })?;
        entry.status = EscrowStatus::Withdrawn;
        drop(escrows);
        // A withdrawal puts the secret in public calldata.
        self.emit(ChainEvent::EscrowWithdrawal {
            chain_id: self.chain_id,
            address: escrow.address.clone(),
            hashlock: escrow.hashlock,
            secret: secret.clone(),
        });
        Ok(format!("0xwithdraw{:02x}", self.chain_id))
    }

    async fn cancel(&self, escrow: &EscrowRef) -> ResolverResult<TxRef> {
        self.check_reachable()?;
        // The contract rejects cancellation before the timelock elapses.
        if !escrow.expired() {
            return Err(ResolverError::ChainOperation {
                chain_id: self.chain_id,
                transient: false,
                message: "execution reverted: timelock not expired".to_string(),
            });
        }
        self.record("cancel");
        let mut escrows = self.escrows.lock().unwrap();
        let entry = escrows
            .get_mut(&escrow.address)
            .ok_or_else(|| ResolverError::ChainOperation {
                chain_id: self.chain_id,
                transient: false,
                message: "unknown escrow".to_string(),
            })?;
        entry.status = EscrowStatus::Cancelled;
        drop(escrows);
        self.emit(ChainEvent::EscrowCancelled {
            chain_id: self.chain_id,
            address: escrow.address.clone(),
            hashlock: escrow.hashlock,
        });
        Ok(format!("0xcancel{:02x}", self.chain_id))
    }

    async fn escrow_state(&self, escrow: &EscrowRef) -> ResolverResult<EscrowRef> {
        self.check_reachable()?;
        if self.fail_state_reads.load(Ordering::SeqCst) {
            return Err(ResolverError::ChainOperation {
                chain_id: self.chain_id,
                transient: false,
                message: "execution reverted".to_string(),
            });
        }
        let mut refreshed = escrow.clone();
        if let Some(entry) = self.escrows.lock().unwrap().get(&escrow.address) {
            refreshed.status = entry.status;
        }
        Ok(refreshed)
    }

    fn subscribe_events(&self) -> broadcast::Receiver<ChainEvent> {
        self.events.subscribe()
    }

    async fn health_check(&self) -> bool {
        !self.unreachable.load(Ordering::SeqCst)
    }
}
