//! EVM chain client over ethers
//!
//! One implementation covers both EVM-style chains of a pair (an Ethereum
//! network and a Tron-style EVM network expose the same JSON-RPC surface).
//! Provides multi-RPC failover, escrow calldata encoding, deterministic
//! escrow address derivation, confirmation-depth state reads, and a polling
//! event loop feeding the broadcast channel.

use crate::chain::{classify_rpc_error, ChainClient, ChainEvent, EscrowHandle, EscrowParams};
use crate::config::ChainConfig;
use crate::error::{ResolverError, ResolverResult};
use crate::secret::{Secret, SecretHash};
use crate::swap::{EscrowRef, EscrowStatus, TxRef};

use async_trait::async_trait;
use dashmap::DashMap;
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use lazy_static::lazy_static;
use sha3::{Digest, Keccak256};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, RwLock};
use tracing::{debug, info, warn};

const SEND_TIMEOUT: Duration = Duration::from_secs(30);
const EVENT_CHANNEL_CAPACITY: usize = 1024;
const MAX_BLOCK_RANGE: u64 = 1000;

fn keccak(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// First four bytes of the Keccak-256 of a function signature.
fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn event_topic(signature: &str) -> H256 {
    H256::from(keccak(signature.as_bytes()))
}

lazy_static! {
    static ref TOPIC_ESCROW_CREATED: H256 = event_topic("EscrowCreated(bytes32)");
    static ref TOPIC_ESCROW_FUNDED: H256 = event_topic("EscrowFunded(uint256)");
    static ref TOPIC_ESCROW_WITHDRAWAL: H256 = event_topic("EscrowWithdrawal(bytes32,bytes32)");
    static ref TOPIC_ESCROW_CANCELLED: H256 = event_topic("EscrowCancelled(bytes32)");
}

fn encode_word_address(address: Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

fn encode_word_u256(value: U256) -> [u8; 32] {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    word
}

/// Ethers-backed chain client.
pub struct EvmChainClient {
    config: ChainConfig,
    http_providers: Vec<Provider<Http>>,
    current_provider: AtomicUsize,
    wallet: LocalWallet,
    factory: Address,
    init_code_hash: [u8; 32],
    event_tx: broadcast::Sender<ChainEvent>,
    /// Block at which each escrow was first observed funded; used to gate
    /// the Funded status behind the configured confirmation depth.
    funded_seen_at: DashMap<String, u64>,
    last_block: RwLock<u64>,
    connection_lost: AtomicBool,
}

impl EvmChainClient {
    pub fn new(config: ChainConfig, wallet: LocalWallet) -> ResolverResult<Self> {
        let mut http_providers = Vec::new();
        for url in &config.rpc_urls {
            match Provider::<Http>::try_from(url.as_str()) {
                Ok(provider) => {
                    http_providers.push(provider.interval(Duration::from_millis(100)));
                    debug!("Added HTTP provider for chain {}: {}", config.chain_id, url);
                }
                Err(e) => {
                    warn!("Failed to create provider for {}: {}", url, e);
                }
            }
        }
        if http_providers.is_empty() {
            return Err(ResolverError::Config(format!(
                "chain {} has no valid RPC providers",
                config.chain_id
            )));
        }

        let factory = Address::from_str(&config.escrow_factory).map_err(|e| {
            ResolverError::Config(format!("invalid escrow factory address: {}", e))
        })?;
        let init_code_hash = {
            let stripped = config
                .escrow_init_code_hash
                .strip_prefix("0x")
                .unwrap_or(&config.escrow_init_code_hash);
            let bytes = hex::decode(stripped)
                .map_err(|e| ResolverError::Config(format!("invalid init code hash: {}", e)))?;
            bytes.try_into().map_err(|_| {
                ResolverError::Config("init code hash must be 32 bytes".to_string())
            })?
        };

        let wallet = wallet.with_chain_id(config.chain_id);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            config,
            http_providers,
            current_provider: AtomicUsize::new(0),
            wallet,
            factory,
            init_code_hash,
            event_tx,
            funded_seen_at: DashMap::new(),
            last_block: RwLock::new(0),
            connection_lost: AtomicBool::new(false),
        })
    }

    fn http(&self) -> &Provider<Http> {
        let idx = self.current_provider.load(Ordering::Relaxed);
        &self.http_providers[idx % self.http_providers.len()]
    }

    fn failover(&self) {
        let current = self.current_provider.load(Ordering::Relaxed);
        let next = (current + 1) % self.http_providers.len();
        self.current_provider.store(next, Ordering::Relaxed);
        warn!("Chain {} failover to provider {}", self.config.chain_id, next);
    }

    async fn get_block_number(&self) -> ResolverResult<u64> {
        for _ in 0..self.http_providers.len() {
            match self.http().get_block_number().await {
                Ok(block) => {
                    let block = block.as_u64();
                    *self.last_block.write().await = block;
                    return Ok(block);
                }
                Err(e) => {
                    warn!(
                        "Failed to get block number from chain {}: {}",
                        self.config.chain_id, e
                    );
                    self.failover();
                }
            }
        }
        Err(ResolverError::transient(
            self.config.chain_id,
            "all providers failed",
        ))
    }

    /// CREATE2-style escrow address: derivable from the hashlock and
    /// participants before deployment.
    fn escrow_address(&self, params: &EscrowParams) -> ResolverResult<Address> {
        let initiator = self.parse_address(&params.initiator)?;
        let counterparty = self.parse_address(&params.counterparty)?;

        let mut salt_input = Vec::with_capacity(32 + 20 + 20 + 8);
        salt_input.extend_from_slice(params.hashlock.as_bytes());
        salt_input.extend_from_slice(initiator.as_bytes());
        salt_input.extend_from_slice(counterparty.as_bytes());
        salt_input.extend_from_slice(&self.config.chain_id.to_be_bytes());
        let salt = keccak(&salt_input);

        let mut preimage = Vec::with_capacity(1 + 20 + 32 + 32);
        preimage.push(0xff);
        preimage.extend_from_slice(self.factory.as_bytes());
        preimage.extend_from_slice(&salt);
        preimage.extend_from_slice(&self.init_code_hash);
        let hash = keccak(&preimage);
        Ok(Address::from_slice(&hash[12..]))
    }

    fn parse_address(&self, address: &str) -> ResolverResult<Address> {
        Address::from_str(address).map_err(|e| {
            ResolverError::InvalidParameter(format!(
                "invalid address '{}' for chain {}: {}",
                address, self.config.chain_id, e
            ))
        })
    }

    /// Sign and submit a transaction, classifying failures as transient or
    /// permanent. The provider fills the nonce from pending state; retry
    /// policy lives in the caller.
    async fn send_tx(&self, to: Address, data: Vec<u8>, value: U256) -> ResolverResult<TxRef> {
        let chain_id = self.config.chain_id;
        let provider = self.http();

        let nonce = provider
            .get_transaction_count(self.wallet.address(), Some(BlockNumber::Pending.into()))
            .await
            .map_err(|e| classify_rpc_error(chain_id, &e.to_string()))?;

        let (max_fee, priority_fee) = self.estimate_fees().await?;

        let mut tx: TypedTransaction = Eip1559TransactionRequest::new()
            .to(to)
            .data(data)
            .value(value)
            .nonce(nonce)
            .max_fee_per_gas(max_fee)
            .max_priority_fee_per_gas(priority_fee)
            .chain_id(chain_id)
            .into();

        let gas = provider
            .estimate_gas(&tx, None)
            .await
            .map_err(|e| classify_rpc_error(chain_id, &e.to_string()))?;
        tx.set_gas(gas);

        let signature = self
            .wallet
            .sign_transaction(&tx)
            .await
            .map_err(|e| ResolverError::Wallet(e.to_string()))?;
        let raw = tx.rlp_signed(&signature);

        let pending = tokio::time::timeout(SEND_TIMEOUT, provider.send_raw_transaction(raw))
            .await
            .map_err(|_| ResolverError::transient(chain_id, "transaction send timeout"))?
            .map_err(|e| classify_rpc_error(chain_id, &e.to_string()))?;

        let tx_hash = format!("{:?}", pending.tx_hash());
        debug!("Chain {} submitted tx {}", chain_id, tx_hash);
        Ok(tx_hash)
    }

    async fn estimate_fees(&self) -> ResolverResult<(U256, U256)> {
        let chain_id = self.config.chain_id;
        let block = self
            .http()
            .get_block(BlockNumber::Latest)
            .await
            .map_err(|e| classify_rpc_error(chain_id, &e.to_string()))?
            .ok_or_else(|| ResolverError::transient(chain_id, "no latest block"))?;

        let base_fee = block.base_fee_per_gas.unwrap_or_default();
        let priority_fee = U256::from(2_000_000_000u64); // 2 gwei
        let max_fee = base_fee * 2 + priority_fee;
        Ok((max_fee, priority_fee))
    }

    /// Read the escrow contract's state word via `eth_call`.
    async fn read_raw_status(&self, address: Address) -> ResolverResult<EscrowStatus> {
        let chain_id = self.config.chain_id;
        let call: TypedTransaction = TransactionRequest::new()
            .to(address)
            .data(selector("state()").to_vec())
            .into();
        let output = self
            .http()
            .call(&call, None)
            .await
            .map_err(|e| classify_rpc_error(chain_id, &e.to_string()))?;

        let code = output.last().copied().unwrap_or(0);
        Ok(match code {
            0 => EscrowStatus::None,
            1 => EscrowStatus::Created,
            2 => EscrowStatus::Funded,
            3 => EscrowStatus::Withdrawn,
            4 => EscrowStatus::Cancelled,
            other => {
                return Err(ResolverError::permanent(
                    chain_id,
                    format!("unknown escrow state {}", other),
                ))
            }
        })
    }

    /// Spawn the polling event loop. Errors trigger provider failover and a
    /// single `ConnectionLost` notification until the transport recovers.
    pub fn spawn_event_loop(self: &Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let client = self.clone();
        tokio::spawn(async move {
            let poll_interval = Duration::from_secs(2);
            let mut from_block = client.get_block_number().await.unwrap_or(0);

            loop {
                tokio::select! {
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(poll_interval) => {
                        match client.poll_events(from_block).await {
                            Ok(next) => {
                                if client.connection_lost.swap(false, Ordering::Relaxed) {
                                    info!("Chain {} event transport recovered", client.chain_id());
                                }
                                from_block = next;
                            }
                            Err(e) => {
                                warn!("Chain {} event poll failed: {}", client.chain_id(), e);
                                client.failover();
                                if !client.connection_lost.swap(true, Ordering::Relaxed) {
                                    let _ = client.event_tx.send(ChainEvent::ConnectionLost {
                                        chain_id: client.chain_id(),
                                    });
                                }
                            }
                        }
                    }
                }
            }
            info!("Chain {} event loop stopped", client.chain_id());
        });
    }

    async fn poll_events(&self, from_block: u64) -> ResolverResult<u64> {
        let current = self.get_block_number().await?;
        if current < from_block {
            return Ok(from_block);
        }
        let to_block = std::cmp::min(current, from_block + MAX_BLOCK_RANGE);

        let filter = Filter::new()
            .from_block(from_block)
            .to_block(to_block)
            .topic0(vec![
                *TOPIC_ESCROW_CREATED,
                *TOPIC_ESCROW_FUNDED,
                *TOPIC_ESCROW_WITHDRAWAL,
                *TOPIC_ESCROW_CANCELLED,
            ]);

        let logs = self
            .http()
            .get_logs(&filter)
            .await
            .map_err(|e| classify_rpc_error(self.config.chain_id, &e.to_string()))?;

        for log in logs {
            if let Some(event) = self.parse_log(&log) {
                let _ = self.event_tx.send(event);
            }
        }

        Ok(to_block + 1)
    }

    fn parse_log(&self, log: &Log) -> Option<ChainEvent> {
        let chain_id = self.config.chain_id;
        let address = format!("{:?}", log.address);
        let topic0 = log.topics.first()?;

        if *topic0 == *TOPIC_ESCROW_CREATED {
            let hashlock = SecretHash::from_bytes(log.topics.get(1)?.0);
            Some(ChainEvent::EscrowCreated {
                chain_id,
                address,
                hashlock,
            })
        } else if *topic0 == *TOPIC_ESCROW_FUNDED {
            if log.data.len() < 32 {
                return None;
            }
            let amount = U256::from_big_endian(&log.data[0..32]);
            if let Some(entry) = log.block_number {
                self.funded_seen_at
                    .entry(address.clone())
                    .or_insert(entry.as_u64());
            }
            Some(ChainEvent::EscrowFunded {
                chain_id,
                address,
                amount,
            })
        } else if *topic0 == *TOPIC_ESCROW_WITHDRAWAL {
            let hashlock = SecretHash::from_bytes(log.topics.get(1)?.0);
            if log.data.len() < 32 {
                return None;
            }
            let mut secret_bytes = [0u8; 32];
            secret_bytes.copy_from_slice(&log.data[0..32]);
            self.funded_seen_at.remove(&address);
            Some(ChainEvent::EscrowWithdrawal {
                chain_id,
                address,
                hashlock,
                secret: Secret::from_bytes(secret_bytes),
            })
        } else if *topic0 == *TOPIC_ESCROW_CANCELLED {
            let hashlock = SecretHash::from_bytes(log.topics.get(1)?.0);
            self.funded_seen_at.remove(&address);
            Some(ChainEvent::EscrowCancelled {
                chain_id,
                address,
                hashlock,
            })
        } else {
            None
        }
    }
}

#[async_trait]
impl ChainClient for EvmChainClient {
    fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn validate_address(&self, address: &str) -> bool {
        Address::from_str(address).is_ok()
    }

    fn signer_address(&self) -> String {
        format!("{:?}", self.wallet.address())
    }

    async fn create_escrow(&self, params: &EscrowParams) -> ResolverResult<EscrowHandle> {
        let predicted = self.escrow_address(params)?;
        let counterparty = self.parse_address(&params.counterparty)?;
        let token = match &params.token {
            Some(t) => self.parse_address(t)?,
            None => Address::zero(),
        };

        // createEscrow(bytes32 hashlock, address counterparty, uint256 timelock, address token)
        let mut data =
            selector("createEscrow(bytes32,address,uint256,address)").to_vec();
        data.extend_from_slice(params.hashlock.as_bytes());
        data.extend_from_slice(&encode_word_address(counterparty));
        data.extend_from_slice(&encode_word_u256(U256::from(params.timelock_secs)));
        data.extend_from_slice(&encode_word_address(token));

        let tx_ref = self.send_tx(self.factory, data, U256::zero()).await?;
        info!(
            "Chain {} escrow created at {:?} (tx {})",
            self.config.chain_id, predicted, tx_ref
        );
        Ok(EscrowHandle {
            address: format!("{:?}", predicted),
            tx_ref,
        })
    }

    async fn fund(&self, escrow: &EscrowRef) -> ResolverResult<TxRef> {
        let escrow_address = self.parse_address(&escrow.address)?;
        match &escrow.token {
            None => {
                // Native asset: the escrow accepts a plain value transfer.
                self.send_tx(escrow_address, Vec::new(), escrow.amount).await
            }
            Some(token) => {
                // transfer(address,uint256); allowance handling is the
                // caller's responsibility.
                let token_address = self.parse_address(token)?;
                let mut data = selector("transfer(address,uint256)").to_vec();
                data.extend_from_slice(&encode_word_address(escrow_address));
                data.extend_from_slice(&encode_word_u256(escrow.amount));
                self.send_tx(token_address, data, U256::zero()).await
            }
        }
    }

    async fn withdraw(
        &self,
        escrow: &EscrowRef,
        secret: &Secret,
        recipient: &str,
    ) -> ResolverResult<TxRef> {
        let escrow_address = self.parse_address(&escrow.address)?;
        let recipient = self.parse_address(recipient)?;

        // withdraw(bytes32 secret, address recipient)
        let mut data = selector("withdraw(bytes32,address)").to_vec();
        data.extend_from_slice(secret.as_bytes());
        data.extend_from_slice(&encode_word_address(recipient));
        self.send_tx(escrow_address, data, U256::zero()).await
    }

    async fn cancel(&self, escrow: &EscrowRef) -> ResolverResult<TxRef> {
        let escrow_address = self.parse_address(&escrow.address)?;
        let data = selector("cancel()").to_vec();
        self.send_tx(escrow_address, data, U256::zero()).await
    }

    async fn escrow_state(&self, escrow: &EscrowRef) -> ResolverResult<EscrowRef> {
        let address = self.parse_address(&escrow.address)?;
        let mut raw = self.read_raw_status(address).await?;

        // Confirmation bookkeeping is finished for settled escrows.
        if raw.is_terminal() {
            self.funded_seen_at.remove(&escrow.address);
        }

        // Funded is only reported once the funding block has the configured
        // confirmation depth, to tolerate reorgs.
        if raw == EscrowStatus::Funded {
            let current = self.get_block_number().await?;
            match self.funded_seen_at.get(&escrow.address) {
                Some(seen) => {
                    if current < *seen + self.config.confirmation_blocks {
                        raw = EscrowStatus::Created;
                    }
                }
                None => {
                    self.funded_seen_at.insert(escrow.address.clone(), current);
                    raw = EscrowStatus::Created;
                }
            }
        }

        let mut refreshed = escrow.clone();
        refreshed.status = raw;
        Ok(refreshed)
    }

    fn subscribe_events(&self) -> broadcast::Receiver<ChainEvent> {
        self.event_tx.subscribe()
    }

    async fn health_check(&self) -> bool {
        self.get_block_number().await.is_ok()
    }
}
