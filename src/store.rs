//! In-memory swap context store
//!
//! Registry of all in-flight swaps keyed by swap id. Each entry carries its
//! own lock, so phase transitions for one swap are serialized without
//! blocking any other swap, and its own notification channel, so monitors
//! subscribe per swap rather than through a global listener registry.

use crate::error::{ResolverError, ResolverResult};
use crate::swap::{SwapContext, SwapId, SwapUpdate};

use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Terminal contexts kept around for `get_status` before the oldest are
/// evicted.
const ARCHIVED_CONTEXT_CAPACITY: usize = 1024;

/// One tracked swap: the context behind its per-swap lock plus the
/// phase-change broadcast channel.
#[derive(Debug)]
pub struct SwapEntry {
    pub ctx: Mutex<SwapContext>,
    updates: broadcast::Sender<SwapUpdate>,
}

impl SwapEntry {
    fn new(ctx: SwapContext) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            ctx: Mutex::new(ctx),
            updates,
        }
    }

    /// Deliver a phase-change notification to all monitors. A send with no
    /// receivers is fine; monitoring is optional.
    pub fn publish(&self, update: SwapUpdate) {
        let _ = self.updates.send(update);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SwapUpdate> {
        self.updates.subscribe()
    }
}

/// Store of all swap contexts, bounded by `max_active` non-terminal swaps
/// plus `max_archived` finished ones.
pub struct SwapStore {
    swaps: DashMap<SwapId, Arc<SwapEntry>>,
    active: AtomicUsize,
    max_active: usize,
    archived: std::sync::Mutex<VecDeque<SwapId>>,
    max_archived: usize,
}

impl SwapStore {
    pub fn new(max_active: usize) -> Self {
        Self::with_archive_capacity(max_active, ARCHIVED_CONTEXT_CAPACITY)
    }

    pub fn with_archive_capacity(max_active: usize, max_archived: usize) -> Self {
        Self {
            swaps: DashMap::new(),
            active: AtomicUsize::new(0),
            max_active,
            archived: std::sync::Mutex::new(VecDeque::new()),
            max_archived,
        }
    }

    /// Admit a new swap, enforcing the concurrency bound. Rejected requests
    /// leave no trace in the store.
    pub fn admit(&self, ctx: SwapContext) -> ResolverResult<Arc<SwapEntry>> {
        loop {
            let active = self.active.load(Ordering::Acquire);
            if active >= self.max_active {
                return Err(ResolverError::CapacityExceeded {
                    active,
                    limit: self.max_active,
                });
            }
            if self
                .active
                .compare_exchange(active, active + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                break;
            }
        }

        let id = ctx.id;
        let entry = Arc::new(SwapEntry::new(ctx));
        self.swaps.insert(id, entry.clone());
        debug!("Admitted swap {} ({} active)", id, self.active_count());
        Ok(entry)
    }

    pub fn get(&self, id: &SwapId) -> Option<Arc<SwapEntry>> {
        self.swaps.get(id).map(|e| e.clone())
    }

    /// Release a swap's slot once it has reached a terminal phase. The
    /// context itself is kept so `get_status` keeps answering, up to
    /// `max_archived` finished swaps; a swap is never dropped while an
    /// escrow could still hold funds. Eviction removes oldest-first.
    pub fn release(&self, id: &SwapId) {
        if !self.swaps.contains_key(id) {
            return;
        }
        self.active.fetch_sub(1, Ordering::AcqRel);
        debug!("Released swap {} ({} active)", id, self.active_count());

        let mut archived = self.archived.lock().unwrap();
        archived.push_back(*id);
        while archived.len() > self.max_archived {
            if let Some(evicted) = archived.pop_front() {
                self.swaps.remove(&evicted);
                debug!("Evicted archived swap {}", evicted);
            }
        }
    }

    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.swaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.swaps.is_empty()
    }

    pub fn ids(&self) -> Vec<SwapId> {
        self.swaps.iter().map(|e| *e.key()).collect()
    }
}
