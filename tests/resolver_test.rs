//! End-to-end orchestrator tests against in-memory chains
//!
//! Time is paused, so timelock expirations are driven by the runtime's
//! auto-advancing clock instead of real waiting.

mod common;

use common::MockChain;

use ethers::types::U256;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::time::Instant;

use fusion_resolver::chain::{ChainClient, ChainEvent};
use fusion_resolver::config::ResolverConfig;
use fusion_resolver::metrics::SwapMetrics;
use fusion_resolver::resolver::{Resolver, SwapMonitor};
use fusion_resolver::swap::{Direction, SwapParams, SwapPhase, SwapSide};
use fusion_resolver::ResolverError;

const SOURCE_TIMELOCK: u64 = 7200;
const DEST_TIMELOCK: u64 = 3600;
const SAFETY_MARGIN: u64 = 1800;

fn config(max_concurrent: usize) -> ResolverConfig {
    ResolverConfig {
        chain_a: "a".to_string(),
        chain_b: "b".to_string(),
        max_concurrent_swaps: max_concurrent,
        retry_max_attempts: 3,
        retry_base_delay_ms: 10,
        min_timelock_secs: 600,
        max_timelock_secs: 86400,
        timelock_safety_margin_secs: SAFETY_MARGIN,
        escrow_poll_interval_ms: 50,
        metrics_interval_secs: 60,
        health_check_interval_secs: 30,
    }
}

fn swap_params() -> SwapParams {
    SwapParams {
        direction: Direction::AToB,
        amount: U256::exp10(18),
        token: None,
        source_timelock_secs: SOURCE_TIMELOCK,
        dest_timelock_secs: DEST_TIMELOCK,
        source_counterparty: "0xaaaa000000000000000000000000000000000001".to_string(),
        dest_counterparty: "0xbbbb000000000000000000000000000000000002".to_string(),
    }
}

fn setup(max_concurrent: usize) -> (Arc<Resolver>, Arc<MockChain>, Arc<MockChain>) {
    let chain_a = MockChain::new(1, "chain-a");
    let chain_b = MockChain::new(2, "chain-b");
    let resolver = Resolver::new(
        config(max_concurrent),
        chain_a.clone() as Arc<dyn ChainClient>,
        chain_b.clone() as Arc<dyn ChainClient>,
        Arc::new(SwapMetrics::new()),
    );
    (resolver, chain_a, chain_b)
}

/// Collect phases from the monitor until the given phase is observed.
async fn phases_until(monitor: &mut SwapMonitor, last: SwapPhase) -> Vec<SwapPhase> {
    let mut phases = Vec::new();
    while let Some(update) = monitor.recv().await {
        phases.push(update.phase);
        if update.phase == last {
            break;
        }
    }
    phases
}

fn assert_contains_in_order(phases: &[SwapPhase], expected: &[SwapPhase]) {
    let mut iter = phases.iter();
    for want in expected {
        assert!(
            iter.any(|p| p == want),
            "phase {:?} missing or out of order in {:?}",
            want,
            phases
        );
    }
}

#[tokio::test(start_paused = true)]
async fn happy_path_completes_in_strict_phase_order() {
    let (resolver, chain_a, chain_b) = setup(8);

    let id = resolver.initiate_swap(swap_params()).await.unwrap();
    let mut monitor = resolver.monitor_swap(&id).unwrap();

    let until_funded =
        phases_until(&mut monitor, SwapPhase::DestEscrowFunded).await;
    assert_contains_in_order(
        &until_funded,
        &[
            SwapPhase::SourceEscrowPending,
            SwapPhase::SourceEscrowFunded,
            SwapPhase::DestEscrowPending,
            SwapPhase::DestEscrowFunded,
        ],
    );

    // Counterparty claims the destination escrow, revealing the secret.
    resolver.withdraw(&id, SwapSide::Dest).await.unwrap();

    let rest = phases_until(&mut monitor, SwapPhase::Completed).await;
    assert_contains_in_order(&rest, &[SwapPhase::SecretRevealed, SwapPhase::Completed]);

    // Phase ordinals never decrease across the whole run.
    let all: Vec<_> = until_funded.iter().chain(rest.iter()).collect();
    for pair in all.windows(2) {
        assert!(pair[0].ordinal() <= pair[1].ordinal());
    }

    assert_eq!(chain_b.call_count("withdraw"), 1);
    assert_eq!(chain_a.call_count("withdraw"), 1);
    assert_eq!(chain_a.call_count("cancel"), 0);
    assert_eq!(chain_b.call_count("cancel"), 0);

    let status = resolver.get_status(&id).await.unwrap();
    assert_eq!(status.phase, SwapPhase::Completed);
    assert!(!status.can_withdraw);
}

#[tokio::test(start_paused = true)]
async fn dest_escrow_failure_cancels_without_revealing() {
    let (resolver, chain_a, chain_b) = setup(8);
    chain_b.fail_creates.store(true, Ordering::SeqCst);

    let start = Instant::now();
    let id = resolver.initiate_swap(swap_params()).await.unwrap();
    let mut monitor = resolver.monitor_swap(&id).unwrap();

    let mut cancelling_at = None;
    while let Some(update) = monitor.recv().await {
        if update.phase == SwapPhase::Cancelling && cancelling_at.is_none() {
            cancelling_at = Some(start.elapsed());
        }
        if update.phase == SwapPhase::Cancelled {
            break;
        }
    }

    // The source escrow is only given up at its safety threshold, never
    // before.
    let cancelling_at = cancelling_at.expect("swap never entered cancellation");
    assert!(
        cancelling_at.as_secs() >= SOURCE_TIMELOCK - SAFETY_MARGIN - 1,
        "cancelled too early: {:?}",
        cancelling_at
    );

    // The secret never reached either chain.
    assert_eq!(chain_a.call_count("withdraw"), 0);
    assert_eq!(chain_b.call_count("withdraw"), 0);
    assert_eq!(chain_b.call_count("create"), 0);
    assert_eq!(chain_a.call_count("cancel"), 1);

    let status = resolver.get_status(&id).await.unwrap();
    assert_eq!(status.phase, SwapPhase::Cancelled);
    assert!(status.last_error.is_some());
    assert_eq!(resolver.active_swaps(), 0);
}

#[tokio::test(start_paused = true)]
async fn unreachable_dest_chain_cancels_at_safety_threshold() {
    let (resolver, chain_a, chain_b) = setup(8);
    chain_b.unreachable.store(true, Ordering::SeqCst);

    let start = Instant::now();
    let id = resolver.initiate_swap(swap_params()).await.unwrap();
    let mut monitor = resolver.monitor_swap(&id).unwrap();

    let mut cancelling_at = None;
    while let Some(update) = monitor.recv().await {
        if update.phase == SwapPhase::Cancelling && cancelling_at.is_none() {
            cancelling_at = Some(start.elapsed());
        }
        if update.phase == SwapPhase::Cancelled {
            break;
        }
    }

    let cancelling_at = cancelling_at.expect("swap never entered cancellation");
    assert!(cancelling_at.as_secs() >= SOURCE_TIMELOCK - SAFETY_MARGIN - 1);

    assert!(chain_b.calls().is_empty());
    assert_eq!(chain_a.call_count("withdraw"), 0);
    assert_eq!(chain_a.call_count("cancel"), 1);
}

#[tokio::test(start_paused = true)]
async fn permanent_state_read_failure_cancels_funded_source() {
    let (resolver, chain_a, chain_b) = setup(8);
    // Escrow writes land on-chain, but every state read afterwards reverts.
    chain_a.fail_state_reads.store(true, Ordering::SeqCst);

    let id = resolver.initiate_swap(swap_params()).await.unwrap();
    let mut monitor = resolver.monitor_swap(&id).unwrap();
    let phases = phases_until(&mut monitor, SwapPhase::Cancelled).await;
    assert_contains_in_order(
        &phases,
        &[
            SwapPhase::SourceEscrowPending,
            SwapPhase::Cancelling,
            SwapPhase::Cancelled,
        ],
    );

    // The funded source escrow was reclaimed, not abandoned.
    assert_eq!(chain_a.call_count("fund"), 1);
    assert_eq!(chain_a.call_count("cancel"), 1);
    assert_eq!(chain_a.call_count("withdraw"), 0);
    assert_eq!(chain_b.call_count("withdraw"), 0);

    let status = resolver.get_status(&id).await.unwrap();
    assert_eq!(status.phase, SwapPhase::Cancelled);
    assert!(status.last_error.is_some());
    assert_eq!(resolver.active_swaps(), 0);
}

#[tokio::test(start_paused = true)]
async fn transient_dest_failures_are_retried_to_success() {
    let (resolver, _chain_a, chain_b) = setup(8);
    chain_b.transient_creates.store(2, Ordering::SeqCst);

    let id = resolver.initiate_swap(swap_params()).await.unwrap();
    let mut monitor = resolver.monitor_swap(&id).unwrap();
    phases_until(&mut monitor, SwapPhase::DestEscrowFunded).await;

    resolver.withdraw(&id, SwapSide::Dest).await.unwrap();
    phases_until(&mut monitor, SwapPhase::Completed).await;

    assert_eq!(chain_b.call_count("create"), 1);
    let status = resolver.get_status(&id).await.unwrap();
    assert_eq!(status.retry_count, 2);
}

#[tokio::test(start_paused = true)]
async fn withdraw_is_idempotent() {
    let (resolver, _chain_a, chain_b) = setup(8);

    let id = resolver.initiate_swap(swap_params()).await.unwrap();
    let mut monitor = resolver.monitor_swap(&id).unwrap();
    phases_until(&mut monitor, SwapPhase::DestEscrowFunded).await;

    let tx1 = resolver.withdraw(&id, SwapSide::Dest).await.unwrap();
    let tx2 = resolver.withdraw(&id, SwapSide::Dest).await.unwrap();
    assert_eq!(tx1, tx2);
    assert_eq!(chain_b.call_count("withdraw"), 1);

    phases_until(&mut monitor, SwapPhase::Completed).await;
}

#[tokio::test(start_paused = true)]
async fn withdraw_refused_before_dest_escrow_funded() {
    let (resolver, _chain_a, chain_b) = setup(8);
    chain_b.unreachable.store(true, Ordering::SeqCst);

    let id = resolver.initiate_swap(swap_params()).await.unwrap();

    // Destination leg can never fund, so the secret stays withheld.
    let err = resolver.withdraw(&id, SwapSide::Dest).await.unwrap_err();
    assert!(matches!(
        err,
        ResolverError::EscrowNotReady { .. } | ResolverError::SwapNotReady { .. }
    ));
    assert_eq!(chain_b.call_count("withdraw"), 0);
}

#[tokio::test(start_paused = true)]
async fn capacity_bound_rejects_excess_swaps() {
    let (resolver, _chain_a, _chain_b) = setup(2);

    let first = resolver.initiate_swap(swap_params()).await;
    let second = resolver.initiate_swap(swap_params()).await;
    let third = resolver.initiate_swap(swap_params()).await;

    assert!(first.is_ok());
    assert!(second.is_ok());
    assert!(matches!(
        third.unwrap_err(),
        ResolverError::CapacityExceeded { active: 2, limit: 2 }
    ));
    assert_eq!(resolver.active_swaps(), 2);

    // The rejected request left nothing behind; admitted swaps are intact.
    let status = resolver.get_status(&first.unwrap()).await.unwrap();
    assert_ne!(status.phase, SwapPhase::Failed);

    resolver.stop().await;
}

#[tokio::test(start_paused = true)]
async fn reveal_with_wrong_secret_is_ignored() {
    let (resolver, _chain_a, chain_b) = setup(8);

    let id = resolver.initiate_swap(swap_params()).await.unwrap();
    let mut monitor = resolver.monitor_swap(&id).unwrap();
    phases_until(&mut monitor, SwapPhase::DestEscrowFunded).await;

    let status = resolver.get_status(&id).await.unwrap();
    chain_b.emit(ChainEvent::EscrowWithdrawal {
        chain_id: 2,
        address: status.dest.address.clone(),
        hashlock: status.secret_hash,
        secret: fusion_resolver::Secret::generate(),
    });
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }

    // The bogus reveal moved nothing.
    let status = resolver.get_status(&id).await.unwrap();
    assert_eq!(status.phase, SwapPhase::DestEscrowFunded);

    resolver.withdraw(&id, SwapSide::Dest).await.unwrap();
    phases_until(&mut monitor, SwapPhase::Completed).await;
}

#[tokio::test(start_paused = true)]
async fn duplicate_reveal_events_do_not_double_withdraw() {
    let (resolver, chain_a, chain_b) = setup(8);

    let id = resolver.initiate_swap(swap_params()).await.unwrap();
    let mut monitor = resolver.monitor_swap(&id).unwrap();
    phases_until(&mut monitor, SwapPhase::DestEscrowFunded).await;

    let mut events = chain_b.subscribe_events();
    resolver.withdraw(&id, SwapSide::Dest).await.unwrap();

    // Replay the withdrawal event the mock just published.
    if let Ok(event) = events.try_recv() {
        chain_b.emit(event);
    }

    phases_until(&mut monitor, SwapPhase::Completed).await;
    assert_eq!(chain_a.call_count("withdraw"), 1);
    assert_eq!(chain_b.call_count("withdraw"), 1);
}

#[tokio::test(start_paused = true)]
async fn invalid_params_leave_no_trace() {
    let (resolver, _chain_a, _chain_b) = setup(8);

    let mut params = swap_params();
    params.source_timelock_secs = DEST_TIMELOCK; // violates the safety margin
    assert!(matches!(
        resolver.initiate_swap(params).await.unwrap_err(),
        ResolverError::InvalidParameter(_)
    ));

    let mut params = swap_params();
    params.dest_counterparty = "not-an-address".to_string();
    assert!(matches!(
        resolver.initiate_swap(params).await.unwrap_err(),
        ResolverError::InvalidParameter(_)
    ));

    assert_eq!(resolver.active_swaps(), 0);
}

#[tokio::test(start_paused = true)]
async fn unknown_swap_id_is_not_found() {
    let (resolver, _chain_a, _chain_b) = setup(8);
    let err = resolver.get_status(&uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ResolverError::SwapNotFound { .. }));
}

#[tokio::test(start_paused = true)]
async fn status_keeps_answering_after_terminal_phases() {
    let (resolver, _chain_a, chain_b) = setup(1);
    chain_b.fail_creates.store(true, Ordering::SeqCst);

    let id = resolver.initiate_swap(swap_params()).await.unwrap();
    let mut monitor = resolver.monitor_swap(&id).unwrap();
    phases_until(&mut monitor, SwapPhase::Cancelled).await;

    // Terminal swap still answers status queries and its slot is free.
    let status = resolver.get_status(&id).await.unwrap();
    assert_eq!(status.phase, SwapPhase::Cancelled);
    assert_eq!(resolver.active_swaps(), 0);

    chain_b.fail_creates.store(false, Ordering::SeqCst);
    resolver.initiate_swap(swap_params()).await.unwrap();
}
