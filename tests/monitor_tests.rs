
use std::net::SocketAddr;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use forage::config::MonitorConfig;
use forage::peers::{Monitor, PeerRegistry, PeerTracker};
use forage::scheduler::WorkItem;
use test_harness::{
    assert_eventually, dead_addr, test_monitor_config, test_rpc_config, TestPeer,
};

fn self_addr() -> SocketAddr {
    "127.0.0.1:1".parse().unwrap()
}

fn tracker(config: MonitorConfig, shutdown: &CancellationToken) -> PeerTracker {
    PeerTracker::new(
        PeerRegistry::new(self_addr()),
        test_rpc_config(),
        config,
        shutdown.clone(),
    )
}

#[tokio::test]
async fn test_monitor_tracks_live_peer_length() {
    let shutdown = CancellationToken::new();
    let peer = TestPeer::with_items(&[1, 1]).await;
    let tracker = tracker(test_monitor_config(), &shutdown);
    let registry = tracker.registry().clone();

    assert!(tracker.admit(peer.addr).await);
    assert_eventually(
        || async { registry.get(peer.addr).await.map(|p| p.queue_length) == Some(2) },
        Duration::from_secs(3),
        "registry should pick up the peer's queue length",
    )
    .await;

    peer.queue.push_back(WorkItem::new(1, 0)).await;
    peer.queue.push_back(WorkItem::new(1, 0)).await;
    assert_eventually(
        || async { registry.get(peer.addr).await.map(|p| p.queue_length) == Some(4) },
        Duration::from_secs(3),
        "registry should follow the peer's queue as it grows",
    )
    .await;

    shutdown.cancel();
}

#[tokio::test]
async fn test_admit_rejects_self_and_duplicates() {
    let shutdown = CancellationToken::new();
    let peer = TestPeer::start().await;
    let tracker = tracker(test_monitor_config(), &shutdown);

    assert!(!tracker.admit(self_addr()).await);
    assert!(tracker.admit(peer.addr).await);
    assert!(!tracker.admit(peer.addr).await);
    assert_eq!(tracker.registry().len().await, 1);

    shutdown.cancel();
}

#[tokio::test]
async fn test_unreachable_peer_stays_registered() {
    let shutdown = CancellationToken::new();
    let dead = dead_addr().await;
    let registry = PeerRegistry::new(self_addr());
    registry.insert_if_new(dead).await;
    registry.update_length(dead, 5).await;

    let handle = Monitor::new(
        dead,
        registry.clone(),
        test_rpc_config(),
        test_monitor_config(),
    )
    .spawn(shutdown.clone());

    assert_eventually(
        || async { registry.get(dead).await.map(|p| p.failed_polls).unwrap_or(0) >= 3 },
        Duration::from_secs(5),
        "failed polls should accumulate for an unreachable peer",
    )
    .await;

    // Last known value is kept and the monitor keeps retrying
    let entry = registry.get(dead).await.expect("entry kept");
    assert_eq!(entry.queue_length, 5);
    assert!(!handle.is_finished());

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("monitor should stop on shutdown")
        .unwrap();
}

#[tokio::test]
async fn test_unreachable_peer_evicted_when_configured() {
    let shutdown = CancellationToken::new();
    let dead = dead_addr().await;
    let config = MonitorConfig {
        evict_after_failures: Some(2),
        ..test_monitor_config()
    };
    let tracker = tracker(config, &shutdown);
    let registry = tracker.registry().clone();

    assert!(tracker.admit(dead).await);
    assert_eventually(
        || async { !registry.contains(dead).await },
        Duration::from_secs(5),
        "peer should be evicted after repeated failures",
    )
    .await;

    // An evicted peer can be rediscovered
    assert!(tracker.admit(dead).await);

    shutdown.cancel();
}

#[tokio::test]
async fn test_success_resets_failure_count() {
    let shutdown = CancellationToken::new();
    let peer = TestPeer::with_items(&[2]).await;
    let registry = PeerRegistry::new(self_addr());
    registry.insert_if_new(peer.addr).await;
    registry.record_failure(peer.addr).await;
    registry.record_failure(peer.addr).await;

    let _handle = Monitor::new(
        peer.addr,
        registry.clone(),
        test_rpc_config(),
        test_monitor_config(),
    )
    .spawn(shutdown.clone());

    assert_eventually(
        || async {
            registry
                .get(peer.addr)
                .await
                .map(|p| p.failed_polls == 0 && p.queue_length == 1)
                .unwrap_or(false)
        },
        Duration::from_secs(3),
        "a successful poll should clear failures",
    )
    .await;

    shutdown.cancel();
}
