//! Peer RPC tests over a real gRPC connection.


use std::time::Duration;

use forage::grpc::PeerClient;
use forage::scheduler::{Origin, WorkItem};
use test_harness::{dead_addr, test_rpc_config, TestPeer};

#[tokio::test]
async fn test_queue_length_reports_without_mutating() {
    let peer = TestPeer::with_items(&[1, 2, 3]).await;
    let mut client = PeerClient::connect(peer.addr, &test_rpc_config())
        .await
        .unwrap();

    assert_eq!(client.queue_length().await.unwrap(), 3);
    assert_eq!(client.queue_length().await.unwrap(), 3);
    assert_eq!(peer.len().await, 3);
}

#[tokio::test]
async fn test_take_returns_head_item() {
    let peer = TestPeer::start().await;
    let head = WorkItem::new(9, 17);
    peer.queue.push_back(head.clone()).await;
    peer.queue.push_back(WorkItem::new(1, 0)).await;

    let mut client = PeerClient::connect(peer.addr, &test_rpc_config())
        .await
        .unwrap();
    let taken = client.take_work_item().await.unwrap().expect("item");

    assert_eq!(taken.id, head.id);
    assert_eq!(taken.duration, 9);
    assert_eq!(taken.cost, 17);
    // The wire carries the owner's tag; the thief re-tags on receipt
    assert_eq!(taken.origin, Origin::Local);
    assert_eq!(peer.len().await, 1);
}

#[tokio::test]
async fn test_take_from_empty_queue_is_no_item() {
    let peer = TestPeer::start().await;
    let mut client = PeerClient::connect(peer.addr, &test_rpc_config())
        .await
        .unwrap();

    assert!(client.take_work_item().await.unwrap().is_none());
    assert_eq!(client.queue_length().await.unwrap(), 0);
}

#[tokio::test]
async fn test_remote_head_is_not_handed_out() {
    let peer = TestPeer::start().await;
    peer.queue.push_back(WorkItem::new(4, 0).into_remote()).await;

    let mut client = PeerClient::connect(peer.addr, &test_rpc_config())
        .await
        .unwrap();

    assert!(client.take_work_item().await.unwrap().is_none());
    assert_eq!(peer.len().await, 1);
    let remaining = peer.queue.snapshot().await;
    assert_eq!(remaining[0].origin, Origin::Remote);
}

#[tokio::test]
async fn test_zero_duration_item_travels_intact() {
    let peer = TestPeer::with_items(&[0]).await;
    let mut client = PeerClient::connect(peer.addr, &test_rpc_config())
        .await
        .unwrap();

    let taken = client.take_work_item().await.unwrap().expect("item");
    assert_eq!(taken.duration, 0);
}

#[tokio::test]
async fn test_connect_to_dead_address_fails_within_deadline() {
    let addr = dead_addr().await;

    let result = tokio::time::timeout(
        Duration::from_secs(2),
        PeerClient::connect(addr, &test_rpc_config()),
    )
    .await
    .expect("connect must respect its deadline");

    assert!(result.is_err());
}
