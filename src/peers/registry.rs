use std::net::SocketAddr;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

/// A peer's entry as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeerStatus {
    pub addr: SocketAddr,
    /// Queue length reported by the last successful poll.
    pub queue_length: u64,
    /// Consecutive polls that failed since the last success.
    pub failed_polls: u32,
}

/// Stale, eventually consistent view of every known peer's queue length.
///
/// Entries are kept in discovery order; that order breaks ties when picking a
/// steal target. This node's own address is never admitted.
#[derive(Debug, Clone)]
pub struct PeerRegistry {
    peers: Arc<RwLock<Vec<PeerStatus>>>,
    self_addr: SocketAddr,
}

impl PeerRegistry {
    pub fn new(self_addr: SocketAddr) -> Self {
        Self {
            peers: Arc::new(RwLock::new(Vec::new())),
            self_addr,
        }
    }

    pub fn self_addr(&self) -> SocketAddr {
        self.self_addr
    }

    /// Add a peer with a recorded length of 0. Returns false if the address is
    /// this node or already known.
    pub async fn insert_if_new(&self, addr: SocketAddr) -> bool {
        if addr == self.self_addr {
            return false;
        }

        let mut peers = self.peers.write().await;
        if peers.iter().any(|p| p.addr == addr) {
            return false;
        }
        peers.push(PeerStatus {
            addr,
            queue_length: 0,
            failed_polls: 0,
        });
        true
    }

    /// Record a successful poll. Returns false if the peer is unknown.
    pub async fn update_length(&self, addr: SocketAddr, queue_length: u64) -> bool {
        let mut peers = self.peers.write().await;
        match peers.iter_mut().find(|p| p.addr == addr) {
            Some(peer) => {
                peer.queue_length = queue_length;
                peer.failed_polls = 0;
                true
            }
            None => false,
        }
    }

    /// Record a failed poll, leaving the stored length alone. Returns the new
    /// consecutive failure count, or `None` if the peer is unknown.
    pub async fn record_failure(&self, addr: SocketAddr) -> Option<u32> {
        let mut peers = self.peers.write().await;
        let peer = peers.iter_mut().find(|p| p.addr == addr)?;
        peer.failed_polls = peer.failed_polls.saturating_add(1);
        Some(peer.failed_polls)
    }

    /// Forget a peer. Only the peer's own monitor calls this, so a re-admitted
    /// peer never ends up with two monitors.
    pub(crate) async fn remove(&self, addr: SocketAddr) -> bool {
        let mut peers = self.peers.write().await;
        let before = peers.len();
        peers.retain(|p| p.addr != addr);
        peers.len() != before
    }

    pub async fn contains(&self, addr: SocketAddr) -> bool {
        self.peers.read().await.iter().any(|p| p.addr == addr)
    }

    pub async fn get(&self, addr: SocketAddr) -> Option<PeerStatus> {
        self.peers
            .read()
            .await
            .iter()
            .find(|p| p.addr == addr)
            .copied()
    }

    /// The peer with the largest recorded queue length. Among equal lengths
    /// the earliest discovered peer wins.
    pub async fn busiest(&self) -> Option<PeerStatus> {
        let peers = self.peers.read().await;
        let mut best: Option<&PeerStatus> = None;
        for peer in peers.iter() {
            match best {
                Some(b) if peer.queue_length <= b.queue_length => {}
                _ => best = Some(peer),
            }
        }
        best.copied()
    }

    /// All entries in discovery order.
    pub async fn snapshot(&self) -> Vec<PeerStatus> {
        self.peers.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.peers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.peers.read().await.is_empty()
    }
}
