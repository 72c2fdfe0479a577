use std::net::SocketAddr;

use uuid::Uuid;

use crate::config::RpcConfig;
use crate::grpc::PeerClient;
use crate::peers::PeerRegistry;
use crate::scheduler::WorkQueue;

/// What a single steal attempt achieved. None of these is an error: an idle
/// node simply tries again on its next idle cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StealOutcome {
    /// No peers are known yet.
    NoPeers,
    /// One item moved from `from` to the local queue.
    Stolen { from: SocketAddr, item_id: Uuid },
    /// The peer had nothing to give (empty, or its head was itself stolen).
    Empty { from: SocketAddr },
    /// The peer could not be reached within the deadlines.
    Unreachable { from: SocketAddr },
}

/// The steal algorithm: take one item from the busiest known peer.
#[derive(Debug, Clone)]
pub struct Forager {
    queue: WorkQueue,
    registry: PeerRegistry,
    rpc: RpcConfig,
}

impl Forager {
    pub fn new(queue: WorkQueue, registry: PeerRegistry, rpc: RpcConfig) -> Self {
        Self {
            queue,
            registry,
            rpc,
        }
    }

    /// Run one steal attempt.
    ///
    /// 1. Pick the peer with the largest recorded queue length (first
    ///    discovered wins ties). The registry may be stale; that is accepted.
    /// 2. Ask it for one item. Connection or call failure abandons the attempt.
    /// 3. A received item is tagged remote and appended to the local queue.
    pub async fn forage(&self) -> StealOutcome {
        let Some(target) = self.registry.busiest().await else {
            return StealOutcome::NoPeers;
        };
        let from = target.addr;

        let mut client = match PeerClient::connect(from, &self.rpc).await {
            Ok(client) => client,
            Err(e) => {
                tracing::debug!(peer = %from, error = %e, "Steal target unreachable");
                return StealOutcome::Unreachable { from };
            }
        };

        match client.take_work_item().await {
            Ok(Some(item)) => {
                let item = item.into_remote();
                let item_id = item.id;
                let duration = item.duration;
                self.queue.push_back(item).await;
                tracing::info!(
                    peer = %from,
                    item_id = %item_id,
                    duration,
                    advertised_len = target.queue_length,
                    "Stole work item"
                );
                StealOutcome::Stolen { from, item_id }
            }
            Ok(None) => {
                tracing::debug!(peer = %from, "Steal target had nothing to give");
                StealOutcome::Empty { from }
            }
            Err(e) => {
                tracing::debug!(peer = %from, error = %e, "Steal request failed");
                StealOutcome::Unreachable { from }
            }
        }
    }
}
