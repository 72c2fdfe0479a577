use std::net::SocketAddr;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{MonitorConfig, RpcConfig};
use crate::grpc::PeerClient;
use crate::peers::PeerRegistry;
use crate::shutdown::sleep_or_cancel;

/// Admits peers into the registry and starts a [`Monitor`] for each newcomer.
#[derive(Debug, Clone)]
pub struct PeerTracker {
    registry: PeerRegistry,
    rpc: RpcConfig,
    config: MonitorConfig,
    shutdown: CancellationToken,
}

impl PeerTracker {
    pub fn new(
        registry: PeerRegistry,
        rpc: RpcConfig,
        config: MonitorConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            registry,
            rpc,
            config,
            shutdown,
        }
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    /// Insert `addr` at length 0 and spawn its monitor. Returns false for this
    /// node's own address and for peers that are already known.
    pub async fn admit(&self, addr: SocketAddr) -> bool {
        if !self.registry.insert_if_new(addr).await {
            return false;
        }

        Monitor::new(
            addr,
            self.registry.clone(),
            self.rpc.clone(),
            self.config.clone(),
        )
        .spawn(self.shutdown.clone());
        true
    }
}

/// Keeps one peer's registry entry fresh by polling its queue length.
///
/// The monitor is the only writer of its peer's entry. An unreachable peer is
/// retried forever unless eviction is configured.
pub struct Monitor {
    addr: SocketAddr,
    registry: PeerRegistry,
    rpc: RpcConfig,
    config: MonitorConfig,
}

impl Monitor {
    pub fn new(
        addr: SocketAddr,
        registry: PeerRegistry,
        rpc: RpcConfig,
        config: MonitorConfig,
    ) -> Self {
        Self {
            addr,
            registry,
            rpc,
            config,
        }
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(peer = %self.addr, "Monitor started");
        let mut client: Option<PeerClient> = None;

        while !shutdown.is_cancelled() {
            if client.is_none() {
                let connected = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    res = PeerClient::connect(self.addr, &self.rpc) => res,
                };
                match connected {
                    Ok(c) => {
                        tracing::debug!(peer = %self.addr, "Connected to peer");
                        client = Some(c);
                    }
                    Err(e) => {
                        tracing::debug!(peer = %self.addr, error = %e, "Peer unreachable");
                        if self.note_failure().await {
                            return;
                        }
                        if !sleep_or_cancel(&shutdown, self.config.retry_backoff()).await {
                            break;
                        }
                        continue;
                    }
                }
            }

            let Some(peer) = client.as_mut() else {
                continue;
            };

            let polled = tokio::select! {
                _ = shutdown.cancelled() => break,
                res = peer.queue_length() => res,
            };
            match polled {
                Ok(length) => {
                    if !self.registry.update_length(self.addr, length).await {
                        tracing::info!(peer = %self.addr, "Peer left the registry, stopping monitor");
                        return;
                    }
                    tracing::trace!(peer = %self.addr, length, "Refreshed peer queue length");
                }
                Err(e) => {
                    tracing::debug!(peer = %self.addr, error = %e, "Queue length poll failed");
                    // Re-dial on the next round in case the connection is half-open
                    client = None;
                    if self.note_failure().await {
                        return;
                    }
                }
            }

            if !sleep_or_cancel(&shutdown, self.config.poll_interval()).await {
                break;
            }
        }

        tracing::debug!(peer = %self.addr, "Monitor stopped");
    }

    /// Count a failed connect or poll. Returns true when the peer was evicted
    /// and the monitor should stop.
    async fn note_failure(&self) -> bool {
        let Some(failures) = self.registry.record_failure(self.addr).await else {
            tracing::info!(peer = %self.addr, "Peer left the registry, stopping monitor");
            return true;
        };

        match self.config.evict_after_failures {
            Some(limit) if failures >= limit => {
                self.registry.remove(self.addr).await;
                tracing::warn!(peer = %self.addr, failures, "Evicting unreachable peer");
                true
            }
            _ => false,
        }
    }
}
