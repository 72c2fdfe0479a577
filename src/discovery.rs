//! Broadcast peer discovery.
//!
//! Every node periodically broadcasts a small presence marker on the
//! well-known port and listens on the same port for markers from others.
//! There is no directory: a peer becomes known the first time one of its
//! announcements arrives.
//!
//! The marker is the ASCII text `moo:<rpc_port>:<node_id>`. The sender's IP
//! address plus that port identifies the peer's RPC endpoint. `node_id` is
//! drawn once per process; a node drops markers carrying its own id, whatever
//! source address the OS picked for the broadcast. Any other non-empty
//! payload still counts as a presence marker; such a peer is assumed to
//! serve RPC on the well-known port.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::DiscoveryConfig;
use crate::error::{ForageError, Result};
use crate::peers::PeerTracker;
use crate::shutdown::sleep_or_cancel;

/// Announcements never exceed this size.
pub const MAX_DATAGRAM: usize = 64;

const MARKER_PREFIX: &str = "moo";

pub fn presence_marker(rpc_port: u16, node_id: Uuid) -> Vec<u8> {
    format!("{}:{}:{}", MARKER_PREFIX, rpc_port, node_id.simple()).into_bytes()
}

/// A decoded presence announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    /// RPC endpoint of the announcing node.
    pub addr: SocketAddr,
    /// Present only when the sender speaks the full `moo:<port>:<id>` form.
    pub node_id: Option<Uuid>,
}

/// Turn a received datagram into the sender's RPC address.
///
/// Returns `None` for empty datagrams.
pub fn parse_marker(payload: &[u8], sender: SocketAddr, default_port: u16) -> Option<Marker> {
    if payload.is_empty() {
        return None;
    }

    let fields = std::str::from_utf8(payload)
        .ok()
        .and_then(|text| text.trim().strip_prefix(MARKER_PREFIX))
        .and_then(|rest| rest.strip_prefix(':'));

    let (port, node_id) = match fields {
        Some(fields) => {
            let mut parts = fields.splitn(2, ':');
            let port = parts.next().and_then(|p| p.parse::<u16>().ok());
            let node_id = parts.next().and_then(|id| Uuid::parse_str(id).ok());
            (port.unwrap_or(default_port), node_id)
        }
        None => (default_port, None),
    };

    Some(Marker {
        addr: SocketAddr::new(sender.ip(), port),
        node_id,
    })
}

pub struct Discovery {
    config: DiscoveryConfig,
    self_addr: SocketAddr,
    node_id: Uuid,
    tracker: PeerTracker,
    socket: UdpSocket,
}

impl Discovery {
    /// Bind the listening socket. Failure here is fatal for the node.
    pub async fn bind(config: DiscoveryConfig, tracker: PeerTracker) -> Result<Self> {
        let addr = config.listen_addr;
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| ForageError::Bind { addr, source })?;
        let self_addr = tracker.registry().self_addr();

        Ok(Self {
            config,
            self_addr,
            node_id: Uuid::new_v4(),
            tracker,
            socket,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Identifier carried in this node's announcements.
    pub fn node_id(&self) -> Uuid {
        self.node_id
    }

    /// Run the announce and listen loops until shutdown.
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            listen = ?self.socket.local_addr().ok(),
            announce = %self.config.announce_addr,
            self_addr = %self.self_addr,
            node_id = %self.node_id,
            "Starting discovery"
        );

        tokio::join!(
            announce_loop(&self.config, self.self_addr.port(), self.node_id, &shutdown),
            listen_loop(
                &self.socket,
                &self.config,
                self.self_addr,
                self.node_id,
                &self.tracker,
                &shutdown
            ),
        );

        tracing::debug!("Discovery stopped");
    }
}

/// Let other nodes know this one exists.
async fn announce_loop(
    config: &DiscoveryConfig,
    rpc_port: u16,
    node_id: Uuid,
    shutdown: &CancellationToken,
) {
    let marker = presence_marker(rpc_port, node_id);
    let mut socket: Option<UdpSocket> = None;

    while !shutdown.is_cancelled() {
        if socket.is_none() {
            match announce_socket().await {
                Ok(s) => socket = Some(s),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to open announce socket");
                    if !sleep_or_cancel(shutdown, config.retry_backoff()).await {
                        break;
                    }
                    continue;
                }
            }
        }

        if let Some(s) = &socket {
            if let Err(e) = s.send_to(&marker, config.announce_addr).await {
                tracing::warn!(to = %config.announce_addr, error = %e, "Announce failed");
                socket = None;
                if !sleep_or_cancel(shutdown, config.retry_backoff()).await {
                    break;
                }
                continue;
            }
            tracing::trace!(to = %config.announce_addr, "Announced presence");
        }

        if !sleep_or_cancel(shutdown, config.announce_interval()).await {
            break;
        }
    }
}

async fn announce_socket() -> std::io::Result<UdpSocket> {
    let socket = UdpSocket::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0)).await?;
    socket.set_broadcast(true)?;
    Ok(socket)
}

/// Admit every new sender as a peer.
async fn listen_loop(
    socket: &UdpSocket,
    config: &DiscoveryConfig,
    self_addr: SocketAddr,
    node_id: Uuid,
    tracker: &PeerTracker,
    shutdown: &CancellationToken,
) {
    let mut buf = [0u8; MAX_DATAGRAM];

    loop {
        let received = tokio::select! {
            _ = shutdown.cancelled() => break,
            res = socket.recv_from(&mut buf) => res,
        };

        match received {
            Ok((len, sender)) => {
                let Some(marker) = parse_marker(&buf[..len], sender, self_addr.port()) else {
                    continue;
                };
                if marker.node_id == Some(node_id) || marker.addr == self_addr {
                    tracing::trace!(from = %sender, "Ignoring own announcement");
                    continue;
                }
                let peer = marker.addr;
                if tracker.admit(peer).await {
                    let herd_size = tracker.registry().len().await + 1;
                    tracing::info!(peer = %peer, herd_size, "Discovered new peer");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Discovery receive failed");
                if !sleep_or_cancel(shutdown, config.retry_backoff()).await {
                    break;
                }
            }
        }
    }
}
