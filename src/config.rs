use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Well-known port shared by discovery (UDP) and the peer RPC service (TCP).
pub const DEFAULT_PORT: u16 = 23432;

/// Broadcast presence announcements.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// When false, the registry is only fed by the static peer list.
    pub enabled: bool,
    /// Local address the listen loop binds to.
    pub listen_addr: SocketAddr,
    /// Destination of presence announcements (normally the subnet broadcast address).
    pub announce_addr: SocketAddr,
    pub announce_interval_ms: u64,
    /// Pause after a failed send or receive before trying again.
    pub retry_backoff_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            announce_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), DEFAULT_PORT),
            announce_interval_ms: 1000,
            retry_backoff_ms: 1000,
        }
    }
}

impl DiscoveryConfig {
    pub fn announce_interval(&self) -> Duration {
        Duration::from_millis(self.announce_interval_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Deadlines applied to every outbound call to a peer.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    pub connect_timeout_ms: u64,
    pub call_timeout_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 2000,
            call_timeout_ms: 1000,
        }
    }
}

impl RpcConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// Per-peer queue length polling.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub poll_interval_ms: u64,
    /// Wait before re-dialing a peer that could not be reached.
    pub retry_backoff_ms: u64,
    /// Drop a peer from the registry after this many consecutive failed polls.
    /// `None` keeps unreachable peers forever.
    pub evict_after_failures: Option<u32>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            retry_backoff_ms: 2000,
            evict_after_failures: None,
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Wall-clock length of one unit of `WorkItem::duration`.
    pub time_unit_ms: u64,
    /// Pause after every steal attempt.
    pub idle_backoff_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            time_unit_ms: 1000,
            idle_backoff_ms: 1000,
        }
    }
}

impl SchedulerConfig {
    pub fn time_unit(&self) -> Duration {
        Duration::from_millis(self.time_unit_ms)
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }
}

/// Synthetic work production ("sow").
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub enabled: bool,
    /// Upper bound (exclusive) of the pause between items, in time units.
    pub max_sow_interval: u32,
    /// Upper bound (inclusive) of a generated item's duration.
    pub max_work_duration: u32,
    /// Upper bound (inclusive) of a generated item's cost.
    pub max_cost: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_sow_interval: 16,
            max_work_duration: 30,
            max_cost: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Local address the RPC server binds to.
    pub listen_addr: SocketAddr,
    /// Address peers use to reach this node; also this node's identity.
    pub advertise_addr: SocketAddr,
    /// Peers known up front, polled in the given order.
    pub peers: Vec<SocketAddr>,
    pub discovery: DiscoveryConfig,
    pub rpc: RpcConfig,
    pub monitor: MonitorConfig,
    pub scheduler: SchedulerConfig,
    pub generator: GeneratorConfig,
    /// Serve the HTTP status endpoint here when set.
    pub status_addr: Option<SocketAddr>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            advertise_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT),
            peers: Vec::new(),
            discovery: DiscoveryConfig::default(),
            rpc: RpcConfig::default(),
            monitor: MonitorConfig::default(),
            scheduler: SchedulerConfig::default(),
            generator: GeneratorConfig::default(),
            status_addr: None,
        }
    }
}

impl NodeConfig {
    pub fn new(listen_addr: SocketAddr, advertise_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            advertise_addr,
            ..Default::default()
        }
    }

    pub fn with_peer(mut self, addr: SocketAddr) -> Self {
        self.peers.push(addr);
        self
    }

    pub fn without_discovery(mut self) -> Self {
        self.discovery.enabled = false;
        self
    }

    pub fn with_generator(mut self) -> Self {
        self.generator.enabled = true;
        self
    }
}
