use std::net::SocketAddr;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::NodeConfig;
use crate::discovery::Discovery;
use crate::error::Result;
use crate::grpc::GrpcServer;
use crate::peers::{PeerRegistry, PeerTracker};
use crate::scheduler::{Forager, Scheduler, WorkQueue};
use crate::status::{run_status_server, StatusState};
use crate::worker::WorkGenerator;

/// Main node that orchestrates all components
pub struct Node {
    pub config: NodeConfig,
    pub queue: WorkQueue,
}

/// Handles to a started node.
pub struct RunningNode {
    /// Address peers use to reach this node.
    pub addr: SocketAddr,
    pub discovery_addr: Option<SocketAddr>,
    pub queue: WorkQueue,
    pub registry: PeerRegistry,
    tracker: PeerTracker,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Node {
    pub fn new(config: NodeConfig) -> Self {
        Self {
            config,
            queue: WorkQueue::new(),
        }
    }

    /// Bind sockets and spawn every subsystem:
    /// 1. Binds the peer RPC listener
    /// 2. Binds the discovery socket (if enabled)
    /// 3. Admits static peers, each with its own monitor
    /// 4. Spawns the RPC server, discovery, scheduler, generator and status server
    ///
    /// # Errors
    ///
    /// Returns an error if the RPC or discovery port cannot be bound. Nothing
    /// is spawned in that case.
    pub async fn start(self, shutdown: CancellationToken) -> Result<RunningNode> {
        let Node { config, queue } = self;

        let server = GrpcServer::bind(config.listen_addr, queue.clone()).await?;
        let bound = server.local_addr()?;
        // Port 0 means "pick one"; advertise whatever the OS chose
        let addr = if config.advertise_addr.port() == 0 {
            SocketAddr::new(config.advertise_addr.ip(), bound.port())
        } else {
            config.advertise_addr
        };

        let registry = PeerRegistry::new(addr);
        let tracker = PeerTracker::new(
            registry.clone(),
            config.rpc.clone(),
            config.monitor.clone(),
            shutdown.clone(),
        );

        let discovery = if config.discovery.enabled {
            Some(Discovery::bind(config.discovery.clone(), tracker.clone()).await?)
        } else {
            None
        };
        let discovery_addr = match &discovery {
            Some(d) => Some(d.local_addr()?),
            None => None,
        };

        for peer in &config.peers {
            if tracker.admit(*peer).await {
                tracing::info!(peer = %peer, "Added static peer");
            }
        }

        tracing::info!(
            addr = %addr,
            rpc_listen = %bound,
            discovery = ?discovery_addr,
            static_peers = config.peers.len(),
            generator = config.generator.enabled,
            "Starting forage node"
        );

        let mut tasks = Vec::new();

        let token = shutdown.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = server.run(token).await {
                tracing::error!(error = %e, "Peer RPC server failed");
            }
        }));

        if let Some(discovery) = discovery {
            tasks.push(tokio::spawn(discovery.run(shutdown.clone())));
        }

        let forager = Forager::new(queue.clone(), registry.clone(), config.rpc.clone());
        let scheduler = Scheduler::new(queue.clone(), forager, config.scheduler.clone());
        tasks.push(tokio::spawn(scheduler.run(shutdown.clone())));

        if config.generator.enabled {
            let generator = WorkGenerator::new(
                queue.clone(),
                config.generator.clone(),
                config.scheduler.time_unit(),
            );
            tasks.push(tokio::spawn(generator.run(shutdown.clone())));
        }

        if let Some(status_addr) = config.status_addr {
            let state = StatusState {
                node_addr: addr,
                started_at: Utc::now(),
                queue: queue.clone(),
                registry: registry.clone(),
            };
            tasks.push(tokio::spawn(run_status_server(
                status_addr,
                state,
                shutdown.clone(),
            )));
        }

        Ok(RunningNode {
            addr,
            discovery_addr,
            queue,
            registry,
            tracker,
            shutdown,
            tasks,
        })
    }

    /// Start the node and run until the token is cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        self.start(shutdown).await?.wait().await;
        Ok(())
    }
}

impl RunningNode {
    /// Admit a peer at runtime and start monitoring it. Returns false if the
    /// peer is already known or is this node.
    pub async fn add_peer(&self, addr: SocketAddr) -> bool {
        self.tracker.admit(addr).await
    }

    /// Wait for every subsystem to stop.
    pub async fn wait(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Node task ended abnormally");
            }
        }
        tracing::info!(addr = %self.addr, "Node stopped");
    }

    /// Cancel all subsystems and wait for them.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        self.wait().await;
    }
}
