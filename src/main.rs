use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use forage::config::{NodeConfig, RpcConfig, DEFAULT_PORT};
use forage::error::Result as ForageResult;
use forage::grpc::PeerClient;
use forage::net::{parse_peers, resolve_interface, split_static_peers};
use forage::node::Node;
use forage::scheduler::WorkItem;
use forage::shutdown::install_shutdown_handler;

#[derive(Parser, Debug)]
#[command(name = "forage")]
#[command(version)]
#[command(about = "A decentralized work-stealing scheduler")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start a node
    Node(NodeArgs),

    /// Inspect a running node's queue
    Queue {
        #[command(flatten)]
        client: ClientArgs,

        #[command(subcommand)]
        command: QueueCommands,
    },
}

// =============================================================================
// Node Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct NodeArgs {
    /// Network interface whose IPv4 address identifies this node
    #[arg(long, default_value = "wlan0", conflicts_with = "addr")]
    iface: String,

    /// Explicit address of this node; must appear in --peers when both are given
    #[arg(long)]
    addr: Option<Ipv4Addr>,

    /// Port used for discovery (UDP) and peer RPC (TCP)
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Static herd members (comma-separated, format: "host[:port]")
    /// Example: "10.0.0.1,10.0.0.2:23433"
    #[arg(long, default_value = "")]
    peers: String,

    /// Broadcast address for announcements (defaults to the interface's subnet broadcast)
    #[arg(long)]
    broadcast: Option<Ipv4Addr>,

    /// Disable broadcast discovery; only --peers are used
    #[arg(long)]
    no_discovery: bool,

    /// Generate synthetic work on this node
    #[arg(long)]
    sow: bool,

    /// Port for the HTTP status endpoint (optional)
    #[arg(long)]
    status_port: Option<u16>,

    /// Milliseconds per unit of work duration
    #[arg(long, default_value = "1000")]
    time_unit_ms: u64,

    /// Forget a peer after this many consecutive failed polls (default: never)
    #[arg(long)]
    evict_after: Option<u32>,

    /// Deadline for connecting to a peer
    #[arg(long, default_value = "2000")]
    connect_timeout_ms: u64,

    /// Deadline for a single call to a peer
    #[arg(long, default_value = "1000")]
    call_timeout_ms: u64,
}

// =============================================================================
// Client Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ClientArgs {
    /// Node RPC address
    #[arg(long, short = 'a', default_value = "127.0.0.1:23432")]
    addr: SocketAddr,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(clap::Subcommand, Debug)]
enum QueueCommands {
    /// Print the node's queue length
    Length,
    /// Take one local item from the node, exactly as a stealing peer would
    Take,
}

// =============================================================================
// JSON Output Types
// =============================================================================

#[derive(Serialize)]
struct QueueLengthOutput {
    node: SocketAddr,
    length: u64,
}

#[derive(Serialize)]
struct TakeOutput {
    node: SocketAddr,
    item: Option<WorkItem>,
}

// =============================================================================
// Node Implementation
// =============================================================================

fn build_node_config(args: NodeArgs) -> ForageResult<NodeConfig> {
    let herd = parse_peers(&args.peers, args.port)?;

    let (ip, broadcast, peers) = match args.addr {
        Some(ip) => {
            let self_addr = SocketAddr::new(IpAddr::V4(ip), args.port);
            let peers = if herd.is_empty() {
                Vec::new()
            } else {
                split_static_peers(self_addr, &herd)?
            };
            (ip, args.broadcast.unwrap_or(Ipv4Addr::BROADCAST), peers)
        }
        None => {
            let local = resolve_interface(&args.iface)?;
            let self_addr = SocketAddr::new(IpAddr::V4(local.ip), args.port);
            let peers = herd.into_iter().filter(|p| *p != self_addr).collect();
            (local.ip, args.broadcast.unwrap_or(local.broadcast), peers)
        }
    };

    let unspecified = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
    let mut config = peers.into_iter().fold(
        NodeConfig::new(
            SocketAddr::new(unspecified, args.port),
            SocketAddr::new(IpAddr::V4(ip), args.port),
        ),
        NodeConfig::with_peer,
    );
    if args.no_discovery {
        config = config.without_discovery();
    }
    if args.sow {
        config = config.with_generator();
    }
    config.discovery.listen_addr = SocketAddr::new(unspecified, args.port);
    config.discovery.announce_addr = SocketAddr::new(IpAddr::V4(broadcast), args.port);
    config.rpc = RpcConfig {
        connect_timeout_ms: args.connect_timeout_ms,
        call_timeout_ms: args.call_timeout_ms,
    };
    config.monitor.evict_after_failures = args.evict_after;
    config.scheduler.time_unit_ms = args.time_unit_ms;
    config.status_addr = args
        .status_port
        .map(|p| SocketAddr::new(unspecified, p));

    Ok(config)
}

async fn run_node(args: NodeArgs) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = start_node(args).await {
        if e.is_fatal() {
            tracing::error!(error = %e, "Cannot start node, check --iface/--addr/--peers/--port");
        } else {
            tracing::error!(error = %e, "Node stopped with an error");
        }
        return Err(e.into());
    }

    Ok(())
}

async fn start_node(args: NodeArgs) -> ForageResult<()> {
    let config = build_node_config(args)?;

    tracing::info!(
        addr = %config.advertise_addr,
        announce = %config.discovery.announce_addr,
        peers = ?config.peers,
        sow = config.generator.enabled,
        "Initializing node"
    );

    let shutdown = install_shutdown_handler()?;
    Node::new(config).run(shutdown).await
}

// =============================================================================
// Client Command Handlers
// =============================================================================

async fn handle_queue_length(
    client: &mut PeerClient,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let length = client.queue_length().await?;

    match output_format {
        OutputFormat::Json => {
            let output = QueueLengthOutput {
                node: client.addr(),
                length,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            println!("Node:         {}", client.addr());
            println!("Queue Length: {}", length);
        }
    }
    Ok(())
}

async fn handle_queue_take(
    client: &mut PeerClient,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let item = client.take_work_item().await?;

    match output_format {
        OutputFormat::Json => {
            let output = TakeOutput {
                node: client.addr(),
                item,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => match item {
            Some(item) => {
                println!("Item ID:  {}", item.id);
                println!("Duration: {}", item.duration);
                println!("Cost:     {}", item.cost);
                println!("Origin:   {}", item.origin);
            }
            None => println!("No local work available on {}", client.addr()),
        },
    }
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args.command {
        Commands::Node(node_args) => {
            run_node(node_args).await?;
        }
        Commands::Queue { client, command } => {
            let mut peer = PeerClient::connect(client.addr, &RpcConfig::default()).await?;

            match command {
                QueueCommands::Length => {
                    handle_queue_length(&mut peer, &client.output).await?;
                }
                QueueCommands::Take => {
                    handle_queue_take(&mut peer, &client.output).await?;
                }
            }
        }
    }

    Ok(())
}
