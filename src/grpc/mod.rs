//! Peer-to-peer RPC over gRPC.
//!
//! - [`GrpcServer`]: serves [`ForageServiceImpl`] on the node's RPC port
//! - [`PeerClient`]: deadline-bounded calls into another node

pub mod client;
pub mod forage_service;
pub mod server;

pub use client::PeerClient;
pub use forage_service::ForageServiceImpl;
pub use server::GrpcServer;
