use std::net::SocketAddr;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForageError {
    #[error("Network interface not found: {0}")]
    InterfaceNotFound(String),

    #[error("Interface {0} has no non-loopback IPv4 address")]
    NoIpv4Address(String),

    #[error("Address {0} is not in the configured peer list")]
    AddressNotInPeerList(SocketAddr),

    #[error("Invalid peer address: {0}")]
    InvalidPeer(String),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out talking to peer {0}")]
    Timeout(SocketAddr),

    #[error("gRPC error: {0}")]
    GrpcError(#[from] tonic::Status),

    #[error("Transport error: {0}")]
    TransportError(#[from] tonic::transport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ForageError {
    /// Configuration and bind failures are operator mistakes and end the process.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ForageError::InterfaceNotFound(_)
                | ForageError::NoIpv4Address(_)
                | ForageError::AddressNotInPeerList(_)
                | ForageError::InvalidPeer(_)
                | ForageError::Bind { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ForageError>;
