use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;

use crate::error::{ForageError, Result};
use crate::grpc::forage_service::ForageServiceImpl;
use crate::proto::forage_service_server::ForageServiceServer;
use crate::scheduler::WorkQueue;

/// Peer RPC server. A port conflict surfaces from [`GrpcServer::bind`], before
/// anything is spawned.
pub struct GrpcServer {
    listener: TcpListener,
    queue: WorkQueue,
}

impl GrpcServer {
    pub async fn bind(addr: SocketAddr, queue: WorkQueue) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ForageError::Bind { addr, source })?;
        Ok(Self { listener, queue })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until the token is cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let addr = self.local_addr()?;
        let service = ForageServiceImpl::new(self.queue);

        tracing::info!(addr = %addr, "Starting peer RPC server");

        Server::builder()
            .add_service(ForageServiceServer::new(service))
            .serve_with_incoming_shutdown(
                TcpListenerStream::new(self.listener),
                shutdown.cancelled_owned(),
            )
            .await?;

        tracing::info!(addr = %addr, "Peer RPC server stopped");
        Ok(())
    }
}
