use std::net::SocketAddr;
use std::time::Duration;

use tokio::time::timeout;
use tonic::transport::{Channel, Endpoint};

use crate::config::RpcConfig;
use crate::error::{ForageError, Result};
use crate::grpc::forage_service::proto_to_work_item;
use crate::proto::forage_service_client::ForageServiceClient;
use crate::proto::{GetQueueLengthRequest, GetWorkItemRequest};
use crate::scheduler::WorkItem;

/// Connection to one peer's `ForageService`. Every call carries a deadline.
#[derive(Debug, Clone)]
pub struct PeerClient {
    addr: SocketAddr,
    inner: ForageServiceClient<Channel>,
    call_timeout: Duration,
}

impl PeerClient {
    /// Dial a peer, giving up after the configured connect timeout.
    pub async fn connect(addr: SocketAddr, rpc: &RpcConfig) -> Result<Self> {
        let endpoint = Endpoint::from_shared(format!("http://{}", addr))
            .map_err(|e| ForageError::InvalidPeer(format!("{}: {}", addr, e)))?
            .connect_timeout(rpc.connect_timeout())
            .timeout(rpc.call_timeout());

        let channel = timeout(rpc.connect_timeout(), endpoint.connect())
            .await
            .map_err(|_| ForageError::Timeout(addr))??;

        Ok(Self {
            addr,
            inner: ForageServiceClient::new(channel),
            call_timeout: rpc.call_timeout(),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Ask the peer how many items it holds.
    pub async fn queue_length(&mut self) -> Result<u64> {
        let response = timeout(
            self.call_timeout,
            self.inner.get_queue_length(GetQueueLengthRequest {}),
        )
        .await
        .map_err(|_| ForageError::Timeout(self.addr))??;

        Ok(response.into_inner().length)
    }

    /// Ask the peer to hand over one of its local items.
    ///
    /// `Ok(None)` means the peer had nothing it was willing to give; the
    /// reason is not observable.
    pub async fn take_work_item(&mut self) -> Result<Option<WorkItem>> {
        let response = timeout(
            self.call_timeout,
            self.inner.get_work_item(GetWorkItemRequest {}),
        )
        .await
        .map_err(|_| ForageError::Timeout(self.addr))??;

        Ok(response.into_inner().item.as_ref().map(proto_to_work_item))
    }
}
