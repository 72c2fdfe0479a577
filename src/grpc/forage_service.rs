use tonic::{Request, Response, Status};
use uuid::Uuid;

use crate::proto::forage_service_server::ForageService;
use crate::proto::{
    GetQueueLengthRequest, GetQueueLengthResponse, GetWorkItemRequest, GetWorkItemResponse,
    Origin as ProtoOrigin, WorkItem as ProtoWorkItem,
};
use crate::scheduler::{Origin, WorkItem, WorkQueue};

/// Peer-facing service backed by this node's work queue.
pub struct ForageServiceImpl {
    queue: WorkQueue,
}

impl ForageServiceImpl {
    pub fn new(queue: WorkQueue) -> Self {
        Self { queue }
    }
}

#[tonic::async_trait]
impl ForageService for ForageServiceImpl {
    async fn get_queue_length(
        &self,
        _request: Request<GetQueueLengthRequest>,
    ) -> Result<Response<GetQueueLengthResponse>, Status> {
        let length = self.queue.len().await as u64;
        tracing::trace!(length, "Served GetQueueLength");
        Ok(Response::new(GetQueueLengthResponse { length }))
    }

    async fn get_work_item(
        &self,
        request: Request<GetWorkItemRequest>,
    ) -> Result<Response<GetWorkItemResponse>, Status> {
        let item = self.queue.pop_front_if_local().await;

        match &item {
            Some(item) => tracing::info!(
                item_id = %item.id,
                duration = item.duration,
                peer = ?request.remote_addr(),
                "Work item taken by peer"
            ),
            None => tracing::debug!(peer = ?request.remote_addr(), "Nothing to hand out"),
        }

        Ok(Response::new(GetWorkItemResponse {
            item: item.as_ref().map(work_item_to_proto),
        }))
    }
}

pub fn work_item_to_proto(item: &WorkItem) -> ProtoWorkItem {
    let origin = match item.origin {
        Origin::Local => ProtoOrigin::Local,
        Origin::Remote => ProtoOrigin::Remote,
    };

    ProtoWorkItem {
        id: item.id.to_string(),
        duration: item.duration,
        cost: item.cost,
        origin: origin as i32,
    }
}

/// Convert a received item. The item has already left the sender's queue, so
/// a malformed id is replaced rather than dropping the work.
pub fn proto_to_work_item(proto: &ProtoWorkItem) -> WorkItem {
    let id = Uuid::parse_str(&proto.id).unwrap_or_else(|_| {
        tracing::warn!(id = %proto.id, "Peer sent work item with invalid id, assigning a new one");
        Uuid::new_v4()
    });

    let origin = match proto.origin() {
        ProtoOrigin::Remote => Origin::Remote,
        ProtoOrigin::Local | ProtoOrigin::Unspecified => Origin::Local,
    };

    WorkItem {
        id,
        duration: proto.duration,
        cost: proto.cost,
        origin,
    }
}
