use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::scheduler::work::WorkItem;

/// FIFO of work items owned by one node.
///
/// Cloning yields another handle to the same queue. Every operation takes the
/// same lock, so the origin check in [`WorkQueue::pop_front_if_local`] is
/// atomic with the removal.
#[derive(Debug, Clone, Default)]
pub struct WorkQueue {
    items: Arc<Mutex<VecDeque<WorkItem>>>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item to the tail.
    pub async fn push_back(&self, item: WorkItem) {
        self.items.lock().await.push_back(item);
    }

    /// Remove and return the head, whatever its origin.
    pub async fn pop_front_any(&self) -> Option<WorkItem> {
        self.items.lock().await.pop_front()
    }

    /// Remove and return the head only if it originated on this node.
    ///
    /// A stolen head stays where it is and the caller gets `None`, exactly as
    /// if the queue were empty.
    pub async fn pop_front_if_local(&self) -> Option<WorkItem> {
        let mut items = self.items.lock().await;
        match items.front() {
            Some(head) if head.is_local() => items.pop_front(),
            _ => None,
        }
    }

    /// Current number of queued items. Advisory: it may change as soon as the
    /// lock is released.
    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }

    /// Copy of the queue contents, head first.
    pub async fn snapshot(&self) -> Vec<WorkItem> {
        self.items.lock().await.iter().cloned().collect()
    }
}
