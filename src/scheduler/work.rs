use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a queued item came from, as seen by the node holding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    /// Produced on this node. Peers may steal it.
    Local,
    /// Obtained by stealing. Never handed out to another peer.
    Remote,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Local => write!(f, "local"),
            Origin::Remote => write!(f, "remote"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: Uuid,
    /// Execution cost in scheduler time units. Zero is a valid (instant) item.
    pub duration: u32,
    /// Informational only.
    pub cost: u32,
    pub origin: Origin,
}

impl WorkItem {
    pub fn new(duration: u32, cost: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            duration,
            cost,
            origin: Origin::Local,
        }
    }

    pub fn is_local(&self) -> bool {
        self.origin == Origin::Local
    }

    /// Re-tag an item that arrived through a steal.
    pub fn into_remote(self) -> Self {
        Self {
            origin: Origin::Remote,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_items_are_local() {
        let item = WorkItem::new(5, 42);
        assert_eq!(item.origin, Origin::Local);
        assert!(item.is_local());
        assert_eq!(item.duration, 5);
        assert_eq!(item.cost, 42);
    }

    #[test]
    fn into_remote_keeps_identity() {
        let item = WorkItem::new(7, 1);
        let id = item.id;
        let stolen = item.into_remote();
        assert_eq!(stolen.id, id);
        assert_eq!(stolen.duration, 7);
        assert_eq!(stolen.origin, Origin::Remote);
        assert!(!stolen.is_local());
    }

    #[test]
    fn zero_duration_item_is_still_an_item() {
        let item = WorkItem::new(0, 0);
        assert!(item.is_local());
        assert_ne!(item.id, Uuid::nil());
    }

    #[test]
    fn origin_display() {
        assert_eq!(Origin::Local.to_string(), "local");
        assert_eq!(Origin::Remote.to_string(), "remote");
    }
}
