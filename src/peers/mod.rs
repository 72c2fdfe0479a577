//! Knowledge about other nodes in the herd.
//!
//! - [`PeerRegistry`]: last observed queue length of every known peer
//! - [`Monitor`]: one polling task per peer that keeps its entry fresh

pub mod monitor;
pub mod registry;

pub use monitor::{Monitor, PeerTracker};
pub use registry::{PeerRegistry, PeerStatus};
