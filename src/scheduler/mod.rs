pub mod forage;
pub mod queue;
pub mod runner;
pub mod work;

pub use forage::{Forager, StealOutcome};
pub use queue::WorkQueue;
pub use runner::{Scheduler, SchedulerState};
pub use work::{Origin, WorkItem};
