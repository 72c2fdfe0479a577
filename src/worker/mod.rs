//! Local work production and execution.
//!
//! - [`WorkExecutor`]: "executes" an item by pausing for its duration
//! - [`WorkGenerator`]: optional producer of synthetic local items
//!
//! # Execution Flow
//!
//! 1. The scheduler pops the head of the local queue
//! 2. [`WorkExecutor::execute`] pauses for `duration` time units
//! 3. The scheduler goes back to the queue

pub mod executor;
pub mod generator;

pub use executor::{ExecutionResult, WorkExecutor};
pub use generator::WorkGenerator;
