use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::scheduler::WorkItem;

/// Result of executing one item
#[derive(Debug)]
pub struct ExecutionResult {
    pub item_id: Uuid,
    pub elapsed: Duration,
    /// False when shutdown interrupted the item.
    pub completed: bool,
}

/// Simulates execution by pausing for `duration` time units.
#[derive(Debug, Clone)]
pub struct WorkExecutor {
    time_unit: Duration,
}

impl WorkExecutor {
    pub fn new(time_unit: Duration) -> Self {
        Self { time_unit }
    }

    /// Wall-clock time an item takes.
    pub fn cost_of(&self, item: &WorkItem) -> Duration {
        self.time_unit.saturating_mul(item.duration)
    }

    pub async fn execute(&self, item: &WorkItem, shutdown: &CancellationToken) -> ExecutionResult {
        let started = Instant::now();
        let completed = tokio::select! {
            _ = shutdown.cancelled() => false,
            _ = tokio::time::sleep(self.cost_of(item)) => true,
        };

        let elapsed = started.elapsed();
        if !completed {
            tracing::info!(item_id = %item.id, "Execution interrupted by shutdown");
        }

        ExecutionResult {
            item_id: item.id,
            elapsed,
            completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_is_proportional_to_duration() {
        let executor = WorkExecutor::new(Duration::from_millis(10));
        assert_eq!(executor.cost_of(&WorkItem::new(5, 0)), Duration::from_millis(50));
        assert_eq!(executor.cost_of(&WorkItem::new(0, 0)), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn execute_waits_for_the_full_duration() {
        let executor = WorkExecutor::new(Duration::from_secs(1));
        let item = WorkItem::new(3, 0);

        let result = executor.execute(&item, &CancellationToken::new()).await;
        assert!(result.completed);
        assert_eq!(result.item_id, item.id);
        assert!(result.elapsed >= Duration::from_secs(3));
    }

    #[tokio::test]
    async fn execute_stops_on_shutdown() {
        let executor = WorkExecutor::new(Duration::from_secs(60));
        let token = CancellationToken::new();
        token.cancel();

        let result = executor.execute(&WorkItem::new(10, 0), &token).await;
        assert!(!result.completed);
        assert!(result.elapsed < Duration::from_secs(60));
    }
}
