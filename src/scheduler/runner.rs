use tokio_util::sync::CancellationToken;

use crate::config::SchedulerConfig;
use crate::scheduler::forage::{Forager, StealOutcome};
use crate::scheduler::{WorkItem, WorkQueue};
use crate::shutdown::sleep_or_cancel;
use crate::worker::WorkExecutor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerState {
    /// About to look at the local queue.
    RunningLocal,
    /// Local queue was empty; next step is a steal attempt.
    IdleStealing,
    /// Working on an item taken from the local queue.
    Executing(WorkItem),
}

/// The node's execution loop ("eat"): run local work, steal when idle.
pub struct Scheduler {
    queue: WorkQueue,
    forager: Forager,
    executor: WorkExecutor,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(queue: WorkQueue, forager: Forager, config: SchedulerConfig) -> Self {
        Self {
            queue,
            forager,
            executor: WorkExecutor::new(config.time_unit()),
            config,
        }
    }

    /// Perform one transition of the state machine.
    pub async fn step(&self, state: SchedulerState, shutdown: &CancellationToken) -> SchedulerState {
        match state {
            SchedulerState::RunningLocal => match self.queue.pop_front_any().await {
                Some(item) => SchedulerState::Executing(item),
                None => SchedulerState::IdleStealing,
            },
            SchedulerState::Executing(item) => {
                let queue_len = self.queue.len().await;
                tracing::info!(
                    item_id = %item.id,
                    duration = item.duration,
                    origin = %item.origin,
                    queue_len,
                    "Processing work item"
                );
                let result = self.executor.execute(&item, shutdown).await;
                if result.completed {
                    tracing::debug!(
                        item_id = %result.item_id,
                        elapsed_ms = result.elapsed.as_millis() as u64,
                        "Work item done"
                    );
                }
                SchedulerState::RunningLocal
            }
            SchedulerState::IdleStealing => {
                let outcome = tokio::select! {
                    _ = shutdown.cancelled() => return SchedulerState::RunningLocal,
                    outcome = self.forager.forage() => outcome,
                };
                if let StealOutcome::NoPeers = outcome {
                    tracing::trace!("Idle with no known peers");
                }
                sleep_or_cancel(shutdown, self.config.idle_backoff()).await;
                SchedulerState::RunningLocal
            }
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!("Scheduler started");
        let mut state = SchedulerState::RunningLocal;

        while !shutdown.is_cancelled() {
            state = self.step(state, &shutdown).await;
        }

        tracing::debug!("Scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RpcConfig;
    use crate::peers::PeerRegistry;
    use std::time::Duration;

    fn scheduler(queue: WorkQueue) -> Scheduler {
        let registry = PeerRegistry::new("127.0.0.1:23432".parse().unwrap());
        let forager = Forager::new(queue.clone(), registry, RpcConfig::default());
        let config = SchedulerConfig {
            time_unit_ms: 1,
            idle_backoff_ms: 1,
        };
        Scheduler::new(queue, forager, config)
    }

    #[tokio::test]
    async fn running_local_with_work_moves_to_executing() {
        let queue = WorkQueue::new();
        let item = WorkItem::new(2, 0);
        queue.push_back(item.clone()).await;

        let next = scheduler(queue.clone())
            .step(SchedulerState::RunningLocal, &CancellationToken::new())
            .await;
        assert_eq!(next, SchedulerState::Executing(item));
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn running_local_without_work_goes_idle() {
        let next = scheduler(WorkQueue::new())
            .step(SchedulerState::RunningLocal, &CancellationToken::new())
            .await;
        assert_eq!(next, SchedulerState::IdleStealing);
    }

    #[tokio::test]
    async fn executing_returns_to_running_local() {
        let next = scheduler(WorkQueue::new())
            .step(
                SchedulerState::Executing(WorkItem::new(3, 0)),
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(next, SchedulerState::RunningLocal);
    }

    #[tokio::test]
    async fn idle_stealing_returns_to_running_local_without_peers() {
        let next = scheduler(WorkQueue::new())
            .step(SchedulerState::IdleStealing, &CancellationToken::new())
            .await;
        assert_eq!(next, SchedulerState::RunningLocal);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_stealing_waits_for_backoff() {
        let queue = WorkQueue::new();
        let registry = PeerRegistry::new("127.0.0.1:23432".parse().unwrap());
        let forager = Forager::new(queue.clone(), registry, RpcConfig::default());
        let config = SchedulerConfig {
            time_unit_ms: 1,
            idle_backoff_ms: 750,
        };
        let scheduler = Scheduler::new(queue, forager, config);

        let started = tokio::time::Instant::now();
        let next = scheduler
            .step(SchedulerState::IdleStealing, &CancellationToken::new())
            .await;

        assert_eq!(next, SchedulerState::RunningLocal);
        assert!(started.elapsed() >= Duration::from_millis(750));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_backoff_is_cut_short_by_shutdown() {
        let token = CancellationToken::new();
        token.cancel();

        let started = tokio::time::Instant::now();
        let next = scheduler(WorkQueue::new())
            .step(SchedulerState::IdleStealing, &token)
            .await;

        assert_eq!(next, SchedulerState::RunningLocal);
        assert!(started.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test]
    async fn run_drains_local_queue_in_order() {
        let queue = WorkQueue::new();
        for d in [1, 2, 3] {
            queue.push_back(WorkItem::new(d, 0)).await;
        }

        let token = CancellationToken::new();
        let handle = tokio::spawn(scheduler(queue.clone()).run(token.clone()));

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while !queue.is_empty().await && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        token.cancel();
        handle.await.unwrap();

        assert!(queue.is_empty().await);
    }
}
