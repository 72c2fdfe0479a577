use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::config::GeneratorConfig;
use crate::scheduler::{WorkItem, WorkQueue};
use crate::shutdown::sleep_or_cancel;

/// Produces synthetic local work at random intervals ("sow").
pub struct WorkGenerator {
    queue: WorkQueue,
    config: GeneratorConfig,
    time_unit: Duration,
}

impl WorkGenerator {
    pub fn new(queue: WorkQueue, config: GeneratorConfig, time_unit: Duration) -> Self {
        Self {
            queue,
            config,
            time_unit,
        }
    }

    /// A fresh local item with bounded random duration and cost.
    pub fn next_item<R: Rng>(&self, rng: &mut R) -> WorkItem {
        let duration = rng.gen_range(1..=self.config.max_work_duration.max(1));
        let cost = rng.gen_range(0..=self.config.max_cost);
        WorkItem::new(duration, cost)
    }

    /// Random pause before the next item.
    pub fn next_pause<R: Rng>(&self, rng: &mut R) -> Duration {
        if self.config.max_sow_interval == 0 {
            return Duration::ZERO;
        }
        let units = rng.gen_range(0..self.config.max_sow_interval);
        self.time_unit.saturating_mul(units)
    }

    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!("Work generator started");

        loop {
            let (pause, item) = {
                let mut rng = rand::thread_rng();
                (self.next_pause(&mut rng), self.next_item(&mut rng))
            };

            if !sleep_or_cancel(&shutdown, pause).await {
                break;
            }

            let (id, duration) = (item.id, item.duration);
            self.queue.push_back(item).await;
            let queue_len = self.queue.len().await;
            tracing::info!(
                item_id = %id,
                duration,
                queue_len,
                "Added work item"
            );
        }

        tracing::debug!("Work generator stopped");
    }
}
