use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::domain::entities::OutboxEntry;
use crate::domain::repository::OutboxRepository;
use crate::domain::stream::StreamPublisher;
use crate::infrastructure::tx::TransactionManager;

const DEFAULT_BATCH_SIZE: i64 = 10;

/// Polls the outbox and publishes pending entries to the stream (spec.md
/// §4.11). Modeled on the teacher's `RetryFailedTransactionJob`: a plain
/// struct with a `run()` method, ticked from the binary's main loop.
pub struct OutboxRelayJob {
    tx: TransactionManager,
    outbox_repo: Arc<dyn OutboxRepository>,
    stream: Arc<dyn StreamPublisher>,
    batch_size: i64,
}

impl OutboxRelayJob {
    pub fn new(tx: TransactionManager, outbox_repo: Arc<dyn OutboxRepository>, stream: Arc<dyn StreamPublisher>) -> Self {
        Self {
            tx,
            outbox_repo,
            stream,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// One tick: lock up to `batch_size` pending entries, publish each, and
    /// record the outcome — all inside the same DB transaction the
    /// `FOR UPDATE SKIP LOCKED` fetch opened, so a failure publishing one
    /// entry never blocks the others from being marked.
    pub async fn run(&self) {
        let batch_size = self.batch_size;
        let result = self
            .tx
            .with_transaction(|| async {
                let pending = self.outbox_repo.get_pending(batch_size).await?;
                if pending.is_empty() {
                    return Ok(0);
                }
                debug!(count = pending.len(), "relaying outbox entries");
                for entry in &pending {
                    self.relay_one(entry).await;
                }
                Ok(pending.len())
            })
            .await;

        match result {
            Ok(0) => {}
            Ok(published) => info!(published, "outbox relay tick published entries"),
            Err(err) => error!(error = %err, "outbox relay tick failed"),
        }
    }

    async fn relay_one(&self, entry: &OutboxEntry) {
        let publish_result = self.stream.publish(&entry.aggregate_id().to_string()).await;

        let outcome = match publish_result {
            Ok(_) => self.outbox_repo.mark_published(entry.id()).await,
            Err(err) => {
                error!(outbox_entry_id = %entry.id(), error = %err, "failed to publish outbox entry to stream");
                self.outbox_repo.mark_failed(entry.id()).await
            }
        };

        if let Err(err) = outcome {
            error!(outbox_entry_id = %entry.id(), error = %err, "failed to record outbox entry outcome");
        }
    }
}

/// Runs `job.run()` on a fixed interval until `shutdown` is tripped.
pub async fn run_forever(job: OutboxRelayJob, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => job.run().await,
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("outbox relay loop shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::OutboxStatus;
    use crate::domain::repository::MockOutboxRepository;
    use crate::domain::stream::MockStreamPublisher;
    use serde_json::json;

    fn pending_entry() -> OutboxEntry {
        OutboxEntry::new("payment", uuid::Uuid::new_v4(), "payment.created", json!({}))
    }

    fn test_tx() -> TransactionManager {
        TransactionManager::new(sqlx::PgPool::connect_lazy("postgres://localhost/unused").unwrap())
    }

    #[tokio::test]
    async fn marks_published_on_successful_publish() {
        let entry = pending_entry();
        let entry_id = entry.id();

        let mut outbox_repo = MockOutboxRepository::new();
        let entry_clone = entry.clone();
        outbox_repo.expect_get_pending().returning(move |_| Ok(vec![entry_clone.clone()]));
        outbox_repo
            .expect_mark_published()
            .withf(move |id| *id == entry_id)
            .returning(|_| Ok(()));

        let mut stream = MockStreamPublisher::new();
        stream.expect_publish().returning(|_| Ok("0-1".to_string()));

        let job = OutboxRelayJob::new(test_tx(), Arc::new(outbox_repo), Arc::new(stream));
        job.run().await;
        assert_eq!(entry.status(), OutboxStatus::Pending);
    }

    #[tokio::test]
    async fn marks_failed_when_publish_errors() {
        let entry = pending_entry();
        let entry_id = entry.id();

        let mut outbox_repo = MockOutboxRepository::new();
        let entry_clone = entry.clone();
        outbox_repo.expect_get_pending().returning(move |_| Ok(vec![entry_clone.clone()]));
        outbox_repo
            .expect_mark_failed()
            .withf(move |id| *id == entry_id)
            .returning(|_| Ok(()));

        let mut stream = MockStreamPublisher::new();
        stream
            .expect_publish()
            .returning(|_| Err(crate::domain::error::DomainError::Internal("broker down".to_string())));

        let job = OutboxRelayJob::new(test_tx(), Arc::new(outbox_repo), Arc::new(stream));
        job.run().await;
    }
}
