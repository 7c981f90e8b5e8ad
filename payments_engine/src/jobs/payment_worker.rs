use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::lock::DistributedLock;
use crate::domain::repository::PaymentRepository;
use crate::domain::stream::{StreamConsumer, StreamMessage};
use crate::domain::types::PaymentId;
use crate::infrastructure::provider::factory;
use crate::infrastructure::provider::ProviderRegistry;
use crate::use_cases::ProcessExternalPaymentUseCase;

const DEFAULT_BATCH_SIZE: usize = 10;
const DEFAULT_BLOCK: Duration = Duration::from_secs(1);
const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(30);
const DEFAULT_MIN_IDLE: Duration = Duration::from_secs(60);

fn lock_name(payment_id: PaymentId) -> String {
    format!("payment:{payment_id}")
}

/// One payment-processor consumer (spec.md §4.12): reads the payments
/// stream's consumer group, takes the per-payment distributed lock, runs
/// the external-payment saga, releases the lock, and acks exactly once.
pub struct PaymentWorker {
    stream: Arc<dyn StreamConsumer>,
    lock: Arc<dyn DistributedLock>,
    payment_repo: Arc<dyn PaymentRepository>,
    providers: Arc<ProviderRegistry>,
    processor: ProcessExternalPaymentUseCase,
    consumer_name: String,
    lock_ttl: Duration,
    min_idle: Duration,
    batch_size: usize,
    block: Duration,
}

impl PaymentWorker {
    pub fn new(
        stream: Arc<dyn StreamConsumer>,
        lock: Arc<dyn DistributedLock>,
        payment_repo: Arc<dyn PaymentRepository>,
        providers: Arc<ProviderRegistry>,
        processor: ProcessExternalPaymentUseCase,
        consumer_name: impl Into<String>,
    ) -> Self {
        Self {
            stream,
            lock,
            payment_repo,
            providers,
            processor,
            consumer_name: consumer_name.into(),
            lock_ttl: DEFAULT_LOCK_TTL,
            min_idle: DEFAULT_MIN_IDLE,
            batch_size: DEFAULT_BATCH_SIZE,
            block: DEFAULT_BLOCK,
        }
    }

    /// One pass: first reclaim anything a crashed consumer left pending
    /// past `min_idle`, then block-read for fresh entries.
    pub async fn run_once(&self) {
        let reclaimed = self.stream.reclaim_stale(&self.consumer_name, self.min_idle, self.batch_size).await;
        match reclaimed {
            Ok(messages) if !messages.is_empty() => {
                for message in messages {
                    self.handle_message(message).await;
                }
                return;
            }
            Ok(_) => {}
            Err(err) => error!(error = %err, "failed to reclaim stale stream messages"),
        }

        match self.stream.read_group(&self.consumer_name, self.batch_size, self.block).await {
            Ok(messages) => {
                for message in messages {
                    self.handle_message(message).await;
                }
            }
            Err(err) => error!(error = %err, "failed to read from payments stream"),
        }
    }

    async fn handle_message(&self, message: StreamMessage) {
        let payment_id = match Uuid::parse_str(&message.payment_id) {
            Ok(uuid) => PaymentId(uuid),
            Err(_) => {
                warn!(stream_id = %message.id, raw = %message.payment_id, "dropping poison message: invalid payment id");
                self.ack(&message.id).await;
                return;
            }
        };

        let lock_name = lock_name(payment_id);
        let handle = match self.lock.try_acquire(&lock_name, self.lock_ttl).await {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                // Another worker holds the lock; leave the message
                // unacknowledged so it (or a reclaim) is retried later.
                return;
            }
            Err(err) => {
                error!(payment_id = %payment_id, error = %err, "failed to acquire distributed lock");
                return;
            }
        };

        if let Err(err) = self.process(payment_id).await {
            warn!(payment_id = %payment_id, error = %err, "payment processing ended in error");
        }

        match self.lock.release(&handle).await {
            Ok(true) => {}
            Ok(false) => warn!(payment_id = %payment_id, "lock already expired or was stolen before release"),
            Err(err) => error!(payment_id = %payment_id, error = %err, "failed to release distributed lock"),
        }

        self.ack(&message.id).await;
    }

    async fn process(&self, payment_id: PaymentId) -> Result<(), DomainError> {
        let payment = self
            .payment_repo
            .find_by_id(payment_id)
            .await?
            .ok_or(DomainError::PaymentNotFound(payment_id))?;
        let provider_name = payment
            .provider()
            .ok_or_else(|| DomainError::ValidationError(format!("payment {payment_id} has no provider to process")))?;
        let (provider, breaker) = factory::resolve(&self.providers, provider_name)?;
        self.processor.execute(payment_id, provider, breaker).await?;
        Ok(())
    }

    async fn ack(&self, stream_message_id: &str) {
        if let Err(err) = self.stream.ack(stream_message_id).await {
            error!(stream_id = stream_message_id, error = %err, "failed to ack stream message");
        }
    }
}

/// Runs `worker.run_once()` until `shutdown` is tripped.
pub async fn run_forever(worker: PaymentWorker, mut shutdown: watch::Receiver<bool>) {
    if let Err(err) = worker.stream.ensure_group().await {
        error!(error = %err, "failed to ensure payments stream consumer group exists");
        return;
    }

    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            _ = worker.run_once() => {}
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("payment worker loop shutting down");
                    break;
                }
            }
        }
    }
}
