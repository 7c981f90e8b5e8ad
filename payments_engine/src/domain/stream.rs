use async_trait::async_trait;
use std::time::Duration;

use super::error::DomainError;

/// One claimed stream entry (spec.md §4.12): `id` is the broker's own
/// message id (needed to ack/claim it), `payment_id` is the domain payload.
#[derive(Debug, Clone)]
pub struct StreamMessage {
    pub id: String,
    pub payment_id: String,
}

/// Publish side of the payments stream (spec.md §4.11), used by the
/// outbox relay.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait StreamPublisher: Send + Sync {
    async fn publish(&self, payment_id: &str) -> Result<String, DomainError>;
}

/// Consumer-group side of the payments stream (spec.md §4.12), used by the
/// payment worker.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait StreamConsumer: Send + Sync {
    async fn ensure_group(&self) -> Result<(), DomainError>;
    async fn read_group(&self, consumer: &str, count: usize, block: Duration) -> Result<Vec<StreamMessage>, DomainError>;
    async fn reclaim_stale(&self, consumer: &str, min_idle: Duration, count: usize) -> Result<Vec<StreamMessage>, DomainError>;
    async fn ack(&self, id: &str) -> Result<(), DomainError>;
}
