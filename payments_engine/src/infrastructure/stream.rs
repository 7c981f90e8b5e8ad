use async_trait::async_trait;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use std::time::Duration;

use crate::domain::error::DomainError;
use crate::domain::stream::{StreamConsumer, StreamMessage, StreamPublisher};

/// Thin wrapper over Redis Streams implementing the consumer-group protocol
/// spec.md §4.12 needs: `XADD` to publish, `XREADGROUP` to claim fresh
/// entries, `XACK` to confirm processing, and `XCLAIM` to reclaim entries a
/// crashed consumer left pending past `min_idle_time`.
#[derive(Clone)]
pub struct RedisStream {
    client: redis::Client,
    stream_key: String,
    group: String,
}

impl RedisStream {
    pub fn new(client: redis::Client, stream_key: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            client,
            stream_key: stream_key.into(),
            group: group.into(),
        }
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, DomainError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| DomainError::Internal(format!("redis connection error: {e}")))
    }

    fn flatten(reply: StreamReadReply) -> Vec<StreamMessage> {
        reply
            .keys
            .into_iter()
            .flat_map(|key| key.ids)
            .filter_map(|entry| {
                let payment_id: String = entry.get("payment_id")?;
                Some(StreamMessage {
                    id: entry.id,
                    payment_id,
                })
            })
            .collect()
    }
}

#[async_trait]
impl StreamPublisher for RedisStream {
    async fn publish(&self, payment_id: &str) -> Result<String, DomainError> {
        let mut conn = self.connection().await?;
        let id: String = conn
            .xadd(&self.stream_key, "*", &[("payment_id", payment_id)])
            .await
            .map_err(|e| DomainError::Internal(format!("redis XADD error: {e}")))?;
        Ok(id)
    }
}

#[async_trait]
impl StreamConsumer for RedisStream {
    /// Creates the consumer group if absent. `MKSTREAM` so the first worker
    /// to start up doesn't need the stream to already exist.
    async fn ensure_group(&self) -> Result<(), DomainError> {
        let mut conn = self.connection().await?;
        let result: redis::RedisResult<()> = conn
            .xgroup_create_mkstream(&self.stream_key, &self.group, "0")
            .await;
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.to_string().contains("BUSYGROUP") => Ok(()),
            Err(e) => Err(DomainError::Internal(format!("redis XGROUP CREATE error: {e}"))),
        }
    }

    /// Reads up to `count` new entries for `consumer`, blocking up to
    /// `block` for new arrivals.
    async fn read_group(&self, consumer: &str, count: usize, block: Duration) -> Result<Vec<StreamMessage>, DomainError> {
        let mut conn = self.connection().await?;
        let opts = StreamReadOptions::default()
            .group(&self.group, consumer)
            .count(count)
            .block(block.as_millis() as usize);

        let reply: StreamReadReply = conn
            .xread_options(&[self.stream_key.as_str()], &[">"], &opts)
            .await
            .map_err(|e| DomainError::Internal(format!("redis XREADGROUP error: {e}")))?;

        Ok(Self::flatten(reply))
    }

    /// Reclaims entries idle for longer than `min_idle`, handing them to
    /// `consumer` (spec.md §4.12's crash-recovery path).
    async fn reclaim_stale(&self, consumer: &str, min_idle: Duration, count: usize) -> Result<Vec<StreamMessage>, DomainError> {
        let mut conn = self.connection().await?;
        let pending: redis::streams::StreamPendingCountReply = conn
            .xpending_count(&self.stream_key, &self.group, "-", "+", count)
            .await
            .map_err(|e| DomainError::Internal(format!("redis XPENDING error: {e}")))?;

        let stale_ids: Vec<String> = pending
            .ids
            .into_iter()
            .filter(|p| p.time_since_delivered as u128 >= min_idle.as_millis())
            .map(|p| p.id)
            .collect();

        if stale_ids.is_empty() {
            return Ok(Vec::new());
        }

        let reply: StreamReadReply = conn
            .xclaim(
                &self.stream_key,
                &self.group,
                consumer,
                min_idle.as_millis() as usize,
                &stale_ids,
            )
            .await
            .map_err(|e| DomainError::Internal(format!("redis XCLAIM error: {e}")))?;

        Ok(Self::flatten(reply))
    }

    async fn ack(&self, id: &str) -> Result<(), DomainError> {
        let mut conn = self.connection().await?;
        let _: i64 = conn
            .xack(&self.stream_key, &self.group, &[id])
            .await
            .map_err(|e| DomainError::Internal(format!("redis XACK error: {e}")))?;
        Ok(())
    }
}
