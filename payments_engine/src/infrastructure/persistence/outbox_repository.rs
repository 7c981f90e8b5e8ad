use async_trait::async_trait;

use crate::domain::entities::OutboxEntry;
use crate::domain::error::DomainError;
use crate::domain::repository::OutboxRepository;
use crate::domain::types::OutboxEntryId;
use crate::infrastructure::persistence::models::OutboxEntryModel;
use crate::infrastructure::tx::TransactionManager;

pub struct PostgresOutboxRepository {
    tx: TransactionManager,
}

impl PostgresOutboxRepository {
    pub fn new(tx: TransactionManager) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl OutboxRepository for PostgresOutboxRepository {
    async fn insert(&self, entry: OutboxEntry) -> Result<OutboxEntry, DomainError> {
        self.tx
            .execute(|conn| async move {
                sqlx::query_as::<_, OutboxEntryModel>(
                    r#"
                    INSERT INTO outbox_entries (id, aggregate_type, aggregate_id, event_type, payload, status, retry_count, max_retries, created_at, published_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                    RETURNING id, aggregate_type, aggregate_id, event_type, payload, status, retry_count, max_retries, created_at, published_at
                    "#,
                )
                .bind(entry.id())
                .bind(entry.aggregate_type())
                .bind(entry.aggregate_id())
                .bind(entry.event_type())
                .bind(entry.payload().clone())
                .bind(entry.status())
                .bind(entry.retry_count())
                .bind(entry.max_retries())
                .bind(entry.created_at())
                .bind(entry.published_at())
                .fetch_one(conn)
                .await
            })
            .await
            .map(Into::into)
            .map_err(DomainError::from_sqlx)
    }

    /// `FOR UPDATE SKIP LOCKED` so concurrent relay workers never grab the
    /// same pending rows (spec.md §4.11).
    async fn get_pending(&self, limit: i64) -> Result<Vec<OutboxEntry>, DomainError> {
        self.tx
            .execute(|conn| async move {
                sqlx::query_as::<_, OutboxEntryModel>(
                    r#"
                    SELECT id, aggregate_type, aggregate_id, event_type, payload, status, retry_count, max_retries, created_at, published_at
                    FROM outbox_entries
                    WHERE status = 'pending'
                    ORDER BY created_at ASC
                    LIMIT $1
                    FOR UPDATE SKIP LOCKED
                    "#,
                )
                .bind(limit)
                .fetch_all(conn)
                .await
            })
            .await
            .map(|rows| rows.into_iter().map(Into::into).collect())
            .map_err(DomainError::from_sqlx)
    }

    async fn mark_published(&self, id: OutboxEntryId) -> Result<(), DomainError> {
        self.tx
            .execute(|conn| async move {
                sqlx::query("UPDATE outbox_entries SET status = 'published', published_at = now() WHERE id = $1")
                    .bind(id)
                    .execute(conn)
                    .await
            })
            .await
            .map(|_| ())
            .map_err(DomainError::from_sqlx)
    }

    async fn mark_failed(&self, id: OutboxEntryId) -> Result<(), DomainError> {
        self.tx
            .execute(|conn| async move {
                sqlx::query(
                    r#"
                    UPDATE outbox_entries
                    SET retry_count = retry_count + 1,
                        status = CASE WHEN retry_count + 1 >= max_retries THEN 'failed' ELSE 'pending' END
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .execute(conn)
                .await
            })
            .await
            .map(|_| ())
            .map_err(DomainError::from_sqlx)
    }
}
