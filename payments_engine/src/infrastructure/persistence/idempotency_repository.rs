use async_trait::async_trait;

use crate::domain::entities::IdempotencyRecord;
use crate::domain::error::DomainError;
use crate::domain::repository::IdempotencyRepository;
use crate::domain::types::IdempotencyKey;
use crate::infrastructure::persistence::models::IdempotencyRecordModel;
use crate::infrastructure::tx::TransactionManager;

pub struct PostgresIdempotencyRepository {
    tx: TransactionManager,
}

impl PostgresIdempotencyRepository {
    pub fn new(tx: TransactionManager) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl IdempotencyRepository for PostgresIdempotencyRepository {
    async fn get(&self, key: &IdempotencyKey) -> Result<Option<IdempotencyRecord>, DomainError> {
        self.tx
            .execute(|conn| async move {
                sqlx::query_as::<_, IdempotencyRecordModel>(
                    "SELECT key, response_status, response_body, created_at, expires_at FROM idempotency_keys WHERE key = $1",
                )
                .bind(key)
                .fetch_optional(conn)
                .await
            })
            .await
            .map(|opt| opt.map(Into::into))
            .map_err(DomainError::from_sqlx)
    }

    /// Upserts so a retried request within the TTL window overwrites the
    /// previous cached response rather than failing a unique constraint.
    async fn set(&self, record: IdempotencyRecord) -> Result<(), DomainError> {
        self.tx
            .execute(|conn| async move {
                sqlx::query(
                    r#"
                    INSERT INTO idempotency_keys (key, response_status, response_body, created_at, expires_at)
                    VALUES ($1, $2, $3, $4, $5)
                    ON CONFLICT (key) DO UPDATE
                    SET response_status = EXCLUDED.response_status,
                        response_body = EXCLUDED.response_body,
                        expires_at = EXCLUDED.expires_at
                    "#,
                )
                .bind(record.key())
                .bind(record.response_status() as i32)
                .bind(record.response_body())
                .bind(record.created_at())
                .bind(record.expires_at())
                .execute(conn)
                .await
            })
            .await
            .map(|_| ())
            .map_err(DomainError::from_sqlx)
    }

    async fn cleanup(&self) -> Result<u64, DomainError> {
        self.tx
            .execute(|conn| async move {
                sqlx::query("DELETE FROM idempotency_keys WHERE expires_at < now()")
                    .execute(conn)
                    .await
            })
            .await
            .map(|result| result.rows_affected())
            .map_err(DomainError::from_sqlx)
    }
}
