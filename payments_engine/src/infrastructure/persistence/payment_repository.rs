use async_trait::async_trait;

use crate::domain::entities::Payment;
use crate::domain::error::DomainError;
use crate::domain::repository::{PaymentFilter, PaymentRepository};
use crate::domain::types::{IdempotencyKey, PaymentId};
use crate::infrastructure::persistence::models::PaymentModel;
use crate::infrastructure::tx::TransactionManager;

pub struct PostgresPaymentRepository {
    tx: TransactionManager,
}

impl PostgresPaymentRepository {
    pub fn new(tx: TransactionManager) -> Self {
        Self { tx }
    }
}

const PAYMENT_COLUMNS: &str = r#"id, idempotency_key, payment_type, source_account_id, destination_account_id,
    amount_cents, currency, status, provider, provider_transaction_id, retry_count, max_retries,
    last_error, metadata, funds_reserved, created_at, updated_at, completed_at"#;

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn create(&self, payment: Payment) -> Result<Payment, DomainError> {
        let query = format!(
            r#"
            INSERT INTO payments (id, idempotency_key, payment_type, source_account_id, destination_account_id,
                amount_cents, currency, status, provider, provider_transaction_id, retry_count, max_retries,
                last_error, metadata, funds_reserved, created_at, updated_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING {PAYMENT_COLUMNS}
            "#
        );
        self.tx
            .execute(|conn| async move {
                sqlx::query_as::<_, PaymentModel>(&query)
                    .bind(payment.id())
                    .bind(payment.idempotency_key())
                    .bind(payment.payment_type())
                    .bind(payment.source_account_id())
                    .bind(payment.destination_account_id())
                    .bind(payment.amount_cents())
                    .bind(payment.currency().clone())
                    .bind(payment.status())
                    .bind(payment.provider())
                    .bind(payment.provider_transaction_id())
                    .bind(payment.retry_count())
                    .bind(payment.max_retries())
                    .bind(payment.last_error())
                    .bind(payment.metadata().clone())
                    .bind(payment.funds_reserved())
                    .bind(payment.created_at())
                    .bind(payment.updated_at())
                    .bind(payment.completed_at())
                    .fetch_one(conn)
                    .await
            })
            .await
            .map(Into::into)
            .map_err(DomainError::from_sqlx)
    }

    async fn update(&self, payment: &Payment) -> Result<(), DomainError> {
        let result = self
            .tx
            .execute(|conn| async move {
                sqlx::query(
                    r#"
                    UPDATE payments
                    SET status = $1, provider_transaction_id = $2, retry_count = $3, last_error = $4,
                        funds_reserved = $5, updated_at = $6, completed_at = $7
                    WHERE id = $8
                    "#,
                )
                .bind(payment.status())
                .bind(payment.provider_transaction_id())
                .bind(payment.retry_count())
                .bind(payment.last_error())
                .bind(payment.funds_reserved())
                .bind(payment.updated_at())
                .bind(payment.completed_at())
                .bind(payment.id())
                .execute(conn)
                .await
            })
            .await
            .map_err(DomainError::from_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::PaymentNotFound(payment.id()));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: PaymentId) -> Result<Option<Payment>, DomainError> {
        let query = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1");
        self.tx
            .execute(|conn| async move { sqlx::query_as::<_, PaymentModel>(&query).bind(id).fetch_optional(conn).await })
            .await
            .map(|opt| opt.map(Into::into))
            .map_err(DomainError::from_sqlx)
    }

    async fn find_by_idempotency_key(&self, key: &IdempotencyKey) -> Result<Option<Payment>, DomainError> {
        let query = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE idempotency_key = $1");
        self.tx
            .execute(|conn| async move {
                sqlx::query_as::<_, PaymentModel>(&query)
                    .bind(key)
                    .fetch_optional(conn)
                    .await
            })
            .await
            .map(|opt| opt.map(Into::into))
            .map_err(DomainError::from_sqlx)
    }

    async fn list(&self, filter: PaymentFilter) -> Result<Vec<Payment>, DomainError> {
        // Column/direction come off the closed `PaymentSortColumn`/`SortOrder`
        // enums (spec.md §9), never from a raw query string, so this format!
        // never interpolates user input.
        let query = format!(
            r#"
            SELECT {PAYMENT_COLUMNS} FROM payments
            WHERE ($1::uuid IS NULL OR source_account_id = $1 OR destination_account_id = $1)
              AND ($2::payment_status IS NULL OR status = $2)
              AND ($3::text IS NULL OR provider = $3)
            ORDER BY {} {}
            LIMIT $4 OFFSET $5
            "#,
            filter.sort_by.column_name(),
            filter.sort_order.sql_keyword(),
        );
        self.tx
            .execute(|conn| async move {
                sqlx::query_as::<_, PaymentModel>(&query)
                    .bind(filter.account_id)
                    .bind(filter.status)
                    .bind(filter.provider)
                    .bind(filter.limit)
                    .bind(filter.offset)
                    .fetch_all(conn)
                    .await
            })
            .await
            .map(|rows| rows.into_iter().map(Into::into).collect())
            .map_err(DomainError::from_sqlx)
    }
}
