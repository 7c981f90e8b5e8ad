use async_trait::async_trait;

use crate::domain::entities::PaymentEvent;
use crate::domain::error::DomainError;
use crate::domain::repository::PaymentEventRepository;
use crate::domain::types::PaymentId;
use crate::infrastructure::persistence::models::PaymentEventModel;
use crate::infrastructure::tx::TransactionManager;

pub struct PostgresPaymentEventRepository {
    tx: TransactionManager,
}

impl PostgresPaymentEventRepository {
    pub fn new(tx: TransactionManager) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl PaymentEventRepository for PostgresPaymentEventRepository {
    async fn append(&self, event: PaymentEvent) -> Result<PaymentEvent, DomainError> {
        self.tx
            .execute(|conn| async move {
                sqlx::query_as::<_, PaymentEventModel>(
                    r#"
                    INSERT INTO payment_events (id, payment_id, event_type, event_data, created_at)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING id, payment_id, event_type, event_data, created_at
                    "#,
                )
                .bind(event.id())
                .bind(event.payment_id())
                .bind(event.event_type())
                .bind(event.event_data().clone())
                .bind(event.created_at())
                .fetch_one(conn)
                .await
            })
            .await
            .map(Into::into)
            .map_err(DomainError::from_sqlx)
    }

    async fn list_for_payment(&self, payment_id: PaymentId) -> Result<Vec<PaymentEvent>, DomainError> {
        self.tx
            .execute(|conn| async move {
                sqlx::query_as::<_, PaymentEventModel>(
                    r#"
                    SELECT id, payment_id, event_type, event_data, created_at
                    FROM payment_events
                    WHERE payment_id = $1
                    ORDER BY created_at ASC
                    "#,
                )
                .bind(payment_id)
                .fetch_all(conn)
                .await
            })
            .await
            .map(|rows| rows.into_iter().map(Into::into).collect())
            .map_err(DomainError::from_sqlx)
    }
}
