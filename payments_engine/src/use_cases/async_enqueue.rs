use std::sync::Arc;

use serde_json::json;

use crate::domain::entities::{OutboxEntry, Payment, PaymentEvent, PaymentEventType};
use crate::domain::error::DomainError;
use crate::domain::repository::{OutboxRepository, PaymentEventRepository, PaymentRepository};

/// Persists an `external_payment` as `pending` and enqueues it for the
/// worker via the transactional outbox (spec.md §4.10). Runs inside the
/// coordinator's open DB transaction — the outbox insert is atomic with
/// the payment insert by construction, since both go through the same
/// ambient transaction.
#[derive(Clone)]
pub struct AsyncEnqueueUseCase {
    payment_repo: Arc<dyn PaymentRepository>,
    outbox_repo: Arc<dyn OutboxRepository>,
    payment_event_repo: Arc<dyn PaymentEventRepository>,
}

impl AsyncEnqueueUseCase {
    pub fn new(
        payment_repo: Arc<dyn PaymentRepository>,
        outbox_repo: Arc<dyn OutboxRepository>,
        payment_event_repo: Arc<dyn PaymentEventRepository>,
    ) -> Self {
        Self {
            payment_repo,
            outbox_repo,
            payment_event_repo,
        }
    }

    #[tracing::instrument(name = "AsyncEnqueueUseCase::execute", skip(self, payment))]
    pub async fn execute(&self, payment: Payment) -> Result<Payment, DomainError> {
        let payment = self.payment_repo.create(payment).await?;

        let payload = json!({
            "payment_id": payment.id().to_string(),
            "type": "external_payment",
            "amount_cents": payment.amount_cents(),
            "currency": payment.currency().to_string(),
            "provider": payment.provider(),
        });
        self.outbox_repo
            .insert(OutboxEntry::new(
                "payment",
                payment.id().0,
                PaymentEventType::Created.as_wire_str(),
                payload,
            ))
            .await?;

        self.payment_event_repo
            .append(PaymentEvent::new(payment.id(), PaymentEventType::Created, json!({})))
            .await?;

        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::PaymentType;
    use crate::domain::repository::{MockOutboxRepository, MockPaymentEventRepository, MockPaymentRepository};
    use crate::domain::types::{AccountId, IdempotencyKey};
    use common::Currency;

    fn external_payment() -> Payment {
        Payment::new(
            IdempotencyKey("key".to_string()),
            PaymentType::ExternalPayment,
            Some(AccountId::new()),
            None,
            2_500,
            Currency::parse("USD").unwrap(),
            Some("sandbox_primary".to_string()),
            json!({}),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn persists_payment_and_writes_outbox_entry_atomically() {
        let mut payment_repo = MockPaymentRepository::new();
        payment_repo.expect_create().returning(Ok);

        let mut outbox_repo = MockOutboxRepository::new();
        outbox_repo.expect_insert().returning(Ok);

        let mut payment_event_repo = MockPaymentEventRepository::new();
        payment_event_repo.expect_append().returning(Ok);

        let use_case = AsyncEnqueueUseCase::new(Arc::new(payment_repo), Arc::new(outbox_repo), Arc::new(payment_event_repo));
        let result = use_case.execute(external_payment()).await.unwrap();
        assert_eq!(result.status(), crate::domain::entities::PaymentStatus::Pending);
    }
}
