use std::sync::Arc;

use serde_json::json;

use crate::domain::entities::{Payment, PaymentEvent, PaymentEventType};
use crate::domain::error::DomainError;
use crate::domain::repository::{PaymentEventRepository, PaymentRepository};
use crate::domain::types::PaymentId;

/// Cancels a payment before any funds have moved (spec.md §9's addition,
/// SPEC_FULL.md §4.14a). Only valid from `pending` — `Payment::transition`
/// rejects anything else, so this is a pure state change plus an event.
#[derive(Clone)]
pub struct CancelPaymentUseCase {
    payment_repo: Arc<dyn PaymentRepository>,
    payment_event_repo: Arc<dyn PaymentEventRepository>,
}

impl CancelPaymentUseCase {
    pub fn new(payment_repo: Arc<dyn PaymentRepository>, payment_event_repo: Arc<dyn PaymentEventRepository>) -> Self {
        Self {
            payment_repo,
            payment_event_repo,
        }
    }

    #[tracing::instrument(name = "CancelPaymentUseCase::execute", skip(self))]
    pub async fn execute(&self, payment_id: PaymentId) -> Result<Payment, DomainError> {
        let mut payment = self
            .payment_repo
            .find_by_id(payment_id)
            .await?
            .ok_or(DomainError::PaymentNotFound(payment_id))?;

        payment.mark_cancelled()?;
        self.payment_repo.update(&payment).await?;
        self.payment_event_repo
            .append(PaymentEvent::new(payment.id(), PaymentEventType::Cancelled, json!({})))
            .await?;

        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{PaymentStatus, PaymentType};
    use crate::domain::repository::{MockPaymentEventRepository, MockPaymentRepository};
    use crate::domain::types::{AccountId, IdempotencyKey};
    use common::Currency;

    fn pending_transfer() -> Payment {
        Payment::new(
            IdempotencyKey("key".to_string()),
            PaymentType::InternalTransfer,
            Some(AccountId::new()),
            Some(AccountId::new()),
            1_000,
            Currency::parse("USD").unwrap(),
            None,
            json!({}),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn cancels_a_pending_payment() {
        let payment = pending_transfer();
        let payment_id = payment.id();

        let mut payment_repo = MockPaymentRepository::new();
        let payment_clone = payment.clone();
        payment_repo.expect_find_by_id().returning(move |_| Ok(Some(payment_clone.clone())));
        payment_repo.expect_update().returning(|_| Ok(()));

        let mut payment_event_repo = MockPaymentEventRepository::new();
        payment_event_repo.expect_append().returning(Ok);

        let use_case = CancelPaymentUseCase::new(Arc::new(payment_repo), Arc::new(payment_event_repo));
        let result = use_case.execute(payment_id).await.unwrap();
        assert_eq!(result.status(), PaymentStatus::Cancelled);
    }

    #[tokio::test]
    async fn cancelling_a_completed_payment_is_rejected() {
        let mut payment = pending_transfer();
        payment.mark_completed(None).unwrap();
        let payment_id = payment.id();

        let mut payment_repo = MockPaymentRepository::new();
        let payment_clone = payment.clone();
        payment_repo.expect_find_by_id().returning(move |_| Ok(Some(payment_clone.clone())));

        let payment_event_repo = MockPaymentEventRepository::new();

        let use_case = CancelPaymentUseCase::new(Arc::new(payment_repo), Arc::new(payment_event_repo));
        let err = use_case.execute(payment_id).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidStateTransition(_)));
    }
}
