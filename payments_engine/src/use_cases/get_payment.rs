use std::sync::Arc;

use crate::domain::entities::Payment;
use crate::domain::error::DomainError;
use crate::domain::repository::PaymentRepository;
use crate::domain::types::PaymentId;

#[derive(Clone)]
pub struct GetPaymentUseCase {
    payment_repo: Arc<dyn PaymentRepository>,
}

impl GetPaymentUseCase {
    pub fn new(payment_repo: Arc<dyn PaymentRepository>) -> Self {
        Self { payment_repo }
    }

    #[tracing::instrument(name = "GetPaymentUseCase::execute", skip(self))]
    pub async fn execute(&self, payment_id: PaymentId) -> Result<Payment, DomainError> {
        self.payment_repo
            .find_by_id(payment_id)
            .await?
            .ok_or(DomainError::PaymentNotFound(payment_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::MockPaymentRepository;

    #[tokio::test]
    async fn not_found_surfaces_payment_not_found() {
        let mut mock_repo = MockPaymentRepository::new();
        let payment_id = PaymentId::new();
        mock_repo.expect_find_by_id().returning(|_| Ok(None));

        let use_case = GetPaymentUseCase::new(Arc::new(mock_repo));
        let err = use_case.execute(payment_id).await.unwrap_err();
        assert!(matches!(err, DomainError::PaymentNotFound(id) if id == payment_id));
    }
}
