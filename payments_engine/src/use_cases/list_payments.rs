use std::sync::Arc;

use crate::domain::entities::Payment;
use crate::domain::error::DomainError;
use crate::domain::repository::{PaymentFilter, PaymentRepository};

/// Backs `GET /payments` (spec.md §4.4, §6). `PaymentFilter` already
/// enforces the sort-column whitelist and `limit = 20` default, so this
/// use case is a thin pass-through; the whitelisting happens once, at the
/// boundary that parses query params into `PaymentFilter`.
#[derive(Clone)]
pub struct ListPaymentsUseCase {
    payment_repo: Arc<dyn PaymentRepository>,
}

impl ListPaymentsUseCase {
    pub fn new(payment_repo: Arc<dyn PaymentRepository>) -> Self {
        Self { payment_repo }
    }

    #[tracing::instrument(name = "ListPaymentsUseCase::execute", skip(self, filter))]
    pub async fn execute(&self, filter: PaymentFilter) -> Result<Vec<Payment>, DomainError> {
        self.payment_repo.list(filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::MockPaymentRepository;

    #[tokio::test]
    async fn delegates_straight_to_the_repository() {
        let mut mock_repo = MockPaymentRepository::new();
        mock_repo.expect_list().returning(|_| Ok(Vec::new()));

        let use_case = ListPaymentsUseCase::new(Arc::new(mock_repo));
        let result = use_case.execute(PaymentFilter::default()).await.unwrap();
        assert!(result.is_empty());
    }
}
