use std::sync::Arc;

use common::Currency;

use crate::domain::entities::Account;
use crate::domain::error::DomainError;
use crate::domain::repository::AccountRepository;

/// Backs `POST /accounts` (spec.md §4.1a): validates the currency code and
/// that the opening balance is not negative, then persists an `active`
/// account at `version = 0`.
#[derive(Clone)]
pub struct CreateAccountUseCase {
    account_repo: Arc<dyn AccountRepository>,
}

impl CreateAccountUseCase {
    pub fn new(account_repo: Arc<dyn AccountRepository>) -> Self {
        Self { account_repo }
    }

    #[tracing::instrument(name = "CreateAccountUseCase::execute", skip(self))]
    pub async fn execute(
        &self,
        user_id: uuid::Uuid,
        initial_balance_cents: i64,
        currency_code: &str,
    ) -> Result<Account, DomainError> {
        let currency = Currency::parse(currency_code).map_err(|e| DomainError::InvalidCurrency(e.to_string()))?;
        let account = Account::new(user_id, currency, initial_balance_cents)?;
        self.account_repo.create(account).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::MockAccountRepository;

    #[tokio::test]
    async fn creates_active_account_with_zero_version() {
        let mut mock_repo = MockAccountRepository::new();
        mock_repo.expect_create().returning(|account| Ok(account));

        let use_case = CreateAccountUseCase::new(Arc::new(mock_repo));
        let account = use_case.execute(uuid::Uuid::new_v4(), 1000, "USD").await.unwrap();

        assert_eq!(account.balance_cents(), 1000);
        assert_eq!(account.version(), 0);
    }

    #[tokio::test]
    async fn rejects_invalid_currency() {
        let mock_repo = MockAccountRepository::new();
        let use_case = CreateAccountUseCase::new(Arc::new(mock_repo));
        let err = use_case.execute(uuid::Uuid::new_v4(), 1000, "U5").await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidCurrency(_)));
    }

    #[tokio::test]
    async fn rejects_negative_balance() {
        let mock_repo = MockAccountRepository::new();
        let use_case = CreateAccountUseCase::new(Arc::new(mock_repo));
        let err = use_case.execute(uuid::Uuid::new_v4(), -1, "USD").await.unwrap_err();
        assert!(matches!(err, DomainError::ValidationError(_)));
    }
}
