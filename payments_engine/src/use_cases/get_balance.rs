use std::sync::Arc;

use common::Currency;

use crate::domain::error::DomainError;
use crate::domain::repository::AccountRepository;
use crate::domain::types::AccountId;

pub struct Balance {
    pub balance_cents: i64,
    pub currency: Currency,
}

#[derive(Clone)]
pub struct GetBalanceUseCase {
    account_repo: Arc<dyn AccountRepository>,
}

impl GetBalanceUseCase {
    pub fn new(account_repo: Arc<dyn AccountRepository>) -> Self {
        Self { account_repo }
    }

    #[tracing::instrument(name = "GetBalanceUseCase::execute", skip(self))]
    pub async fn execute(&self, account_id: AccountId) -> Result<Balance, DomainError> {
        let account = self
            .account_repo
            .find_by_id(account_id)
            .await?
            .ok_or(DomainError::AccountNotFound(account_id))?;
        Ok(Balance {
            balance_cents: account.balance_cents(),
            currency: account.currency().clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Account;
    use crate::domain::repository::MockAccountRepository;

    #[tokio::test]
    async fn returns_balance_and_currency() {
        let mut mock_repo = MockAccountRepository::new();
        let account = Account::new(uuid::Uuid::new_v4(), Currency::parse("USD").unwrap(), 4200).unwrap();
        let account_id = account.id();
        mock_repo.expect_find_by_id().returning(move |_| Ok(Some(account.clone())));

        let use_case = GetBalanceUseCase::new(Arc::new(mock_repo));
        let balance = use_case.execute(account_id).await.unwrap();
        assert_eq!(balance.balance_cents, 4200);
        assert_eq!(balance.currency.to_string(), "USD");
    }
}
