use std::sync::Arc;

use crate::domain::entities::LedgerTransaction;
use crate::domain::error::DomainError;
use crate::domain::repository::{AccountRepository, LedgerRepository};
use crate::domain::types::AccountId;

#[derive(Clone)]
pub struct ListAccountTransactionsUseCase {
    account_repo: Arc<dyn AccountRepository>,
    ledger_repo: Arc<dyn LedgerRepository>,
}

impl ListAccountTransactionsUseCase {
    pub fn new(account_repo: Arc<dyn AccountRepository>, ledger_repo: Arc<dyn LedgerRepository>) -> Self {
        Self {
            account_repo,
            ledger_repo,
        }
    }

    #[tracing::instrument(name = "ListAccountTransactionsUseCase::execute", skip(self))]
    pub async fn execute(
        &self,
        account_id: AccountId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LedgerTransaction>, DomainError> {
        self.account_repo
            .find_by_id(account_id)
            .await?
            .ok_or(DomainError::AccountNotFound(account_id))?;
        self.ledger_repo.list_for_account(account_id, limit, offset).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::{MockAccountRepository, MockLedgerRepository};

    #[tokio::test]
    async fn rejects_unknown_account_without_querying_ledger() {
        let mut account_repo = MockAccountRepository::new();
        let ledger_repo = MockLedgerRepository::new();
        let account_id = AccountId::new();
        account_repo.expect_find_by_id().returning(|_| Ok(None));

        let use_case = ListAccountTransactionsUseCase::new(Arc::new(account_repo), Arc::new(ledger_repo));
        let err = use_case.execute(account_id, 20, 0).await.unwrap_err();
        assert!(matches!(err, DomainError::AccountNotFound(_)));
    }
}
