use std::sync::Arc;

use crate::domain::entities::Account;
use crate::domain::error::DomainError;
use crate::domain::repository::AccountRepository;
use crate::domain::types::AccountId;

#[derive(Clone)]
pub struct GetAccountUseCase {
    account_repo: Arc<dyn AccountRepository>,
}

impl GetAccountUseCase {
    pub fn new(account_repo: Arc<dyn AccountRepository>) -> Self {
        Self { account_repo }
    }

    #[tracing::instrument(name = "GetAccountUseCase::execute", skip(self))]
    pub async fn execute(&self, account_id: AccountId) -> Result<Account, DomainError> {
        self.account_repo
            .find_by_id(account_id)
            .await?
            .ok_or(DomainError::AccountNotFound(account_id))
    }
}
