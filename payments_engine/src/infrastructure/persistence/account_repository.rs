use async_trait::async_trait;

use crate::domain::entities::Account;
use crate::domain::error::DomainError;
use crate::domain::repository::AccountRepository;
use crate::domain::types::AccountId;
use crate::infrastructure::persistence::models::AccountModel;
use crate::infrastructure::tx::TransactionManager;

/// `AccountRepository` over Postgres. Every query runs through
/// `TransactionManager::execute`, which picks the ambient transaction when
/// one is open (so sync transfers serialize both legs under one commit).
pub struct PostgresAccountRepository {
    tx: TransactionManager,
}

impl PostgresAccountRepository {
    pub fn new(tx: TransactionManager) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, DomainError> {
        self.tx
            .execute(|conn| async move {
                sqlx::query_as::<_, AccountModel>(
                    r#"SELECT id, user_id, balance_cents, currency, version, status, created_at, updated_at
                       FROM accounts WHERE id = $1"#,
                )
                .bind(id)
                .fetch_optional(conn)
                .await
            })
            .await
            .map(|opt| opt.map(Into::into))
            .map_err(DomainError::from_sqlx)
    }

    async fn find_by_id_for_update(&self, id: AccountId) -> Result<Option<Account>, DomainError> {
        self.tx
            .execute(|conn| async move {
                sqlx::query_as::<_, AccountModel>(
                    r#"SELECT id, user_id, balance_cents, currency, version, status, created_at, updated_at
                       FROM accounts WHERE id = $1 FOR UPDATE"#,
                )
                .bind(id)
                .fetch_optional(conn)
                .await
            })
            .await
            .map(|opt| opt.map(Into::into))
            .map_err(DomainError::from_sqlx)
    }

    async fn create(&self, account: Account) -> Result<Account, DomainError> {
        self.tx
            .execute(|conn| async move {
                sqlx::query_as::<_, AccountModel>(
                    r#"
                    INSERT INTO accounts (id, user_id, balance_cents, currency, version, status, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    RETURNING id, user_id, balance_cents, currency, version, status, created_at, updated_at
                    "#,
                )
                .bind(account.id())
                .bind(account.user_id())
                .bind(account.balance_cents())
                .bind(account.currency().clone())
                .bind(account.version())
                .bind(account.status())
                .bind(account.created_at())
                .bind(account.updated_at())
                .fetch_one(conn)
                .await
            })
            .await
            .map(Into::into)
            .map_err(DomainError::from_sqlx)
    }

    /// Commits with `version = version + 1 WHERE id = $1 AND version = $current - 1`;
    /// zero rows affected means someone else's write won the race.
    async fn update(&self, account: &Account) -> Result<(), DomainError> {
        let previous_version = account.version() - 1;
        let result = self
            .tx
            .execute(|conn| async move {
                sqlx::query(
                    r#"
                    UPDATE accounts
                    SET balance_cents = $1, status = $2, version = $3, updated_at = $4
                    WHERE id = $5 AND version = $6
                    "#,
                )
                .bind(account.balance_cents())
                .bind(account.status())
                .bind(account.version())
                .bind(account.updated_at())
                .bind(account.id())
                .bind(previous_version)
                .execute(conn)
                .await
            })
            .await
            .map_err(DomainError::from_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::OptimisticLockFailed);
        }
        Ok(())
    }
}
