use async_trait::async_trait;

use crate::domain::entities::LedgerTransaction;
use crate::domain::error::DomainError;
use crate::domain::repository::LedgerRepository;
use crate::domain::types::AccountId;
use crate::infrastructure::persistence::models::LedgerTransactionModel;
use crate::infrastructure::tx::TransactionManager;

pub struct PostgresLedgerRepository {
    tx: TransactionManager,
}

impl PostgresLedgerRepository {
    pub fn new(tx: TransactionManager) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl LedgerRepository for PostgresLedgerRepository {
    /// Append-only: no update path exists for ledger rows (spec.md §3).
    async fn append(&self, entry: LedgerTransaction) -> Result<LedgerTransaction, DomainError> {
        self.tx
            .execute(|conn| async move {
                sqlx::query_as::<_, LedgerTransactionModel>(
                    r#"
                    INSERT INTO account_transactions
                        (id, account_id, payment_id, entry_type, amount_cents, balance_after_cents, description, created_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    RETURNING id, account_id, payment_id, entry_type, amount_cents, balance_after_cents, description, created_at
                    "#,
                )
                .bind(entry.id())
                .bind(entry.account_id())
                .bind(entry.payment_id())
                .bind(entry.entry_type())
                .bind(entry.amount_cents())
                .bind(entry.balance_after_cents())
                .bind(entry.description())
                .bind(entry.created_at())
                .fetch_one(conn)
                .await
            })
            .await
            .map(Into::into)
            .map_err(DomainError::from_sqlx)
    }

    async fn list_for_account(
        &self,
        account_id: AccountId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LedgerTransaction>, DomainError> {
        self.tx
            .execute(|conn| async move {
                sqlx::query_as::<_, LedgerTransactionModel>(
                    r#"
                    SELECT id, account_id, payment_id, entry_type, amount_cents, balance_after_cents, description, created_at
                    FROM account_transactions
                    WHERE account_id = $1
                    ORDER BY created_at DESC
                    LIMIT $2 OFFSET $3
                    "#,
                )
                .bind(account_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(conn)
                .await
            })
            .await
            .map(|rows| rows.into_iter().map(Into::into).collect())
            .map_err(DomainError::from_sqlx)
    }
}
