use std::sync::Arc;

use serde_json::json;

use crate::domain::entities::{LedgerEntryType, LedgerTransaction, Payment, PaymentEvent, PaymentEventType};
use crate::domain::error::DomainError;
use crate::domain::repository::{AccountRepository, LedgerRepository, PaymentEventRepository, PaymentRepository};
use crate::domain::types::AccountId;

/// Executes an `internal_transfer` payment (spec.md §4.9). The caller
/// (`CreatePaymentUseCase`) must already have opened the DB transaction
/// this runs in — every repository call below goes through
/// `TransactionManager::execute` and lands on that same transaction.
#[derive(Clone)]
pub struct SyncTransferExecutor {
    account_repo: Arc<dyn AccountRepository>,
    ledger_repo: Arc<dyn LedgerRepository>,
    payment_repo: Arc<dyn PaymentRepository>,
    payment_event_repo: Arc<dyn PaymentEventRepository>,
}

impl SyncTransferExecutor {
    pub fn new(
        account_repo: Arc<dyn AccountRepository>,
        ledger_repo: Arc<dyn LedgerRepository>,
        payment_repo: Arc<dyn PaymentRepository>,
        payment_event_repo: Arc<dyn PaymentEventRepository>,
    ) -> Self {
        Self {
            account_repo,
            ledger_repo,
            payment_repo,
            payment_event_repo,
        }
    }

    #[tracing::instrument(name = "SyncTransferExecutor::execute", skip(self, payment))]
    pub async fn execute(&self, mut payment: Payment) -> Result<Payment, DomainError> {
        let source_id = payment
            .source_account_id()
            .ok_or_else(|| DomainError::ValidationError("internal_transfer requires a source account".to_string()))?;
        let destination_id = payment
            .destination_account_id()
            .ok_or_else(|| DomainError::ValidationError("internal_transfer requires a destination account".to_string()))?;

        // Canonical lock order by string id (spec.md §4.9 step 1-2, §9):
        // two concurrent transfers over the same pair always lock in the
        // same order, so they never deadlock against each other.
        let (first, second) = if source_id.to_string() <= destination_id.to_string() {
            (source_id, destination_id)
        } else {
            (destination_id, source_id)
        };
        let first_locked = self
            .account_repo
            .find_by_id_for_update(first)
            .await?
            .ok_or(DomainError::AccountNotFound(first))?;
        let second_locked = self
            .account_repo
            .find_by_id_for_update(second)
            .await?
            .ok_or(DomainError::AccountNotFound(second))?;

        let (mut source, mut destination) = if first_locked.id() == source_id {
            (first_locked, second_locked)
        } else {
            (second_locked, first_locked)
        };

        // Mark completed and persist the payment before the ledger rows,
        // since ledger rows carry a foreign key to payment_id.
        payment.mark_completed(None)?;
        self.payment_repo.update(&payment).await?;

        source.debit(payment.amount_cents())?;
        self.account_repo.update(&source).await?;
        self.ledger_repo
            .append(LedgerTransaction::new(
                source.id(),
                Some(payment.id()),
                LedgerEntryType::Debit,
                payment.amount_cents(),
                source.balance_cents(),
                "internal transfer debit",
            ))
            .await?;

        destination.credit(payment.amount_cents())?;
        self.account_repo.update(&destination).await?;
        self.ledger_repo
            .append(LedgerTransaction::new(
                destination.id(),
                Some(payment.id()),
                LedgerEntryType::Credit,
                payment.amount_cents(),
                destination.balance_cents(),
                "internal transfer credit",
            ))
            .await?;

        self.payment_event_repo
            .append(PaymentEvent::new(
                payment.id(),
                PaymentEventType::Completed,
                json!({ "source_account_id": source_id, "destination_account_id": destination_id, "amount_cents": payment.amount_cents() }),
            ))
            .await?;

        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Account;
    use crate::domain::repository::{MockAccountRepository, MockLedgerRepository, MockPaymentEventRepository, MockPaymentRepository};
    use crate::domain::types::{IdempotencyKey, PaymentId};
    use common::Currency;

    fn transfer_payment(source: AccountId, destination: AccountId, amount_cents: i64) -> Payment {
        Payment::new(
            IdempotencyKey("key".to_string()),
            crate::domain::entities::PaymentType::InternalTransfer,
            Some(source),
            Some(destination),
            amount_cents,
            Currency::parse("USD").unwrap(),
            None,
            json!({}),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn debits_source_and_credits_destination() {
        let source = Account::new(uuid::Uuid::new_v4(), Currency::parse("USD").unwrap(), 10_000).unwrap();
        let destination = Account::new(uuid::Uuid::new_v4(), Currency::parse("USD").unwrap(), 5_000).unwrap();
        let payment = transfer_payment(source.id(), destination.id(), 2_500);

        let mut account_repo = MockAccountRepository::new();
        let source_clone = source.clone();
        let destination_clone = destination.clone();
        account_repo.expect_find_by_id_for_update().returning(move |id| {
            if id == source_clone.id() {
                Ok(Some(source_clone.clone()))
            } else if id == destination_clone.id() {
                Ok(Some(destination_clone.clone()))
            } else {
                Ok(None)
            }
        });
        account_repo.expect_update().returning(|_| Ok(()));

        let mut ledger_repo = MockLedgerRepository::new();
        ledger_repo.expect_append().returning(|entry| Ok(entry));

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo.expect_update().returning(|_| Ok(()));

        let mut payment_event_repo = MockPaymentEventRepository::new();
        payment_event_repo.expect_append().returning(|event| Ok(event));

        let executor = SyncTransferExecutor::new(
            Arc::new(account_repo),
            Arc::new(ledger_repo),
            Arc::new(payment_repo),
            Arc::new(payment_event_repo),
        );

        let result = executor.execute(payment).await.unwrap();
        assert_eq!(result.status(), crate::domain::entities::PaymentStatus::Completed);
    }

    #[tokio::test]
    async fn missing_source_account_fails_without_mutating_anything() {
        let destination = Account::new(uuid::Uuid::new_v4(), Currency::parse("USD").unwrap(), 5_000).unwrap();
        let payment = transfer_payment(AccountId::new(), destination.id(), 2_500);

        let mut account_repo = MockAccountRepository::new();
        account_repo.expect_find_by_id_for_update().returning(|_| Ok(None));

        let ledger_repo = MockLedgerRepository::new();
        let payment_repo = MockPaymentRepository::new();
        let payment_event_repo = MockPaymentEventRepository::new();

        let executor = SyncTransferExecutor::new(
            Arc::new(account_repo),
            Arc::new(ledger_repo),
            Arc::new(payment_repo),
            Arc::new(payment_event_repo),
        );

        let err = executor.execute(payment).await.unwrap_err();
        assert!(matches!(err, DomainError::AccountNotFound(_)));
    }

    #[allow(dead_code)]
    fn _unused_payment_id() -> PaymentId {
        PaymentId::new()
    }
}
