use std::sync::Arc;

use serde_json::Value as Json;

use common::Currency;

use crate::domain::entities::{Payment, PaymentStatus, PaymentType};
use crate::domain::error::DomainError;
use crate::domain::repository::{AccountRepository, PaymentRepository};
use crate::domain::types::{AccountId, IdempotencyKey};
use crate::infrastructure::tx::TransactionManager;

use super::async_enqueue::AsyncEnqueueUseCase;
use super::sync_transfer::SyncTransferExecutor;

pub struct CreatePaymentInput {
    pub idempotency_key: IdempotencyKey,
    pub payment_type: PaymentType,
    pub source_account_id: Option<AccountId>,
    pub destination_account_id: Option<AccountId>,
    pub amount_cents: i64,
    pub currency: Currency,
    pub provider: Option<String>,
    pub metadata: Json,
}

pub struct CreatePaymentResult {
    pub payment: Payment,
    pub is_async: bool,
}

/// The create-payment coordinator (spec.md §4.8): idempotency short-circuit,
/// account validation, construction, and routing to the sync or async path.
#[derive(Clone)]
pub struct CreatePaymentUseCase {
    account_repo: Arc<dyn AccountRepository>,
    payment_repo: Arc<dyn PaymentRepository>,
    tx: TransactionManager,
    sync_transfer: SyncTransferExecutor,
    async_enqueue: AsyncEnqueueUseCase,
}

impl CreatePaymentUseCase {
    pub fn new(
        account_repo: Arc<dyn AccountRepository>,
        payment_repo: Arc<dyn PaymentRepository>,
        tx: TransactionManager,
        sync_transfer: SyncTransferExecutor,
        async_enqueue: AsyncEnqueueUseCase,
    ) -> Self {
        Self {
            account_repo,
            payment_repo,
            tx,
            sync_transfer,
            async_enqueue,
        }
    }

    #[tracing::instrument(name = "CreatePaymentUseCase::execute", skip(self, input))]
    pub async fn execute(&self, input: CreatePaymentInput) -> Result<CreatePaymentResult, DomainError> {
        // Step 1: idempotency short-circuit, no writes.
        if let Some(existing) = self.payment_repo.find_by_idempotency_key(&input.idempotency_key).await? {
            let is_async = existing.payment_type() == PaymentType::ExternalPayment;
            return Ok(CreatePaymentResult { payment: existing, is_async });
        }

        // Step 2: validate accounts before opening the write transaction.
        if let Some(source_id) = input.source_account_id {
            let source = self
                .account_repo
                .find_by_id(source_id)
                .await?
                .ok_or(DomainError::AccountNotFound(source_id))?;
            if source.status() != crate::domain::entities::AccountStatus::Active {
                return Err(DomainError::AccountInactive(source_id));
            }
            if source.currency() != &input.currency {
                return Err(DomainError::ValidationError(
                    "source account currency does not match payment currency".to_string(),
                ));
            }
        }
        if input.payment_type == PaymentType::InternalTransfer {
            let destination_id = input
                .destination_account_id
                .ok_or_else(|| DomainError::ValidationError("internal_transfer requires a destination account".to_string()))?;
            let destination = self
                .account_repo
                .find_by_id(destination_id)
                .await?
                .ok_or(DomainError::AccountNotFound(destination_id))?;
            if destination.status() != crate::domain::entities::AccountStatus::Active {
                return Err(DomainError::AccountInactive(destination_id));
            }
        }

        // Step 3: construct in `pending`.
        let payment = Payment::new(
            input.idempotency_key,
            input.payment_type,
            input.source_account_id,
            input.destination_account_id,
            input.amount_cents,
            input.currency,
            input.provider,
            input.metadata,
        )?;

        // Step 4: route, all writes inside one DB transaction.
        let payment_type = payment.payment_type();
        let sync_transfer = self.sync_transfer.clone();
        let async_enqueue = self.async_enqueue.clone();
        let payment_repo = self.payment_repo.clone();

        let result = self
            .tx
            .with_transaction(move || {
                let payment = payment.clone();
                let payment_repo = payment_repo.clone();
                let sync_transfer = sync_transfer.clone();
                let async_enqueue = async_enqueue.clone();
                async move {
                    match payment_type {
                        PaymentType::InternalTransfer => {
                            let payment = payment_repo.create(payment).await?;
                            sync_transfer.execute(payment).await
                        }
                        PaymentType::ExternalPayment => async_enqueue.execute(payment).await,
                    }
                }
            })
            .await?;

        let is_async = payment_type == PaymentType::ExternalPayment;
        Ok(CreatePaymentResult { payment: result, is_async })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::{
        MockAccountRepository, MockLedgerRepository, MockOutboxRepository, MockPaymentEventRepository, MockPaymentRepository,
    };
    use serde_json::json;

    #[tokio::test]
    async fn idempotency_hit_short_circuits_without_touching_accounts() {
        let key = IdempotencyKey("dup-key".to_string());
        let existing = Payment::new(
            key.clone(),
            PaymentType::InternalTransfer,
            Some(AccountId::new()),
            Some(AccountId::new()),
            1_000,
            Currency::parse("USD").unwrap(),
            None,
            json!({}),
        )
        .unwrap();

        let mut payment_repo = MockPaymentRepository::new();
        let existing_clone = existing.clone();
        payment_repo
            .expect_find_by_idempotency_key()
            .returning(move |_| Ok(Some(existing_clone.clone())));

        let account_repo = MockAccountRepository::new();
        let ledger_repo = MockLedgerRepository::new();
        let payment_event_repo = MockPaymentEventRepository::new();
        let outbox_repo = MockOutboxRepository::new();

        let pool = sqlx::PgPool::connect_lazy("postgres://localhost/unused").unwrap();
        let tx = TransactionManager::new(pool);

        let payment_repo: Arc<dyn PaymentRepository> = Arc::new(payment_repo);
        let sync_transfer = SyncTransferExecutor::new(
            Arc::new(account_repo),
            Arc::new(ledger_repo),
            payment_repo.clone(),
            Arc::new(payment_event_repo),
        );
        let payment_event_repo2 = MockPaymentEventRepository::new();
        let async_enqueue = AsyncEnqueueUseCase::new(payment_repo.clone(), Arc::new(outbox_repo), Arc::new(payment_event_repo2));

        let account_repo_for_coordinator = MockAccountRepository::new();
        let use_case = CreatePaymentUseCase::new(
            Arc::new(account_repo_for_coordinator),
            payment_repo,
            tx,
            sync_transfer,
            async_enqueue,
        );

        let input = CreatePaymentInput {
            idempotency_key: key,
            payment_type: PaymentType::InternalTransfer,
            source_account_id: existing.source_account_id(),
            destination_account_id: existing.destination_account_id(),
            amount_cents: 1_000,
            currency: Currency::parse("USD").unwrap(),
            provider: None,
            metadata: json!({}),
        };

        let result = use_case.execute(input).await.unwrap();
        assert_eq!(result.payment.id(), existing.id());
        assert!(!result.is_async);
    }
}
