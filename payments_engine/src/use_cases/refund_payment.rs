use std::sync::Arc;

use serde_json::json;

use crate::domain::entities::{LedgerEntryType, LedgerTransaction, Payment, PaymentEvent, PaymentEventType, PaymentStatus, PaymentType};
use crate::domain::error::DomainError;
use crate::domain::provider::RefundRequest;
use crate::domain::repository::{AccountRepository, LedgerRepository, PaymentEventRepository, PaymentRepository};
use crate::domain::types::PaymentId;
use crate::infrastructure::provider::ProviderRegistry;
use crate::infrastructure::tx::TransactionManager;

/// Reverses a `completed` payment (spec.md §4.14). For `external_payment`,
/// the provider's own refund must succeed first; for `internal_transfer`,
/// reverses both ledger legs.
#[derive(Clone)]
pub struct RefundPaymentUseCase {
    tx: TransactionManager,
    account_repo: Arc<dyn AccountRepository>,
    ledger_repo: Arc<dyn LedgerRepository>,
    payment_repo: Arc<dyn PaymentRepository>,
    payment_event_repo: Arc<dyn PaymentEventRepository>,
    providers: Arc<ProviderRegistry>,
}

impl RefundPaymentUseCase {
    pub fn new(
        tx: TransactionManager,
        account_repo: Arc<dyn AccountRepository>,
        ledger_repo: Arc<dyn LedgerRepository>,
        payment_repo: Arc<dyn PaymentRepository>,
        payment_event_repo: Arc<dyn PaymentEventRepository>,
        providers: Arc<ProviderRegistry>,
    ) -> Self {
        Self {
            tx,
            account_repo,
            ledger_repo,
            payment_repo,
            payment_event_repo,
            providers,
        }
    }

    #[tracing::instrument(name = "RefundPaymentUseCase::execute", skip(self))]
    pub async fn execute(&self, payment_id: PaymentId) -> Result<Payment, DomainError> {
        let mut payment = self
            .payment_repo
            .find_by_id(payment_id)
            .await?
            .ok_or(DomainError::PaymentNotFound(payment_id))?;

        if payment.status() != PaymentStatus::Completed {
            return Err(DomainError::InvalidStateTransition(format!(
                "cannot refund payment {} in status {:?}",
                payment_id,
                payment.status()
            )));
        }

        if payment.payment_type() == PaymentType::ExternalPayment {
            if let Some(provider_name) = payment.provider() {
                let (provider, breaker) = crate::infrastructure::provider::factory::resolve(&self.providers, provider_name)?;
                if !breaker.allow_request().await {
                    return Err(DomainError::BreakerOpen(provider_name.to_string()));
                }
                let provider_transaction_id = payment
                    .provider_transaction_id()
                    .ok_or_else(|| DomainError::Internal("completed external payment missing provider_transaction_id".to_string()))?
                    .to_string();
                let call = provider
                    .refund_payment(RefundRequest {
                        payment_id,
                        provider_transaction_id,
                        amount_cents: payment.amount_cents(),
                    })
                    .await;
                match call {
                    Ok(_) => breaker.record_success().await,
                    Err(err) => {
                        breaker.record_failure().await;
                        return Err(err);
                    }
                }
            }
        }

        let amount = payment.amount_cents();
        let payment_type = payment.payment_type();
        let source_id = payment.source_account_id();
        let destination_id = payment.destination_account_id();
        let id = payment.id();

        self.tx
            .with_transaction(|| async {
                if let Some(source_id) = source_id {
                    let mut source = self
                        .account_repo
                        .find_by_id_for_update(source_id)
                        .await?
                        .ok_or(DomainError::AccountNotFound(source_id))?;
                    source.credit(amount)?;
                    self.account_repo.update(&source).await?;
                    self.ledger_repo
                        .append(LedgerTransaction::new(
                            source.id(),
                            Some(id),
                            LedgerEntryType::Credit,
                            amount,
                            source.balance_cents(),
                            "payment refund",
                        ))
                        .await?;
                }

                if payment_type == PaymentType::InternalTransfer {
                    let destination_id = destination_id
                        .ok_or_else(|| DomainError::ValidationError("internal_transfer refund requires a destination account".to_string()))?;
                    let mut destination = self
                        .account_repo
                        .find_by_id_for_update(destination_id)
                        .await?
                        .ok_or(DomainError::AccountNotFound(destination_id))?;
                    destination.debit(amount)?;
                    self.account_repo.update(&destination).await?;
                    self.ledger_repo
                        .append(LedgerTransaction::new(
                            destination.id(),
                            Some(id),
                            LedgerEntryType::Debit,
                            amount,
                            destination.balance_cents(),
                            "internal transfer refund reversal",
                        ))
                        .await?;
                }

                Ok(())
            })
            .await?;

        payment.mark_refunded()?;
        self.payment_repo.update(&payment).await?;
        self.payment_event_repo
            .append(PaymentEvent::new(payment.id(), PaymentEventType::Refunded, json!({})))
            .await?;

        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Account;
    use crate::domain::repository::{MockAccountRepository, MockLedgerRepository, MockPaymentEventRepository, MockPaymentRepository};
    use crate::domain::types::{AccountId, IdempotencyKey};
    use common::Currency;

    fn test_tx() -> TransactionManager {
        TransactionManager::new(sqlx::PgPool::connect_lazy("postgres://localhost/unused").unwrap())
    }

    fn completed_internal_transfer(source: AccountId, destination: AccountId) -> Payment {
        let mut payment = Payment::new(
            IdempotencyKey("key".to_string()),
            PaymentType::InternalTransfer,
            Some(source),
            Some(destination),
            1_500,
            Currency::parse("USD").unwrap(),
            None,
            json!({}),
        )
        .unwrap();
        payment.mark_completed(None).unwrap();
        payment
    }

    #[tokio::test]
    async fn refunding_internal_transfer_reverses_both_legs() {
        let source = Account::new(uuid::Uuid::new_v4(), Currency::parse("USD").unwrap(), 5_000).unwrap();
        let destination = Account::new(uuid::Uuid::new_v4(), Currency::parse("USD").unwrap(), 5_000).unwrap();
        let payment = completed_internal_transfer(source.id(), destination.id());
        let payment_id = payment.id();

        let mut payment_repo = MockPaymentRepository::new();
        let payment_clone = payment.clone();
        payment_repo.expect_find_by_id().returning(move |_| Ok(Some(payment_clone.clone())));
        payment_repo.expect_update().returning(|_| Ok(()));

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
        ledger_repo.expect_append().returning(Ok);

        let mut payment_event_repo = MockPaymentEventRepository::new();
        payment_event_repo.expect_append().returning(Ok);

        let use_case = RefundPaymentUseCase::new(
            test_tx(),
            Arc::new(account_repo),
            Arc::new(ledger_repo),
            Arc::new(payment_repo),
            Arc::new(payment_event_repo),
            Arc::new(ProviderRegistry::new()),
        );

        let result = use_case.execute(payment_id).await.unwrap();
        assert_eq!(result.status(), PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn refunding_a_pending_payment_is_rejected() {
        let source = AccountId::new();
        let payment = Payment::new(
            IdempotencyKey("key-2".to_string()),
            PaymentType::ExternalPayment,
            Some(source),
            None,
            1_000,
            Currency::parse("USD").unwrap(),
            Some("sandbox_primary".to_string()),
            json!({}),
        )
        .unwrap();
        let payment_id = payment.id();

        let mut payment_repo = MockPaymentRepository::new();
        let payment_clone = payment.clone();
        payment_repo.expect_find_by_id().returning(move |_| Ok(Some(payment_clone.clone())));

        let account_repo = MockAccountRepository::new();
        let ledger_repo = MockLedgerRepository::new();
        let payment_event_repo = MockPaymentEventRepository::new();

        let use_case = RefundPaymentUseCase::new(
            test_tx(),
            Arc::new(account_repo),
            Arc::new(ledger_repo),
            Arc::new(payment_repo),
            Arc::new(payment_event_repo),
            Arc::new(ProviderRegistry::new()),
        );

        let err = use_case.execute(payment_id).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidStateTransition(_)));
    }
}
