use std::sync::Arc;

use serde_json::json;
use tracing::warn;

use crate::domain::breaker::CircuitBreaker;
use crate::domain::entities::{LedgerEntryType, LedgerTransaction, Payment, PaymentEvent, PaymentEventType, PaymentStatus};
use crate::domain::error::DomainError;
use crate::domain::provider::{ProcessRequest, ProviderAdapter, RefundRequest};
use crate::domain::repository::{AccountRepository, LedgerRepository, PaymentEventRepository, PaymentRepository};
use crate::domain::types::PaymentId;
use crate::infrastructure::tx::TransactionManager;

/// Runs the external-payment saga (spec.md §4.13) for a payment the worker
/// has already locked. Reserve funds, call the breaker-wrapped provider,
/// compensate on failure in reverse order of what succeeded.
#[derive(Clone)]
pub struct ProcessExternalPaymentUseCase {
    tx: TransactionManager,
    account_repo: Arc<dyn AccountRepository>,
    ledger_repo: Arc<dyn LedgerRepository>,
    payment_repo: Arc<dyn PaymentRepository>,
    payment_event_repo: Arc<dyn PaymentEventRepository>,
}

impl ProcessExternalPaymentUseCase {
    pub fn new(
        tx: TransactionManager,
        account_repo: Arc<dyn AccountRepository>,
        ledger_repo: Arc<dyn LedgerRepository>,
        payment_repo: Arc<dyn PaymentRepository>,
        payment_event_repo: Arc<dyn PaymentEventRepository>,
    ) -> Self {
        Self {
            tx,
            account_repo,
            ledger_repo,
            payment_repo,
            payment_event_repo,
        }
    }

    /// Loads the payment, checks it's still actionable, and drives it
    /// through the saga. Called by the worker loop (spec.md §4.12 step 3)
    /// while the distributed lock `payment:<id>` is held.
    #[tracing::instrument(name = "ProcessExternalPaymentUseCase::execute", skip(self, provider, breaker))]
    pub async fn execute(
        &self,
        payment_id: PaymentId,
        provider: Arc<dyn ProviderAdapter>,
        breaker: Arc<CircuitBreaker>,
    ) -> Result<Payment, DomainError> {
        let mut payment = self
            .payment_repo
            .find_by_id(payment_id)
            .await?
            .ok_or(DomainError::PaymentNotFound(payment_id))?;

        if !matches!(payment.status(), PaymentStatus::Pending | PaymentStatus::Failed) {
            return Ok(payment);
        }

        if payment.status() == PaymentStatus::Failed {
            payment.increment_retry()?;
        }
        payment.mark_processing()?;
        self.payment_repo.update(&payment).await?;

        self.run_saga(payment, provider, breaker).await
    }

    async fn run_saga(
        &self,
        mut payment: Payment,
        provider: Arc<dyn ProviderAdapter>,
        breaker: Arc<CircuitBreaker>,
    ) -> Result<Payment, DomainError> {
        // Step 1: reserve funds, unless a prior crashed attempt already did
        // (spec.md §4.16's `funds_reserved` marker).
        if let Some(source_id) = payment.source_account_id() {
            if !payment.funds_reserved() {
                self.tx
                    .with_transaction(|| async {
                        let mut source = self
                            .account_repo
                            .find_by_id_for_update(source_id)
                            .await?
                            .ok_or(DomainError::AccountNotFound(source_id))?;
                        source.debit(payment.amount_cents())?;
                        self.account_repo.update(&source).await?;
                        self.ledger_repo
                            .append(LedgerTransaction::new(
                                source.id(),
                                Some(payment.id()),
                                LedgerEntryType::Debit,
                                payment.amount_cents(),
                                source.balance_cents(),
                                "external payment reserve",
                            ))
                            .await?;
                        Ok(())
                    })
                    .await?;
                payment.set_funds_reserved(true);
                self.payment_repo.update(&payment).await?;
            }
        }

        // Step 2: call the provider, gated by its breaker.
        if !breaker.allow_request().await {
            return self.fail_and_compensate(payment, DomainError::BreakerOpen(provider.name().to_string())).await;
        }

        let call_result = provider
            .process_payment(ProcessRequest {
                payment_id: payment.id(),
                amount_cents: payment.amount_cents(),
                currency: payment.currency().to_string(),
            })
            .await;

        match call_result {
            Ok(result) => {
                breaker.record_success().await;
                let provider_transaction_id = result.transaction_id.clone();
                let record_result = self.record_completion(&mut payment, result).await;

                match record_result {
                    Ok(()) => Ok(payment),
                    Err(err) => {
                        // The provider already moved money; a later step
                        // (persisting the status, appending the event) failed
                        // after the fact. Best-effort refund it back rather
                        // than leave the charge uncompensated.
                        warn!(
                            payment_id = %payment.id(),
                            error = %err,
                            "provider call succeeded but recording completion failed, issuing compensating refund"
                        );
                        best_effort_refund(
                            provider.as_ref(),
                            RefundRequest {
                                payment_id: payment.id(),
                                provider_transaction_id,
                                amount_cents: payment.amount_cents(),
                            },
                        )
                        .await;
                        Err(err)
                    }
                }
            }
            Err(err) => {
                breaker.record_failure().await;
                self.fail_and_compensate(payment, err).await
            }
        }
    }

    async fn record_completion(&self, payment: &mut Payment, result: crate::domain::provider::ProviderResult) -> Result<(), DomainError> {
        payment.mark_completed(Some(result.transaction_id))?;
        self.payment_repo.update(payment).await?;
        self.payment_event_repo
            .append(PaymentEvent::new(
                payment.id(),
                PaymentEventType::Completed,
                json!({ "provider_transaction_id": payment.provider_transaction_id() }),
            ))
            .await?;
        Ok(())
    }

    async fn fail_and_compensate(&self, mut payment: Payment, reason: DomainError) -> Result<Payment, DomainError> {
        if payment.funds_reserved() {
            if let Some(source_id) = payment.source_account_id() {
                let compensation = self
                    .tx
                    .with_transaction(|| async {
                        let mut source = self
                            .account_repo
                            .find_by_id_for_update(source_id)
                            .await?
                            .ok_or(DomainError::AccountNotFound(source_id))?;
                        source.credit(payment.amount_cents())?;
                        self.account_repo.update(&source).await?;
                        self.ledger_repo
                            .append(LedgerTransaction::new(
                                source.id(),
                                Some(payment.id()),
                                LedgerEntryType::Credit,
                                payment.amount_cents(),
                                source.balance_cents(),
                                "external payment compensation",
                            ))
                            .await?;
                        Ok(())
                    })
                    .await;
                match compensation {
                    Ok(()) => payment.set_funds_reserved(false),
                    Err(e) => warn!(payment_id = %payment.id(), error = %e, "compensation failed, funds remain reserved"),
                }
            }
        }

        payment.mark_failed(reason.to_string())?;
        self.payment_repo.update(&payment).await?;
        self.payment_event_repo
            .append(PaymentEvent::new(payment.id(), PaymentEventType::Failed, json!({ "reason": reason.to_string() })))
            .await?;

        Err(reason)
    }
}

/// Best-effort compensating refund for a provider call that actually
/// succeeded after a later step failed (spec.md §4.13). Failures are
/// logged, never propagated — the saga has already decided the payment is
/// failed regardless of whether this call lands.
pub async fn best_effort_refund(provider: &dyn ProviderAdapter, request: RefundRequest) {
    if let Err(err) = provider.refund_payment(request).await {
        warn!(error = %err, provider = provider.name(), "best-effort compensating refund failed");
    }
}
