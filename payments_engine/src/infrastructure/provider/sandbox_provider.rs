use async_trait::async_trait;
use rand::Rng;
use tokio::time::{sleep, Duration};

use crate::domain::error::DomainError;
use crate::domain::provider::{ProcessRequest, ProviderAdapter, ProviderCallStatus, ProviderResult, RefundRequest};

/// Deterministic-ish fake adapter for development and the integration
/// suite (spec.md §4.7 names this as the reference third-party provider).
/// Simulates latency and a configurable failure rate instead of making a
/// real network call.
pub struct SandboxProvider {
    name: String,
    failure_rate: f64,
    latency: Duration,
}

impl SandboxProvider {
    pub fn new(name: impl Into<String>, failure_rate: f64, latency: Duration) -> Self {
        Self {
            name: name.into(),
            failure_rate: failure_rate.clamp(0.0, 1.0),
            latency,
        }
    }
}

#[async_trait]
impl ProviderAdapter for SandboxProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process_payment(&self, request: ProcessRequest) -> Result<ProviderResult, DomainError> {
        sleep(self.latency).await;
        if rand::thread_rng().gen_bool(self.failure_rate) {
            return Err(DomainError::ProviderRejected(format!(
                "sandbox provider declined payment {}",
                request.payment_id
            )));
        }
        Ok(ProviderResult {
            transaction_id: format!("sandbox-{}", uuid::Uuid::new_v4()),
            status: ProviderCallStatus::Success,
            error_message: None,
        })
    }

    async fn refund_payment(&self, request: RefundRequest) -> Result<ProviderResult, DomainError> {
        sleep(self.latency).await;
        if rand::thread_rng().gen_bool(self.failure_rate) {
            return Err(DomainError::ProviderRejected(format!(
                "sandbox provider declined refund for {}",
                request.provider_transaction_id
            )));
        }
        Ok(ProviderResult {
            transaction_id: request.provider_transaction_id,
            status: ProviderCallStatus::Success,
            error_message: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::PaymentId;

    #[tokio::test]
    async fn always_fails_when_failure_rate_is_one() {
        let provider = SandboxProvider::new("flaky", 1.0, Duration::from_millis(1));
        let err = provider
            .process_payment(ProcessRequest {
                payment_id: PaymentId::new(),
                amount_cents: 100,
                currency: "USD".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ProviderRejected(_)));
    }

    #[tokio::test]
    async fn always_succeeds_when_failure_rate_is_zero() {
        let provider = SandboxProvider::new("reliable", 0.0, Duration::from_millis(1));
        let result = provider
            .process_payment(ProcessRequest {
                payment_id: PaymentId::new(),
                amount_cents: 100,
                currency: "USD".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(result.status, ProviderCallStatus::Success);
    }
}
