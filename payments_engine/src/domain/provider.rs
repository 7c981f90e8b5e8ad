use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::types::PaymentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderCallStatus {
    Success,
    Failed,
    Pending,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResult {
    pub transaction_id: String,
    pub status: ProviderCallStatus,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub payment_id: PaymentId,
    pub amount_cents: i64,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct RefundRequest {
    pub payment_id: PaymentId,
    pub provider_transaction_id: String,
    pub amount_cents: i64,
}

/// Uniform interface over third-party payment providers (spec.md §4.7).
/// Implementations classify their own failures into the three provider
/// error kinds; the breaker wrapping each instance only cares whether the
/// call succeeded.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn name(&self) -> &str;
    async fn process_payment(&self, request: ProcessRequest) -> Result<ProviderResult, DomainError>;
    async fn refund_payment(&self, request: RefundRequest) -> Result<ProviderResult, DomainError>;
}
