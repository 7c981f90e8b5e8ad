use thiserror::Error;

use super::types::{AccountId, PaymentId};

/// Single closed error enum shared by the ledger and the payment engine.
///
/// The teacher splits `UserError`/`WalletError`/`TransactionError` because its
/// two services never share a transaction; here the sync-transfer executor
/// (spec.md §4.9) must match on both account and payment failures inside one
/// DB transaction, so one enum keeps that call site from juggling three
/// error types. Each variant maps to exactly one spec.md §7 error kind.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("invalid id: {0}")]
    InvalidId(String),

    #[error("invalid currency: {0}")]
    InvalidCurrency(String),

    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("payment not found: {0}")]
    PaymentNotFound(PaymentId),

    #[error("duplicate idempotency key: {0}")]
    DuplicateIdempotencyKey(String),

    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("concurrent modification, please retry")]
    OptimisticLockFailed,

    #[error("insufficient funds in account: {0}")]
    InsufficientFunds(AccountId),

    #[error("account inactive: {0}")]
    AccountInactive(AccountId),

    #[error("max retries exceeded for payment: {0}")]
    MaxRetriesExceeded(PaymentId),

    #[error("provider timeout: {0}")]
    ProviderTimeout(String),

    #[error("provider rejected the request: {0}")]
    ProviderRejected(String),

    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("circuit breaker open for provider: {0}")]
    BreakerOpen(String),

    #[error("repository error: {0}")]
    Repository(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Short machine-readable kind, independent of the human message.
    /// Used by the API layer (§7) and never by domain logic itself.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::ValidationError(_) => "validation_error",
            DomainError::InvalidId(_) => "invalid_id",
            DomainError::InvalidCurrency(_) => "invalid_currency",
            DomainError::AccountNotFound(_) | DomainError::PaymentNotFound(_) => "not_found",
            DomainError::DuplicateIdempotencyKey(_) => "duplicate_request",
            DomainError::InvalidStateTransition(_) => "invalid_state_transition",
            DomainError::OptimisticLockFailed => "conflict",
            DomainError::InsufficientFunds(_) => "insufficient_funds",
            DomainError::AccountInactive(_) => "account_inactive",
            DomainError::MaxRetriesExceeded(_) => "max_retries_exceeded",
            DomainError::ProviderTimeout(_)
            | DomainError::ProviderRejected(_)
            | DomainError::ProviderUnavailable(_)
            | DomainError::BreakerOpen(_) => "provider_unavailable",
            DomainError::Repository(_) | DomainError::Internal(_) => "internal_error",
        }
    }

    pub fn from_sqlx(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.code().as_deref() == Some("23505") {
                return DomainError::DuplicateIdempotencyKey(db_err.message().to_string());
            }
        }
        DomainError::Repository(err.to_string())
    }
}
