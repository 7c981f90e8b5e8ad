use async_trait::async_trait;

use super::entities::{
    Account, IdempotencyRecord, LedgerTransaction, OutboxEntry, Payment, PaymentEvent, PaymentStatus,
};
use super::error::DomainError;
use super::types::{AccountId, IdempotencyKey, OutboxEntryId, PaymentId};

/// Closed whitelist of sort columns for `List` (spec.md §4.4) — anything
/// else falls back to `created_at desc` rather than being interpolated
/// into SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentSortColumn {
    CreatedAt,
    UpdatedAt,
    AmountCents,
}

impl PaymentSortColumn {
    pub fn from_query_param(raw: &str) -> Option<Self> {
        match raw {
            "created_at" => Some(Self::CreatedAt),
            "updated_at" => Some(Self::UpdatedAt),
            "amount_cents" => Some(Self::AmountCents),
            _ => None,
        }
    }

    pub fn column_name(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::AmountCents => "amount_cents",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn from_query_param(raw: &str) -> Self {
        match raw {
            "asc" => Self::Asc,
            _ => Self::Desc,
        }
    }

    pub fn sql_keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaymentFilter {
    pub account_id: Option<AccountId>,
    pub status: Option<PaymentStatus>,
    pub provider: Option<String>,
    pub limit: i64,
    pub offset: i64,
    pub sort_by: PaymentSortColumn,
    pub sort_order: SortOrder,
}

impl Default for PaymentFilter {
    fn default() -> Self {
        Self {
            account_id: None,
            status: None,
            provider: None,
            limit: 20,
            offset: 0,
            sort_by: PaymentSortColumn::CreatedAt,
            sort_order: SortOrder::Desc,
        }
    }
}

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait AccountRepository: Send + Sync {
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, DomainError>;
    /// Locks the row (`SELECT ... FOR UPDATE`) so the caller's transaction
    /// serializes concurrent mutations (spec.md §9).
    async fn find_by_id_for_update(&self, id: AccountId) -> Result<Option<Account>, DomainError>;
    async fn create(&self, account: Account) -> Result<Account, DomainError>;
    /// Commits with `version_on_disk == new_version - 1`; fails with
    /// `optimistic_lock_failed` if zero rows match (spec.md §4.1).
    async fn update(&self, account: &Account) -> Result<(), DomainError>;
}

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait LedgerRepository: Send + Sync {
    async fn append(&self, entry: LedgerTransaction) -> Result<LedgerTransaction, DomainError>;
    async fn list_for_account(
        &self,
        account_id: AccountId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LedgerTransaction>, DomainError>;
}

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait PaymentRepository: Send + Sync {
    /// Fails with `duplicate_idempotency_key` on a unique-constraint hit.
    async fn create(&self, payment: Payment) -> Result<Payment, DomainError>;
    /// Fails with `payment_not_found` when zero rows match.
    async fn update(&self, payment: &Payment) -> Result<(), DomainError>;
    async fn find_by_id(&self, id: PaymentId) -> Result<Option<Payment>, DomainError>;
    async fn find_by_idempotency_key(&self, key: &IdempotencyKey) -> Result<Option<Payment>, DomainError>;
    async fn list(&self, filter: PaymentFilter) -> Result<Vec<Payment>, DomainError>;
}

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait PaymentEventRepository: Send + Sync {
    async fn append(&self, event: PaymentEvent) -> Result<PaymentEvent, DomainError>;
    async fn list_for_payment(&self, payment_id: PaymentId) -> Result<Vec<PaymentEvent>, DomainError>;
}

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait OutboxRepository: Send + Sync {
    /// Must run within the caller's transaction so the entry is atomic
    /// with the aggregate change (spec.md §4.5).
    async fn insert(&self, entry: OutboxEntry) -> Result<OutboxEntry, DomainError>;
    /// Returns up to `limit` pending entries in `created_at` order, holding
    /// a skip-locked row lock so relay workers don't contend.
    async fn get_pending(&self, limit: i64) -> Result<Vec<OutboxEntry>, DomainError>;
    async fn mark_published(&self, id: OutboxEntryId) -> Result<(), DomainError>;
    async fn mark_failed(&self, id: OutboxEntryId) -> Result<(), DomainError>;
}

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait IdempotencyRepository: Send + Sync {
    async fn get(&self, key: &IdempotencyKey) -> Result<Option<IdempotencyRecord>, DomainError>;
    async fn set(&self, record: IdempotencyRecord) -> Result<(), DomainError>;
    async fn cleanup(&self) -> Result<u64, DomainError>;
}
