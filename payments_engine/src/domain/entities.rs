use chrono::{DateTime, Duration, Utc};
use common::Currency;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use super::error::DomainError;
use super::types::{AccountId, IdempotencyKey, LedgerEntryId, OutboxEntryId, PaymentEventId, PaymentId};

pub const MAX_PAYMENT_RETRIES_DEFAULT: i32 = 3;
pub const MAX_OUTBOX_RETRIES_DEFAULT: i32 = 5;
pub const IDEMPOTENCY_TTL_HOURS: i64 = 24;
pub const IDEMPOTENCY_BODY_LIMIT_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Suspended,
    Inactive,
}

/// An owned ledger account. Mutated only through `debit`/`credit`, which
/// also bump `version` — persistence enforces
/// `version_on_disk == new_version - 1` (spec.md §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    user_id: uuid::Uuid,
    balance_cents: i64,
    currency: Currency,
    version: i32,
    status: AccountStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(user_id: uuid::Uuid, currency: Currency, initial_balance_cents: i64) -> Result<Self, DomainError> {
        if initial_balance_cents < 0 {
            return Err(DomainError::ValidationError(
                "initial balance cannot be negative".to_string(),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            id: AccountId::new(),
            user_id,
            balance_cents: initial_balance_cents,
            currency,
            version: 0,
            status: AccountStatus::Active,
            created_at: now,
            updated_at: now,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: AccountId,
        user_id: uuid::Uuid,
        balance_cents: i64,
        currency: Currency,
        version: i32,
        status: AccountStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            balance_cents,
            currency,
            version,
            status,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn user_id(&self) -> uuid::Uuid {
        self.user_id
    }

    pub fn balance_cents(&self) -> i64 {
        self.balance_cents
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn status(&self) -> AccountStatus {
        self.status
    }

    fn ensure_active(&self) -> Result<(), DomainError> {
        if self.status != AccountStatus::Active {
            return Err(DomainError::AccountInactive(self.id));
        }
        Ok(())
    }

    /// Debits the account. Fails with `insufficient_funds` if `amount >
    /// balance_cents`, `account_inactive` if not active, `validation_error`
    /// if `amount <= 0`.
    pub fn debit(&mut self, amount_cents: i64) -> Result<(), DomainError> {
        if amount_cents <= 0 {
            return Err(DomainError::ValidationError(
                "debit amount must be positive".to_string(),
            ));
        }
        self.ensure_active()?;
        if amount_cents > self.balance_cents {
            return Err(DomainError::InsufficientFunds(self.id));
        }
        self.balance_cents -= amount_cents;
        self.version += 1;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Credits the account. Fails with `account_inactive` if not active,
    /// `validation_error` if `amount <= 0`.
    pub fn credit(&mut self, amount_cents: i64) -> Result<(), DomainError> {
        if amount_cents <= 0 {
            return Err(DomainError::ValidationError(
                "credit amount must be positive".to_string(),
            ));
        }
        self.ensure_active()?;
        self.balance_cents += amount_cents;
        self.version += 1;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ledger_entry_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryType {
    Debit,
    Credit,
}

/// Append-only ledger row. One row per account mutation; replaying all rows
/// for an account in `created_at` order reproduces its current balance
/// (spec.md §3 invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerTransaction {
    id: LedgerEntryId,
    account_id: AccountId,
    payment_id: Option<PaymentId>,
    entry_type: LedgerEntryType,
    amount_cents: i64,
    balance_after_cents: i64,
    description: String,
    created_at: DateTime<Utc>,
}

impl LedgerTransaction {
    pub fn new(
        account_id: AccountId,
        payment_id: Option<PaymentId>,
        entry_type: LedgerEntryType,
        amount_cents: i64,
        balance_after_cents: i64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: LedgerEntryId::new(),
            account_id,
            payment_id,
            entry_type,
            amount_cents,
            balance_after_cents,
            description: description.into(),
            created_at: Utc::now(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: LedgerEntryId,
        account_id: AccountId,
        payment_id: Option<PaymentId>,
        entry_type: LedgerEntryType,
        amount_cents: i64,
        balance_after_cents: i64,
        description: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            account_id,
            payment_id,
            entry_type,
            amount_cents,
            balance_after_cents,
            description,
            created_at,
        }
    }

    pub fn id(&self) -> LedgerEntryId {
        self.id
    }
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }
    pub fn payment_id(&self) -> Option<PaymentId> {
        self.payment_id
    }
    pub fn entry_type(&self) -> LedgerEntryType {
        self.entry_type
    }
    pub fn amount_cents(&self) -> i64 {
        self.amount_cents
    }
    pub fn balance_after_cents(&self) -> i64 {
        self.balance_after_cents
    }
    pub fn description(&self) -> &str {
        &self.description
    }
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    InternalTransfer,
    ExternalPayment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
    Refunded,
}

impl PaymentStatus {
    /// spec.md §4.2's transition table, checked as a closed allowlist.
    /// `failed -> processing` additionally requires `retry_count <
    /// max_retries`, checked by the caller (`Payment::increment_retry`).
    fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Completed)
                | (Pending, Cancelled)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Failed, Processing)
                | (Completed, Refunded)
        )
    }

    fn is_terminal(self) -> bool {
        matches!(self, PaymentStatus::Cancelled | PaymentStatus::Refunded)
    }
}

/// Closed set of event names, per spec.md §9's instruction to stop mixing
/// `EventType` constants and ad-hoc strings. Serializes to the literal
/// strings spec.md §9 names so the outbox payload is unaffected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_event_type", rename_all = "snake_case")]
pub enum PaymentEventType {
    #[serde(rename = "payment.created")]
    Created,
    #[serde(rename = "payment.completed")]
    Completed,
    #[serde(rename = "payment.failed")]
    Failed,
    #[serde(rename = "payment.cancelled")]
    Cancelled,
    #[serde(rename = "payment.refunded")]
    Refunded,
}

impl PaymentEventType {
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            PaymentEventType::Created => "payment.created",
            PaymentEventType::Completed => "payment.completed",
            PaymentEventType::Failed => "payment.failed",
            PaymentEventType::Cancelled => "payment.cancelled",
            PaymentEventType::Refunded => "payment.refunded",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    id: PaymentEventId,
    payment_id: PaymentId,
    event_type: PaymentEventType,
    event_data: Json,
    created_at: DateTime<Utc>,
}

impl PaymentEvent {
    pub fn new(payment_id: PaymentId, event_type: PaymentEventType, event_data: Json) -> Self {
        Self {
            id: PaymentEventId::new(),
            payment_id,
            event_type,
            event_data,
            created_at: Utc::now(),
        }
    }

    pub fn reconstitute(
        id: PaymentEventId,
        payment_id: PaymentId,
        event_type: PaymentEventType,
        event_data: Json,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            payment_id,
            event_type,
            event_data,
            created_at,
        }
    }

    pub fn id(&self) -> PaymentEventId {
        self.id
    }
    pub fn payment_id(&self) -> PaymentId {
        self.payment_id
    }
    pub fn event_type(&self) -> PaymentEventType {
        self.event_type
    }
    pub fn event_data(&self) -> &Json {
        &self.event_data
    }
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// The payment state machine entity (spec.md §4.2, §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    id: PaymentId,
    idempotency_key: IdempotencyKey,
    payment_type: PaymentType,
    source_account_id: Option<AccountId>,
    destination_account_id: Option<AccountId>,
    amount_cents: i64,
    currency: Currency,
    status: PaymentStatus,
    provider: Option<String>,
    provider_transaction_id: Option<String>,
    retry_count: i32,
    max_retries: i32,
    last_error: Option<String>,
    metadata: Json,
    /// Gates the saga's compensation path (spec.md §9 open question):
    /// set once funds have been reserved, so a worker that resumes a
    /// reclaimed message never debits the source account twice.
    funds_reserved: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

#[allow(clippy::too_many_arguments)]
impl Payment {
    pub fn new(
        idempotency_key: IdempotencyKey,
        payment_type: PaymentType,
        source_account_id: Option<AccountId>,
        destination_account_id: Option<AccountId>,
        amount_cents: i64,
        currency: Currency,
        provider: Option<String>,
        metadata: Json,
    ) -> Result<Self, DomainError> {
        if amount_cents <= 0 {
            return Err(DomainError::ValidationError(
                "amount must be positive".to_string(),
            ));
        }
        if payment_type == PaymentType::InternalTransfer {
            if source_account_id.is_none() || destination_account_id.is_none() {
                return Err(DomainError::ValidationError(
                    "internal_transfer requires both source and destination accounts".to_string(),
                ));
            }
        }
        if payment_type == PaymentType::ExternalPayment && provider.is_none() {
            // Resolves spec.md §9's open question: reject missing provider
            // at create-time rather than inside the worker.
            return Err(DomainError::ValidationError(
                "external_payment requires a provider".to_string(),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            id: PaymentId::new(),
            idempotency_key,
            payment_type,
            source_account_id,
            destination_account_id,
            amount_cents,
            currency,
            status: PaymentStatus::Pending,
            provider,
            provider_transaction_id: None,
            retry_count: 0,
            max_retries: MAX_PAYMENT_RETRIES_DEFAULT,
            last_error: None,
            metadata,
            funds_reserved: false,
            created_at: now,
            updated_at: now,
            completed_at: None,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: PaymentId,
        idempotency_key: IdempotencyKey,
        payment_type: PaymentType,
        source_account_id: Option<AccountId>,
        destination_account_id: Option<AccountId>,
        amount_cents: i64,
        currency: Currency,
        status: PaymentStatus,
        provider: Option<String>,
        provider_transaction_id: Option<String>,
        retry_count: i32,
        max_retries: i32,
        last_error: Option<String>,
        metadata: Json,
        funds_reserved: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            idempotency_key,
            payment_type,
            source_account_id,
            destination_account_id,
            amount_cents,
            currency,
            status,
            provider,
            provider_transaction_id,
            retry_count,
            max_retries,
            last_error,
            metadata,
            funds_reserved,
            created_at,
            updated_at,
            completed_at,
        }
    }

    pub fn id(&self) -> PaymentId {
        self.id
    }
    pub fn idempotency_key(&self) -> &IdempotencyKey {
        &self.idempotency_key
    }
    pub fn payment_type(&self) -> PaymentType {
        self.payment_type
    }
    pub fn source_account_id(&self) -> Option<AccountId> {
        self.source_account_id
    }
    pub fn destination_account_id(&self) -> Option<AccountId> {
        self.destination_account_id
    }
    pub fn amount_cents(&self) -> i64 {
        self.amount_cents
    }
    pub fn currency(&self) -> &Currency {
        &self.currency
    }
    pub fn status(&self) -> PaymentStatus {
        self.status
    }
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }
    pub fn provider_transaction_id(&self) -> Option<&str> {
        self.provider_transaction_id.as_deref()
    }
    pub fn retry_count(&self) -> i32 {
        self.retry_count
    }
    pub fn max_retries(&self) -> i32 {
        self.max_retries
    }
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
    pub fn metadata(&self) -> &Json {
        &self.metadata
    }
    pub fn funds_reserved(&self) -> bool {
        self.funds_reserved
    }
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn set_funds_reserved(&mut self, reserved: bool) {
        self.funds_reserved = reserved;
        self.updated_at = Utc::now();
    }

    fn transition(&mut self, next: PaymentStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition(format!(
                "cannot transition payment {} from {:?} to {:?}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        self.updated_at = Utc::now();
        if matches!(
            next,
            PaymentStatus::Completed | PaymentStatus::Failed | PaymentStatus::Cancelled
        ) {
            self.completed_at = Some(self.updated_at);
        }
        Ok(())
    }

    pub fn mark_processing(&mut self) -> Result<(), DomainError> {
        self.transition(PaymentStatus::Processing)
    }

    /// Allowed directly from `pending` for sync transfers (spec.md §4.9
    /// step 3) as well as from `processing` for the async saga.
    pub fn mark_completed(&mut self, provider_transaction_id: Option<String>) -> Result<(), DomainError> {
        self.transition(PaymentStatus::Completed)?;
        if let Some(tx_id) = provider_transaction_id {
            self.provider_transaction_id = Some(tx_id);
        }
        Ok(())
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) -> Result<(), DomainError> {
        self.transition(PaymentStatus::Failed)?;
        self.last_error = Some(reason.into());
        Ok(())
    }

    pub fn mark_cancelled(&mut self) -> Result<(), DomainError> {
        self.transition(PaymentStatus::Cancelled)
    }

    pub fn mark_refunded(&mut self) -> Result<(), DomainError> {
        self.transition(PaymentStatus::Refunded)
    }

    /// Fails with `max_retries_exceeded` when `retry_count == max_retries`.
    pub fn increment_retry(&mut self) -> Result<(), DomainError> {
        if self.retry_count >= self.max_retries {
            return Err(DomainError::MaxRetriesExceeded(self.id));
        }
        self.retry_count += 1;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "outbox_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    Pending,
    Published,
    Failed,
}

/// Written in the same DB transaction as the aggregate change it describes
/// (spec.md §4.5); the relay (§4.11) is the only thing that moves it out of
/// `pending`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEntry {
    id: OutboxEntryId,
    aggregate_type: String,
    aggregate_id: uuid::Uuid,
    event_type: String,
    payload: Json,
    status: OutboxStatus,
    retry_count: i32,
    max_retries: i32,
    created_at: DateTime<Utc>,
    published_at: Option<DateTime<Utc>>,
}

impl OutboxEntry {
    pub fn new(aggregate_type: impl Into<String>, aggregate_id: uuid::Uuid, event_type: impl Into<String>, payload: Json) -> Self {
        Self {
            id: OutboxEntryId::new(),
            aggregate_type: aggregate_type.into(),
            aggregate_id,
            event_type: event_type.into(),
            payload,
            status: OutboxStatus::Pending,
            retry_count: 0,
            max_retries: MAX_OUTBOX_RETRIES_DEFAULT,
            created_at: Utc::now(),
            published_at: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: OutboxEntryId,
        aggregate_type: String,
        aggregate_id: uuid::Uuid,
        event_type: String,
        payload: Json,
        status: OutboxStatus,
        retry_count: i32,
        max_retries: i32,
        created_at: DateTime<Utc>,
        published_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            aggregate_type,
            aggregate_id,
            event_type,
            payload,
            status,
            retry_count,
            max_retries,
            created_at,
            published_at,
        }
    }

    pub fn id(&self) -> OutboxEntryId {
        self.id
    }
    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }
    pub fn aggregate_id(&self) -> uuid::Uuid {
        self.aggregate_id
    }
    pub fn event_type(&self) -> &str {
        &self.event_type
    }
    pub fn payload(&self) -> &Json {
        &self.payload
    }
    pub fn status(&self) -> OutboxStatus {
        self.status
    }
    pub fn retry_count(&self) -> i32 {
        self.retry_count
    }
    pub fn max_retries(&self) -> i32 {
        self.max_retries
    }
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    pub fn mark_published(&mut self) {
        self.status = OutboxStatus::Published;
        self.published_at = Some(Utc::now());
    }

    /// Increments `retry_count`; terminal once it reaches `max_retries`,
    /// otherwise goes back to `pending` for the relay to pick up again.
    pub fn mark_failed(&mut self) {
        self.retry_count += 1;
        self.status = if self.retry_count >= self.max_retries {
            OutboxStatus::Failed
        } else {
            OutboxStatus::Pending
        };
    }
}

/// Cached idempotent-response envelope (spec.md §3, §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    key: IdempotencyKey,
    response_status: u16,
    response_body: Vec<u8>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    pub fn new(key: IdempotencyKey, response_status: u16, response_body: Vec<u8>) -> Result<Self, DomainError> {
        if response_body.len() > IDEMPOTENCY_BODY_LIMIT_BYTES {
            return Err(DomainError::ValidationError(
                "idempotency response body exceeds 1 MiB".to_string(),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            key,
            response_status,
            response_body,
            created_at: now,
            expires_at: now + Duration::hours(IDEMPOTENCY_TTL_HOURS),
        })
    }

    pub fn reconstitute(
        key: IdempotencyKey,
        response_status: u16,
        response_body: Vec<u8>,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            response_status,
            response_body,
            created_at,
            expires_at,
        }
    }

    pub fn key(&self) -> &IdempotencyKey {
        &self.key
    }
    pub fn response_status(&self) -> u16 {
        self.response_status
    }
    pub fn response_body(&self) -> &[u8] {
        &self.response_body
    }
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn currency() -> Currency {
        Currency::parse("USD").unwrap()
    }

    #[test]
    fn debit_rejects_insufficient_funds() {
        let mut acc = Account::new(uuid::Uuid::new_v4(), currency(), 1000).unwrap();
        let err = acc.debit(1500).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientFunds(_)));
        assert_eq!(acc.balance_cents(), 1000);
        assert_eq!(acc.version(), 0);
    }

    #[test]
    fn debit_and_credit_bump_version() {
        let mut acc = Account::new(uuid::Uuid::new_v4(), currency(), 1000).unwrap();
        acc.debit(400).unwrap();
        assert_eq!(acc.balance_cents(), 600);
        assert_eq!(acc.version(), 1);
        acc.credit(100).unwrap();
        assert_eq!(acc.balance_cents(), 700);
        assert_eq!(acc.version(), 2);
    }

    #[test]
    fn debit_rejects_non_positive_amount() {
        let mut acc = Account::new(uuid::Uuid::new_v4(), currency(), 1000).unwrap();
        assert!(matches!(
            acc.debit(0).unwrap_err(),
            DomainError::ValidationError(_)
        ));
    }

    fn pending_internal_transfer() -> Payment {
        Payment::new(
            IdempotencyKey("key-1".to_string()),
            PaymentType::InternalTransfer,
            Some(AccountId::new()),
            Some(AccountId::new()),
            1000,
            currency(),
            None,
            serde_json::json!({}),
        )
        .unwrap()
    }

    #[test]
    fn internal_transfer_requires_both_accounts() {
        let err = Payment::new(
            IdempotencyKey("key-2".to_string()),
            PaymentType::InternalTransfer,
            Some(AccountId::new()),
            None,
            1000,
            currency(),
            None,
            serde_json::json!({}),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::ValidationError(_)));
    }

    #[test]
    fn external_payment_requires_provider() {
        let err = Payment::new(
            IdempotencyKey("key-3".to_string()),
            PaymentType::ExternalPayment,
            Some(AccountId::new()),
            None,
            1000,
            currency(),
            None,
            serde_json::json!({}),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::ValidationError(_)));
    }

    #[test]
    fn pending_to_completed_is_allowed_for_sync_transfers() {
        let mut p = pending_internal_transfer();
        p.mark_completed(None).unwrap();
        assert_eq!(p.status(), PaymentStatus::Completed);
        assert!(p.completed_at().is_some());
    }

    #[test]
    fn completed_to_processing_is_rejected() {
        let mut p = pending_internal_transfer();
        p.mark_completed(None).unwrap();
        let err = p.transition(PaymentStatus::Processing).unwrap_err();
        assert!(matches!(err, DomainError::InvalidStateTransition(_)));
    }

    #[test]
    fn failed_retry_requires_budget() {
        let mut p = pending_internal_transfer();
        p.mark_processing().unwrap();
        p.mark_failed("boom").unwrap();
        for _ in 0..p.max_retries() {
            p.increment_retry().unwrap();
        }
        assert!(matches!(
            p.increment_retry().unwrap_err(),
            DomainError::MaxRetriesExceeded(_)
        ));
    }

    #[test]
    fn completed_can_be_refunded_but_not_twice() {
        let mut p = pending_internal_transfer();
        p.mark_completed(None).unwrap();
        p.mark_refunded().unwrap();
        assert_eq!(p.status(), PaymentStatus::Refunded);
        assert!(p.transition(PaymentStatus::Refunded).is_err());
    }

    #[test]
    fn outbox_entry_terminates_after_max_retries() {
        let mut entry = OutboxEntry::new("payment", uuid::Uuid::new_v4(), "payment.created", serde_json::json!({}));
        for _ in 0..entry.max_retries - 1 {
            entry.mark_failed();
            assert_eq!(entry.status(), OutboxStatus::Pending);
        }
        entry.mark_failed();
        assert_eq!(entry.status(), OutboxStatus::Failed);
    }
}
