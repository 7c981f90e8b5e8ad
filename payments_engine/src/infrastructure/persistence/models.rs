use chrono::{DateTime, Utc};
use serde_json::Value as Json;
use sqlx::FromRow;

use common::Currency;

use crate::domain::entities::{
    Account, AccountStatus, IdempotencyRecord, LedgerEntryType, LedgerTransaction, OutboxEntry,
    OutboxStatus, Payment, PaymentEvent, PaymentEventType, PaymentStatus, PaymentType,
};
use crate::domain::types::{AccountId, IdempotencyKey, LedgerEntryId, OutboxEntryId, PaymentEventId, PaymentId};

#[derive(Debug, FromRow)]
pub struct AccountModel {
    pub id: AccountId,
    pub user_id: uuid::Uuid,
    pub balance_cents: i64,
    pub currency: Currency,
    pub version: i32,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AccountModel> for Account {
    fn from(m: AccountModel) -> Self {
        Account::reconstitute(m.id, m.user_id, m.balance_cents, m.currency, m.version, m.status, m.created_at, m.updated_at)
    }
}

#[derive(Debug, FromRow)]
pub struct LedgerTransactionModel {
    pub id: LedgerEntryId,
    pub account_id: AccountId,
    pub payment_id: Option<PaymentId>,
    pub entry_type: LedgerEntryType,
    pub amount_cents: i64,
    pub balance_after_cents: i64,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<LedgerTransactionModel> for LedgerTransaction {
    fn from(m: LedgerTransactionModel) -> Self {
        LedgerTransaction::reconstitute(
            m.id,
            m.account_id,
            m.payment_id,
            m.entry_type,
            m.amount_cents,
            m.balance_after_cents,
            m.description,
            m.created_at,
        )
    }
}

#[derive(Debug, FromRow)]
pub struct PaymentModel {
    pub id: PaymentId,
    pub idempotency_key: IdempotencyKey,
    pub payment_type: PaymentType,
    pub source_account_id: Option<AccountId>,
    pub destination_account_id: Option<AccountId>,
    pub amount_cents: i64,
    pub currency: Currency,
    pub status: PaymentStatus,
    pub provider: Option<String>,
    pub provider_transaction_id: Option<String>,
    pub retry_count: i32,
    pub max_retries: i32,
    pub last_error: Option<String>,
    pub metadata: Json,
    pub funds_reserved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<PaymentModel> for Payment {
    fn from(m: PaymentModel) -> Self {
        Payment::reconstitute(
            m.id,
            m.idempotency_key,
            m.payment_type,
            m.source_account_id,
            m.destination_account_id,
            m.amount_cents,
            m.currency,
            m.status,
            m.provider,
            m.provider_transaction_id,
            m.retry_count,
            m.max_retries,
            m.last_error,
            m.metadata,
            m.funds_reserved,
            m.created_at,
            m.updated_at,
            m.completed_at,
        )
    }
}

#[derive(Debug, FromRow)]
pub struct PaymentEventModel {
    pub id: PaymentEventId,
    pub payment_id: PaymentId,
    pub event_type: PaymentEventType,
    pub event_data: Json,
    pub created_at: DateTime<Utc>,
}

impl From<PaymentEventModel> for PaymentEvent {
    fn from(m: PaymentEventModel) -> Self {
        PaymentEvent::reconstitute(m.id, m.payment_id, m.event_type, m.event_data, m.created_at)
    }
}

#[derive(Debug, FromRow)]
pub struct OutboxEntryModel {
    pub id: OutboxEntryId,
    pub aggregate_type: String,
    pub aggregate_id: uuid::Uuid,
    pub event_type: String,
    pub payload: Json,
    pub status: OutboxStatus,
    pub retry_count: i32,
    pub max_retries: i32,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl From<OutboxEntryModel> for OutboxEntry {
    fn from(m: OutboxEntryModel) -> Self {
        OutboxEntry::reconstitute(
            m.id,
            m.aggregate_type,
            m.aggregate_id,
            m.event_type,
            m.payload,
            m.status,
            m.retry_count,
            m.max_retries,
            m.created_at,
            m.published_at,
        )
    }
}

#[derive(Debug, FromRow)]
pub struct IdempotencyRecordModel {
    pub key: IdempotencyKey,
    pub response_status: i32,
    pub response_body: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<IdempotencyRecordModel> for IdempotencyRecord {
    fn from(m: IdempotencyRecordModel) -> Self {
        IdempotencyRecord::reconstitute(m.key, m.response_status as u16, m.response_body, m.created_at, m.expires_at)
    }
}
