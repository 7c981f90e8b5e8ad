use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::entities::{Account, AccountStatus, LedgerEntryType, LedgerTransaction, Payment, PaymentStatus, PaymentType};

/// Money on the wire is float dollars (spec.md §6); everywhere internal to
/// the engine it's `i64` minor-unit cents. These two helpers are the only
/// place that conversion happens.
pub fn dollars_to_cents(dollars: f64) -> i64 {
    (dollars * 100.0).round() as i64
}

pub fn cents_to_dollars(cents: i64) -> f64 {
    cents as f64 / 100.0
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAccountRequest {
    pub user_id: Uuid,
    pub initial_balance: f64,
    pub currency: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AccountResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: f64,
    pub currency: String,
    pub version: i32,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id().0,
            user_id: account.user_id(),
            balance: cents_to_dollars(account.balance_cents()),
            currency: account.currency().to_string(),
            version: account.version(),
            status: account.status(),
            created_at: account.created_at(),
            updated_at: account.updated_at(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceResponse {
    pub balance: f64,
    pub currency: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub account_id: Uuid,
    pub payment_id: Option<Uuid>,
    pub entry_type: LedgerEntryType,
    pub amount: f64,
    pub balance_after: f64,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<LedgerTransaction> for TransactionResponse {
    fn from(entry: LedgerTransaction) -> Self {
        Self {
            id: entry.id().0,
            account_id: entry.account_id().0,
            payment_id: entry.payment_id().map(|id| id.0),
            entry_type: entry.entry_type(),
            amount: cents_to_dollars(entry.amount_cents()),
            balance_after: cents_to_dollars(entry.balance_after_cents()),
            description: entry.description().to_string(),
            created_at: entry.created_at(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePaymentRequest {
    pub payment_type: PaymentType,
    pub source_account_id: Option<Uuid>,
    pub destination_account_id: Option<Uuid>,
    pub amount: f64,
    pub currency: String,
    pub provider: Option<String>,
    #[serde(default)]
    pub metadata: Json,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTransferRequest {
    pub source_account_id: Uuid,
    pub destination_account_id: Uuid,
    pub amount: f64,
    pub currency: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub idempotency_key: String,
    pub payment_type: PaymentType,
    pub source_account_id: Option<Uuid>,
    pub destination_account_id: Option<Uuid>,
    pub amount: f64,
    pub currency: String,
    pub status: PaymentStatus,
    pub provider: Option<String>,
    pub provider_transaction_id: Option<String>,
    pub retry_count: i32,
    pub max_retries: i32,
    pub last_error: Option<String>,
    pub metadata: Json,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id().0,
            idempotency_key: payment.idempotency_key().to_string(),
            payment_type: payment.payment_type(),
            source_account_id: payment.source_account_id().map(|id| id.0),
            destination_account_id: payment.destination_account_id().map(|id| id.0),
            amount: cents_to_dollars(payment.amount_cents()),
            currency: payment.currency().to_string(),
            status: payment.status(),
            provider: payment.provider().map(str::to_string),
            provider_transaction_id: payment.provider_transaction_id().map(str::to_string),
            retry_count: payment.retry_count(),
            max_retries: payment.max_retries(),
            last_error: payment.last_error().map(str::to_string),
            metadata: payment.metadata().clone(),
            created_at: payment.created_at(),
            updated_at: payment.updated_at(),
            completed_at: payment.completed_at(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListAccountTransactionsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListPaymentsQuery {
    pub status: Option<String>,
    pub account_id: Option<Uuid>,
    pub provider: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}
