use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use mockall::mock;
use serde_json::json;

use common::Currency;
use payments_engine::api::dto::{CreateAccountRequest, CreatePaymentRequest, CreateTransferRequest};
use payments_engine::api::http_routes::{cancel_payment, create_account, create_payment, get_account, refund_payment, AppState};
use payments_engine::domain::entities::{
    Account, IdempotencyRecord, LedgerTransaction, OutboxEntry, Payment, PaymentEvent, PaymentStatus, PaymentType,
};
use payments_engine::domain::error::DomainError;
use payments_engine::domain::repository::{
    AccountRepository, IdempotencyRepository, LedgerRepository, OutboxRepository, PaymentEventRepository,
    PaymentFilter, PaymentRepository,
};
use payments_engine::domain::types::{AccountId, IdempotencyKey, OutboxEntryId, PaymentId};
use payments_engine::infrastructure::provider::ProviderRegistry;
use payments_engine::infrastructure::tx::TransactionManager;
use payments_engine::use_cases::{
    AsyncEnqueueUseCase, CancelPaymentUseCase, CreateAccountUseCase, CreatePaymentUseCase, GetAccountUseCase,
    GetBalanceUseCase, GetPaymentUseCase, ListAccountTransactionsUseCase, ListPaymentsUseCase, RefundPaymentUseCase,
    SyncTransferExecutor,
};

mock! {
    pub AccountRepositoryImpl {}

    #[async_trait]
    impl AccountRepository for AccountRepositoryImpl {
        async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, DomainError>;
        async fn find_by_id_for_update(&self, id: AccountId) -> Result<Option<Account>, DomainError>;
        async fn create(&self, account: Account) -> Result<Account, DomainError>;
        async fn update(&self, account: &Account) -> Result<(), DomainError>;
    }
}

mock! {
    pub LedgerRepositoryImpl {}

    #[async_trait]
    impl LedgerRepository for LedgerRepositoryImpl {
        async fn append(&self, entry: LedgerTransaction) -> Result<LedgerTransaction, DomainError>;
        async fn list_for_account(&self, account_id: AccountId, limit: i64, offset: i64) -> Result<Vec<LedgerTransaction>, DomainError>;
    }
}

mock! {
    pub PaymentRepositoryImpl {}

    #[async_trait]
    impl PaymentRepository for PaymentRepositoryImpl {
        async fn create(&self, payment: Payment) -> Result<Payment, DomainError>;
        async fn update(&self, payment: &Payment) -> Result<(), DomainError>;
        async fn find_by_id(&self, id: PaymentId) -> Result<Option<Payment>, DomainError>;
        async fn find_by_idempotency_key(&self, key: &IdempotencyKey) -> Result<Option<Payment>, DomainError>;
        async fn list(&self, filter: PaymentFilter) -> Result<Vec<Payment>, DomainError>;
    }
}

mock! {
    pub PaymentEventRepositoryImpl {}

    #[async_trait]
    impl PaymentEventRepository for PaymentEventRepositoryImpl {
        async fn append(&self, event: PaymentEvent) -> Result<PaymentEvent, DomainError>;
        async fn list_for_payment(&self, payment_id: PaymentId) -> Result<Vec<PaymentEvent>, DomainError>;
    }
}

mock! {
    pub OutboxRepositoryImpl {}

    #[async_trait]
    impl OutboxRepository for OutboxRepositoryImpl {
        async fn insert(&self, entry: OutboxEntry) -> Result<OutboxEntry, DomainError>;
        async fn get_pending(&self, limit: i64) -> Result<Vec<OutboxEntry>, DomainError>;
        async fn mark_published(&self, id: OutboxEntryId) -> Result<(), DomainError>;
        async fn mark_failed(&self, id: OutboxEntryId) -> Result<(), DomainError>;
    }
}

mock! {
    pub IdempotencyRepositoryImpl {}

    #[async_trait]
    impl IdempotencyRepository for IdempotencyRepositoryImpl {
        async fn get(&self, key: &IdempotencyKey) -> Result<Option<IdempotencyRecord>, DomainError>;
        async fn set(&self, record: IdempotencyRecord) -> Result<(), DomainError>;
        async fn cleanup(&self) -> Result<u64, DomainError>;
    }
}

fn test_tx() -> TransactionManager {
    TransactionManager::new(sqlx::PgPool::connect_lazy("postgres://localhost/unused").unwrap())
}

fn pending_external_payment() -> Payment {
    Payment::new(
        IdempotencyKey("key-1".to_string()),
        PaymentType::ExternalPayment,
        Some(AccountId::new()),
        None,
        500,
        Currency::parse("USD").unwrap(),
        Some("sandbox_primary".to_string()),
        json!({}),
    )
    .unwrap()
}

fn build_state(
    account_repo: MockAccountRepositoryImpl,
    ledger_repo: MockLedgerRepositoryImpl,
    payment_repo: MockPaymentRepositoryImpl,
    payment_event_repo: MockPaymentEventRepositoryImpl,
    outbox_repo: MockOutboxRepositoryImpl,
) -> Arc<AppState> {
    let account_repo: Arc<dyn AccountRepository> = Arc::new(account_repo);
    let ledger_repo: Arc<dyn LedgerRepository> = Arc::new(ledger_repo);
    let payment_repo: Arc<dyn PaymentRepository> = Arc::new(payment_repo);
    let payment_event_repo: Arc<dyn PaymentEventRepository> = Arc::new(payment_event_repo);
    let outbox_repo: Arc<dyn OutboxRepository> = Arc::new(outbox_repo);
    let providers = Arc::new(ProviderRegistry::new());

    let sync_transfer = SyncTransferExecutor::new(
        account_repo.clone(),
        ledger_repo.clone(),
        payment_repo.clone(),
        payment_event_repo.clone(),
    );
    let async_enqueue = AsyncEnqueueUseCase::new(payment_repo.clone(), outbox_repo, payment_event_repo.clone());

    Arc::new(AppState {
        create_account: CreateAccountUseCase::new(account_repo.clone()),
        get_account: GetAccountUseCase::new(account_repo.clone()),
        get_balance: GetBalanceUseCase::new(account_repo.clone()),
        list_account_transactions: ListAccountTransactionsUseCase::new(account_repo.clone(), ledger_repo.clone()),
        create_payment: CreatePaymentUseCase::new(account_repo.clone(), payment_repo.clone(), test_tx(), sync_transfer, async_enqueue),
        get_payment: GetPaymentUseCase::new(payment_repo.clone()),
        list_payments: ListPaymentsUseCase::new(payment_repo.clone()),
        refund_payment: RefundPaymentUseCase::new(
            test_tx(),
            account_repo.clone(),
            ledger_repo.clone(),
            payment_repo.clone(),
            payment_event_repo.clone(),
            providers,
        ),
        cancel_payment: CancelPaymentUseCase::new(payment_repo, payment_event_repo),
        idempotency_repo: Arc::new(MockIdempotencyRepositoryImpl::new()),
    })
}

#[tokio::test]
async fn creating_an_account_returns_201_with_zero_version() {
    let mut account_repo = MockAccountRepositoryImpl::new();
    account_repo.expect_create().returning(|account| Ok(account));

    let state = build_state(
        account_repo,
        MockLedgerRepositoryImpl::new(),
        MockPaymentRepositoryImpl::new(),
        MockPaymentEventRepositoryImpl::new(),
        MockOutboxRepositoryImpl::new(),
    );

    let body = CreateAccountRequest {
        user_id: uuid::Uuid::new_v4(),
        initial_balance: 100.00,
        currency: "USD".to_string(),
    };

    let (status, Json(response)) = create_account(State(state), Json(body)).await.unwrap();
    assert_eq!(status, axum::http::StatusCode::CREATED);
    assert_eq!(response.data.balance, 100.00);
    assert_eq!(response.data.version, 0);
}

#[tokio::test]
async fn getting_an_unknown_account_maps_to_404() {
    let mut account_repo = MockAccountRepositoryImpl::new();
    account_repo.expect_find_by_id().returning(|_| Ok(None));

    let state = build_state(
        account_repo,
        MockLedgerRepositoryImpl::new(),
        MockPaymentRepositoryImpl::new(),
        MockPaymentEventRepositoryImpl::new(),
        MockOutboxRepositoryImpl::new(),
    );

    let err = get_account(State(state), Path(uuid::Uuid::new_v4())).await.unwrap_err();
    let response = axum::response::IntoResponse::into_response(err);
    assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_payment_without_idempotency_key_is_rejected() {
    let state = build_state(
        MockAccountRepositoryImpl::new(),
        MockLedgerRepositoryImpl::new(),
        MockPaymentRepositoryImpl::new(),
        MockPaymentEventRepositoryImpl::new(),
        MockOutboxRepositoryImpl::new(),
    );

    let body = CreatePaymentRequest {
        payment_type: PaymentType::ExternalPayment,
        source_account_id: None,
        destination_account_id: None,
        amount: 10.0,
        currency: "USD".to_string(),
        provider: Some("sandbox_primary".to_string()),
        metadata: json!({}),
    };

    let err = create_payment(State(state), HeaderMap::new(), Json(body)).await.unwrap_err();
    let response = axum::response::IntoResponse::into_response(err);
    assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn refunding_a_non_completed_payment_returns_409() {
    let payment = pending_external_payment();
    let payment_id = payment.id();

    let mut payment_repo = MockPaymentRepositoryImpl::new();
    payment_repo.expect_find_by_id().returning(move |_| Ok(Some(payment.clone())));

    let state = build_state(
        MockAccountRepositoryImpl::new(),
        MockLedgerRepositoryImpl::new(),
        payment_repo,
        MockPaymentEventRepositoryImpl::new(),
        MockOutboxRepositoryImpl::new(),
    );

    let err = refund_payment(State(state), Path(payment_id.0)).await.unwrap_err();
    let response = axum::response::IntoResponse::into_response(err);
    assert_eq!(response.status(), axum::http::StatusCode::CONFLICT);
}

#[tokio::test]
async fn cancelling_a_pending_payment_returns_the_cancelled_status() {
    let payment = pending_external_payment();
    let payment_id = payment.id();

    let mut payment_repo = MockPaymentRepositoryImpl::new();
    payment_repo.expect_find_by_id().returning(move |_| Ok(Some(payment.clone())));
    payment_repo.expect_update().returning(|_| Ok(()));

    let mut payment_event_repo = MockPaymentEventRepositoryImpl::new();
    payment_event_repo.expect_append().returning(Ok);

    let state = build_state(
        MockAccountRepositoryImpl::new(),
        MockLedgerRepositoryImpl::new(),
        payment_repo,
        payment_event_repo,
        MockOutboxRepositoryImpl::new(),
    );

    let Json(response) = cancel_payment(State(state), Path(payment_id.0)).await.unwrap();
    assert_eq!(response.data.status, PaymentStatus::Cancelled);
}

/// Exercises the internal-transfer execution logic directly (spec.md §4.9,
/// §8 scenario 1) rather than through the `CreatePaymentUseCase` handler,
/// since the latter opens a real DB transaction this test has no pool for.
#[tokio::test]
async fn sync_transfer_moves_funds_between_both_accounts() {
    let source = Account::new(uuid::Uuid::new_v4(), Currency::parse("USD").unwrap(), 10_000).unwrap();
    let destination = Account::new(uuid::Uuid::new_v4(), Currency::parse("USD").unwrap(), 0).unwrap();
    let source_id = source.id();
    let destination_id = destination.id();

    let mut account_repo = MockAccountRepositoryImpl::new();
    account_repo.expect_find_by_id_for_update().returning({
        let source = source.clone();
        let destination = destination.clone();
        move |id| {
            if id == source_id {
                Ok(Some(source.clone()))
            } else if id == destination_id {
                Ok(Some(destination.clone()))
            } else {
                Ok(None)
            }
        }
    });
    account_repo.expect_update().times(2).returning(|_| Ok(()));

    let mut ledger_repo = MockLedgerRepositoryImpl::new();
    ledger_repo.expect_append().times(2).returning(|entry| Ok(entry));

    let mut payment_repo = MockPaymentRepositoryImpl::new();
    payment_repo.expect_update().returning(|_| Ok(()));

    let mut payment_event_repo = MockPaymentEventRepositoryImpl::new();
    payment_event_repo.expect_append().returning(Ok);

    let executor = SyncTransferExecutor::new(
        Arc::new(account_repo),
        Arc::new(ledger_repo),
        Arc::new(payment_repo),
        Arc::new(payment_event_repo),
    );

    let payment = Payment::new(
        IdempotencyKey("transfer-key".to_string()),
        PaymentType::InternalTransfer,
        Some(source_id),
        Some(destination_id),
        2_500,
        Currency::parse("USD").unwrap(),
        None,
        json!({}),
    )
    .unwrap();

    let result = executor.execute(payment).await.unwrap();
    assert_eq!(result.status(), PaymentStatus::Completed);
}
