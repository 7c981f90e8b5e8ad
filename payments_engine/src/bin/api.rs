use std::sync::Arc;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use payments_engine::api::{routes, AppState};
use payments_engine::config::Config;
use payments_engine::infrastructure::persistence::{
    PostgresAccountRepository, PostgresIdempotencyRepository, PostgresLedgerRepository, PostgresOutboxRepository,
    PostgresPaymentEventRepository, PostgresPaymentRepository,
};
use payments_engine::infrastructure::tx::TransactionManager;
use payments_engine::use_cases::{
    AsyncEnqueueUseCase, CancelPaymentUseCase, CreateAccountUseCase, CreatePaymentUseCase, GetAccountUseCase,
    GetBalanceUseCase, GetPaymentUseCase, ListAccountTransactionsUseCase, ListPaymentsUseCase, RefundPaymentUseCase,
    SyncTransferExecutor,
};
use payments_engine::infrastructure::provider::ProviderRegistry;

#[derive(OpenApi)]
#[openapi(paths(), components())]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    payments_engine::telemetry::init();

    let config = Config::from_env();
    info!("starting payments_engine api");

    let pool = PgPoolOptions::new().max_connections(10).connect(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let tx = TransactionManager::new(pool);

    let account_repo = Arc::new(PostgresAccountRepository::new(tx.clone()));
    let ledger_repo = Arc::new(PostgresLedgerRepository::new(tx.clone()));
    let payment_repo = Arc::new(PostgresPaymentRepository::new(tx.clone()));
    let payment_event_repo = Arc::new(PostgresPaymentEventRepository::new(tx.clone()));
    let idempotency_repo = Arc::new(PostgresIdempotencyRepository::new(tx.clone()));

    let providers = Arc::new(ProviderRegistry::with_sandbox_defaults());
    let outbox_repo = Arc::new(PostgresOutboxRepository::new(tx.clone()));

    let sync_transfer = SyncTransferExecutor::new(
        account_repo.clone(),
        ledger_repo.clone(),
        payment_repo.clone(),
        payment_event_repo.clone(),
    );
    let async_enqueue = AsyncEnqueueUseCase::new(payment_repo.clone(), outbox_repo, payment_event_repo.clone());

    let state = Arc::new(AppState {
        create_account: CreateAccountUseCase::new(account_repo.clone()),
        get_account: GetAccountUseCase::new(account_repo.clone()),
        get_balance: GetBalanceUseCase::new(account_repo.clone()),
        list_account_transactions: ListAccountTransactionsUseCase::new(account_repo.clone(), ledger_repo.clone()),
        create_payment: CreatePaymentUseCase::new(account_repo.clone(), payment_repo.clone(), tx.clone(), sync_transfer, async_enqueue),
        get_payment: GetPaymentUseCase::new(payment_repo.clone()),
        list_payments: ListPaymentsUseCase::new(payment_repo.clone()),
        refund_payment: RefundPaymentUseCase::new(
            tx.clone(),
            account_repo.clone(),
            ledger_repo.clone(),
            payment_repo.clone(),
            payment_event_repo.clone(),
            providers,
        ),
        cancel_payment: CancelPaymentUseCase::new(payment_repo, payment_event_repo),
        idempotency_repo,
    });

    let app: Router = routes(state).merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = shutdown_tx.send(true);
    });

    let listener = tokio::net::TcpListener::bind(&config.http_bind_address).await?;
    info!(address = %config.http_bind_address, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        })
        .await?;

    Ok(())
}
