use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tracing::info;

use payments_engine::config::Config;
use payments_engine::domain::stream::{StreamConsumer, StreamPublisher};
use payments_engine::infrastructure::persistence::{
    PostgresAccountRepository, PostgresLedgerRepository, PostgresOutboxRepository, PostgresPaymentEventRepository,
    PostgresPaymentRepository,
};
use payments_engine::infrastructure::provider::ProviderRegistry;
use payments_engine::infrastructure::redis_lock::RedisDistributedLock;
use payments_engine::infrastructure::stream::RedisStream;
use payments_engine::infrastructure::tx::TransactionManager;
use payments_engine::jobs::{outbox_relay, payment_worker, OutboxRelayJob, PaymentWorker};
use payments_engine::use_cases::ProcessExternalPaymentUseCase;

const PAYMENTS_STREAM_KEY: &str = "payments:processing";
const PAYMENTS_STREAM_GROUP: &str = "payment_workers";
const OUTBOX_RELAY_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    payments_engine::telemetry::init();

    let config = Config::from_env();
    info!("starting payments_engine worker");

    let pool = PgPoolOptions::new().max_connections(10).connect(&config.database_url).await?;
    let tx = TransactionManager::new(pool);

    let redis_client = redis::Client::open(config.redis_url.clone())?;

    let account_repo = Arc::new(PostgresAccountRepository::new(tx.clone()));
    let ledger_repo = Arc::new(PostgresLedgerRepository::new(tx.clone()));
    let payment_repo = Arc::new(PostgresPaymentRepository::new(tx.clone()));
    let payment_event_repo = Arc::new(PostgresPaymentEventRepository::new(tx.clone()));
    let outbox_repo = Arc::new(PostgresOutboxRepository::new(tx.clone()));

    let providers = Arc::new(ProviderRegistry::with_sandbox_defaults());
    let lock: Arc<dyn payments_engine::domain::lock::DistributedLock> = Arc::new(RedisDistributedLock::new(redis_client.clone()));
    let stream = Arc::new(RedisStream::new(redis_client, PAYMENTS_STREAM_KEY, PAYMENTS_STREAM_GROUP));
    let consumer: Arc<dyn StreamConsumer> = stream.clone();
    let publisher: Arc<dyn StreamPublisher> = stream;

    let processor = ProcessExternalPaymentUseCase::new(tx.clone(), account_repo, ledger_repo, payment_repo.clone(), payment_event_repo);

    let worker = PaymentWorker::new(consumer, lock, payment_repo, providers, processor, config.worker_consumer_name.clone());
    let relay_job = OutboxRelayJob::new(tx, outbox_repo, publisher);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = shutdown_tx.send(true);
    });

    let worker_loop = payment_worker::run_forever(worker, shutdown_rx.clone());
    let relay_loop = outbox_relay::run_forever(relay_job, OUTBOX_RELAY_INTERVAL, shutdown_rx);

    tokio::join!(worker_loop, relay_loop);

    Ok(())
}
