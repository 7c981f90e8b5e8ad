pub mod account_repository;
pub mod idempotency_repository;
pub mod ledger_repository;
pub mod models;
pub mod outbox_repository;
pub mod payment_event_repository;
pub mod payment_repository;

pub use account_repository::PostgresAccountRepository;
pub use idempotency_repository::PostgresIdempotencyRepository;
pub use ledger_repository::PostgresLedgerRepository;
pub use outbox_repository::PostgresOutboxRepository;
pub use payment_event_repository::PostgresPaymentEventRepository;
pub use payment_repository::PostgresPaymentRepository;
