pub mod outbox_relay;
pub mod payment_worker;

pub use outbox_relay::OutboxRelayJob;
pub use payment_worker::PaymentWorker;
