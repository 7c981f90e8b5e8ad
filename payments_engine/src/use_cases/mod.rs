pub mod async_enqueue;
pub mod cancel_payment;
pub mod create_account;
pub mod create_payment;
pub mod get_account;
pub mod get_balance;
pub mod get_payment;
pub mod list_account_transactions;
pub mod list_payments;
pub mod process_external_payment;
pub mod refund_payment;
pub mod sync_transfer;

pub use async_enqueue::AsyncEnqueueUseCase;
pub use cancel_payment::CancelPaymentUseCase;
pub use create_account::CreateAccountUseCase;
pub use create_payment::{CreatePaymentInput, CreatePaymentResult, CreatePaymentUseCase};
pub use get_account::GetAccountUseCase;
pub use get_balance::{Balance, GetBalanceUseCase};
pub use get_payment::GetPaymentUseCase;
pub use list_account_transactions::ListAccountTransactionsUseCase;
pub use list_payments::ListPaymentsUseCase;
pub use process_external_payment::ProcessExternalPaymentUseCase;
pub use refund_payment::RefundPaymentUseCase;
pub use sync_transfer::SyncTransferExecutor;
