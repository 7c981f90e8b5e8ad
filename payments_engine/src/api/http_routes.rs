use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use common::Currency;

use crate::domain::entities::PaymentType;
use crate::domain::error::DomainError;
use crate::domain::repository::{IdempotencyRepository, PaymentFilter, PaymentSortColumn, SortOrder};
use crate::domain::types::{AccountId, IdempotencyKey, PaymentId};
use crate::use_cases::{
    CancelPaymentUseCase, CreateAccountUseCase, CreatePaymentInput, CreatePaymentUseCase, GetAccountUseCase,
    GetBalanceUseCase, GetPaymentUseCase, ListAccountTransactionsUseCase, ListPaymentsUseCase, RefundPaymentUseCase,
};

use super::dto::{
    dollars_to_cents, AccountResponse, BalanceResponse, CreateAccountRequest, CreatePaymentRequest, CreateTransferRequest,
    ListAccountTransactionsQuery, ListPaymentsQuery, PaymentResponse, TransactionResponse,
};
use super::error::ApiError;
use super::idempotency_middleware::idempotency_middleware;
use super::response::ApiResponse;

pub struct AppState {
    pub create_account: CreateAccountUseCase,
    pub get_account: GetAccountUseCase,
    pub get_balance: GetBalanceUseCase,
    pub list_account_transactions: ListAccountTransactionsUseCase,
    pub create_payment: CreatePaymentUseCase,
    pub get_payment: GetPaymentUseCase,
    pub list_payments: ListPaymentsUseCase,
    pub refund_payment: RefundPaymentUseCase,
    pub cancel_payment: CancelPaymentUseCase,
    pub idempotency_repo: Arc<dyn IdempotencyRepository>,
}

/// Assembles the `/api/v1` router (spec.md §6). `POST /payments` and
/// `POST /transfers` additionally run behind the idempotency-key cache.
pub fn routes(state: Arc<AppState>) -> Router {
    let idempotent = Router::new()
        .route("/payments", post(create_payment))
        .route("/transfers", post(create_transfer))
        .route_layer(middleware::from_fn_with_state(state.clone(), idempotency_middleware));

    let plain = Router::new()
        .route("/accounts", post(create_account))
        .route("/accounts/{id}", get(get_account))
        .route("/accounts/{id}/balance", get(get_balance))
        .route("/accounts/{id}/transactions", get(list_account_transactions))
        .route("/payments/{id}", get(get_payment))
        .route("/payments", get(list_payments))
        .route("/payments/{id}/refund", post(refund_payment))
        .route("/payments/{id}/cancel", post(cancel_payment));

    Router::new().nest("/api/v1", plain.merge(idempotent)).with_state(state)
}

const IDEMPOTENCY_HEADER: &str = "idempotency-key";

fn idempotency_key(headers: &HeaderMap) -> Result<IdempotencyKey, ApiError> {
    headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|raw| IdempotencyKey(raw.to_string()))
        .ok_or_else(|| ApiError(DomainError::ValidationError("missing Idempotency-Key header".to_string())))
}

pub async fn create_account(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AccountResponse>>), ApiError> {
    let account = state
        .create_account
        .execute(body.user_id, dollars_to_cents(body.initial_balance), &body.currency)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(account.into()))))
}

pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<AccountResponse>>, ApiError> {
    let account = state.get_account.execute(AccountId(id)).await?;
    Ok(Json(ApiResponse::success(account.into())))
}

pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BalanceResponse>>, ApiError> {
    let balance = state.get_balance.execute(AccountId(id)).await?;
    Ok(Json(ApiResponse::success(BalanceResponse {
        balance: super::dto::cents_to_dollars(balance.balance_cents),
        currency: balance.currency.to_string(),
    })))
}

pub async fn list_account_transactions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<ListAccountTransactionsQuery>,
) -> Result<Json<ApiResponse<Vec<TransactionResponse>>>, ApiError> {
    let limit = query.limit.unwrap_or(20);
    let offset = query.offset.unwrap_or(0);
    let entries = state
        .list_account_transactions
        .execute(AccountId(id), limit, offset)
        .await?;
    Ok(Json(ApiResponse::success(entries.into_iter().map(Into::into).collect())))
}

pub async fn create_payment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PaymentResponse>>), ApiError> {
    let key = idempotency_key(&headers)?;
    let currency = Currency::parse(&body.currency).map_err(|e| DomainError::InvalidCurrency(e.to_string()))?;
    let input = CreatePaymentInput {
        idempotency_key: key,
        payment_type: body.payment_type,
        source_account_id: body.source_account_id.map(AccountId),
        destination_account_id: body.destination_account_id.map(AccountId),
        amount_cents: dollars_to_cents(body.amount),
        currency,
        provider: body.provider,
        metadata: body.metadata,
    };
    let result = state.create_payment.execute(input).await?;
    let status = if result.is_async { StatusCode::ACCEPTED } else { StatusCode::CREATED };
    Ok((status, Json(ApiResponse::success(result.payment.into()))))
}

pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateTransferRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PaymentResponse>>), ApiError> {
    let key = idempotency_key(&headers)?;
    let currency = Currency::parse(&body.currency).map_err(|e| DomainError::InvalidCurrency(e.to_string()))?;
    let input = CreatePaymentInput {
        idempotency_key: key,
        payment_type: PaymentType::InternalTransfer,
        source_account_id: Some(AccountId(body.source_account_id)),
        destination_account_id: Some(AccountId(body.destination_account_id)),
        amount_cents: dollars_to_cents(body.amount),
        currency,
        provider: None,
        metadata: serde_json::json!({}),
    };
    let result = state.create_payment.execute(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(result.payment.into()))))
}

pub async fn get_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PaymentResponse>>, ApiError> {
    let payment = state.get_payment.execute(PaymentId(id)).await?;
    Ok(Json(ApiResponse::success(payment.into())))
}

pub async fn list_payments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListPaymentsQuery>,
) -> Result<Json<ApiResponse<Vec<PaymentResponse>>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(parse_status)
        .transpose()
        .map_err(DomainError::ValidationError)?;

    let filter = PaymentFilter {
        account_id: query.account_id.map(AccountId),
        status,
        provider: query.provider,
        limit: query.limit.unwrap_or(20),
        offset: query.offset.unwrap_or(0),
        sort_by: query
            .sort_by
            .as_deref()
            .and_then(PaymentSortColumn::from_query_param)
            .unwrap_or(PaymentSortColumn::CreatedAt),
        sort_order: query.sort_order.as_deref().map(SortOrder::from_query_param).unwrap_or(SortOrder::Desc),
    };

    let payments = state.list_payments.execute(filter).await?;
    Ok(Json(ApiResponse::success(payments.into_iter().map(Into::into).collect())))
}

fn parse_status(raw: &str) -> Result<crate::domain::entities::PaymentStatus, String> {
    use crate::domain::entities::PaymentStatus::*;
    match raw {
        "pending" => Ok(Pending),
        "processing" => Ok(Processing),
        "completed" => Ok(Completed),
        "failed" => Ok(Failed),
        "cancelled" => Ok(Cancelled),
        "refunded" => Ok(Refunded),
        other => Err(format!("unknown payment status: {other}")),
    }
}

pub async fn refund_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PaymentResponse>>, ApiError> {
    let payment = state.refund_payment.execute(PaymentId(id)).await?;
    Ok(Json(ApiResponse::success(payment.into())))
}

pub async fn cancel_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PaymentResponse>>, ApiError> {
    let payment = state.cancel_payment.execute(PaymentId(id)).await?;
    Ok(Json(ApiResponse::success(payment.into())))
}
