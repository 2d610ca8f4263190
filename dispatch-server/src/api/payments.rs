//! Payment API Handlers

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use shared::error::{ApiResponse, AppResult};
use shared::models::{CardIntent, Payment, PaymentCreate, Principal};

use crate::state::AppState;

/// POST /api/payments/intent
pub async fn create_intent(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<PaymentCreate>,
) -> AppResult<ApiResponse<CardIntent>> {
    let intent = state
        .orchestrator
        .create_card_intent(&payload.order_id, &principal, &payload.amount)
        .await?;
    Ok(ApiResponse::success(intent))
}

/// POST /api/payments/cash
pub async fn create_cash(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<PaymentCreate>,
) -> AppResult<ApiResponse<Payment>> {
    let payment = state
        .orchestrator
        .create_cash_record(&payload.order_id, &principal, &payload.amount)
        .await?;
    Ok(ApiResponse::success(payment))
}

/// GET /api/payments/{order_id}
pub async fn get_for_order(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(order_id): Path<String>,
) -> AppResult<ApiResponse<Payment>> {
    let payment = state
        .orchestrator
        .payment_for_order(&order_id, &principal)
        .await?;
    Ok(ApiResponse::success(payment))
}

/// POST /api/payments/{order_id}/confirm-cash
pub async fn confirm_cash(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(order_id): Path<String>,
) -> AppResult<ApiResponse<Payment>> {
    let payment = state
        .orchestrator
        .confirm_cash_payment(&order_id, &principal)
        .await?;
    Ok(ApiResponse::success(payment))
}
