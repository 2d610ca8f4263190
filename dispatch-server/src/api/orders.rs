//! Order API Handlers

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use shared::error::{ApiResponse, AppResult};
use shared::models::{DeliveryAssignment, Order, OrderCreate, OrderStatusUpdate, Principal};

use crate::state::AppState;

/// POST /api/orders
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<OrderCreate>,
) -> AppResult<ApiResponse<Order>> {
    let order = state.orchestrator.place_order(&principal, payload).await?;
    Ok(ApiResponse::success(order))
}

/// GET /api/orders
pub async fn list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> AppResult<ApiResponse<Vec<Order>>> {
    let orders = state.orchestrator.list_orders(&principal).await?;
    Ok(ApiResponse::success(orders))
}

/// GET /api/orders/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Order>> {
    let order = state.orchestrator.get_order(&id, &principal).await?;
    Ok(ApiResponse::success(order))
}

/// PATCH /api/orders/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(payload): Json<OrderStatusUpdate>,
) -> AppResult<ApiResponse<Order>> {
    let order = state
        .orchestrator
        .transition_order(&id, payload.status, &principal)
        .await?;
    Ok(ApiResponse::success(order))
}

/// PATCH /api/orders/{id}/assign-delivery
pub async fn assign_delivery(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(payload): Json<DeliveryAssignment>,
) -> AppResult<ApiResponse<Order>> {
    let order = state
        .orchestrator
        .assign_delivery_agent(&id, &payload.delivery_agent_id, &principal)
        .await?;
    Ok(ApiResponse::success(order))
}
