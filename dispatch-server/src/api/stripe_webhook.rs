//! Stripe webhook handler
//!
//! POST /api/payments/webhook
//! 使用原始 body 验证签名（不能先解析 JSON）

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use shared::error::AppError;

use crate::error::DispatchError;
use crate::payments::ReconcileOutcome;
use crate::state::AppState;

fn rejected(reason: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "received": false, "error": reason })),
    )
        .into_response()
}

/// Handle incoming Stripe webhook events
///
/// Must receive raw body (not JSON): the signature covers the exact bytes.
/// Every verified event is acknowledged, whether or not it changed anything.
/// Storage failures answer 5xx so Stripe redelivers.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(sig_header) = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
    else {
        tracing::warn!("Missing Stripe-Signature header");
        return rejected("missing signature");
    };

    match state.orchestrator.handle_webhook(&body, sig_header).await {
        Ok(outcome) => {
            match &outcome {
                ReconcileOutcome::Applied(t) => tracing::info!(
                    payment_id = %t.payment.id,
                    from = %t.previous,
                    to = %t.payment.status,
                    "Webhook applied"
                ),
                ReconcileOutcome::Duplicate { event_id } => {
                    tracing::info!(event_id = %event_id, "Duplicate webhook event, skipping")
                }
                other => tracing::debug!(outcome = ?other, "Webhook acknowledged without change"),
            }
            (
                StatusCode::OK,
                Json(serde_json::json!({ "received": true })),
            )
                .into_response()
        }
        Err(DispatchError::WebhookVerificationFailure(_)) => rejected("signature verification failed"),
        Err(e) => AppError::from(e).into_response(),
    }
}
