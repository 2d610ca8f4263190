//! HTTP and WebSocket surface
//!
//! | Route | Auth |
//! |-------|------|
//! | `GET /health` | none |
//! | `POST /api/payments/webhook` | Stripe signature |
//! | `GET /notifications/ws` | bearer (header or `?token=`), checked before upgrade |
//! | everything else under `/api` | bearer, via [`require_auth`] |

pub mod health;
pub mod orders;
pub mod payments;
pub mod stripe_webhook;
pub mod ws;

use axum::routing::{get, patch, post};
use axum::{Router, middleware};
use http::HeaderValue;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::auth::require_auth;
use crate::state::AppState;

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match HeaderValue::from_str(frontend_url) {
        Ok(origin) => base.allow_origin(origin),
        Err(_) => {
            tracing::warn!(frontend_url, "Invalid FRONTEND_URL, allowing any origin");
            base.allow_origin(Any)
        }
    }
}

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    let authenticated = Router::new()
        .route("/api/orders", post(orders::create).get(orders::list))
        .route("/api/orders/{id}", get(orders::get_by_id))
        .route("/api/orders/{id}/status", patch(orders::update_status))
        .route(
            "/api/orders/{id}/assign-delivery",
            patch(orders::assign_delivery),
        )
        .route("/api/payments/intent", post(payments::create_intent))
        .route("/api/payments/cash", post(payments::create_cash))
        .route("/api/payments/{order_id}", get(payments::get_for_order))
        .route(
            "/api/payments/{order_id}/confirm-cash",
            post(payments::confirm_cash),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Stripe webhook (signature-verified, raw body)
    let webhook = Router::new().route(
        "/api/payments/webhook",
        post(stripe_webhook::handle_webhook),
    );

    let x_request_id = http::HeaderName::from_static("x-request-id");

    Router::new()
        .route("/health", get(health::health_check))
        .route("/notifications/ws", get(ws::handle_notifications_ws))
        .merge(authenticated)
        .merge(webhook)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(x_request_id))
                .layer(cors_layer(&state.frontend_url)),
        )
        .with_state(state)
}
