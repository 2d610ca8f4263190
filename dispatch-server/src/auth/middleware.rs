//! Authentication middleware

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use shared::error::AppError;

use super::{AuthError, bearer_token};
use crate::state::AppState;

/// Require a valid bearer credential
///
/// On success the resolved [`shared::models::Principal`] is inserted into the
/// request extensions for handlers to take with `Extension<Principal>`.
/// CORS preflight requests pass through untouched.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let Some(token) = bearer_token(req.headers(), req.uri().query()).map(String::from) else {
        tracing::warn!(uri = %req.uri(), "Request without credential");
        return Err(AuthError::Missing.into());
    };

    match state.identity.resolve(&token).await {
        Ok(principal) => {
            req.extensions_mut().insert(principal);
            Ok(next.run(req).await)
        }
        Err(e) => {
            tracing::warn!(uri = %req.uri(), error = %e, "Credential rejected");
            Err(e.into())
        }
    }
}
