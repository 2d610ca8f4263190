//! Authentication
//!
//! - [`IdentityResolver`] - maps a bearer credential to a [`Principal`]
//! - [`JwtIdentityResolver`] - HS256 JWT implementation
//! - [`require_auth`] - axum middleware injecting the principal

mod jwt;
mod middleware;

pub use jwt::{Claims, JwtIdentityResolver};
pub use middleware::require_auth;

use async_trait::async_trait;
use http::HeaderMap;
use shared::error::AppError;
use shared::models::Principal;
use thiserror::Error;

use crate::error::DispatchError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing credential")]
    Missing,

    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Missing => AppError::not_authenticated(),
            AuthError::Expired => AppError::token_expired(),
            AuthError::Invalid(_) => AppError::invalid_token("Invalid token"),
        }
    }
}

impl From<AuthError> for DispatchError {
    fn from(e: AuthError) -> Self {
        DispatchError::Unauthenticated(e.to_string())
    }
}

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Principal, AuthError>;
}

/// Pull a bearer credential from `Authorization: Bearer <t>` or `?token=<t>`
///
/// The header wins when both are present.
pub fn bearer_token<'a>(headers: &'a HeaderMap, query: Option<&'a str>) -> Option<&'a str> {
    let from_header = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    from_header.or_else(|| {
        query?
            .split('&')
            .find_map(|pair| pair.strip_prefix("token="))
            .filter(|t| !t.is_empty())
    })
}
