//! Domain error type for the dispatch core
//!
//! `DispatchError` is what the state machine, ledger, reconciler and hub
//! return. It converts into [`AppError`] at the transport boundary so that
//! handlers can use `?` directly.

use shared::error::{AppError, ErrorCode};
use shared::models::{OrderStatus, PaymentType, Role};
use thiserror::Error;

use crate::store::StorageError;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("transition {from} -> {to} not allowed for {role}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
        role: Role,
    },

    #[error("order {order_id} cannot take a delivery agent ({reason})")]
    AlreadyAssigned { order_id: String, reason: String },

    #[error("{entity} {id} was modified concurrently")]
    ConcurrentModification { entity: &'static str, id: String },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid quantity: {0}")]
    InvalidQuantity(u32),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("order {order_id} is paid by {expected}, not {requested}")]
    PaymentTypeMismatch {
        order_id: String,
        expected: PaymentType,
        requested: PaymentType,
    },

    #[error("order {order_id} already has an active payment")]
    PaymentExists { order_id: String },

    #[error("webhook verification failed: {0}")]
    WebhookVerificationFailure(String),

    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("payment gateway error: {0}")]
    Gateway(String),

    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl DispatchError {
    pub fn order_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "order",
            id: id.into(),
        }
    }

    pub fn payment_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "payment",
            id: id.into(),
        }
    }

    /// Only a lost compare-and-set race is worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }
}

impl From<StorageError> for DispatchError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound { entity, id } => Self::NotFound { entity, id },
            StorageError::VersionConflict { entity, id } => {
                Self::ConcurrentModification { entity, id }
            }
            StorageError::ActivePaymentExists { order_id } => Self::PaymentExists { order_id },
            other => Self::Storage(other),
        }
    }
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        let message = err.to_string();
        match err {
            DispatchError::NotFound { entity, id } => {
                let code = match entity {
                    "order" => ErrorCode::OrderNotFound,
                    "payment" => ErrorCode::PaymentNotFound,
                    _ => ErrorCode::NotFound,
                };
                AppError::with_message(code, message).with_detail("id", id)
            }
            DispatchError::InvalidTransition { from, to, role } => {
                AppError::with_message(ErrorCode::InvalidTransition, message)
                    .with_detail("from", from.as_str())
                    .with_detail("to", to.as_str())
                    .with_detail("role", role.as_str())
            }
            DispatchError::AlreadyAssigned { order_id, .. } => {
                AppError::with_message(ErrorCode::DeliveryAgentAlreadyAssigned, message)
                    .with_detail("order_id", order_id)
            }
            DispatchError::ConcurrentModification { entity, id } => {
                AppError::with_message(ErrorCode::ConcurrentModification, message)
                    .with_detail("entity", entity)
                    .with_detail("id", id)
                    .with_detail("retryable", true)
            }
            DispatchError::InvalidAmount(_) => {
                AppError::with_message(ErrorCode::InvalidAmount, message)
            }
            DispatchError::InvalidQuantity(_) => {
                AppError::with_message(ErrorCode::InvalidQuantity, message)
            }
            DispatchError::Validation(_) => {
                AppError::with_message(ErrorCode::ValidationFailed, message)
            }
            DispatchError::PaymentTypeMismatch { .. } => {
                AppError::with_message(ErrorCode::PaymentTypeMismatch, message)
            }
            DispatchError::PaymentExists { order_id } => {
                AppError::with_message(ErrorCode::PaymentAlreadyActive, message)
                    .with_detail("order_id", order_id)
            }
            DispatchError::WebhookVerificationFailure(_) => {
                AppError::with_message(ErrorCode::WebhookVerificationFailed, message)
            }
            DispatchError::Unauthenticated(_) => {
                AppError::with_message(ErrorCode::NotAuthenticated, message)
            }
            DispatchError::Unauthorized(_) => {
                AppError::with_message(ErrorCode::PermissionDenied, message)
            }
            DispatchError::Gateway(e) => {
                tracing::error!(error = %e, "Payment gateway error");
                AppError::new(ErrorCode::PaymentGatewayError)
            }
            DispatchError::Storage(e) => {
                tracing::error!(error = %e, "Record store error");
                AppError::new(ErrorCode::DatabaseError)
            }
        }
    }
}

impl axum::response::IntoResponse for DispatchError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_conflict_becomes_concurrent_modification() {
        let err: DispatchError = StorageError::VersionConflict {
            entity: "order",
            id: "o-1".to_string(),
        }
        .into();
        assert!(err.is_retryable());

        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::ConcurrentModification);
        assert_eq!(app.details.unwrap()["retryable"], true);
    }

    #[test]
    fn test_not_found_maps_to_entity_code() {
        let app: AppError = DispatchError::order_not_found("o-9").into();
        assert_eq!(app.code, ErrorCode::OrderNotFound);

        let app: AppError = DispatchError::payment_not_found("o-9").into();
        assert_eq!(app.code, ErrorCode::PaymentNotFound);
    }

    #[test]
    fn test_transition_details() {
        let app: AppError = DispatchError::InvalidTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Placed,
            role: Role::Kitchen,
        }
        .into();
        assert_eq!(app.code, ErrorCode::InvalidTransition);
        let details = app.details.unwrap();
        assert_eq!(details["from"], "Delivered");
        assert_eq!(details["role"], "kitchen");
    }

    #[test]
    fn test_infrastructure_errors_hide_detail() {
        let app: AppError = DispatchError::Gateway("connection reset".to_string()).into();
        assert_eq!(app.code, ErrorCode::PaymentGatewayError);
        assert!(!app.message.contains("connection reset"));
    }
}
