//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            Self::NotFound | Self::OrderNotFound | Self::PaymentNotFound => StatusCode::NOT_FOUND,

            Self::ConcurrentModification
            | Self::DeliveryAgentAlreadyAssigned
            | Self::PaymentAlreadyActive => StatusCode::CONFLICT,

            Self::NotAuthenticated | Self::TokenExpired | Self::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }

            Self::PermissionDenied => StatusCode::FORBIDDEN,

            Self::InvalidTransition => StatusCode::UNPROCESSABLE_ENTITY,

            Self::PaymentGatewayError => StatusCode::BAD_GATEWAY,

            Self::InternalError | Self::DatabaseError | Self::Unknown => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            // 400 Bad Request (validation, amount, signature)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_status() {
        assert_eq!(ErrorCode::OrderNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::PaymentNotFound.http_status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_conflict_status() {
        assert_eq!(
            ErrorCode::ConcurrentModification.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ErrorCode::DeliveryAgentAlreadyAssigned.http_status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_auth_statuses() {
        assert_eq!(
            ErrorCode::NotAuthenticated.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ErrorCode::PermissionDenied.http_status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_bad_request_defaults() {
        assert_eq!(ErrorCode::InvalidAmount.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::WebhookVerificationFailed.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ErrorCode::InvalidQuantity.http_status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_transition_is_unprocessable() {
        assert_eq!(
            ErrorCode::InvalidTransition.http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
