//! Unified error codes for the dispatch service
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so that browser and mobile
/// clients can switch on them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Invalid format
    InvalidFormat = 6,
    /// Entity was modified by another writer (retry after re-reading)
    ConcurrentModification = 9,

    // ==================== 1xxx: Auth ====================
    /// Caller is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Status change not permitted from the current state or for this role
    InvalidTransition = 4010,
    /// A delivery agent is already assigned
    DeliveryAgentAlreadyAssigned = 4011,
    /// Quantity must be a positive integer
    InvalidQuantity = 4012,

    // ==================== 5xxx: Payment ====================
    /// Payment not found
    PaymentNotFound = 5006,
    /// Amount is not a positive number
    InvalidAmount = 5010,
    /// Order already has an active payment
    PaymentAlreadyActive = 5011,
    /// Payment type does not match the order
    PaymentTypeMismatch = 5012,
    /// Webhook signature could not be verified
    WebhookVerificationFailed = 5020,
    /// Payment provider call failed
    PaymentGatewayError = 5030,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Whether the caller may retry the same request after re-reading state
    #[inline]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::ConcurrentModification)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::ConcurrentModification => {
                "Resource was modified concurrently, re-read and retry"
            }

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::InvalidTransition => "Order status transition is not allowed",
            ErrorCode::DeliveryAgentAlreadyAssigned => "Delivery agent is already assigned",
            ErrorCode::InvalidQuantity => "Quantity must be a positive integer",

            // Payment
            ErrorCode::PaymentNotFound => "Payment not found",
            ErrorCode::InvalidAmount => "Amount must be a positive number",
            ErrorCode::PaymentAlreadyActive => "Order already has an active payment",
            ErrorCode::PaymentTypeMismatch => "Payment type does not match the order",
            ErrorCode::WebhookVerificationFailed => "Webhook signature verification failed",
            ErrorCode::PaymentGatewayError => "Payment provider request failed",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            6 => Ok(ErrorCode::InvalidFormat),
            9 => Ok(ErrorCode::ConcurrentModification),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4010 => Ok(ErrorCode::InvalidTransition),
            4011 => Ok(ErrorCode::DeliveryAgentAlreadyAssigned),
            4012 => Ok(ErrorCode::InvalidQuantity),

            // Payment
            5006 => Ok(ErrorCode::PaymentNotFound),
            5010 => Ok(ErrorCode::InvalidAmount),
            5011 => Ok(ErrorCode::PaymentAlreadyActive),
            5012 => Ok(ErrorCode::PaymentTypeMismatch),
            5020 => Ok(ErrorCode::WebhookVerificationFailed),
            5030 => Ok(ErrorCode::PaymentGatewayError),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrips_through_u16() {
        for code in [
            ErrorCode::Success,
            ErrorCode::ConcurrentModification,
            ErrorCode::NotAuthenticated,
            ErrorCode::InvalidTransition,
            ErrorCode::WebhookVerificationFailed,
            ErrorCode::InternalError,
        ] {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn test_unknown_value_rejected() {
        assert_eq!(ErrorCode::try_from(4999), Err(InvalidErrorCode(4999)));
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_string(&ErrorCode::InvalidAmount).unwrap();
        assert_eq!(json, "5010");
        let code: ErrorCode = serde_json::from_str("4011").unwrap();
        assert_eq!(code, ErrorCode::DeliveryAgentAlreadyAssigned);
    }

    #[test]
    fn test_display_format() {
        assert_eq!(ErrorCode::OrderNotFound.to_string(), "E4001");
        assert_eq!(ErrorCode::ConcurrentModification.to_string(), "E0009");
    }

    #[test]
    fn test_retryable() {
        assert!(ErrorCode::ConcurrentModification.is_retryable());
        assert!(!ErrorCode::InvalidTransition.is_retryable());
    }
}
