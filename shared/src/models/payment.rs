//! Payment Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::order::PaymentType;

/// Payment ledger status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
    RequiresAction,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::RequiresAction => "requires_action",
        }
    }

    /// Terminal payments are immutable
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Completed | PaymentStatus::Failed | PaymentStatus::Cancelled
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub order_id: String,
    pub customer_id: String,
    /// Major currency units, serialized as a decimal string
    pub amount: Decimal,
    pub payment_type: PaymentType,
    pub status: PaymentStatus,
    /// Provider payment-intent id (card payments only)
    pub intent_id: Option<String>,
    /// Milliseconds since epoch
    pub paid_at: Option<i64>,
    pub version: u64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Card payment handle returned to the client, which completes the charge
/// directly with the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardIntent {
    pub payment: Payment,
    pub intent_id: String,
    pub client_secret: Option<String>,
}

/// Create payment payload
///
/// `amount` stays untyped so non-numeric input can be rejected as an invalid
/// amount rather than a malformed body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCreate {
    #[serde(alias = "orderId")]
    pub order_id: String,
    pub amount: serde_json::Value,
}
