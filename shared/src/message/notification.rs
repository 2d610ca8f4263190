//! Server → client notification payload

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// What a notification is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    OrderStatusUpdate,
    PaymentUpdate,
    SystemAlert,
}

/// Severity of a system alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    #[default]
    Info,
    Warning,
    Error,
}

/// Payload of the `notification` socket event
///
/// Field names are camelCase on the wire, matching what browser clients read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<AlertLevel>,
    pub message: String,
    /// ISO-8601, UTC
    pub timestamp: String,
}

impl Notification {
    fn now() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn order_status(
        order_id: impl Into<String>,
        status: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: NotificationKind::OrderStatusUpdate,
            order_id: Some(order_id.into()),
            payment_id: None,
            status: Some(status.into()),
            level: None,
            message: message.into(),
            timestamp: Self::now(),
        }
    }

    pub fn payment_update(
        order_id: impl Into<String>,
        payment_id: impl Into<String>,
        status: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: NotificationKind::PaymentUpdate,
            order_id: Some(order_id.into()),
            payment_id: Some(payment_id.into()),
            status: Some(status.into()),
            level: None,
            message: message.into(),
            timestamp: Self::now(),
        }
    }

    pub fn system_alert(message: impl Into<String>, level: AlertLevel) -> Self {
        Self {
            kind: NotificationKind::SystemAlert,
            order_id: None,
            payment_id: None,
            status: None,
            level: Some(level),
            message: message.into(),
            timestamp: Self::now(),
        }
    }

    /// Same notification with a different message (audience-specific wording)
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let n = Notification::order_status("o-1", "Placed", "New order received");
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "order_status_update");
        assert_eq!(json["orderId"], "o-1");
        assert_eq!(json["status"], "Placed");
        assert!(json.get("paymentId").is_none());
        assert!(json.get("level").is_none());
        assert!(
            chrono::DateTime::parse_from_rfc3339(json["timestamp"].as_str().unwrap()).is_ok()
        );
    }

    #[test]
    fn test_payment_update_carries_both_ids() {
        let n = Notification::payment_update("o-1", "p-1", "completed", "Payment completed");
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "payment_update");
        assert_eq!(json["paymentId"], "p-1");
    }
}
