//! Order Model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order lifecycle status
///
/// ```text
/// Placed → Accepted → InProcess → ReadyForDispatch → OutForDelivery → Delivered
///   └────────┴───────────┴──→ Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Placed,
    Accepted,
    #[serde(alias = "In Process")]
    InProcess,
    ReadyForDispatch,
    #[serde(alias = "On The Way")]
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "Placed",
            OrderStatus::Accepted => "Accepted",
            OrderStatus::InProcess => "InProcess",
            OrderStatus::ReadyForDispatch => "ReadyForDispatch",
            OrderStatus::OutForDelivery => "OutForDelivery",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// No transition leaves a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the customer settles the order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    #[serde(alias = "COD")]
    Cash,
    #[serde(alias = "Card")]
    Card,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Cash => "cash",
            PaymentType::Card => "card",
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    pub deal_id: String,
    pub quantity: u32,
    pub payment_type: PaymentType,
    pub status: OrderStatus,
    /// Set once, while the order is `ReadyForDispatch`
    pub delivery_agent_id: Option<String>,
    pub note: Option<String>,
    /// Compare-and-set counter, bumped by the store on every write
    pub version: u64,
    /// Milliseconds since epoch
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub deal_id: String,
    pub quantity: u32,
    pub payment_type: PaymentType,
    #[serde(default, alias = "description")]
    pub note: Option<String>,
}

/// Status change payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}

/// Delivery agent assignment payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryAssignment {
    #[serde(alias = "deliveryBoyId")]
    pub delivery_agent_id: String,
}
