//! Who hears about a committed change
//!
//! Pure functions of the committed state: no I/O, no hub access.

use shared::message::{AlertLevel, Notification};
use shared::models::{Order, OrderStatus, Payment, PaymentStatus, Role};

use crate::live::Room;

/// One notification bound for one room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub room: Room,
    pub notification: Notification,
}

fn customer_message(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Placed => "Your order has been placed",
        OrderStatus::Accepted => "Your order has been accepted",
        OrderStatus::InProcess => "Your order is being prepared",
        OrderStatus::ReadyForDispatch => "Your order is ready for dispatch",
        OrderStatus::OutForDelivery => "Your order is on the way",
        OrderStatus::Delivered => "Your order has been delivered",
        OrderStatus::Cancelled => "Your order has been cancelled",
    }
}

/// Audience for an order that just reached `order.status`
///
/// The customer always hears; the kitchen hears about new orders and
/// delivery agents about orders waiting for pickup.
pub fn order_audience(order: &Order) -> Vec<Delivery> {
    let base = Notification::order_status(
        order.id.clone(),
        order.status.as_str(),
        customer_message(order.status),
    );

    let mut deliveries = Vec::with_capacity(2);
    match order.status {
        OrderStatus::Placed => deliveries.push(Delivery {
            room: Room::role(Role::Kitchen),
            notification: base.clone().with_message("New order received"),
        }),
        OrderStatus::ReadyForDispatch => deliveries.push(Delivery {
            room: Room::role(Role::Delivery),
            notification: base.clone().with_message("Order ready for delivery"),
        }),
        _ => {}
    }
    deliveries.insert(
        0,
        Delivery {
            room: Room::identity(order.customer_id.clone()),
            notification: base,
        },
    );
    deliveries
}

/// Audience for a payment status change; only completion is announced
pub fn payment_audience(payment: &Payment) -> Vec<Delivery> {
    if payment.status != PaymentStatus::Completed {
        return Vec::new();
    }
    vec![Delivery {
        room: Room::identity(payment.customer_id.clone()),
        notification: Notification::payment_update(
            payment.order_id.clone(),
            payment.id.clone(),
            payment.status.as_str(),
            "Payment completed for your order",
        ),
    }]
}

pub fn system_alert_audience(message: &str, level: AlertLevel) -> Vec<Delivery> {
    vec![Delivery {
        room: Room::role(Role::Admin),
        notification: Notification::system_alert(message, level),
    }]
}
