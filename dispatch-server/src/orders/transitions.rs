//! Order transition table
//!
//! The authorization matrix is plain data: every permitted edge appears once
//! in [`TRANSITIONS`] with the gate an actor must pass. Anything not listed is
//! rejected.

use shared::models::{Order, OrderStatus, Principal, Role};

use crate::error::{DispatchError, DispatchResult};

/// Who may take an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Kitchen,
    /// Kitchen, or the customer who placed the order
    KitchenOrOwner,
    /// A delivery agent; must be the assigned one if an agent is set
    DeliveryAgent,
    /// Only the assigned delivery agent
    AssignedAgent,
}

impl Gate {
    pub fn admits(&self, order: &Order, actor: &Principal) -> bool {
        match self {
            Gate::Kitchen => actor.role == Role::Kitchen,
            Gate::KitchenOrOwner => {
                actor.role == Role::Kitchen
                    || (actor.role == Role::Customer && actor.id == order.customer_id)
            }
            Gate::DeliveryAgent => {
                actor.role == Role::Delivery
                    && order
                        .delivery_agent_id
                        .as_deref()
                        .is_none_or(|agent| agent == actor.id)
            }
            Gate::AssignedAgent => {
                actor.role == Role::Delivery
                    && order.delivery_agent_id.as_deref() == Some(actor.id.as_str())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub gate: Gate,
}

const fn edge(from: OrderStatus, to: OrderStatus, gate: Gate) -> Edge {
    Edge { from, to, gate }
}

pub const TRANSITIONS: &[Edge] = &[
    edge(OrderStatus::Placed, OrderStatus::Accepted, Gate::Kitchen),
    edge(OrderStatus::Placed, OrderStatus::Cancelled, Gate::KitchenOrOwner),
    edge(OrderStatus::Accepted, OrderStatus::InProcess, Gate::Kitchen),
    edge(OrderStatus::Accepted, OrderStatus::Cancelled, Gate::Kitchen),
    edge(OrderStatus::InProcess, OrderStatus::ReadyForDispatch, Gate::Kitchen),
    edge(OrderStatus::InProcess, OrderStatus::Cancelled, Gate::Kitchen),
    edge(
        OrderStatus::ReadyForDispatch,
        OrderStatus::OutForDelivery,
        Gate::DeliveryAgent,
    ),
    edge(
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        Gate::AssignedAgent,
    ),
];

pub fn find_edge(from: OrderStatus, to: OrderStatus) -> Option<&'static Edge> {
    TRANSITIONS.iter().find(|e| e.from == from && e.to == to)
}

/// Check that `actor` may move `order` to `to`
pub fn check_transition(order: &Order, to: OrderStatus, actor: &Principal) -> DispatchResult<()> {
    let admitted = find_edge(order.status, to).is_some_and(|edge| edge.gate.admits(order, actor));
    if admitted {
        Ok(())
    } else {
        Err(DispatchError::InvalidTransition {
            from: order.status,
            to,
            role: actor.role,
        })
    }
}
