//! Order state machine
//!
//! Loads an order, checks the requested change against the transition table,
//! and writes it back with compare-and-set on the version that was read. A
//! concurrent writer that got there first turns the write into
//! `ConcurrentModification`; the caller re-reads and retries.

use std::sync::Arc;

use shared::models::{Order, OrderCreate, OrderStatus, Principal, Role};
use shared::util::{new_id, now_millis};

use super::transitions::check_transition;
use crate::error::{DispatchError, DispatchResult};
use crate::store::{OrderFilter, RecordStore};

/// Whether `principal` may read `order`
///
/// Delivery agents also see unassigned orders waiting for pickup.
pub fn can_view(order: &Order, principal: &Principal) -> bool {
    match principal.role {
        Role::Kitchen | Role::Admin => true,
        Role::Customer => order.customer_id == principal.id,
        Role::Delivery => match order.delivery_agent_id.as_deref() {
            Some(agent) => agent == principal.id,
            None => order.status == OrderStatus::ReadyForDispatch,
        },
    }
}

#[derive(Clone)]
pub struct OrderStateMachine {
    store: Arc<dyn RecordStore>,
}

impl OrderStateMachine {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    async fn load(&self, order_id: &str) -> DispatchResult<Order> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or_else(|| DispatchError::order_not_found(order_id))
    }

    async fn write(&self, next: &Order, expected_version: u64) -> DispatchResult<Order> {
        match self.store.update_order(next, expected_version).await {
            Ok(stored) => Ok(stored),
            Err(e) => {
                let err = DispatchError::from(e);
                if err.is_retryable() {
                    tracing::debug!(order_id = %next.id, expected_version, "Order write lost compare-and-set race");
                }
                Err(err)
            }
        }
    }

    /// Place a new order for the acting customer
    pub async fn place(&self, actor: &Principal, input: OrderCreate) -> DispatchResult<Order> {
        if actor.role != Role::Customer {
            return Err(DispatchError::Unauthorized(format!(
                "{} cannot place orders",
                actor.role
            )));
        }
        if input.quantity < 1 {
            return Err(DispatchError::InvalidQuantity(input.quantity));
        }
        if input.deal_id.trim().is_empty() {
            return Err(DispatchError::Validation("deal_id is required".to_string()));
        }

        let now = now_millis();
        let order = Order {
            id: new_id(),
            customer_id: actor.id.clone(),
            deal_id: input.deal_id,
            quantity: input.quantity,
            payment_type: input.payment_type,
            status: OrderStatus::Placed,
            delivery_agent_id: None,
            note: input.note.filter(|n| !n.trim().is_empty()),
            version: 0,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_order(&order).await?;

        tracing::info!(
            order_id = %order.id,
            customer_id = %order.customer_id,
            quantity = order.quantity,
            payment_type = %order.payment_type,
            "Order placed"
        );
        Ok(order)
    }

    /// Move an order to `to` on behalf of `actor`
    pub async fn transition(
        &self,
        order_id: &str,
        to: OrderStatus,
        actor: &Principal,
    ) -> DispatchResult<Order> {
        let current = self.load(order_id).await?;
        if let Err(e) = check_transition(&current, to, actor) {
            tracing::warn!(
                order_id,
                from = %current.status,
                to = %to,
                actor = %actor.id,
                role = %actor.role,
                "Transition rejected"
            );
            return Err(e);
        }

        let mut next = current.clone();
        next.status = to;
        next.updated_at = now_millis();
        // Picking up an unassigned order claims it
        if to == OrderStatus::OutForDelivery && next.delivery_agent_id.is_none() {
            next.delivery_agent_id = Some(actor.id.clone());
        }

        let stored = self.write(&next, current.version).await?;
        tracing::info!(
            order_id,
            from = %current.status,
            to = %stored.status,
            actor = %actor.id,
            "Order status changed"
        );
        Ok(stored)
    }

    /// Attach a delivery agent to an order awaiting dispatch (kitchen only)
    pub async fn assign_delivery_agent(
        &self,
        order_id: &str,
        agent_id: &str,
        actor: &Principal,
    ) -> DispatchResult<Order> {
        if actor.role != Role::Kitchen {
            return Err(DispatchError::Unauthorized(format!(
                "{} cannot assign delivery agents",
                actor.role
            )));
        }
        if agent_id.trim().is_empty() {
            return Err(DispatchError::Validation(
                "delivery_agent_id is required".to_string(),
            ));
        }

        let current = self.load(order_id).await?;
        if let Some(existing) = current.delivery_agent_id.as_deref() {
            return Err(DispatchError::AlreadyAssigned {
                order_id: order_id.to_string(),
                reason: format!("agent {existing} already assigned"),
            });
        }
        if current.status != OrderStatus::ReadyForDispatch {
            return Err(DispatchError::AlreadyAssigned {
                order_id: order_id.to_string(),
                reason: format!("status is {}", current.status),
            });
        }

        let mut next = current.clone();
        next.delivery_agent_id = Some(agent_id.to_string());
        next.updated_at = now_millis();

        let stored = self.write(&next, current.version).await?;
        tracing::info!(order_id, agent_id, "Delivery agent assigned");
        Ok(stored)
    }

    pub async fn get(&self, order_id: &str, actor: &Principal) -> DispatchResult<Order> {
        let order = self.load(order_id).await?;
        if !can_view(&order, actor) {
            // Hide existence from principals who may not see it
            return Err(DispatchError::order_not_found(order_id));
        }
        Ok(order)
    }

    /// Orders visible to `actor`, newest first
    pub async fn list(&self, actor: &Principal) -> DispatchResult<Vec<Order>> {
        let filter = match actor.role {
            Role::Customer => OrderFilter::ByCustomer(actor.id.clone()),
            Role::Delivery => OrderFilter::ByDeliveryAgent(actor.id.clone()),
            Role::Kitchen | Role::Admin => OrderFilter::All,
        };
        Ok(self.store.list_orders(filter).await?)
    }
}
