//! Payment ledger
//!
//! One active payment per order. Status moves forward only:
//!
//! ```text
//! pending ──→ completed | failed | cancelled | requires_action
//! requires_action ──→ completed | failed | cancelled
//! ```
//!
//! Terminal payments are never rewritten. Writes use compare-and-set on the
//! payment version; a lost race is retried a bounded number of times by
//! re-reading, since the retry re-evaluates the forward-only rule against the
//! winner's state.

use std::sync::Arc;

use shared::models::{
    CardIntent, Order, OrderStatus, Payment, PaymentStatus, PaymentType, Principal, Role,
};
use shared::util::{new_id, now_millis};

use super::money::{parse_amount, to_minor_units};
use crate::error::{DispatchError, DispatchResult};
use crate::gateway::{IntentRequest, PaymentGateway};
use crate::store::RecordStore;

const MAX_CAS_ATTEMPTS: usize = 3;

/// Whether a payment may move from `from` to `to`
pub fn payment_transition_allowed(from: PaymentStatus, to: PaymentStatus) -> bool {
    match from {
        PaymentStatus::Pending => to != PaymentStatus::Pending,
        PaymentStatus::RequiresAction => to.is_terminal(),
        PaymentStatus::Completed | PaymentStatus::Failed | PaymentStatus::Cancelled => false,
    }
}

/// A committed status change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentTransition {
    pub payment: Payment,
    pub previous: PaymentStatus,
}

/// Result of asking the ledger to move a payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusOutcome {
    Changed(PaymentTransition),
    /// Payment already holds the requested status
    Unchanged(Payment),
    /// Not a forward move from the current status
    Ignored(Payment),
}

#[derive(Clone)]
pub struct PaymentLedger {
    store: Arc<dyn RecordStore>,
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentLedger {
    pub fn new(store: Arc<dyn RecordStore>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { store, gateway }
    }

    /// Load the order a customer is paying for and check it accepts `payment_type`
    async fn payable_order(
        &self,
        order_id: &str,
        actor: &Principal,
        payment_type: PaymentType,
    ) -> DispatchResult<Order> {
        if actor.role != Role::Customer {
            return Err(DispatchError::Unauthorized(format!(
                "{} cannot create payments",
                actor.role
            )));
        }
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| DispatchError::order_not_found(order_id))?;
        if order.customer_id != actor.id {
            return Err(DispatchError::Unauthorized(format!(
                "order {order_id} belongs to another customer"
            )));
        }
        if order.status == OrderStatus::Cancelled {
            return Err(DispatchError::Validation(format!(
                "order {order_id} is cancelled"
            )));
        }
        if order.payment_type != payment_type {
            return Err(DispatchError::PaymentTypeMismatch {
                order_id: order_id.to_string(),
                expected: order.payment_type,
                requested: payment_type,
            });
        }
        if let Some(active) = self.store.find_payment_by_order(order_id).await?
            && !matches!(
                active.status,
                PaymentStatus::Failed | PaymentStatus::Cancelled
            )
        {
            return Err(DispatchError::PaymentExists {
                order_id: order_id.to_string(),
            });
        }
        Ok(order)
    }

    fn new_payment(order: &Order, amount: rust_decimal::Decimal, intent_id: Option<String>) -> Payment {
        let now = now_millis();
        Payment {
            id: new_id(),
            order_id: order.id.clone(),
            customer_id: order.customer_id.clone(),
            amount,
            payment_type: order.payment_type,
            status: PaymentStatus::Pending,
            intent_id,
            paid_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Open a card payment: ask the provider for an intent, then record it
    pub async fn create_card_intent(
        &self,
        order_id: &str,
        actor: &Principal,
        amount: &serde_json::Value,
    ) -> DispatchResult<CardIntent> {
        let amount = parse_amount(amount)?;
        let amount_minor = to_minor_units(amount)?;
        let order = self.payable_order(order_id, actor, PaymentType::Card).await?;

        let intent = self
            .gateway
            .create_intent(IntentRequest {
                amount_minor,
                order_id: order.id.clone(),
                customer_id: order.customer_id.clone(),
            })
            .await
            .map_err(|e| DispatchError::Gateway(e.to_string()))?;

        let payment = Self::new_payment(&order, amount, Some(intent.id.clone()));
        self.store.insert_payment(&payment).await?;

        tracing::info!(
            payment_id = %payment.id,
            order_id = %order.id,
            intent_id = %intent.id,
            amount = %payment.amount,
            "Card payment intent recorded"
        );

        Ok(CardIntent {
            payment,
            intent_id: intent.id,
            client_secret: intent.client_secret,
        })
    }

    /// Record a cash-on-delivery payment
    pub async fn create_cash_record(
        &self,
        order_id: &str,
        actor: &Principal,
        amount: &serde_json::Value,
    ) -> DispatchResult<Payment> {
        let amount = parse_amount(amount)?;
        let order = self.payable_order(order_id, actor, PaymentType::Cash).await?;

        let payment = Self::new_payment(&order, amount, None);
        self.store.insert_payment(&payment).await?;

        tracing::info!(
            payment_id = %payment.id,
            order_id = %order.id,
            amount = %payment.amount,
            "Cash payment recorded"
        );
        Ok(payment)
    }

    pub async fn find_by_order(&self, order_id: &str) -> DispatchResult<Payment> {
        self.store
            .find_payment_by_order(order_id)
            .await?
            .ok_or_else(|| DispatchError::payment_not_found(order_id))
    }

    /// The order's payment, if `actor` may see it
    pub async fn payment_for_order(
        &self,
        order_id: &str,
        actor: &Principal,
    ) -> DispatchResult<Payment> {
        let payment = self.find_by_order(order_id).await?;
        let visible = match actor.role {
            Role::Kitchen | Role::Admin => true,
            Role::Customer => payment.customer_id == actor.id,
            Role::Delivery => false,
        };
        if !visible {
            return Err(DispatchError::payment_not_found(order_id));
        }
        Ok(payment)
    }

    /// Delivery agent confirms cash was collected for a delivered order
    pub async fn confirm_cash(
        &self,
        order_id: &str,
        actor: &Principal,
    ) -> DispatchResult<StatusOutcome> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| DispatchError::order_not_found(order_id))?;

        let is_assigned_agent = actor.role == Role::Delivery
            && order.delivery_agent_id.as_deref() == Some(actor.id.as_str());
        if !is_assigned_agent {
            return Err(DispatchError::Unauthorized(
                "only the assigned delivery agent can confirm cash".to_string(),
            ));
        }
        if order.status != OrderStatus::Delivered {
            return Err(DispatchError::Validation(format!(
                "order {order_id} is {}, not Delivered",
                order.status
            )));
        }

        let payment = self.find_by_order(order_id).await?;
        if payment.payment_type != PaymentType::Cash {
            return Err(DispatchError::PaymentTypeMismatch {
                order_id: order_id.to_string(),
                expected: payment.payment_type,
                requested: PaymentType::Cash,
            });
        }

        match self.apply_status(&payment.id, PaymentStatus::Completed).await? {
            StatusOutcome::Ignored(p) => Err(DispatchError::Validation(format!(
                "payment {} is {}",
                p.id, p.status
            ))),
            outcome => Ok(outcome),
        }
    }

    /// Move a payment toward `target`, honoring the forward-only rule
    pub async fn apply_status(
        &self,
        payment_id: &str,
        target: PaymentStatus,
    ) -> DispatchResult<StatusOutcome> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let current = self
                .store
                .get_payment(payment_id)
                .await?
                .ok_or_else(|| DispatchError::payment_not_found(payment_id))?;

            if current.status == target {
                return Ok(StatusOutcome::Unchanged(current));
            }
            if !payment_transition_allowed(current.status, target) {
                tracing::warn!(
                    payment_id,
                    current = %current.status,
                    requested = %target,
                    "Payment status change ignored"
                );
                return Ok(StatusOutcome::Ignored(current));
            }

            let now = now_millis();
            let mut next = current.clone();
            next.status = target;
            next.updated_at = now;
            if target == PaymentStatus::Completed {
                next.paid_at = Some(now);
            }

            match self.store.update_payment(&next, current.version).await {
                Ok(stored) => {
                    tracing::info!(
                        payment_id,
                        order_id = %stored.order_id,
                        from = %current.status,
                        to = %stored.status,
                        "Payment status changed"
                    );
                    return Ok(StatusOutcome::Changed(PaymentTransition {
                        payment: stored,
                        previous: current.status,
                    }));
                }
                Err(e) => {
                    let err = DispatchError::from(e);
                    if err.is_retryable() && attempt < MAX_CAS_ATTEMPTS {
                        tracing::debug!(payment_id, attempt, "Payment write lost race, re-reading");
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [PaymentStatus; 5] = [
        PaymentStatus::Pending,
        PaymentStatus::Completed,
        PaymentStatus::Failed,
        PaymentStatus::Cancelled,
        PaymentStatus::RequiresAction,
    ];

    #[test]
    fn test_terminal_statuses_never_move() {
        for from in ALL.into_iter().filter(PaymentStatus::is_terminal) {
            for to in ALL {
                assert!(!payment_transition_allowed(from, to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_forward_moves() {
        for to in [
            PaymentStatus::Completed,
            PaymentStatus::Failed,
            PaymentStatus::Cancelled,
            PaymentStatus::RequiresAction,
        ] {
            assert!(payment_transition_allowed(PaymentStatus::Pending, to));
        }
        assert!(payment_transition_allowed(
            PaymentStatus::RequiresAction,
            PaymentStatus::Completed
        ));
        assert!(!payment_transition_allowed(
            PaymentStatus::RequiresAction,
            PaymentStatus::Pending
        ));
        assert!(!payment_transition_allowed(
            PaymentStatus::Pending,
            PaymentStatus::Pending
        ));
    }
}
