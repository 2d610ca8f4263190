//! Orchestrator — 所有状态变更的统一入口
//!
//! 每次调用按顺序执行 persist → derive audience → publish，
//! 写入提交成功后才推送。推送为 best-effort：hub 不会让调用失败，也不重试。

pub mod audience;

use std::sync::Arc;

use shared::message::AlertLevel;
use shared::models::{CardIntent, Order, OrderCreate, OrderStatus, Payment, Principal};

use self::audience::{Delivery, order_audience, payment_audience, system_alert_audience};
use crate::error::DispatchResult;
use crate::gateway::PaymentGateway;
use crate::live::NotificationHub;
use crate::orders::OrderStateMachine;
use crate::payments::{PaymentLedger, ReconcileOutcome, StatusOutcome, WebhookReconciler};
use crate::store::RecordStore;

#[derive(Clone)]
pub struct Orchestrator {
    orders: OrderStateMachine,
    ledger: PaymentLedger,
    reconciler: WebhookReconciler,
    hub: NotificationHub,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn RecordStore>,
        gateway: Arc<dyn PaymentGateway>,
        hub: NotificationHub,
    ) -> Self {
        let ledger = PaymentLedger::new(store.clone(), gateway.clone());
        Self {
            orders: OrderStateMachine::new(store.clone()),
            reconciler: WebhookReconciler::new(store, gateway, ledger.clone()),
            ledger,
            hub,
        }
    }

    pub fn hub(&self) -> &NotificationHub {
        &self.hub
    }

    pub fn orders(&self) -> &OrderStateMachine {
        &self.orders
    }

    pub fn ledger(&self) -> &PaymentLedger {
        &self.ledger
    }

    fn publish(&self, deliveries: Vec<Delivery>) -> usize {
        deliveries
            .iter()
            .map(|d| self.hub.publish_to_room(&d.room.name(), &d.notification))
            .sum()
    }

    fn announce_order(&self, order: &Order) {
        let delivered = self.publish(order_audience(order));
        tracing::debug!(order_id = %order.id, status = %order.status, delivered, "Order notification published");
    }

    fn announce_payment(&self, payment: &Payment) {
        let delivered = self.publish(payment_audience(payment));
        tracing::debug!(payment_id = %payment.id, status = %payment.status, delivered, "Payment notification published");
    }

    // ========== Orders ==========

    pub async fn place_order(&self, actor: &Principal, input: OrderCreate) -> DispatchResult<Order> {
        let order = self.orders.place(actor, input).await?;
        self.announce_order(&order);
        Ok(order)
    }

    pub async fn transition_order(
        &self,
        order_id: &str,
        to: OrderStatus,
        actor: &Principal,
    ) -> DispatchResult<Order> {
        let order = self.orders.transition(order_id, to, actor).await?;
        self.announce_order(&order);
        Ok(order)
    }

    /// Assignment is not a status change and announces nothing
    pub async fn assign_delivery_agent(
        &self,
        order_id: &str,
        agent_id: &str,
        actor: &Principal,
    ) -> DispatchResult<Order> {
        self.orders
            .assign_delivery_agent(order_id, agent_id, actor)
            .await
    }

    pub async fn get_order(&self, order_id: &str, actor: &Principal) -> DispatchResult<Order> {
        self.orders.get(order_id, actor).await
    }

    pub async fn list_orders(&self, actor: &Principal) -> DispatchResult<Vec<Order>> {
        self.orders.list(actor).await
    }

    // ========== Payments ==========

    pub async fn create_card_intent(
        &self,
        order_id: &str,
        actor: &Principal,
        amount: &serde_json::Value,
    ) -> DispatchResult<CardIntent> {
        self.ledger.create_card_intent(order_id, actor, amount).await
    }

    pub async fn create_cash_record(
        &self,
        order_id: &str,
        actor: &Principal,
        amount: &serde_json::Value,
    ) -> DispatchResult<Payment> {
        self.ledger.create_cash_record(order_id, actor, amount).await
    }

    pub async fn payment_for_order(
        &self,
        order_id: &str,
        actor: &Principal,
    ) -> DispatchResult<Payment> {
        self.ledger.payment_for_order(order_id, actor).await
    }

    pub async fn confirm_cash_payment(
        &self,
        order_id: &str,
        actor: &Principal,
    ) -> DispatchResult<Payment> {
        match self.ledger.confirm_cash(order_id, actor).await? {
            StatusOutcome::Changed(transition) => {
                self.announce_payment(&transition.payment);
                Ok(transition.payment)
            }
            StatusOutcome::Unchanged(payment) | StatusOutcome::Ignored(payment) => Ok(payment),
        }
    }

    /// Verify and apply a provider webhook
    ///
    /// `payload` is the request body exactly as received.
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> DispatchResult<ReconcileOutcome> {
        let outcome = self.reconciler.reconcile(payload, signature_header).await?;
        if let Some(transition) = outcome.transition() {
            self.announce_payment(&transition.payment);
        }
        Ok(outcome)
    }

    // ========== Alerts ==========

    /// Alert every connected admin. Returns how many handles accepted it.
    pub fn system_alert(&self, message: &str, level: AlertLevel) -> usize {
        tracing::info!(level = ?level, message, "System alert");
        self.publish(system_alert_audience(message, level))
    }
}
