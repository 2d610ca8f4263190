//! Webhook reconciler — 支付事件对账
//!
//! 用收到的原始字节验证签名，把事件类型映射为支付状态后交给 ledger。
//! Stripe 投递是 at-least-once，除签名错误外所有路径都返回确认。
//!
//! 成功应用后记录 event id；重复的 id 返回 [`ReconcileOutcome::Duplicate`]，
//! 不触碰 ledger。换了 id 的重放仍受 ledger 只进不退规则约束，
//! 返回 [`ReconcileOutcome::AlreadyApplied`]。

use std::sync::Arc;

use serde::Deserialize;
use shared::models::{Payment, PaymentStatus};

use super::ledger::{PaymentLedger, PaymentTransition, StatusOutcome};
use crate::error::{DispatchError, DispatchResult};
use crate::gateway::PaymentGateway;
use crate::store::RecordStore;

const EVENT_TYPE_PREFIX: &str = "payment_intent.";

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    id: Option<String>,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: EventData,
}

#[derive(Debug, Default, Deserialize)]
struct EventData {
    #[serde(default)]
    object: serde_json::Value,
}

/// Map a provider event type onto the payment status it reports
///
/// Accepts both `payment_intent.succeeded` and bare `succeeded`.
pub fn map_event_type(event_type: &str) -> Option<PaymentStatus> {
    let kind = event_type
        .strip_prefix(EVENT_TYPE_PREFIX)
        .unwrap_or(event_type);
    match kind {
        "succeeded" => Some(PaymentStatus::Completed),
        "payment_failed" => Some(PaymentStatus::Failed),
        "canceled" => Some(PaymentStatus::Cancelled),
        "requires_action" => Some(PaymentStatus::RequiresAction),
        _ => None,
    }
}

/// What a verified event did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied(PaymentTransition),
    /// Payment already held the reported status
    AlreadyApplied(Payment),
    /// Event id seen before
    Duplicate { event_id: String },
    /// Not a forward move for the payment, or no payment for the intent
    Ignored { reason: String },
    /// Event type or payload shape this service does not act on
    Unrecognized { event_type: String },
}

impl ReconcileOutcome {
    /// The committed transition, if this event produced one
    pub fn transition(&self) -> Option<&PaymentTransition> {
        match self {
            ReconcileOutcome::Applied(t) => Some(t),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct WebhookReconciler {
    store: Arc<dyn RecordStore>,
    gateway: Arc<dyn PaymentGateway>,
    ledger: PaymentLedger,
}

impl WebhookReconciler {
    pub fn new(
        store: Arc<dyn RecordStore>,
        gateway: Arc<dyn PaymentGateway>,
        ledger: PaymentLedger,
    ) -> Self {
        Self {
            store,
            gateway,
            ledger,
        }
    }

    /// Verify and apply one provider event
    ///
    /// `payload` must be the request body exactly as received.
    pub async fn reconcile(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> DispatchResult<ReconcileOutcome> {
        if let Err(e) = self.gateway.verify_signature(payload, signature_header) {
            tracing::warn!(error = %e, "Webhook signature verification failed");
            return Err(DispatchError::WebhookVerificationFailure(e.to_string()));
        }

        let event: WebhookEvent = match serde_json::from_slice(payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "Verified webhook with unreadable payload");
                return Ok(ReconcileOutcome::Unrecognized {
                    event_type: "<unparseable>".to_string(),
                });
            }
        };

        if let Some(event_id) = event.id.as_deref()
            && self.store.is_event_processed(event_id).await?
        {
            tracing::debug!(event_id, "Webhook event already processed");
            return Ok(ReconcileOutcome::Duplicate {
                event_id: event_id.to_string(),
            });
        }

        let outcome = self.apply(&event).await?;

        if let Some(event_id) = event.id.as_deref()
            && !matches!(outcome, ReconcileOutcome::Ignored { .. })
        {
            self.store.mark_event_processed(event_id).await?;
        }
        Ok(outcome)
    }

    async fn apply(&self, event: &WebhookEvent) -> DispatchResult<ReconcileOutcome> {
        let Some(target) = map_event_type(&event.event_type) else {
            tracing::info!(event_type = %event.event_type, "Unhandled webhook event type");
            return Ok(ReconcileOutcome::Unrecognized {
                event_type: event.event_type.clone(),
            });
        };

        let Some(intent_id) = event.data.object["id"].as_str() else {
            tracing::warn!(event_type = %event.event_type, "Webhook event without intent id");
            return Ok(ReconcileOutcome::Unrecognized {
                event_type: event.event_type.clone(),
            });
        };

        let Some(payment) = self.store.find_payment_by_intent(intent_id).await? else {
            tracing::warn!(intent_id, event_type = %event.event_type, "Webhook for unknown payment intent");
            return Ok(ReconcileOutcome::Ignored {
                reason: format!("no payment for intent {intent_id}"),
            });
        };

        let outcome = match self.ledger.apply_status(&payment.id, target).await? {
            StatusOutcome::Changed(transition) => ReconcileOutcome::Applied(transition),
            StatusOutcome::Unchanged(payment) => {
                tracing::debug!(payment_id = %payment.id, status = %payment.status, "Webhook repeats current status");
                ReconcileOutcome::AlreadyApplied(payment)
            }
            StatusOutcome::Ignored(payment) => ReconcileOutcome::Ignored {
                reason: format!("payment {} is {}, not moving to {target}", payment.id, payment.status),
            },
        };
        Ok(outcome)
    }
}
