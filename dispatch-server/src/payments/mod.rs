//! Payments
//!
//! - [`PaymentLedger`] - card intents, cash records, forward-only status moves
//! - [`WebhookReconciler`] - provider events onto the ledger
//! - [`money`] - amount parsing and minor units

mod ledger;
pub mod money;
mod reconciler;

pub use ledger::{PaymentLedger, PaymentTransition, StatusOutcome, payment_transition_allowed};
pub use reconciler::{ReconcileOutcome, WebhookReconciler, map_event_type};
