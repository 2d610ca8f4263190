//! dispatch-server: order dispatch service
//!
//! Coordinates an order across customer, kitchen and delivery agent:
//! - role-gated order state machine with compare-and-set writes
//! - payment ledger with card intents and cash-on-delivery
//! - idempotent Stripe webhook reconciliation
//! - authenticated, room-scoped live notifications over WebSocket
//!
//! ```text
//! HTTP / WS ──→ Orchestrator ──→ OrderStateMachine / PaymentLedger ──→ RecordStore
//!                    │                                                    (commit)
//!                    └──→ audience ──→ NotificationHub ──→ sockets
//! Stripe ──→ WebhookReconciler ──→ PaymentLedger
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod live;
pub mod logger;
pub mod orchestrator;
pub mod orders;
pub mod payments;
pub mod state;
pub mod store;

pub use config::Config;
pub use error::{DispatchError, DispatchResult};
pub use orchestrator::Orchestrator;
pub use state::AppState;
