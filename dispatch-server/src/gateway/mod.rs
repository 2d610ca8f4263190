//! Payment provider capability
//!
//! The ledger and the webhook reconciler only ever talk to the provider
//! through [`PaymentGateway`], so both run against a fake in tests.

mod stripe;

pub use stripe::{StripeGateway, sign_webhook_payload, verify_webhook_signature};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider rejected request: {0}")]
    Rejected(String),

    #[error("signature: {0}")]
    Signature(&'static str),
}

/// What the ledger asks the provider for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentRequest {
    /// Integer minor units (cents)
    pub amount_minor: i64,
    pub order_id: String,
    pub customer_id: String,
}

/// Provider-side handle for an in-progress card charge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(&self, request: IntentRequest) -> Result<PaymentIntent, GatewayError>;

    /// Check a webhook signature header against the exact bytes received
    fn verify_signature(&self, payload: &[u8], signature_header: &str)
    -> Result<(), GatewayError>;
}
