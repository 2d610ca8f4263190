//! Stripe integration via REST API (no SDK dependency)

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::{GatewayError, IntentRequest, PaymentGateway, PaymentIntent};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Reject events signed more than 5 minutes away from now
const SIGNATURE_TOLERANCE_SECS: u64 = 300;

pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    webhook_secret: String,
    currency: String,
}

impl StripeGateway {
    pub fn new(
        secret_key: impl Into<String>,
        webhook_secret: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key: secret_key.into(),
            webhook_secret: webhook_secret.into(),
            currency: currency.into(),
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(&self, request: IntentRequest) -> Result<PaymentIntent, GatewayError> {
        let amount = request.amount_minor.to_string();
        let resp: serde_json::Value = self
            .client
            .post(format!("{STRIPE_API_BASE}/payment_intents"))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[
                ("amount", amount.as_str()),
                ("currency", self.currency.as_str()),
                ("automatic_payment_methods[enabled]", "true"),
                ("metadata[order_id]", request.order_id.as_str()),
                ("metadata[customer_id]", request.customer_id.as_str()),
            ])
            .send()
            .await?
            .json()
            .await?;

        let id = resp["id"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| GatewayError::Rejected(format!("create_intent failed: {resp}")))?;

        tracing::info!(intent_id = %id, order_id = %request.order_id, "Stripe payment intent created");

        Ok(PaymentIntent {
            id,
            client_secret: resp["client_secret"].as_str().map(String::from),
        })
    }

    fn verify_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<(), GatewayError> {
        verify_webhook_signature(
            payload,
            signature_header,
            &self.webhook_secret,
            chrono::Utc::now().timestamp(),
        )
        .map_err(GatewayError::Signature)
    }
}

fn signed_mac(secret: &str, timestamp: &str, payload: &[u8]) -> Result<Hmac<Sha256>, &'static str> {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    // Signed payload is "<timestamp>." followed by the body bytes as received
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Verify Stripe webhook signature (HMAC-SHA256)
///
/// `sig_header` is the `Stripe-Signature` value (`t=<ts>,v1=<hex>[,v1=...]`).
/// Any matching `v1` entry is accepted, so secret rotation keeps working.
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    now: i64,
) -> Result<(), &'static str> {
    let mut timestamp = "";
    let mut signatures = Vec::new();
    for part in sig_header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }

    if timestamp.is_empty() || signatures.is_empty() {
        return Err("Invalid Stripe-Signature header");
    }

    let matched = signatures.iter().any(|sig| {
        let Ok(sig_bytes) = hex::decode(sig) else {
            return false;
        };
        signed_mac(secret, timestamp, payload)
            .map(|mac| mac.verify_slice(&sig_bytes).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        return Err("Webhook signature mismatch");
    }

    let ts: i64 = timestamp.parse().map_err(|_| "Invalid timestamp")?;
    if now.abs_diff(ts) > SIGNATURE_TOLERANCE_SECS {
        return Err("Webhook timestamp too old");
    }

    Ok(())
}

/// Build a `Stripe-Signature` header for a payload, as Stripe would
pub fn sign_webhook_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let ts = timestamp.to_string();
    let signature = signed_mac(secret, &ts, payload)
        .map(|mac| hex::encode(mac.finalize().into_bytes()))
        .unwrap_or_default();
    format!("t={ts},v1={signature}")
}
