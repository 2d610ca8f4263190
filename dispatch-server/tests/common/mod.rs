//! Shared harness for the integration tests: in-memory store, fake
//! payment provider, real JWT resolver.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dispatch_server::AppState;
use dispatch_server::Orchestrator;
use dispatch_server::auth::JwtIdentityResolver;
use dispatch_server::gateway::{
    GatewayError, IntentRequest, PaymentGateway, PaymentIntent, sign_webhook_payload,
    verify_webhook_signature,
};
use dispatch_server::live::Session;
use dispatch_server::store::{RecordStore, RedbStore};
use shared::message::{Notification, ServerEvent};
use shared::models::{OrderCreate, PaymentType, Principal};

pub const JWT_SECRET: &str = "integration-test-jwt-secret-32b!";
pub const WEBHOOK_SECRET: &str = "whsec_integration_test";

/// Payment provider stand-in: numbered intent ids, real signature check
#[derive(Default)]
pub struct FakeGateway {
    next: AtomicUsize,
    fail: AtomicBool,
    pub requests: Mutex<Vec<IntentRequest>>,
}

impl FakeGateway {
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_intent(&self, request: IntentRequest) -> Result<PaymentIntent, GatewayError> {
        self.requests.lock().unwrap().push(request);
        if self.fail.load(Ordering::SeqCst) {
            return Err(GatewayError::Rejected("card_declined".to_string()));
        }
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PaymentIntent {
            id: format!("pi_test_{n}"),
            client_secret: Some(format!("pi_test_{n}_secret")),
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
            WEBHOOK_SECRET,
            chrono::Utc::now().timestamp(),
        )
        .map_err(GatewayError::Signature)
    }
}

pub struct Harness {
    pub state: AppState,
    pub store: Arc<RedbStore>,
    pub gateway: Arc<FakeGateway>,
    pub jwt: JwtIdentityResolver,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(RedbStore::open_in_memory().unwrap());
        let gateway = Arc::new(FakeGateway::default());
        let jwt = JwtIdentityResolver::new(JWT_SECRET);
        let state = AppState::new(
            store.clone() as Arc<dyn RecordStore>,
            gateway.clone() as Arc<dyn PaymentGateway>,
            Arc::new(jwt.clone()),
            "http://localhost:5173".to_string(),
        );
        Self {
            state,
            store,
            gateway,
            jwt,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.state.orchestrator
    }

    pub fn connect(&self, principal: Principal) -> Session {
        self.state.hub().register(principal)
    }

    pub fn token(&self, principal: &Principal) -> String {
        self.jwt.issue_token(principal).unwrap()
    }
}

pub fn order_input(payment_type: PaymentType) -> OrderCreate {
    OrderCreate {
        deal_id: "deal-margherita".to_string(),
        quantity: 2,
        payment_type,
        note: None,
    }
}

/// Signed provider event: `(body, Stripe-Signature header)`
pub fn webhook(event_id: &str, event_type: &str, intent_id: &str) -> (Vec<u8>, String) {
    let body = serde_json::json!({
        "id": event_id,
        "type": event_type,
        "data": { "object": { "id": intent_id, "object": "payment_intent" } }
    })
    .to_string()
    .into_bytes();
    let header = sign_webhook_payload(&body, WEBHOOK_SECRET, chrono::Utc::now().timestamp());
    (body, header)
}

/// Every notification already queued for this session
pub fn drain(session: &mut Session) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Some(event) = session.try_recv() {
        if let ServerEvent::Notification(n) = event {
            out.push(n);
        }
    }
    out
}
