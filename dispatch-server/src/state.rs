//! Application state

use std::sync::Arc;

use crate::auth::{IdentityResolver, JwtIdentityResolver};
use crate::config::Config;
use crate::gateway::{PaymentGateway, StripeGateway};
use crate::live::NotificationHub;
use crate::orchestrator::Orchestrator;
use crate::store::{RecordStore, RedbStore};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub identity: Arc<dyn IdentityResolver>,
    pub frontend_url: String,
}

impl AppState {
    /// Wire the production collaborators from configuration
    pub fn from_config(config: &Config) -> Result<Self, BoxError> {
        if let Some(parent) = std::path::Path::new(&config.database_path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let store: Arc<dyn RecordStore> = Arc::new(RedbStore::open(&config.database_path)?);
        let gateway: Arc<dyn PaymentGateway> = Arc::new(StripeGateway::new(
            config.stripe_secret_key.clone(),
            config.stripe_webhook_secret.clone(),
            config.payment_currency.clone(),
        ));
        let identity: Arc<dyn IdentityResolver> =
            Arc::new(JwtIdentityResolver::new(&config.jwt_secret));

        Ok(Self::new(store, gateway, identity, config.frontend_url.clone()))
    }

    /// Wire arbitrary collaborators (tests use an in-memory store and a fake gateway)
    pub fn new(
        store: Arc<dyn RecordStore>,
        gateway: Arc<dyn PaymentGateway>,
        identity: Arc<dyn IdentityResolver>,
        frontend_url: String,
    ) -> Self {
        let hub = NotificationHub::new(identity.clone());
        Self {
            orchestrator: Orchestrator::new(store, gateway, hub),
            identity,
            frontend_url,
        }
    }

    pub fn hub(&self) -> &NotificationHub {
        self.orchestrator.hub()
    }
}
