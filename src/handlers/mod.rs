pub mod commerce;
pub mod common;
pub mod health;

use crate::{
    config::AppConfig,
    errors::ServiceError,
    repositories::{FileOrderStore, OrderRepository},
    services::commerce::{CheckoutService, PaymentRouter, PricingService, SessionRegistry},
};
use std::sync::Arc;
use tracing::info;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub checkout: Arc<CheckoutService>,
    pub sessions: Arc<SessionRegistry>,
    pub orders: OrderRepository,
}

impl AppServices {
    /// Builds services with the order backend selected in configuration.
    pub fn new(config: &AppConfig) -> Result<Self, ServiceError> {
        let orders = if config.uses_file_storage() {
            let store = FileOrderStore::new(&config.storage.path);
            info!(path = %store.path().display(), "Using file-backed order storage");
            OrderRepository::new(Arc::new(store))
        } else {
            info!("Using in-memory order storage");
            OrderRepository::in_memory()
        };
        Self::with_orders(config, orders)
    }

    /// Builds services around an existing order repository.
    pub fn with_orders(config: &AppConfig, orders: OrderRepository) -> Result<Self, ServiceError> {
        let pricing = PricingService::new(config.shipping.clone(), config.payments.usd_to_amd_rate);
        let router = PaymentRouter::from_config(config, orders.clone())?;

        Ok(Self {
            checkout: Arc::new(CheckoutService::new(pricing, router)),
            sessions: Arc::new(SessionRegistry::new()),
            orders,
        })
    }
}
