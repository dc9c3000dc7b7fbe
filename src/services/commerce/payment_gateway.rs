use crate::{
    config::AppConfig,
    errors::ServiceError,
    models::{money, CheckoutData, Order, OrderStatus, PaymentMethod},
    repositories::OrderRepository,
};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};
use url::Url;

pub const PAYMENT_FAILED_MESSAGE: &str =
    "Payment failed. Please try again or use a different payment method.";

/// One-way navigation to another location. There is no reply.
pub trait Navigator: Send + Sync {
    fn navigate(&self, location: &str);
}

/// Navigator that remembers where it was sent.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<String> {
        self.visited
            .lock()
            .map(|visited| visited.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn last(&self) -> Option<String> {
        self.history().pop()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, location: &str) {
        let mut visited = self
            .visited
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        visited.push(location.to_string());
    }
}

/// Device wallet authorisation (Apple Pay / Google Pay through the bank).
#[async_trait]
pub trait WalletProcessor: Send + Sync {
    async fn authorize(&self, checkout: &CheckoutData) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedOutcome {
    Approve,
    Decline,
}

/// Stand-in for the bank's wallet endpoint: waits, then approves or declines.
#[derive(Debug, Clone)]
pub struct SimulatedWalletProcessor {
    endpoint: Url,
    delay: Duration,
    outcome: SimulatedOutcome,
}

impl SimulatedWalletProcessor {
    pub fn new(endpoint: Url, delay: Duration, outcome: SimulatedOutcome) -> Self {
        Self {
            endpoint,
            delay,
            outcome,
        }
    }
}

#[async_trait]
impl WalletProcessor for SimulatedWalletProcessor {
    async fn authorize(&self, checkout: &CheckoutData) -> Result<(), ServiceError> {
        info!(
            endpoint = %self.endpoint,
            order_id = %checkout.order_id,
            total_amd = checkout.total_amd,
            "Authorising wallet payment"
        );
        tokio::time::sleep(self.delay).await;

        match self.outcome {
            SimulatedOutcome::Approve => Ok(()),
            SimulatedOutcome::Decline => {
                Err(ServiceError::PaymentFailed(PAYMENT_FAILED_MESSAGE.to_string()))
            }
        }
    }
}

/// Result of a successfully initiated payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoutingOutcome {
    /// Shopper sent to an external gateway; the order stays pending.
    Redirected { order_id: String, location: String },
    /// Wallet payment authorised and stored; shopper sent to the confirmation page.
    Completed { order_id: String, location: String },
}

impl RoutingOutcome {
    pub fn order_id(&self) -> &str {
        match self {
            Self::Redirected { order_id, .. } | Self::Completed { order_id, .. } => order_id,
        }
    }

    pub fn location(&self) -> &str {
        match self {
            Self::Redirected { location, .. } | Self::Completed { location, .. } => location,
        }
    }
}

/// Dispatches prepared checkouts to the three payment rails.
#[derive(Clone)]
pub struct PaymentRouter {
    idram_url: Url,
    payoneer_url: Url,
    public_origin: Url,
    wallet: Arc<dyn WalletProcessor>,
    orders: OrderRepository,
}

fn parse_url(name: &str, raw: &str) -> Result<Url, ServiceError> {
    Url::parse(raw).map_err(|e| ServiceError::InternalError(format!("Invalid {} '{}': {}", name, raw, e)))
}

impl PaymentRouter {
    pub fn new(
        idram_url: Url,
        payoneer_url: Url,
        public_origin: Url,
        wallet: Arc<dyn WalletProcessor>,
        orders: OrderRepository,
    ) -> Self {
        Self {
            idram_url,
            payoneer_url,
            public_origin,
            wallet,
            orders,
        }
    }

    /// Builds the router and a simulated wallet from configuration.
    pub fn from_config(config: &AppConfig, orders: OrderRepository) -> Result<Self, ServiceError> {
        let outcome = if config.wallet_simulates_failure() {
            SimulatedOutcome::Decline
        } else {
            SimulatedOutcome::Approve
        };
        let wallet = SimulatedWalletProcessor::new(
            parse_url("wallet_endpoint", &config.payments.wallet_endpoint)?,
            config.wallet_delay(),
            outcome,
        );

        Ok(Self::new(
            parse_url("idram_checkout_url", &config.payments.idram_checkout_url)?,
            parse_url("payoneer_checkout_url", &config.payments.payoneer_checkout_url)?,
            parse_url("public_origin", &config.public_origin)?,
            Arc::new(wallet),
            orders,
        ))
    }

    pub fn orders(&self) -> &OrderRepository {
        &self.orders
    }

    /// Absolute URL of the confirmation page for an order.
    pub fn confirmation_url(&self, order_id: &str) -> Result<Url, ServiceError> {
        self.public_origin
            .join(&format!("/order-confirmation/{}", order_id))
            .map_err(|e| ServiceError::InternalError(format!("Invalid confirmation URL: {}", e)))
    }

    /// Gateway URL for the redirect rails, carrying the amount in the rail's
    /// settlement currency.
    pub fn build_redirect_url(&self, checkout: &CheckoutData) -> Result<Url, ServiceError> {
        let (mut url, amount) = match checkout.payment_method {
            PaymentMethod::RegionalWallet => {
                (self.idram_url.clone(), checkout.total_amd.to_string())
            }
            PaymentMethod::InternationalCard => {
                (self.payoneer_url.clone(), money::format_usd(checkout.total_usd))
            }
            PaymentMethod::DeviceWallet => {
                return Err(ServiceError::InvalidOperation(
                    "Device wallet payments are not redirected".to_string(),
                ))
            }
        };
        let return_url = self.confirmation_url(&checkout.order_id)?;

        url.query_pairs_mut()
            .append_pair("order_id", &checkout.order_id)
            .append_pair("amount", &amount)
            .append_pair("currency", checkout.payment_method.settlement_currency())
            .append_pair("customer_email", &checkout.customer.email)
            .append_pair("customer_name", &checkout.customer.name)
            .append_pair("return_url", return_url.as_str());

        Ok(url)
    }

    /// Routes a checkout to its rail.
    ///
    /// Redirect rails store a pending order and navigate straight away. The
    /// wallet rail waits for authorisation, stores the completed order, then
    /// navigates to the confirmation page. A declined wallet payment is
    /// returned as an error and nothing is stored.
    #[instrument(skip(self, checkout, navigator), fields(order_id = %checkout.order_id, payment_method = %checkout.payment_method))]
    pub async fn route(
        &self,
        checkout: CheckoutData,
        navigator: &dyn Navigator,
    ) -> Result<RoutingOutcome, ServiceError> {
        match checkout.payment_method {
            PaymentMethod::RegionalWallet | PaymentMethod::InternationalCard => {
                let url = self.build_redirect_url(&checkout)?;
                let order_id = checkout.order_id.clone();

                self.orders
                    .save(&Order::new(checkout, OrderStatus::Pending))
                    .await;

                info!(location = %url, "Redirecting to payment gateway");
                navigator.navigate(url.as_str());

                Ok(RoutingOutcome::Redirected {
                    order_id,
                    location: url.into(),
                })
            }
            PaymentMethod::DeviceWallet => {
                let location = self.confirmation_url(&checkout.order_id)?;
                let order = self
                    .start_wallet_payment(checkout)
                    .await
                    .map_err(|e| ServiceError::InternalError(format!("Wallet task failed: {}", e)))??;

                navigator.navigate(location.as_str());

                Ok(RoutingOutcome::Completed {
                    order_id: order.checkout.order_id,
                    location: location.into(),
                })
            }
        }
    }

    /// Runs wallet authorisation and persistence on its own task.
    ///
    /// The task finishes even if the caller stops waiting, so an authorised
    /// payment is always stored; only the caller's follow-up is skipped.
    pub fn start_wallet_payment(&self, checkout: CheckoutData) -> JoinHandle<Result<Order, ServiceError>> {
        let wallet = Arc::clone(&self.wallet);
        let orders = self.orders.clone();

        tokio::spawn(async move {
            wallet.authorize(&checkout).await?;
            let order = Order::new(checkout, OrderStatus::Completed);
            orders.save(&order).await;
            Ok(order)
        })
    }

    /// Records the gateway's verdict for an order by appending a new record.
    #[instrument(skip(self))]
    pub async fn confirm_payment(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> Result<Order, ServiceError> {
        if status == OrderStatus::Pending {
            return Err(ServiceError::BadRequest(
                "Payment confirmation must be completed or failed".to_string(),
            ));
        }

        let current = self
            .orders
            .find_by_id(order_id)
            .await
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if current.status == status {
            return Ok(current);
        }
        if current.status != OrderStatus::Pending {
            warn!(current = %current.status, requested = %status, "Ignoring conflicting payment confirmation");
            return Err(ServiceError::Conflict(format!(
                "Order {} is already {}",
                order_id, current.status
            )));
        }

        let updated = current.with_status(status);
        self.orders.save(&updated).await;
        info!(status = %status, "Payment confirmation recorded");
        Ok(updated)
    }
}
