use crate::{
    errors::ServiceError,
    models::{
        CartItem, CheckoutData, CheckoutForm, CheckoutItem, CustomerDetails, PaymentMethod,
        ShippingAddress,
    },
    services::commerce::{
        payment_gateway::{Navigator, PaymentRouter, RoutingOutcome},
        pricing_service::{CheckoutQuote, PricingService},
        session::ShopperSession,
    },
};
use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use tracing::{error, info, instrument};
use validator::Validate;

const BASE36_DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ORDER_ID_SUFFIX_LEN: usize = 7;

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

/// New order id: `ORD-<base36 millis>-<7 random base36 chars>`, upper-cased.
///
/// Uniqueness is best effort. Two ids collide only if they share the same
/// millisecond and the same random suffix; nothing checks for that.
pub fn generate_order_id() -> String {
    let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ORDER_ID_SUFFIX_LEN)
        .map(|_| BASE36_DIGITS[rng.gen_range(0..BASE36_DIGITS.len())] as char)
        .collect();

    format!("ORD-{}-{}", to_base36(millis), suffix).to_uppercase()
}

/// Where a shopper's checkout attempt currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CheckoutState {
    #[default]
    Idle,
    Submitting,
    Redirecting {
        order_id: String,
    },
    SimulatingPayment {
        order_id: String,
    },
    PersistedAndRedirected {
        order_id: String,
        location: String,
    },
    Failed {
        message: String,
    },
}

impl CheckoutState {
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Self::Submitting | Self::Redirecting { .. } | Self::SimulatingPayment { .. }
        )
    }
}

/// Turns a cart and a filled-in form into a routed payment.
#[derive(Clone)]
pub struct CheckoutService {
    pricing: PricingService,
    router: PaymentRouter,
}

impl CheckoutService {
    pub fn new(pricing: PricingService, router: PaymentRouter) -> Self {
        Self { pricing, router }
    }

    pub fn pricing(&self) -> &PricingService {
        &self.pricing
    }

    pub fn router(&self) -> &PaymentRouter {
        &self.router
    }

    /// Order summary for a cart shipped to `country`.
    pub fn quote(&self, items: &[CartItem], country: &str) -> Result<CheckoutQuote, ServiceError> {
        self.pricing.quote(items, country)
    }

    /// Builds the immutable snapshot for one checkout attempt.
    pub fn prepare_checkout_data(
        &self,
        items: &[CartItem],
        customer: CustomerDetails,
        shipping: ShippingAddress,
        payment_method: PaymentMethod,
    ) -> Result<CheckoutData, ServiceError> {
        if items.is_empty() {
            return Err(ServiceError::InvalidOperation("Cart is empty".to_string()));
        }

        let order_id = generate_order_id();
        let quote = self.pricing.quote(items, &shipping.country)?;

        let items = items
            .iter()
            .map(|item| {
                Ok(CheckoutItem {
                    id: item.variant_id.clone(),
                    title: item.product.title.clone(),
                    variant_title: item.variant_title.clone(),
                    quantity: item.quantity,
                    price: item.price.to_usd()?,
                    image: item.product.image_url.clone(),
                })
            })
            .collect::<Result<Vec<_>, ServiceError>>()?;

        Ok(CheckoutData {
            order_id,
            items,
            customer,
            shipping,
            shipping_cost: quote.shipping_cost,
            total_usd: quote.total_usd,
            total_amd: quote.total_amd,
            payment_method,
        })
    }

    /// Submits the shopper's checkout.
    ///
    /// Callers hold the session exclusively for the whole attempt (see
    /// [`SessionRegistry::begin_checkout`](crate::services::commerce::session::SessionRegistry::begin_checkout)).
    /// The form is validated before any order id exists. The cart is cleared
    /// only after routing was initiated; on failure it is left untouched and
    /// the session records the error for the shopper.
    #[instrument(skip(self, session, form, navigator))]
    pub async fn submit(
        &self,
        session: &mut ShopperSession,
        form: CheckoutForm,
        navigator: &dyn Navigator,
    ) -> Result<RoutingOutcome, ServiceError> {
        // Exclusive access to the session is the in-flight guard; a state left
        // over from an abandoned attempt is simply overwritten.
        if session.cart.is_empty() {
            return Err(ServiceError::InvalidOperation("Cart is empty".to_string()));
        }
        form.validate()?;

        let method = session.selector.selected().ok_or_else(|| {
            ServiceError::ValidationError("Please select a payment method".to_string())
        })?;
        if session.selector.is_disabled(method) {
            return Err(ServiceError::ValidationError(format!(
                "{} is not available on this device",
                method.display_name()
            )));
        }

        session.state = CheckoutState::Submitting;

        let checkout = match self.prepare_checkout_data(
            session.cart.items(),
            form.customer,
            form.shipping,
            method,
        ) {
            Ok(checkout) => checkout,
            Err(e) => {
                session.state = CheckoutState::Failed {
                    message: e.response_message(),
                };
                return Err(e);
            }
        };

        info!(
            order_id = %checkout.order_id,
            payment_method = %method,
            total_usd = %checkout.total_usd,
            total_amd = checkout.total_amd,
            "Checkout prepared"
        );

        let order_id = checkout.order_id.clone();
        session.state = match method {
            PaymentMethod::DeviceWallet => CheckoutState::SimulatingPayment { order_id },
            _ => CheckoutState::Redirecting { order_id },
        };

        match self.router.route(checkout, navigator).await {
            Ok(outcome) => {
                session.state = CheckoutState::PersistedAndRedirected {
                    order_id: outcome.order_id().to_string(),
                    location: outcome.location().to_string(),
                };
                session.cart.clear();
                Ok(outcome)
            }
            Err(e) => {
                error!(error = %e, "Payment routing failed");
                session.state = CheckoutState::Failed {
                    message: e.response_message(),
                };
                Err(e)
            }
        }
    }
}
