/// Commerce services module - checkout, payment routing and pricing rules
pub mod cart_service;
pub mod checkout_service;
pub mod payment_gateway;
pub mod payment_selector;
pub mod pricing_service;
pub mod session;

// Re-export services for convenience
pub use cart_service::{AddToCartInput, CartStore};
pub use checkout_service::{generate_order_id, CheckoutService, CheckoutState};
pub use payment_gateway::{
    Navigator, PaymentRouter, RecordingNavigator, RoutingOutcome, SimulatedOutcome,
    SimulatedWalletProcessor, WalletProcessor,
};
pub use payment_selector::{
    recommend_payment_method, CapabilityProvider, ClientHints, NoWalletSupport,
    PaymentMethodSelector, PaymentOption, ProbedCapability,
};
pub use pricing_service::{CheckoutQuote, PricingService, ShippingQuote};
pub use session::{CheckoutGuard, SessionRegistry, SharedSession, ShopperSession};
