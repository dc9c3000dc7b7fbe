//! End-to-end checkout scenarios against the service layer.
//!
//! Tests cover:
//! - Totals and shipping for domestic and international carts
//! - Validation failures that must not create or store an order
//! - Redirect URLs for the regional and international rails
//! - Device wallet success and failure

mod common;

use assert_matches::assert_matches;
use common::{form, item, session_with, test_config, CountingStore};
use rust_decimal_macros::dec;
use simona_checkout::{
    errors::ServiceError,
    handlers::AppServices,
    models::{OrderStatus, PaymentMethod},
    repositories::OrderRepository,
    services::commerce::{CheckoutState, RecordingNavigator, RoutingOutcome},
};
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

fn services(config: simona_checkout::config::AppConfig) -> (AppServices, Arc<CountingStore>) {
    let store = Arc::new(CountingStore::default());
    let services =
        AppServices::with_orders(&config, OrderRepository::new(store.clone())).unwrap();
    (services, store)
}

fn query(location: &str) -> HashMap<String, String> {
    Url::parse(location)
        .unwrap()
        .query_pairs()
        .into_owned()
        .collect()
}

// ==================== Totals ====================

#[test]
fn scenario_a_domestic_totals() {
    let (services, _) = services(test_config());
    let data = services
        .checkout
        .prepare_checkout_data(
            &[item("v-negroni", "20.00", 2)],
            common::customer(),
            common::address("Armenia"),
            PaymentMethod::RegionalWallet,
        )
        .unwrap();

    assert_eq!(data.shipping_cost, dec!(5));
    assert_eq!(data.total_usd, dec!(45.00));
    assert_eq!(data.total_amd, 17550);
    assert_eq!(data.items.len(), 1);
    assert_eq!(data.items[0].id, "v-negroni");
    assert_eq!(data.items[0].price, dec!(20.00));
    assert!(data.order_id.starts_with("ORD-"));
}

#[test]
fn scenario_b_international_totals() {
    let (services, _) = services(test_config());
    let data = services
        .checkout
        .prepare_checkout_data(
            &[item("v-vermouth", "50.00", 1)],
            common::customer(),
            common::address("Japan"),
            PaymentMethod::InternationalCard,
        )
        .unwrap();

    assert_eq!(data.shipping_cost, dec!(15));
    assert_eq!(data.total_usd, dec!(65.00));
    assert_eq!(data.total_amd, 25350);
}

#[test]
fn quote_and_snapshot_share_the_configured_rate() {
    let mut config = test_config();
    config.payments.usd_to_amd_rate = dec!(400);
    let (services, _) = services(config);
    let items = [item("v1", "20.00", 2)];

    let quote = services.checkout.quote(&items, "Armenia").unwrap();
    let data = services
        .checkout
        .prepare_checkout_data(
            &items,
            common::customer(),
            common::address("Armenia"),
            PaymentMethod::RegionalWallet,
        )
        .unwrap();

    assert_eq!(quote.total_amd, 18000);
    assert_eq!(data.total_amd, quote.total_amd);
}

#[test]
fn malformed_price_is_a_typed_error() {
    let (services, _) = services(test_config());
    let result = services.checkout.prepare_checkout_data(
        &[item("v1", "twelve fifty", 1)],
        common::customer(),
        common::address("Armenia"),
        PaymentMethod::RegionalWallet,
    );
    assert_matches!(result, Err(ServiceError::InvalidInput(_)));
}

// ==================== Validation ====================

#[tokio::test]
async fn scenario_c_missing_email_creates_nothing() {
    let (services, store) = services(test_config());
    let mut session = session_with(vec![item("v1", "20.00", 1)], "Armenia", false);
    let navigator = RecordingNavigator::new();

    let mut bad = form("Armenia");
    bad.customer.email = String::new();

    let result = services.checkout.submit(&mut session, bad, &navigator).await;

    assert_matches!(result, Err(ServiceError::ValidationError(_)));
    assert_eq!(store.writes(), 0);
    assert!(navigator.history().is_empty());
    assert_eq!(session.state, CheckoutState::Idle);
    assert_eq!(session.cart.items().len(), 1);
}

#[tokio::test]
async fn empty_cart_is_rejected() {
    let (services, store) = services(test_config());
    let mut session = session_with(vec![], "Armenia", false);

    let result = services
        .checkout
        .submit(&mut session, form("Armenia"), &RecordingNavigator::new())
        .await;

    assert_matches!(result, Err(ServiceError::InvalidOperation(_)));
    assert_eq!(store.writes(), 0);
}

// ==================== Redirect rails ====================

#[tokio::test]
async fn scenario_d_regional_redirect_in_amd() {
    let (services, store) = services(test_config());
    let mut session = session_with(vec![item("v1", "20.00", 2)], "Armenia", false);
    assert_eq!(session.selector.selected(), Some(PaymentMethod::RegionalWallet));
    let navigator = RecordingNavigator::new();

    let outcome = services
        .checkout
        .submit(&mut session, form("Armenia"), &navigator)
        .await
        .unwrap();

    let location = navigator.last().unwrap();
    assert_eq!(location, outcome.location());
    let params = query(&location);
    assert!(location.starts_with("https://idram.am/checkout/placeholder"));
    assert_eq!(params["currency"], "AMD");
    assert_eq!(params["amount"], "17550");
    assert_eq!(params["customer_email"], "ani@example.am");
    assert_eq!(params["customer_name"], "Ani Petrosyan");
    assert_eq!(
        params["return_url"],
        format!("https://simona.am/order-confirmation/{}", outcome.order_id())
    );

    // Initiated, so the cart is cleared and the order waits for the gateway
    assert!(session.cart.is_empty());
    assert_matches!(session.state, CheckoutState::PersistedAndRedirected { .. });
    assert_eq!(store.writes(), 1);
    let stored = services.orders.find_by_id(outcome.order_id()).await.unwrap();
    assert_eq!(stored.status, OrderStatus::Pending);
}

#[tokio::test]
async fn scenario_d_international_redirect_in_usd() {
    let (services, _) = services(test_config());
    let mut session = session_with(vec![item("v1", "20.00", 2)], "Germany", false);
    assert_eq!(
        session.selector.selected(),
        Some(PaymentMethod::InternationalCard)
    );
    let navigator = RecordingNavigator::new();

    services
        .checkout
        .submit(&mut session, form("Germany"), &navigator)
        .await
        .unwrap();

    let location = navigator.last().unwrap();
    let params = query(&location);
    assert!(location.starts_with("https://checkout.payoneer.com/placeholder"));
    assert_eq!(params["currency"], "USD");
    assert_eq!(params["amount"], "55.00");
}

#[tokio::test]
async fn gateway_confirmation_completes_pending_order() {
    let (services, store) = services(test_config());
    let mut session = session_with(vec![item("v1", "20.00", 1)], "Armenia", false);

    let outcome = services
        .checkout
        .submit(&mut session, form("Armenia"), &RecordingNavigator::new())
        .await
        .unwrap();

    services
        .checkout
        .router()
        .confirm_payment(outcome.order_id(), OrderStatus::Completed)
        .await
        .unwrap();

    assert_eq!(store.writes(), 2);
    let latest = services.orders.find_by_id(outcome.order_id()).await.unwrap();
    assert_eq!(latest.status, OrderStatus::Completed);
}

// ==================== Device wallet ====================

#[tokio::test]
async fn wallet_success_persists_then_navigates() {
    let (services, _) = services(test_config());
    let mut session = session_with(vec![item("v1", "50.00", 1)], "Japan", true);
    assert_eq!(session.selector.selected(), Some(PaymentMethod::DeviceWallet));
    let navigator = RecordingNavigator::new();

    let outcome = services
        .checkout
        .submit(&mut session, form("Japan"), &navigator)
        .await
        .unwrap();

    assert_matches!(outcome, RoutingOutcome::Completed { .. });
    assert_eq!(
        navigator.history(),
        vec![format!(
            "https://simona.am/order-confirmation/{}",
            outcome.order_id()
        )]
    );
    let stored = services.orders.find_by_id(outcome.order_id()).await.unwrap();
    assert_eq!(stored.status, OrderStatus::Completed);
    assert_eq!(stored.checkout.total_amd, 25350);
    assert!(session.cart.is_empty());
}

#[tokio::test]
async fn wallet_failure_keeps_cart_for_retry() {
    let mut config = test_config();
    config.payments.wallet_simulation = "failure".to_string();
    let (services, store) = services(config);
    let mut session = session_with(vec![item("v1", "50.00", 1)], "Armenia", true);
    let navigator = RecordingNavigator::new();

    let result = services
        .checkout
        .submit(&mut session, form("Armenia"), &navigator)
        .await;

    assert_matches!(result, Err(ServiceError::PaymentFailed(_)));
    assert_matches!(
        &session.state,
        CheckoutState::Failed { message } if message.contains("Payment failed")
    );
    assert_eq!(session.cart.items().len(), 1);
    assert!(navigator.history().is_empty());
    assert_eq!(store.writes(), 0);

    // Switching rails and retrying works on the same cart
    assert!(session.selector.select(PaymentMethod::RegionalWallet));
    services
        .checkout
        .submit(&mut session, form("Armenia"), &navigator)
        .await
        .unwrap();
    assert!(session.cart.is_empty());
}
