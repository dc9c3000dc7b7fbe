//! Shared fixtures for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use serde_json::Value;
use simona_checkout::{
    build_router,
    config::AppConfig,
    errors::ServiceError,
    handlers::AppServices,
    models::{
        CartItem, CheckoutForm, CustomerDetails, Money, Order, ProductRef, SelectedOption,
        ShippingAddress,
    },
    repositories::{InMemoryOrderStore, OrderRepository, OrderStore},
    services::commerce::{
        ClientHints, NoWalletSupport, PaymentMethodSelector, PricingService, ShopperSession,
    },
    AppState,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

pub const ORIGIN: &str = "https://simona.am";

/// Development config with a fast wallet simulation.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.public_origin = ORIGIN.to_string();
    config.payments.wallet_delay_ms = 5;
    config
}

pub fn item(variant_id: &str, price: &str, quantity: u32) -> CartItem {
    CartItem {
        product: ProductRef {
            id: format!("prod-{}", variant_id),
            title: "Simona Signature Bitters".to_string(),
            image_url: Some("https://cdn.simona.am/bitters.jpg".to_string()),
        },
        variant_id: variant_id.to_string(),
        variant_title: "200ml".to_string(),
        price: Money::usd(price),
        quantity,
        selected_options: vec![SelectedOption {
            name: "Size".to_string(),
            value: "200ml".to_string(),
        }],
    }
}

pub fn customer() -> CustomerDetails {
    CustomerDetails {
        name: "Ani Petrosyan".to_string(),
        email: "ani@example.am".to_string(),
        phone: "+37491000000".to_string(),
    }
}

pub fn address(country: &str) -> ShippingAddress {
    ShippingAddress {
        country: country.to_string(),
        city: "Yerevan".to_string(),
        postal_code: "0010".to_string(),
        street_address: "1 Abovyan Street".to_string(),
    }
}

pub fn form(country: &str) -> CheckoutForm {
    CheckoutForm {
        customer: customer(),
        shipping: address(country),
    }
}

/// Session holding `items`, with the recommendation for `country` applied.
pub fn session_with(items: Vec<CartItem>, country: &str, wallet: bool) -> ShopperSession {
    let mut session = ShopperSession::new();
    for line in items {
        session.cart.add_item(line).unwrap();
    }
    session.country = country.to_string();
    session.selector = PaymentMethodSelector::new();

    let pricing = PricingService::default();
    if wallet {
        let hints = ClientHints {
            apple_pay: Some(true),
            payment_request: false,
        };
        session.selector.on_country_change(country, &hints, &pricing, |_| {});
    } else {
        session
            .selector
            .on_country_change(country, &NoWalletSupport, &pricing, |_| {});
    }
    session
}

/// Order store that counts writes.
#[derive(Default)]
pub struct CountingStore {
    inner: InMemoryOrderStore,
    writes: AtomicUsize,
}

impl CountingStore {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderStore for CountingStore {
    async fn append(&self, order: &Order) -> Result<(), ServiceError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.append(order).await
    }

    async fn load_all(&self) -> Result<Vec<Order>, ServiceError> {
        self.inner.load_all().await
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<CountingStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let store = Arc::new(CountingStore::default());
        let orders = OrderRepository::new(store.clone());
        let services = AppServices::with_orders(&config, orders).unwrap();
        let state = AppState { config, services };

        Self {
            router: build_router(state.clone()),
            state,
            store,
        }
    }

    /// Send a request against the router.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request_with_headers(method, uri, body.map(|json| serde_json::to_vec(&json).unwrap()), &[])
            .await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        raw_body: Option<Vec<u8>>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(bytes) = raw_body {
            builder = builder.header("content-type", "application/json");
            Body::from(bytes)
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
