use crate::handlers::common::success_response;
use crate::{
    errors::ServiceError,
    models::{OrderStatus, PaymentMethod},
    services::commerce::{
        payment_selector::{payment_info, ClientHints, PaymentOption},
        session::ShopperSession,
    },
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use bytes::Bytes;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{info, warn};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-signature";

/// Payment method routes, nested under a cart session
pub fn payment_method_routes() -> Router<AppState> {
    Router::new()
        .route("/:session_id/payment-methods", get(list_payment_methods))
        .route("/:session_id/payment-method", put(select_payment_method))
}

/// Gateway callback routes
pub fn payments_routes() -> Router<AppState> {
    Router::new().route("/callback", post(payment_callback))
}

#[derive(Debug, Deserialize)]
pub struct PaymentMethodsQuery {
    pub country: Option<String>,
    pub apple_pay: Option<bool>,
    #[serde(default)]
    pub payment_request: bool,
}

#[derive(Debug, Serialize)]
pub struct PaymentMethodsView {
    pub country: String,
    pub wallet_available: bool,
    pub recommended: Option<PaymentMethod>,
    pub selected: Option<PaymentMethod>,
    pub options: Vec<PaymentOption>,
    /// Charge summary for the selected rail; absent for an empty cart
    pub payment_info: Option<String>,
    pub action_label: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
pub struct SelectPaymentMethodRequest {
    pub method: PaymentMethod,
}

#[derive(Debug, Serialize)]
pub struct SelectionResult {
    pub applied: bool,
    pub selected: Option<PaymentMethod>,
}

/// Re-evaluates the recommendation for the shopper's country and device.
/// Unknown ids are answered from a throwaway session.
async fn list_payment_methods(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<PaymentMethodsQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let session = state
        .services
        .sessions
        .get(&session_id)
        .unwrap_or_else(ShopperSession::detached);
    let mut session = session.lock().await;

    if let Some(country) = query.country.filter(|c| !c.trim().is_empty()) {
        session.country = country;
    }
    let hints = ClientHints {
        apple_pay: query.apple_pay,
        payment_request: query.payment_request,
    };

    let country = session.country.clone();
    let pricing = state.services.checkout.pricing();
    session
        .selector
        .on_country_change(&country, &hints, pricing, |method| {
            info!(session_id = %session_id, method = %method, "Payment method auto-selected");
        });

    let selected = session.selector.selected();
    let payment_info = match selected {
        Some(method) if !session.cart.is_empty() => {
            let quote = state
                .services
                .checkout
                .quote(session.cart.items(), &session.country)?;
            Some(payment_info(method, quote.total_usd, quote.total_amd))
        }
        _ => None,
    };

    Ok(success_response(PaymentMethodsView {
        country,
        wallet_available: session.selector.wallet_available(),
        recommended: session.selector.recommended(),
        selected,
        options: session.selector.options(),
        payment_info,
        action_label: selected.map(|method| method.action_label()),
    }))
}

/// Chooses a rail; choosing a disabled rail changes nothing
async fn select_payment_method(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(payload): Json<SelectPaymentMethodRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let session = state.services.sessions.require(&session_id)?;
    let mut session = session.lock().await;

    let applied = session.selector.select(payload.method);
    if !applied {
        info!(session_id = %session_id, method = %payload.method, "Ignored selection of unavailable payment method");
    }

    Ok(success_response(SelectionResult {
        applied,
        selected: session.selector.selected(),
    }))
}

/// Out-of-band verdict from a redirect gateway
#[derive(Debug, Deserialize)]
pub struct PaymentCallback {
    pub order_id: String,
    pub status: OrderStatus,
}

// POST /api/v1/payments/callback
async fn payment_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ServiceError> {
    // Verify signature if configured
    if let Some(secret) = state.config.payments.callback_secret.as_deref() {
        if !verify_signature(&headers, &body, secret) {
            warn!("Payment callback signature verification failed");
            return Err(ServiceError::Unauthorized(
                "invalid callback signature".to_string(),
            ));
        }
    }

    let callback: PaymentCallback = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::BadRequest(format!("invalid json: {}", e)))?;

    let order = state
        .services
        .checkout
        .router()
        .confirm_payment(&callback.order_id, callback.status)
        .await?;

    Ok(success_response(order))
}

/// Hex HMAC-SHA256 of the raw body in `x-signature`.
pub fn sign_payload(secret: &str, payload: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payload);
    Some(hex::encode(mac.finalize().into_bytes()))
}

fn verify_signature(headers: &HeaderMap, payload: &Bytes, secret: &str) -> bool {
    let provided = match headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        Some(sig) => sig.trim().to_ascii_lowercase(),
        None => return false,
    };

    match sign_payload(secret, payload) {
        Some(expected) => constant_time_eq(&expected, &provided),
        None => false,
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}
