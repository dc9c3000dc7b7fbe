use crate::handlers::common::success_response;
use crate::{
    errors::ServiceError,
    models::{
        checkout::{DEFAULT_COUNTRY, SUPPORTED_COUNTRIES},
        CheckoutForm,
    },
    services::commerce::{
        checkout_service::CheckoutState,
        payment_gateway::{RecordingNavigator, RoutingOutcome},
    },
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Checkout submission, nested under a cart session
pub fn checkout_routes() -> Router<AppState> {
    Router::new().route("/:session_id/checkout", post(submit_checkout))
}

/// Shipping lookups
pub fn shipping_routes() -> Router<AppState> {
    Router::new()
        .route("/quote", get(shipping_quote))
        .route("/countries", get(list_countries))
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    #[serde(flatten)]
    pub outcome: RoutingOutcome,
    /// Where the client must send the shopper next
    pub navigate_to: Option<String>,
    pub checkout: CheckoutState,
}

#[derive(Debug, Deserialize)]
pub struct ShippingQuoteQuery {
    pub country: String,
}

#[derive(Debug, Serialize)]
pub struct CountriesView {
    pub countries: &'static [&'static str],
    pub default: &'static str,
}

/// Validate, prepare, route. A second submit for the same session while one
/// is running is rejected with 409.
async fn submit_checkout(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(form): Json<CheckoutForm>,
) -> Result<impl IntoResponse, ServiceError> {
    let mut session = state.services.sessions.begin_checkout(&session_id).await?;

    let navigator = RecordingNavigator::new();
    let outcome = state
        .services
        .checkout
        .submit(&mut session, form, &navigator)
        .await?;

    info!(session_id = %session_id, order_id = %outcome.order_id(), "Checkout routed");

    Ok(success_response(CheckoutResponse {
        navigate_to: navigator.last(),
        checkout: session.state.clone(),
        outcome,
    }))
}

async fn shipping_quote(
    State(state): State<AppState>,
    Query(query): Query<ShippingQuoteQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    if query.country.trim().is_empty() {
        return Err(ServiceError::BadRequest("country is required".to_string()));
    }
    Ok(success_response(
        state.services.checkout.pricing().shipping_quote(&query.country),
    ))
}

async fn list_countries() -> impl IntoResponse {
    success_response(CountriesView {
        countries: SUPPORTED_COUNTRIES,
        default: DEFAULT_COUNTRY,
    })
}
