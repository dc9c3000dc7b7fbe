use crate::handlers::common::{created_response, success_response, validate_input};
use crate::{
    errors::ServiceError,
    models::{CartItem, PaymentMethod},
    services::commerce::{
        cart_service::{AddToCartInput, CartStore},
        checkout_service::CheckoutState,
        pricing_service::CheckoutQuote,
        session::ShopperSession,
    },
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

/// Creates the router for cart endpoints
pub fn carts_routes() -> Router<AppState> {
    Router::new()
        .route("/:session_id", get(get_cart).delete(clear_cart))
        .route("/:session_id/items", post(add_item))
        .route(
            "/:session_id/items/:variant_id",
            put(update_item).delete(remove_item),
        )
}

/// Cart as the storefront renders it.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub session_id: String,
    pub items: Vec<CartItem>,
    pub total_quantity: u32,
    pub subtotal: Decimal,
    pub country: String,
    /// Order summary for the session's shipping country; absent for an empty cart
    pub quote: Option<CheckoutQuote>,
    pub payment_method: Option<PaymentMethod>,
    pub checkout: CheckoutState,
}

pub(crate) fn cart_view(
    state: &AppState,
    session_id: &str,
    session: &ShopperSession,
) -> Result<CartView, ServiceError> {
    let quote = if session.cart.is_empty() {
        None
    } else {
        Some(
            state
                .services
                .checkout
                .quote(session.cart.items(), &session.country)?,
        )
    };

    Ok(CartView {
        session_id: session_id.to_string(),
        items: session.cart.items().to_vec(),
        total_quantity: session.cart.total_quantity(),
        subtotal: session.cart.subtotal()?,
        country: session.country.clone(),
        quote,
        payment_method: session.selector.selected(),
        checkout: session.state.clone(),
    })
}

/// Applies a cart change and undoes it when the cart can no longer be quoted
/// for the session's country.
fn change_cart<F>(
    state: &AppState,
    session: &mut ShopperSession,
    change: F,
) -> Result<(), ServiceError>
where
    F: FnOnce(&mut CartStore) -> Result<(), ServiceError>,
{
    let before = session.cart.clone();
    change(&mut session.cart)?;

    if session.cart.is_empty() {
        return Ok(());
    }
    if let Err(e) = state
        .services
        .checkout
        .quote(session.cart.items(), &session.country)
    {
        session.cart = before;
        return Err(e);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateItemRequest {
    #[validate(range(max = 999))]
    pub quantity: u32,
}

/// Get a shopper's cart; unknown ids read as an empty cart
async fn get_cart(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let session = state
        .services
        .sessions
        .get(&session_id)
        .unwrap_or_else(ShopperSession::detached);
    let session = session.lock().await;
    Ok(success_response(cart_view(&state, &session_id, &session)?))
}

/// Add a variant to the cart
async fn add_item(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(payload): Json<AddToCartInput>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let session = state.services.sessions.get_or_create(&session_id);
    let mut session = session.lock().await;
    let variant_id = payload.variant_id.clone();
    change_cart(&state, &mut session, |cart| cart.add_item(payload.into()))?;
    info!(session_id = %session_id, variant_id = %variant_id, "Item added to cart");

    Ok(created_response(cart_view(&state, &session_id, &session)?))
}

/// Change a line's quantity; zero removes it
async fn update_item(
    State(state): State<AppState>,
    Path((session_id, variant_id)): Path<(String, String)>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let session = state.services.sessions.require(&session_id)?;
    let mut session = session.lock().await;
    change_cart(&state, &mut session, |cart| {
        cart.update_quantity(&variant_id, payload.quantity)
    })?;

    Ok(success_response(cart_view(&state, &session_id, &session)?))
}

async fn remove_item(
    State(state): State<AppState>,
    Path((session_id, variant_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ServiceError> {
    let session = state.services.sessions.require(&session_id)?;
    let mut session = session.lock().await;
    session.cart.remove_item(&variant_id)?;

    Ok(success_response(cart_view(&state, &session_id, &session)?))
}

async fn clear_cart(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let session = state
        .services
        .sessions
        .get(&session_id)
        .unwrap_or_else(ShopperSession::detached);
    let mut session = session.lock().await;
    session.cart.clear();
    session.state = CheckoutState::Idle;

    Ok(success_response(cart_view(&state, &session_id, &session)?))
}
