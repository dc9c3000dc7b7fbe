use crate::handlers::common::success_response;
use crate::{models::Order, services::commerce::payment_selector::payment_info, AppState};
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use tracing::info;

/// Confirmation page route
pub fn order_confirmation_routes() -> Router<AppState> {
    Router::new().route("/order-confirmation/:order_id", get(order_confirmation))
}

#[derive(Debug, Serialize)]
pub struct OrderConfirmation {
    pub order: Order,
    pub payment_method_name: &'static str,
    pub payment_summary: String,
    pub carrier: String,
    pub estimated_delivery: String,
}

/// Looks the order up by id; unknown ids send the shopper back to the shop.
async fn order_confirmation(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Response {
    let Some(order) = state.services.orders.find_by_id(&order_id).await else {
        info!(order_id = %order_id, "Order not found, redirecting to shop");
        return Redirect::to(&state.config.shop_path).into_response();
    };

    let pricing = state.services.checkout.pricing();
    let method = order.checkout.payment_method;
    let shipping = pricing.shipping_quote(&order.checkout.shipping.country);

    success_response(OrderConfirmation {
        payment_method_name: method.display_name(),
        payment_summary: payment_info(method, order.checkout.total_usd, order.checkout.total_amd),
        carrier: shipping.carrier,
        estimated_delivery: shipping.estimated_delivery,
        order,
    })
}
