/// Commerce API handlers
pub mod carts;
pub mod checkout;
pub mod orders;
pub mod payments;

pub use carts::carts_routes;
pub use checkout::{checkout_routes, shipping_routes};
pub use orders::order_confirmation_routes;
pub use payments::{payment_method_routes, payments_routes};
