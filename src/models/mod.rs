pub mod cart;
pub mod checkout;
pub mod money;

pub use cart::{CartItem, ProductRef, SelectedOption};
pub use checkout::{
    CheckoutData, CheckoutForm, CheckoutItem, CustomerDetails, Order, OrderStatus, PaymentMethod,
    ShippingAddress,
};
pub use money::Money;
