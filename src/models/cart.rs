use crate::{errors::ServiceError, models::money::Money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Catalog product a cart line points at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRef {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// A chosen option value on a variant, e.g. Size = 500ml.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOption {
    pub name: String,
    pub value: String,
}

/// One line in a shopper's cart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product: ProductRef,
    pub variant_id: String,
    pub variant_title: String,
    pub price: Money,
    pub quantity: u32,
    #[serde(default)]
    pub selected_options: Vec<SelectedOption>,
}

impl CartItem {
    /// Unit price × quantity, failing instead of overflowing.
    pub fn line_total(&self) -> Result<Decimal, ServiceError> {
        self.price
            .to_usd()?
            .checked_mul(Decimal::from(self.quantity))
            .ok_or_else(|| ServiceError::InvalidInput(format!("Line {} overflows", self.variant_id)))
    }
}

/// Σ(unit price × quantity) over the lines, exact.
pub fn subtotal(items: &[CartItem]) -> Result<Decimal, ServiceError> {
    items.iter().try_fold(Decimal::ZERO, |acc, item| {
        acc.checked_add(item.line_total()?)
            .ok_or_else(|| ServiceError::InvalidInput("Cart total overflows".to_string()))
    })
}
