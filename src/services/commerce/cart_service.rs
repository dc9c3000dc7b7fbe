use crate::{
    errors::ServiceError,
    models::{cart, CartItem, Money, ProductRef, SelectedOption},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::Validate;

/// Input for adding a variant to a cart.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct AddToCartInput {
    #[validate(length(min = 1))]
    pub product_id: String,
    #[validate(length(min = 1))]
    pub product_title: String,
    pub image_url: Option<String>,
    #[validate(length(min = 1))]
    pub variant_id: String,
    #[serde(default)]
    pub variant_title: String,
    pub price: Money,
    #[validate(range(min = 1, max = 999))]
    pub quantity: u32,
    #[serde(default)]
    pub selected_options: Vec<SelectedOption>,
}

impl From<AddToCartInput> for CartItem {
    fn from(input: AddToCartInput) -> Self {
        CartItem {
            product: ProductRef {
                id: input.product_id,
                title: input.product_title,
                image_url: input.image_url,
            },
            variant_id: input.variant_id,
            variant_title: input.variant_title,
            price: input.price,
            quantity: input.quantity,
            selected_options: input.selected_options,
        }
    }
}

/// Line items of one shopper's cart.
///
/// Lines are unique per variant and kept in insertion order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CartStore {
    items: Vec<CartItem>,
}

impl CartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a line, or bumps the quantity when the variant is already in the cart.
    ///
    /// The cart is left unchanged when the line would make its subtotal
    /// unrepresentable.
    pub fn add_item(&mut self, item: CartItem) -> Result<(), ServiceError> {
        if item.quantity == 0 {
            return Err(ServiceError::InvalidInput(
                "Quantity must be at least 1".to_string(),
            ));
        }
        // Reject bad prices at the door rather than at checkout
        item.price.to_usd()?;

        let before = self.items.clone();
        match self
            .items
            .iter_mut()
            .find(|line| line.variant_id == item.variant_id)
        {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(item.quantity);
                debug!(variant_id = %existing.variant_id, quantity = existing.quantity, "Merged cart line");
            }
            None => {
                debug!(variant_id = %item.variant_id, quantity = item.quantity, "Added cart line");
                self.items.push(item);
            }
        }
        self.keep_if_priceable(before)
    }

    /// Sets a line's quantity. Zero removes the line.
    pub fn update_quantity(&mut self, variant_id: &str, quantity: u32) -> Result<(), ServiceError> {
        if quantity == 0 {
            return self.remove_item(variant_id);
        }

        let line = self
            .items
            .iter_mut()
            .find(|line| line.variant_id == variant_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Cart line {} not found", variant_id)))?;
        let previous = line.quantity;
        line.quantity = quantity;

        if let Err(e) = self.subtotal() {
            if let Some(line) = self.items.iter_mut().find(|line| line.variant_id == variant_id) {
                line.quantity = previous;
            }
            return Err(e);
        }
        Ok(())
    }

    pub fn remove_item(&mut self, variant_id: &str) -> Result<(), ServiceError> {
        let before = self.items.len();
        self.items.retain(|line| line.variant_id != variant_id);
        if self.items.len() == before {
            return Err(ServiceError::NotFound(format!(
                "Cart line {} not found",
                variant_id
            )));
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_quantity(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, line| acc.saturating_add(line.quantity))
    }

    pub fn subtotal(&self) -> Result<Decimal, ServiceError> {
        cart::subtotal(&self.items)
    }

    /// Restores `before` when the current lines cannot be totalled.
    fn keep_if_priceable(&mut self, before: Vec<CartItem>) -> Result<(), ServiceError> {
        if let Err(e) = self.subtotal() {
            self.items = before;
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn line(variant: &str, price: &str, quantity: u32) -> CartItem {
        AddToCartInput {
            product_id: "prod-1".into(),
            product_title: "House Vermouth".into(),
            image_url: None,
            variant_id: variant.into(),
            variant_title: "750ml".into(),
            price: Money::usd(price),
            quantity,
            selected_options: vec![SelectedOption {
                name: "Size".into(),
                value: "750ml".into(),
            }],
        }
        .into()
    }

    #[test]
    fn adding_same_variant_merges_quantity() {
        let mut cart = CartStore::new();
        cart.add_item(line("v1", "20.00", 1)).unwrap();
        cart.add_item(line("v1", "20.00", 2)).unwrap();
        cart.add_item(line("v2", "12.50", 1)).unwrap();

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.items()[0].quantity, 3);
        assert_eq!(cart.total_quantity(), 4);
        assert_eq!(cart.subtotal().unwrap(), dec!(72.50));
    }

    #[test]
    fn zero_quantity_update_removes_line() {
        let mut cart = CartStore::new();
        cart.add_item(line("v1", "20.00", 1)).unwrap();
        cart.update_quantity("v1", 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn updating_unknown_line_is_not_found() {
        let mut cart = CartStore::new();
        assert_matches!(cart.update_quantity("nope", 2), Err(ServiceError::NotFound(_)));
        assert_matches!(cart.remove_item("nope"), Err(ServiceError::NotFound(_)));
    }

    #[test]
    fn rejects_zero_quantity_and_bad_price() {
        let mut cart = CartStore::new();
        assert_matches!(
            cart.add_item(line("v1", "20.00", 0)),
            Err(ServiceError::InvalidInput(_))
        );
        assert_matches!(
            cart.add_item(line("v1", "free", 1)),
            Err(ServiceError::InvalidInput(_))
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn overflowing_line_is_rolled_back() {
        let max = Decimal::MAX.to_string();
        let mut cart = CartStore::new();
        cart.add_item(line("v1", &max, 1)).unwrap();

        // Merging a second unit would overflow the line total
        assert_matches!(
            cart.add_item(line("v1", &max, 1)),
            Err(ServiceError::InvalidInput(_))
        );
        assert_eq!(cart.items()[0].quantity, 1);

        assert_matches!(
            cart.add_item(line("v2", "1.00", 1)),
            Err(ServiceError::InvalidInput(_))
        );
        assert_matches!(
            cart.update_quantity("v1", 5),
            Err(ServiceError::InvalidInput(_))
        );
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.subtotal().unwrap(), Decimal::MAX);
    }

    #[test]
    fn clear_empties_cart() {
        let mut cart = CartStore::new();
        cart.add_item(line("v1", "20.00", 1)).unwrap();
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal().unwrap(), Decimal::ZERO);
    }
}
