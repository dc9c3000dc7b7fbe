use crate::{
    config::ShippingConfig,
    errors::ServiceError,
    models::{cart, money, CartItem},
};
use rust_decimal::Decimal;
use serde::Serialize;

/// Shipping and currency rules.
///
/// Every USD→AMD conversion in the service goes through this type, so the
/// checkout snapshot and the order summary can never disagree on the rate.
#[derive(Debug, Clone)]
pub struct PricingService {
    shipping: ShippingConfig,
    usd_to_amd_rate: Decimal,
}

/// Carrier and delivery window for a destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShippingQuote {
    pub country: String,
    pub carrier: String,
    pub cost_usd: Decimal,
    pub estimated_delivery: String,
    pub domestic: bool,
}

/// Order summary figures for a cart shipped to a country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutQuote {
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total_usd: Decimal,
    pub total_amd: i64,
    pub usd_to_amd_rate: Decimal,
}

impl PricingService {
    pub fn new(shipping: ShippingConfig, usd_to_amd_rate: Decimal) -> Self {
        Self {
            shipping,
            usd_to_amd_rate,
        }
    }

    pub fn usd_to_amd_rate(&self) -> Decimal {
        self.usd_to_amd_rate
    }

    pub fn home_country(&self) -> &str {
        &self.shipping.home_country
    }

    /// Compares the trimmed, lower-cased country against the home country and its aliases.
    pub fn is_home_country(&self, country: &str) -> bool {
        let normalized = country.trim().to_lowercase();
        normalized == self.shipping.home_country.trim().to_lowercase()
            || self
                .shipping
                .home_country_aliases
                .iter()
                .any(|alias| alias.trim().to_lowercase() == normalized)
    }

    pub fn shipping_cost(&self, country: &str) -> Decimal {
        if self.is_home_country(country) {
            self.shipping.domestic_rate_usd
        } else {
            self.shipping.international_rate_usd
        }
    }

    pub fn delivery_estimate(&self, country: &str) -> &str {
        if self.is_home_country(country) {
            &self.shipping.domestic_estimate
        } else {
            &self.shipping.international_estimate
        }
    }

    pub fn shipping_quote(&self, country: &str) -> ShippingQuote {
        ShippingQuote {
            country: country.trim().to_string(),
            carrier: self.shipping.carrier.clone(),
            cost_usd: self.shipping_cost(country),
            estimated_delivery: self.delivery_estimate(country).to_string(),
            domestic: self.is_home_country(country),
        }
    }

    /// Converts USD to whole drams at the configured rate.
    pub fn convert_usd_to_amd(&self, usd: Decimal) -> Result<i64, ServiceError> {
        let amd = usd
            .checked_mul(self.usd_to_amd_rate)
            .ok_or_else(|| ServiceError::InvalidInput(format!("Amount {} overflows", usd)))?;
        money::round_to_dram(amd)
    }

    /// Σ(unit price × quantity), exact.
    pub fn subtotal(&self, items: &[CartItem]) -> Result<Decimal, ServiceError> {
        cart::subtotal(items)
    }

    pub fn quote(&self, items: &[CartItem], country: &str) -> Result<CheckoutQuote, ServiceError> {
        let subtotal = self.subtotal(items)?;
        let shipping_cost = self.shipping_cost(country);
        let total_usd = subtotal
            .checked_add(shipping_cost)
            .ok_or_else(|| ServiceError::InvalidInput("Order total overflows".to_string()))?;

        Ok(CheckoutQuote {
            subtotal,
            shipping_cost,
            total_usd,
            total_amd: self.convert_usd_to_amd(total_usd)?,
            usd_to_amd_rate: self.usd_to_amd_rate,
        })
    }
}

impl Default for PricingService {
    fn default() -> Self {
        Self::new(ShippingConfig::default(), Decimal::from(390))
    }
}
