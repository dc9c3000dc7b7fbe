use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use validator::Validate;

use crate::models::money::{AMD, USD};

/// Countries offered by the checkout form.
pub const SUPPORTED_COUNTRIES: &[&str] = &[
    "Armenia",
    "United States",
    "United Kingdom",
    "Germany",
    "France",
    "Spain",
    "Italy",
    "Canada",
    "Australia",
    "Japan",
    "South Korea",
    "Other",
];

pub const DEFAULT_COUNTRY: &str = "Armenia";

/// The three payment rails. Exactly one is chosen per checkout attempt.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    AsRefStr,
    Display,
)]
pub enum PaymentMethod {
    /// Apple Pay / Google Pay on the shopper's device
    #[serde(rename = "apple_google")]
    #[strum(serialize = "apple_google")]
    DeviceWallet,
    /// Idram wallet and ArCa cards, settled in AMD
    #[serde(rename = "idram")]
    #[strum(serialize = "idram")]
    RegionalWallet,
    /// Payoneer hosted checkout, settled in USD
    #[serde(rename = "payoneer")]
    #[strum(serialize = "payoneer")]
    InternationalCard,
}

impl PaymentMethod {
    pub fn settlement_currency(&self) -> &'static str {
        match self {
            Self::DeviceWallet | Self::RegionalWallet => AMD,
            Self::InternationalCard => USD,
        }
    }

    /// Name shown on the confirmation page.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::DeviceWallet => "Apple Pay / Google Pay",
            Self::RegionalWallet => "Idram & Local Cards",
            Self::InternationalCard => "Payoneer Checkout",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::DeviceWallet => "Apple Pay / Google Pay",
            Self::RegionalWallet => "Idram & Local Cards",
            Self::InternationalCard => "Payoneer Checkout",
        }
    }

    pub fn subtitle(&self) -> Option<&'static str> {
        match self {
            Self::DeviceWallet => None,
            Self::RegionalWallet => Some("(Armenia)"),
            Self::InternationalCard => Some("(International)"),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::DeviceWallet => "Fast, secure checkout with your device",
            Self::RegionalWallet => "Pay with Idram wallet or ArCa cards. Processed in AMD at bank rate.",
            Self::InternationalCard => "Pay in USD with Visa/Mastercard. Secure partner checkout.",
        }
    }

    /// Label of the submit button for this rail.
    pub fn action_label(&self) -> &'static str {
        match self {
            Self::DeviceWallet => "Pay with Apple Pay / Google Pay",
            Self::RegionalWallet => "Continue to Idram",
            Self::InternationalCard => "Continue to Payoneer",
        }
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct CustomerDetails {
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 6, message = "Phone number is required"))]
    pub phone: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[validate(length(min = 2, message = "Country is required"))]
    pub country: String,

    #[validate(length(min = 2, message = "City is required"))]
    pub city: String,

    #[validate(length(min = 3, message = "Postal code is required"))]
    pub postal_code: String,

    #[validate(length(min = 5, message = "Street address is required"))]
    pub street_address: String,
}

/// Everything the shopper types into the checkout form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct CheckoutForm {
    #[validate]
    pub customer: CustomerDetails,
    #[validate]
    pub shipping: ShippingAddress,
}

/// Denormalized purchased line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    /// Variant id of the purchased line
    pub id: String,
    pub title: String,
    pub variant_title: String,
    pub quantity: u32,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Immutable snapshot of one checkout attempt.
///
/// `total_usd` is the exact item sum plus shipping; `total_amd` is that total
/// converted at the configured rate and rounded to whole drams.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutData {
    pub order_id: String,
    pub items: Vec<CheckoutItem>,
    pub customer: CustomerDetails,
    pub shipping: ShippingAddress,
    pub shipping_cost: Decimal,
    pub total_usd: Decimal,
    pub total_amd: i64,
    pub payment_method: PaymentMethod,
}

/// A persisted checkout: the snapshot plus when it was stored and its status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    #[serde(flatten)]
    pub checkout: CheckoutData,
    pub date: DateTime<Utc>,
    pub status: OrderStatus,
}

impl Order {
    pub fn new(checkout: CheckoutData, status: OrderStatus) -> Self {
        Self {
            checkout,
            date: Utc::now(),
            status,
        }
    }

    pub fn order_id(&self) -> &str {
        &self.checkout.order_id
    }

    /// A later record for the same order with a new status.
    pub fn with_status(&self, status: OrderStatus) -> Self {
        Self::new(self.checkout.clone(), status)
    }
}
