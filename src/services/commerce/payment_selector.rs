use crate::{
    models::{money, PaymentMethod},
    services::commerce::pricing_service::PricingService,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::debug;

pub const WALLET_UNAVAILABLE_REASON: &str = "Not available on this device";

/// Reports whether the shopper's device can pay with Apple Pay / Google Pay.
///
/// Detection is best effort: implementations answer `false` when they cannot tell.
pub trait CapabilityProvider: Send + Sync {
    fn device_wallet_available(&self) -> bool;
}

/// Platform without any wallet support. Used when nothing better is known.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWalletSupport;

impl CapabilityProvider for NoWalletSupport {
    fn device_wallet_available(&self) -> bool {
        false
    }
}

/// Capability hints reported by a browser client.
///
/// `apple_pay` is the answer of the native Apple Pay check when that API
/// exists; otherwise support for the Payment Request API decides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClientHints {
    #[serde(default)]
    pub apple_pay: Option<bool>,
    #[serde(default)]
    pub payment_request: bool,
}

impl CapabilityProvider for ClientHints {
    fn device_wallet_available(&self) -> bool {
        match self.apple_pay {
            Some(can_make_payments) => can_make_payments,
            None => self.payment_request,
        }
    }
}

/// Wraps a fallible platform probe; a failing probe means "unavailable".
pub struct ProbedCapability<F> {
    probe: F,
}

impl<F, E> ProbedCapability<F>
where
    F: Fn() -> Result<bool, E> + Send + Sync,
    E: std::fmt::Display,
{
    pub fn new(probe: F) -> Self {
        Self { probe }
    }
}

impl<F, E> CapabilityProvider for ProbedCapability<F>
where
    F: Fn() -> Result<bool, E> + Send + Sync,
    E: std::fmt::Display,
{
    fn device_wallet_available(&self) -> bool {
        match (self.probe)() {
            Ok(available) => available,
            Err(e) => {
                debug!(error = %e, "Wallet capability probe failed");
                false
            }
        }
    }
}

/// Recommended rail for a shopper.
///
/// Device wallet when available, the regional rail for the home country,
/// the international rail for everyone else.
pub fn recommend_payment_method(
    wallet_available: bool,
    country: &str,
    pricing: &PricingService,
) -> PaymentMethod {
    if wallet_available {
        PaymentMethod::DeviceWallet
    } else if pricing.is_home_country(country) {
        PaymentMethod::RegionalWallet
    } else {
        PaymentMethod::InternationalCard
    }
}

/// One selectable rail as the checkout page renders it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentOption {
    pub method: PaymentMethod,
    pub title: &'static str,
    pub subtitle: Option<&'static str>,
    pub description: &'static str,
    pub recommended: bool,
    pub selected: bool,
    pub disabled: bool,
    pub disabled_reason: Option<&'static str>,
}

/// Per-shopper payment method choice.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentMethodSelector {
    selected: Option<PaymentMethod>,
    recommended: Option<PaymentMethod>,
    wallet_available: bool,
}

impl Default for PaymentMethodSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentMethodSelector {
    pub fn new() -> Self {
        Self {
            selected: None,
            recommended: None,
            wallet_available: false,
        }
    }

    pub fn selected(&self) -> Option<PaymentMethod> {
        self.selected
    }

    pub fn recommended(&self) -> Option<PaymentMethod> {
        self.recommended
    }

    pub fn wallet_available(&self) -> bool {
        self.wallet_available
    }

    /// Re-probes the device and re-evaluates the recommendation for `country`.
    ///
    /// The recommendation is applied, and `on_method_change` invoked, only when
    /// nothing is selected yet or the selected device wallet is unavailable.
    pub fn on_country_change<F>(
        &mut self,
        country: &str,
        capabilities: &dyn CapabilityProvider,
        pricing: &PricingService,
        mut on_method_change: F,
    ) -> PaymentMethod
    where
        F: FnMut(PaymentMethod),
    {
        self.wallet_available = capabilities.device_wallet_available();
        let recommended = recommend_payment_method(self.wallet_available, country, pricing);
        self.recommended = Some(recommended);

        let stale_wallet =
            self.selected == Some(PaymentMethod::DeviceWallet) && !self.wallet_available;
        if self.selected.is_none() || stale_wallet {
            debug!(country, method = %recommended, "Auto-selecting recommended payment method");
            self.selected = Some(recommended);
            on_method_change(recommended);
        }

        recommended
    }

    pub fn is_disabled(&self, method: PaymentMethod) -> bool {
        method == PaymentMethod::DeviceWallet && !self.wallet_available
    }

    /// Selects a rail. Returns `false` and changes nothing for a disabled rail.
    pub fn select(&mut self, method: PaymentMethod) -> bool {
        if self.is_disabled(method) {
            return false;
        }
        self.selected = Some(method);
        true
    }

    pub fn options(&self) -> Vec<PaymentOption> {
        PaymentMethod::iter()
            .map(|method| {
                let disabled = self.is_disabled(method);
                PaymentOption {
                    method,
                    title: method.title(),
                    subtitle: method.subtitle(),
                    description: if disabled {
                        WALLET_UNAVAILABLE_REASON
                    } else {
                        method.description()
                    },
                    recommended: self.recommended == Some(method),
                    selected: self.selected == Some(method),
                    disabled,
                    disabled_reason: disabled.then_some(WALLET_UNAVAILABLE_REASON),
                }
            })
            .collect()
    }
}

/// What the shopper will be charged, in the rail's settlement currency.
pub fn payment_info(method: PaymentMethod, total_usd: Decimal, total_amd: i64) -> String {
    let usd = money::format_usd(total_usd);
    let amd = money::format_amd(total_amd);
    match method {
        PaymentMethod::DeviceWallet => format!(
            "You will pay {} AMD (equivalent to ${} USD) through your Armenian bank.",
            amd, usd
        ),
        PaymentMethod::RegionalWallet => format!(
            "You will pay {} AMD (equivalent to ${} USD) via Idram or local cards.",
            amd, usd
        ),
        PaymentMethod::InternationalCard => {
            format!("You will pay ${} USD via Payoneer secure checkout.", usd)
        }
    }
}
