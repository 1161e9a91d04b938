//! Process configuration for the billing services.

use anyhow::{Context, Result};
use rust_decimal::Decimal;

use bss_billing::TaxPolicy;
use bss_core::money::currency_code;
use bss_rating::RuleTieBreak;

use crate::numbering::DocumentNumberSequence;

pub const ENV_VAT_RATE: &str = "BSS_VAT_RATE";
pub const ENV_PAYMENT_TERMS_DAYS: &str = "BSS_PAYMENT_TERMS_DAYS";
pub const ENV_DEFAULT_CURRENCY: &str = "BSS_DEFAULT_CURRENCY";
pub const ENV_RULE_TIE_BREAK: &str = "BSS_RULE_TIE_BREAK";
pub const ENV_INVOICE_PREFIX: &str = "BSS_INVOICE_PREFIX";
pub const ENV_ORDER_PREFIX: &str = "BSS_ORDER_PREFIX";

/// Billing configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingConfig {
    /// Tax rates for generated invoices, in percent.
    pub tax: TaxPolicy,
    pub payment_terms_days: u32,
    pub default_currency: String,
    pub tie_break: RuleTieBreak,
    pub invoice_prefix: String,
    pub order_prefix: String,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            tax: TaxPolicy::default(),
            payment_terms_days: 14,
            default_currency: "PLN".to_string(),
            tie_break: RuleTieBreak::default(),
            invoice_prefix: "INV".to_string(),
            order_prefix: "ORD".to_string(),
        }
    }
}

impl BillingConfig {
    /// Read the configuration from `BSS_*` environment variables, falling back
    /// to defaults for unset ones.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(raw) = var(ENV_VAT_RATE) {
            let rate: Decimal = raw
                .parse()
                .with_context(|| format!("{ENV_VAT_RATE} is not a decimal: '{raw}'"))?;
            config.tax = TaxPolicy::new(rate).with_context(|| format!("invalid {ENV_VAT_RATE}"))?;
        }
        if let Some(raw) = var(ENV_PAYMENT_TERMS_DAYS) {
            config.payment_terms_days = raw
                .parse()
                .with_context(|| format!("{ENV_PAYMENT_TERMS_DAYS} is not a day count: '{raw}'"))?;
        }
        if let Some(raw) = var(ENV_DEFAULT_CURRENCY) {
            config.default_currency =
                currency_code(&raw).with_context(|| format!("invalid {ENV_DEFAULT_CURRENCY}"))?;
        }
        if let Some(raw) = var(ENV_RULE_TIE_BREAK) {
            config.tie_break = raw
                .parse()
                .with_context(|| format!("invalid {ENV_RULE_TIE_BREAK}"))?;
        }
        if let Some(raw) = var(ENV_INVOICE_PREFIX) {
            config.invoice_prefix = raw;
        }
        if let Some(raw) = var(ENV_ORDER_PREFIX) {
            config.order_prefix = raw;
        }

        Ok(config)
    }

    pub fn with_tax(mut self, tax: TaxPolicy) -> Self {
        self.tax = tax;
        self
    }

    pub fn with_payment_terms_days(mut self, days: u32) -> Self {
        self.payment_terms_days = days;
        self
    }

    pub fn with_default_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = currency.into();
        self
    }

    pub fn with_tie_break(mut self, tie_break: RuleTieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn with_invoice_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.invoice_prefix = prefix.into();
        self
    }

    pub fn with_order_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.order_prefix = prefix.into();
        self
    }

    /// Fresh number sequence for invoices, using `invoice_prefix`.
    pub fn invoice_numbers(&self) -> DocumentNumberSequence {
        DocumentNumberSequence::new(self.invoice_prefix.clone())
    }

    /// Fresh number sequence for orders, using `order_prefix`.
    pub fn order_numbers(&self) -> DocumentNumberSequence {
        DocumentNumberSequence::new(self.order_prefix.clone())
    }
}
