use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bss_core::{DomainError, DomainResult};
use bss_rating::UsageType;

/// VAT rates applied to invoice lines, in percent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxPolicy {
    default_rate: Decimal,
    usage_overrides: BTreeMap<UsageType, Decimal>,
}

impl TaxPolicy {
    pub const STANDARD_VAT_PERCENT: u32 = 23;

    pub fn new(default_rate: Decimal) -> DomainResult<Self> {
        ensure_rate(default_rate)?;
        Ok(Self {
            default_rate,
            usage_overrides: BTreeMap::new(),
        })
    }

    /// Use `rate` instead of the default for usage lines of `usage_type`.
    pub fn with_usage_rate(mut self, usage_type: UsageType, rate: Decimal) -> DomainResult<Self> {
        ensure_rate(rate)?;
        self.usage_overrides.insert(usage_type, rate);
        Ok(self)
    }

    pub fn default_rate(&self) -> Decimal {
        self.default_rate
    }

    pub fn usage_rate(&self, usage_type: UsageType) -> Decimal {
        self.usage_overrides
            .get(&usage_type)
            .copied()
            .unwrap_or(self.default_rate)
    }
}

impl Default for TaxPolicy {
    fn default() -> Self {
        Self {
            default_rate: Decimal::from(Self::STANDARD_VAT_PERCENT),
            usage_overrides: BTreeMap::new(),
        }
    }
}

fn ensure_rate(rate: Decimal) -> DomainResult<()> {
    if rate < Decimal::ZERO {
        return Err(DomainError::validation(format!(
            "tax rate cannot be negative, got {rate}"
        )));
    }
    Ok(())
}
