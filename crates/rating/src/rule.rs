use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bss_core::money::{currency_code, ensure_within_limit};
use bss_core::{DomainError, DomainResult, Period, RatingRuleId};

use crate::usage::{DestinationType, RatePeriod, UsageRecord, UsageType};

/// Input for a new tariff rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRatingRule {
    pub usage_type: UsageType,
    pub destination_type: Option<DestinationType>,
    pub rate_period: Option<RatePeriod>,
    pub unit_rate: Decimal,
    pub minimum_units: Decimal,
    pub currency: String,
    pub effective_from: NaiveDate,
    pub effective_to: NaiveDate,
    pub active: bool,
}

/// Tariff rule: price per unit for one usage type inside a validity window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRule {
    id: RatingRuleId,
    usage_type: UsageType,
    destination_type: Option<DestinationType>,
    rate_period: Option<RatePeriod>,
    unit_rate: Decimal,
    minimum_units: Decimal,
    currency: String,
    effective: Period,
    active: bool,
    created_at: DateTime<Utc>,
}

impl RatingRule {
    pub fn new(
        id: RatingRuleId,
        input: NewRatingRule,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if input.unit_rate < Decimal::ZERO {
            return Err(DomainError::validation("rule unit rate cannot be negative"));
        }
        if input.minimum_units < Decimal::ZERO {
            return Err(DomainError::validation(
                "rule minimum units cannot be negative",
            ));
        }
        ensure_within_limit(input.unit_rate, "rule unit rate")?;
        ensure_within_limit(input.minimum_units, "rule minimum units")?;

        Ok(Self {
            id,
            usage_type: input.usage_type,
            destination_type: input.destination_type,
            rate_period: input.rate_period,
            unit_rate: input.unit_rate,
            minimum_units: input.minimum_units,
            currency: currency_code(&input.currency)?,
            effective: Period::new(input.effective_from, input.effective_to)?,
            active: input.active,
            created_at,
        })
    }

    /// Whether this rule may price `record`.
    ///
    /// An attribute absent on the record only matches a rule where the same
    /// attribute is absent.
    pub fn applies_to(&self, record: &UsageRecord) -> bool {
        self.active
            && self.effective.contains(record.usage_date())
            && self.usage_type == record.usage_type()
            && self.destination_type == record.destination_type()
            && self.rate_period == record.rate_period()
    }

    pub fn deactivated(&self) -> Self {
        let mut next = self.clone();
        next.active = false;
        next
    }

    pub fn id(&self) -> RatingRuleId {
        self.id
    }

    pub fn usage_type(&self) -> UsageType {
        self.usage_type
    }

    pub fn destination_type(&self) -> Option<DestinationType> {
        self.destination_type
    }

    pub fn rate_period(&self) -> Option<RatePeriod> {
        self.rate_period
    }

    pub fn unit_rate(&self) -> Decimal {
        self.unit_rate
    }

    pub fn minimum_units(&self) -> Decimal {
        self.minimum_units
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn effective(&self) -> Period {
        self.effective
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
