use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bss_core::money::ensure_within_limit;
use bss_core::{DomainError, DomainResult, RatingRuleId, SubscriptionId, UsageRecordId, labelled_enum};

labelled_enum! {
    pub enum UsageType {
        Voice => "VOICE",
        Sms => "SMS",
        Mms => "MMS",
        Data => "DATA",
        Video => "VIDEO",
    }
}

labelled_enum! {
    pub enum UsageUnit {
        Minutes => "MINUTES",
        Seconds => "SECONDS",
        Count => "COUNT",
        Mb => "MB",
        Gb => "GB",
    }
}

labelled_enum! {
    pub enum DestinationType {
        National => "NATIONAL",
        International => "INTERNATIONAL",
        Mobile => "MOBILE",
        Roaming => "ROAMING",
    }
}

labelled_enum! {
    /// Tariff time band.
    pub enum RatePeriod {
        Peak => "PEAK",
        OffPeak => "OFF_PEAK",
        Weekend => "WEEKEND",
    }
}

/// Price attached to a usage record by the rating engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub rule_id: RatingRuleId,
    pub unit_rate: Decimal,
    /// `max(quantity, rule minimum units)`.
    pub billed_units: Decimal,
    pub net_amount: Decimal,
    pub currency: String,
    pub rated_at: DateTime<Utc>,
}

/// Validated input for a new usage record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUsageRecord {
    pub subscription_id: SubscriptionId,
    pub usage_type: UsageType,
    pub unit: UsageUnit,
    pub quantity: Decimal,
    pub occurred_at: NaiveDateTime,
    pub destination_type: Option<DestinationType>,
    pub destination_number: Option<String>,
    pub network_id: Option<String>,
    pub rate_period: Option<RatePeriod>,
    pub source: String,
    pub source_file: Option<String>,
}

/// One observed unit of consumption.
///
/// Created once, rated at most once, never changed afterwards. The rating is
/// a single optional value, so a record is rated exactly when it carries both
/// a unit rate and a net amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    id: UsageRecordId,
    subscription_id: SubscriptionId,
    usage_type: UsageType,
    unit: UsageUnit,
    quantity: Decimal,
    occurred_at: NaiveDateTime,
    destination_type: Option<DestinationType>,
    destination_number: Option<String>,
    network_id: Option<String>,
    rate_period: Option<RatePeriod>,
    source: String,
    source_file: Option<String>,
    rating: Option<Rating>,
    created_at: DateTime<Utc>,
}

impl UsageRecord {
    pub fn new(
        id: UsageRecordId,
        input: NewUsageRecord,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if input.quantity < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "usage quantity cannot be negative, got {}",
                input.quantity
            )));
        }
        ensure_within_limit(input.quantity, "usage quantity")?;
        let source = input.source.trim().to_string();
        if source.is_empty() {
            return Err(DomainError::validation("usage source is required"));
        }

        Ok(Self {
            id,
            subscription_id: input.subscription_id,
            usage_type: input.usage_type,
            unit: input.unit,
            quantity: input.quantity,
            occurred_at: input.occurred_at,
            destination_type: input.destination_type,
            destination_number: input.destination_number,
            network_id: input.network_id,
            rate_period: input.rate_period,
            source,
            source_file: input.source_file,
            rating: None,
            created_at,
        })
    }

    /// Attach a rating. A record is rated at most once.
    pub fn rated(&self, rating: Rating) -> DomainResult<Self> {
        if self.rating.is_some() {
            return Err(DomainError::invariant(format!(
                "usage record {} is already rated",
                self.id
            )));
        }
        let mut next = self.clone();
        next.rating = Some(rating);
        Ok(next)
    }

    pub fn id(&self) -> UsageRecordId {
        self.id
    }

    pub fn subscription_id(&self) -> SubscriptionId {
        self.subscription_id
    }

    pub fn usage_type(&self) -> UsageType {
        self.usage_type
    }

    pub fn unit(&self) -> UsageUnit {
        self.unit
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn occurred_at(&self) -> NaiveDateTime {
        self.occurred_at
    }

    pub fn usage_date(&self) -> NaiveDate {
        self.occurred_at.date()
    }

    pub fn destination_type(&self) -> Option<DestinationType> {
        self.destination_type
    }

    pub fn destination_number(&self) -> Option<&str> {
        self.destination_number.as_deref()
    }

    pub fn network_id(&self) -> Option<&str> {
        self.network_id.as_deref()
    }

    pub fn rate_period(&self) -> Option<RatePeriod> {
        self.rate_period
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn source_file(&self) -> Option<&str> {
        self.source_file.as_deref()
    }

    pub fn rating(&self) -> Option<&Rating> {
        self.rating.as_ref()
    }

    pub fn is_rated(&self) -> bool {
        self.rating.is_some()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
