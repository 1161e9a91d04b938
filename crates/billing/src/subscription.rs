use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bss_core::money::{currency_code, ensure_within_limit};
use bss_core::{CustomerId, DomainError, DomainResult, Period, SubscriptionId, labelled_enum};

labelled_enum! {
    pub enum SubscriptionStatus {
        Active => "ACTIVE",
        Suspended => "SUSPENDED",
        Cancelled => "CANCELLED",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubscription {
    pub customer_id: CustomerId,
    pub product_code: String,
    pub product_name: String,
    pub monthly_fee: Decimal,
    pub currency: String,
    pub activated_on: NaiveDate,
    pub ends_on: Option<NaiveDate>,
}

/// A customer's product subscription: the owner of usage records and the
/// source of the recurring fee charged once per billing cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    id: SubscriptionId,
    customer_id: CustomerId,
    product_code: String,
    product_name: String,
    monthly_fee: Decimal,
    currency: String,
    status: SubscriptionStatus,
    activated_on: NaiveDate,
    ends_on: Option<NaiveDate>,
    created_at: DateTime<Utc>,
}

impl Subscription {
    pub fn new(
        id: SubscriptionId,
        input: NewSubscription,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let product_code = input.product_code.trim().to_string();
        if product_code.is_empty() {
            return Err(DomainError::validation("product code is required"));
        }
        if input.monthly_fee < Decimal::ZERO {
            return Err(DomainError::validation("monthly fee cannot be negative"));
        }
        ensure_within_limit(input.monthly_fee, "monthly fee")?;
        if let Some(ends_on) = input.ends_on {
            if ends_on < input.activated_on {
                return Err(DomainError::validation(
                    "subscription cannot end before it is activated",
                ));
            }
        }

        Ok(Self {
            id,
            customer_id: input.customer_id,
            product_name: match input.product_name.trim() {
                "" => product_code.clone(),
                name => name.to_string(),
            },
            product_code,
            monthly_fee: input.monthly_fee,
            currency: currency_code(&input.currency)?,
            status: SubscriptionStatus::Active,
            activated_on: input.activated_on,
            ends_on: input.ends_on,
            created_at,
        })
    }

    /// Whether the recurring fee is due for a cycle covering `period`.
    pub fn is_billable_in(&self, period: &Period) -> bool {
        self.status == SubscriptionStatus::Active
            && self.activated_on <= period.end()
            && self.ends_on.is_none_or(|end| end >= period.start())
    }

    /// Whether usage on any day of `period` can be billed: the subscription is
    /// not suspended and its active window intersects `period`.
    pub fn bills_usage_in(&self, period: &Period) -> bool {
        self.status != SubscriptionStatus::Suspended
            && self.activated_on <= period.end()
            && self.ends_on.is_none_or(|end| end >= period.start())
    }

    /// Whether usage dated `on` is billable. Usage of a cancelled subscription
    /// up to its end date still is.
    pub fn bills_usage_on(&self, on: NaiveDate) -> bool {
        self.status != SubscriptionStatus::Suspended
            && self.activated_on <= on
            && self.ends_on.is_none_or(|end| on <= end)
    }

    pub fn suspend(&self) -> DomainResult<Self> {
        if self.status != SubscriptionStatus::Active {
            return Err(DomainError::invalid_transition(
                "subscription",
                self.status,
                SubscriptionStatus::Suspended,
            ));
        }
        let mut next = self.clone();
        next.status = SubscriptionStatus::Suspended;
        Ok(next)
    }

    pub fn cancel(&self, ends_on: NaiveDate) -> DomainResult<Self> {
        if self.status == SubscriptionStatus::Cancelled {
            return Err(DomainError::invalid_transition(
                "subscription",
                self.status,
                SubscriptionStatus::Cancelled,
            ));
        }
        let mut next = self.clone();
        next.status = SubscriptionStatus::Cancelled;
        next.ends_on = Some(ends_on.max(self.activated_on));
        Ok(next)
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn product_code(&self) -> &str {
        &self.product_code
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn monthly_fee(&self) -> Decimal {
        self.monthly_fee
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn status(&self) -> SubscriptionStatus {
        self.status
    }

    pub fn activated_on(&self) -> NaiveDate {
        self.activated_on
    }

    pub fn ends_on(&self) -> Option<NaiveDate> {
        self.ends_on
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
