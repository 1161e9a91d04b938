//! Read filters for the in-memory stores.

use bss_core::{CustomerId, Period, SubscriptionId};
use bss_rating::UsageRecord;

/// Filter criteria for usage queries. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageFilter {
    pub subscription_ids: Option<Vec<SubscriptionId>>,
    /// Inclusive window over the usage date.
    pub window: Option<Period>,
    pub rated: Option<bool>,
}

impl UsageFilter {
    pub fn unrated() -> Self {
        Self {
            rated: Some(false),
            ..Self::default()
        }
    }

    pub fn rated() -> Self {
        Self {
            rated: Some(true),
            ..Self::default()
        }
    }

    pub fn for_subscriptions(mut self, ids: impl IntoIterator<Item = SubscriptionId>) -> Self {
        self.subscription_ids = Some(ids.into_iter().collect());
        self
    }

    pub fn within(mut self, window: Period) -> Self {
        self.window = Some(window);
        self
    }

    pub fn matches(&self, record: &UsageRecord) -> bool {
        self.subscription_ids
            .as_ref()
            .is_none_or(|ids| ids.contains(&record.subscription_id()))
            && self.window.is_none_or(|w| w.contains(record.usage_date()))
            && self.rated.is_none_or(|rated| rated == record.is_rated())
    }
}

/// Filter criteria for document listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFilter<S> {
    pub customer_id: Option<CustomerId>,
    pub status: Option<S>,
}

impl<S> Default for DocumentFilter<S> {
    fn default() -> Self {
        Self {
            customer_id: None,
            status: None,
        }
    }
}

impl<S: Copy + Eq> DocumentFilter<S> {
    pub fn with_status(status: S) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn for_customer(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn matches(&self, customer_id: CustomerId, status: S) -> bool {
        self.customer_id.is_none_or(|c| c == customer_id)
            && self.status.is_none_or(|s| s == status)
    }
}
