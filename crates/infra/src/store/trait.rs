use chrono::NaiveDate;
use thiserror::Error;

use bss_billing::{BillingCycle, BillingCycleId, Subscription};
use bss_core::{CustomerId, DomainError, ExpectedVersion, RatingRuleId, SubscriptionId, UsageRecordId};
use bss_documents::{BillableDocument, DocumentId, DocumentKind};
use bss_rating::{Rating, RatingRule, UsageRecord, UsageType};

use super::query::{DocumentFilter, UsageFilter};

/// Store-level failure.
///
/// Lookups, uniqueness and compare-and-swap failures are reported as the
/// matching [`DomainError`] (`NotFound`, `Conflict`, `StaleVersion`) so that
/// services can forward them unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("{0} store lock poisoned")]
    Poisoned(&'static str),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Domain(err) if err.is_conflict())
    }
}

/// Versioned storage for billable documents (invoices, orders).
pub trait DocumentStore<K: DocumentKind>: Send + Sync {
    /// Insert a new document. Ids and document numbers are unique.
    fn insert(&self, document: BillableDocument<K>) -> Result<(), StoreError>;

    fn get(&self, id: DocumentId) -> Result<Option<BillableDocument<K>>, StoreError>;

    fn find_by_number(&self, number: &str) -> Result<Option<BillableDocument<K>>, StoreError>;

    /// Compare-and-swap: `expected` is checked against the stored version.
    fn replace(
        &self,
        document: BillableDocument<K>,
        expected: ExpectedVersion,
    ) -> Result<(), StoreError>;

    /// Remove a document, returning it if it existed.
    fn remove(&self, id: DocumentId) -> Result<Option<BillableDocument<K>>, StoreError>;

    /// Documents matching `filter`, ordered by creation time then number.
    fn list(&self, filter: &DocumentFilter<K::Status>)
    -> Result<Vec<BillableDocument<K>>, StoreError>;
}

pub trait UsageStore: Send + Sync {
    fn insert(&self, record: UsageRecord) -> Result<(), StoreError>;

    fn get(&self, id: UsageRecordId) -> Result<Option<UsageRecord>, StoreError>;

    /// Attach a rating to a stored record. Fails if the record is already rated.
    fn attach_rating(&self, id: UsageRecordId, rating: Rating) -> Result<UsageRecord, StoreError>;

    /// Records matching `filter`, ordered by occurrence time then id.
    fn query(&self, filter: &UsageFilter) -> Result<Vec<UsageRecord>, StoreError>;
}

pub trait RatingRuleStore: Send + Sync {
    fn insert(&self, rule: RatingRule) -> Result<(), StoreError>;

    fn get(&self, id: RatingRuleId) -> Result<Option<RatingRule>, StoreError>;

    /// Overwrite an existing rule (e.g. after deactivation).
    fn replace(&self, rule: RatingRule) -> Result<(), StoreError>;

    /// Active rules for `usage_type` whose window contains `on`.
    fn candidates(&self, usage_type: UsageType, on: NaiveDate)
    -> Result<Vec<RatingRule>, StoreError>;
}

pub trait BillingCycleStore: Send + Sync {
    /// Insert `cycle` unless the customer already has a cycle overlapping it.
    ///
    /// The check and the insert happen under one write lock; a clash is a
    /// `Conflict` naming the existing cycle.
    fn insert_if_no_overlap(&self, cycle: BillingCycle) -> Result<(), StoreError>;

    fn get(&self, id: BillingCycleId) -> Result<Option<BillingCycle>, StoreError>;

    /// Compare-and-swap on the cycle version.
    fn replace(&self, cycle: BillingCycle, expected: ExpectedVersion) -> Result<(), StoreError>;

    /// Cycles of one customer, ordered by cycle start.
    fn for_customer(&self, customer_id: CustomerId) -> Result<Vec<BillingCycle>, StoreError>;
}

pub trait SubscriptionStore: Send + Sync {
    fn insert(&self, subscription: Subscription) -> Result<(), StoreError>;

    fn get(&self, id: SubscriptionId) -> Result<Option<Subscription>, StoreError>;

    /// Overwrite an existing subscription (status changes).
    fn replace(&self, subscription: Subscription) -> Result<(), StoreError>;

    fn for_customer(&self, customer_id: CustomerId) -> Result<Vec<Subscription>, StoreError>;
}
