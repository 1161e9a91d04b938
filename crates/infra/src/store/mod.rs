//! Storage boundary for rating, billing and billable documents.
//!
//! Traits describe what the services need; the in-memory adapters are
//! synchronised with `RwLock` and perform every check-then-write under a
//! single write guard.

pub mod documents;
pub mod query;
pub mod rating;
pub mod billing;
pub mod r#trait;

pub use billing::{InMemoryBillingCycleStore, InMemorySubscriptionStore};
pub use documents::InMemoryDocumentStore;
pub use query::{DocumentFilter, UsageFilter};
pub use rating::{InMemoryRatingRuleStore, InMemoryUsageStore};
pub use r#trait::{
    BillingCycleStore, DocumentStore, RatingRuleStore, StoreError, SubscriptionStore, UsageStore,
};
