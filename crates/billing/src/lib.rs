//! Billing cycles and the charges they collect.
//!
//! A billing cycle is a customer-scoped date window. Processing it gathers the
//! rated usage and recurring subscription fees that fall in the window and
//! turns them into invoice lines. Pure domain logic; the orchestration
//! (locking, persistence, events) lives in `bss-infra`.

pub mod charges;
pub mod cycle;
pub mod subscription;
pub mod tax;

pub use charges::{CycleCharges, collect_charges, draft_invoice};
pub use cycle::{
    BILLING_CYCLE_TRANSITIONS, BillingCycle, BillingCycleId, BillingCycleStatus, NewBillingCycle,
};
pub use subscription::{NewSubscription, Subscription, SubscriptionStatus};
pub use tax::TaxPolicy;
