//! `bss-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod error;
pub mod id;
pub mod label;
pub mod lifecycle;
pub mod money;
pub mod period;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, CustomerId, ItemId, RatingRuleId, SubscriptionId, UsageRecordId};
pub use lifecycle::TransitionTable;
pub use period::Period;
