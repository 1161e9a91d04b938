//! Usage rating.
//!
//! A usage record is priced by matching it against time-bounded tariff rules.
//! The engine is stateless: callers pass the candidate rules in and persist
//! the resulting [`Rating`] themselves.

pub mod engine;
pub mod rule;
pub mod usage;

pub use engine::{RatingEngine, RatingOutcome, RuleTieBreak, charge};
pub use rule::{NewRatingRule, RatingRule};
pub use usage::{
    DestinationType, NewUsageRecord, RatePeriod, Rating, UsageRecord, UsageType, UsageUnit,
};
