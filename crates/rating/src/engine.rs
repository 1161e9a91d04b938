//! Rule selection and charge computation.
//!
//! `net_amount = max(quantity, minimum_units) * unit_rate`, kept at full
//! decimal precision. Rounding to the currency scale happens later, when the
//! charge becomes an invoice line.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bss_core::money::checked_mul;
use bss_core::{DomainResult, RatingRuleId, labelled_enum};

use crate::rule::RatingRule;
use crate::usage::{Rating, UsageRecord};

labelled_enum! {
    /// What to do when more than one rule is eligible for a record.
    #[derive(Default)]
    pub enum RuleTieBreak {
        /// Pick the rule with the shortest validity window, then the latest
        /// effective-from, then the latest created-at, then the lowest id.
        #[default]
        NarrowestWindow => "NARROWEST_WINDOW",
        /// Leave the record unrated.
        RejectAmbiguous => "REJECT_AMBIGUOUS",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RatingOutcome {
    Rated(Rating),
    NoMatchingRule,
    /// Several rules matched under [`RuleTieBreak::RejectAmbiguous`].
    Ambiguous { candidates: Vec<RatingRuleId> },
}

impl RatingOutcome {
    pub fn rating(&self) -> Option<&Rating> {
        match self {
            RatingOutcome::Rated(rating) => Some(rating),
            _ => None,
        }
    }

    pub fn into_rating(self) -> Option<Rating> {
        match self {
            RatingOutcome::Rated(rating) => Some(rating),
            _ => None,
        }
    }
}

/// Stateless rating engine. Cheap to copy and safe to share between threads.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct RatingEngine {
    tie_break: RuleTieBreak,
}

impl RatingEngine {
    pub fn new(tie_break: RuleTieBreak) -> Self {
        Self { tie_break }
    }

    pub fn tie_break(&self) -> RuleTieBreak {
        self.tie_break
    }

    /// Every candidate that may price `record`, in input order.
    pub fn eligible<'a>(
        &self,
        record: &UsageRecord,
        candidates: &'a [RatingRule],
    ) -> Vec<&'a RatingRule> {
        candidates.iter().filter(|r| r.applies_to(record)).collect()
    }

    /// Price `record` against `candidates`.
    ///
    /// Does not look at whether the record is already rated; callers only pass
    /// unrated records. Fails only when the charge leaves the `Decimal` range.
    pub fn rate(
        &self,
        record: &UsageRecord,
        candidates: &[RatingRule],
        rated_at: DateTime<Utc>,
    ) -> DomainResult<RatingOutcome> {
        let eligible = self.eligible(record, candidates);

        let rule = match (eligible.len(), self.tie_break) {
            (0, _) => return Ok(RatingOutcome::NoMatchingRule),
            (1, _) => eligible[0],
            (_, RuleTieBreak::RejectAmbiguous) => {
                let mut candidates: Vec<_> = eligible.iter().map(|r| r.id()).collect();
                candidates.sort();
                return Ok(RatingOutcome::Ambiguous { candidates });
            }
            (_, RuleTieBreak::NarrowestWindow) => match narrowest(&eligible) {
                Some(rule) => rule,
                None => return Ok(RatingOutcome::NoMatchingRule),
            },
        };

        let (billed_units, net_amount) = charge(record.quantity(), rule)?;
        Ok(RatingOutcome::Rated(Rating {
            rule_id: rule.id(),
            unit_rate: rule.unit_rate(),
            billed_units,
            net_amount,
            currency: rule.currency().to_string(),
            rated_at,
        }))
    }
}

/// `(billed_units, net_amount)` for `quantity` under `rule`.
pub fn charge(quantity: Decimal, rule: &RatingRule) -> DomainResult<(Decimal, Decimal)> {
    let billed = quantity.max(rule.minimum_units());
    Ok((billed, checked_mul(billed, rule.unit_rate())?))
}

fn narrowest<'a>(eligible: &[&'a RatingRule]) -> Option<&'a RatingRule> {
    eligible.iter().copied().min_by(|a, b| {
        a.effective()
            .days()
            .cmp(&b.effective().days())
            .then_with(|| b.effective().start().cmp(&a.effective().start()))
            .then_with(|| b.created_at().cmp(&a.created_at()))
            .then_with(|| a.id().cmp(&b.id()))
    })
}
