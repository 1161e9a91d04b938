//! Usage ingestion: validate, persist, rate synchronously.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use bss_core::money::ensure_within_limit;
use bss_core::{DomainError, DomainResult, Period, SubscriptionId, UsageRecordId};
use bss_rating::{
    DestinationType, NewUsageRecord, RatePeriod, Rating, RatingEngine, RatingOutcome, UsageRecord,
    UsageType, UsageUnit,
};

use crate::error::ServiceResult;
use crate::store::{RatingRuleStore, UsageFilter, UsageStore};

/// Raw usage event as received from a mediation feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestUsageRecord {
    pub subscription_id: String,
    pub usage_type: String,
    pub unit: String,
    pub quantity: Option<Decimal>,
    pub usage_date: Option<NaiveDate>,
    pub usage_time: Option<NaiveTime>,
    pub destination_type: Option<String>,
    pub destination_number: Option<String>,
    pub network_id: Option<String>,
    pub rate_period: Option<String>,
    pub source: Option<String>,
    pub source_file: Option<String>,
}

impl IngestUsageRecord {
    fn validate(self) -> DomainResult<NewUsageRecord> {
        let subscription_id = SubscriptionId::from_str(self.subscription_id.trim())?;
        let usage_type = UsageType::from_str(&self.usage_type)?;
        let unit = UsageUnit::from_str(&self.unit)?;
        let quantity = self
            .quantity
            .ok_or_else(|| DomainError::validation("usage quantity is required"))?;
        if quantity < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "usage quantity cannot be negative, got {quantity}"
            )));
        }
        ensure_within_limit(quantity, "usage quantity")?;
        let usage_date = self
            .usage_date
            .ok_or_else(|| DomainError::validation("usage date is required"))?;
        let source = self
            .source
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| DomainError::validation("usage source is required"))?;

        Ok(NewUsageRecord {
            subscription_id,
            usage_type,
            unit,
            quantity,
            occurred_at: usage_date.and_time(self.usage_time.unwrap_or(NaiveTime::MIN)),
            destination_type: optional_label::<DestinationType>(self.destination_type)?,
            destination_number: non_blank(self.destination_number),
            network_id: non_blank(self.network_id),
            rate_period: optional_label::<RatePeriod>(self.rate_period)?,
            source,
            source_file: non_blank(self.source_file),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn optional_label<T: FromStr<Err = DomainError>>(value: Option<String>) -> DomainResult<Option<T>> {
    non_blank(value).map(|v| v.parse()).transpose()
}

/// Result of ingesting one record. Unrated is a normal outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestedUsage {
    pub record_id: UsageRecordId,
    pub rated: bool,
    pub unit_rate: Option<Decimal>,
    pub net_amount: Option<Decimal>,
    pub outcome: RatingOutcome,
}

/// Counts from a re-rating run.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRun {
    pub examined: usize,
    pub rated: usize,
    pub unrated: usize,
    /// Rated by a concurrent caller between the query and this run's attach.
    pub already_rated: usize,
}

/// What happened to one stored record when this gateway tried to rate it.
enum Attempt {
    Priced(RatingOutcome),
    /// Another caller attached a rating first; holds the stored one.
    RatedElsewhere(Rating),
}

pub struct UsageIngestionGateway {
    usage: Arc<dyn UsageStore>,
    rules: Arc<dyn RatingRuleStore>,
    engine: RatingEngine,
}

impl UsageIngestionGateway {
    pub fn new(
        usage: Arc<dyn UsageStore>,
        rules: Arc<dyn RatingRuleStore>,
        engine: RatingEngine,
    ) -> Self {
        Self {
            usage,
            rules,
            engine,
        }
    }

    pub fn ingest(&self, command: IngestUsageRecord) -> ServiceResult<IngestedUsage> {
        let input = command.validate().inspect_err(|err| {
            warn!(error = %err, "usage record rejected");
        })?;

        let record = UsageRecord::new(UsageRecordId::new(), input, Utc::now())?;
        let record_id = record.id();
        self.usage.insert(record.clone())?;

        let outcome = match self.rate_stored(&record)? {
            Attempt::Priced(outcome) => outcome,
            Attempt::RatedElsewhere(rating) => RatingOutcome::Rated(rating),
        };
        let rating = outcome.rating();

        info!(
            record = %record_id,
            subscription = %record.subscription_id(),
            usage_type = %record.usage_type(),
            quantity = %record.quantity(),
            rated = rating.is_some(),
            "usage record ingested"
        );

        Ok(IngestedUsage {
            record_id,
            rated: rating.is_some(),
            unit_rate: rating.map(|r| r.unit_rate),
            net_amount: rating.map(|r| r.net_amount),
            outcome,
        })
    }

    /// Every record still waiting for a rating.
    pub fn unrated(&self) -> ServiceResult<Vec<UsageRecord>> {
        Ok(self.usage.query(&UsageFilter::unrated())?)
    }

    /// Retry rating for every unrated record.
    pub fn rate_all_unrated(&self) -> ServiceResult<RatingRun> {
        let pending = self.usage.query(&UsageFilter::unrated())?;
        self.rate_batch(&pending)
    }

    /// Retry rating for the unrated records of one subscription in `start..=end`.
    pub fn rate_period(
        &self,
        subscription_id: SubscriptionId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ServiceResult<RatingRun> {
        let window = Period::new(start, end)?;
        let pending = self.usage.query(
            &UsageFilter::unrated()
                .for_subscriptions([subscription_id])
                .within(window),
        )?;
        self.rate_batch(&pending)
    }

    fn rate_batch(&self, pending: &[UsageRecord]) -> ServiceResult<RatingRun> {
        let mut run = RatingRun::default();
        for record in pending {
            run.examined += 1;
            match self.rate_stored(record)? {
                Attempt::Priced(RatingOutcome::Rated(_)) => run.rated += 1,
                Attempt::Priced(_) => run.unrated += 1,
                Attempt::RatedElsewhere(_) => run.already_rated += 1,
            }
        }
        info!(
            examined = run.examined,
            rated = run.rated,
            unrated = run.unrated,
            already_rated = run.already_rated,
            "rating run finished"
        );
        Ok(run)
    }

    fn rate_stored(&self, record: &UsageRecord) -> ServiceResult<Attempt> {
        let candidates = self
            .rules
            .candidates(record.usage_type(), record.usage_date())?;
        let outcome = self.engine.rate(record, &candidates, Utc::now())?;

        match &outcome {
            RatingOutcome::Rated(rating) => {
                if let Err(err) = self.usage.attach_rating(record.id(), rating.clone()) {
                    let Some(stored) = self.stored_rating(record.id()) else {
                        return Err(err.into());
                    };
                    debug!(record = %record.id(), "usage record was rated concurrently");
                    return Ok(Attempt::RatedElsewhere(stored));
                }
            }
            RatingOutcome::NoMatchingRule => warn!(
                record = %record.id(),
                usage_type = %record.usage_type(),
                usage_date = %record.usage_date(),
                "no rating rule matches usage record; left unrated"
            ),
            RatingOutcome::Ambiguous { candidates } => warn!(
                record = %record.id(),
                candidates = candidates.len(),
                "several rating rules match usage record; left unrated"
            ),
        }
        Ok(Attempt::Priced(outcome))
    }

    /// The rating already stored for `id`, if the record exists and is rated.
    fn stored_rating(&self, id: UsageRecordId) -> Option<Rating> {
        self.usage
            .get(id)
            .ok()
            .flatten()
            .and_then(|stored| stored.rating().cloned())
    }
}
