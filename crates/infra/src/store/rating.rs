use std::collections::HashMap;
use std::sync::RwLock;

use chrono::NaiveDate;

use bss_core::{DomainError, RatingRuleId, UsageRecordId};
use bss_rating::{Rating, RatingRule, UsageRecord, UsageType};

use super::query::UsageFilter;
use super::r#trait::{RatingRuleStore, StoreError, UsageStore};

/// In-memory usage record store.
#[derive(Debug, Default)]
pub struct InMemoryUsageStore {
    records: RwLock<HashMap<UsageRecordId, UsageRecord>>,
}

impl InMemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UsageStore for InMemoryUsageStore {
    fn insert(&self, record: UsageRecord) -> Result<(), StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::Poisoned("usage"))?;
        if records.contains_key(&record.id()) {
            return Err(
                DomainError::conflict(format!("usage record {} already exists", record.id()))
                    .into(),
            );
        }
        records.insert(record.id(), record);
        Ok(())
    }

    fn get(&self, id: UsageRecordId) -> Result<Option<UsageRecord>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::Poisoned("usage"))?;
        Ok(records.get(&id).cloned())
    }

    fn attach_rating(&self, id: UsageRecordId, rating: Rating) -> Result<UsageRecord, StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::Poisoned("usage"))?;
        let record = records
            .get(&id)
            .ok_or_else(|| DomainError::not_found("usage record", id))?;

        // Checked under the write guard: concurrent raters cannot both win.
        let rated = record.rated(rating)?;
        records.insert(id, rated.clone());
        Ok(rated)
    }

    fn query(&self, filter: &UsageFilter) -> Result<Vec<UsageRecord>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::Poisoned("usage"))?;
        let mut out: Vec<_> = records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            a.occurred_at()
                .cmp(&b.occurred_at())
                .then_with(|| a.id().cmp(&b.id()))
        });
        Ok(out)
    }
}

/// In-memory tariff catalogue.
#[derive(Debug, Default)]
pub struct InMemoryRatingRuleStore {
    rules: RwLock<HashMap<RatingRuleId, RatingRule>>,
}

impl InMemoryRatingRuleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RatingRuleStore for InMemoryRatingRuleStore {
    fn insert(&self, rule: RatingRule) -> Result<(), StoreError> {
        let mut rules = self
            .rules
            .write()
            .map_err(|_| StoreError::Poisoned("rating rule"))?;
        if rules.contains_key(&rule.id()) {
            return Err(
                DomainError::conflict(format!("rating rule {} already exists", rule.id())).into(),
            );
        }
        rules.insert(rule.id(), rule);
        Ok(())
    }

    fn get(&self, id: RatingRuleId) -> Result<Option<RatingRule>, StoreError> {
        let rules = self
            .rules
            .read()
            .map_err(|_| StoreError::Poisoned("rating rule"))?;
        Ok(rules.get(&id).cloned())
    }

    fn replace(&self, rule: RatingRule) -> Result<(), StoreError> {
        let mut rules = self
            .rules
            .write()
            .map_err(|_| StoreError::Poisoned("rating rule"))?;
        match rules.get_mut(&rule.id()) {
            Some(slot) => {
                *slot = rule;
                Ok(())
            }
            None => Err(DomainError::not_found("rating rule", rule.id()).into()),
        }
    }

    fn candidates(
        &self,
        usage_type: UsageType,
        on: NaiveDate,
    ) -> Result<Vec<RatingRule>, StoreError> {
        let rules = self
            .rules
            .read()
            .map_err(|_| StoreError::Poisoned("rating rule"))?;
        let mut out: Vec<_> = rules
            .values()
            .filter(|r| r.is_active() && r.usage_type() == usage_type && r.effective().contains(on))
            .cloned()
            .collect();
        out.sort_by_key(|r| r.id());
        Ok(out)
    }
}
