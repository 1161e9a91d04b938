use std::collections::HashMap;
use std::sync::RwLock;

use bss_billing::{BillingCycle, BillingCycleId, Subscription};
use bss_core::{AggregateRoot, CustomerId, DomainError, ExpectedVersion, SubscriptionId};

use super::r#trait::{BillingCycleStore, StoreError, SubscriptionStore};

/// In-memory billing cycle store.
///
/// Cycles are grouped per customer; the overlap check and the insert share
/// one write guard, so concurrent `start cycle` calls for the same customer
/// are serialised.
#[derive(Debug, Default)]
pub struct InMemoryBillingCycleStore {
    by_customer: RwLock<HashMap<CustomerId, Vec<BillingCycle>>>,
}

impl InMemoryBillingCycleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BillingCycleStore for InMemoryBillingCycleStore {
    fn insert_if_no_overlap(&self, cycle: BillingCycle) -> Result<(), StoreError> {
        let mut by_customer = self
            .by_customer
            .write()
            .map_err(|_| StoreError::Poisoned("billing cycle"))?;
        let cycles = by_customer.entry(cycle.customer_id()).or_default();

        if let Some(existing) = cycles.iter().find(|c| c.overlaps(&cycle)) {
            return Err(DomainError::conflict(format!(
                "billing cycle {} ({}) overlaps {}",
                existing.id_typed(),
                existing.period(),
                cycle.period()
            ))
            .into());
        }
        if cycles.iter().any(|c| c.id_typed() == cycle.id_typed()) {
            return Err(DomainError::conflict(format!(
                "billing cycle {} already exists",
                cycle.id_typed()
            ))
            .into());
        }

        cycles.push(cycle);
        cycles.sort_by_key(|c| c.period().start());
        Ok(())
    }

    fn get(&self, id: BillingCycleId) -> Result<Option<BillingCycle>, StoreError> {
        let by_customer = self
            .by_customer
            .read()
            .map_err(|_| StoreError::Poisoned("billing cycle"))?;
        Ok(by_customer
            .values()
            .flatten()
            .find(|c| c.id_typed() == id)
            .cloned())
    }

    fn replace(&self, cycle: BillingCycle, expected: ExpectedVersion) -> Result<(), StoreError> {
        let mut by_customer = self
            .by_customer
            .write()
            .map_err(|_| StoreError::Poisoned("billing cycle"))?;
        let slot = by_customer
            .get_mut(&cycle.customer_id())
            .and_then(|cycles| cycles.iter_mut().find(|c| c.id_typed() == cycle.id_typed()))
            .ok_or_else(|| DomainError::not_found("billing cycle", cycle.id_typed()))?;

        expected.check(slot.version())?;
        if slot.period() != cycle.period() {
            return Err(DomainError::invariant(format!(
                "billing cycle {} window cannot change",
                cycle.id_typed()
            ))
            .into());
        }
        *slot = cycle;
        Ok(())
    }

    fn for_customer(&self, customer_id: CustomerId) -> Result<Vec<BillingCycle>, StoreError> {
        let by_customer = self
            .by_customer
            .read()
            .map_err(|_| StoreError::Poisoned("billing cycle"))?;
        Ok(by_customer.get(&customer_id).cloned().unwrap_or_default())
    }
}

/// In-memory subscription store.
#[derive(Debug, Default)]
pub struct InMemorySubscriptionStore {
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SubscriptionStore for InMemorySubscriptionStore {
    fn insert(&self, subscription: Subscription) -> Result<(), StoreError> {
        let mut subs = self
            .subscriptions
            .write()
            .map_err(|_| StoreError::Poisoned("subscription"))?;
        if subs.contains_key(&subscription.id()) {
            return Err(DomainError::conflict(format!(
                "subscription {} already exists",
                subscription.id()
            ))
            .into());
        }
        subs.insert(subscription.id(), subscription);
        Ok(())
    }

    fn get(&self, id: SubscriptionId) -> Result<Option<Subscription>, StoreError> {
        let subs = self
            .subscriptions
            .read()
            .map_err(|_| StoreError::Poisoned("subscription"))?;
        Ok(subs.get(&id).cloned())
    }

    fn replace(&self, subscription: Subscription) -> Result<(), StoreError> {
        let mut subs = self
            .subscriptions
            .write()
            .map_err(|_| StoreError::Poisoned("subscription"))?;
        match subs.get_mut(&subscription.id()) {
            Some(slot) => {
                *slot = subscription;
                Ok(())
            }
            None => Err(DomainError::not_found("subscription", subscription.id()).into()),
        }
    }

    fn for_customer(&self, customer_id: CustomerId) -> Result<Vec<Subscription>, StoreError> {
        let subs = self
            .subscriptions
            .read()
            .map_err(|_| StoreError::Poisoned("subscription"))?;
        let mut out: Vec<_> = subs
            .values()
            .filter(|s| s.customer_id() == customer_id)
            .cloned()
            .collect();
        out.sort_by_key(|s| s.id());
        Ok(out)
    }
}
