use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bss_core::money::{checked_sum, currency_code};
use bss_core::{AggregateId, AggregateRoot, CustomerId, DomainError, DomainResult, ItemId};

use crate::item::{ItemChange, LineItem, NewLineItem};
use crate::kind::DocumentKind;

/// Identifier of a billable document (invoice or order).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub AggregateId);

impl DocumentId {
    pub fn new() -> Self {
        Self(AggregateId::new())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::str::FromStr for DocumentId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<AggregateId>().map(Self)
    }
}

/// Input for [`BillableDocument::create`].
#[derive(Debug, Clone)]
pub struct NewDocument<K: DocumentKind> {
    pub id: DocumentId,
    pub number: String,
    pub customer_id: CustomerId,
    pub currency: String,
    pub details: K::Details,
    pub notes: Option<String>,
    pub items: Vec<NewLineItem>,
    pub created_at: DateTime<Utc>,
}

/// Aggregate root shared by invoices and orders.
///
/// Invariants:
/// - at least one item at all times
/// - `total_amount` equals the sum of every item's final amount
/// - items change only while `K::is_editable(status)`
/// - every operation returns a new value with `version + 1`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct BillableDocument<K: DocumentKind> {
    id: DocumentId,
    number: String,
    customer_id: CustomerId,
    status: K::Status,
    currency: String,
    details: K::Details,
    notes: Option<String>,
    items: Vec<LineItem>,
    total_amount: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
}

impl<K: DocumentKind> BillableDocument<K> {
    pub fn create(input: NewDocument<K>) -> DomainResult<Self> {
        let number = input.number.trim().to_string();
        if number.is_empty() {
            return Err(DomainError::validation(format!(
                "{} number cannot be empty",
                K::NAME
            )));
        }
        if input.items.is_empty() {
            return Err(DomainError::validation(format!(
                "{} must have at least one item",
                K::NAME
            )));
        }
        K::validate_details(&input.details)?;

        let items = input
            .items
            .into_iter()
            .map(LineItem::new)
            .collect::<DomainResult<Vec<_>>>()?;

        Ok(Self {
            id: input.id,
            number,
            customer_id: input.customer_id,
            status: K::initial_status(),
            currency: currency_code(&input.currency)?,
            details: input.details,
            notes: input.notes,
            total_amount: sum_final(&items)?,
            items,
            created_at: input.created_at,
            updated_at: input.created_at,
            version: 1,
        })
    }

    pub fn id_typed(&self) -> DocumentId {
        self.id
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn status(&self) -> K::Status {
        self.status
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn details(&self) -> &K::Details {
        &self.details
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn item(&self, item_id: ItemId) -> Option<&LineItem> {
        self.items.iter().find(|i| i.id() == item_id)
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_editable(&self) -> bool {
        K::is_editable(self.status)
    }

    /// Move to `to` if the kind's transition table allows it.
    pub fn change_status(&self, to: K::Status, at: DateTime<Utc>) -> DomainResult<Self> {
        K::transitions().check(self.status, to)?;
        Ok(self.with_status(to, at))
    }

    /// Move along a system-derived edge (see [`DocumentKind::derived_transitions`]).
    pub fn apply_derived_status(&self, to: K::Status, at: DateTime<Utc>) -> DomainResult<Self> {
        match K::derived_transitions() {
            Some(table) => table.check(self.status, to)?,
            None => {
                return Err(DomainError::invalid_transition(K::NAME, self.status, to));
            }
        }
        Ok(self.with_status(to, at))
    }

    /// Cancel, recording the reason in the notes.
    pub fn cancel(&self, reason: &str, at: DateTime<Utc>) -> DomainResult<Self> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(DomainError::validation("cancellation reason cannot be empty"));
        }
        let mut next = self.change_status(K::cancelled_status(), at)?;
        next.notes = Some(reason.to_string());
        Ok(next)
    }

    /// Replace the free-text notes.
    pub fn annotate(&self, notes: Option<String>, at: DateTime<Utc>) -> Self {
        let mut next = self.bumped(at);
        next.notes = notes;
        next
    }

    pub fn add_item(&self, input: NewLineItem, at: DateTime<Utc>) -> DomainResult<Self> {
        self.ensure_editable()?;
        let item = LineItem::new(input)?;
        let mut next = self.bumped(at);
        next.items.push(item);
        next.recompute_total()?;
        Ok(next)
    }

    pub fn update_item(
        &self,
        item_id: ItemId,
        change: &ItemChange,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        self.ensure_editable()?;
        let idx = self.position(item_id)?;
        let updated = self.items[idx].apply(change)?;
        let mut next = self.bumped(at);
        next.items[idx] = updated;
        next.recompute_total()?;
        Ok(next)
    }

    pub fn remove_item(&self, item_id: ItemId, at: DateTime<Utc>) -> DomainResult<Self> {
        self.ensure_editable()?;
        let idx = self.position(item_id)?;
        if self.items.len() == 1 {
            return Err(DomainError::invariant(format!(
                "{} must keep at least one item",
                K::NAME
            )));
        }
        let mut next = self.bumped(at);
        next.items.remove(idx);
        next.recompute_total()?;
        Ok(next)
    }

    fn ensure_editable(&self) -> DomainResult<()> {
        if self.is_editable() {
            Ok(())
        } else {
            Err(DomainError::invariant(format!(
                "items of a {} in status {} cannot be modified",
                K::NAME,
                self.status
            )))
        }
    }

    fn position(&self, item_id: ItemId) -> DomainResult<usize> {
        self.items
            .iter()
            .position(|i| i.id() == item_id)
            .ok_or_else(|| DomainError::not_found("line item", item_id))
    }

    fn with_status(&self, to: K::Status, at: DateTime<Utc>) -> Self {
        let mut next = self.bumped(at);
        next.status = to;
        K::on_status_change(&mut next.details, to, at);
        next
    }

    fn bumped(&self, at: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.version = self.version + 1;
        next.updated_at = at;
        next
    }

    fn recompute_total(&mut self) -> DomainResult<()> {
        self.total_amount = sum_final(&self.items)?;
        Ok(())
    }
}

fn sum_final(items: &[LineItem]) -> DomainResult<Decimal> {
    checked_sum(items.iter().map(LineItem::final_amount))
}

impl<K: DocumentKind> AggregateRoot for BillableDocument<K> {
    type Id = DocumentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
