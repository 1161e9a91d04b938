//! Command execution pipeline for billable documents.
//!
//! ```text
//! Command
//!   ↓
//! 1. Load the current document
//!   ↓
//! 2. Check the caller's expected version
//!   ↓
//! 3. Decide (pure aggregate operation, returns the next value)
//!   ↓
//! 4. Store with compare-and-swap on the loaded version
//!   ↓
//! 5. Publish the resulting event, if any
//! ```
//!
//! Conflicts are returned as `StaleVersion` and never retried here.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use bss_core::{AggregateRoot, CustomerId, DomainError, ExpectedVersion, ItemId};
use bss_documents::{BillableDocument, DocumentId, ItemChange, NewDocument, NewLineItem};
use bss_events::{BillingEvent, EventBus, EventEnvelope};

use crate::error::{ServiceError, ServiceResult};
use crate::notify::{DocumentNotifications, publish_for};
use crate::numbering::DocumentNumberSequence;
use crate::store::DocumentStore;

/// A change requested on an existing document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentCommand<K: DocumentNotifications> {
    ChangeStatus(K::Status),
    Cancel { reason: String },
    Annotate(Option<String>),
    AddItem(NewLineItem),
    UpdateItem { item_id: ItemId, change: ItemChange },
    RemoveItem(ItemId),
}

impl<K: DocumentNotifications> DocumentCommand<K> {
    pub fn name(&self) -> &'static str {
        match self {
            DocumentCommand::ChangeStatus(_) => "change_status",
            DocumentCommand::Cancel { .. } => "cancel",
            DocumentCommand::Annotate(_) => "annotate",
            DocumentCommand::AddItem(_) => "add_item",
            DocumentCommand::UpdateItem { .. } => "update_item",
            DocumentCommand::RemoveItem(_) => "remove_item",
        }
    }

    /// Pure decision step.
    fn decide(
        self,
        document: &BillableDocument<K>,
        at: DateTime<Utc>,
    ) -> Result<BillableDocument<K>, DomainError> {
        match self {
            DocumentCommand::ChangeStatus(to) => document.change_status(to, at),
            DocumentCommand::Cancel { reason } => document.cancel(&reason, at),
            DocumentCommand::Annotate(notes) => Ok(document.annotate(notes, at)),
            DocumentCommand::AddItem(item) => document.add_item(item, at),
            DocumentCommand::UpdateItem { item_id, change } => {
                if change.is_empty() {
                    return Err(DomainError::validation("item change is empty"));
                }
                document.update_item(item_id, &change, at)
            }
            DocumentCommand::RemoveItem(item_id) => document.remove_item(item_id, at),
        }
    }
}

/// Input for [`DocumentDispatcher::create`]. Id, number and timestamps are
/// assigned by the dispatcher.
#[derive(Debug, Clone)]
pub struct CreateDocument<K: DocumentNotifications> {
    pub customer_id: CustomerId,
    /// Defaults to the configured currency.
    pub currency: Option<String>,
    pub details: K::Details,
    pub notes: Option<String>,
    pub items: Vec<NewLineItem>,
}

/// Creates and updates documents of one kind.
pub struct DocumentDispatcher<K: DocumentNotifications, B> {
    store: Arc<dyn DocumentStore<K>>,
    numbers: Arc<DocumentNumberSequence>,
    bus: B,
    default_currency: String,
}

impl<K, B> DocumentDispatcher<K, B>
where
    K: DocumentNotifications,
    B: EventBus<EventEnvelope<BillingEvent>>,
{
    pub fn new(
        store: Arc<dyn DocumentStore<K>>,
        numbers: Arc<DocumentNumberSequence>,
        bus: B,
        default_currency: impl Into<String>,
    ) -> Self {
        Self {
            store,
            numbers,
            bus,
            default_currency: default_currency.into(),
        }
    }

    pub fn get(&self, id: DocumentId) -> ServiceResult<BillableDocument<K>> {
        self.store
            .get(id)?
            .ok_or_else(|| DomainError::not_found(K::NAME, id).into())
    }

    pub fn find_by_number(&self, number: &str) -> ServiceResult<BillableDocument<K>> {
        self.store
            .find_by_number(number)?
            .ok_or_else(|| DomainError::not_found(K::NAME, number).into())
    }

    /// Create a document in the kind's initial status with the next number.
    pub fn create(&self, input: CreateDocument<K>) -> ServiceResult<BillableDocument<K>> {
        let now = Utc::now();
        let number = self.numbers.next(now.date_naive())?;

        let document = BillableDocument::create(NewDocument {
            id: DocumentId::new(),
            number,
            customer_id: input.customer_id,
            currency: input
                .currency
                .unwrap_or_else(|| self.default_currency.clone()),
            details: input.details,
            notes: input.notes,
            items: input.items,
            created_at: now,
        })?;
        self.store.insert(document.clone())?;

        info!(
            kind = K::NAME,
            document = %document.number(),
            customer = %document.customer_id(),
            total = %document.total_amount(),
            "document created"
        );

        if let Some(event) = K::on_created(&document, now) {
            publish_for(&self.bus, &document, event);
        }
        Ok(document)
    }

    /// Apply `command` to document `id` if it is still at `expected`.
    pub fn dispatch(
        &self,
        id: DocumentId,
        expected: ExpectedVersion,
        command: DocumentCommand<K>,
    ) -> ServiceResult<BillableDocument<K>> {
        // 1) Load
        let current = self.get(id)?;

        // 2) Check
        expected.check(current.version())?;

        // 3) Decide
        let now = Utc::now();
        let command_name = command.name();
        let next = command.decide(&current, now).inspect_err(|err| {
            warn!(
                kind = K::NAME,
                document = %current.number(),
                command = command_name,
                error = %err,
                "command rejected"
            )
        })?;

        // 4) Persist (CAS against the version we decided on)
        self.store
            .replace(next.clone(), ExpectedVersion::Exact(current.version()))
            .map_err(ServiceError::from)?;

        info!(
            kind = K::NAME,
            document = %next.number(),
            command = command_name,
            status = %next.status(),
            version = next.version(),
            "document updated"
        );

        // 5) Publish
        if let Some(event) = K::on_changed(&current, &next, now) {
            publish_for(&self.bus, &next, event);
        }
        Ok(next)
    }
}
