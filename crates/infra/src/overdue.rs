//! Periodic sweep deriving OVERDUE for sent invoices past their due date.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use bss_core::{AggregateRoot, ExpectedVersion};
use bss_events::{BillingEvent, EventBus, EventEnvelope};
use bss_invoicing::{InvoiceId, InvoiceKind, InvoiceLifecycle, InvoiceStatus};

use crate::error::ServiceResult;
use crate::notify::{DocumentNotifications, publish_for};
use crate::store::{DocumentFilter, DocumentStore};

pub struct OverdueSweep<B> {
    invoices: Arc<dyn DocumentStore<InvoiceKind>>,
    bus: B,
}

impl<B> OverdueSweep<B>
where
    B: EventBus<EventEnvelope<BillingEvent>>,
{
    pub fn new(invoices: Arc<dyn DocumentStore<InvoiceKind>>, bus: B) -> Self {
        Self { invoices, bus }
    }

    /// Mark every SENT invoice whose due date is before `today` as OVERDUE.
    ///
    /// An invoice changed concurrently (stale version) is skipped and picked
    /// up by the next sweep if still past due.
    pub fn run(&self, today: NaiveDate) -> ServiceResult<Vec<InvoiceId>> {
        let sent = self
            .invoices
            .list(&DocumentFilter::with_status(InvoiceStatus::Sent))?;
        let now = Utc::now();
        let mut marked = Vec::new();

        for invoice in sent.iter().filter(|i| i.is_past_due(today)) {
            let overdue = invoice.mark_overdue(today, now)?;
            match self
                .invoices
                .replace(overdue.clone(), ExpectedVersion::Exact(invoice.version()))
            {
                Ok(()) => {}
                Err(err) if err.is_conflict() => {
                    warn!(invoice = %invoice.number(), error = %err, "invoice changed during overdue sweep; skipped");
                    continue;
                }
                Err(err) => return Err(err.into()),
            }

            if let Some(event) = InvoiceKind::on_changed(invoice, &overdue, now) {
                publish_for(&self.bus, &overdue, event);
            }
            marked.push(overdue.id_typed());
        }

        info!(%today, examined = sent.len(), marked = marked.len(), "overdue sweep finished");
        Ok(marked)
    }
}
