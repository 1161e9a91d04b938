//! Mapping document changes to billing events and publishing them.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use bss_core::AggregateRoot;
use bss_documents::{BillableDocument, DocumentKind};
use bss_events::{BillingEvent, Event, EventBus, EventEnvelope, InvoiceNotice};
use bss_invoicing::{Invoice, InvoiceKind, InvoiceStatus};
use bss_sales::OrderKind;

/// Events a document kind raises when it is created or changed.
pub trait DocumentNotifications: DocumentKind {
    /// Aggregate type stamped on published envelopes.
    const AGGREGATE_TYPE: &'static str;

    fn on_created(_document: &BillableDocument<Self>, _at: DateTime<Utc>) -> Option<BillingEvent> {
        None
    }

    fn on_changed(
        _before: &BillableDocument<Self>,
        _after: &BillableDocument<Self>,
        _at: DateTime<Utc>,
    ) -> Option<BillingEvent> {
        None
    }
}

impl DocumentNotifications for InvoiceKind {
    const AGGREGATE_TYPE: &'static str = "billing.invoice";

    fn on_created(document: &Invoice, at: DateTime<Utc>) -> Option<BillingEvent> {
        Some(BillingEvent::InvoiceGenerated(invoice_notice(document, at)))
    }

    fn on_changed(before: &Invoice, after: &Invoice, at: DateTime<Utc>) -> Option<BillingEvent> {
        if before.status() == after.status() {
            return None;
        }
        match after.status() {
            InvoiceStatus::Paid => Some(BillingEvent::InvoicePaid(invoice_notice(after, at))),
            InvoiceStatus::Overdue => Some(BillingEvent::InvoiceOverdue(invoice_notice(after, at))),
            _ => None,
        }
    }
}

impl DocumentNotifications for OrderKind {
    const AGGREGATE_TYPE: &'static str = "sales.order";
}

pub fn invoice_notice(invoice: &Invoice, at: DateTime<Utc>) -> InvoiceNotice {
    InvoiceNotice {
        invoice_id: invoice.id().0,
        invoice_number: invoice.number().to_string(),
        customer_id: invoice.customer_id(),
        order_reference: invoice.details().order_reference.clone(),
        total_amount: invoice.total_amount(),
        currency: invoice.currency().to_string(),
        status: invoice.status().to_string(),
        occurred_at: at,
    }
}

/// Publish `event` for a stored document.
///
/// The state change is already durable; a bus failure is logged, not returned.
pub(crate) fn publish_for<K, B>(bus: &B, document: &BillableDocument<K>, event: BillingEvent)
where
    K: DocumentNotifications,
    B: EventBus<EventEnvelope<BillingEvent>>,
{
    let event_type = event.event_type();
    let envelope = EventEnvelope::wrap(
        document.id().0,
        K::AGGREGATE_TYPE,
        document.version(),
        event,
    );

    match bus.publish(envelope) {
        Ok(()) => debug!(
            event_type,
            document = %document.number(),
            version = document.version(),
            "event published"
        ),
        Err(err) => warn!(
            event_type,
            document = %document.number(),
            error = ?err,
            "event publication failed after the change was stored"
        ),
    }
}
