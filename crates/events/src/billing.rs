//! Invoice lifecycle events published to downstream collaborators.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bss_core::{AggregateId, CustomerId};

use crate::event::Event;

pub const INVOICE_GENERATED: &str = "billing.invoice.generated";
pub const INVOICE_PAID: &str = "billing.invoice.paid";
pub const INVOICE_OVERDUE: &str = "billing.invoice.overdue";

/// Snapshot of an invoice at the moment an event was raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceNotice {
    pub invoice_id: AggregateId,
    pub invoice_number: String,
    pub customer_id: CustomerId,
    pub order_reference: Option<String>,
    pub total_amount: Decimal,
    pub currency: String,
    pub status: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum BillingEvent {
    InvoiceGenerated(InvoiceNotice),
    InvoicePaid(InvoiceNotice),
    InvoiceOverdue(InvoiceNotice),
}

impl BillingEvent {
    pub fn notice(&self) -> &InvoiceNotice {
        match self {
            BillingEvent::InvoiceGenerated(n)
            | BillingEvent::InvoicePaid(n)
            | BillingEvent::InvoiceOverdue(n) => n,
        }
    }
}

impl Event for BillingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BillingEvent::InvoiceGenerated(_) => INVOICE_GENERATED,
            BillingEvent::InvoicePaid(_) => INVOICE_PAID,
            BillingEvent::InvoiceOverdue(_) => INVOICE_OVERDUE,
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.notice().occurred_at
    }
}
