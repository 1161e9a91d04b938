use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use bss_core::{AggregateId, DomainError, DomainResult, Period, TransitionTable, labelled_enum};
use bss_documents::{BillableDocument, DocumentId, DocumentKind, NewDocument};

labelled_enum! {
    /// Invoice status lifecycle.
    pub enum InvoiceStatus {
        Draft => "DRAFT",
        Sent => "SENT",
        Viewed => "VIEWED",
        Paid => "PAID",
        Overdue => "OVERDUE",
        Cancelled => "CANCELLED",
    }
}

/// Status changes an invoice accepts on request. PAID, OVERDUE and CANCELLED
/// are terminal.
pub static INVOICE_TRANSITIONS: TransitionTable<InvoiceStatus> = TransitionTable::new(
    "invoice",
    &[
        (
            InvoiceStatus::Draft,
            &[InvoiceStatus::Sent, InvoiceStatus::Cancelled],
        ),
        (
            InvoiceStatus::Sent,
            &[
                InvoiceStatus::Viewed,
                InvoiceStatus::Paid,
                InvoiceStatus::Cancelled,
            ],
        ),
        (
            InvoiceStatus::Viewed,
            &[InvoiceStatus::Paid, InvoiceStatus::Cancelled],
        ),
    ],
);

/// SENT → OVERDUE, taken only by [`InvoiceLifecycle::mark_overdue`].
pub static INVOICE_DERIVED_TRANSITIONS: TransitionTable<InvoiceStatus> =
    TransitionTable::new("invoice", &[(InvoiceStatus::Sent, &[InvoiceStatus::Overdue])]);

/// Invoice-specific fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDetails {
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub billing_period: Option<Period>,
    pub billing_date: Option<NaiveDate>,
    pub order_reference: Option<String>,
    /// Billing cycle that generated the invoice, if any.
    pub billing_cycle_id: Option<AggregateId>,
}

impl InvoiceDetails {
    /// Details for an invoice issued on `invoice_date`, due `payment_terms_days` later.
    pub fn issued_on(invoice_date: NaiveDate, payment_terms_days: u32) -> DomainResult<Self> {
        let due_date = invoice_date
            .checked_add_days(Days::new(u64::from(payment_terms_days)))
            .ok_or_else(|| DomainError::validation("due date out of range"))?;
        Ok(Self {
            invoice_date,
            due_date,
            billing_period: None,
            billing_date: None,
            order_reference: None,
            billing_cycle_id: None,
        })
    }

    pub fn with_billing_period(mut self, period: Period, billing_date: NaiveDate) -> Self {
        self.billing_period = Some(period);
        self.billing_date = Some(billing_date);
        self
    }

    pub fn with_order_reference(mut self, reference: impl Into<String>) -> Self {
        self.order_reference = Some(reference.into());
        self
    }

    pub fn with_billing_cycle(mut self, cycle_id: AggregateId) -> Self {
        self.billing_cycle_id = Some(cycle_id);
        self
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InvoiceKind;

impl DocumentKind for InvoiceKind {
    type Status = InvoiceStatus;
    type Details = InvoiceDetails;

    const NAME: &'static str = "invoice";

    fn initial_status() -> InvoiceStatus {
        InvoiceStatus::Draft
    }

    fn cancelled_status() -> InvoiceStatus {
        InvoiceStatus::Cancelled
    }

    fn transitions() -> &'static TransitionTable<InvoiceStatus> {
        &INVOICE_TRANSITIONS
    }

    fn derived_transitions() -> Option<&'static TransitionTable<InvoiceStatus>> {
        Some(&INVOICE_DERIVED_TRANSITIONS)
    }

    fn is_editable(status: InvoiceStatus) -> bool {
        status == InvoiceStatus::Draft
    }

    fn validate_details(details: &InvoiceDetails) -> DomainResult<()> {
        if details.due_date < details.invoice_date {
            return Err(DomainError::validation(
                "invoice due date cannot precede the invoice date",
            ));
        }
        Ok(())
    }
}

/// Aggregate root: Invoice.
pub type Invoice = BillableDocument<InvoiceKind>;

pub type InvoiceId = DocumentId;

pub type NewInvoice = NewDocument<InvoiceKind>;

/// Invoice behaviour on top of the shared document operations.
pub trait InvoiceLifecycle: Sized {
    /// SENT and past its due date as of `today`.
    fn is_past_due(&self, today: NaiveDate) -> bool;

    /// Derive OVERDUE for a SENT invoice whose due date has passed.
    fn mark_overdue(&self, today: NaiveDate, at: DateTime<Utc>) -> DomainResult<Self>;

    fn can_be_cancelled(&self) -> bool;
}

impl InvoiceLifecycle for Invoice {
    fn is_past_due(&self, today: NaiveDate) -> bool {
        self.status() == InvoiceStatus::Sent && today > self.details().due_date
    }

    fn mark_overdue(&self, today: NaiveDate, at: DateTime<Utc>) -> DomainResult<Self> {
        if self.status() == InvoiceStatus::Sent && today <= self.details().due_date {
            return Err(DomainError::invariant(format!(
                "invoice {} is not past its due date {}",
                self.number(),
                self.details().due_date
            )));
        }
        self.apply_derived_status(InvoiceStatus::Overdue, at)
    }

    fn can_be_cancelled(&self) -> bool {
        INVOICE_TRANSITIONS.allows(self.status(), InvoiceStatus::Cancelled)
    }
}
