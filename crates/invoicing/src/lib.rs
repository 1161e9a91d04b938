//! Invoicing domain module.
//!
//! Invoices are billable documents with a fixed status lifecycle and an
//! overdue status derived from the due date. Pure domain logic (no IO).

pub mod invoice;

pub use invoice::{
    INVOICE_DERIVED_TRANSITIONS, INVOICE_TRANSITIONS, Invoice, InvoiceDetails, InvoiceId,
    InvoiceKind, InvoiceLifecycle, InvoiceStatus, NewInvoice,
};
