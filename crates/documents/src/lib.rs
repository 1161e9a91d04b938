//! Billable documents (invoices, orders).
//!
//! A [`BillableDocument`] is an immutable, versioned aggregate holding ordered
//! line items and a derived total. Every operation returns a new value with
//! `version + 1`; persistence adapters compare-and-swap on that version.
//!
//! The document kind ([`DocumentKind`]) supplies the status type, its
//! transition table, the editable statuses and kind-specific fields.

pub mod document;
pub mod item;
pub mod kind;

pub use document::{BillableDocument, DocumentId, NewDocument};
pub use item::{ItemChange, ItemStatus, ItemType, LineItem, NewLineItem};
pub use kind::DocumentKind;
