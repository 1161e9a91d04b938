//! Events published by the billing core for downstream collaborators
//! (notifications, event-bus consumers), plus the bus and handler-table
//! mechanics used to deliver them.

pub mod billing;
pub mod bus;
pub mod envelope;
pub mod event;
pub mod handler;
pub mod in_memory_bus;

pub use billing::{BillingEvent, INVOICE_GENERATED, INVOICE_OVERDUE, INVOICE_PAID, InvoiceNotice};
pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use handler::{DispatchReport, HandlerError, HandlerTable, HandlerTableBuilder};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
