//! Infrastructure layer: stores, services, configuration, background workers.

pub mod billing_cycles;
pub mod command_dispatcher;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod notify;
pub mod numbering;
pub mod overdue;
pub mod store;
pub mod workers;

pub use billing_cycles::{BillingCycleOrchestrator, BillingStores, ProcessedCycle};
pub use command_dispatcher::{CreateDocument, DocumentCommand, DocumentDispatcher};
pub use config::BillingConfig;
pub use error::{ServiceError, ServiceResult};
pub use ingestion::{IngestUsageRecord, IngestedUsage, RatingRun, UsageIngestionGateway};
pub use notify::{DocumentNotifications, invoice_notice};
pub use numbering::DocumentNumberSequence;
pub use overdue::OverdueSweep;
pub use workers::{EventDispatchWorker, WorkerHandle};

#[cfg(test)]
mod integration_tests;
