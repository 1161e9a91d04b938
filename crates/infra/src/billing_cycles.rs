//! Billing cycle orchestration: open a cycle, then turn it into an invoice.
//!
//! ```text
//! PENDING ──claim (CAS)──▶ PROCESSING ──▶ PROCESSED
//!                                     └──▶ FAILED
//! ```
//!
//! Processing is one unit of work. If anything fails after the claim, the
//! invoice (when already stored) is removed again and the cycle ends FAILED
//! with the reason; the triggering error is returned.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use bss_billing::{BillingCycle, BillingCycleId, NewBillingCycle, collect_charges, draft_invoice};
use bss_core::{AggregateId, AggregateRoot, CustomerId, DomainError, ExpectedVersion};
use bss_events::{BillingEvent, EventBus, EventEnvelope};
use bss_invoicing::{Invoice, InvoiceId, InvoiceKind};

use crate::config::BillingConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::notify::{DocumentNotifications, publish_for};
use crate::numbering::DocumentNumberSequence;
use crate::store::{
    BillingCycleStore, DocumentStore, InMemoryBillingCycleStore, InMemoryDocumentStore,
    InMemorySubscriptionStore, InMemoryUsageStore, SubscriptionStore, UsageFilter, UsageStore,
};

/// Stores the orchestrator reads and writes.
#[derive(Clone)]
pub struct BillingStores {
    pub cycles: Arc<dyn BillingCycleStore>,
    pub subscriptions: Arc<dyn SubscriptionStore>,
    pub usage: Arc<dyn UsageStore>,
    pub invoices: Arc<dyn DocumentStore<InvoiceKind>>,
}

impl BillingStores {
    pub fn in_memory() -> Self {
        Self {
            cycles: Arc::new(InMemoryBillingCycleStore::new()),
            subscriptions: Arc::new(InMemorySubscriptionStore::new()),
            usage: Arc::new(InMemoryUsageStore::new()),
            invoices: Arc::new(InMemoryDocumentStore::<InvoiceKind>::new()),
        }
    }
}

/// Outcome of a successful [`BillingCycleOrchestrator::process_cycle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedCycle {
    pub cycle: BillingCycle,
    /// `None` when nothing was billable in the window.
    pub invoice: Option<Invoice>,
}

pub struct BillingCycleOrchestrator<B> {
    stores: BillingStores,
    numbers: Arc<DocumentNumberSequence>,
    bus: B,
    config: BillingConfig,
}

impl<B> BillingCycleOrchestrator<B>
where
    B: EventBus<EventEnvelope<BillingEvent>>,
{
    pub fn new(
        stores: BillingStores,
        numbers: Arc<DocumentNumberSequence>,
        bus: B,
        config: BillingConfig,
    ) -> Self {
        Self {
            stores,
            numbers,
            bus,
            config,
        }
    }

    pub fn config(&self) -> &BillingConfig {
        &self.config
    }

    /// Open a PENDING cycle. Overlap with another cycle of the same customer
    /// is a `Conflict`.
    pub fn start_cycle(&self, input: NewBillingCycle) -> ServiceResult<BillingCycle> {
        let cycle = BillingCycle::open(AggregateId::new(), input, Utc::now())?;

        if let Err(err) = self.stores.cycles.insert_if_no_overlap(cycle.clone()) {
            warn!(
                customer = %cycle.customer_id(),
                window = %cycle.period(),
                error = %err,
                "billing cycle rejected"
            );
            return Err(err.into());
        }

        info!(
            cycle = %cycle.id_typed(),
            customer = %cycle.customer_id(),
            window = %cycle.period(),
            label = cycle.period_label(),
            "billing cycle opened"
        );
        Ok(cycle)
    }

    pub fn cycle(&self, id: BillingCycleId) -> ServiceResult<BillingCycle> {
        self.stores
            .cycles
            .get(id)?
            .ok_or_else(|| DomainError::not_found("billing cycle", id).into())
    }

    pub fn cycles_for(&self, customer_id: CustomerId) -> ServiceResult<Vec<BillingCycle>> {
        Ok(self.stores.cycles.for_customer(customer_id)?)
    }

    /// Bill a PENDING cycle.
    pub fn process_cycle(&self, id: BillingCycleId) -> ServiceResult<ProcessedCycle> {
        let pending = self.cycle(id)?;
        let claimed = pending.start_processing()?;
        self.stores
            .cycles
            .replace(claimed.clone(), ExpectedVersion::Exact(pending.version()))?;

        info!(
            cycle = %id,
            customer = %claimed.customer_id(),
            window = %claimed.period(),
            "billing cycle processing"
        );

        let now = Utc::now();
        match self.bill(&claimed, now) {
            Ok(processed) => {
                info!(
                    cycle = %id,
                    invoices = processed.cycle.invoice_count(),
                    total = %processed.cycle.total_amount(),
                    "billing cycle processed"
                );
                if let Some(invoice) = &processed.invoice {
                    if let Some(event) = InvoiceKind::on_created(invoice, now) {
                        publish_for(&self.bus, invoice, event);
                    }
                }
                Ok(processed)
            }
            Err(err) => {
                self.mark_failed(&claimed, &err);
                Err(err)
            }
        }
    }

    fn bill(&self, claimed: &BillingCycle, now: DateTime<Utc>) -> ServiceResult<ProcessedCycle> {
        let currency = self.config.default_currency.as_str();
        let subscriptions = self
            .stores
            .subscriptions
            .for_customer(claimed.customer_id())?;
        let period = claimed.period();
        let usage = self.stores.usage.query(
            &UsageFilter::rated()
                .for_subscriptions(
                    subscriptions
                        .iter()
                        .filter(|s| s.bills_usage_in(&period))
                        .map(|s| s.id()),
                )
                .within(period),
        )?;

        let charges = collect_charges(claimed, &subscriptions, &usage, &self.config.tax, currency)?;
        if charges.is_empty() {
            let cycle = self.finish(claimed, Vec::new(), Decimal::ZERO, now)?;
            return Ok(ProcessedCycle {
                cycle,
                invoice: None,
            });
        }

        let number = self.numbers.next(claimed.billing_date())?;
        let invoice = Invoice::create(draft_invoice(
            claimed,
            InvoiceId::new(),
            number,
            currency,
            self.config.payment_terms_days,
            charges,
            now,
        )?)?;
        self.stores.invoices.insert(invoice.clone())?;

        match self.finish(claimed, vec![invoice.id_typed()], invoice.total_amount(), now) {
            Ok(cycle) => Ok(ProcessedCycle {
                cycle,
                invoice: Some(invoice),
            }),
            Err(err) => {
                if let Err(remove_err) = self.stores.invoices.remove(invoice.id_typed()) {
                    error!(
                        invoice = %invoice.number(),
                        error = %remove_err,
                        "could not remove invoice of failed billing cycle"
                    );
                }
                Err(err)
            }
        }
    }

    fn finish(
        &self,
        claimed: &BillingCycle,
        invoice_ids: Vec<InvoiceId>,
        total: Decimal,
        now: DateTime<Utc>,
    ) -> ServiceResult<BillingCycle> {
        let processed = claimed.complete(invoice_ids, total, now)?;
        self.stores
            .cycles
            .replace(processed.clone(), ExpectedVersion::Exact(claimed.version()))?;
        Ok(processed)
    }

    fn mark_failed(&self, claimed: &BillingCycle, cause: &ServiceError) {
        error!(
            cycle = %claimed.id_typed(),
            customer = %claimed.customer_id(),
            error = %cause,
            "billing cycle failed"
        );

        let stored = claimed
            .fail(cause.to_string())
            .map_err(ServiceError::from)
            .and_then(|failed| {
                self.stores
                    .cycles
                    .replace(failed, ExpectedVersion::Exact(claimed.version()))
                    .map_err(ServiceError::from)
            });
        if let Err(err) = stored {
            error!(
                cycle = %claimed.id_typed(),
                error = %err,
                "could not record billing cycle failure"
            );
        }
    }
}
