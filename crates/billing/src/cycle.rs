use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bss_core::{
    AggregateId, AggregateRoot, CustomerId, DomainError, DomainResult, Period, TransitionTable,
    labelled_enum,
};
use bss_invoicing::InvoiceId;

pub type BillingCycleId = AggregateId;

labelled_enum! {
    pub enum BillingCycleStatus {
        Pending => "PENDING",
        Processing => "PROCESSING",
        Processed => "PROCESSED",
        Failed => "FAILED",
    }
}

/// PROCESSED and FAILED are terminal.
pub static BILLING_CYCLE_TRANSITIONS: TransitionTable<BillingCycleStatus> = TransitionTable::new(
    "billing cycle",
    &[
        (BillingCycleStatus::Pending, &[BillingCycleStatus::Processing]),
        (
            BillingCycleStatus::Processing,
            &[BillingCycleStatus::Processed, BillingCycleStatus::Failed],
        ),
    ],
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBillingCycle {
    pub customer_id: CustomerId,
    pub cycle_start: NaiveDate,
    pub cycle_end: NaiveDate,
    pub billing_date: NaiveDate,
    /// Free text, e.g. "MONTHLY" or "2025-01".
    pub period_label: String,
}

/// Billing window for one customer.
///
/// Per customer no two cycles overlap; the store enforces that when a cycle
/// is inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingCycle {
    id: BillingCycleId,
    customer_id: CustomerId,
    period: Period,
    billing_date: NaiveDate,
    period_label: String,
    status: BillingCycleStatus,
    processed_at: Option<DateTime<Utc>>,
    invoice_count: u32,
    total_amount: Decimal,
    invoice_ids: Vec<InvoiceId>,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    version: u64,
}

impl BillingCycle {
    pub fn open(
        id: BillingCycleId,
        input: NewBillingCycle,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if input.cycle_start >= input.cycle_end {
            return Err(DomainError::validation(format!(
                "cycle start {} must be before cycle end {}",
                input.cycle_start, input.cycle_end
            )));
        }
        let period_label = input.period_label.trim().to_string();
        if period_label.is_empty() {
            return Err(DomainError::validation("billing period label is required"));
        }

        Ok(Self {
            id,
            customer_id: input.customer_id,
            period: Period::new(input.cycle_start, input.cycle_end)?,
            billing_date: input.billing_date,
            period_label,
            status: BillingCycleStatus::Pending,
            processed_at: None,
            invoice_count: 0,
            total_amount: Decimal::ZERO,
            invoice_ids: Vec::new(),
            failure_reason: None,
            created_at,
            version: 1,
        })
    }

    /// Same customer and intersecting windows (boundary days included).
    pub fn overlaps(&self, other: &BillingCycle) -> bool {
        self.customer_id == other.customer_id && self.period.overlaps(&other.period)
    }

    pub fn start_processing(&self) -> DomainResult<Self> {
        self.transition(BillingCycleStatus::Processing)
    }

    pub fn complete(
        &self,
        invoice_ids: Vec<InvoiceId>,
        total_amount: Decimal,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let mut next = self.transition(BillingCycleStatus::Processed)?;
        next.invoice_count = u32::try_from(invoice_ids.len())
            .map_err(|_| DomainError::invariant("too many invoices for one cycle"))?;
        next.invoice_ids = invoice_ids;
        next.total_amount = total_amount;
        next.processed_at = Some(at);
        Ok(next)
    }

    pub fn fail(&self, reason: impl Into<String>) -> DomainResult<Self> {
        let mut next = self.transition(BillingCycleStatus::Failed)?;
        next.failure_reason = Some(reason.into());
        Ok(next)
    }

    fn transition(&self, to: BillingCycleStatus) -> DomainResult<Self> {
        BILLING_CYCLE_TRANSITIONS.check(self.status, to)?;
        let mut next = self.clone();
        next.status = to;
        next.version = self.version + 1;
        Ok(next)
    }

    pub fn id_typed(&self) -> BillingCycleId {
        self.id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn billing_date(&self) -> NaiveDate {
        self.billing_date
    }

    pub fn period_label(&self) -> &str {
        &self.period_label
    }

    pub fn status(&self) -> BillingCycleStatus {
        self.status
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    pub fn invoice_count(&self) -> u32 {
        self.invoice_count
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn invoice_ids(&self) -> &[InvoiceId] {
        &self.invoice_ids
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl AggregateRoot for BillingCycle {
    type Id = BillingCycleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
