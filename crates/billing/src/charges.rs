//! Turning a cycle's rated usage and recurring fees into invoice lines.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use bss_core::money::{checked_add, round_currency};
use bss_core::{DomainError, DomainResult, SubscriptionId};
use bss_documents::{ItemType, NewLineItem};
use bss_invoicing::{InvoiceDetails, InvoiceId, NewInvoice};
use bss_rating::{UsageRecord, UsageType};

use crate::cycle::BillingCycle;
use crate::subscription::Subscription;
use crate::tax::TaxPolicy;

/// Everything billable in one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleCharges {
    pub lines: Vec<NewLineItem>,
    /// Rated usage records folded into `lines`.
    pub usage_records: usize,
    /// Subscriptions whose recurring fee is in `lines`.
    pub recurring_fees: usize,
}

impl CycleCharges {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Collect the lines billed by `cycle`.
///
/// - one line per (subscription, usage type): quantity 1, unit price = sum of
///   the rated net amounts, rounded to the currency scale
/// - one line per subscription whose fee is due in the cycle window
///
/// Only subscriptions of the cycle's customer count. Unrated records, records
/// outside the window and usage a subscription does not bill (suspended, or
/// outside its active window) are skipped. Every amount must be in `currency`.
pub fn collect_charges(
    cycle: &BillingCycle,
    subscriptions: &[Subscription],
    usage: &[UsageRecord],
    tax: &TaxPolicy,
    currency: &str,
) -> DomainResult<CycleCharges> {
    let owned: BTreeMap<SubscriptionId, &Subscription> = subscriptions
        .iter()
        .filter(|s| s.customer_id() == cycle.customer_id())
        .map(|s| (s.id(), s))
        .collect();

    let mut usage_totals: BTreeMap<(SubscriptionId, UsageType), (Decimal, usize)> = BTreeMap::new();
    for record in usage {
        let Some(subscription) = owned.get(&record.subscription_id()) else {
            continue;
        };
        if !cycle.period().contains(record.usage_date())
            || !subscription.bills_usage_on(record.usage_date())
        {
            continue;
        }
        let Some(rating) = record.rating() else {
            continue;
        };
        if rating.currency != currency {
            return Err(DomainError::invariant(format!(
                "usage record {} is rated in {}, cycle bills in {currency}",
                record.id(),
                rating.currency
            )));
        }
        let entry = usage_totals
            .entry((record.subscription_id(), record.usage_type()))
            .or_insert((Decimal::ZERO, 0));
        entry.0 = checked_add(entry.0, rating.net_amount)?;
        entry.1 += 1;
    }

    let mut lines = Vec::new();
    let mut usage_records = 0;
    for ((subscription_id, usage_type), (net, count)) in usage_totals {
        let product = owned
            .get(&subscription_id)
            .map(|s| s.product_name())
            .unwrap_or_default();
        lines.push(NewLineItem::new(
            format!("{usage_type} usage, {product} ({count} records)"),
            ItemType::Usage,
            1,
            round_currency(net),
            tax.usage_rate(usage_type),
        ));
        usage_records += count;
    }

    let mut recurring_fees = 0;
    for subscription in owned.values() {
        if !subscription.is_billable_in(&cycle.period()) {
            continue;
        }
        if subscription.currency() != currency {
            return Err(DomainError::invariant(format!(
                "subscription {} is priced in {}, cycle bills in {currency}",
                subscription.id(),
                subscription.currency()
            )));
        }
        lines.push(NewLineItem::new(
            format!("{} monthly fee", subscription.product_name()),
            ItemType::Subscription,
            1,
            round_currency(subscription.monthly_fee()),
            tax.default_rate(),
        ));
        recurring_fees += 1;
    }

    Ok(CycleCharges {
        lines,
        usage_records,
        recurring_fees,
    })
}

/// Draft invoice for a processed cycle: invoiced on the billing date, due
/// `payment_terms_days` later, covering the cycle window.
pub fn draft_invoice(
    cycle: &BillingCycle,
    id: InvoiceId,
    number: String,
    currency: &str,
    payment_terms_days: u32,
    charges: CycleCharges,
    at: DateTime<Utc>,
) -> DomainResult<NewInvoice> {
    let details = InvoiceDetails::issued_on(cycle.billing_date(), payment_terms_days)?
        .with_billing_period(cycle.period(), cycle.billing_date())
        .with_billing_cycle(cycle.id_typed());

    Ok(NewInvoice {
        id,
        number,
        customer_id: cycle.customer_id(),
        currency: currency.to_string(),
        details,
        notes: Some(format!("Billing cycle {}", cycle.period_label())),
        items: charges.lines,
        created_at: at,
    })
}
