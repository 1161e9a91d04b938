use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use bss_billing::{NewBillingCycle, NewSubscription, Subscription};
use bss_core::{CustomerId, RatingRuleId, SubscriptionId, UsageRecordId};
use bss_events::{BillingEvent, EventEnvelope, InMemoryEventBus};
use bss_infra::store::{InMemoryRatingRuleStore, RatingRuleStore, SubscriptionStore};
use bss_infra::{
    BillingConfig, BillingCycleOrchestrator, BillingStores, DocumentNumberSequence,
    IngestUsageRecord, UsageIngestionGateway,
};
use bss_rating::{
    DestinationType, NewRatingRule, NewUsageRecord, RatePeriod, RatingEngine, RatingRule,
    RuleTieBreak, UsageRecord, UsageType, UsageUnit,
};
use chrono::{Days, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// `n` overlapping voice rules; windows shrink as `i` grows.
fn rules(n: u64) -> Vec<RatingRule> {
    (0..n)
        .map(|i| {
            RatingRule::new(
                RatingRuleId::new(),
                NewRatingRule {
                    usage_type: UsageType::Voice,
                    destination_type: Some(DestinationType::National),
                    rate_period: Some(RatePeriod::Peak),
                    unit_rate: dec!(0.50),
                    minimum_units: dec!(1),
                    currency: "PLN".to_string(),
                    effective_from: d(2025, 1, 1).checked_add_days(Days::new(i)).unwrap(),
                    effective_to: d(2025, 12, 31),
                    active: true,
                },
                Utc::now(),
            )
            .unwrap()
        })
        .collect()
}

fn voice_record(subscription_id: SubscriptionId) -> UsageRecord {
    UsageRecord::new(
        UsageRecordId::new(),
        NewUsageRecord {
            subscription_id,
            usage_type: UsageType::Voice,
            unit: UsageUnit::Minutes,
            quantity: dec!(15),
            occurred_at: d(2025, 6, 15).and_hms_opt(12, 0, 0).unwrap(),
            destination_type: Some(DestinationType::National),
            destination_number: None,
            network_id: None,
            rate_period: Some(RatePeriod::Peak),
            source: "bench".to_string(),
            source_file: None,
        },
        Utc::now(),
    )
    .unwrap()
}

fn voice_call(subscription_id: SubscriptionId, minutes: u32) -> IngestUsageRecord {
    IngestUsageRecord {
        subscription_id: subscription_id.to_string(),
        usage_type: "VOICE".to_string(),
        unit: "MINUTES".to_string(),
        quantity: Some(Decimal::from(minutes)),
        usage_date: Some(d(2025, 1, 15)),
        usage_time: NaiveTime::from_hms_opt(9, 0, 0),
        destination_type: Some("NATIONAL".to_string()),
        rate_period: Some("PEAK".to_string()),
        source: Some("bench".to_string()),
        ..IngestUsageRecord::default()
    }
}

fn bench_rule_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("rule_selection");
    let record = voice_record(SubscriptionId::new());
    let engine = RatingEngine::new(RuleTieBreak::NarrowestWindow);

    for n in [1u64, 10, 100] {
        let candidates = rules(n);
        group.bench_with_input(BenchmarkId::new("candidates", n), &candidates, |b, candidates| {
            b.iter(|| black_box(engine.rate(black_box(&record), candidates, Utc::now())));
        });
    }

    group.finish();
}

fn bench_ingestion_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingestion");
    group.throughput(Throughput::Elements(100));

    group.bench_function("ingest_and_rate_100", |b| {
        b.iter_with_setup(
            || {
                let stores = BillingStores::in_memory();
                let rule_store = Arc::new(InMemoryRatingRuleStore::new());
                for rule in rules(5) {
                    rule_store.insert(rule).unwrap();
                }
                UsageIngestionGateway::new(stores.usage, rule_store, RatingEngine::default())
            },
            |gateway| {
                let subscription_id = SubscriptionId::new();
                for minutes in 1..=100 {
                    black_box(gateway.ingest(voice_call(subscription_id, minutes)).unwrap());
                }
            },
        );
    });

    group.finish();
}

fn bench_cycle_processing(c: &mut Criterion) {
    let mut group = c.benchmark_group("cycle_processing");

    for records in [10u32, 1_000] {
        group.throughput(Throughput::Elements(u64::from(records)));
        group.bench_with_input(BenchmarkId::new("usage_records", records), &records, |b, &records| {
            b.iter_with_setup(
                || {
                    let stores = BillingStores::in_memory();
                    let rule_store = Arc::new(InMemoryRatingRuleStore::new());
                    for rule in rules(3) {
                        rule_store.insert(rule).unwrap();
                    }
                    let customer_id = CustomerId::new();
                    let subscription = Subscription::new(
                        SubscriptionId::new(),
                        NewSubscription {
                            customer_id,
                            product_code: "MOB-L".to_string(),
                            product_name: "Mobile L".to_string(),
                            monthly_fee: dec!(79.99),
                            currency: "PLN".to_string(),
                            activated_on: d(2024, 1, 1),
                            ends_on: None,
                        },
                        Utc::now(),
                    )
                    .unwrap();
                    let subscription_id = subscription.id();
                    stores.subscriptions.insert(subscription).unwrap();

                    let gateway = UsageIngestionGateway::new(
                        stores.usage.clone(),
                        rule_store,
                        RatingEngine::default(),
                    );
                    for minutes in 1..=records {
                        gateway.ingest(voice_call(subscription_id, minutes % 60 + 1)).unwrap();
                    }

                    let bus = Arc::new(InMemoryEventBus::<EventEnvelope<BillingEvent>>::new());
                    let billing = BillingCycleOrchestrator::new(
                        stores,
                        Arc::new(DocumentNumberSequence::new("INV")),
                        bus,
                        BillingConfig::default(),
                    );
                    let cycle = billing
                        .start_cycle(NewBillingCycle {
                            customer_id,
                            cycle_start: d(2025, 1, 1),
                            cycle_end: d(2025, 1, 31),
                            billing_date: d(2025, 2, 1),
                            period_label: "2025-01".to_string(),
                        })
                        .unwrap();
                    (billing, cycle.id_typed())
                },
                |(billing, cycle_id)| {
                    black_box(billing.process_cycle(cycle_id).unwrap());
                },
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_rule_selection,
    bench_ingestion_throughput,
    bench_cycle_processing
);
criterion_main!(benches);
