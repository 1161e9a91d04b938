//! Integration tests for the full billing pipeline.
//!
//! Tests: Ingest → Rate → Cycle → Invoice → EventBus → HandlerTable
//!
//! Verifies:
//! - Rated usage and recurring fees end up on one invoice per cycle
//! - Overlapping cycles and concurrent claims are rejected atomically
//! - Optimistic concurrency conflicts on documents are detected

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use chrono::{NaiveDate, NaiveTime, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use bss_billing::{BillingCycleStatus, NewBillingCycle, NewSubscription, Subscription};
    use bss_core::{
        AggregateRoot, CustomerId, DomainError, ExpectedVersion, RatingRuleId, SubscriptionId,
    };
    use bss_events::{
        BillingEvent, Event, EventBus, EventEnvelope, HandlerError, HandlerTable, INVOICE_GENERATED,
        INVOICE_OVERDUE, INVOICE_PAID, InMemoryEventBus,
    };
    use bss_documents::{ItemType, NewLineItem};
    use bss_invoicing::{InvoiceDetails, InvoiceKind, InvoiceStatus};
    use bss_rating::{
        DestinationType, NewRatingRule, RatePeriod, RatingEngine, RatingRule, UsageType,
    };
    use bss_sales::{OrderDetails, OrderKind, OrderType};

    use crate::billing_cycles::{BillingCycleOrchestrator, BillingStores};
    use crate::command_dispatcher::{CreateDocument, DocumentCommand, DocumentDispatcher};
    use crate::config::BillingConfig;
    use crate::error::ServiceError;
    use crate::ingestion::{IngestUsageRecord, UsageIngestionGateway};
    use crate::store::{
        DocumentFilter, InMemoryDocumentStore, InMemoryRatingRuleStore, RatingRuleStore,
    };
    use crate::workers::EventDispatchWorker;

    type Bus = Arc<InMemoryEventBus<EventEnvelope<BillingEvent>>>;

    struct Harness {
        stores: BillingStores,
        rules: Arc<InMemoryRatingRuleStore>,
        bus: Bus,
        gateway: UsageIngestionGateway,
        billing: BillingCycleOrchestrator<Bus>,
        invoices: DocumentDispatcher<InvoiceKind, Bus>,
        orders: DocumentDispatcher<OrderKind, Bus>,
    }

    fn setup() -> Harness {
        bss_observability::tracing::init(bss_observability::LogFormat::Pretty);

        let config = BillingConfig::default();
        let stores = BillingStores::in_memory();
        let rules = Arc::new(InMemoryRatingRuleStore::new());
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let numbers = Arc::new(config.invoice_numbers());

        Harness {
            gateway: UsageIngestionGateway::new(
                stores.usage.clone(),
                rules.clone(),
                RatingEngine::new(config.tie_break),
            ),
            invoices: DocumentDispatcher::new(
                stores.invoices.clone(),
                numbers.clone(),
                bus.clone(),
                config.default_currency.clone(),
            ),
            orders: DocumentDispatcher::new(
                Arc::new(InMemoryDocumentStore::<OrderKind>::new()),
                Arc::new(config.order_numbers()),
                bus.clone(),
                config.default_currency.clone(),
            ),
            billing: BillingCycleOrchestrator::new(stores.clone(), numbers, bus.clone(), config),
            stores,
            rules,
            bus,
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn wait_until(mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        done()
    }

    fn subscribe(h: &Harness, customer_id: CustomerId, fee: Decimal) -> SubscriptionId {
        let subscription = Subscription::new(
            SubscriptionId::new(),
            NewSubscription {
                customer_id,
                product_code: "MOB-M".to_string(),
                product_name: "Mobile M".to_string(),
                monthly_fee: fee,
                currency: "PLN".to_string(),
                activated_on: d(2024, 6, 1),
                ends_on: None,
            },
            Utc::now(),
        )
        .unwrap();
        let id = subscription.id();
        h.stores.subscriptions.insert(subscription).unwrap();
        id
    }

    fn national_peak_voice(h: &Harness, unit_rate: Decimal) {
        let rule = RatingRule::new(
            RatingRuleId::new(),
            NewRatingRule {
                usage_type: UsageType::Voice,
                destination_type: Some(DestinationType::National),
                rate_period: Some(RatePeriod::Peak),
                unit_rate,
                minimum_units: dec!(1),
                currency: "PLN".to_string(),
                effective_from: d(2025, 1, 1),
                effective_to: d(2025, 12, 31),
                active: true,
            },
            Utc::now(),
        )
        .unwrap();
        h.rules.insert(rule).unwrap();
    }

    fn voice_call(subscription_id: SubscriptionId, on: NaiveDate, minutes: Decimal) -> IngestUsageRecord {
        IngestUsageRecord {
            subscription_id: subscription_id.to_string(),
            usage_type: "VOICE".to_string(),
            unit: "MINUTES".to_string(),
            quantity: Some(minutes),
            usage_date: Some(on),
            usage_time: NaiveTime::from_hms_opt(10, 15, 0),
            destination_type: Some("NATIONAL".to_string()),
            destination_number: Some("+48221234567".to_string()),
            network_id: Some("26001".to_string()),
            rate_period: Some("PEAK".to_string()),
            source: Some("MSC-WAW-1".to_string()),
            source_file: None,
        }
    }

    fn data_session(subscription_id: SubscriptionId, on: NaiveDate) -> IngestUsageRecord {
        IngestUsageRecord {
            usage_type: "DATA".to_string(),
            unit: "MB".to_string(),
            quantity: Some(dec!(512)),
            destination_type: None,
            destination_number: None,
            rate_period: None,
            ..voice_call(subscription_id, on, dec!(0))
        }
    }

    fn january(customer_id: CustomerId) -> NewBillingCycle {
        NewBillingCycle {
            customer_id,
            cycle_start: d(2025, 1, 1),
            cycle_end: d(2025, 1, 31),
            billing_date: d(2025, 2, 1),
            period_label: "2025-01".to_string(),
        }
    }

    #[test]
    fn usage_to_paid_invoice_end_to_end() {
        let h = setup();
        let seen: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let table = HandlerTable::<BillingEvent>::builder()
            .on_any("audit", 0, move |env: &EventEnvelope<BillingEvent>| {
                recorder.lock().unwrap().push(env.payload().event_type());
                Ok(())
            })
            .build();
        let worker = EventDispatchWorker::spawn("billing-events", h.bus.clone(), Arc::new(table))
            .unwrap();

        let customer = CustomerId::new();
        let line = subscribe(&h, customer, dec!(49.99));
        national_peak_voice(&h, dec!(0.50));

        let first = h.gateway.ingest(voice_call(line, d(2025, 1, 10), dec!(15))).unwrap();
        assert!(first.rated);
        assert_eq!(first.net_amount, Some(dec!(7.50)));
        h.gateway.ingest(voice_call(line, d(2025, 1, 20), dec!(10))).unwrap();
        // Outside the cycle window: rated, but not billed in January.
        h.gateway.ingest(voice_call(line, d(2025, 2, 2), dec!(30))).unwrap();
        // No data rule: stays unrated and is visible as such.
        let data = h.gateway.ingest(data_session(line, d(2025, 1, 12))).unwrap();
        assert!(!data.rated);
        assert_eq!(h.gateway.unrated().unwrap().len(), 1);

        let cycle = h.billing.start_cycle(january(customer)).unwrap();
        let processed = h.billing.process_cycle(cycle.id_typed()).unwrap();
        let invoice = processed.invoice.unwrap();

        // voice 12.50 + tax 2.88; fee 49.99 + tax 11.50
        assert_eq!(invoice.items().len(), 2);
        assert_eq!(invoice.items()[0].unit_price(), dec!(12.50));
        assert_eq!(invoice.total_amount(), dec!(76.87));
        assert_eq!(processed.cycle.total_amount(), dec!(76.87));
        assert_eq!(invoice.details().billing_period, Some(cycle.period()));

        let sent = h
            .invoices
            .dispatch(
                invoice.id_typed(),
                ExpectedVersion::Exact(invoice.version()),
                DocumentCommand::ChangeStatus(InvoiceStatus::Sent),
            )
            .unwrap();
        h.invoices
            .dispatch(
                sent.id_typed(),
                ExpectedVersion::Exact(sent.version()),
                DocumentCommand::ChangeStatus(InvoiceStatus::Paid),
            )
            .unwrap();

        assert!(wait_until(|| seen.lock().unwrap().len() == 2));
        assert_eq!(*seen.lock().unwrap(), vec![INVOICE_GENERATED, INVOICE_PAID]);
        worker.shutdown();
    }

    #[test]
    fn overlapping_cycle_start_is_rejected_under_concurrency() {
        let h = setup();
        let customer = CustomerId::new();

        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let h = &h;
                    s.spawn(move || {
                        h.billing.start_cycle(NewBillingCycle {
                            cycle_start: d(2025, 1, 1 + i),
                            ..january(customer)
                        })
                    })
                })
                .collect();
            handles.into_iter().map(|j| j.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, ServiceError::Domain(DomainError::Conflict(_)))));
        assert_eq!(h.billing.cycles_for(customer).unwrap().len(), 1);
    }

    #[test]
    fn overlap_scenario_from_adjacent_and_clashing_windows() {
        let h = setup();
        let customer = CustomerId::new();
        let existing = h.billing.start_cycle(january(customer)).unwrap();

        let err = h
            .billing
            .start_cycle(NewBillingCycle {
                cycle_start: d(2025, 1, 15),
                cycle_end: d(2025, 2, 14),
                billing_date: d(2025, 2, 15),
                ..january(customer)
            })
            .unwrap_err();
        match err {
            ServiceError::Domain(DomainError::Conflict(msg)) => {
                assert!(msg.contains(&existing.id_typed().to_string()))
            }
            other => panic!("Expected Conflict, got {other:?}"),
        }

        h.billing
            .start_cycle(NewBillingCycle {
                cycle_start: d(2025, 2, 1),
                cycle_end: d(2025, 2, 28),
                billing_date: d(2025, 3, 1),
                ..january(customer)
            })
            .unwrap();
    }

    #[test]
    fn concurrent_processing_bills_a_cycle_once() {
        let h = setup();
        let customer = CustomerId::new();
        subscribe(&h, customer, dec!(30));
        let cycle_id = h.billing.start_cycle(january(customer)).unwrap().id_typed();

        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let h = &h;
                    s.spawn(move || h.billing.process_cycle(cycle_id))
                })
                .collect();
            handles.into_iter().map(|j| j.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(matches!(
                err,
                ServiceError::Domain(
                    DomainError::StaleVersion { .. } | DomainError::InvalidTransition { .. }
                )
            ));
        }
        let invoices = h
            .stores
            .invoices
            .list(&DocumentFilter::default().for_customer(customer))
            .unwrap();
        assert_eq!(invoices.len(), 1);
        assert_eq!(
            h.billing.cycle(cycle_id).unwrap().status(),
            BillingCycleStatus::Processed
        );
    }

    #[test]
    fn concurrent_document_updates_have_one_winner() {
        let h = setup();
        let customer = CustomerId::new();
        subscribe(&h, customer, dec!(30));
        let cycle = h.billing.start_cycle(january(customer)).unwrap();
        let invoice = h
            .billing
            .process_cycle(cycle.id_typed())
            .unwrap()
            .invoice
            .unwrap();

        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = [InvoiceStatus::Sent, InvoiceStatus::Cancelled]
                .into_iter()
                .map(|status| {
                    let h = &h;
                    let invoice = &invoice;
                    s.spawn(move || {
                        h.invoices.dispatch(
                            invoice.id_typed(),
                            ExpectedVersion::Exact(invoice.version()),
                            DocumentCommand::ChangeStatus(status),
                        )
                    })
                })
                .collect();
            handles.into_iter().map(|j| j.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert!(loser.is_conflict());
        assert_eq!(h.invoices.get(invoice.id_typed()).unwrap().version(), 2);
    }

    #[test]
    fn failing_handler_does_not_block_lower_priorities() {
        let h = setup();
        let delivered: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = delivered.clone();
        let table = HandlerTable::<BillingEvent>::builder()
            .on(INVOICE_GENERATED, "mailer", 10, |_env: &EventEnvelope<BillingEvent>| {
                Err(HandlerError::new("smtp unavailable"))
            })
            .on(INVOICE_GENERATED, "ledger", 0, move |env: &EventEnvelope<BillingEvent>| {
                sink.lock()
                    .unwrap()
                    .push(env.payload().notice().invoice_number.clone());
                Ok(())
            })
            .build();
        assert_eq!(table.handler_names(), vec!["mailer", "ledger"]);
        let worker =
            EventDispatchWorker::spawn("billing-events", h.bus.clone(), Arc::new(table)).unwrap();

        let customer = CustomerId::new();
        subscribe(&h, customer, dec!(30));
        let cycle = h.billing.start_cycle(january(customer)).unwrap();
        let invoice = h
            .billing
            .process_cycle(cycle.id_typed())
            .unwrap()
            .invoice
            .unwrap();

        assert!(wait_until(|| !delivered.lock().unwrap().is_empty()));
        assert_eq!(*delivered.lock().unwrap(), vec![invoice.number().to_string()]);
        worker.shutdown();
    }

    #[test]
    fn parallel_ingestion_rates_every_record_exactly() {
        let h = setup();
        national_peak_voice(&h, dec!(0.25));
        let line = subscribe(&h, CustomerId::new(), dec!(0));

        let net: Decimal = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let h = &h;
                    s.spawn(move || {
                        (1..=25)
                            .map(|minutes| {
                                h.gateway
                                    .ingest(voice_call(line, d(2025, 3, 3), Decimal::from(minutes)))
                                    .unwrap()
                                    .net_amount
                                    .unwrap()
                            })
                            .sum::<Decimal>()
                    })
                })
                .collect();
            handles.into_iter().map(|j| j.join().unwrap()).sum()
        });

        // 8 × (1 + … + 25) minutes × 0.25
        assert_eq!(net, dec!(650));
        assert!(h.gateway.unrated().unwrap().is_empty());
    }

    #[test]
    fn overdue_sweep_publishes_overdue_notice() {
        let h = setup();
        let sub = h.bus.subscribe();
        let overdue_only = h
            .bus
            .subscribe_where(|env| env.payload().event_type() == INVOICE_OVERDUE);
        let customer = CustomerId::new();
        subscribe(&h, customer, dec!(30));
        let cycle = h.billing.start_cycle(january(customer)).unwrap();
        let invoice = h
            .billing
            .process_cycle(cycle.id_typed())
            .unwrap()
            .invoice
            .unwrap();
        h.invoices
            .dispatch(
                invoice.id_typed(),
                ExpectedVersion::Exact(1),
                DocumentCommand::ChangeStatus(InvoiceStatus::Sent),
            )
            .unwrap();

        let sweep = crate::overdue::OverdueSweep::new(h.stores.invoices.clone(), h.bus.clone());
        let marked = sweep.run(d(2025, 2, 16)).unwrap();
        assert_eq!(marked, vec![invoice.id_typed()]);

        let types: Vec<_> = sub.drain().iter().map(|e| e.payload().event_type()).collect();
        assert_eq!(types, vec![INVOICE_GENERATED, INVOICE_OVERDUE]);

        let overdue = overdue_only.drain();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].payload().notice().invoice_id, invoice.id_typed().0);
    }

    #[test]
    fn manual_invoice_references_an_order_numbered_from_config() {
        let h = setup();
        let sub = h.bus.subscribe();
        let customer = CustomerId::new();
        let router = || NewLineItem::new("Fibre router", ItemType::Product, 1, dec!(199), dec!(23));

        let order = h
            .orders
            .create(CreateDocument {
                customer_id: customer,
                currency: None,
                details: OrderDetails::new(OrderType::NewSubscription),
                notes: None,
                items: vec![router()],
            })
            .unwrap();
        assert!(order.number().starts_with("ORD-"));

        let mut details = InvoiceDetails::issued_on(d(2025, 3, 1), 14).unwrap();
        details.order_reference = Some(order.number().to_string());
        let invoice = h
            .invoices
            .create(CreateDocument {
                customer_id: customer,
                currency: None,
                details,
                notes: None,
                items: vec![router()],
            })
            .unwrap();
        assert!(invoice.number().starts_with("INV-"));
        assert_eq!(invoice.total_amount(), order.total_amount());

        let published = sub.drain();
        assert_eq!(published.len(), 1);
        let notice = published[0].payload().notice();
        assert_eq!(notice.order_reference.as_deref(), Some(order.number()));
        assert_eq!(notice.invoice_number, invoice.number());
    }
}
