use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use bss_core::{DomainError, DomainResult, TransitionTable, labelled_enum};
use bss_documents::{BillableDocument, DocumentId, DocumentKind, NewDocument};

labelled_enum! {
    /// Order status lifecycle.
    pub enum OrderStatus {
        Draft => "DRAFT",
        Pending => "PENDING",
        Approved => "APPROVED",
        Rejected => "REJECTED",
        InProgress => "IN_PROGRESS",
        Processing => "PROCESSING",
        Completed => "COMPLETED",
        Cancelled => "CANCELLED",
    }
}

labelled_enum! {
    pub enum OrderType {
        New => "NEW",
        NewSubscription => "NEW_SUBSCRIPTION",
        Upgrade => "UPGRADE",
        Downgrade => "DOWNGRADE",
        Renewal => "RENEWAL",
        Service => "SERVICE",
        Termination => "TERMINATION",
    }
}

labelled_enum! {
    pub enum OrderPriority {
        Low => "LOW",
        Normal => "NORMAL",
        High => "HIGH",
        Urgent => "URGENT",
    }
}

/// REJECTED, CANCELLED and COMPLETED are terminal.
pub static ORDER_TRANSITIONS: TransitionTable<OrderStatus> = TransitionTable::new(
    "order",
    &[
        (
            OrderStatus::Draft,
            &[OrderStatus::Pending, OrderStatus::Cancelled],
        ),
        (
            OrderStatus::Pending,
            &[
                OrderStatus::Approved,
                OrderStatus::Rejected,
                OrderStatus::Cancelled,
            ],
        ),
        (
            OrderStatus::Approved,
            &[OrderStatus::InProgress, OrderStatus::Cancelled],
        ),
        (
            OrderStatus::InProgress,
            &[OrderStatus::Processing, OrderStatus::Cancelled],
        ),
        (OrderStatus::Processing, &[OrderStatus::Completed]),
    ],
);

/// Order-specific fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub order_type: OrderType,
    pub priority: OrderPriority,
    pub requested_date: Option<NaiveDate>,
    pub promised_date: Option<NaiveDate>,
    /// Stamped when the order reaches COMPLETED.
    pub completed_at: Option<DateTime<Utc>>,
    pub channel: Option<String>,
    pub sales_rep: Option<String>,
}

impl OrderDetails {
    pub fn new(order_type: OrderType) -> Self {
        Self {
            order_type,
            priority: OrderPriority::Normal,
            requested_date: None,
            promised_date: None,
            completed_at: None,
            channel: None,
            sales_rep: None,
        }
    }

    pub fn with_priority(mut self, priority: OrderPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_requested_date(mut self, date: NaiveDate) -> Self {
        self.requested_date = Some(date);
        self
    }

    pub fn with_promised_date(mut self, date: NaiveDate) -> Self {
        self.promised_date = Some(date);
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OrderKind;

impl DocumentKind for OrderKind {
    type Status = OrderStatus;
    type Details = OrderDetails;

    const NAME: &'static str = "order";

    fn initial_status() -> OrderStatus {
        OrderStatus::Draft
    }

    fn cancelled_status() -> OrderStatus {
        OrderStatus::Cancelled
    }

    fn transitions() -> &'static TransitionTable<OrderStatus> {
        &ORDER_TRANSITIONS
    }

    fn is_editable(status: OrderStatus) -> bool {
        matches!(status, OrderStatus::Draft | OrderStatus::Pending)
    }

    fn validate_details(details: &OrderDetails) -> DomainResult<()> {
        if let (Some(requested), Some(promised)) = (details.requested_date, details.promised_date)
        {
            if promised < requested {
                return Err(DomainError::validation(
                    "order promised date cannot precede the requested date",
                ));
            }
        }
        if details.completed_at.is_some() {
            return Err(DomainError::validation(
                "a new order cannot carry a completion date",
            ));
        }
        Ok(())
    }

    fn on_status_change(details: &mut OrderDetails, to: OrderStatus, at: DateTime<Utc>) {
        if to == OrderStatus::Completed {
            details.completed_at = Some(at);
        }
    }
}

/// Aggregate root: Order.
pub type Order = BillableDocument<OrderKind>;

pub type OrderId = DocumentId;

pub type NewOrder = NewDocument<OrderKind>;

#[cfg(test)]
mod tests {
    use super::*;
    use bss_core::{AggregateRoot, CustomerId};
    use bss_documents::{ItemType, NewLineItem};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 10, 12, 0, 0).unwrap()
    }

    fn router() -> NewLineItem {
        NewLineItem::new("Fibre router", ItemType::Product, 1, dec!(199.00), dec!(23))
    }

    fn draft_order() -> Order {
        Order::create(NewOrder {
            id: OrderId::new(),
            number: "ORD-202504-000001".to_string(),
            customer_id: CustomerId::new(),
            currency: "PLN".to_string(),
            details: OrderDetails::new(OrderType::NewSubscription).with_channel("WEB"),
            notes: None,
            items: vec![router()],
            created_at: test_time(),
        })
        .unwrap()
    }

    fn advance(order: &Order, path: &[OrderStatus]) -> Order {
        path.iter().fold(order.clone(), |o, to| {
            o.change_status(*to, test_time()).unwrap()
        })
    }

    #[test]
    fn new_order_starts_in_draft_with_normal_priority() {
        let order = draft_order();
        assert_eq!(order.status(), OrderStatus::Draft);
        assert_eq!(order.details().priority, OrderPriority::Normal);
        assert_eq!(order.total_amount(), dec!(244.77));
    }

    #[test]
    fn full_fulfilment_path_stamps_completion() {
        let completed = advance(
            &draft_order(),
            &[
                OrderStatus::Pending,
                OrderStatus::Approved,
                OrderStatus::InProgress,
                OrderStatus::Processing,
                OrderStatus::Completed,
            ],
        );
        assert_eq!(completed.status(), OrderStatus::Completed);
        assert_eq!(completed.details().completed_at, Some(test_time()));
        assert_eq!(completed.version(), 6);
    }

    #[test]
    fn processing_cannot_be_cancelled() {
        let processing = advance(
            &draft_order(),
            &[
                OrderStatus::Pending,
                OrderStatus::Approved,
                OrderStatus::InProgress,
                OrderStatus::Processing,
            ],
        );
        let err = processing.cancel("too late", test_time()).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                entity: "order",
                from: "PROCESSING".to_string(),
                to: "CANCELLED".to_string(),
            }
        );
    }

    #[test]
    fn items_editable_in_draft_and_pending_only() {
        let pending = advance(&draft_order(), &[OrderStatus::Pending]);
        let pending = pending.add_item(router(), test_time()).unwrap();
        assert_eq!(pending.items().len(), 2);

        let approved = pending.change_status(OrderStatus::Approved, test_time()).unwrap();
        let err = approved.add_item(router(), test_time()).unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) if msg.contains("APPROVED") => {}
            _ => panic!("Expected InvariantViolation for approved order"),
        }
    }

    #[test]
    fn rejected_is_terminal() {
        let rejected = advance(&draft_order(), &[OrderStatus::Pending, OrderStatus::Rejected]);
        for to in OrderStatus::ALL {
            assert!(rejected.change_status(*to, test_time()).is_err());
        }
    }

    #[test]
    fn promised_before_requested_is_rejected() {
        let details = OrderDetails::new(OrderType::Service)
            .with_requested_date(NaiveDate::from_ymd_opt(2025, 5, 10).unwrap())
            .with_promised_date(NaiveDate::from_ymd_opt(2025, 5, 1).unwrap());
        assert!(OrderKind::validate_details(&details).is_err());
    }
}
