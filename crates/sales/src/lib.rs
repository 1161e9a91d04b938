//! Customer orders domain module.
//!
//! Orders are billable documents moving through an approval and fulfilment
//! lifecycle. Pure domain logic (no IO, no HTTP, no storage).

pub mod order;

pub use order::{
    NewOrder, ORDER_TRANSITIONS, Order, OrderDetails, OrderId, OrderKind, OrderPriority,
    OrderStatus, OrderType,
};
