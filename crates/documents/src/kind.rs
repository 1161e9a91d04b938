use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use bss_core::{DomainResult, TransitionTable};

/// Kind-specific behaviour of a [`BillableDocument`](crate::BillableDocument).
///
/// Implemented by zero-sized marker types (`Invoice`, `Order`) so the
/// document aggregate stays a single generic type.
pub trait DocumentKind:
    Copy + core::fmt::Debug + PartialEq + Eq + Send + Sync + 'static
{
    type Status: Copy
        + core::fmt::Debug
        + core::fmt::Display
        + PartialEq
        + Eq
        + Send
        + Sync
        + Serialize
        + DeserializeOwned
        + 'static;

    /// Kind-specific fields (dates, references, metadata).
    type Details: Clone
        + core::fmt::Debug
        + PartialEq
        + Eq
        + Send
        + Sync
        + Serialize
        + DeserializeOwned;

    /// Entity name used in errors and logs.
    const NAME: &'static str;

    fn initial_status() -> Self::Status;

    fn cancelled_status() -> Self::Status;

    /// Transitions reachable through `change_status`.
    fn transitions() -> &'static TransitionTable<Self::Status>;

    /// Transitions the system derives from time or external facts; never
    /// reachable through `change_status`.
    fn derived_transitions() -> Option<&'static TransitionTable<Self::Status>> {
        None
    }

    /// Statuses in which items may be added, updated or removed.
    fn is_editable(status: Self::Status) -> bool;

    fn validate_details(_details: &Self::Details) -> DomainResult<()> {
        Ok(())
    }

    /// Bookkeeping after a successful status change (e.g. completion dates).
    fn on_status_change(_details: &mut Self::Details, _to: Self::Status, _at: DateTime<Utc>) {}
}
