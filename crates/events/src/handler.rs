//! Event handler table.
//!
//! Handlers are registered once, at startup, through a [`HandlerTableBuilder`].
//! The built [`HandlerTable`] is immutable: it can be shared between threads
//! and handed to a dispatch worker, but never extended at runtime.
//!
//! Handlers run in descending priority; equal priorities keep registration
//! order. A failing handler does not stop the ones after it.

use thiserror::Error;

use crate::envelope::EventEnvelope;
use crate::event::Event;

/// Error returned by an individual handler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct HandlerError(String);

impl HandlerError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

type HandlerFn<E> = Box<dyn Fn(&EventEnvelope<E>) -> Result<(), HandlerError> + Send + Sync>;

struct Registration<E> {
    name: &'static str,
    priority: i32,
    /// `None` subscribes to every event type.
    event_type: Option<&'static str>,
    handler: HandlerFn<E>,
}

/// Collects handler registrations. Consumed by [`HandlerTableBuilder::build`].
pub struct HandlerTableBuilder<E> {
    registrations: Vec<Registration<E>>,
}

impl<E: Event> HandlerTableBuilder<E> {
    pub fn new() -> Self {
        Self {
            registrations: Vec::new(),
        }
    }

    /// Register a handler for every event.
    pub fn on_any<F>(mut self, name: &'static str, priority: i32, handler: F) -> Self
    where
        F: Fn(&EventEnvelope<E>) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.registrations.push(Registration {
            name,
            priority,
            event_type: None,
            handler: Box::new(handler),
        });
        self
    }

    /// Register a handler for a single event type (see [`Event::event_type`]).
    pub fn on<F>(
        mut self,
        event_type: &'static str,
        name: &'static str,
        priority: i32,
        handler: F,
    ) -> Self
    where
        F: Fn(&EventEnvelope<E>) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.registrations.push(Registration {
            name,
            priority,
            event_type: Some(event_type),
            handler: Box::new(handler),
        });
        self
    }

    pub fn build(mut self) -> HandlerTable<E> {
        // Stable sort keeps registration order within a priority.
        self.registrations.sort_by(|a, b| b.priority.cmp(&a.priority));
        HandlerTable {
            registrations: self.registrations,
        }
    }
}

impl<E: Event> Default for HandlerTableBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of dispatching one envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: Vec<&'static str>,
    pub failed: Vec<(&'static str, HandlerError)>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Immutable, priority-ordered set of event handlers.
pub struct HandlerTable<E> {
    registrations: Vec<Registration<E>>,
}

impl<E: Event> HandlerTable<E> {
    pub fn builder() -> HandlerTableBuilder<E> {
        HandlerTableBuilder::new()
    }

    /// Handler names in dispatch order.
    pub fn handler_names(&self) -> Vec<&'static str> {
        self.registrations.iter().map(|r| r.name).collect()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Run every matching handler against `envelope`.
    pub fn dispatch(&self, envelope: &EventEnvelope<E>) -> DispatchReport {
        let event_type = envelope.payload().event_type();
        let mut report = DispatchReport::default();

        for reg in &self.registrations {
            if reg.event_type.is_some_and(|t| t != event_type) {
                continue;
            }

            match (reg.handler)(envelope) {
                Ok(()) => report.delivered.push(reg.name),
                Err(err) => {
                    tracing::warn!(
                        handler = reg.name,
                        event_type,
                        event_id = %envelope.event_id(),
                        error = %err,
                        "event handler failed"
                    );
                    report.failed.push((reg.name, err));
                }
            }
        }

        report
    }
}

impl<E> core::fmt::Debug for HandlerTable<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list()
            .entries(
                self.registrations
                    .iter()
                    .map(|r| (r.name, r.priority, r.event_type)),
            )
            .finish()
    }
}
