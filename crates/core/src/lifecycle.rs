//! Status lifecycles expressed as data.
//!
//! A [`TransitionTable`] lists, for every status, the statuses it may move to.
//! Anything not listed is rejected with [`DomainError::InvalidTransition`].
//! Statuses with no outgoing edges are terminal.

use crate::error::{DomainError, DomainResult};

/// Static table of allowed `(from -> to)` status edges for one entity type.
#[derive(Debug)]
pub struct TransitionTable<S: 'static> {
    entity: &'static str,
    edges: &'static [(S, &'static [S])],
}

impl<S> TransitionTable<S> {
    pub const fn new(entity: &'static str, edges: &'static [(S, &'static [S])]) -> Self {
        Self { entity, edges }
    }

    /// Entity name used in transition errors (e.g. "invoice").
    pub fn entity(&self) -> &'static str {
        self.entity
    }
}

impl<S> TransitionTable<S>
where
    S: Copy + PartialEq + core::fmt::Display + 'static,
{
    /// Statuses reachable from `from` in one step.
    pub fn targets(&self, from: S) -> &'static [S] {
        self.edges
            .iter()
            .find(|(status, _)| *status == from)
            .map(|(_, targets)| *targets)
            .unwrap_or(&[])
    }

    pub fn allows(&self, from: S, to: S) -> bool {
        self.targets(from).contains(&to)
    }

    pub fn is_terminal(&self, status: S) -> bool {
        self.targets(status).is_empty()
    }

    /// Validate a single step, naming both ends on failure.
    pub fn check(&self, from: S, to: S) -> DomainResult<()> {
        if self.allows(from, to) {
            Ok(())
        } else {
            Err(DomainError::invalid_transition(self.entity, from, to))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    enum Light {
        Red,
        Green,
        Off,
    }

    impl core::fmt::Display for Light {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            let s = match self {
                Light::Red => "RED",
                Light::Green => "GREEN",
                Light::Off => "OFF",
            };
            f.write_str(s)
        }
    }

    static LIGHTS: TransitionTable<Light> = TransitionTable::new(
        "light",
        &[
            (Light::Red, &[Light::Green, Light::Off]),
            (Light::Green, &[Light::Red]),
        ],
    );

    #[test]
    fn listed_edges_are_allowed() {
        assert!(LIGHTS.allows(Light::Red, Light::Green));
        assert!(LIGHTS.check(Light::Green, Light::Red).is_ok());
    }

    #[test]
    fn unlisted_edge_names_both_states() {
        let err = LIGHTS.check(Light::Green, Light::Off).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                entity: "light",
                from: "GREEN".to_string(),
                to: "OFF".to_string(),
            }
        );
    }

    #[test]
    fn status_without_row_is_terminal() {
        assert!(LIGHTS.is_terminal(Light::Off));
        assert!(!LIGHTS.is_terminal(Light::Red));
        assert!(LIGHTS.check(Light::Off, Light::Red).is_err());
    }
}
