//! Pre-invocation validation gates.

use crate::params::Parameters;
use std::sync::Arc;

/// Result of evaluating a single gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    Pass,
    /// Rejected, optionally with a diagnostic for the client.
    Reject(Option<String>),
}

/// A check run against the request's parameters before an action is invoked.
pub trait ValidationGate: Send + Sync {
    fn check(&self, parameters: &Parameters) -> GateOutcome;
}

/// Requires that every named parameter is present on the request.
///
/// Names are matched case-insensitively. Missing names are reported in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredParameters {
    names: Vec<String>,
}

impl RequiredParameters {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Build from a comma-delimited list such as `"name, id"`.
    ///
    /// Entries are trimmed and empty entries are dropped.
    pub fn parse(list: &str) -> Self {
        Self::new(
            list.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty()),
        )
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl ValidationGate for RequiredParameters {
    fn check(&self, parameters: &Parameters) -> GateOutcome {
        let missing: Vec<&str> = self
            .names
            .iter()
            .filter(|name| !parameters.contains(name))
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            GateOutcome::Pass
        } else {
            GateOutcome::Reject(Some(format!(
                "The following required parameters were missing from the request: {}",
                missing.join(",")
            )))
        }
    }
}

/// Ordered gate evaluation that stops at the first rejection.
pub struct GateChain<'a> {
    gates: &'a [Arc<dyn ValidationGate>],
}

impl<'a> GateChain<'a> {
    pub fn new(gates: &'a [Arc<dyn ValidationGate>]) -> Self {
        Self { gates }
    }

    pub fn evaluate(&self, parameters: &Parameters) -> GateOutcome {
        for gate in self.gates {
            if let rejected @ GateOutcome::Reject(_) = gate.check(parameters) {
                return rejected;
            }
        }
        GateOutcome::Pass
    }
}
