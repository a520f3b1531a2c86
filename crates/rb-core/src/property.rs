//! Property results and the checker trait.

use serde::Serialize;

use crate::counterexample::Counterexample;

/// Outcome of checking a single named property.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyResult {
    /// Property name (e.g. `FIFO_Order`)
    pub name: String,
    /// Whether the property holds
    pub holds: bool,
    /// Human-readable description of the violation
    pub violation: Option<String>,
    /// Failure path, when the checker could reconstruct one
    #[serde(skip)]
    pub counterexample: Option<Counterexample>,
}

impl PropertyResult {
    /// A property that holds.
    #[must_use]
    pub fn pass(name: &str) -> Self {
        debug_assert!(!name.is_empty(), "Property name must not be empty");
        Self {
            name: name.to_string(),
            holds: true,
            violation: None,
            counterexample: None,
        }
    }

    /// A violated property.
    #[must_use]
    pub fn fail(name: &str, violation: String, counterexample: Option<Counterexample>) -> Self {
        debug_assert!(!name.is_empty(), "Property name must not be empty");
        Self {
            name: name.to_string(),
            holds: false,
            violation: Some(violation),
            counterexample,
        }
    }

    /// One-line summary, e.g. `[FAIL] FIFO_Order: ...`.
    #[must_use]
    pub fn format(&self) -> String {
        match self.violation {
            Some(ref violation) => format!("[FAIL] {}: {}", self.name, violation),
            None => format!("[PASS] {}", self.name),
        }
    }
}

/// Something that can check a set of properties.
pub trait PropertyChecker {
    /// Check every property and return one result per property.
    fn check_all(&self) -> Vec<PropertyResult>;

    /// True when every property holds.
    fn all_hold(&self) -> bool {
        self.check_all().iter().all(|r| r.holds)
    }

    /// Only the violated properties.
    fn violations(&self) -> Vec<PropertyResult> {
        self.check_all().into_iter().filter(|r| !r.holds).collect()
    }
}
