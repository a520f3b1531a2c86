//! Counterexample representation and rendering.
//!
//! When a property violation is detected, a counterexample shows
//! the exact sequence of operations that led to the failure.

/// A counterexample showing the failure path.
///
/// Contains the operations applied to the buffer and snapshots of its
/// state along the way. Rendered as a step table for humans.
#[derive(Debug, Clone, Default)]
pub struct Counterexample {
    /// Sequence of state snapshots
    pub states: Vec<StateSnapshot>,
    /// Operations in the order they were applied
    pub operations: Vec<OperationRecord>,
    /// DST seed for reproduction (if applicable)
    pub dst_seed: Option<u64>,
    /// Human-readable description of the failure
    pub description: Option<String>,
}

/// Snapshot of buffer state at a point in time.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    /// Step number in the execution
    pub step: u64,
    /// Description of the state
    pub description: String,
    /// Variable values at this point
    pub variables: Vec<(String, String)>,
}

/// An operation applied to the buffer.
#[derive(Debug, Clone)]
pub struct OperationRecord {
    /// Step number when this operation occurred
    pub step: u64,
    /// Description of the operation, e.g. `write(42)`
    pub operation: String,
    /// Whether the operation succeeded (write accepted, read returned a value)
    pub success: bool,
}

impl Counterexample {
    /// Create a new empty counterexample.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a counterexample with DST seed for reproduction.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        debug_assert!(seed != 0, "DST seed should not be zero");
        Self {
            dst_seed: Some(seed),
            ..Self::default()
        }
    }

    /// Set the description for this counterexample.
    #[must_use]
    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    /// Add a state snapshot.
    pub fn add_state(&mut self, state: StateSnapshot) {
        debug_assert!(
            self.states.last().map_or(true, |last| state.step > last.step),
            "States must be added in order"
        );
        self.states.push(state);
    }

    /// Add an operation.
    pub fn add_operation(&mut self, operation: OperationRecord) {
        self.operations.push(operation);
    }

    /// Render the counterexample as a step table.
    ///
    /// Format:
    /// ```text
    /// DST_SEED=12345
    ///
    /// Step | Operation          | Result | State
    /// -----|--------------------|--------|------
    ///    1 | write(42)          | ok     | len=1 head=0 tail=1
    ///    2 | write_all([1, 2])  | FAIL   | len=1 head=0 tail=1
    /// ```
    #[must_use]
    pub fn render_table(&self) -> String {
        let mut output = String::new();

        if let Some(seed) = self.dst_seed {
            output.push_str(&format!("DST_SEED={}\n\n", seed));
        }

        if let Some(ref desc) = self.description {
            output.push_str("Failure: ");
            output.push_str(desc);
            output.push_str("\n\n");
        }

        if self.operations.is_empty() && self.states.is_empty() {
            output.push_str("(no operations recorded)\n");
            return output;
        }

        let width = self
            .operations
            .iter()
            .map(|op| op.operation.len())
            .max()
            .unwrap_or(0)
            .max("Operation".len());

        output.push_str(&format!("Step | {:<width$} | Result | State\n", "Operation"));
        output.push_str(&format!("-----|-{}-|--------|------\n", "-".repeat(width)));

        let max_step = self
            .operations
            .iter()
            .map(|op| op.step)
            .chain(self.states.iter().map(|s| s.step))
            .max()
            .unwrap_or(0);

        for step in 1..=max_step {
            let op = self.operations.iter().find(|op| op.step == step);
            let state = self.states.iter().find(|s| s.step == step);
            if op.is_none() && state.is_none() {
                continue;
            }

            let (name, result) = match op {
                Some(op) => (op.operation.as_str(), if op.success { "ok" } else { "FAIL" }),
                None => ("", ""),
            };
            output.push_str(&format!("{:4} | {:<width$} | {:<6} |", step, name, result));
            if let Some(state) = state {
                output.push_str(&format!(" {}", state.description));
            }
            output.push('\n');
        }

        output
    }
}
