//! DST test harness for running reproducible randomized workloads.
//!
//! The harness drives a seeded stream of operations against a buffer and
//! checks invariants every `invariant_check_interval` operations. It stops
//! at the first violation and reports the seed needed to replay it.

use std::cell::RefCell;

use serde::Serialize;
use tracing::{info, warn};

use crate::fault_injection::{random_operation, DstRunner, DstTestableBuffer};
use crate::{DstEnv, FaultConfig};

/// Configuration for DST test harness.
#[derive(Debug, Clone, Serialize)]
pub struct HarnessConfig {
    /// Capacity of the buffer under test
    pub capacity: usize,
    /// Number of operations to run
    pub operations_count: u64,
    /// Largest batch a `WriteBatch` operation may carry
    pub batch_len_max: usize,
    /// Fault injection configuration
    pub fault_config: FaultConfig,
    /// Check invariants after every N operations (0 = only at the end)
    pub invariant_check_interval: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            capacity: 8,
            operations_count: 1_000,
            batch_len_max: 10,
            fault_config: FaultConfig::default(),
            invariant_check_interval: 10,
        }
    }
}

impl HarnessConfig {
    /// Configuration for stress testing.
    pub fn stress() -> Self {
        Self {
            capacity: 16,
            operations_count: 100_000,
            batch_len_max: 20,
            fault_config: FaultConfig::aggressive(),
            invariant_check_interval: 100,
        }
    }

    /// Configuration for quick testing.
    pub fn quick() -> Self {
        Self {
            capacity: 4,
            operations_count: 100,
            batch_len_max: 5,
            fault_config: FaultConfig::none(),
            invariant_check_interval: 10,
        }
    }
}

/// Result of running the harness.
#[derive(Debug, Clone, Serialize)]
pub struct HarnessResult {
    /// Seed used for reproduction
    pub seed: u64,
    /// Total operations executed
    pub operations_count: u64,
    /// Faults injected
    pub faults_injected_count: u64,
    /// Invariant checks performed
    pub invariant_checks_count: u64,
    /// Whether all invariants held
    pub all_invariants_held: bool,
    /// First violation (if any)
    pub first_violation: Option<String>,
}

/// DST test harness.
///
/// Given the same seed and config, the same operations are generated and
/// the same faults fire.
pub struct DstHarness {
    env: DstEnv,
    config: HarnessConfig,
    operations_count: u64,
    invariant_checks_count: u64,
    violation: Option<String>,
}

impl DstHarness {
    /// Create a new harness with the given seed and config.
    pub fn new(seed: u64, config: HarnessConfig) -> Self {
        debug_assert!(config.capacity > 0, "Capacity must be positive");

        let env = DstEnv::with_fault_config(seed, config.fault_config.clone());

        Self {
            env,
            config,
            operations_count: 0,
            invariant_checks_count: 0,
            violation: None,
        }
    }

    /// Get the seed for reproduction.
    pub fn seed(&self) -> u64 {
        self.env.seed()
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Get the environment for custom operations.
    pub fn env(&mut self) -> &mut DstEnv {
        &mut self.env
    }

    /// Check if the harness has been stopped due to a violation.
    pub fn is_stopped(&self) -> bool {
        self.violation.is_some()
    }

    /// Stop the harness with a violation message. Only the first is kept.
    pub fn stop_with_violation(&mut self, message: String) {
        if self.violation.is_none() {
            warn!(seed = self.seed(), %message, "DST harness stopped on violation");
            self.violation = Some(message);
        }
    }

    pub fn record_operation(&mut self) {
        self.operations_count += 1;
    }

    pub fn record_invariant_check(&mut self) {
        self.invariant_checks_count += 1;
    }

    /// Should we check invariants now?
    pub fn should_check_invariants(&self) -> bool {
        if self.config.invariant_check_interval == 0 {
            return false;
        }
        self.operations_count % self.config.invariant_check_interval == 0
    }

    /// Run a workload.
    ///
    /// `generate_op` receives the current step and returns an operation, or
    /// `None` to skip the step. `execute` failing or `check_invariants`
    /// failing stops the run. Invariants are always checked once more at
    /// the end.
    pub fn run<F, T, R, I>(
        &mut self,
        mut generate_op: F,
        mut execute: R,
        mut check_invariants: I,
    ) -> HarnessResult
    where
        F: FnMut(&mut DstEnv, u64) -> Option<T>,
        R: FnMut(&mut DstEnv, T) -> Result<(), String>,
        I: FnMut() -> Result<(), String>,
    {
        let total_ops = self.config.operations_count;
        let mut step = 0u64;

        while step < total_ops && !self.is_stopped() {
            if let Some(op) = generate_op(&mut self.env, step) {
                if let Err(e) = execute(&mut self.env, op) {
                    self.stop_with_violation(e);
                    break;
                }
                self.record_operation();

                if self.should_check_invariants() {
                    self.record_invariant_check();
                    if let Err(e) = check_invariants() {
                        self.stop_with_violation(e);
                        break;
                    }
                }
            }

            step += 1;
        }

        // Final invariant check
        if !self.is_stopped() {
            self.record_invariant_check();
            if let Err(e) = check_invariants() {
                self.stop_with_violation(e);
            }
        }

        self.build_result()
    }

    /// Run the configured random workload against `buffer` through a
    /// `DstRunner`, checking the ring buffer invariants along the way.
    pub fn run_buffer<B: DstTestableBuffer>(&mut self, buffer: B) -> HarnessResult {
        debug_assert_eq!(
            buffer.capacity(),
            self.config.capacity,
            "Buffer capacity does not match harness config"
        );

        let runner = RefCell::new(DstRunner::with_fault_config(
            buffer,
            self.seed(),
            self.config.fault_config.clone(),
        ));
        let batch_len_max = self.config.batch_len_max;

        let mut result = self.run(
            |env, _step| Some(random_operation(env.rng(), batch_len_max)),
            |_env, op| {
                // Faults are expected; the invariant checks decide pass/fail
                let _ = runner.borrow_mut().apply(op);
                Ok(())
            },
            || runner.borrow().check_invariants(),
        );

        let stats = runner.borrow().stats();
        result.faults_injected_count = stats.faults_injected;
        info!(
            seed = result.seed,
            passed = result.all_invariants_held,
            stats = %stats.format(),
            "DST run finished"
        );
        result
    }

    fn build_result(&mut self) -> HarnessResult {
        HarnessResult {
            seed: self.env.seed(),
            operations_count: self.operations_count,
            faults_injected_count: self.env.fault().stats().faults_count,
            invariant_checks_count: self.invariant_checks_count,
            all_invariants_held: self.violation.is_none(),
            first_violation: self.violation.clone(),
        }
    }
}

impl HarnessResult {
    /// Format for display.
    pub fn format(&self) -> String {
        let status = if self.all_invariants_held {
            "PASS"
        } else {
            "FAIL"
        };

        let mut result = format!(
            "[{}] DST_SEED={} ops={} faults={} checks={}",
            status,
            self.seed,
            self.operations_count,
            self.faults_injected_count,
            self.invariant_checks_count
        );

        if let Some(ref violation) = self.first_violation {
            result.push_str(&format!("\n  Violation: {}", violation));
        }

        result
    }
}
