//! Fault injection for the ring buffer.
//!
//! Faults are injected at OPERATION BOUNDARIES, never inside an operation.
//! The buffer under test is the plain `RingBuffer`; it has no knowledge of
//! DST.
//!
//! ```text
//! ┌──────────────┐    ┌──────────────────┐    ┌──────────────┐
//! │  FaultPoint  │───>│   RingBuffer     │───>│  FaultPoint  │
//! │  (pre-op)    │    │ write/read/...   │    │  (post-op)   │
//! └──────────────┘    └──────────────────┘    └──────────────┘
//!        │                                           │
//!        ▼                                           ▼
//!  "Caller crashed,                       "Effect applied, caller
//!   op never ran"                          never saw the result"
//! ```
//!
//! After a `ResultLost` fault the effect is still tracked, so the
//! conservation and ordering invariants must hold no matter where
//! faults land.

use rb_buffer::RingBuffer;
use rb_core::{OperationRecord, PropertyChecker, RingBufferProperties, RingBufferPropertyChecker};
use serde::Serialize;
use tracing::{debug, warn};

use crate::fault::{FaultConfig, FaultInjector};
use crate::random::DeterministicRng;

/// Fault injection points (between operations, not inside).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    /// Before starting an operation
    BeforeOperation,
    /// After the operation completed, before returning to the caller
    AfterOperation,
}

/// Types of faults that can be injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FaultType {
    /// Caller "crashes" before the operation starts; nothing happens
    CallerCrash,
    /// Operation took effect but the caller never sees the result
    ResultLost,
}

/// Minimal buffer surface the runner drives.
///
/// Deliberately mirrors the public `RingBuffer` API so the buffer carries
/// no test hooks.
pub trait DstTestableBuffer {
    fn write(&mut self, value: u64) -> bool;
    fn write_all(&mut self, values: &[u64]) -> bool;
    fn read(&mut self) -> Option<u64>;
    fn peek(&self) -> Option<u64>;
    fn clear(&mut self);
    fn dump(&mut self) -> Vec<u64>;
    /// Stored elements, oldest first
    fn contents(&self) -> Vec<u64>;
    fn len(&self) -> usize;
    fn capacity(&self) -> usize;
    fn is_empty(&self) -> bool;
    fn is_full(&self) -> bool;
    fn head(&self) -> usize;
    fn tail(&self) -> usize;
    fn slot_occupancy(&self) -> Vec<bool>;
}

impl DstTestableBuffer for RingBuffer<u64> {
    fn write(&mut self, value: u64) -> bool {
        RingBuffer::write(self, value)
    }

    fn write_all(&mut self, values: &[u64]) -> bool {
        RingBuffer::write_all(self, values.iter().copied())
    }

    fn read(&mut self) -> Option<u64> {
        RingBuffer::read(self)
    }

    fn peek(&self) -> Option<u64> {
        RingBuffer::peek(self).copied()
    }

    fn clear(&mut self) {
        RingBuffer::clear(self);
    }

    fn dump(&mut self) -> Vec<u64> {
        RingBuffer::dump(self)
    }

    fn contents(&self) -> Vec<u64> {
        self.data()
    }

    fn len(&self) -> usize {
        RingBuffer::len(self)
    }

    fn capacity(&self) -> usize {
        RingBuffer::capacity(self)
    }

    fn is_empty(&self) -> bool {
        RingBuffer::is_empty(self)
    }

    fn is_full(&self) -> bool {
        RingBuffer::is_full(self)
    }

    fn head(&self) -> usize {
        RingBuffer::head(self)
    }

    fn tail(&self) -> usize {
        RingBuffer::tail(self)
    }

    fn slot_occupancy(&self) -> Vec<bool> {
        self.slots().iter().map(Option::is_some).collect()
    }
}

/// Observable state of a buffer, compared around operations that must not
/// change anything.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Observed {
    contents: Vec<u64>,
    occupancy: Vec<bool>,
    head: usize,
    tail: usize,
}

impl Observed {
    fn of<B: DstTestableBuffer>(buffer: &B) -> Self {
        Self {
            contents: buffer.contents(),
            occupancy: buffer.slot_occupancy(),
            head: buffer.head(),
            tail: buffer.tail(),
        }
    }
}

/// DST operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DstOp {
    Write(u64),
    WriteBatch(Vec<u64>),
    Read,
    Peek,
    Clear,
    Dump,
}

/// DST test runner for ring buffers.
///
/// Wraps a buffer, injects faults at operation boundaries and records
/// everything needed to check the `rb-core` invariants afterwards.
pub struct DstRunner<B> {
    buffer: B,
    fault_injector: FaultInjector,
    seed: u64,
    // Tracking for invariant verification
    produced: Vec<u64>,
    consumed: Vec<u64>,
    log: Vec<OperationRecord>,
    state_violations: Vec<String>,
    // Statistics
    operations_count: u64,
    faults_injected: u64,
    abandoned_operations: u64,
    rejected_writes: u64,
    underflow_reads: u64,
}

impl<B: DstTestableBuffer> DstRunner<B> {
    /// Runner with the default fault configuration.
    pub fn new(buffer: B, seed: u64) -> Self {
        Self::with_fault_config(buffer, seed, FaultConfig::default())
    }

    pub fn with_fault_config(buffer: B, seed: u64, fault_config: FaultConfig) -> Self {
        Self {
            buffer,
            fault_injector: FaultInjector::new(
                DeterministicRng::new(seed.wrapping_add(1)),
                fault_config,
            ),
            seed,
            produced: Vec::new(),
            consumed: Vec::new(),
            log: Vec::new(),
            state_violations: Vec::new(),
            operations_count: 0,
            faults_injected: 0,
            abandoned_operations: 0,
            rejected_writes: 0,
            underflow_reads: 0,
        }
    }

    /// Get the seed for reproduction.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    /// Apply one operation with fault injection.
    pub fn apply(&mut self, op: DstOp) -> Result<(), FaultType> {
        match op {
            DstOp::Write(v) => self.write(v).map(|_| ()),
            DstOp::WriteBatch(values) => self.write_all(&values).map(|_| ()),
            DstOp::Read => self.read().map(|_| ()),
            DstOp::Peek => self.peek().map(|_| ()),
            DstOp::Clear => self.clear(),
            DstOp::Dump => self.dump().map(|_| ()),
        }
    }

    pub fn write(&mut self, value: u64) -> Result<bool, FaultType> {
        self.before()?;

        let before = Observed::of(&self.buffer);
        let accepted = self.buffer.write(value);
        if accepted {
            self.produced.push(value);
        } else {
            self.rejected_writes += 1;
            self.expect_unchanged(&before, "rejected write");
        }
        self.record(format!("write({})", value), accepted);

        self.after()?;
        Ok(accepted)
    }

    pub fn write_all(&mut self, values: &[u64]) -> Result<bool, FaultType> {
        self.before()?;

        let before = Observed::of(&self.buffer);
        let accepted = self.buffer.write_all(values);
        if accepted {
            self.produced.extend_from_slice(values);
        } else {
            self.rejected_writes += 1;
            self.expect_unchanged(&before, "rejected batch");
        }
        self.record(format!("write_all({:?})", values), accepted);

        self.after()?;
        Ok(accepted)
    }

    pub fn read(&mut self) -> Result<Option<u64>, FaultType> {
        self.before()?;

        let before = Observed::of(&self.buffer);
        let value = self.buffer.read();
        match value {
            Some(v) => {
                if before.contents.first() != Some(&v) {
                    self.violation(format!(
                        "read returned {} but oldest element was {:?}",
                        v,
                        before.contents.first()
                    ));
                }
                self.consumed.push(v);
                self.record(format!("read() -> {}", v), true);
            }
            None => {
                self.underflow_reads += 1;
                self.expect_unchanged(&before, "underflow read");
                self.record("read() -> None".to_string(), false);
            }
        }

        self.after()?;
        Ok(value)
    }

    pub fn peek(&mut self) -> Result<Option<u64>, FaultType> {
        self.before()?;

        let before = Observed::of(&self.buffer);
        let value = self.buffer.peek();
        if value.as_ref() != before.contents.first() {
            self.violation(format!(
                "peek returned {:?} but oldest element was {:?}",
                value,
                before.contents.first()
            ));
        }
        self.expect_unchanged(&before, "peek");

        self.after()?;
        Ok(value)
    }

    pub fn clear(&mut self) -> Result<(), FaultType> {
        self.before()?;

        let discarded = self.buffer.contents();
        self.buffer.clear();
        self.consumed.extend(discarded);
        if !self.buffer.is_empty() {
            self.violation(format!("clear left {} element(s)", self.buffer.len()));
        }
        self.record("clear()".to_string(), true);

        self.after()
    }

    pub fn dump(&mut self) -> Result<Vec<u64>, FaultType> {
        self.before()?;

        let expected = self.buffer.contents();
        let drained = self.buffer.dump();
        if drained != expected {
            self.violation(format!("dump returned {:?}, expected {:?}", drained, expected));
        }
        self.consumed.extend_from_slice(&drained);
        self.record(format!("dump() -> {:?}", drained), true);

        self.after()?;
        Ok(drained)
    }

    fn before(&mut self) -> Result<(), FaultType> {
        if let Some(fault) = self.maybe_inject_fault(FaultPoint::BeforeOperation) {
            self.abandoned_operations += 1;
            return Err(fault);
        }
        self.operations_count += 1;
        Ok(())
    }

    fn after(&mut self) -> Result<(), FaultType> {
        match self.maybe_inject_fault(FaultPoint::AfterOperation) {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    /// Maybe inject a fault at the given point.
    fn maybe_inject_fault(&mut self, point: FaultPoint) -> Option<FaultType> {
        if !self.fault_injector.should_fail() {
            return None;
        }
        self.faults_injected += 1;
        let fault = match point {
            FaultPoint::BeforeOperation => FaultType::CallerCrash,
            FaultPoint::AfterOperation => FaultType::ResultLost,
        };
        debug!(seed = self.seed, ?point, ?fault, "fault injected");
        Some(fault)
    }

    fn expect_unchanged(&mut self, before: &Observed, what: &str) {
        let after = Observed::of(&self.buffer);
        if &after != before {
            self.violation(format!("{} changed the buffer: {:?} -> {:?}", what, before, after));
        }
    }

    fn violation(&mut self, message: String) {
        warn!(seed = self.seed, %message, "DST state violation");
        self.state_violations.push(message);
    }

    fn record(&mut self, operation: String, success: bool) {
        let step = self.log.len() as u64 + 1;
        self.log.push(OperationRecord {
            step,
            operation,
            success,
        });
    }

    /// Violations of per-operation contracts (atomic rejection, non-mutating
    /// peek and underflow, FIFO read order).
    pub fn state_violations(&self) -> &[String] {
        &self.state_violations
    }

    /// Check every invariant, returning the first failure with its
    /// counterexample table.
    pub fn check_invariants(&self) -> Result<(), String> {
        if let Some(first) = self.state_violations.first() {
            return Err(format!("DST_SEED={}: {}", self.seed, first));
        }

        let checker = if self.seed == 0 {
            RingBufferPropertyChecker::new(self)
        } else {
            RingBufferPropertyChecker::new(self).with_seed(self.seed)
        };
        match checker.violations().into_iter().next() {
            None => Ok(()),
            Some(result) => {
                let mut message = format!("DST_SEED={}: {}", self.seed, result.format());
                if let Some(ce) = &result.counterexample {
                    message.push('\n');
                    message.push_str(&ce.render_table());
                }
                Err(message)
            }
        }
    }

    /// Get statistics.
    pub fn stats(&self) -> DstStats {
        DstStats {
            seed: self.seed,
            operations_count: self.operations_count,
            faults_injected: self.faults_injected,
            abandoned_operations: self.abandoned_operations,
            rejected_writes: self.rejected_writes,
            underflow_reads: self.underflow_reads,
        }
    }
}

impl<B: DstTestableBuffer> RingBufferProperties for DstRunner<B> {
    fn produced_messages(&self) -> Vec<u64> {
        self.produced.clone()
    }

    fn consumed_messages(&self) -> Vec<u64> {
        self.consumed.clone()
    }

    fn current_contents(&self) -> Vec<u64> {
        self.buffer.contents()
    }

    fn capacity(&self) -> u64 {
        self.buffer.capacity() as u64
    }

    fn len(&self) -> u64 {
        self.buffer.len() as u64
    }

    fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    fn is_full(&self) -> bool {
        self.buffer.is_full()
    }

    fn head(&self) -> u64 {
        self.buffer.head() as u64
    }

    fn tail(&self) -> u64 {
        self.buffer.tail() as u64
    }

    fn slot_occupancy(&self) -> Vec<bool> {
        self.buffer.slot_occupancy()
    }

    fn operation_log(&self) -> Vec<OperationRecord> {
        self.log.clone()
    }
}

/// Statistics from DST run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DstStats {
    pub seed: u64,
    pub operations_count: u64,
    pub faults_injected: u64,
    pub abandoned_operations: u64,
    pub rejected_writes: u64,
    pub underflow_reads: u64,
}

impl DstStats {
    pub fn format(&self) -> String {
        format!(
            "DST_SEED={} ops={} faults={} abandoned={} rejected={} underflows={}",
            self.seed,
            self.operations_count,
            self.faults_injected,
            self.abandoned_operations,
            self.rejected_writes,
            self.underflow_reads
        )
    }
}

/// Draw one random operation.
///
/// Writes outnumber reads slightly so runs regularly reach a full buffer.
/// Batches range over `0..=batch_len_max` elements.
pub fn random_operation(rng: &mut DeterministicRng, batch_len_max: usize) -> DstOp {
    match rng.gen_range(0..20_u32) {
        0..=6 => DstOp::Write(rng.gen_range(0..1000)),
        7..=9 => {
            let len = rng.gen_range(0..=batch_len_max);
            DstOp::WriteBatch((0..len).map(|_| rng.gen_range(0..1000)).collect())
        }
        10..=15 => DstOp::Read,
        16 => DstOp::Peek,
        17 => DstOp::Clear,
        _ => DstOp::Dump,
    }
}

/// Draw `count` random operations.
pub fn generate_operations(
    rng: &mut DeterministicRng,
    count: usize,
    batch_len_max: usize,
) -> Vec<DstOp> {
    (0..count).map(|_| random_operation(rng, batch_len_max)).collect()
}

/// Run a DST scenario.
///
/// Operations are executed with fault injection. Invariants checked at end.
pub fn run_dst_scenario<B: DstTestableBuffer>(
    buffer: B,
    seed: u64,
    fault_config: FaultConfig,
    operations: Vec<DstOp>,
) -> DstResult {
    let mut runner = DstRunner::with_fault_config(buffer, seed, fault_config);
    let mut errors = Vec::new();

    for op in operations {
        // Faults are expected; they are part of the test
        if let Err(fault) = runner.apply(op) {
            errors.push(format!("{:?}", fault));
        }
    }

    let violations = match runner.check_invariants() {
        Ok(()) => Vec::new(),
        Err(first) => {
            let mut all = vec![first];
            all.extend(runner.state_violations().iter().skip(1).cloned());
            all
        }
    };

    DstResult {
        passed: violations.is_empty(),
        violations,
        stats: runner.stats(),
        fault_errors: errors,
    }
}

/// DST result.
#[derive(Debug, Clone, Serialize)]
pub struct DstResult {
    pub passed: bool,
    pub violations: Vec<String>,
    pub stats: DstStats,
    pub fault_errors: Vec<String>,
}

impl DstResult {
    pub fn format(&self) -> String {
        let status = if self.passed { "PASS" } else { "FAIL" };
        let mut result = format!("[{}] {}", status, self.stats.format());

        for violation in &self.violations {
            result.push_str("\n  VIOLATION: ");
            result.push_str(violation);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(capacity: usize) -> RingBuffer<u64> {
        RingBuffer::new(capacity).unwrap()
    }

    /// Drops every other accepted write on the floor while claiming success.
    struct LossyBuffer {
        inner: RingBuffer<u64>,
        writes: u64,
    }

    impl DstTestableBuffer for LossyBuffer {
        fn write(&mut self, value: u64) -> bool {
            self.writes += 1;
            if self.writes % 2 == 0 {
                return !self.inner.is_full();
            }
            self.inner.write(value)
        }

        fn write_all(&mut self, values: &[u64]) -> bool {
            self.inner.write_all(values.iter().copied())
        }

        fn read(&mut self) -> Option<u64> {
            self.inner.read()
        }

        fn peek(&self) -> Option<u64> {
            self.inner.peek().copied()
        }

        fn clear(&mut self) {
            self.inner.clear();
        }

        fn dump(&mut self) -> Vec<u64> {
            self.inner.dump()
        }

        fn contents(&self) -> Vec<u64> {
            self.inner.data()
        }

        fn len(&self) -> usize {
            self.inner.len()
        }

        fn capacity(&self) -> usize {
            self.inner.capacity()
        }

        fn is_empty(&self) -> bool {
            self.inner.is_empty()
        }

        fn is_full(&self) -> bool {
            self.inner.is_full()
        }

        fn head(&self) -> usize {
            self.inner.head()
        }

        fn tail(&self) -> usize {
            self.inner.tail()
        }

        fn slot_occupancy(&self) -> Vec<bool> {
            self.inner.slots().iter().map(Option::is_some).collect()
        }
    }

    #[test]
    fn test_dst_runner_basic() {
        let mut runner = DstRunner::new(buffer(4), 12345);

        // These might fail due to fault injection, and that's OK
        let _ = runner.write(1);
        let _ = runner.write(2);
        let _ = runner.read();

        assert!(runner.check_invariants().is_ok());
    }

    #[test]
    fn test_no_faults_reports_results() {
        let mut runner = DstRunner::with_fault_config(buffer(2), 7, FaultConfig::none());

        assert_eq!(runner.write(10), Ok(true));
        assert_eq!(runner.write_all(&[11]), Ok(true));
        assert_eq!(runner.write(12), Ok(false));
        assert_eq!(runner.peek(), Ok(Some(10)));
        assert_eq!(runner.read(), Ok(Some(10)));
        assert_eq!(runner.dump(), Ok(vec![11]));
        assert_eq!(runner.read(), Ok(None));

        let stats = runner.stats();
        assert_eq!(stats.rejected_writes, 1);
        assert_eq!(stats.underflow_reads, 1);
        assert_eq!(stats.faults_injected, 0);
        assert!(runner.check_invariants().is_ok());
    }

    #[test]
    fn test_dst_scenario() {
        let ops = vec![
            DstOp::Write(100),
            DstOp::WriteBatch(vec![200, 300, 400]),
            DstOp::WriteBatch(vec![1, 2]),
            DstOp::Read,
            DstOp::Write(500),
            DstOp::Peek,
            DstOp::Dump,
            DstOp::Read,
        ];

        let result = run_dst_scenario(buffer(4), 12345, FaultConfig::aggressive(), ops);

        // Even with faults, invariants should hold
        assert!(result.passed, "DST failed: {}", result.format());
    }

    #[test]
    fn test_determinism() {
        let mut rng = DeterministicRng::new(42);
        let ops = generate_operations(&mut rng, 200, 5);

        let result1 = run_dst_scenario(buffer(3), 42, FaultConfig::aggressive(), ops.clone());
        let result2 = run_dst_scenario(buffer(3), 42, FaultConfig::aggressive(), ops);

        // Same seed = same faults = same stats
        assert_eq!(result1.stats, result2.stats);
        assert_eq!(result1.fault_errors, result2.fault_errors);
    }

    #[test]
    fn test_lost_write_detected() {
        let lossy = LossyBuffer {
            inner: buffer(4),
            writes: 0,
        };
        let ops = vec![DstOp::Write(1), DstOp::Write(2), DstOp::Read];

        let result = run_dst_scenario(lossy, 99, FaultConfig::none(), ops);

        assert!(!result.passed);
        assert!(result.format().contains("VIOLATION"));
    }

    #[test]
    fn test_generate_operations_respects_batch_limit() {
        let mut rng = DeterministicRng::new(5);
        let ops = generate_operations(&mut rng, 500, 3);

        assert_eq!(ops.len(), 500);
        for op in &ops {
            if let DstOp::WriteBatch(values) = op {
                assert!(values.len() <= 3);
            }
        }
        assert!(ops.iter().any(|op| matches!(op, DstOp::WriteBatch(_))));
        assert!(ops.contains(&DstOp::Read));
    }
}
