//! Verifier that replays the canonical buffer scenarios against an
//! implementation.
//!
//! The model checker proves the invariants over every short history; the
//! verifier pins down concrete observable behavior (exact contents, slot
//! layout, index positions) on the scenarios every implementation must
//! reproduce byte for byte.

use std::fmt;

use rb_buffer::RingBuffer;
use serde::Serialize;
use tracing::{debug, warn};

/// Trait that implementations must satisfy for verification.
pub trait VerifiableRingBuffer: Sized {
    type Error: fmt::Display;

    /// Create an empty buffer with `capacity` slots.
    fn new(capacity: usize) -> Result<Self, Self::Error>;

    fn write(&mut self, value: u8) -> bool;

    /// All-or-nothing batch write.
    fn write_all(&mut self, values: &[u8]) -> bool;

    fn read(&mut self) -> Option<u8>;

    /// Stored elements, oldest first.
    fn data(&self) -> Vec<u8>;

    /// Raw slot array, including empty slots.
    fn slots(&self) -> Vec<Option<u8>>;

    fn len(&self) -> usize;
    fn is_empty(&self) -> bool;
    fn is_full(&self) -> bool;
    fn head(&self) -> usize;
    fn tail(&self) -> usize;
}

impl VerifiableRingBuffer for RingBuffer<u8> {
    type Error = rb_buffer::RingBufferError;

    fn new(capacity: usize) -> Result<Self, Self::Error> {
        RingBuffer::new(capacity)
    }

    fn write(&mut self, value: u8) -> bool {
        RingBuffer::write(self, value)
    }

    fn write_all(&mut self, values: &[u8]) -> bool {
        RingBuffer::write_all(self, values.iter().copied())
    }

    fn read(&mut self) -> Option<u8> {
        RingBuffer::read(self)
    }

    fn data(&self) -> Vec<u8> {
        RingBuffer::data(self)
    }

    fn slots(&self) -> Vec<Option<u8>> {
        RingBuffer::slots(self).to_vec()
    }

    fn len(&self) -> usize {
        RingBuffer::len(self)
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
}

/// Result of verification.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationResult {
    /// Whether all checks passed.
    pub passed: bool,
    /// Number of buffer operations executed.
    pub operations_count: usize,
    /// Scenarios that ran to completion.
    pub scenarios_checked: Vec<String>,
    /// Error message if verification failed.
    pub error: Option<String>,
}

/// Configuration for verification.
#[derive(Debug, Clone, Serialize)]
pub struct VerifierConfig {
    /// Capacity for every scenario, at least 2
    pub capacity: usize,
    /// Value of the first element written; later ones count up from it
    pub first_value: u8,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            capacity: 4,
            first_value: 0x2A,
        }
    }
}

/// Scenario runner state shared by every scenario.
struct Run<'a> {
    config: &'a VerifierConfig,
    operations_count: usize,
}

impl Run<'_> {
    fn value(&self, i: usize) -> u8 {
        self.config.first_value.wrapping_add(i as u8)
    }

    fn values(&self, n: usize) -> Vec<u8> {
        (0..n).map(|i| self.value(i)).collect()
    }

    fn fresh<B: VerifiableRingBuffer>(&self) -> Result<B, String> {
        B::new(self.config.capacity).map_err(|e| format!("construction failed: {}", e))
    }

    fn write<B: VerifiableRingBuffer>(&mut self, rb: &mut B, value: u8) -> bool {
        self.operations_count += 1;
        rb.write(value)
    }

    fn write_all<B: VerifiableRingBuffer>(&mut self, rb: &mut B, values: &[u8]) -> bool {
        self.operations_count += 1;
        rb.write_all(values)
    }

    fn read<B: VerifiableRingBuffer>(&mut self, rb: &mut B) -> Option<u8> {
        self.operations_count += 1;
        rb.read()
    }

    fn filled<B: VerifiableRingBuffer>(&mut self) -> Result<B, String> {
        let mut rb = self.fresh::<B>()?;
        for value in self.values(self.config.capacity) {
            if !self.write(&mut rb, value) {
                return Err(format!("write({:#04x}) rejected before buffer was full", value));
            }
        }
        Ok(rb)
    }
}

fn expect<T: PartialEq + fmt::Debug>(what: &str, actual: T, expected: T) -> Result<(), String> {
    if actual == expected {
        Ok(())
    } else {
        Err(format!("{}: expected {:?}, got {:?}", what, expected, actual))
    }
}

fn fresh_buffer_is_empty<B: VerifiableRingBuffer>(run: &mut Run<'_>) -> Result<(), String> {
    let rb = run.fresh::<B>()?;
    expect("len", rb.len(), 0)?;
    expect("is_empty", rb.is_empty(), true)?;
    expect("slots", rb.slots(), vec![None; run.config.capacity])
}

fn writes_fill_buffer<B: VerifiableRingBuffer>(run: &mut Run<'_>) -> Result<(), String> {
    let rb = run.filled::<B>()?;
    expect("len", rb.len(), run.config.capacity)?;
    expect("is_full", rb.is_full(), true)?;
    expect("data", rb.data(), run.values(run.config.capacity))
}

fn write_past_capacity_rejected<B: VerifiableRingBuffer>(run: &mut Run<'_>) -> Result<(), String> {
    let mut rb = run.filled::<B>()?;
    let extra = run.value(run.config.capacity);
    expect("write when full", run.write(&mut rb, extra), false)?;
    expect("len", rb.len(), run.config.capacity)?;
    expect("data", rb.data(), run.values(run.config.capacity))
}

fn oversized_batch_rejected<B: VerifiableRingBuffer>(run: &mut Run<'_>) -> Result<(), String> {
    let mut rb = run.fresh::<B>()?;
    let batch = run.values(run.config.capacity + 1);
    expect("oversized write_all", run.write_all(&mut rb, &batch), false)?;
    expect("len", rb.len(), 0)?;
    expect("slots", rb.slots(), vec![None; run.config.capacity])
}

fn write_read_write_wraps<B: VerifiableRingBuffer>(run: &mut Run<'_>) -> Result<(), String> {
    let capacity = run.config.capacity;
    let mut rb = run.fresh::<B>()?;

    expect("write_all first two", run.write_all(&mut rb, &run.values(2)), true)?;
    expect("read", run.read(&mut rb), Some(run.value(0)))?;
    expect("data after read", rb.data(), vec![run.value(1)])?;

    // refill to capacity; the last write lands in slot 0
    let rest: Vec<u8> = (2..=capacity).map(|i| run.value(i)).collect();
    let (last, middle) = rest.split_last().ok_or("capacity below 2")?;
    expect("write_all middle", run.write_all(&mut rb, middle), true)?;
    expect("write last", run.write(&mut rb, *last), true)?;

    expect("data", rb.data(), (1..=capacity).map(|i| run.value(i)).collect())?;
    expect("head", rb.head(), 1)?;
    expect("tail", rb.tail(), 1)?;

    let mut slots = vec![Some(*last)];
    slots.extend((1..capacity).map(|i| Some(run.value(i))));
    expect("slots", rb.slots(), slots)
}

fn drain_then_underflow<B: VerifiableRingBuffer>(run: &mut Run<'_>) -> Result<(), String> {
    let mut rb = run.filled::<B>()?;
    for i in 0..run.config.capacity {
        expect("read", run.read(&mut rb), Some(run.value(i)))?;
        expect("len", rb.len(), run.config.capacity - i - 1)?;
    }
    expect("read when empty", run.read(&mut rb), None)?;
    expect("is_empty", rb.is_empty(), true)
}

type Scenario = fn(&mut Run<'_>) -> Result<(), String>;

fn scenarios<B: VerifiableRingBuffer>() -> [(&'static str, Scenario); 6] {
    [
        ("fresh buffer is empty", fresh_buffer_is_empty::<B>),
        ("writes fill the buffer", writes_fill_buffer::<B>),
        ("write past capacity is rejected", write_past_capacity_rejected::<B>),
        ("oversized batch is rejected atomically", oversized_batch_rejected::<B>),
        ("write, read, write wraps around", write_read_write_wraps::<B>),
        ("drain then underflow", drain_then_underflow::<B>),
    ]
}

/// Verify an implementation against the canonical scenarios.
///
/// Stops at the first scenario that fails.
pub fn verify_implementation<B: VerifiableRingBuffer>(config: &VerifierConfig) -> VerificationResult {
    let mut run = Run {
        config,
        operations_count: 0,
    };
    let mut scenarios_checked = Vec::new();

    if config.capacity < 2 {
        return VerificationResult {
            passed: false,
            operations_count: 0,
            scenarios_checked,
            error: Some(format!("capacity must be at least 2, got {}", config.capacity)),
        };
    }

    for (name, scenario) in scenarios::<B>() {
        if let Err(e) = scenario(&mut run) {
            warn!(scenario = name, error = %e, "scenario failed");
            return VerificationResult {
                passed: false,
                operations_count: run.operations_count,
                scenarios_checked,
                error: Some(format!("{}: {}", name, e)),
            };
        }
        debug!(scenario = name, "scenario passed");
        scenarios_checked.push(name.to_string());
    }

    VerificationResult {
        passed: true,
        operations_count: run.operations_count,
        scenarios_checked,
        error: None,
    }
}
