//! Ring buffer with history tracking for property verification.
//!
//! `TrackedRingBuffer` forwards every operation to a plain
//! `RingBuffer<u64>` and records what went in, what came out, and the
//! operation log. The buffer itself stays free of bookkeeping.

use rb_core::{OperationRecord, RingBufferProperties};

use crate::error::RingBufferError;
use crate::ring_buffer::RingBuffer;

/// A `RingBuffer<u64>` that remembers its history.
#[derive(Debug, Clone)]
pub struct TrackedRingBuffer {
    inner: RingBuffer<u64>,
    produced: Vec<u64>,
    consumed: Vec<u64>,
    log: Vec<OperationRecord>,
}

impl TrackedRingBuffer {
    /// Create an empty tracked buffer.
    ///
    /// # Errors
    ///
    /// [`RingBufferError::ZeroCapacity`] when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, RingBufferError> {
        Ok(Self {
            inner: RingBuffer::new(capacity)?,
            produced: Vec::new(),
            consumed: Vec::new(),
            log: Vec::new(),
        })
    }

    /// The wrapped buffer.
    #[must_use]
    pub fn inner(&self) -> &RingBuffer<u64> {
        &self.inner
    }

    fn record(&mut self, operation: String, success: bool) {
        let step = self.log.len() as u64 + 1;
        self.log.push(OperationRecord {
            step,
            operation,
            success,
        });
    }

    pub fn write(&mut self, value: u64) -> bool {
        let accepted = self.inner.write(value);
        if accepted {
            self.produced.push(value);
        }
        self.record(format!("write({})", value), accepted);
        accepted
    }

    pub fn write_all(&mut self, values: &[u64]) -> bool {
        let accepted = self.inner.write_all(values.iter().copied());
        if accepted {
            self.produced.extend_from_slice(values);
        }
        self.record(format!("write_all({:?})", values), accepted);
        accepted
    }

    pub fn read(&mut self) -> Option<u64> {
        let value = self.inner.read();
        if let Some(v) = value {
            self.consumed.push(v);
        }
        let operation = match value {
            Some(v) => format!("read() -> {}", v),
            None => "read() -> None".to_string(),
        };
        self.record(operation, value.is_some());
        value
    }

    pub fn peek(&self) -> Option<u64> {
        self.inner.peek().copied()
    }

    pub fn data(&self) -> Vec<u64> {
        self.inner.data()
    }

    pub fn dump(&mut self) -> Vec<u64> {
        let drained = self.inner.dump();
        self.consumed.extend_from_slice(&drained);
        self.record(format!("dump() -> {:?}", drained), true);
        drained
    }

    pub fn clear(&mut self) {
        let discarded = self.inner.data();
        self.inner.clear();
        self.consumed.extend(discarded);
        self.record("clear()".to_string(), true);
    }
}

impl RingBufferProperties for TrackedRingBuffer {
    fn produced_messages(&self) -> Vec<u64> {
        self.produced.clone()
    }

    fn consumed_messages(&self) -> Vec<u64> {
        self.consumed.clone()
    }

    fn current_contents(&self) -> Vec<u64> {
        self.inner.data()
    }

    fn capacity(&self) -> u64 {
        self.inner.capacity() as u64
    }

    fn len(&self) -> u64 {
        self.inner.len() as u64
    }

    fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    fn head(&self) -> u64 {
        self.inner.head() as u64
    }

    fn tail(&self) -> u64 {
        self.inner.tail() as u64
    }

    fn slot_occupancy(&self) -> Vec<bool> {
        self.inner.slots().iter().map(Option::is_some).collect()
    }

    fn operation_log(&self) -> Vec<OperationRecord> {
        self.log.clone()
    }
}
