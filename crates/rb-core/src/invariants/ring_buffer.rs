//! Ring buffer invariants.
//!
//! | Property | Description |
//! |----------|-------------|
//! | BoundedCapacity | Buffer never holds more than `capacity` messages |
//! | StatusConsistency | `is_empty`/`is_full` agree with `len` |
//! | IndexBounds | `head`/`tail` are valid slots and `tail == head + len (mod capacity)` |
//! | SlotOccupancy | Exactly `len` slots are occupied, as one run starting at `head` |
//! | NoLostMessages | Every produced message is in the buffer or was consumed |
//! | FIFO_Order | Messages leave the buffer in production order |

use std::collections::HashMap;

use crate::counterexample::{Counterexample, OperationRecord, StateSnapshot};
use crate::property::{PropertyChecker, PropertyResult};

/// Properties that any ring buffer implementation must satisfy.
///
/// Implementations expose their observable state; the checker judges it.
/// Messages are `u64` so histories from any element type can be compared.
pub trait RingBufferProperties {
    /// All messages that have been accepted by a write (in order).
    fn produced_messages(&self) -> Vec<u64>;

    /// All messages that have left the buffer, in removal order.
    ///
    /// Includes messages returned by reads and messages discarded by
    /// clear or dump.
    fn consumed_messages(&self) -> Vec<u64>;

    /// Current messages in the buffer (head to tail order).
    fn current_contents(&self) -> Vec<u64>;

    /// Fixed capacity of the buffer.
    fn capacity(&self) -> u64;

    /// Number of occupied slots as reported by the buffer.
    fn len(&self) -> u64;

    /// The buffer's own emptiness query.
    fn is_empty(&self) -> bool;

    /// The buffer's own fullness query.
    fn is_full(&self) -> bool;

    /// Index of the next slot to read.
    fn head(&self) -> u64;

    /// Index of the next slot to write.
    fn tail(&self) -> u64;

    /// Occupancy of every physical slot, `true` meaning occupied.
    fn slot_occupancy(&self) -> Vec<bool>;

    /// Operations applied so far, used to build counterexamples.
    fn operation_log(&self) -> Vec<OperationRecord> {
        Vec::new()
    }
}

/// Property checker for ring buffer implementations.
pub struct RingBufferPropertyChecker<'a, T: RingBufferProperties> {
    buffer: &'a T,
    dst_seed: Option<u64>,
}

impl<'a, T: RingBufferProperties> RingBufferPropertyChecker<'a, T> {
    #[must_use]
    pub fn new(buffer: &'a T) -> Self {
        Self {
            buffer,
            dst_seed: None,
        }
    }

    /// Set DST seed for counterexample reproduction.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        debug_assert!(seed != 0, "DST seed should not be zero");
        self.dst_seed = Some(seed);
        self
    }

    fn counterexample(&self, description: &str) -> Counterexample {
        let mut ce = match self.dst_seed {
            Some(seed) => Counterexample::with_seed(seed),
            None => Counterexample::new(),
        }
        .with_description(description.to_string());

        let operations = self.buffer.operation_log();
        let step = operations.last().map_or(1, |op| op.step.max(1));
        for op in operations {
            ce.add_operation(op);
        }

        ce.add_state(StateSnapshot {
            step,
            description: format!(
                "len={} head={} tail={}",
                self.buffer.len(),
                self.buffer.head(),
                self.buffer.tail()
            ),
            variables: vec![
                ("capacity".to_string(), self.buffer.capacity().to_string()),
                ("contents".to_string(), format!("{:?}", self.buffer.current_contents())),
                ("produced".to_string(), format!("{:?}", self.buffer.produced_messages())),
                ("consumed".to_string(), format!("{:?}", self.buffer.consumed_messages())),
            ],
        });
        ce
    }

    fn fail(&self, name: &str, violation: String) -> PropertyResult {
        let ce = self.counterexample(&violation);
        PropertyResult::fail(name, violation, Some(ce))
    }

    /// BoundedCapacity
    ///
    /// The buffer never holds more than its capacity, and the contents it
    /// reports agree with its length.
    fn check_bounded_capacity(&self) -> PropertyResult {
        let len = self.buffer.len();
        let capacity = self.buffer.capacity();
        let contents_len = self.buffer.current_contents().len() as u64;

        if len > capacity {
            return self.fail(
                "BoundedCapacity",
                format!("Buffer reports {} items but capacity is {}", len, capacity),
            );
        }
        if contents_len != len {
            return self.fail(
                "BoundedCapacity",
                format!("Buffer reports len {} but holds {} items", len, contents_len),
            );
        }

        PropertyResult::pass("BoundedCapacity")
    }

    /// StatusConsistency
    ///
    /// Status is derived from the occupied count and never drifts from it.
    fn check_status_consistency(&self) -> PropertyResult {
        let len = self.buffer.len();
        let capacity = self.buffer.capacity();
        let is_empty = self.buffer.is_empty();
        let is_full = self.buffer.is_full();

        if is_empty != (len == 0) {
            return self.fail(
                "StatusConsistency",
                format!("is_empty={} but len={}", is_empty, len),
            );
        }
        if is_full != (len == capacity) {
            return self.fail(
                "StatusConsistency",
                format!("is_full={} but len={} capacity={}", is_full, len, capacity),
            );
        }

        PropertyResult::pass("StatusConsistency")
    }

    /// IndexBounds
    ///
    /// Head and tail always address a real slot, and the tail sits exactly
    /// `len` slots after the head.
    fn check_index_bounds(&self) -> PropertyResult {
        let capacity = self.buffer.capacity();
        let head = self.buffer.head();
        let tail = self.buffer.tail();
        let len = self.buffer.len();

        if capacity == 0 {
            return self.fail("IndexBounds", "Buffer has zero capacity".to_string());
        }
        if head >= capacity || tail >= capacity {
            return self.fail(
                "IndexBounds",
                format!("head={} tail={} out of range for capacity {}", head, tail, capacity),
            );
        }
        if tail != (head + len) % capacity {
            return self.fail(
                "IndexBounds",
                format!(
                    "tail={} but head={} + len={} wraps to {}",
                    tail,
                    head,
                    len,
                    (head + len) % capacity
                ),
            );
        }

        PropertyResult::pass("IndexBounds")
    }

    /// SlotOccupancy
    ///
    /// Exactly `len` slots are occupied and they form one contiguous run
    /// starting at `head`, wrapping modulo capacity.
    fn check_slot_occupancy(&self) -> PropertyResult {
        let occupancy = self.buffer.slot_occupancy();
        let capacity = self.buffer.capacity();
        let head = self.buffer.head();
        let len = self.buffer.len();

        if occupancy.len() as u64 != capacity {
            return self.fail(
                "SlotOccupancy",
                format!("{} slots allocated for capacity {}", occupancy.len(), capacity),
            );
        }

        let occupied = occupancy.iter().filter(|&&o| o).count() as u64;
        if occupied != len {
            return self.fail(
                "SlotOccupancy",
                format!("{} slots occupied but len is {}", occupied, len),
            );
        }

        for (index, &is_occupied) in occupancy.iter().enumerate() {
            let offset = (index as u64 + capacity - head % capacity) % capacity;
            let expected = offset < len;
            if is_occupied != expected {
                return self.fail(
                    "SlotOccupancy",
                    format!(
                        "Slot {} is {} but the run from head={} of len={} says {}",
                        index,
                        if is_occupied { "occupied" } else { "free" },
                        head,
                        len,
                        if expected { "occupied" } else { "free" }
                    ),
                );
            }
        }

        PropertyResult::pass("SlotOccupancy")
    }

    /// NoLostMessages
    ///
    /// Every produced message is either still buffered or was consumed,
    /// and nothing appears that was never produced.
    fn check_no_lost_messages(&self) -> PropertyResult {
        let mut balance: HashMap<u64, i64> = HashMap::new();
        for msg in self.buffer.produced_messages() {
            *balance.entry(msg).or_default() += 1;
        }
        for msg in self
            .buffer
            .consumed_messages()
            .into_iter()
            .chain(self.buffer.current_contents())
        {
            *balance.entry(msg).or_default() -= 1;
        }

        let mut unbalanced: Vec<(u64, i64)> = balance.into_iter().filter(|&(_, n)| n != 0).collect();
        unbalanced.sort_unstable();

        if let Some(&(msg, n)) = unbalanced.first() {
            let violation = if n > 0 {
                format!(
                    "Message {} was produced but is neither in buffer nor consumed ({} lost)",
                    msg, n
                )
            } else {
                format!("Message {} appeared {} more time(s) than it was produced", msg, -n)
            };
            return self.fail("NoLostMessages", violation);
        }

        PropertyResult::pass("NoLostMessages")
    }

    /// FIFO_Order
    ///
    /// Consumed messages followed by buffered messages reproduce the
    /// production sequence exactly.
    fn check_fifo_order(&self) -> PropertyResult {
        let produced = self.buffer.produced_messages();
        let observed: Vec<u64> = self
            .buffer
            .consumed_messages()
            .into_iter()
            .chain(self.buffer.current_contents())
            .collect();

        for (i, (expected, actual)) in produced.iter().zip(observed.iter()).enumerate() {
            if expected != actual {
                return self.fail(
                    "FIFO_Order",
                    format!(
                        "Message at position {} is {} but produced was {}",
                        i, actual, expected
                    ),
                );
            }
        }
        if produced.len() != observed.len() {
            return self.fail(
                "FIFO_Order",
                format!(
                    "{} messages produced but {} consumed or buffered",
                    produced.len(),
                    observed.len()
                ),
            );
        }

        PropertyResult::pass("FIFO_Order")
    }
}

impl<T: RingBufferProperties> PropertyChecker for RingBufferPropertyChecker<'_, T> {
    fn check_all(&self) -> Vec<PropertyResult> {
        vec![
            self.check_bounded_capacity(),
            self.check_status_consistency(),
            self.check_index_bounds(),
            self.check_slot_occupancy(),
            self.check_no_lost_messages(),
            self.check_fifo_order(),
        ]
    }
}
