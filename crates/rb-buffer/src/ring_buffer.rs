//! Fixed-capacity FIFO ring buffer.
//!
//! # Invariants
//!
//! | Property | Holds because |
//! |----------|---------------|
//! | BoundedCapacity | writes are refused once `len == capacity` |
//! | StatusConsistency | status is computed from `len` on every query |
//! | IndexBounds | `head`/`tail` only move through `advance`, capacity is never zero |
//! | SlotOccupancy | a write fills `tail`, a read empties `head`, nothing else touches slots |
//! | FIFO_Order | reads follow `head`, which trails `tail` by exactly `len` |
//!
//! # Overflow policy
//!
//! A single write to a full buffer is refused. A batch write is all or
//! nothing: when the batch is longer than the free space nothing is
//! written, even if a prefix would fit. Neither case ever overwrites
//! unread data.

use std::iter::FusedIterator;

use tracing::{debug, trace};

use crate::error::RingBufferError;

/// Occupancy classification, always derived from the element count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// No element is buffered.
    Empty,
    /// At least one element is buffered and at least one slot is free.
    PartiallyFilled,
    /// Every slot is occupied.
    Full,
}

/// A fixed-capacity circular buffer serving elements in FIFO order.
///
/// Storage is allocated once at construction as `capacity` optional
/// slots. A slot is `Some` while it holds an unread element and `None`
/// once it is free, so the raw slots can be inspected with
/// [`RingBuffer::slots`].
///
/// The buffer performs no synchronization. Sharing it between threads
/// needs an outer lock.
///
/// ```
/// use rb_buffer::{RingBuffer, Status};
///
/// let mut rb = RingBuffer::new(4)?;
/// assert!(rb.write_all([0x2A_u8, 0x2B]));
/// assert_eq!(rb.read(), Some(0x2A));
/// assert_eq!(rb.data(), vec![0x2B]);
/// assert_eq!(rb.status(), Status::PartiallyFilled);
///
/// // Five elements never fit in four slots: nothing is written.
/// assert!(!rb.write_all([1, 2, 3, 4, 5]));
/// assert_eq!(rb.len(), 1);
/// # Ok::<(), rb_buffer::RingBufferError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RingBuffer<T> {
    slots: Box<[Option<T>]>,
    /// Next slot to read
    head: usize,
    /// Next slot to write
    tail: usize,
    len: usize,
}

impl<T> RingBuffer<T> {
    /// Create an empty buffer with room for `capacity` elements.
    ///
    /// # Errors
    ///
    /// [`RingBufferError::ZeroCapacity`] when `capacity` is zero; such a
    /// buffer would have no valid slot index.
    pub fn new(capacity: usize) -> Result<Self, RingBufferError> {
        if capacity == 0 {
            debug!("refusing to create a ring buffer with zero capacity");
            return Err(RingBufferError::ZeroCapacity);
        }

        let slots: Box<[Option<T>]> = std::iter::repeat_with(|| None).take(capacity).collect();
        trace!(capacity, "ring buffer created");

        Ok(Self {
            slots,
            head: 0,
            tail: 0,
            len: 0,
        })
    }

    /// Fixed number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of buffered elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Number of free slots.
    #[must_use]
    pub fn available(&self) -> usize {
        self.capacity() - self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// True when at least one element is buffered. A full buffer has data.
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.len > 0
    }

    #[must_use]
    pub fn status(&self) -> Status {
        if self.is_empty() {
            Status::Empty
        } else if self.is_full() {
            Status::Full
        } else {
            Status::PartiallyFilled
        }
    }

    /// Index of the next slot to read.
    #[must_use]
    pub fn head(&self) -> usize {
        self.head
    }

    /// Index of the next slot to write.
    #[must_use]
    pub fn tail(&self) -> usize {
        self.tail
    }

    /// Raw slot contents in physical order.
    #[must_use]
    pub fn slots(&self) -> &[Option<T>] {
        &self.slots
    }

    fn advance(&self, index: usize) -> usize {
        (index + 1) % self.capacity()
    }

    /// Store one element at the tail. Caller guarantees a free slot.
    fn push_unchecked(&mut self, value: T) {
        debug_assert!(!self.is_full(), "push_unchecked on a full buffer");
        debug_assert!(self.slots[self.tail].is_none(), "tail slot must be free");

        self.slots[self.tail] = Some(value);
        self.tail = self.advance(self.tail);
        self.len += 1;
    }

    /// Append one element. Returns `false` and leaves the buffer untouched
    /// when it is full.
    pub fn write(&mut self, value: T) -> bool {
        self.try_write(value).is_ok()
    }

    /// Append one element, reporting overflow as an error.
    ///
    /// # Errors
    ///
    /// [`RingBufferError::Overflow`] when the buffer is full. The value is
    /// dropped and the buffer is unchanged.
    pub fn try_write(&mut self, value: T) -> Result<(), RingBufferError> {
        if self.is_full() {
            debug!(capacity = self.capacity(), "write rejected: buffer full");
            return Err(RingBufferError::Overflow {
                requested: 1,
                available: 0,
            });
        }

        self.push_unchecked(value);
        Ok(())
    }

    /// Append every element of `values`, or none of them.
    ///
    /// Returns `false` when the batch is longer than the free space; the
    /// buffer is then left exactly as it was. An empty batch always
    /// succeeds, even on a full buffer.
    pub fn write_all<I>(&mut self, values: I) -> bool
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        self.try_write_all(values).is_ok()
    }

    /// Append every element of `values`, or none of them, reporting how
    /// much space was missing on rejection.
    ///
    /// # Errors
    ///
    /// [`RingBufferError::Overflow`] with the batch length and the free
    /// slot count when the batch does not fit. Nothing is written.
    pub fn try_write_all<I>(&mut self, values: I) -> Result<(), RingBufferError>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        let values = values.into_iter();
        let requested = values.len();
        let available = self.available();

        if requested > available {
            debug!(requested, available, "batch write rejected: not enough free slots");
            return Err(RingBufferError::Overflow {
                requested,
                available,
            });
        }

        // An iterator whose reported length is short must not overrun the free space.
        for value in values.take(requested) {
            self.push_unchecked(value);
        }
        Ok(())
    }

    /// Remove and return the oldest element, or `None` when empty.
    pub fn read(&mut self) -> Option<T> {
        if self.is_empty() {
            debug!("read on empty buffer");
            return None;
        }

        let value = self.slots[self.head].take();
        debug_assert!(value.is_some(), "head slot of a non-empty buffer must be occupied");
        self.head = self.advance(self.head);
        self.len -= 1;
        value
    }

    /// The oldest element without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        self.slots[self.head].as_ref()
    }

    /// Iterate over buffered elements from oldest to newest.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            slots: &self.slots,
            pos: self.head,
            remaining: self.len,
        }
    }

    /// Copy of the buffered elements from oldest to newest.
    #[must_use]
    pub fn data(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }

    /// Take every buffered element (oldest first) and reset to empty.
    pub fn dump(&mut self) -> Vec<T> {
        let mut drained = Vec::with_capacity(self.len);
        for i in 0..self.len {
            let index = (self.head + i) % self.capacity();
            if let Some(value) = self.slots[index].take() {
                drained.push(value);
            }
        }
        trace!(dumped = drained.len(), "ring buffer dumped");

        self.reset();
        drained
    }

    /// Discard every buffered element and reset to empty.
    pub fn clear(&mut self) {
        trace!(discarded = self.len, "ring buffer cleared");
        self.reset();
    }

    fn reset(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.head = 0;
        self.tail = 0;
        self.len = 0;
    }
}

/// Iterator over buffered elements, oldest first.
#[derive(Debug, Clone)]
pub struct Iter<'a, T> {
    slots: &'a [Option<T>],
    pos: usize,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let item = self.slots[self.pos].as_ref();
        self.pos = (self.pos + 1) % self.slots.len();
        self.remaining -= 1;
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a RingBuffer<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(values: &[u8]) -> RingBuffer<u8> {
        let mut rb = RingBuffer::new(4).unwrap();
        assert!(rb.write_all(values.iter().copied()));
        rb
    }

    #[test]
    fn test_init_properties() {
        let rb: RingBuffer<u8> = RingBuffer::new(4).unwrap();

        assert_eq!(rb.capacity(), 4);
        assert_eq!(rb.slots(), &[None, None, None, None]);
        assert_eq!(rb.status(), Status::Empty);
        assert_eq!(rb.head(), 0);
        assert_eq!(rb.tail(), 0);
        assert_eq!(rb.len(), 0);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result: Result<RingBuffer<u8>, _> = RingBuffer::new(0);
        assert_eq!(result.unwrap_err(), RingBufferError::ZeroCapacity);
    }

    #[test]
    fn test_write_element() {
        let mut rb = RingBuffer::new(4).unwrap();

        assert!(rb.write(0x2A_u8));
        assert_eq!(rb.len(), 1);
        assert_eq!(rb.slots(), &[Some(0x2A), None, None, None]);

        assert!(rb.write(0x2B));
        assert_eq!(rb.slots(), &[Some(0x2A), Some(0x2B), None, None]);

        assert!(rb.write(0x2C));
        assert_eq!(rb.slots(), &[Some(0x2A), Some(0x2B), Some(0x2C), None]);

        assert!(rb.write(0x2D));
        assert_eq!(rb.len(), 4);
        assert_eq!(rb.slots(), &[Some(0x2A), Some(0x2B), Some(0x2C), Some(0x2D)]);
        assert!(rb.is_full());
    }

    #[test]
    fn test_write_element_full_overflow() {
        let mut rb = filled(&[0x2A, 0x2B, 0x2C, 0x2D]);
        let before = rb.clone();

        assert!(!rb.write(0x2E));
        assert_eq!(rb, before, "overflow must not touch the buffer");
        assert_eq!(rb.data(), vec![0x2A, 0x2B, 0x2C, 0x2D]);

        assert_eq!(
            rb.try_write(0x2E),
            Err(RingBufferError::Overflow {
                requested: 1,
                available: 0
            })
        );
    }

    #[test]
    fn test_write_array() {
        let mut rb = RingBuffer::new(4).unwrap();

        assert!(rb.write_all([0x2A_u8, 0x2B]));
        assert_eq!(rb.len(), 2);
        assert_eq!(rb.slots(), &[Some(0x2A), Some(0x2B), None, None]);

        assert!(rb.write_all(vec![0x2C, 0x2D]));
        assert_eq!(rb.len(), 4);
        assert_eq!(rb.slots(), &[Some(0x2A), Some(0x2B), Some(0x2C), Some(0x2D)]);
    }

    #[test]
    fn test_write_array_full_overflow() {
        let mut rb = filled(&[0x2A, 0x2B, 0x2C, 0x2D]);

        assert!(!rb.write_all([0x2E, 0x2F]));
        assert_eq!(rb.len(), 4);
        assert_eq!(rb.slots(), &[Some(0x2A), Some(0x2B), Some(0x2C), Some(0x2D)]);
    }

    #[test]
    fn test_write_array_with_left_size_not_enough_overflow() {
        let mut rb = RingBuffer::new(4).unwrap();

        assert!(!rb.write_all([0x2A_u8, 0x2B, 0x2C, 0x2D, 0x2E]));
        assert_eq!(rb.len(), 0);
        assert_eq!(rb.slots(), &[None, None, None, None]);

        assert_eq!(
            rb.try_write_all([0x2A_u8, 0x2B, 0x2C, 0x2D, 0x2E]),
            Err(RingBufferError::Overflow {
                requested: 5,
                available: 4
            })
        );
    }

    #[test]
    fn test_partial_fit_batch_rejected() {
        let mut rb = filled(&[1, 2]);
        let before = rb.clone();

        // Two slots free, three requested: the first two would fit but none are written.
        assert!(!rb.write_all([3, 4, 5]));
        assert_eq!(rb, before);
    }

    #[test]
    fn test_empty_batch_on_full_buffer() {
        let mut rb = filled(&[1, 2, 3, 4]);

        assert!(rb.write_all(Vec::new()));
        assert_eq!(rb.try_write_all(std::iter::empty()), Ok(()));
        assert_eq!(rb.data(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_read_element() {
        let mut rb = filled(&[0x2A, 0x2B]);
        assert_eq!(rb.data(), vec![0x2A, 0x2B]);

        assert_eq!(rb.read(), Some(0x2A));
        assert_eq!(rb.len(), 1);
        assert_eq!(rb.data(), vec![0x2B]);

        assert_eq!(rb.read(), Some(0x2B));
        assert_eq!(rb.len(), 0);
        assert!(rb.data().is_empty());

        assert_eq!(rb.read(), None);
        assert_eq!(rb.len(), 0);
        assert!(rb.data().is_empty());
    }

    #[test]
    fn test_read_element_full() {
        let mut rb = filled(&[0x2A, 0x2B, 0x2C, 0x2D]);

        for (expected, remaining) in [(0x2A, 3), (0x2B, 2), (0x2C, 1), (0x2D, 0)] {
            assert_eq!(rb.read(), Some(expected));
            assert_eq!(rb.len(), remaining);
        }
        assert_eq!(rb.read(), None);
        assert_eq!(rb.slots(), &[None, None, None, None]);
    }

    #[test]
    fn test_write_read_write() {
        let mut rb = filled(&[0x2A, 0x2B]);

        assert_eq!(rb.read(), Some(0x2A));
        assert_eq!(rb.data(), vec![0x2B]);

        assert!(rb.write_all([0x2C, 0x2D]));
        assert_eq!(rb.len(), 3);
        assert_eq!(rb.data(), vec![0x2B, 0x2C, 0x2D]);

        assert!(rb.write(0x2E));
        assert_eq!(rb.len(), 4);
        assert_eq!(rb.data(), vec![0x2B, 0x2C, 0x2D, 0x2E]);

        // 0x2E wrapped into slot 0
        assert_eq!(rb.slots(), &[Some(0x2E), Some(0x2B), Some(0x2C), Some(0x2D)]);
        assert_eq!(rb.head(), 1);
        assert_eq!(rb.tail(), 1);
    }

    #[test]
    fn test_underflow_is_idempotent() {
        let mut rb: RingBuffer<u8> = RingBuffer::new(2).unwrap();
        let before = rb.clone();

        for _ in 0..3 {
            assert_eq!(rb.read(), None);
            assert_eq!(rb, before);
        }
    }

    #[test]
    fn test_peek() {
        let mut rb = RingBuffer::new(3).unwrap();
        assert_eq!(rb.peek(), None);

        rb.write_all(["a", "b"]);
        assert_eq!(rb.peek(), Some(&"a"));
        assert_eq!(rb.len(), 2, "peek must not consume");

        rb.read();
        assert_eq!(rb.peek(), Some(&"b"));
    }

    #[test]
    fn test_iter_wraps() {
        let mut rb = RingBuffer::new(3).unwrap();
        rb.write_all([1, 2, 3]);
        rb.read();
        rb.read();
        rb.write_all([4, 5]);

        let iter = rb.iter();
        assert_eq!(iter.len(), 3);
        assert_eq!(iter.copied().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!((&rb).into_iter().count(), 3);
    }

    #[test]
    fn test_dump() {
        let mut rb = RingBuffer::new(4).unwrap();
        rb.write_all([1, 2, 3]);
        rb.read();
        rb.write_all([4, 5]);

        assert_eq!(rb.dump(), vec![2, 3, 4, 5]);
        assert_eq!(rb.status(), Status::Empty);
        assert_eq!(rb.slots(), &[None, None, None, None]);
        assert_eq!((rb.head(), rb.tail()), (0, 0));

        assert!(rb.dump().is_empty());
    }

    #[test]
    fn test_clear() {
        let mut rb = filled(&[1, 2, 3, 4]);
        rb.clear();
        assert_eq!(rb, RingBuffer::new(4).unwrap());

        rb.clear();
        assert_eq!(rb, RingBuffer::new(4).unwrap());
    }

    #[test]
    fn test_status_transitions() {
        let mut rb = RingBuffer::new(4).unwrap();
        assert!(rb.is_empty() && !rb.has_data() && !rb.is_full());

        rb.write_all([0x2A_u8, 0x2B]);
        assert_eq!(rb.status(), Status::PartiallyFilled);
        assert!(!rb.is_empty() && rb.has_data() && !rb.is_full());

        rb.write_all([0x2C, 0x2D]);
        assert_eq!(rb.status(), Status::Full);
        assert!(!rb.is_empty() && rb.has_data() && rb.is_full());

        rb.read();
        rb.read();
        assert_eq!(rb.status(), Status::PartiallyFilled);

        rb.read();
        rb.read();
        rb.read();
        assert_eq!(rb.status(), Status::Empty);
        assert!(rb.is_empty() && !rb.has_data() && !rb.is_full());

        rb.write_all([0x2A, 0x2B]);
        rb.write_all([0x2C, 0x2D]);
        assert_eq!(rb.status(), Status::Full);

        rb.read();
        assert_eq!(rb.status(), Status::PartiallyFilled);
    }

    #[test]
    fn test_capacity_reuse() {
        let mut rb = RingBuffer::new(3).unwrap();
        for round in 0..5_u32 {
            let base = round * 3;
            assert!(rb.write_all([base, base + 1, base + 2]));
            assert!(rb.is_full());
            for i in 0..3 {
                assert_eq!(rb.read(), Some(base + i));
            }
            assert!(rb.is_empty());
            assert!(rb.slots().iter().all(Option::is_none));
        }
    }

    #[test]
    fn test_capacity_one() {
        let mut rb = RingBuffer::new(1).unwrap();
        assert!(rb.write('x'));
        assert!(rb.is_full());
        assert!(!rb.write('y'));
        assert_eq!(rb.read(), Some('x'));
        assert_eq!((rb.head(), rb.tail()), (0, 0));
        assert!(rb.write('z'));
        assert_eq!(rb.data(), vec!['z']);
    }

    #[test]
    fn test_non_copy_elements() {
        let mut rb = RingBuffer::new(2).unwrap();
        assert!(rb.write(String::from("first")));
        assert!(rb.write(String::from("second")));
        assert!(!rb.write(String::from("third")));

        assert_eq!(rb.read().as_deref(), Some("first"));
        assert_eq!(rb.dump(), vec![String::from("second")]);
    }
}
