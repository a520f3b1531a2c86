//! Kani proof harnesses for the ring buffer.
//!
//! These harnesses use bounded model checking to verify properties
//! of the buffer for all inputs up to a bound.
//!
//! # Running the proofs
//!
//! ```bash
//! # Run all proofs
//! cargo kani -p rb-buffer
//!
//! # Run a specific proof
//! cargo kani -p rb-buffer --harness proof_batch_rejection_is_atomic
//! ```

// Conditionally compile only when running under Kani
#[cfg(kani)]
mod proofs {
    use crate::ring_buffer::{RingBuffer, Status};

    const CAPACITY_MAX: usize = 4;

    fn any_capacity() -> usize {
        let capacity: usize = kani::any();
        kani::assume(capacity > 0 && capacity <= CAPACITY_MAX);
        capacity
    }

    /// A written value is the next value read from an empty buffer.
    #[kani::proof]
    #[kani::unwind(6)]
    fn proof_write_then_read_returns_value() {
        let mut rb = RingBuffer::new(any_capacity()).unwrap();
        let value: u8 = kani::any();

        kani::assert(rb.write(value), "Write to an empty buffer must succeed");
        kani::assert(rb.read() == Some(value), "Read must return the written value");
        kani::assert(rb.is_empty(), "Buffer must be empty again");
    }

    /// Writing to a full buffer changes nothing.
    #[kani::proof]
    #[kani::unwind(6)]
    fn proof_overflow_leaves_state_unchanged() {
        let capacity = any_capacity();
        let mut rb = RingBuffer::new(capacity).unwrap();
        for i in 0..capacity {
            rb.write(i as u8);
        }
        let before = rb.clone();

        kani::assert(!rb.write(kani::any()), "Write to a full buffer must fail");
        kani::assert(rb == before, "Overflow must not mutate the buffer");
    }

    /// A batch longer than the free space is rejected without partial writes.
    #[kani::proof]
    #[kani::unwind(6)]
    fn proof_batch_rejection_is_atomic() {
        let capacity = any_capacity();
        let mut rb = RingBuffer::new(capacity).unwrap();

        let prefill: usize = kani::any();
        kani::assume(prefill <= capacity);
        for i in 0..prefill {
            rb.write(i as u8);
        }
        let before = rb.clone();

        let batch = [1_u8, 2, 3, 4, 5];
        let batch_len: usize = kani::any();
        kani::assume(batch_len <= batch.len());
        kani::assume(batch_len > capacity - prefill);

        kani::assert(
            !rb.write_all(batch[..batch_len].iter().copied()),
            "Batch that does not fit must be rejected",
        );
        kani::assert(rb == before, "Rejected batch must leave the buffer unchanged");
    }

    /// Reading an empty buffer returns None.
    #[kani::proof]
    fn proof_empty_read_returns_none() {
        let mut rb: RingBuffer<u8> = RingBuffer::new(any_capacity()).unwrap();
        kani::assert(rb.read().is_none(), "Read on empty buffer must return None");
    }

    /// Status agrees with the element count after any short operation sequence.
    #[kani::proof]
    #[kani::unwind(6)]
    fn proof_status_matches_len() {
        let mut rb = RingBuffer::new(any_capacity()).unwrap();

        for _ in 0..CAPACITY_MAX {
            if kani::any() {
                rb.write(kani::any::<u8>());
            } else {
                rb.read();
            }
        }

        let status_ok = match rb.status() {
            Status::Empty => rb.len() == 0,
            Status::Full => rb.len() == rb.capacity(),
            Status::PartiallyFilled => rb.len() > 0 && rb.len() < rb.capacity(),
        };
        kani::assert(status_ok, "Status must be derived from len");
        kani::assert(rb.head() < rb.capacity(), "Head must stay in bounds");
        kani::assert(rb.tail() < rb.capacity(), "Tail must stay in bounds");
    }
}
