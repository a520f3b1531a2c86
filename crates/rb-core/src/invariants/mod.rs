//! Invariant traits for verified structures.
//!
//! - `ring_buffer`: Ring Buffer invariants (BoundedCapacity, StatusConsistency,
//!   IndexBounds, SlotOccupancy, NoLostMessages, FIFO_Order)

pub mod ring_buffer;

pub use ring_buffer::{RingBufferProperties, RingBufferPropertyChecker};
