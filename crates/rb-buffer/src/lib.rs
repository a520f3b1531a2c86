//! # rb-buffer
//!
//! A fixed-capacity FIFO ring buffer for bounded producer/consumer staging.
//!
//! - `ring_buffer`: `RingBuffer<T>`, preallocated optional slots with
//!   head/tail bookkeeping, refusing writes that do not fit
//! - `tracked`: `TrackedRingBuffer`, the same buffer with produced/consumed
//!   histories so `rb-core`'s property checker can judge it
//! - `kani_proofs`: bounded proofs (under `#[cfg(kani)]`)
//!
//! Overflow and underflow are reported by value (`false` / `None`), never
//! by panicking. Zero capacity is refused at construction.

pub mod error;
pub mod kani_proofs;
pub mod ring_buffer;
pub mod tracked;

pub use error::RingBufferError;
pub use ring_buffer::{Iter, RingBuffer, Status};
pub use tracked::TrackedRingBuffer;
