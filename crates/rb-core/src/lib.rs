//! # rb-core
//!
//! Core types and invariants for the verified ring buffer.
//!
//! This crate provides:
//! - `PropertyResult` and `PropertyChecker` for verifying invariants
//! - `Counterexample` for rendering failure paths
//! - `RingBufferProperties`, the observable state any ring buffer exposes
//!   so the checker can judge it
//!
//! The crate knows nothing about a concrete buffer. Implementations
//! (`rb-buffer`), the simulation runner (`rb-dst`) and the model checker
//! (`rb-stateright`) all feed their state through the same checker, so a
//! property means the same thing at every verification level.

pub mod counterexample;
pub mod invariants;
pub mod property;

pub use counterexample::{Counterexample, OperationRecord, StateSnapshot};
pub use invariants::{RingBufferProperties, RingBufferPropertyChecker};
pub use property::{PropertyChecker, PropertyResult};
