//! # rb-stateright
//!
//! Exhaustive verification of the ring buffer.
//!
//! ## Usage
//!
//! 1. Model checking (every history within a write bound):
//!    ```rust
//!    use rb_stateright::{verify_model, ModelConfig};
//!    let result = verify_model(&ModelConfig::quick()).unwrap();
//!    assert!(result.passed, "{}", result.format());
//!    ```
//!
//! 2. Implementation verification (canonical scenarios):
//!    ```rust
//!    use rb_buffer::RingBuffer;
//!    use rb_stateright::{verify_implementation, VerifierConfig};
//!    let result = verify_implementation::<RingBuffer<u8>>(&VerifierConfig::default());
//!    assert!(result.passed);
//!    ```
//!
//! ## Modules
//!
//! - `model`: stateright `Model` over the real `RingBuffer<u8>`
//! - `verifier`: scenario replay against any `VerifiableRingBuffer`

pub mod model;
pub mod verifier;

pub use model::{
    verify_model, ModelCheckResult, ModelConfig, RingBufferAction, RingBufferModel,
    RingBufferState, INVARIANTS, REACHABILITY,
};
pub use verifier::{verify_implementation, VerifiableRingBuffer, VerificationResult, VerifierConfig};
