//! # rb-dst
//!
//! Deterministic Simulation Testing for the ring buffer.
//!
//! Every source of nondeterminism in a test run (operation choice, batch
//! contents, fault timing) is drawn from a seeded RNG, so any failure can
//! be replayed exactly from its seed.
//!
//! ## Usage
//!
//! ```rust
//! use rb_buffer::RingBuffer;
//! use rb_dst::{DstEnv, DstHarness, HarnessConfig};
//!
//! let seed = 12345;
//! let mut env = DstEnv::new(seed);
//!
//! // Deterministic randomness
//! let value: u64 = env.rng().gen();
//! let choice = env.rng().gen_range(0..10);
//!
//! // Deterministic fault injection
//! if env.fault().should_fail() {
//!     // Simulate failure
//! }
//!
//! // Full randomized workload against the real buffer
//! let config = HarnessConfig::quick();
//! let buffer = RingBuffer::<u64>::new(config.capacity).unwrap();
//! let result = DstHarness::new(seed, config).run_buffer(buffer);
//! assert!(result.all_invariants_held, "{}", result.format());
//! # let _ = (value, choice);
//! ```
//!
//! ## Reproducibility
//!
//! To reproduce a failing test:
//! ```bash
//! DST_SEED=12345 cargo test
//! ```

pub mod env;
pub mod fault;
pub mod fault_injection;
pub mod harness;
pub mod random;

pub use env::DstEnv;
pub use fault::{FaultConfig, FaultInjector, FaultStats};
pub use fault_injection::{
    generate_operations, random_operation, run_dst_scenario, DstOp, DstResult, DstRunner,
    DstStats, DstTestableBuffer, FaultPoint, FaultType,
};
pub use harness::{DstHarness, HarnessConfig, HarnessResult};
pub use random::DeterministicRng;

/// Get DST seed from environment or generate random one.
///
/// Prints the seed for reproduction. Use `DST_SEED=<seed>` to reproduce.
#[must_use]
pub fn get_or_generate_seed() -> u64 {
    match std::env::var("DST_SEED") {
        Ok(s) => {
            let seed: u64 = s.parse().expect("DST_SEED must be a valid u64");
            println!("DST_SEED={} (from environment)", seed);
            seed
        }
        Err(_) => {
            let seed = rand::random::<u64>().max(1);
            println!("DST_SEED={} (randomly generated)", seed);
            seed
        }
    }
}

/// Number of DST iterations, from `DST_ITERATIONS` or `default`.
#[must_use]
pub fn get_iterations(default: u64) -> u64 {
    std::env::var("DST_ITERATIONS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
