//! The simulation environment: seed, randomness and faults in one place.

use crate::fault::{FaultConfig, FaultInjector, FaultStats};
use crate::random::DeterministicRng;

/// Everything a DST run draws nondeterminism from.
///
/// The operation RNG and the fault RNG are seeded separately
/// (`seed` and `seed + 1`) so changing the fault rate does not change
/// which operations are generated.
#[derive(Debug, Clone)]
pub struct DstEnv {
    seed: u64,
    rng: DeterministicRng,
    fault: FaultInjector,
}

impl DstEnv {
    /// Environment with the default fault configuration.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_fault_config(seed, FaultConfig::default())
    }

    #[must_use]
    pub fn with_fault_config(seed: u64, fault_config: FaultConfig) -> Self {
        Self {
            seed,
            rng: DeterministicRng::new(seed),
            fault: FaultInjector::new(DeterministicRng::new(seed.wrapping_add(1)), fault_config),
        }
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn rng(&mut self) -> &mut DeterministicRng {
        &mut self.rng
    }

    pub fn fault(&mut self) -> &mut FaultInjector {
        &mut self.fault
    }

    /// `DST_SEED=<seed>`, ready to paste into a shell.
    #[must_use]
    pub fn format_seed(&self) -> String {
        format!("DST_SEED={}", self.seed)
    }

    #[must_use]
    pub fn stats(&self) -> FaultStats {
        self.fault.stats()
    }
}
