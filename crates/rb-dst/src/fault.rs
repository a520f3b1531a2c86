//! Deterministic fault injection.

use std::fmt;

use serde::Serialize;

use crate::random::DeterministicRng;

/// How often faults fire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaultConfig {
    /// Probability that any single fault check fires, in `[0, 1]`
    pub failure_probability: f64,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            failure_probability: 0.01,
        }
    }
}

impl FaultConfig {
    /// Never inject faults.
    #[must_use]
    pub fn none() -> Self {
        Self {
            failure_probability: 0.0,
        }
    }

    /// Fire often enough that every run sees many faults.
    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            failure_probability: 0.1,
        }
    }
}

/// Counters kept by a `FaultInjector`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FaultStats {
    pub checks_count: u64,
    pub faults_count: u64,
}

impl fmt::Display for FaultStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "faults={} checks={}", self.faults_count, self.checks_count)
    }
}

/// Decides, reproducibly, whether a fault fires.
#[derive(Debug, Clone)]
pub struct FaultInjector {
    rng: DeterministicRng,
    config: FaultConfig,
    stats: FaultStats,
}

impl FaultInjector {
    #[must_use]
    pub fn new(rng: DeterministicRng, config: FaultConfig) -> Self {
        debug_assert!(
            (0.0..=1.0).contains(&config.failure_probability),
            "failure_probability must be in [0, 1]"
        );
        Self {
            rng,
            config,
            stats: FaultStats::default(),
        }
    }

    /// Roll for a fault.
    pub fn should_fail(&mut self) -> bool {
        self.stats.checks_count += 1;
        if self.config.failure_probability <= 0.0 {
            return false;
        }
        let fail = self.rng.gen_bool(self.config.failure_probability);
        if fail {
            self.stats.faults_count += 1;
        }
        fail
    }

    #[must_use]
    pub fn config(&self) -> &FaultConfig {
        &self.config
    }

    #[must_use]
    pub fn stats(&self) -> FaultStats {
        self.stats
    }
}
