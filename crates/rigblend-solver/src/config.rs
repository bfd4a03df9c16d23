//! Solver tuning.

use serde::{Deserialize, Serialize};

use rigblend_core::SolverConfigError;
use rigblend_core::constants::{DEFAULT_ACTIVATION_EPSILON, DEFAULT_CACHE_CAPACITY, MAX_ACTIVATION_EPSILON};

/// Tuning knobs for a [`WeightSolver`](crate::WeightSolver).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Activations at or below this magnitude count as inactive.
    pub activation_epsilon: f64,
    /// Maximum cached region simplices. 0 disables caching.
    pub cache_capacity: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            activation_epsilon: DEFAULT_ACTIVATION_EPSILON,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> Result<(), SolverConfigError> {
        let eps = self.activation_epsilon;
        if !eps.is_finite() || !(0.0..MAX_ACTIVATION_EPSILON).contains(&eps) {
            return Err(SolverConfigError::InvalidEpsilon(eps));
        }
        Ok(())
    }
}
