//! Shareable solver handle.
//!
//! Wraps a [`WeightSolver`] in `Arc<RwLock<..>>`. Solves take a read lock, so
//! any number of evaluation threads run concurrently; edits take the write
//! lock and become visible to every later solve at once.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};

use rigblend_core::{CombinationModel, ConfigError, ModelBuilder, ShapeWeight, Snapshot, WeightSolve};

use crate::solver::WeightSolver;

#[derive(Debug, Clone)]
pub struct SharedSolver {
    inner: Arc<RwLock<WeightSolver>>,
}

impl SharedSolver {
    pub fn new(solver: WeightSolver) -> Self {
        Self {
            inner: Arc::new(RwLock::new(solver)),
        }
    }

    pub fn solve(&self, snapshot: &Snapshot) -> Vec<ShapeWeight> {
        self.inner.read().solve(snapshot)
    }

    pub fn solve_named(&self, snapshot: &Snapshot) -> BTreeMap<String, f64> {
        self.inner.read().solve_named(snapshot)
    }

    /// Transactional structural edit under the write lock.
    pub fn edit<F>(&self, f: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut ModelBuilder) -> Result<(), ConfigError>,
    {
        self.inner.write().edit(f)
    }

    pub fn replace_model(&self, model: CombinationModel) {
        self.inner.write().replace_model(model);
    }

    pub fn revision(&self) -> u64 {
        self.inner.read().model().revision()
    }

    /// Read access to the underlying solver, e.g. for model lookups.
    ///
    /// Holding the guard blocks edits.
    pub fn read(&self) -> RwLockReadGuard<'_, WeightSolver> {
        self.inner.read()
    }
}

impl WeightSolve for SharedSolver {
    fn solve(&self, snapshot: &Snapshot) -> Vec<ShapeWeight> {
        self.inner.read().solve(snapshot)
    }
}
