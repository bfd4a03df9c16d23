//! Trait interfaces for rigblend.
//!
//! - [`WeightSolve`]: snapshot to sparse shape weights (rigblend-solver implements)

use crate::snapshot::Snapshot;
use crate::types::{ShapeId, ShapeWeight};

/// Pure computation of shape weights from raw slider values.
///
/// Implementations hold no per-call state: the same snapshot always yields a
/// bit-identical result, and independent snapshots may be solved from many
/// threads at once.
pub trait WeightSolve: Send + Sync {
    /// Sparse weights sorted by shape id. Shapes at exactly zero are omitted
    /// and every weight lies in `(0, 1]`.
    fn solve(&self, snapshot: &Snapshot) -> Vec<ShapeWeight>;

    /// Weight of a single shape for a snapshot.
    ///
    /// Default implementation searches the result of [`solve`](Self::solve).
    fn weight(&self, snapshot: &Snapshot, shape: ShapeId) -> f64 {
        let weights = self.solve(snapshot);
        weights
            .binary_search_by_key(&shape, |w| w.shape)
            .map(|i| weights[i].weight)
            .unwrap_or(0.0)
    }
}
