//! Region simplices and their cache.
//!
//! A [`Simplex`] is the precomputed geometry of one orthant of one region: a
//! signed unit direction per axis, the shape each lone axis falls back to,
//! and the combos that can claim vertices inside it, deepest first. Building
//! one walks the combo lists of every axis, so solvers keep them in a
//! [`SimplexCache`] keyed by [`RegionKey`].

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use tracing::{debug, warn};

use rigblend_core::{CombinationModel, ComboId, Orthant, ShapeId, Sign, SliderId};

/// Identity of a region orthant: its axes ascending by id, and one sign per axis.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegionKey {
    pub axes: Vec<SliderId>,
    pub signs: Vec<Sign>,
}

impl RegionKey {
    /// Key for the orthant that `values` lies in.
    ///
    /// `axes` must be ascending; `values` holds one activation per axis.
    pub fn of(axes: &[SliderId], values: &[f64]) -> Self {
        debug_assert!(axes.windows(2).all(|w| w[0] < w[1]));
        debug_assert_eq!(axes.len(), values.len());
        Self {
            axes: axes.to_vec(),
            signs: values.iter().map(|&v| Sign::of(v)).collect(),
        }
    }

    pub fn depth(&self) -> usize {
        self.axes.len()
    }
}

/// A combo able to claim vertices of a simplex.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub combo: ComboId,
    /// Positions of the combo's axes within the region, ascending.
    pub axes: Vec<usize>,
    pub shape: ShapeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Simplex {
    key: RegionKey,
    directions: Vec<f64>,
    axis_shapes: Vec<Option<ShapeId>>,
    candidates: Vec<Candidate>,
}

impl Simplex {
    pub fn build(model: &CombinationModel, key: RegionKey) -> Self {
        let local = |slider: SliderId| key.axes.binary_search(&slider).ok();

        let axis_shapes = key
            .axes
            .iter()
            .zip(&key.signs)
            .map(|(&slider, &sign)| model.slider(slider).shape(sign))
            .collect();

        let nearby: BTreeSet<ComboId> = key
            .axes
            .iter()
            .flat_map(|&slider| model.slider(slider).combos().iter().copied())
            .collect();

        let mut candidates = Vec::new();
        for id in nearby {
            let combo = model.combo(id);
            if !combo.enabled() {
                continue;
            }
            let Some(positions) = combo
                .axes()
                .iter()
                .map(|&axis| local(axis))
                .collect::<Option<Vec<usize>>>()
            else {
                continue;
            };
            let orthant = Orthant::from_signs(positions.iter().map(|&p| key.signs[p]));
            let Some(shape) = combo.shape(orthant) else {
                continue;
            };
            let mut axes = positions;
            axes.sort_unstable();
            candidates.push(Candidate { combo: id, axes, shape });
        }
        candidates.sort_by(|a, b| b.axes.len().cmp(&a.axes.len()).then(a.combo.cmp(&b.combo)));

        let directions = key.signs.iter().map(|sign| sign.signum()).collect();
        Self {
            key,
            directions,
            axis_shapes,
            candidates,
        }
    }

    pub fn key(&self) -> &RegionKey {
        &self.key
    }

    pub fn depth(&self) -> usize {
        self.key.depth()
    }

    /// Sign of the unit direction along each local axis, `1.0` or `-1.0`.
    pub fn directions(&self) -> &[f64] {
        &self.directions
    }

    /// Combos that can claim vertices here, deepest first then by id.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Project activations onto the direction vectors.
    ///
    /// Each coordinate is the activation's magnitude along its axis' direction,
    /// clamped to `[0, 1]`, with values at or below `epsilon` floored to 0.
    pub fn local_coordinates(&self, values: &[f64], epsilon: f64) -> Vec<f64> {
        debug_assert_eq!(values.len(), self.depth());
        values
            .iter()
            .zip(&self.directions)
            .map(|(&v, &direction)| {
                let m = v * direction;
                if m > epsilon { m.min(1.0) } else { 0.0 }
            })
            .collect()
    }

    /// Shapes that share the weight of the vertex spanned by `live`.
    ///
    /// A candidate fits when all its axes are live. Every fitting candidate not
    /// nested inside a deeper fitting one is taken, so overlapping combos of
    /// equal depth all receive the vertex weight and the result does not depend
    /// on combo order. Live axes claimed by no taken candidate fall back to
    /// their slider's shape.
    pub fn cover(&self, live: &[usize]) -> Vec<ShapeId> {
        let mut is_live = vec![false; self.depth()];
        for &i in live {
            is_live[i] = true;
        }
        let fits: Vec<&Candidate> = self
            .candidates
            .iter()
            .filter(|c| c.axes.iter().all(|&i| is_live[i]))
            .collect();

        let mut claimed = vec![false; self.depth()];
        let mut shapes = Vec::new();
        for candidate in &fits {
            let nested = fits
                .iter()
                .any(|other| other.axes.len() > candidate.axes.len() && is_subset(&candidate.axes, &other.axes));
            if nested {
                continue;
            }
            for &i in &candidate.axes {
                claimed[i] = true;
            }
            shapes.push(candidate.shape);
        }
        for &i in live {
            if !claimed[i] {
                if let Some(shape) = self.axis_shapes[i] {
                    shapes.push(shape);
                }
            }
        }
        shapes
    }
}

/// Both slices ascending.
fn is_subset(small: &[usize], large: &[usize]) -> bool {
    small.iter().all(|i| large.binary_search(i).is_ok())
}

/// Concurrent cache of built simplices.
///
/// Bounded by entry count; once full, further simplices are built per call
/// and not stored. The cache must be cleared whenever the model changes.
#[derive(Debug)]
pub struct SimplexCache {
    entries: DashMap<RegionKey, Arc<Simplex>>,
    capacity: usize,
    saturated: AtomicBool,
}

impl SimplexCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::with_capacity(capacity.min(1024)),
            capacity,
            saturated: AtomicBool::new(false),
        }
    }

    pub fn get_or_build(&self, model: &CombinationModel, key: RegionKey) -> Arc<Simplex> {
        if let Some(hit) = self.entries.get(&key) {
            return Arc::clone(hit.value());
        }
        let simplex = Arc::new(Simplex::build(model, key.clone()));
        if self.capacity == 0 {
            return simplex;
        }
        if self.entries.len() >= self.capacity {
            if !self.saturated.swap(true, Ordering::Relaxed) {
                warn!(capacity = self.capacity, "simplex_cache: full, building uncached");
            }
            return simplex;
        }
        debug!(
            axes = key.depth(),
            candidates = simplex.candidates().len(),
            "simplex_cache: built"
        );
        Arc::clone(self.entries.entry(key).or_insert(simplex).value())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.saturated.store(false, Ordering::Relaxed);
    }
}
