//! TriSpace decomposition.
//!
//! Inside one region orthant, the activation point is written as a convex
//! combination of simplex vertices: the vertex spanned by every live axis gets
//! the smallest live coordinate, that amount is taken off every live axis, and
//! the split recurses on the axes still above epsilon. What is left over sits
//! at the origin and drives nothing.
//!
//! Each vertex weight is then handed to the shapes that [`Simplex::cover`]
//! picks for it. Along any chain of nested combos an axis' coordinate is
//! distributed once; combos that merely overlap each see the full vertex
//! weight, so no shape ever exceeds the weakest of its own axes.
//!
//! Weights land on each channel's full shape. In-between tracks are resolved
//! afterwards by the solver.

use ordered_float::OrderedFloat;
use tracing::trace;

use rigblend_core::{CombinationModel, ComboId, ShapeId, ShapeWeight, SliderId};

use crate::simplex::{RegionKey, SimplexCache};

/// One vertex of a barycentric split.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    /// Local axes spanning the vertex, ascending.
    pub axes: Vec<usize>,
    pub weight: f64,
}

/// Split local coordinates into vertex weights, largest vertex first.
///
/// Coordinates at or below `epsilon` never make an axis live. The weights sum
/// to the largest coordinate, and each axis appears in vertices summing to its
/// own coordinate.
pub fn barycentric_split(coords: &[f64], epsilon: f64) -> Vec<Vertex> {
    let mut remaining = coords.to_vec();
    let live: Vec<usize> = (0..coords.len()).filter(|&i| coords[i] > epsilon).collect();
    let mut vertices = Vec::with_capacity(live.len());
    peel(&mut remaining, live, epsilon, &mut vertices);
    vertices
}

fn peel(remaining: &mut [f64], live: Vec<usize>, epsilon: f64, out: &mut Vec<Vertex>) {
    let Some(OrderedFloat(floor)) = live.iter().map(|&i| OrderedFloat(remaining[i])).min() else {
        return;
    };
    for &i in &live {
        remaining[i] -= floor;
    }
    let next: Vec<usize> = live.iter().copied().filter(|&i| remaining[i] > epsilon).collect();
    out.push(Vertex { axes: live, weight: floor });
    peel(remaining, next, epsilon, out);
}

/// Decomposer bound to a model and its simplex cache.
pub struct TriSpace<'a> {
    model: &'a CombinationModel,
    cache: &'a SimplexCache,
    epsilon: f64,
}

impl<'a> TriSpace<'a> {
    pub fn new(model: &'a CombinationModel, cache: &'a SimplexCache, epsilon: f64) -> Self {
        Self { model, cache, epsilon }
    }

    /// Add the weights of one region to `sink`, indexed by shape.
    ///
    /// `axes` must be ascending and `values` holds their activations.
    pub fn solve_region(&self, axes: &[SliderId], values: &[f64], sink: &mut [f64]) {
        let simplex = self.cache.get_or_build(self.model, RegionKey::of(axes, values));
        let coords = simplex.local_coordinates(values, self.epsilon);
        let vertices = barycentric_split(&coords, self.epsilon);
        trace!(axes = axes.len(), vertices = vertices.len(), "trispace: region split");
        for vertex in vertices {
            for shape in simplex.cover(&vertex.axes) {
                sink[shape.index()] += vertex.weight;
            }
        }
    }

    /// Weights produced by one combo on its own, given one activation per axis
    /// in the combo's axis order.
    ///
    /// The result holds the combo's corner shape plus whatever residual its
    /// sub-combos and axis sliders receive, sorted by shape id. These are
    /// channel weights keyed by full shape, before in-between expansion.
    pub fn decompose_combo(&self, combo: ComboId, values: &[f64]) -> Vec<ShapeWeight> {
        let mut pairs: Vec<(SliderId, f64)> = self
            .model
            .combo(combo)
            .axes()
            .iter()
            .enumerate()
            .map(|(i, &axis)| (axis, values.get(i).copied().unwrap_or(0.0)))
            .collect();
        pairs.sort_unstable_by_key(|&(axis, _)| axis);
        let (axes, values): (Vec<SliderId>, Vec<f64>) = pairs.into_iter().unzip();

        let mut sink = vec![0.0; self.model.shapes().len()];
        self.solve_region(&axes, &values, &mut sink);
        sink.iter()
            .enumerate()
            .filter(|&(_, &w)| w > 0.0)
            .map(|(i, &w)| ShapeWeight {
                shape: ShapeId(i as u32),
                weight: w.min(1.0),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rigblend_core::{ModelBuilder, Orthant, Progression, Sign};

    const EPS: f64 = 1e-6;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// Smile (+ Smile_Pos, - Frown), Squint (+ Squint_Pos), combo at `++` and `-+`.
    fn face() -> CombinationModel {
        let mut b = ModelBuilder::new();
        let smile = b.add_slider("Smile", Progression::linear()).unwrap();
        let squint = b.add_slider("Squint", Progression::linear()).unwrap();
        b.attach_slider_shape(smile, Sign::Positive, "Smile_Pos").unwrap();
        b.attach_slider_shape(smile, Sign::Negative, "Frown").unwrap();
        b.attach_slider_shape(squint, Sign::Positive, "Squint_Pos").unwrap();
        let combo = b.add_combo("Smile+Squint", &[smile, squint]).unwrap();
        b.attach_combo_shape(combo, Orthant::all_positive(2), "SmileSquint").unwrap();
        b.attach_combo_shape(combo, "-+".parse().unwrap(), "FrownSquint").unwrap();
        b.build().unwrap()
    }

    fn named(model: &CombinationModel, weights: &[ShapeWeight]) -> Vec<(String, f64)> {
        weights
            .iter()
            .map(|w| (model.shape(w.shape).name().to_string(), w.weight))
            .collect()
    }

    // --- barycentric_split ---

    #[test]
    fn split_two_axes() {
        let v = barycentric_split(&[0.6, 1.0], EPS);
        assert_eq!(v.len(), 2);
        assert_eq!(v[0].axes, vec![0, 1]);
        assert!(approx(v[0].weight, 0.6));
        assert_eq!(v[1].axes, vec![1]);
        assert!(approx(v[1].weight, 0.4));
    }

    #[test]
    fn split_three_axes() {
        let v = barycentric_split(&[0.2, 0.7, 0.5], EPS);
        let axes: Vec<Vec<usize>> = v.iter().map(|v| v.axes.clone()).collect();
        assert_eq!(axes, vec![vec![0, 1, 2], vec![1, 2], vec![1]]);
        assert!(approx(v[0].weight, 0.2));
        assert!(approx(v[1].weight, 0.3));
        assert!(approx(v[2].weight, 0.2));
    }

    #[test]
    fn split_equal_coordinates_is_one_vertex() {
        let v = barycentric_split(&[0.5, 0.5], EPS);
        assert_eq!(v, vec![Vertex { axes: vec![0, 1], weight: 0.5 }]);
    }

    #[test]
    fn split_of_origin_is_empty() {
        assert!(barycentric_split(&[0.0, 0.0, 0.0], EPS).is_empty());
        assert!(barycentric_split(&[1e-9, 0.0], EPS).is_empty());
        assert!(barycentric_split(&[], EPS).is_empty());
    }

    // --- decompose_combo ---

    #[test]
    fn one_axis_at_zero_leaves_combo_silent() {
        let model = face();
        let cache = SimplexCache::new(16);
        let tri = TriSpace::new(&model, &cache, EPS);
        let combo = model.combo_id("Smile+Squint").unwrap();
        assert_eq!(
            named(&model, &tri.decompose_combo(combo, &[1.0, 0.0])),
            vec![("Smile_Pos".to_string(), 1.0)]
        );
    }

    #[test]
    fn full_corner_goes_to_combo() {
        let model = face();
        let cache = SimplexCache::new(16);
        let tri = TriSpace::new(&model, &cache, EPS);
        let combo = model.combo_id("Smile+Squint").unwrap();
        assert_eq!(
            named(&model, &tri.decompose_combo(combo, &[1.0, 1.0])),
            vec![("SmileSquint".to_string(), 1.0)]
        );
    }

    #[test]
    fn residual_goes_to_larger_axis() {
        let model = face();
        let cache = SimplexCache::new(16);
        let tri = TriSpace::new(&model, &cache, EPS);
        let combo = model.combo_id("Smile+Squint").unwrap();
        let out = named(&model, &tri.decompose_combo(combo, &[1.0, 0.6]));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].0, "Smile_Pos");
        assert!(approx(out[0].1, 0.4));
        assert_eq!(out[1].0, "SmileSquint");
        assert!(approx(out[1].1, 0.6));
    }

    #[test]
    fn negative_orthant_uses_its_own_shape() {
        let model = face();
        let cache = SimplexCache::new(16);
        let tri = TriSpace::new(&model, &cache, EPS);
        let combo = model.combo_id("Smile+Squint").unwrap();
        let out = named(&model, &tri.decompose_combo(combo, &[-0.5, 0.8]));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].0, "Squint_Pos");
        assert!(approx(out[0].1, 0.3));
        assert_eq!(out[1].0, "FrownSquint");
        assert!(approx(out[1].1, 0.5));
    }

    #[test]
    fn orthant_without_shape_falls_back_to_sliders() {
        let model = face();
        let cache = SimplexCache::new(16);
        let tri = TriSpace::new(&model, &cache, EPS);
        let combo = model.combo_id("Smile+Squint").unwrap();
        // Squint has no negative shape, so only the Smile side survives.
        let out = named(&model, &tri.decompose_combo(combo, &[0.7, -0.7]));
        assert_eq!(out, vec![("Smile_Pos".to_string(), 0.7)]);
    }

    #[test]
    fn neutral_combo_is_empty() {
        let model = face();
        let cache = SimplexCache::new(16);
        let tri = TriSpace::new(&model, &cache, EPS);
        let combo = model.combo_id("Smile+Squint").unwrap();
        assert!(tri.decompose_combo(combo, &[0.0, 0.0]).is_empty());
    }

    proptest! {
        #[test]
        fn split_weights_conserve_each_axis(coords in proptest::collection::vec(0.0f64..=1.0, 1..6)) {
            let vertices = barycentric_split(&coords, EPS);
            for (i, &c) in coords.iter().enumerate() {
                let share: f64 = vertices.iter().filter(|v| v.axes.contains(&i)).map(|v| v.weight).sum();
                if c > EPS {
                    prop_assert!((share - c).abs() <= coords.len() as f64 * EPS + 1e-12);
                } else {
                    prop_assert_eq!(share, 0.0);
                }
            }
        }

        #[test]
        fn split_total_is_largest_coordinate(coords in proptest::collection::vec(0.0f64..=1.0, 1..6)) {
            let total: f64 = barycentric_split(&coords, EPS).iter().map(|v| v.weight).sum();
            let max = coords.iter().cloned().fold(0.0, f64::max);
            prop_assert!(total <= max + 1e-12);
            if max > EPS {
                prop_assert!(max - total <= coords.len() as f64 * EPS + 1e-12);
            }
        }

        #[test]
        fn corner_shape_never_exceeds_largest_activation(a in -1.0f64..=1.0, b in -1.0f64..=1.0) {
            let model = face();
            let cache = SimplexCache::new(16);
            let tri = TriSpace::new(&model, &cache, EPS);
            let combo = model.combo_id("Smile+Squint").unwrap();
            let corners: Vec<ShapeId> = model.combo(combo).shapes().map(|(_, s)| s).collect();
            let sum: f64 = tri
                .decompose_combo(combo, &[a, b])
                .iter()
                .filter(|w| corners.contains(&w.shape))
                .map(|w| w.weight)
                .sum();
            prop_assert!(sum <= a.abs().max(b.abs()) + 1e-12);
        }
    }
}
