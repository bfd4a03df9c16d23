//! Solver-wide properties under randomized snapshots.
//!
//! Properties checked:
//! - Every emitted weight lies in (0, 1] and output is sorted by shape
//! - A slider never drives shapes on both of its sides at once
//! - Along any chain of nested combos an axis is never overdriven, and a
//!   slider whose combos all nest is distributed exactly once
//! - A combo's corner shapes never exceed its weakest axis
//! - Combo definition order does not change the result
//! - Small input changes produce small output changes, including across zero
//! - Identical snapshots give bit-identical results

use proptest::prelude::*;
use rigblend_core::model::ShapeOwner;
use rigblend_core::{CombinationModel, ComboId, ShapeWeight, Sign, SliderId, Snapshot};
use rigblend_tests::helpers::*;

const TOL: f64 = 1e-5;

fn dense(values: &[f64]) -> Snapshot {
    Snapshot::from_dense(values)
}

fn weight_of(weights: &[ShapeWeight], index: usize) -> f64 {
    weights
        .iter()
        .find(|w| w.shape.index() == index)
        .map(|w| w.weight)
        .unwrap_or(0.0)
}

/// One combo's axes contain the other's.
fn nested(model: &CombinationModel, a: ComboId, b: ComboId) -> bool {
    let (a, b) = (model.combo(a).axes(), model.combo(b).axes());
    a.iter().all(|x| b.contains(x)) || b.iter().all(|x| a.contains(x))
}

fn values() -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec(
        prop_oneof![Just(0.0), Just(1.0), Just(-1.0), -1.0f64..=1.0],
        4,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn weights_are_normalized_and_sorted(v in values()) {
        let out = face_solver().solve(&dense(&v));
        for w in &out {
            prop_assert!(w.weight > 0.0 && w.weight <= 1.0, "weight {}", w.weight);
        }
        prop_assert!(out.windows(2).all(|p| p[0].shape < p[1].shape));
    }

    #[test]
    fn sides_are_exclusive(v in values()) {
        let solver = face_solver();
        let model = solver.model();
        let out = solver.solve(&dense(&v));
        for (i, slider) in model.sliders().iter().enumerate() {
            let pos = slider.shape(Sign::Positive).map_or(0.0, |s| weight_of(&out, s.index()));
            let neg = slider.shape(Sign::Negative).map_or(0.0, |s| weight_of(&out, s.index()));
            prop_assert!(pos == 0.0 || neg == 0.0, "slider {} drives both sides", i);
        }
    }

    #[test]
    fn nested_items_never_overdrive_an_axis(v in values()) {
        let solver = face_solver();
        let model = solver.model();
        let out = solver.solve(&dense(&v));
        for (i, &a) in v.iter().enumerate() {
            let slider = SliderId(i as u32);
            let combos = model.slider(slider).combos();
            let own: f64 = out
                .iter()
                .filter(|w| matches!(model.shape(w.shape).owner(), ShapeOwner::Slider { slider: s, .. } if s == slider))
                .map(|w| w.weight)
                .sum();
            prop_assert!(own <= a.abs() + TOL, "axis {} own share {} > {}", i, own, a);
            for &combo in combos {
                let chain: f64 = out
                    .iter()
                    .filter(|w| match model.shape(w.shape).owner() {
                        ShapeOwner::Combo { combo: c, .. } => nested(model, c, combo),
                        _ => false,
                    })
                    .map(|w| w.weight)
                    .sum();
                prop_assert!(
                    own + chain <= a.abs() + TOL,
                    "axis {} overdriven along {}: {} > {}", i, model.combo(combo).name(), own + chain, a
                );
            }

            // With both sides shaped and every combo on the axis nested in the
            // next, nothing is lost either.
            let both_sides = model.slider(slider).shape(Sign::Positive).is_some()
                && model.slider(slider).shape(Sign::Negative).is_some();
            let one_chain = combos.iter().all(|&x| combos.iter().all(|&y| nested(model, x, y)));
            if both_sides && one_chain {
                let share: f64 = out
                    .iter()
                    .filter(|w| involves(model, model.shape(w.shape).owner(), slider))
                    .map(|w| w.weight)
                    .sum();
                prop_assert!((share - a.abs()).abs() <= TOL, "axis {} share {} != {}", i, share, a);
            }
        }
    }

    #[test]
    fn combo_order_is_irrelevant(v in values()) {
        let forward = face_solver();
        let mut def = face_definition();
        def.combos.reverse();
        let reversed = solver_from(&def);
        let a = by_name(forward.model(), &forward.solve(&dense(&v)));
        let b = by_name(reversed.model(), &reversed.solve(&dense(&v)));
        prop_assert_eq!(a.len(), b.len());
        for (name, w) in &a {
            prop_assert!(b.get(name).is_some_and(|x| (x - w).abs() <= TOL), "{} differs", name);
        }
    }

    #[test]
    fn corner_weight_bounded_by_weakest_axis(v in values()) {
        let solver = face_solver();
        let model = solver.model();
        let out = solver.solve(&dense(&v));
        for w in &out {
            if let ShapeOwner::Combo { combo, .. } = model.shape(w.shape).owner() {
                let weakest = model
                    .combo(combo)
                    .axes()
                    .iter()
                    .map(|a| v[a.index()].abs())
                    .fold(f64::INFINITY, f64::min);
                prop_assert!(w.weight <= weakest + TOL);
            }
        }
    }

    #[test]
    fn small_moves_give_small_changes(
        v in values(),
        axis in 0usize..4,
        delta in -1e-3f64..=1e-3,
    ) {
        let solver = face_solver();
        let before = solver.solve(&dense(&v));
        let mut moved = v.clone();
        moved[axis] += delta;
        let after = solver.solve(&dense(&moved));
        for shape in 0..solver.model().shapes().len() {
            let diff = (weight_of(&before, shape) - weight_of(&after, shape)).abs();
            prop_assert!(diff <= 4.0 * delta.abs() + TOL, "shape {} jumped by {}", shape, diff);
        }
    }

    #[test]
    fn crossing_zero_is_continuous(others in values(), axis in 0usize..4, h in 1e-7f64..1e-3) {
        let solver = face_solver();
        let mut lo = others.clone();
        let mut hi = others;
        lo[axis] = -h;
        hi[axis] = h;
        let a = solver.solve(&dense(&lo));
        let b = solver.solve(&dense(&hi));
        for shape in 0..solver.model().shapes().len() {
            let diff = (weight_of(&a, shape) - weight_of(&b, shape)).abs();
            prop_assert!(diff <= 4.0 * h + TOL, "shape {} jumped by {}", shape, diff);
        }
    }

    #[test]
    fn solving_is_deterministic(v in values()) {
        let first = face_solver().solve(&dense(&v));
        let second = face_solver();
        // A warm cache must not change the answer.
        second.solve(&dense(&v));
        let again = second.solve(&dense(&v));
        prop_assert_eq!(first.len(), again.len());
        for (x, y) in first.iter().zip(&again) {
            prop_assert_eq!(x.shape, y.shape);
            prop_assert_eq!(x.weight.to_bits(), y.weight.to_bits());
        }
    }
}
