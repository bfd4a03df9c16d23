//! Track passes run after the region split.
//!
//! The region split leaves each channel's weight on its full shape.
//! [`expand_inbetweens`] moves that weight onto the in-between steps
//! bracketing it, and [`solve_traversals`] adds the shapes driven by
//! traversal controls, which sit outside the combo decomposition.

use tracing::trace;

use rigblend_core::CombinationModel;

/// Spread every slider-side and combo-orthant channel weight over its track.
pub fn expand_inbetweens(model: &CombinationModel, sink: &mut [f64]) {
    for track in model.inbetween_tracks() {
        let weight = std::mem::take(&mut sink[track.full().index()]);
        if weight <= 0.0 {
            continue;
        }
        for (shape, share) in track.spread(weight) {
            sink[shape.index()] += share;
        }
    }
}

/// Add the weights of every enabled traversal to `sink`.
///
/// The progress control picks the position along the track and the
/// multiplier control scales whatever the track yields there. Either control
/// at 0 leaves the traversal silent.
pub fn solve_traversals(model: &CombinationModel, activations: &[f64], epsilon: f64, sink: &mut [f64]) {
    for traversal in model.traversals() {
        if !traversal.enabled() {
            continue;
        }
        let progress = model.control_value(traversal.progress(), activations, epsilon);
        let multiplier = model.control_value(traversal.multiplier(), activations, epsilon);
        if progress <= 0.0 || multiplier <= 0.0 {
            continue;
        }
        trace!(traversal = traversal.name(), progress, multiplier, "traversal: driven");
        for (shape, share) in traversal.track().spread(progress) {
            sink[shape.index()] += share * multiplier;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigblend_core::{Control, ModelBuilder, Orthant, Progression, Sign};

    const EPS: f64 = 1e-6;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// Smile (+ Smile_Pos with Smile_Half at 0.5), Jaw (+ Jaw_Open), combo
    /// SmileJaw at `++`, and a traversal Open driven by Jaw and scaled by Smile.
    fn rig() -> CombinationModel {
        let mut b = ModelBuilder::new();
        let smile = b.add_slider("Smile", Progression::linear()).unwrap();
        let jaw = b.add_slider("Jaw", Progression::linear()).unwrap();
        b.attach_slider_shape(smile, Sign::Positive, "Smile_Pos").unwrap();
        b.attach_slider_inbetween(smile, Sign::Positive, 0.5, "Smile_Half").unwrap();
        b.attach_slider_shape(jaw, Sign::Positive, "Jaw_Open").unwrap();
        let combo = b.add_combo("SmileJaw", &[smile, jaw]).unwrap();
        b.attach_combo_shape(combo, Orthant::all_positive(2), "SmileJaw").unwrap();
        let open = b
            .add_traversal(
                "Open",
                Control::Slider { slider: jaw, sign: Sign::Positive },
                Control::Slider { slider: smile, sign: Sign::Positive },
                "Open_Full",
            )
            .unwrap();
        b.attach_traversal_inbetween(open, 0.5, "Open_Mid").unwrap();
        b.build().unwrap()
    }

    fn at(model: &CombinationModel, sink: &[f64], name: &str) -> f64 {
        sink[model.shape_id(name).unwrap().index()]
    }

    #[test]
    fn full_shape_weight_moves_to_inbetween() {
        let model = rig();
        let mut sink = vec![0.0; model.shapes().len()];
        sink[model.shape_id("Smile_Pos").unwrap().index()] = 0.25;
        sink[model.shape_id("Jaw_Open").unwrap().index()] = 0.4;
        expand_inbetweens(&model, &mut sink);
        assert_eq!(at(&model, &sink, "Smile_Pos"), 0.0);
        assert!(approx(at(&model, &sink, "Smile_Half"), 0.5));
        // No in-betweens on Jaw: untouched.
        assert_eq!(at(&model, &sink, "Jaw_Open"), 0.4);
    }

    #[test]
    fn traversal_follows_progress_and_multiplier() {
        let model = rig();
        let mut sink = vec![0.0; model.shapes().len()];
        solve_traversals(&model, &[0.8, 0.25], EPS, &mut sink);
        assert!(approx(at(&model, &sink, "Open_Mid"), 0.4));
        assert_eq!(at(&model, &sink, "Open_Full"), 0.0);

        let mut sink = vec![0.0; model.shapes().len()];
        solve_traversals(&model, &[0.5, 1.0], EPS, &mut sink);
        assert!(approx(at(&model, &sink, "Open_Full"), 0.5));
        assert_eq!(at(&model, &sink, "Open_Mid"), 0.0);
    }

    #[test]
    fn silent_control_silences_traversal() {
        let model = rig();
        for activations in [[0.0, 0.7], [0.7, 0.0], [0.7, -0.5], [-0.3, 0.5]] {
            let mut sink = vec![0.0; model.shapes().len()];
            solve_traversals(&model, &activations, EPS, &mut sink);
            assert!(sink.iter().all(|&w| w == 0.0), "at {activations:?}");
        }
    }

    #[test]
    fn disabled_traversal_is_skipped() {
        let mut b = rig().to_builder();
        let open = b.traversal_id("Open").unwrap();
        b.set_traversal_enabled(open, false).unwrap();
        let model = b.build().unwrap();
        let mut sink = vec![0.0; model.shapes().len()];
        solve_traversals(&model, &[1.0, 1.0], EPS, &mut sink);
        assert_eq!(at(&model, &sink, "Open_Full"), 0.0);
    }
}
