//! In-between shape tracks.
//!
//! A [`Track`] lists the shapes sculpted along one weight channel: a slider
//! side, a combo orthant or a traversal. The full shape sits at
//! [`FULL_POSITION`]; in-between shapes sit at positions strictly inside
//! `(0, 1)`, and position 0 is the rest pose, which carries no shape.
//!
//! A channel weight is spread over the two steps bracketing it by linear
//! interpolation, so the shape at a step reaches exactly 1 when the channel
//! sits on its position and fades out toward both neighbours. A track without
//! in-betweens passes the weight straight to its full shape.

use crate::constants::FULL_POSITION;
use crate::types::ShapeId;

/// A shape at a position along a track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub position: f64,
    pub shape: ShapeId,
}

/// Steps ascending by position. The last step is always the full shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    steps: Vec<Step>,
}

impl Track {
    pub fn new(full: ShapeId) -> Self {
        Self {
            steps: vec![Step {
                position: FULL_POSITION,
                shape: full,
            }],
        }
    }

    /// The shape at full weight.
    pub fn full(&self) -> ShapeId {
        self.steps[self.steps.len() - 1].shape
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Steps before the full shape, ascending.
    pub fn inbetweens(&self) -> &[Step] {
        &self.steps[..self.steps.len() - 1]
    }

    pub fn has_inbetweens(&self) -> bool {
        self.steps.len() > 1
    }

    pub fn contains(&self, shape: ShapeId) -> bool {
        self.steps.iter().any(|s| s.shape == shape)
    }

    /// Shape sitting exactly at `position`, if any.
    pub fn at(&self, position: f64) -> Option<ShapeId> {
        self.steps
            .iter()
            .find(|s| s.position == position)
            .map(|s| s.shape)
    }

    /// Insert an in-between. The position must lie in `(0, 1)` and be free.
    pub(crate) fn insert(&mut self, step: Step) {
        debug_assert!(step.position > 0.0 && step.position < FULL_POSITION);
        let at = self.steps.partition_point(|s| s.position < step.position);
        self.steps.insert(at, step);
    }

    /// Distribute a channel weight over the steps bracketing it.
    ///
    /// Yields at most two `(shape, weight)` pairs, both non-zero. Weights are
    /// clamped to `[0, 1]` first.
    pub fn spread(&self, weight: f64) -> impl Iterator<Item = (ShapeId, f64)> + '_ {
        let w = weight.clamp(0.0, FULL_POSITION);
        let k = self.steps.partition_point(|s| s.position < w);
        let hi = self.steps[k.min(self.steps.len() - 1)];
        let lo_position = if k == 0 { 0.0 } else { self.steps[k - 1].position };
        let t = (w - lo_position) / (hi.position - lo_position);
        let lower = k.checked_sub(1).map(|j| (self.steps[j].shape, 1.0 - t));
        [Some((hi.shape, t)), lower]
            .into_iter()
            .flatten()
            .filter(|&(_, x)| x > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> Track {
        let mut t = Track::new(ShapeId(0));
        t.insert(Step {
            position: 0.5,
            shape: ShapeId(1),
        });
        t.insert(Step {
            position: 0.25,
            shape: ShapeId(2),
        });
        t
    }

    fn spread(t: &Track, w: f64) -> Vec<(u32, f64)> {
        t.spread(w).map(|(s, x)| (s.0, x)).collect()
    }

    #[test]
    fn steps_stay_sorted() {
        let t = track();
        let positions: Vec<f64> = t.steps().iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![0.25, 0.5, 1.0]);
        assert_eq!(t.full(), ShapeId(0));
        assert_eq!(t.inbetweens().len(), 2);
        assert_eq!(t.at(0.5), Some(ShapeId(1)));
        assert_eq!(t.at(0.75), None);
    }

    #[test]
    fn plain_track_passes_weight_through() {
        let t = Track::new(ShapeId(4));
        assert!(!t.has_inbetweens());
        assert_eq!(spread(&t, 0.3), vec![(4, 0.3)]);
        assert_eq!(spread(&t, 1.0), vec![(4, 1.0)]);
        assert!(spread(&t, 0.0).is_empty());
    }

    #[test]
    fn weight_on_a_step_is_that_shape_only() {
        let t = track();
        assert_eq!(spread(&t, 0.25), vec![(2, 1.0)]);
        assert_eq!(spread(&t, 0.5), vec![(1, 1.0)]);
        assert_eq!(spread(&t, 1.0), vec![(0, 1.0)]);
    }

    #[test]
    fn weight_between_steps_is_interpolated() {
        let t = track();
        // Rest to first step.
        assert_eq!(spread(&t, 0.125), vec![(2, 0.5)]);
        let mid = spread(&t, 0.75);
        assert_eq!(mid.len(), 2);
        assert_eq!(mid[0].0, 0);
        assert!((mid[0].1 - 0.5).abs() < 1e-12);
        assert_eq!(mid[1].0, 1);
        assert!((mid[1].1 - 0.5).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_weight_clamps() {
        let t = track();
        assert_eq!(spread(&t, 1.5), vec![(0, 1.0)]);
        assert!(spread(&t, -0.5).is_empty());
    }

    #[test]
    fn spread_is_continuous() {
        let t = track();
        let weight_of = |w: f64, shape: u32| -> f64 {
            t.spread(w)
                .find(|&(s, _)| s.0 == shape)
                .map_or(0.0, |(_, x)| x)
        };
        let h = 1e-4;
        let mut w = 0.0;
        while w < 1.0 {
            for shape in 0..3 {
                let jump = (weight_of(w, shape) - weight_of(w + h, shape)).abs();
                assert!(jump <= 4.0 * h + 1e-12, "shape {shape} jumps at {w}");
            }
            w += h;
        }
    }
}
