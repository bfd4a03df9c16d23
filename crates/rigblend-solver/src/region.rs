//! Grouping of active sliders into independent regions.
//!
//! Rules:
//! 1. Only sliders with an active activation take part.
//! 2. A live combo (enabled, every axis active, a shape at its current
//!    orthant) joins all of its axes into one region.
//! 3. Regions are disjoint; a slider no live combo touches stands alone.
//!
//! Regions are solved independently and their results simply add up.

use rigblend_core::{CombinationModel, SliderId};

/// Active sliders linked by live combos, ascending by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub axes: Vec<SliderId>,
}

impl Region {
    pub fn is_isolated(&self) -> bool {
        self.axes.len() == 1
    }
}

/// Disjoint sets over slider indices. The lower index is always the root, so
/// roots are deterministic regardless of merge order.
struct Disjoint {
    parent: Vec<usize>,
}

impl Disjoint {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}

/// Partition the active sliders of `activations` into regions, ordered by
/// their lowest slider id.
pub fn regions(model: &CombinationModel, activations: &[f64], epsilon: f64) -> Vec<Region> {
    let active = |i: usize| CombinationModel::is_active(activations[i], epsilon);
    let mut sets = Disjoint::new(activations.len());

    for &id in model.combos_by_depth() {
        let combo = model.combo(id);
        if !combo.enabled() {
            continue;
        }
        let Some(orthant) = model.combo_orthant(id, activations, epsilon) else {
            continue;
        };
        if combo.shape(orthant).is_none() {
            continue;
        }
        let first = combo.axes()[0].index();
        for axis in &combo.axes()[1..] {
            sets.union(first, axis.index());
        }
    }

    let mut slots: Vec<Option<usize>> = vec![None; activations.len()];
    let mut out: Vec<Region> = Vec::new();
    for i in (0..activations.len()).filter(|&i| active(i)) {
        let root = sets.find(i);
        let slot = *slots[root].get_or_insert_with(|| {
            out.push(Region { axes: Vec::new() });
            out.len() - 1
        });
        out[slot].axes.push(SliderId(i as u32));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigblend_core::{ModelBuilder, Orthant, Progression, Sign};

    const EPS: f64 = 1e-6;

    /// A..E; AB at `++`, BC at `++` (disabled), DE at `--` only.
    fn model() -> CombinationModel {
        let mut b = ModelBuilder::new();
        let ids: Vec<SliderId> = ["A", "B", "C", "D", "E"]
            .iter()
            .map(|n| {
                let id = b.add_slider(*n, Progression::linear()).unwrap();
                b.attach_slider_shape(id, Sign::Positive, format!("{n}+")).unwrap();
                id
            })
            .collect();
        let ab = b.add_combo("AB", &ids[0..2]).unwrap();
        b.attach_combo_shape(ab, Orthant::all_positive(2), "AB++").unwrap();
        let bc = b.add_combo("BC", &ids[1..3]).unwrap();
        b.attach_combo_shape(bc, Orthant::all_positive(2), "BC++").unwrap();
        b.set_combo_enabled(bc, false).unwrap();
        let de = b.add_combo("DE", &ids[3..5]).unwrap();
        b.attach_combo_shape(de, "--".parse().unwrap(), "DE--").unwrap();
        b.build().unwrap()
    }

    fn axes(regions: &[Region]) -> Vec<Vec<u32>> {
        regions
            .iter()
            .map(|r| r.axes.iter().map(|a| a.0).collect())
            .collect()
    }

    #[test]
    fn inactive_sliders_are_skipped() {
        let m = model();
        assert!(regions(&m, &[0.0; 5], EPS).is_empty());
        assert_eq!(axes(&regions(&m, &[0.0, 0.0, 0.3, 0.0, 1e-9], EPS)), vec![vec![2]]);
    }

    #[test]
    fn live_combo_links_axes() {
        let m = model();
        let r = regions(&m, &[0.5, 0.5, 0.5, 0.0, 0.0], EPS);
        assert_eq!(axes(&r), vec![vec![0, 1], vec![2]]);
        assert!(!r[0].is_isolated());
        assert!(r[1].is_isolated());
    }

    #[test]
    fn combo_without_shape_at_orthant_does_not_link() {
        let m = model();
        assert_eq!(
            axes(&regions(&m, &[0.0, 0.0, 0.0, 0.5, 0.5], EPS)),
            vec![vec![3], vec![4]]
        );
        assert_eq!(
            axes(&regions(&m, &[0.0, 0.0, 0.0, -0.5, -0.5], EPS)),
            vec![vec![3, 4]]
        );
    }

    #[test]
    fn inactive_axis_breaks_link() {
        let m = model();
        assert_eq!(axes(&regions(&m, &[0.5, 0.0, 0.0, 0.0, 0.0], EPS)), vec![vec![0]]);
    }

    #[test]
    fn every_active_slider_lands_in_one_region() {
        let m = model();
        let r = regions(&m, &[0.2, -0.4, 0.9, -0.1, -0.3], EPS);
        let mut all: Vec<u32> = axes(&r).concat();
        all.sort_unstable();
        assert_eq!(all, vec![0, 1, 2, 3, 4]);
    }
}
