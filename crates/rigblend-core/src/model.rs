//! The combination model: sliders, combos, traversals and their shapes.
//!
//! The model is a small acyclic definition graph (combos depend on their axis
//! sliders, traversals on the sliders and combos they read) stored as flat
//! arrays addressed by [`SliderId`], [`ComboId`], [`TraversalId`] and
//! [`ShapeId`]. It is built once through a [`ModelBuilder`] and is immutable
//! afterwards. Structural edits go through [`CombinationModel::to_builder`]
//! and a fresh [`ModelBuilder::build`], so a half-edited model is never
//! observable.
//!
//! Every weight channel (a slider side, a combo orthant, a traversal) owns a
//! [`Track`]: its full shape plus any in-between shapes along the way.
//!
//! Invariants enforced at build time:
//! 1. Slider, combo, traversal and shape names are unique.
//! 2. A combo has between [`MIN_COMBO_DEPTH`] and [`MAX_COMBO_DEPTH`] axes,
//!    all distinct, and no two combos share the same axis set.
//! 3. Each (slider, sign) and each (combo, orthant) holds at most one track,
//!    a track holds at most one shape per position, and each shape has exactly
//!    one owner.
//! 4. Traversal controls reference existing sliders and combos.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::constants::{FULL_POSITION, MAX_COMBO_DEPTH, MIN_COMBO_DEPTH};
use crate::error::ConfigError;
use crate::progression::Progression;
use crate::snapshot::Snapshot;
use crate::track::{Step, Track};
use crate::types::{ComboId, Orthant, ShapeId, Sign, SliderId, TraversalId};

/// A named scalar control.
#[derive(Debug, Clone, PartialEq)]
pub struct Slider {
    name: String,
    progression: Progression,
    group: Option<String>,
    enabled: bool,
    tracks: [Option<Track>; 2],
    combos: Vec<ComboId>,
}

impl Slider {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn progression(&self) -> &Progression {
        &self.progression
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Full shape driven by this slider on the given side, if any.
    pub fn shape(&self, sign: Sign) -> Option<ShapeId> {
        self.track(sign).map(Track::full)
    }

    pub fn track(&self, sign: Sign) -> Option<&Track> {
        self.tracks[sign.slot()].as_ref()
    }

    /// Combos using this slider as an axis, ascending by id.
    pub fn combos(&self) -> &[ComboId] {
        &self.combos
    }
}

/// A fixed, ordered set of sliders whose joint activation drives corrective shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct Combo {
    name: String,
    axes: Vec<SliderId>,
    tracks: Vec<(Orthant, Track)>,
    group: Option<String>,
    enabled: bool,
}

impl Combo {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Axis sliders in definition order. Orthant patterns follow this order.
    pub fn axes(&self) -> &[SliderId] {
        &self.axes
    }

    pub fn depth(&self) -> usize {
        self.axes.len()
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// `(orthant, full shape)` pairs in attachment order.
    pub fn shapes(&self) -> impl Iterator<Item = (Orthant, ShapeId)> + '_ {
        self.tracks.iter().map(|(orthant, track)| (*orthant, track.full()))
    }

    pub fn shape(&self, orthant: Orthant) -> Option<ShapeId> {
        self.track(orthant).map(Track::full)
    }

    pub fn track(&self, orthant: Orthant) -> Option<&Track> {
        self.tracks
            .iter()
            .find(|(o, _)| *o == orthant)
            .map(|(_, track)| track)
    }

    fn track_mut(&mut self, orthant: Orthant) -> Option<&mut Track> {
        self.tracks
            .iter_mut()
            .find(|(o, _)| *o == orthant)
            .map(|(_, track)| track)
    }
}

/// A value read from the current activations, in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    /// The slider's activation in the given direction; 0 on the other side.
    Slider { slider: SliderId, sign: Sign },
    /// The combo's weakest axis magnitude while it sits in `orthant`; 0 otherwise.
    Combo { combo: ComboId, orthant: Orthant },
}

/// A shape progression driven by one control and scaled by another.
///
/// The progress control picks the position along the track, the multiplier
/// control scales the result. Traversals sit outside the combo decomposition
/// and add on top of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Traversal {
    name: String,
    progress: Control,
    multiplier: Control,
    track: Track,
    group: Option<String>,
    enabled: bool,
}

impl Traversal {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn progress(&self) -> Control {
        self.progress
    }

    pub fn multiplier(&self) -> Control {
        self.multiplier
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }
}

/// The single slot a shape is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeOwner {
    Slider { slider: SliderId, sign: Sign },
    Combo { combo: ComboId, orthant: Orthant },
    Traversal { traversal: TraversalId },
}

/// An opaque deformer target, identified by name.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    name: String,
    owner: ShapeOwner,
    position: f64,
}

impl Shape {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> ShapeOwner {
        self.owner
    }

    /// Position along the owner's track; [`FULL_POSITION`] for full shapes.
    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn is_inbetween(&self) -> bool {
        self.position < FULL_POSITION
    }
}

/// Incrementally assembles a [`CombinationModel`].
///
/// Every method validates its own input eagerly, and [`build`](Self::build)
/// re-checks the whole graph before handing out the model.
#[derive(Debug, Clone, Default)]
pub struct ModelBuilder {
    sliders: Vec<Slider>,
    combos: Vec<Combo>,
    traversals: Vec<Traversal>,
    shapes: Vec<Shape>,
    slider_names: HashMap<String, SliderId>,
    combo_names: HashMap<String, ComboId>,
    traversal_names: HashMap<String, TraversalId>,
    shape_names: HashMap<String, ShapeId>,
    axis_sets: HashMap<Vec<SliderId>, ComboId>,
    revision: u64,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slider_id(&self, name: &str) -> Option<SliderId> {
        self.slider_names.get(name).copied()
    }

    pub fn combo_id(&self, name: &str) -> Option<ComboId> {
        self.combo_names.get(name).copied()
    }

    pub fn traversal_id(&self, name: &str) -> Option<TraversalId> {
        self.traversal_names.get(name).copied()
    }

    /// Register a slider. Names must be unique.
    pub fn add_slider(
        &mut self,
        name: impl Into<String>,
        progression: Progression,
    ) -> Result<SliderId, ConfigError> {
        let name = name.into();
        if self.slider_names.contains_key(&name) {
            return Err(ConfigError::DuplicateSlider(name));
        }
        let id = SliderId::from_index(self.sliders.len());
        self.slider_names.insert(name.clone(), id);
        self.sliders.push(Slider {
            name,
            progression,
            group: None,
            enabled: true,
            tracks: [None, None],
            combos: Vec::new(),
        });
        Ok(id)
    }

    /// Attach the full shape to one side of a slider.
    pub fn attach_slider_shape(
        &mut self,
        slider: SliderId,
        sign: Sign,
        shape_name: impl Into<String>,
    ) -> Result<ShapeId, ConfigError> {
        let shape_name = shape_name.into();
        let record = self.slider(slider, &shape_name)?;
        if let Some(existing) = record.shape(sign) {
            return Err(ConfigError::SliderSlotTaken {
                slider: record.name.clone(),
                sign: sign.symbol(),
                existing: self.shapes[existing.index()].name.clone(),
                shape: shape_name,
            });
        }
        let id = self.push_shape(shape_name, ShapeOwner::Slider { slider, sign }, FULL_POSITION)?;
        self.sliders[slider.index()].tracks[sign.slot()] = Some(Track::new(id));
        Ok(id)
    }

    /// Attach an in-between shape to a slider side that already has its full shape.
    pub fn attach_slider_inbetween(
        &mut self,
        slider: SliderId,
        sign: Sign,
        position: f64,
        shape_name: impl Into<String>,
    ) -> Result<ShapeId, ConfigError> {
        let shape_name = shape_name.into();
        let record = self.slider(slider, &shape_name)?;
        let owner = format!("slider {} ({})", record.name, sign.symbol());
        self.check_inbetween(&owner, record.track(sign), position, &shape_name)?;
        let id = self.push_shape(shape_name, ShapeOwner::Slider { slider, sign }, position)?;
        if let Some(track) = self.sliders[slider.index()].tracks[sign.slot()].as_mut() {
            track.insert(Step { position, shape: id });
        }
        Ok(id)
    }

    /// Register a combo over `axes`, in the given order.
    pub fn add_combo(
        &mut self,
        name: impl Into<String>,
        axes: &[SliderId],
    ) -> Result<ComboId, ConfigError> {
        let name = name.into();
        if self.combo_names.contains_key(&name) {
            return Err(ConfigError::DuplicateCombo(name));
        }
        if !(MIN_COMBO_DEPTH..=MAX_COMBO_DEPTH).contains(&axes.len()) {
            return Err(ConfigError::InvalidDepth {
                combo: name,
                depth: axes.len(),
                min: MIN_COMBO_DEPTH,
                max: MAX_COMBO_DEPTH,
            });
        }
        for &axis in axes {
            if axis.index() >= self.sliders.len() {
                return Err(ConfigError::UnknownSlider {
                    slider: axis.to_string(),
                    referrer: name,
                });
            }
        }
        let mut key = axes.to_vec();
        key.sort_unstable();
        if let Some(pair) = key.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(ConfigError::DuplicateAxis {
                combo: name,
                slider: self.sliders[pair[0].index()].name.clone(),
            });
        }
        if let Some(existing) = self.axis_sets.get(&key) {
            return Err(ConfigError::DuplicateAxisSet {
                combo: name,
                existing: self.combos[existing.index()].name.clone(),
            });
        }

        let id = ComboId::from_index(self.combos.len());
        self.combo_names.insert(name.clone(), id);
        self.axis_sets.insert(key, id);
        self.combos.push(Combo {
            name,
            axes: axes.to_vec(),
            tracks: Vec::new(),
            group: None,
            enabled: true,
        });
        Ok(id)
    }

    /// Attach the full shape to one orthant of a combo.
    pub fn attach_combo_shape(
        &mut self,
        combo: ComboId,
        orthant: Orthant,
        shape_name: impl Into<String>,
    ) -> Result<ShapeId, ConfigError> {
        let shape_name = shape_name.into();
        let record = self.combo_at(combo, orthant)?;
        if let Some(existing) = record.shape(orthant) {
            return Err(ConfigError::ComboSlotTaken {
                combo: record.name.clone(),
                orthant: orthant.to_string(),
                existing: self.shapes[existing.index()].name.clone(),
                shape: shape_name,
            });
        }
        let id = self.push_shape(shape_name, ShapeOwner::Combo { combo, orthant }, FULL_POSITION)?;
        self.combos[combo.index()].tracks.push((orthant, Track::new(id)));
        Ok(id)
    }

    /// Attach an in-between shape to a combo orthant that already has its full shape.
    pub fn attach_combo_inbetween(
        &mut self,
        combo: ComboId,
        orthant: Orthant,
        position: f64,
        shape_name: impl Into<String>,
    ) -> Result<ShapeId, ConfigError> {
        let shape_name = shape_name.into();
        let record = self.combo_at(combo, orthant)?;
        let owner = format!("combo {} at {orthant}", record.name);
        self.check_inbetween(&owner, record.track(orthant), position, &shape_name)?;
        let id = self.push_shape(shape_name, ShapeOwner::Combo { combo, orthant }, position)?;
        if let Some(track) = self.combos[combo.index()].track_mut(orthant) {
            track.insert(Step { position, shape: id });
        }
        Ok(id)
    }

    /// Register a traversal together with its full shape.
    pub fn add_traversal(
        &mut self,
        name: impl Into<String>,
        progress: Control,
        multiplier: Control,
        shape_name: impl Into<String>,
    ) -> Result<TraversalId, ConfigError> {
        let name = name.into();
        if self.traversal_names.contains_key(&name) {
            return Err(ConfigError::DuplicateTraversal(name));
        }
        self.check_control(&name, progress)?;
        self.check_control(&name, multiplier)?;
        let id = TraversalId::from_index(self.traversals.len());
        let shape = self.push_shape(shape_name.into(), ShapeOwner::Traversal { traversal: id }, FULL_POSITION)?;
        self.traversal_names.insert(name.clone(), id);
        self.traversals.push(Traversal {
            name,
            progress,
            multiplier,
            track: Track::new(shape),
            group: None,
            enabled: true,
        });
        Ok(id)
    }

    pub fn attach_traversal_inbetween(
        &mut self,
        traversal: TraversalId,
        position: f64,
        shape_name: impl Into<String>,
    ) -> Result<ShapeId, ConfigError> {
        let shape_name = shape_name.into();
        let record = self
            .traversals
            .get(traversal.index())
            .ok_or_else(|| ConfigError::UnknownTraversal(traversal.to_string()))?;
        let owner = format!("traversal {}", record.name);
        self.check_inbetween(&owner, Some(&record.track), position, &shape_name)?;
        let id = self.push_shape(shape_name, ShapeOwner::Traversal { traversal }, position)?;
        self.traversals[traversal.index()]
            .track
            .insert(Step { position, shape: id });
        Ok(id)
    }

    pub fn set_slider_enabled(&mut self, slider: SliderId, enabled: bool) -> Result<(), ConfigError> {
        self.slider_mut(slider)?.enabled = enabled;
        Ok(())
    }

    pub fn set_combo_enabled(&mut self, combo: ComboId, enabled: bool) -> Result<(), ConfigError> {
        self.combo_mut(combo)?.enabled = enabled;
        Ok(())
    }

    pub fn set_traversal_enabled(
        &mut self,
        traversal: TraversalId,
        enabled: bool,
    ) -> Result<(), ConfigError> {
        self.traversal_mut(traversal)?.enabled = enabled;
        Ok(())
    }

    pub fn set_slider_group(
        &mut self,
        slider: SliderId,
        group: Option<String>,
    ) -> Result<(), ConfigError> {
        self.slider_mut(slider)?.group = group;
        Ok(())
    }

    pub fn set_combo_group(&mut self, combo: ComboId, group: Option<String>) -> Result<(), ConfigError> {
        self.combo_mut(combo)?.group = group;
        Ok(())
    }

    pub fn set_traversal_group(
        &mut self,
        traversal: TraversalId,
        group: Option<String>,
    ) -> Result<(), ConfigError> {
        self.traversal_mut(traversal)?.group = group;
        Ok(())
    }

    /// Drop a combo, every shape attached to it and every traversal reading it.
    /// Remaining ids are compacted.
    pub fn remove_combo(&mut self, name: &str) -> Result<(), ConfigError> {
        let id = self
            .combo_id(name)
            .ok_or_else(|| ConfigError::UnknownCombo(name.to_string()))?;
        *self = self.rebuilt(|_| true, |c| c != id, |_| true)?;
        Ok(())
    }

    /// Drop a slider, its shapes and every combo or traversal that uses it.
    /// Remaining ids are compacted.
    pub fn remove_slider(&mut self, name: &str) -> Result<(), ConfigError> {
        let id = self.slider_id(name).ok_or_else(|| ConfigError::UnknownSlider {
            slider: name.to_string(),
            referrer: "remove_slider".to_string(),
        })?;
        let doomed: Vec<ComboId> = self
            .combos
            .iter()
            .enumerate()
            .filter(|(_, c)| c.axes.contains(&id))
            .map(|(i, _)| ComboId::from_index(i))
            .collect();
        *self = self.rebuilt(|s| s != id, |c| !doomed.contains(&c), |_| true)?;
        Ok(())
    }

    /// Drop a traversal and its shapes. Remaining ids are compacted.
    pub fn remove_traversal(&mut self, name: &str) -> Result<(), ConfigError> {
        let id = self
            .traversal_id(name)
            .ok_or_else(|| ConfigError::UnknownTraversal(name.to_string()))?;
        *self = self.rebuilt(|_| true, |_| true, |t| t != id)?;
        Ok(())
    }

    /// Validate the whole graph and freeze it into a [`CombinationModel`].
    pub fn build(mut self) -> Result<CombinationModel, ConfigError> {
        if let Err(e) = self.validate() {
            debug!(error = %e, "model: definition rejected");
            return Err(e);
        }

        for slider in &mut self.sliders {
            slider.combos.clear();
        }
        for (index, combo) in self.combos.iter().enumerate() {
            for &axis in &combo.axes {
                self.sliders[axis.index()].combos.push(ComboId::from_index(index));
            }
        }

        let mut by_depth: Vec<ComboId> = (0..self.combos.len()).map(ComboId::from_index).collect();
        by_depth.sort_by_key(|id| (self.combos[id.index()].depth(), *id));

        let slider_tracks = self.sliders.iter().flat_map(|s| s.tracks.iter().flatten());
        let combo_tracks = self.combos.iter().flat_map(|c| c.tracks.iter().map(|(_, t)| t));
        let inbetween_tracks: Vec<Track> = slider_tracks
            .chain(combo_tracks)
            .filter(|t| t.has_inbetweens())
            .cloned()
            .collect();

        info!(
            sliders = self.sliders.len(),
            combos = self.combos.len(),
            traversals = self.traversals.len(),
            shapes = self.shapes.len(),
            revision = self.revision,
            "model: built"
        );

        Ok(CombinationModel {
            sliders: self.sliders,
            combos: self.combos,
            traversals: self.traversals,
            shapes: self.shapes,
            slider_names: self.slider_names,
            combo_names: self.combo_names,
            traversal_names: self.traversal_names,
            shape_names: self.shape_names,
            axis_sets: self.axis_sets,
            by_depth,
            inbetween_tracks,
            revision: self.revision,
        })
    }

    fn push_shape(
        &mut self,
        name: String,
        owner: ShapeOwner,
        position: f64,
    ) -> Result<ShapeId, ConfigError> {
        if self.shape_names.contains_key(&name) {
            return Err(ConfigError::DuplicateShape(name));
        }
        let id = ShapeId::from_index(self.shapes.len());
        self.shape_names.insert(name.clone(), id);
        self.shapes.push(Shape {
            name,
            owner,
            position,
        });
        Ok(id)
    }

    fn check_inbetween(
        &self,
        owner: &str,
        track: Option<&Track>,
        position: f64,
        shape: &str,
    ) -> Result<(), ConfigError> {
        let Some(track) = track else {
            return Err(ConfigError::MissingFullShape {
                owner: owner.to_string(),
                shape: shape.to_string(),
            });
        };
        if !(position > 0.0 && position < FULL_POSITION) {
            return Err(ConfigError::InvalidPosition {
                owner: owner.to_string(),
                shape: shape.to_string(),
                position,
            });
        }
        if let Some(existing) = track.at(position) {
            return Err(ConfigError::PositionTaken {
                owner: owner.to_string(),
                position,
                existing: self.shapes[existing.index()].name.clone(),
                shape: shape.to_string(),
            });
        }
        Ok(())
    }

    fn check_control(&self, referrer: &str, control: Control) -> Result<(), ConfigError> {
        match control {
            Control::Slider { slider, .. } => {
                if slider.index() >= self.sliders.len() {
                    return Err(ConfigError::UnknownSlider {
                        slider: slider.to_string(),
                        referrer: referrer.to_string(),
                    });
                }
            }
            Control::Combo { combo, orthant } => {
                let record = self
                    .combos
                    .get(combo.index())
                    .ok_or_else(|| ConfigError::UnknownCombo(combo.to_string()))?;
                if orthant.depth() != record.depth() {
                    return Err(ConfigError::OrthantDepthMismatch {
                        combo: record.name.clone(),
                        orthant: orthant.to_string(),
                        expected: record.depth(),
                        got: orthant.depth(),
                    });
                }
            }
        }
        Ok(())
    }

    fn slider(&self, slider: SliderId, referrer: &str) -> Result<&Slider, ConfigError> {
        self.sliders
            .get(slider.index())
            .ok_or_else(|| ConfigError::UnknownSlider {
                slider: slider.to_string(),
                referrer: referrer.to_string(),
            })
    }

    fn combo_at(&self, combo: ComboId, orthant: Orthant) -> Result<&Combo, ConfigError> {
        let record = self
            .combos
            .get(combo.index())
            .ok_or_else(|| ConfigError::UnknownCombo(combo.to_string()))?;
        if orthant.depth() != record.depth() {
            return Err(ConfigError::OrthantDepthMismatch {
                combo: record.name.clone(),
                orthant: orthant.to_string(),
                expected: record.depth(),
                got: orthant.depth(),
            });
        }
        Ok(record)
    }

    fn slider_mut(&mut self, slider: SliderId) -> Result<&mut Slider, ConfigError> {
        self.sliders
            .get_mut(slider.index())
            .ok_or_else(|| ConfigError::UnknownSlider {
                slider: slider.to_string(),
                referrer: "builder".to_string(),
            })
    }

    fn combo_mut(&mut self, combo: ComboId) -> Result<&mut Combo, ConfigError> {
        self.combos
            .get_mut(combo.index())
            .ok_or_else(|| ConfigError::UnknownCombo(combo.to_string()))
    }

    fn traversal_mut(&mut self, traversal: TraversalId) -> Result<&mut Traversal, ConfigError> {
        self.traversals
            .get_mut(traversal.index())
            .ok_or_else(|| ConfigError::UnknownTraversal(traversal.to_string()))
    }

    fn shape_name(&self, shape: ShapeId) -> String {
        self.shapes[shape.index()].name.clone()
    }

    /// Re-add the kept items into a fresh builder so ids stay dense.
    fn rebuilt(
        &self,
        keep_slider: impl Fn(SliderId) -> bool,
        keep_combo: impl Fn(ComboId) -> bool,
        keep_traversal: impl Fn(TraversalId) -> bool,
    ) -> Result<ModelBuilder, ConfigError> {
        let mut next = ModelBuilder {
            revision: self.revision,
            ..ModelBuilder::default()
        };
        let mut sliders: HashMap<SliderId, SliderId> = HashMap::new();
        for (index, slider) in self.sliders.iter().enumerate() {
            let old = SliderId::from_index(index);
            if !keep_slider(old) {
                continue;
            }
            let id = next.add_slider(slider.name.clone(), slider.progression.clone())?;
            next.set_slider_enabled(id, slider.enabled)?;
            next.set_slider_group(id, slider.group.clone())?;
            for sign in [Sign::Positive, Sign::Negative] {
                if let Some(track) = slider.track(sign) {
                    next.attach_slider_shape(id, sign, self.shape_name(track.full()))?;
                    for step in track.inbetweens() {
                        next.attach_slider_inbetween(id, sign, step.position, self.shape_name(step.shape))?;
                    }
                }
            }
            sliders.insert(old, id);
        }

        let mut combos: HashMap<ComboId, ComboId> = HashMap::new();
        for (index, combo) in self.combos.iter().enumerate() {
            let old = ComboId::from_index(index);
            if !keep_combo(old) {
                continue;
            }
            let Some(axes) = combo
                .axes
                .iter()
                .map(|axis| sliders.get(axis).copied())
                .collect::<Option<Vec<SliderId>>>()
            else {
                continue;
            };
            let id = next.add_combo(combo.name.clone(), &axes)?;
            next.set_combo_enabled(id, combo.enabled)?;
            next.set_combo_group(id, combo.group.clone())?;
            for (orthant, track) in &combo.tracks {
                next.attach_combo_shape(id, *orthant, self.shape_name(track.full()))?;
                for step in track.inbetweens() {
                    next.attach_combo_inbetween(id, *orthant, step.position, self.shape_name(step.shape))?;
                }
            }
            combos.insert(old, id);
        }

        let remap = |control: Control| match control {
            Control::Slider { slider, sign } => sliders
                .get(&slider)
                .map(|&slider| Control::Slider { slider, sign }),
            Control::Combo { combo, orthant } => combos
                .get(&combo)
                .map(|&combo| Control::Combo { combo, orthant }),
        };
        for (index, traversal) in self.traversals.iter().enumerate() {
            if !keep_traversal(TraversalId::from_index(index)) {
                continue;
            }
            let (Some(progress), Some(multiplier)) = (remap(traversal.progress), remap(traversal.multiplier))
            else {
                continue;
            };
            let id = next.add_traversal(
                traversal.name.clone(),
                progress,
                multiplier,
                self.shape_name(traversal.track.full()),
            )?;
            next.set_traversal_enabled(id, traversal.enabled)?;
            next.set_traversal_group(id, traversal.group.clone())?;
            for step in traversal.track.inbetweens() {
                next.attach_traversal_inbetween(id, step.position, self.shape_name(step.shape))?;
            }
        }
        Ok(next)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (index, combo) in self.combos.iter().enumerate() {
            if !(MIN_COMBO_DEPTH..=MAX_COMBO_DEPTH).contains(&combo.depth()) {
                return Err(ConfigError::InvalidDepth {
                    combo: combo.name.clone(),
                    depth: combo.depth(),
                    min: MIN_COMBO_DEPTH,
                    max: MAX_COMBO_DEPTH,
                });
            }
            if let Some(axis) = combo.axes.iter().find(|a| a.index() >= self.sliders.len()) {
                return Err(ConfigError::UnknownSlider {
                    slider: axis.to_string(),
                    referrer: combo.name.clone(),
                });
            }
            let mut key = combo.axes.clone();
            key.sort_unstable();
            if let Some(pair) = key.windows(2).find(|pair| pair[0] == pair[1]) {
                return Err(ConfigError::DuplicateAxis {
                    combo: combo.name.clone(),
                    slider: self.sliders[pair[0].index()].name.clone(),
                });
            }
            if self.axis_sets.get(&key) != Some(&ComboId::from_index(index)) {
                return Err(ConfigError::DuplicateAxisSet {
                    combo: combo.name.clone(),
                    existing: combo.name.clone(),
                });
            }
            for (orthant, _) in &combo.tracks {
                if orthant.depth() != combo.depth() {
                    return Err(ConfigError::OrthantDepthMismatch {
                        combo: combo.name.clone(),
                        orthant: orthant.to_string(),
                        expected: combo.depth(),
                        got: orthant.depth(),
                    });
                }
            }
        }
        for traversal in &self.traversals {
            self.check_control(&traversal.name, traversal.progress)?;
            self.check_control(&traversal.name, traversal.multiplier)?;
        }
        for (index, shape) in self.shapes.iter().enumerate() {
            let id = ShapeId::from_index(index);
            let owned = match shape.owner {
                ShapeOwner::Slider { slider, sign } => self
                    .sliders
                    .get(slider.index())
                    .and_then(|s| s.track(sign))
                    .is_some_and(|t| t.contains(id)),
                ShapeOwner::Combo { combo, orthant } => self
                    .combos
                    .get(combo.index())
                    .and_then(|c| c.track(orthant))
                    .is_some_and(|t| t.contains(id)),
                ShapeOwner::Traversal { traversal } => self
                    .traversals
                    .get(traversal.index())
                    .is_some_and(|t| t.track.contains(id)),
            };
            if !owned {
                return Err(ConfigError::DuplicateShape(shape.name.clone()));
            }
        }
        Ok(())
    }
}

/// The immutable definition graph a solver evaluates against.
#[derive(Debug, Clone)]
pub struct CombinationModel {
    sliders: Vec<Slider>,
    combos: Vec<Combo>,
    traversals: Vec<Traversal>,
    shapes: Vec<Shape>,
    slider_names: HashMap<String, SliderId>,
    combo_names: HashMap<String, ComboId>,
    traversal_names: HashMap<String, TraversalId>,
    shape_names: HashMap<String, ShapeId>,
    axis_sets: HashMap<Vec<SliderId>, ComboId>,
    by_depth: Vec<ComboId>,
    inbetween_tracks: Vec<Track>,
    revision: u64,
}

impl CombinationModel {
    pub fn builder() -> ModelBuilder {
        ModelBuilder::new()
    }

    /// Start a structural edit. The builder carries the next revision number.
    pub fn to_builder(&self) -> ModelBuilder {
        ModelBuilder {
            sliders: self.sliders.clone(),
            combos: self.combos.clone(),
            traversals: self.traversals.clone(),
            shapes: self.shapes.clone(),
            slider_names: self.slider_names.clone(),
            combo_names: self.combo_names.clone(),
            traversal_names: self.traversal_names.clone(),
            shape_names: self.shape_names.clone(),
            axis_sets: self.axis_sets.clone(),
            revision: self.revision + 1,
        }
    }

    /// Number of structural edits applied since the model was first built.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn sliders(&self) -> &[Slider] {
        &self.sliders
    }

    pub fn combos(&self) -> &[Combo] {
        &self.combos
    }

    pub fn traversals(&self) -> &[Traversal] {
        &self.traversals
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn slider(&self, id: SliderId) -> &Slider {
        &self.sliders[id.index()]
    }

    pub fn combo(&self, id: ComboId) -> &Combo {
        &self.combos[id.index()]
    }

    pub fn traversal(&self, id: TraversalId) -> &Traversal {
        &self.traversals[id.index()]
    }

    pub fn shape(&self, id: ShapeId) -> &Shape {
        &self.shapes[id.index()]
    }

    pub fn slider_id(&self, name: &str) -> Option<SliderId> {
        self.slider_names.get(name).copied()
    }

    pub fn combo_id(&self, name: &str) -> Option<ComboId> {
        self.combo_names.get(name).copied()
    }

    pub fn traversal_id(&self, name: &str) -> Option<TraversalId> {
        self.traversal_names.get(name).copied()
    }

    pub fn shape_id(&self, name: &str) -> Option<ShapeId> {
        self.shape_names.get(name).copied()
    }

    /// All combo ids, ascending by depth and then by id.
    pub fn combos_by_depth(&self) -> &[ComboId] {
        &self.by_depth
    }

    /// Slider-side and combo-orthant tracks that carry in-between shapes.
    pub fn inbetween_tracks(&self) -> &[Track] {
        &self.inbetween_tracks
    }

    /// The combo defined over exactly this axis set, in any order.
    pub fn combo_for_axes(&self, axes: &[SliderId]) -> Option<ComboId> {
        let mut key = axes.to_vec();
        key.sort_unstable();
        self.axis_sets.get(&key).copied()
    }

    pub fn sliders_in_group<'a>(&'a self, group: &'a str) -> impl Iterator<Item = SliderId> + 'a {
        self.sliders
            .iter()
            .enumerate()
            .filter(move |(_, s)| s.group() == Some(group))
            .map(|(i, _)| SliderId::from_index(i))
    }

    pub fn combos_in_group<'a>(&'a self, group: &'a str) -> impl Iterator<Item = ComboId> + 'a {
        self.combos
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.group() == Some(group))
            .map(|(i, _)| ComboId::from_index(i))
    }

    pub fn traversals_in_group<'a>(&'a self, group: &'a str) -> impl Iterator<Item = TraversalId> + 'a {
        self.traversals
            .iter()
            .enumerate()
            .filter(move |(_, t)| t.group() == Some(group))
            .map(|(i, _)| TraversalId::from_index(i))
    }

    /// Whether an activation counts as active under the given floor.
    pub fn is_active(value: f64, epsilon: f64) -> bool {
        value.abs() > epsilon
    }

    /// Evaluate every slider's progression for a snapshot.
    ///
    /// Disabled sliders and activations at or below `epsilon` in magnitude
    /// come back as exactly 0.
    pub fn activations(&self, snapshot: &Snapshot, epsilon: f64) -> Vec<f64> {
        let raw = snapshot.resolve(self);
        self.sliders
            .iter()
            .zip(raw)
            .map(|(slider, raw)| {
                if !slider.enabled {
                    return 0.0;
                }
                let value = slider.progression.evaluate(raw);
                if Self::is_active(value, epsilon) {
                    value
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// The orthant a combo currently sits in, or `None` unless every axis is active.
    pub fn combo_orthant(&self, combo: ComboId, activations: &[f64], epsilon: f64) -> Option<Orthant> {
        let axes = &self.combos[combo.index()].axes;
        let values: Vec<f64> = axes.iter().map(|a| activations[a.index()]).collect();
        if values.iter().all(|&v| Self::is_active(v, epsilon)) {
            Some(Orthant::of(&values))
        } else {
            None
        }
    }

    /// Current value of a traversal control, in `[0, 1]`.
    ///
    /// A combo control reads 0 while the combo is disabled, inactive or in
    /// another orthant; the value falls to 0 as any axis approaches zero, so it
    /// is continuous across orthant changes.
    pub fn control_value(&self, control: Control, activations: &[f64], epsilon: f64) -> f64 {
        match control {
            Control::Slider { slider, sign } => {
                let value = activations[slider.index()] * sign.signum();
                if value > epsilon { value.min(1.0) } else { 0.0 }
            }
            Control::Combo { combo, orthant } => {
                let record = &self.combos[combo.index()];
                if !record.enabled || self.combo_orthant(combo, activations, epsilon) != Some(orthant) {
                    return 0.0;
                }
                record
                    .axes
                    .iter()
                    .map(|a| activations[a.index()].abs())
                    .fold(1.0, f64::min)
            }
        }
    }
}
