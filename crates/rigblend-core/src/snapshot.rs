//! Per-evaluation slider input.
//!
//! A [`Snapshot`] holds the raw slider values a host sends for one evaluation,
//! keyed either by slider name or by [`SliderId`]. It is resolved against a
//! model into a dense vector; keys the model does not know are skipped, since
//! hosts routinely send a superset of attributes.

use tracing::trace;

use crate::model::CombinationModel;
use crate::types::SliderId;

/// How a snapshot entry names its slider.
#[derive(Debug, Clone, PartialEq)]
pub enum SliderKey {
    Name(String),
    Index(SliderId),
}

/// Raw slider values for a single solve. Later entries win over earlier ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    entries: Vec<(SliderKey, f64)>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// One value per slider, in model order.
    pub fn from_dense(values: &[f64]) -> Self {
        Self {
            entries: values
                .iter()
                .enumerate()
                .map(|(i, &v)| (SliderKey::Index(SliderId(i as u32)), v))
                .collect(),
        }
    }

    pub fn from_pairs<S: Into<String>>(pairs: impl IntoIterator<Item = (S, f64)>) -> Self {
        pairs.into_iter().collect()
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.entries.push((SliderKey::Name(name.into()), value));
    }

    pub fn set_index(&mut self, slider: SliderId, value: f64) {
        self.entries.push((SliderKey::Index(slider), value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(SliderKey, f64)] {
        &self.entries
    }

    /// Dense raw values in model slider order. Missing sliders read as 0.
    pub fn resolve(&self, model: &CombinationModel) -> Vec<f64> {
        let mut raw = vec![0.0; model.sliders().len()];
        for (key, value) in &self.entries {
            let slot = match key {
                SliderKey::Name(name) => model.slider_id(name).map(SliderId::index),
                SliderKey::Index(id) => Some(id.index()).filter(|&i| i < raw.len()),
            };
            match slot {
                Some(i) => raw[i] = *value,
                None => trace!(?key, "snapshot: ignoring unknown slider"),
            }
        }
        raw
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(name, v)| (SliderKey::Name(name.into()), v))
                .collect(),
        }
    }
}
