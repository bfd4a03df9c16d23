//! Serializable shape-library definition.
//!
//! [`LibraryDefinition`] is the static description a [`CombinationModel`] is
//! loaded from. Sliders, combos and traversals reference each other by name;
//! building the model resolves names to ids and raises a [`ConfigError`]
//! naming the offending entry on the first problem found.
//!
//! In-between shapes are listed under the slot they belong to, each with its
//! position along the slot's track. On a slider the position is signed: a
//! negative position places the shape on the negative side.
//!
//! ```
//! use rigblend_core::LibraryDefinition;
//!
//! let def: LibraryDefinition = serde_json::from_str(r#"{
//!     "sliders": [
//!         { "name": "Smile", "positive": "Smile_Pos" },
//!         { "name": "Squint", "positive": "Squint_Pos" }
//!     ],
//!     "combos": [
//!         { "name": "Smile+Squint", "sliders": ["Smile", "Squint"],
//!           "shapes": [{ "orthant": "++", "shape": "SmileSquint_PosPos" }] }
//!     ]
//! }"#).unwrap();
//! let model = def.build().unwrap();
//! assert_eq!(model.shapes().len(), 3);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, CurveError};
use crate::model::{CombinationModel, Control, ModelBuilder};
use crate::progression::{ControlPoint, Progression};
use crate::types::{Orthant, Sign, SliderId};

/// A shape sculpted part way along a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InbetweenDef {
    pub position: f64,
    pub shape: String,
}

fn enabled_default() -> bool {
    true
}

fn unit_scale() -> f64 {
    1.0
}

/// Response curve as written in a definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CurveDef {
    Linear {
        #[serde(default = "unit_scale")]
        scale: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        domain: Option<[f64; 2]>,
    },
    Piecewise {
        points: Vec<[f64; 2]>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        domain: Option<[f64; 2]>,
    },
    Spline {
        points: Vec<[f64; 2]>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        domain: Option<[f64; 2]>,
    },
}

impl Default for CurveDef {
    fn default() -> Self {
        Self::Linear {
            scale: 1.0,
            domain: None,
        }
    }
}

impl CurveDef {
    pub fn to_progression(&self) -> Result<Progression, CurveError> {
        let to_points = |points: &[[f64; 2]]| -> Vec<ControlPoint> {
            points.iter().map(|&[x, y]| ControlPoint::new(x, y)).collect()
        };
        let (progression, domain) = match self {
            Self::Linear { scale, domain } => (Progression::scaled(*scale)?, domain),
            Self::Piecewise { points, domain } => (Progression::piecewise(to_points(points))?, domain),
            Self::Spline { points, domain } => (Progression::spline(to_points(points))?, domain),
        };
        match domain {
            Some([min, max]) => progression.with_domain(*min, *max),
            None => Ok(progression),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliderDef {
    pub name: String,
    #[serde(default)]
    pub curve: CurveDef,
    /// Shape driven on the positive side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positive: Option<String>,
    /// Shape driven on the negative side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative: Option<String>,
    /// In-betweens on either side, by signed position.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inbetweens: Vec<InbetweenDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboShapeDef {
    pub orthant: Orthant,
    pub shape: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inbetweens: Vec<InbetweenDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboDef {
    pub name: String,
    /// Axis sliders by name. Orthant patterns follow this order.
    pub sliders: Vec<String>,
    #[serde(default)]
    pub shapes: Vec<ComboShapeDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

/// A traversal control, by name. A slider control without a sign reads the
/// positive side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlDef {
    Slider {
        slider: String,
        #[serde(default)]
        sign: Sign,
    },
    Combo {
        combo: String,
        orthant: Orthant,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraversalDef {
    pub name: String,
    pub progress: ControlDef,
    pub multiplier: ControlDef,
    /// Shape at full progress.
    pub shape: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inbetweens: Vec<InbetweenDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

/// A complete shape library: sliders first, then combos over them, then
/// traversals over both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryDefinition {
    #[serde(default)]
    pub sliders: Vec<SliderDef>,
    #[serde(default)]
    pub combos: Vec<ComboDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traversals: Vec<TraversalDef>,
}

impl LibraryDefinition {
    /// Resolve names and validate, producing an immutable model.
    pub fn build(&self) -> Result<CombinationModel, ConfigError> {
        let mut b = ModelBuilder::new();
        for def in &self.sliders {
            let progression = def
                .curve
                .to_progression()
                .map_err(|source| ConfigError::InvalidCurve {
                    slider: def.name.clone(),
                    source,
                })?;
            let id = b.add_slider(def.name.clone(), progression)?;
            b.set_slider_enabled(id, def.enabled)?;
            b.set_slider_group(id, def.group.clone())?;
            if let Some(shape) = &def.positive {
                b.attach_slider_shape(id, Sign::Positive, shape.clone())?;
            }
            if let Some(shape) = &def.negative {
                b.attach_slider_shape(id, Sign::Negative, shape.clone())?;
            }
            for step in &def.inbetweens {
                let sign = Sign::of(step.position);
                b.attach_slider_inbetween(id, sign, step.position.abs(), step.shape.clone())?;
            }
        }
        for def in &self.combos {
            let axes = def
                .sliders
                .iter()
                .map(|name| {
                    b.slider_id(name).ok_or_else(|| ConfigError::UnknownSlider {
                        slider: name.clone(),
                        referrer: def.name.clone(),
                    })
                })
                .collect::<Result<Vec<SliderId>, _>>()?;
            let id = b.add_combo(def.name.clone(), &axes)?;
            b.set_combo_enabled(id, def.enabled)?;
            b.set_combo_group(id, def.group.clone())?;
            for shape in &def.shapes {
                b.attach_combo_shape(id, shape.orthant, shape.shape.clone())?;
                for step in &shape.inbetweens {
                    b.attach_combo_inbetween(id, shape.orthant, step.position, step.shape.clone())?;
                }
            }
        }
        for def in &self.traversals {
            let progress = resolve_control(&b, &def.progress, &def.name)?;
            let multiplier = resolve_control(&b, &def.multiplier, &def.name)?;
            let id = b.add_traversal(def.name.clone(), progress, multiplier, def.shape.clone())?;
            b.set_traversal_enabled(id, def.enabled)?;
            b.set_traversal_group(id, def.group.clone())?;
            for step in &def.inbetweens {
                b.attach_traversal_inbetween(id, step.position, step.shape.clone())?;
            }
        }
        b.build()
    }
}

fn resolve_control(b: &ModelBuilder, def: &ControlDef, referrer: &str) -> Result<Control, ConfigError> {
    match def {
        ControlDef::Slider { slider, sign } => {
            let id = b.slider_id(slider).ok_or_else(|| ConfigError::UnknownSlider {
                slider: slider.clone(),
                referrer: referrer.to_string(),
            })?;
            Ok(Control::Slider { slider: id, sign: *sign })
        }
        ControlDef::Combo { combo, orthant } => {
            let id = b
                .combo_id(combo)
                .ok_or_else(|| ConfigError::UnknownCombo(combo.clone()))?;
            Ok(Control::Combo {
                combo: id,
                orthant: *orthant,
            })
        }
    }
}

impl CombinationModel {
    pub fn from_definition(def: &LibraryDefinition) -> Result<Self, ConfigError> {
        def.build()
    }
}
