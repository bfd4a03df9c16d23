//! Shared fixtures for the integration tests.

use std::collections::BTreeMap;

use rigblend_core::model::{Control, ShapeOwner};
use rigblend_core::{CombinationModel, LibraryDefinition, ShapeWeight, SliderId};
use rigblend_solver::{SolverConfig, WeightSolver};

/// Face rig used across the scenario tests.
///
/// Sliders (ids in order): Smile (Smile_Pos / Frown), Squint (Squint_Pos),
/// Brow (Brow_Up / Brow_Down), Jaw (Jaw_Open).
/// Combos: Smile+Squint at `++` and `-+`, Smile+Squint+Brow at `+++`,
/// Smile+Jaw at `++`.
pub const FACE: &str = r#"{
    "sliders": [
        { "name": "Smile", "positive": "Smile_Pos", "negative": "Frown", "group": "mouth" },
        { "name": "Squint", "positive": "Squint_Pos", "group": "eyes" },
        { "name": "Brow", "positive": "Brow_Up", "negative": "Brow_Down", "group": "eyes" },
        { "name": "Jaw", "positive": "Jaw_Open", "group": "mouth" }
    ],
    "combos": [
        { "name": "Smile+Squint", "sliders": ["Smile", "Squint"],
          "shapes": [
              { "orthant": "++", "shape": "SmileSquint" },
              { "orthant": "-+", "shape": "FrownSquint" }
          ] },
        { "name": "Smile+Squint+Brow", "sliders": ["Smile", "Squint", "Brow"],
          "shapes": [ { "orthant": "+++", "shape": "SmileSquintBrow" } ] },
        { "name": "Smile+Jaw", "sliders": ["Smile", "Jaw"], "group": "mouth",
          "shapes": [ { "orthant": "++", "shape": "SmileJaw" } ] }
    ]
}"#;

/// Face rig with in-betweens and a traversal.
///
/// Smile: Smile_Pos with Smile_Half at 0.5, Frown. Squint: Squint_Pos.
/// Jaw: Jaw_Open. Smile+Squint at `++`: SmileSquint with SmileSquint_Half at
/// 0.5. Traversal SmileOpen: progress Jaw, multiplier Smile, full shape
/// SmileOpen with SmileOpen_Mid at 0.5.
pub const TRACKED_FACE: &str = r#"{
    "sliders": [
        { "name": "Smile", "positive": "Smile_Pos", "negative": "Frown",
          "inbetweens": [ { "position": 0.5, "shape": "Smile_Half" } ] },
        { "name": "Squint", "positive": "Squint_Pos" },
        { "name": "Jaw", "positive": "Jaw_Open" }
    ],
    "combos": [
        { "name": "Smile+Squint", "sliders": ["Smile", "Squint"],
          "shapes": [ { "orthant": "++", "shape": "SmileSquint",
              "inbetweens": [ { "position": 0.5, "shape": "SmileSquint_Half" } ] } ] }
    ],
    "traversals": [
        { "name": "SmileOpen",
          "progress": { "slider": "Jaw" },
          "multiplier": { "slider": "Smile" },
          "shape": "SmileOpen",
          "inbetweens": [ { "position": 0.5, "shape": "SmileOpen_Mid" } ] }
    ]
}"#;

pub fn definition(text: &str) -> LibraryDefinition {
    serde_json::from_str(text).unwrap()
}

pub fn face_definition() -> LibraryDefinition {
    definition(FACE)
}

pub fn face_model() -> CombinationModel {
    face_definition().build().unwrap()
}

pub fn face_solver() -> WeightSolver {
    WeightSolver::with_defaults(face_model())
}

pub fn solver_from(def: &LibraryDefinition) -> WeightSolver {
    WeightSolver::from_definition(def, SolverConfig::default()).unwrap()
}

pub fn tracked_solver() -> WeightSolver {
    solver_from(&definition(TRACKED_FACE))
}

/// Solve result keyed by shape name.
pub fn by_name(model: &CombinationModel, weights: &[ShapeWeight]) -> BTreeMap<String, f64> {
    weights
        .iter()
        .map(|w| (model.shape(w.shape).name().to_string(), w.weight))
        .collect()
}

/// Whether a shape's owner involves `slider`: directly, as a combo axis, or
/// through either control of a traversal.
pub fn involves(model: &CombinationModel, owner: ShapeOwner, slider: SliderId) -> bool {
    let reads = |control: Control| match control {
        Control::Slider { slider: s, .. } => s == slider,
        Control::Combo { combo, .. } => model.combo(combo).axes().contains(&slider),
    };
    match owner {
        ShapeOwner::Slider { slider: s, .. } => s == slider,
        ShapeOwner::Combo { combo, .. } => model.combo(combo).axes().contains(&slider),
        ShapeOwner::Traversal { traversal } => {
            let traversal = model.traversal(traversal);
            reads(traversal.progress()) || reads(traversal.multiplier())
        }
    }
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
