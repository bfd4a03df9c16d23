//! # rigblend-core
//! Foundation types, progression curves and the combination model for rigblend.
//!
//! The combination model is the static definition graph a corrective shape
//! library is built from: sliders with response curves, combos over two or
//! more sliders, traversals, and the shape tracks attached to each
//! (slider, sign) and (combo, orthant) pair. Everything here is immutable once built; the
//! solver crate turns a [`Snapshot`](snapshot::Snapshot) of raw slider values
//! into sparse shape weights against it.

pub mod constants;
pub mod definition;
pub mod error;
pub mod model;
pub mod progression;
pub mod snapshot;
pub mod track;
pub mod traits;
pub mod types;

pub use definition::LibraryDefinition;
pub use error::{ConfigError, CurveError, RigError, SolverConfigError};
pub use model::{CombinationModel, Control, ModelBuilder, Traversal};
pub use progression::Progression;
pub use snapshot::Snapshot;
pub use track::{Step, Track};
pub use traits::WeightSolve;
pub use types::{ComboId, Orthant, ShapeId, ShapeWeight, Sign, SliderId, TraversalId};
