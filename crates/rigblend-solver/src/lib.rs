//! # rigblend-solver: TriSpace decomposition and weight solving.
//!
//! Turns a snapshot of raw slider values into sparse per-shape blend weights
//! for a [`CombinationModel`](rigblend_core::CombinationModel):
//! - **Regions**: active sliders linked by live combos are grouped together;
//!   an isolated slider drives its own shape directly.
//! - **TriSpace split**: inside a region the activation point is decomposed
//!   into barycentric weights over the simplex vertices of its orthant, by
//!   repeatedly peeling off the smallest live coordinate.
//! - **Cover**: each vertex goes to every combo that fits it and is not nested
//!   in a deeper fitting combo; axes no such combo claims fall back to their
//!   slider's shape. The result does not depend on combo definition order.
//! - **Tracks**: channel weights are spread over in-between shapes, and
//!   traversals add shapes driven by one control and scaled by another.
//! - **Cache**: per-region simplex geometry is built once and shared.

pub mod config;
pub mod region;
pub mod shared;
pub mod simplex;
pub mod solver;
pub mod traversal;
pub mod trispace;

pub use config::SolverConfig;
pub use shared::SharedSolver;
pub use simplex::{RegionKey, Simplex, SimplexCache};
pub use solver::WeightSolver;
pub use trispace::TriSpace;
