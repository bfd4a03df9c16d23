//! Error types for rigblend.
//!
//! Only building or editing a [`CombinationModel`](crate::model::CombinationModel)
//! and validating solver settings can fail. Solving never returns an error.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CurveError {
    #[error("curve needs at least {min} control points, got {got}")] TooFewPoints { min: usize, got: usize },
    #[error("non-finite control point at index {index}")] NonFinitePoint { index: usize },
    #[error("control point inputs must be strictly increasing (index {index})")] UnsortedInputs { index: usize },
    #[error("curve output must be monotonic on each side of zero (index {index})")] NonMonotonic { index: usize },
    #[error("curve output {value} at index {index} is outside [-1, 1]")] OutputOutOfRange { index: usize, value: f64 },
    #[error("curve does not pass through (0, 0)")] MissingOrigin,
    #[error("invalid domain [{min}, {max}]: must be finite, ordered and contain 0")] InvalidDomain { min: f64, max: f64 },
    #[error("invalid linear scale {0}: must be finite and non-zero")] InvalidScale(f64),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("duplicate slider name: {0}")] DuplicateSlider(String),
    #[error("duplicate combo name: {0}")] DuplicateCombo(String),
    #[error("duplicate shape name: {0}")] DuplicateShape(String),
    #[error("unknown slider {slider} referenced by {referrer}")] UnknownSlider { slider: String, referrer: String },
    #[error("duplicate traversal name: {0}")] DuplicateTraversal(String),
    #[error("unknown combo: {0}")] UnknownCombo(String),
    #[error("unknown traversal: {0}")] UnknownTraversal(String),
    #[error("invalid curve on slider {slider}: {source}")] InvalidCurve { slider: String, source: CurveError },
    #[error("slider {slider} already has shape {existing} on its {sign} side, cannot attach {shape}")] SliderSlotTaken { slider: String, sign: char, existing: String, shape: String },
    #[error("combo {combo} already has shape {existing} at orthant {orthant}, cannot attach {shape}")] ComboSlotTaken { combo: String, orthant: String, existing: String, shape: String },
    #[error("combo {combo} has depth {depth}, must be between {min} and {max}")] InvalidDepth { combo: String, depth: usize, min: usize, max: usize },
    #[error("combo {combo} uses slider {slider} more than once")] DuplicateAxis { combo: String, slider: String },
    #[error("combo {combo} has the same axes as combo {existing}")] DuplicateAxisSet { combo: String, existing: String },
    #[error("orthant {orthant} has depth {got} but combo {combo} has depth {expected}")] OrthantDepthMismatch { combo: String, orthant: String, expected: usize, got: usize },
    #[error("cannot attach in-between {shape} to {owner}: no full shape there")] MissingFullShape { owner: String, shape: String },
    #[error("in-between {shape} on {owner} has position {position}, must be in (0, 1)")] InvalidPosition { owner: String, shape: String, position: f64 },
    #[error("{owner} already has shape {existing} at position {position}, cannot attach {shape}")] PositionTaken { owner: String, position: f64, existing: String, shape: String },
    #[error("malformed orthant pattern {pattern:?}: use '+' and '-' per axis")] MalformedOrthant { pattern: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverConfigError {
    #[error("activation epsilon {0} must be finite and in [0, 0.5)")] InvalidEpsilon(f64),
}

#[derive(Error, Debug)]
pub enum RigError {
    #[error(transparent)] Curve(#[from] CurveError),
    #[error(transparent)] Config(#[from] ConfigError),
    #[error(transparent)] SolverConfig(#[from] SolverConfigError),
}
