//! Solver constants. Activations and weights are normalized to `[-1, 1]` and `[0, 1]`.

/// Default activation floor.
///
/// Slider activations whose magnitude is at or below this value are treated as
/// exactly zero, so floating-point noise never triggers a combo or leaks a tiny
/// weight into the output.
pub const DEFAULT_ACTIVATION_EPSILON: f64 = 1e-6;

/// Upper bound (exclusive) accepted for a configured activation floor.
pub const MAX_ACTIVATION_EPSILON: f64 = 0.5;

/// Smallest number of axes a combo may have. A single slider is not a combo.
pub const MIN_COMBO_DEPTH: usize = 2;

/// Largest number of axes a combo may have.
///
/// Orthant sign patterns are stored as a `u64` bitmask, one bit per axis.
pub const MAX_COMBO_DEPTH: usize = 64;

/// Default number of simplices kept in the solver's geometry cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// Minimum number of control points for a piecewise or spline curve.
pub const MIN_CONTROL_POINTS: usize = 2;

/// Lower bound of the normalized activation range.
pub const ACTIVATION_MIN: f64 = -1.0;

/// Upper bound of the normalized activation range.
pub const ACTIVATION_MAX: f64 = 1.0;

/// Default raw-value domain of a linear progression.
pub const DEFAULT_DOMAIN: (f64, f64) = (-1.0, 1.0);

/// Track position of a slot's full shape. In-between shapes sit strictly
/// between 0 (the rest pose) and this value.
pub const FULL_POSITION: f64 = 1.0;
