//! Slider response curves.
//!
//! A [`Progression`] maps a slider's raw value to a normalized activation in
//! `[-1, 1]`. Three curve kinds are supported:
//!
//! - **Linear**: `raw * scale`.
//! - **Piecewise**: straight segments between control points.
//! - **Spline**: cubic Hermite segments through the control points, with
//!   Fritsch–Carlson limited tangents so a monotone set of points yields a
//!   monotone curve with no overshoot.
//!
//! Every curve passes through `(0, 0)` and is monotonic on each side of it:
//! walking outward from the origin, the output moves in one direction only.
//! The two sides are independent, so inverted curves (`raw * -1`) and
//! V-shaped curves that drive the positive side from both directions are
//! allowed. Both properties are checked when the progression is constructed;
//! evaluation itself cannot fail. Raw values are clamped to the configured
//! domain before lookup.

use serde::{Deserialize, Serialize};

use crate::constants::{ACTIVATION_MAX, ACTIVATION_MIN, DEFAULT_DOMAIN, MIN_CONTROL_POINTS};
use crate::error::CurveError;

/// A `(raw input, activation)` pair on a curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub input: f64,
    pub output: f64,
}

impl ControlPoint {
    pub fn new(input: f64, output: f64) -> Self {
        Self { input, output }
    }
}

impl From<(f64, f64)> for ControlPoint {
    fn from((input, output): (f64, f64)) -> Self {
        Self { input, output }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Curve {
    Linear { scale: f64 },
    Piecewise { points: Vec<ControlPoint> },
    Spline { points: Vec<ControlPoint>, tangents: Vec<f64> },
}

/// A validated response curve plus the raw-value domain it is evaluated on.
#[derive(Debug, Clone, PartialEq)]
pub struct Progression {
    curve: Curve,
    domain: (f64, f64),
}

impl Default for Progression {
    fn default() -> Self {
        Self::linear()
    }
}

impl Progression {
    /// Identity curve on `[-1, 1]`.
    pub fn linear() -> Self {
        Self {
            curve: Curve::Linear { scale: 1.0 },
            domain: DEFAULT_DOMAIN,
        }
    }

    /// `raw * scale` on `[-1, 1]`, saturating at full activation. A negative
    /// scale inverts the slider.
    pub fn scaled(scale: f64) -> Result<Self, CurveError> {
        if !scale.is_finite() || scale == 0.0 {
            return Err(CurveError::InvalidScale(scale));
        }
        Ok(Self {
            curve: Curve::Linear { scale },
            domain: DEFAULT_DOMAIN,
        })
    }

    /// Straight segments between `points`. The domain defaults to the span of the points.
    pub fn piecewise<P>(points: impl IntoIterator<Item = P>) -> Result<Self, CurveError>
    where
        P: Into<ControlPoint>,
    {
        let points = validate_points(points.into_iter().map(Into::into).collect())?;
        let domain = span(&points);
        Ok(Self {
            curve: Curve::Piecewise { points },
            domain,
        })
    }

    /// Monotone cubic Hermite interpolation through `points`.
    pub fn spline<P>(points: impl IntoIterator<Item = P>) -> Result<Self, CurveError>
    where
        P: Into<ControlPoint>,
    {
        let points = validate_points(points.into_iter().map(Into::into).collect())?;
        let tangents = monotone_tangents(&points);
        let domain = span(&points);
        Ok(Self {
            curve: Curve::Spline { points, tangents },
            domain,
        })
    }

    /// Replace the clamp domain. It must be finite, non-empty and contain 0.
    pub fn with_domain(mut self, min: f64, max: f64) -> Result<Self, CurveError> {
        if !min.is_finite() || !max.is_finite() || min >= max || min > 0.0 || max < 0.0 {
            return Err(CurveError::InvalidDomain { min, max });
        }
        self.domain = (min, max);
        Ok(self)
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    /// Short name of the curve kind: `"linear"`, `"piecewise"` or `"spline"`.
    pub fn kind(&self) -> &'static str {
        match self.curve {
            Curve::Linear { .. } => "linear",
            Curve::Piecewise { .. } => "piecewise",
            Curve::Spline { .. } => "spline",
        }
    }

    /// Control points of a piecewise or spline curve; empty for linear curves.
    pub fn points(&self) -> &[ControlPoint] {
        match &self.curve {
            Curve::Linear { .. } => &[],
            Curve::Piecewise { points } | Curve::Spline { points, .. } => points,
        }
    }

    /// Linear scale factor, if this is a linear curve.
    pub fn scale(&self) -> Option<f64> {
        match self.curve {
            Curve::Linear { scale } => Some(scale),
            _ => None,
        }
    }

    /// Map a raw slider value to an activation in `[-1, 1]`.
    ///
    /// NaN is treated as the neutral value 0. Infinite and other out-of-domain
    /// values are clamped to the domain first.
    pub fn evaluate(&self, raw: f64) -> f64 {
        if raw.is_nan() || raw == 0.0 {
            return 0.0;
        }
        let x = raw.clamp(self.domain.0, self.domain.1);
        let y = match &self.curve {
            Curve::Linear { scale } => x * scale,
            Curve::Piecewise { points } => piecewise_at(points, x),
            Curve::Spline { points, tangents } => hermite_at(points, tangents, x),
        };
        y.clamp(ACTIVATION_MIN, ACTIVATION_MAX)
    }
}

fn span(points: &[ControlPoint]) -> (f64, f64) {
    (points[0].input, points[points.len() - 1].input)
}

fn validate_points(points: Vec<ControlPoint>) -> Result<Vec<ControlPoint>, CurveError> {
    if points.len() < MIN_CONTROL_POINTS {
        return Err(CurveError::TooFewPoints {
            min: MIN_CONTROL_POINTS,
            got: points.len(),
        });
    }
    for (index, p) in points.iter().enumerate() {
        if !p.input.is_finite() || !p.output.is_finite() {
            return Err(CurveError::NonFinitePoint { index });
        }
        if !(ACTIVATION_MIN..=ACTIVATION_MAX).contains(&p.output) {
            return Err(CurveError::OutputOutOfRange {
                index,
                value: p.output,
            });
        }
    }
    if let Some(index) = points.windows(2).position(|pair| pair[1].input <= pair[0].input) {
        return Err(CurveError::UnsortedInputs { index: index + 1 });
    }
    let origin = points
        .iter()
        .position(|p| p.input == 0.0 && p.output == 0.0)
        .ok_or(CurveError::MissingOrigin)?;
    check_side((origin..points.len()).map(|i| (i, points[i].output)))?;
    check_side((0..=origin).rev().map(|i| (i, points[i].output)))?;
    Ok(points)
}

/// `side` walks outward from the origin. The first change in output fixes
/// the direction; any later step against it is rejected.
fn check_side(side: impl Iterator<Item = (usize, f64)>) -> Result<(), CurveError> {
    let mut direction = 0.0;
    let mut previous: Option<f64> = None;
    for (index, output) in side {
        if let Some(previous) = previous {
            let step = output - previous;
            if step * direction < 0.0 {
                return Err(CurveError::NonMonotonic { index });
            }
            if direction == 0.0 && step != 0.0 {
                direction = step.signum();
            }
        }
        previous = Some(output);
    }
    Ok(())
}

/// Index `k` of the segment `[points[k], points[k + 1]]` containing `x`.
///
/// `x` must lie within the span of the points.
fn segment(points: &[ControlPoint], x: f64) -> usize {
    let upper = points.partition_point(|p| p.input <= x);
    upper.saturating_sub(1).min(points.len() - 2)
}

fn piecewise_at(points: &[ControlPoint], x: f64) -> f64 {
    let (first, last) = (points[0], points[points.len() - 1]);
    if x <= first.input {
        return first.output;
    }
    if x >= last.input {
        return last.output;
    }
    let k = segment(points, x);
    let (lo, hi) = (points[k], points[k + 1]);
    let frac = (x - lo.input) / (hi.input - lo.input);
    lo.output + (hi.output - lo.output) * frac
}

fn hermite_at(points: &[ControlPoint], tangents: &[f64], x: f64) -> f64 {
    let (first, last) = (points[0], points[points.len() - 1]);
    if x <= first.input {
        return first.output;
    }
    if x >= last.input {
        return last.output;
    }
    let k = segment(points, x);
    let (lo, hi) = (points[k], points[k + 1]);
    let h = hi.input - lo.input;
    let t = (x - lo.input) / h;

    let t2 = t * t;
    let t3 = t2 * t;
    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;

    h00 * lo.output + h10 * h * tangents[k] + h01 * hi.output + h11 * h * tangents[k + 1]
}

/// Fritsch–Carlson tangents. Each segment stays monotone, and a point where
/// the secants change sign gets a flat tangent.
fn monotone_tangents(points: &[ControlPoint]) -> Vec<f64> {
    let n = points.len();
    let secants: Vec<f64> = points
        .windows(2)
        .map(|p| (p[1].output - p[0].output) / (p[1].input - p[0].input))
        .collect();

    let mut tangents = vec![0.0; n];
    tangents[0] = secants[0];
    tangents[n - 1] = secants[n - 2];
    for k in 1..n - 1 {
        let (before, after) = (secants[k - 1], secants[k]);
        tangents[k] = if before * after <= 0.0 {
            0.0
        } else {
            (before + after) / 2.0
        };
    }

    for (k, &secant) in secants.iter().enumerate() {
        if secant == 0.0 {
            tangents[k] = 0.0;
            tangents[k + 1] = 0.0;
            continue;
        }
        let alpha = tangents[k] / secant;
        let beta = tangents[k + 1] / secant;
        let radius = alpha * alpha + beta * beta;
        if radius > 9.0 {
            let tau = 3.0 / radius.sqrt();
            tangents[k] = tau * alpha * secant;
            tangents[k + 1] = tau * beta * secant;
        }
    }
    tangents
}
