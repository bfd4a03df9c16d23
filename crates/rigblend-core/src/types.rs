//! Identifiers, signs and orthants.
//!
//! Sliders, combos, traversals and shapes live in flat arrays inside the
//! [`CombinationModel`](crate::model::CombinationModel); the id newtypes are
//! plain indices into those arrays, so the model has no pointer links and can
//! be shared freely across reader threads.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::MAX_COMBO_DEPTH;
use crate::error::ConfigError;

macro_rules! index_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            /// Position in the owning model array.
            pub fn index(self) -> usize {
                self.0 as usize
            }

            pub(crate) fn from_index(index: usize) -> Self {
                Self(index as u32)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

index_id!(
    /// Index of a slider in the model.
    SliderId,
    "slider"
);
index_id!(
    /// Index of a combo in the model.
    ComboId,
    "combo"
);
index_id!(
    /// Index of a shape (deformer target) in the model.
    ShapeId,
    "shape"
);
index_id!(
    /// Index of a traversal in the model.
    TraversalId,
    "traversal"
);

/// Direction of a slider activation relative to neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sign {
    #[default]
    Positive,
    Negative,
}

impl Sign {
    /// Sign of a value. Exactly zero (and negative zero) ties toward positive.
    pub fn of(value: f64) -> Self {
        if value < 0.0 {
            Self::Negative
        } else {
            Self::Positive
        }
    }

    pub fn signum(self) -> f64 {
        match self {
            Self::Positive => 1.0,
            Self::Negative => -1.0,
        }
    }

    /// `'+'` or `'-'`, as used in orthant patterns.
    pub fn symbol(self) -> char {
        match self {
            Self::Positive => '+',
            Self::Negative => '-',
        }
    }

    /// Slot index for per-sign arrays: positive first.
    pub fn slot(self) -> usize {
        match self {
            Self::Positive => 0,
            Self::Negative => 1,
        }
    }
}

/// Sign pattern over an ordered list of axes.
///
/// Bit `i` set means axis `i` points in the negative direction. Patterns print
/// and parse as one `+`/`-` character per axis, e.g. `"+-"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Orthant {
    bits: u64,
    depth: u8,
}

fn depth_mask(depth: usize) -> u64 {
    if depth >= 64 {
        u64::MAX
    } else {
        (1u64 << depth) - 1
    }
}

impl Orthant {
    /// The orthant a point lies in. Coordinates of exactly zero count as positive.
    ///
    /// # Panics
    ///
    /// Panics if `values` has more than [`MAX_COMBO_DEPTH`] entries.
    pub fn of(values: &[f64]) -> Self {
        Self::from_signs(values.iter().map(|&v| Sign::of(v)))
    }

    pub fn all_positive(depth: usize) -> Self {
        assert!(depth <= MAX_COMBO_DEPTH, "orthant depth {depth} exceeds {MAX_COMBO_DEPTH}");
        Self {
            bits: 0,
            depth: depth as u8,
        }
    }

    /// # Panics
    ///
    /// Panics if more than [`MAX_COMBO_DEPTH`] signs are given.
    pub fn from_signs(signs: impl IntoIterator<Item = Sign>) -> Self {
        let mut bits = 0u64;
        let mut depth = 0usize;
        for sign in signs {
            assert!(depth < MAX_COMBO_DEPTH, "orthant depth exceeds {MAX_COMBO_DEPTH}");
            if sign == Sign::Negative {
                bits |= 1 << depth;
            }
            depth += 1;
        }
        Self {
            bits,
            depth: depth as u8,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth as usize
    }

    pub fn sign(&self, axis: usize) -> Sign {
        debug_assert!(axis < self.depth());
        if self.bits >> axis & 1 == 1 {
            Sign::Negative
        } else {
            Sign::Positive
        }
    }

    pub fn signs(&self) -> impl Iterator<Item = Sign> + '_ {
        (0..self.depth()).map(move |axis| self.sign(axis))
    }

    /// The pattern seen by a subset of the axes, in the order given.
    pub fn restrict(&self, axes: &[usize]) -> Self {
        Self::from_signs(axes.iter().map(|&axis| self.sign(axis)))
    }

    /// Every orthant of a `depth`-dimensional space, all-positive first.
    pub fn all(depth: usize) -> impl Iterator<Item = Self> {
        assert!(depth <= MAX_COMBO_DEPTH, "orthant depth {depth} exceeds {MAX_COMBO_DEPTH}");
        (0..=depth_mask(depth)).map(move |bits| Self {
            bits,
            depth: depth as u8,
        })
    }
}

impl fmt::Display for Orthant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for sign in self.signs() {
            write!(f, "{}", sign.symbol())?;
        }
        Ok(())
    }
}

impl FromStr for Orthant {
    type Err = ConfigError;

    fn from_str(pattern: &str) -> Result<Self, Self::Err> {
        let malformed = || ConfigError::MalformedOrthant {
            pattern: pattern.to_string(),
        };
        if pattern.is_empty() || pattern.chars().count() > MAX_COMBO_DEPTH {
            return Err(malformed());
        }
        let signs = pattern
            .chars()
            .map(|c| match c {
                '+' => Ok(Sign::Positive),
                '-' => Ok(Sign::Negative),
                _ => Err(malformed()),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_signs(signs))
    }
}

impl TryFrom<String> for Orthant {
    type Error = ConfigError;

    fn try_from(pattern: String) -> Result<Self, Self::Error> {
        pattern.parse()
    }
}

impl From<Orthant> for String {
    fn from(orthant: Orthant) -> Self {
        orthant.to_string()
    }
}

/// One entry of a solve result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeWeight {
    pub shape: ShapeId,
    pub weight: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_ties_toward_positive() {
        assert_eq!(Sign::of(0.0), Sign::Positive);
        assert_eq!(Sign::of(-0.0), Sign::Positive);
        assert_eq!(Sign::of(-1e-300), Sign::Negative);
    }

    #[test]
    fn orthant_of_point() {
        let o = Orthant::of(&[0.5, -0.25, 0.0]);
        assert_eq!(o.depth(), 3);
        assert_eq!(o.sign(0), Sign::Positive);
        assert_eq!(o.sign(1), Sign::Negative);
        assert_eq!(o.sign(2), Sign::Positive);
        assert_eq!(o.to_string(), "+-+");
    }

    #[test]
    fn orthant_pattern_parse() {
        let o: Orthant = "-+".parse().unwrap();
        assert_eq!(o, Orthant::from_signs([Sign::Negative, Sign::Positive]));
        assert!("+x".parse::<Orthant>().is_err());
        assert!("".parse::<Orthant>().is_err());
    }

    #[test]
    fn orthant_restrict_keeps_order() {
        let o: Orthant = "+--+".parse().unwrap();
        assert_eq!(o.restrict(&[3, 1]).to_string(), "+-");
        assert_eq!(o.restrict(&[]).depth(), 0);
    }

    #[test]
    fn all_orthants_of_depth_two() {
        let all: Vec<String> = Orthant::all(2).map(|o| o.to_string()).collect();
        assert_eq!(all, vec!["++", "-+", "+-", "--"]);
    }

    #[test]
    fn full_depth_orthant() {
        let o = Orthant::from_signs(std::iter::repeat(Sign::Negative).take(MAX_COMBO_DEPTH));
        assert_eq!(o.depth(), MAX_COMBO_DEPTH);
        assert!(o.signs().all(|s| s == Sign::Negative));
    }

    #[test]
    fn orthant_serde_as_pattern() {
        let o: Orthant = "+-".parse().unwrap();
        let json = serde_json::to_string(&o).unwrap();
        assert_eq!(json, "\"+-\"");
        let back: Orthant = serde_json::from_str(&json).unwrap();
        assert_eq!(back, o);
        assert!(serde_json::from_str::<Orthant>("\"+?\"").is_err());
    }

    #[test]
    fn ids_display_with_kind() {
        assert_eq!(SliderId(3).to_string(), "slider#3");
        assert_eq!(ShapeId(0).index(), 0);
        assert_eq!(TraversalId(1).to_string(), "traversal#1");
    }
}
