//! Strongly-typed identifiers used throughout the subcell core.
//!
//! Newtypes prevent mixing up the different small integers that flow
//! through the scheme (element ids, refinement levels, axis indices).
//! All of them are `#[repr(transparent)]` wrappers with zero cost.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Globally unique element identifier, assigned by the domain layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ElementId(u64);

impl ElementId {
    /// Create a new element id.
    #[inline]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw id value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Element[{}]", self.0)
    }
}

/// Adaptive-refinement level of an element.
///
/// Level L+1 elements are half the size of level L elements in every
/// dimension; neighboring elements differ by at most one level (2:1
/// balance, enforced by the domain layer).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct RefinementLevel(u32);

impl RefinementLevel {
    /// Create a refinement level.
    #[inline]
    pub const fn new(level: u32) -> Self {
        Self(level)
    }

    /// Get the raw level value.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Next finer level.
    #[inline]
    pub fn finer(self) -> Self {
        Self(self.0 + 1)
    }

    /// Next coarser level, saturating at zero.
    #[inline]
    pub fn coarser(self) -> Self {
        Self(self.0.saturating_sub(1))
    }
}

impl fmt::Display for RefinementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Which side of an axis a face lies on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Lower-coordinate face (ξ = -1 in the reference element).
    Lower,
    /// Upper-coordinate face (ξ = +1 in the reference element).
    Upper,
}

impl Side {
    /// The opposite side.
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Side::Lower => Side::Upper,
            Side::Upper => Side::Lower,
        }
    }
}

/// An element-face direction: an axis plus a side.
///
/// In `dim` dimensions there are `2 * dim` directions. A direction is the
/// key for ghost-data buffers and face reconstructions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Direction {
    /// Axis index (0 = x, 1 = y, 2 = z).
    pub axis: usize,
    /// Which face along that axis.
    pub side: Side,
}

impl Direction {
    /// Create a direction.
    #[inline]
    pub const fn new(axis: usize, side: Side) -> Self {
        Self { axis, side }
    }

    /// Lower face of an axis.
    #[inline]
    pub const fn lower(axis: usize) -> Self {
        Self::new(axis, Side::Lower)
    }

    /// Upper face of an axis.
    #[inline]
    pub const fn upper(axis: usize) -> Self {
        Self::new(axis, Side::Upper)
    }

    /// The direction of the same interface seen from the neighbor's side.
    #[inline]
    pub fn opposite(self) -> Self {
        Self::new(self.axis, self.side.opposite())
    }

    /// All `2 * dim` directions, lower before upper per axis.
    pub fn all(dim: usize) -> impl Iterator<Item = Direction> {
        (0..dim).flat_map(|axis| [Direction::lower(axis), Direction::upper(axis)])
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let axis = match self.axis {
            0 => "x",
            1 => "y",
            2 => "z",
            _ => "?",
        };
        let sign = match self.side {
            Side::Lower => "-",
            Side::Upper => "+",
        };
        write!(f, "{}{}", sign, axis)
    }
}
