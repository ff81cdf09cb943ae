//! Per-element mesh descriptor.
//!
//! A `Mesh` is an immutable value describing one element's DG
//! discretization: points per dimension plus the basis/quadrature choice.
//! It also defines the paired uniform subcell (finite-difference) grid:
//! an element with N collocation points per dimension carries 2N-1
//! subcells per dimension, so the FD representation always has at least
//! as many degrees of freedom as the DG one.
//!
//! Refinement never mutates a mesh; the element is handed a new value.
//! `Mesh` is `Copy`, hashable, and serves as the memoization key for the
//! projection operators.

use serde::{Deserialize, Serialize};

use crate::error::SubcellError;

/// Spectral basis used within an element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Basis {
    /// Legendre polynomial basis.
    Legendre,
}

/// Collocation-point choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quadrature {
    /// Gauss-Lobatto-Legendre points (include the element boundary).
    GaussLobatto,
}

/// Immutable DG mesh descriptor for one element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mesh {
    dim: usize,
    // Axes at or beyond `dim` are held at 1 so the array is always dense.
    extents: [usize; 3],
    basis: Basis,
    quadrature: Quadrature,
}

impl Mesh {
    /// Create a mesh with per-axis extents.
    ///
    /// Rejects dimension 0 or above 3 and any axis with zero points.
    pub fn new(
        extents: &[usize],
        basis: Basis,
        quadrature: Quadrature,
    ) -> Result<Self, SubcellError> {
        let dim = extents.len();
        if dim == 0 || dim > 3 {
            return Err(SubcellError::InvalidMesh(format!(
                "dimension must be 1, 2 or 3, got {}",
                dim
            )));
        }
        if let Some(axis) = extents.iter().position(|&n| n == 0) {
            return Err(SubcellError::InvalidMesh(format!(
                "axis {} has zero grid points",
                axis
            )));
        }

        let mut padded = [1usize; 3];
        padded[..dim].copy_from_slice(extents);

        Ok(Self {
            dim,
            extents: padded,
            basis,
            quadrature,
        })
    }

    /// Create an isotropic mesh: `num_points` per axis in `dim` dimensions.
    pub fn isotropic(
        dim: usize,
        num_points: usize,
        basis: Basis,
        quadrature: Quadrature,
    ) -> Result<Self, SubcellError> {
        let extents = vec![num_points; dim];
        Self::new(&extents, basis, quadrature)
    }

    /// Spatial dimension (1, 2 or 3).
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// DG points along one axis.
    #[inline]
    pub fn extent(&self, axis: usize) -> usize {
        debug_assert!(axis < self.dim);
        self.extents[axis]
    }

    /// DG extents for the active axes.
    #[inline]
    pub fn extents(&self) -> &[usize] {
        &self.extents[..self.dim]
    }

    /// Total DG grid points in the element.
    pub fn num_grid_points(&self) -> usize {
        self.extents().iter().product()
    }

    /// Subcells along one axis: 2N - 1 for N DG points.
    #[inline]
    pub fn subcell_extent(&self, axis: usize) -> usize {
        2 * self.extent(axis) - 1
    }

    /// Subcell extents for the active axes.
    pub fn subcell_extents(&self) -> Vec<usize> {
        (0..self.dim).map(|a| self.subcell_extent(a)).collect()
    }

    /// Total subcells in the element.
    pub fn num_subcells(&self) -> usize {
        (0..self.dim).map(|a| self.subcell_extent(a)).product()
    }

    /// Basis choice.
    #[inline]
    pub fn basis(&self) -> Basis {
        self.basis
    }

    /// Quadrature choice.
    #[inline]
    pub fn quadrature(&self) -> Quadrature {
        self.quadrature
    }
}

/// Row-major-with-x-fastest strides for a set of extents.
///
/// `strides[0] = 1`; axis `a` advances by `extents[0] * ... * extents[a-1]`.
pub fn strides(extents: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; extents.len()];
    for a in 1..extents.len() {
        strides[a] = strides[a - 1] * extents[a - 1];
    }
    strides
}

/// Flatten a multi-index (x fastest).
pub fn flat_index(extents: &[usize], index: &[usize]) -> usize {
    debug_assert_eq!(extents.len(), index.len());
    let mut flat = 0;
    let mut stride = 1;
    for (a, (&n, &i)) in extents.iter().zip(index).enumerate() {
        debug_assert!(i < n, "index {} out of bounds on axis {}", i, a);
        flat += i * stride;
        stride *= n;
    }
    flat
}
