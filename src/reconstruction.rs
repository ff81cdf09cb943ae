//! Subcell neighbor reconstruction and face-solution assembly.
//!
//! Reconstructs pointwise values at subcell faces from cell averages,
//! using a pluggable slope limiter. The reconstruction is strictly local
//! (a 3-cell stencil per cell), reproduces constant data exactly, and,
//! with a limiter engaged, introduces no new extrema at discontinuities.
//!
//! The external faces of an element combine its own averages with the
//! ghost halo received from the neighbor in that direction; the resulting
//! interior/exterior value pairs feed the flux / Riemann-solver
//! collaborator, which is outside this crate.

use serde::{Deserialize, Serialize};

use crate::ghost_data::GhostData;
use crate::mesh::strides;
use crate::types::{Direction, Side};
use crate::variables::Variables;

/// Slope-reconstruction method for subcell faces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlopeLimiter {
    /// Classic minmod: most dissipative, strictly monotone.
    Minmod,
    /// Monotonised-central (van Leer): sharper, still monotone.
    MonotonisedCentral,
    /// Unlimited central slope. Higher accuracy on smooth data; no
    /// monotonicity guarantee.
    UpwindBiased,
}

fn minmod2(a: f64, b: f64) -> f64 {
    if a > 0.0 && b > 0.0 {
        a.min(b)
    } else if a < 0.0 && b < 0.0 {
        a.max(b)
    } else {
        0.0
    }
}

fn minmod3(a: f64, b: f64, c: f64) -> f64 {
    minmod2(a, minmod2(b, c))
}

impl SlopeLimiter {
    /// Limited slope of the middle cell from the 3-cell stencil
    /// (per unit cell width).
    pub fn slope(&self, um: f64, u0: f64, up: f64) -> f64 {
        let backward = u0 - um;
        let forward = up - u0;
        match self {
            SlopeLimiter::Minmod => minmod2(backward, forward),
            SlopeLimiter::MonotonisedCentral => {
                minmod3(0.5 * (up - um), 2.0 * backward, 2.0 * forward)
            }
            SlopeLimiter::UpwindBiased => 0.5 * (up - um),
        }
    }

    /// Halo cells needed on each side of the element for this method.
    pub fn stencil_half_width(&self) -> usize {
        2
    }
}

impl Default for SlopeLimiter {
    fn default() -> Self {
        SlopeLimiter::Minmod
    }
}

/// Reconstructed states at one face point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FacePair {
    /// Value approached from this element's side.
    pub interior: f64,
    /// Value approached from the neighbor's side.
    pub exterior: f64,
}

/// Reconstructed solution on one external face of an element.
#[derive(Clone, Debug)]
pub struct FaceSolution {
    /// Which face.
    pub direction: Direction,
    /// Number of fields.
    pub num_fields: usize,
    /// Subcell extents tangential to the face (empty in 1-D).
    pub face_extents: Vec<usize>,
    /// Field-major face-point states.
    pub points: Vec<FacePair>,
}

impl FaceSolution {
    /// Face points of one field.
    pub fn field(&self, f: usize) -> &[FacePair] {
        let per_field = self.points.len() / self.num_fields;
        &self.points[f * per_field..(f + 1) * per_field]
    }
}

/// Left/right states at every face of a 1-D line of cells.
///
/// `interior` holds the element's own averages; the ghost slices extend
/// the line on each side. Faces are returned lower-to-upper; face k
/// separates (conceptual) cells k-1 and k of the interior, so there are
/// `interior.len() + 1` of them. The outermost ghost cells fall back to a
/// zero slope when the halo is too narrow to support their stencil.
pub fn reconstruct_line_faces(
    ghost_lower: &[f64],
    interior: &[f64],
    ghost_upper: &[f64],
    limiter: SlopeLimiter,
) -> Vec<(f64, f64)> {
    let n = interior.len();
    assert!(n >= 1, "need at least one interior cell");
    assert!(
        !ghost_lower.is_empty() && !ghost_upper.is_empty(),
        "need at least one ghost cell on each side"
    );

    // Padded line: ghost_lower ++ interior ++ ghost_upper.
    let gl = ghost_lower.len();
    let padded: Vec<f64> = ghost_lower
        .iter()
        .chain(interior)
        .chain(ghost_upper)
        .copied()
        .collect();

    let slope_at = |i: usize| -> f64 {
        if i == 0 || i + 1 >= padded.len() {
            0.0
        } else {
            limiter.slope(padded[i - 1], padded[i], padded[i + 1])
        }
    };

    // Face k of the interior sits between padded cells gl+k-1 and gl+k.
    (0..=n)
        .map(|k| {
            let left_cell = gl + k - 1;
            let right_cell = gl + k;
            let left = padded[left_cell] + 0.5 * slope_at(left_cell);
            let right = padded[right_cell] - 0.5 * slope_at(right_cell);
            (left, right)
        })
        .collect()
}

/// Assemble the reconstructed solution on one external face.
///
/// `ghost` must already be converted to the element's resolution (done at
/// unpack time). Panics if the halo geometry is inconsistent with the
/// element's subcell extents; the caller validated it on receive.
pub(crate) fn reconstruct_face_solution_impl(
    vars: &Variables,
    extents: &[usize],
    ghost: &GhostData,
    direction: Direction,
    limiter: SlopeLimiter,
) -> FaceSolution {
    let axis = direction.axis;
    let dim = extents.len();
    let n = extents[axis];
    let halo = ghost.extents[axis];
    assert!(halo >= 1, "converted halo must hold at least one cell");

    let grid_strides = strides(extents);
    let ghost_strides = strides(&ghost.extents);

    let face_extents: Vec<usize> = (0..dim).filter(|&a| a != axis).map(|a| extents[a]).collect();
    let face_points: usize = face_extents.iter().product();

    let mut points = Vec::with_capacity(vars.num_fields() * face_points);

    for f in 0..vars.num_fields() {
        let own = vars.field(f);
        let halo_data = ghost.fields.field(f);

        // Odometer over the tangential axes.
        let mut tangential = vec![0usize; face_extents.len()];
        for _ in 0..face_points.max(1) {
            let mut own_base = 0;
            let mut ghost_base = 0;
            for (t, &i) in tangential.iter().enumerate() {
                // Map tangential position into both index spaces.
                let a = (0..dim).filter(|&a| a != axis).nth(t).unwrap();
                own_base += i * grid_strides[a];
                ghost_base += i * ghost_strides[a];
            }

            let own_at = |i: usize| own[own_base + i * grid_strides[axis]];
            let ghost_at = |i: usize| halo_data[ghost_base + i * ghost_strides[axis]];

            let pair = match direction.side {
                Side::Upper => {
                    // Face between own cell n-1 and ghost cell 0.
                    let slope_in = if n >= 2 {
                        limiter.slope(own_at(n - 2), own_at(n - 1), ghost_at(0))
                    } else {
                        0.0
                    };
                    let slope_out = if halo >= 2 {
                        limiter.slope(own_at(n - 1), ghost_at(0), ghost_at(1))
                    } else {
                        0.0
                    };
                    FacePair {
                        interior: own_at(n - 1) + 0.5 * slope_in,
                        exterior: ghost_at(0) - 0.5 * slope_out,
                    }
                }
                Side::Lower => {
                    // Face between ghost cell halo-1 and own cell 0.
                    let slope_in = if n >= 2 {
                        limiter.slope(ghost_at(halo - 1), own_at(0), own_at(1))
                    } else {
                        0.0
                    };
                    let slope_out = if halo >= 2 {
                        limiter.slope(ghost_at(halo - 2), ghost_at(halo - 1), own_at(0))
                    } else {
                        0.0
                    };
                    FacePair {
                        interior: own_at(0) - 0.5 * slope_in,
                        exterior: ghost_at(halo - 1) + 0.5 * slope_out,
                    }
                }
            };
            points.push(pair);

            for (t, i) in tangential.iter_mut().enumerate() {
                *i += 1;
                if *i < face_extents[t] {
                    break;
                }
                *i = 0;
            }
            if face_extents.is_empty() {
                break;
            }
        }
    }

    FaceSolution {
        direction,
        num_fields: vars.num_fields(),
        face_extents,
        points,
    }
}
