//! Persson-Peraire smoothness indicator.
//!
//! For a smooth field the modal Legendre coefficients decay rapidly; a
//! shock or discontinuity dumps energy into the highest modes. The
//! indicator transforms the nodal field to modal space, measures the
//! energy of the top mode along each axis, and compares the ratio
//! against N^(-alpha):
//!
//! troubled ⇔ E_top > N^(-alpha) * E_total along any axis
//!
//! Being a ratio, the decision is invariant under uniform positive
//! scaling of the field. Degenerate inputs are handled conservatively:
//! zero (or denormal) total energy is never troubled (a constant field
//! is perfectly resolved), while non-finite energies are always troubled.

use crate::basis::vandermonde_for;
use crate::mesh::{strides, Mesh};
use crate::projection::apply_along_axis;

/// Modal coefficients of a nodal field, axis-by-axis transform.
fn modal_coefficients(field: &[f64], mesh: &Mesh) -> Vec<f64> {
    let extents = mesh.extents().to_vec();
    let mut data = field.to_vec();
    for axis in 0..mesh.dim() {
        let vander = vandermonde_for(mesh.extent(axis));
        data = apply_along_axis(&vander.v_inv, &data, &extents, axis);
        // The transform is square; extents do not change.
    }
    data
}

/// Run the Persson indicator on one field.
///
/// `exponent` is the alpha in the N^(-alpha) threshold; larger values
/// make the indicator more permissive. Returns `true` if the field is
/// troubled.
pub fn persson_tci(field: &[f64], mesh: &Mesh, exponent: f64) -> bool {
    assert_eq!(field.len(), mesh.num_grid_points());

    if field.iter().any(|v| !v.is_finite()) {
        return true;
    }

    let modal = modal_coefficients(field, mesh);
    let total_energy: f64 = modal.iter().map(|c| c * c).sum();

    if !total_energy.is_finite() {
        return true;
    }
    // A constant (or identically zero) field has no high-mode content and
    // must not divide by its vanishing energy.
    if total_energy <= f64::MIN_POSITIVE {
        return false;
    }

    let extents = mesh.extents();
    let ext_strides = strides(extents);

    for axis in 0..mesh.dim() {
        let n = extents[axis];
        if n < 2 {
            continue;
        }

        // Energy of coefficients whose index along `axis` is the top mode.
        let mut top_energy = 0.0;
        for (flat, c) in modal.iter().enumerate() {
            let axis_index = (flat / ext_strides[axis]) % n;
            if axis_index == n - 1 {
                top_energy += c * c;
            }
        }

        let threshold = (n as f64).powf(-exponent);
        if top_energy > threshold * total_energy {
            return true;
        }
    }

    false
}
