//! DG ↔ subcell projection operators.
//!
//! Two linear maps per 1-D extent pair connect the representations:
//! - **Projection** (DG nodal → subcell cell averages):
//!   `P[i,j] = (1/Δξ_i) ∫_{cell i} ℓ_j(ξ) dξ`, with ℓ_j the Lagrange
//!   cardinal functions on the GLL nodes. The subcell integrals are done
//!   with a Gauss-Legendre rule exact for the basis degree, so the total
//!   integral of the projected averages equals the DG integral of the
//!   field to roundoff: the projection is conservative by construction.
//! - **Reconstruction** (subcell averages → DG nodal): the least-squares
//!   pseudo-inverse `R = (PᵀP)⁻¹ Pᵀ` (subcells are uniform, so the
//!   width weighting drops out). Because P has full column rank for
//!   fd ≥ dg points, R is an exact left inverse: projecting any field the
//!   DG basis represents and reconstructing returns it to roundoff.
//!
//! Higher-dimensional operators are never materialized; the 1-D matrix is
//! applied axis by axis over the flattened buffer (tensor-product
//! structure). For a fixed mesh the operators are pure, so they live in a
//! process-wide cache shared read-only across element tasks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use faer::{linalg::solvers::Solve, Mat};

use crate::mesh::{strides, Mesh};
use crate::polynomial::{gauss_legendre_rule, gauss_lobatto_nodes};

/// The paired projection/reconstruction matrices for one 1-D extent.
#[derive(Clone)]
pub struct ProjectionPair {
    /// DG points along the axis.
    pub dg_points: usize,
    /// Subcells along the axis.
    pub fd_points: usize,
    /// Projection matrix, `fd_points × dg_points`.
    pub project: Mat<f64>,
    /// Reconstruction matrix, `dg_points × fd_points`.
    pub reconstruct: Mat<f64>,
}

/// Barycentric weights for Lagrange interpolation on the given nodes.
fn barycentric_weights(nodes: &[f64]) -> Vec<f64> {
    let n = nodes.len();
    let mut weights = vec![1.0; n];
    for j in 0..n {
        for k in 0..n {
            if k != j {
                weights[j] /= nodes[j] - nodes[k];
            }
        }
    }
    weights
}

/// Evaluate the j-th Lagrange cardinal function at x (barycentric form).
fn lagrange_cardinal(nodes: &[f64], bary: &[f64], j: usize, x: f64) -> f64 {
    // Exact hit on a node short-circuits the barycentric formula.
    for (m, &xm) in nodes.iter().enumerate() {
        if (x - xm).abs() < 1e-14 {
            return if m == j { 1.0 } else { 0.0 };
        }
    }

    let mut numer = 0.0;
    let mut denom = 0.0;
    for (k, (&xk, &bk)) in nodes.iter().zip(bary).enumerate() {
        let term = bk / (x - xk);
        denom += term;
        if k == j {
            numer = term;
        }
    }
    numer / denom
}

fn build_pair(dg_points: usize, fd_points: usize) -> ProjectionPair {
    assert!(dg_points >= 1 && fd_points >= dg_points);

    // A single-point axis is already at FD resolution; both maps are the
    // identity and the basis-normalization path is never entered.
    if dg_points == 1 && fd_points == 1 {
        let mut ident = Mat::zeros(1, 1);
        ident[(0, 0)] = 1.0;
        return ProjectionPair {
            dg_points,
            fd_points,
            project: ident.clone(),
            reconstruct: ident,
        };
    }

    let nodes = gauss_lobatto_nodes(dg_points - 1);
    let bary = barycentric_weights(&nodes);
    let (gl_nodes, gl_weights) = gauss_legendre_rule(dg_points);

    let width = 2.0 / fd_points as f64;
    let mut project = Mat::zeros(fd_points, dg_points);

    for i in 0..fd_points {
        let lo = -1.0 + i as f64 * width;
        for j in 0..dg_points {
            // (1/Δ) ∫ ℓ_j over the cell; mapping the GL rule onto the cell
            // gives a factor Δ/2 which cancels the 1/Δ average.
            let mut avg = 0.0;
            for (&xq, &wq) in gl_nodes.iter().zip(&gl_weights) {
                let x = lo + width * (xq + 1.0) / 2.0;
                avg += wq * lagrange_cardinal(&nodes, &bary, j, x);
            }
            project[(i, j)] = avg / 2.0;
        }
    }

    // Normal equations for the least-squares left inverse.
    let mut normal = Mat::zeros(dg_points, dg_points);
    for a in 0..dg_points {
        for b in 0..dg_points {
            let mut sum = 0.0;
            for i in 0..fd_points {
                sum += project[(i, a)] * project[(i, b)];
            }
            normal[(a, b)] = sum;
        }
    }

    let lu = normal.as_ref().full_piv_lu();
    let mut reconstruct = Mat::zeros(dg_points, fd_points);
    for i in 0..fd_points {
        let mut rhs = Mat::zeros(dg_points, 1);
        for a in 0..dg_points {
            rhs[(a, 0)] = project[(i, a)];
        }
        let col = lu.solve(&rhs);
        for a in 0..dg_points {
            reconstruct[(a, i)] = col[(a, 0)];
        }
    }

    ProjectionPair {
        dg_points,
        fd_points,
        project,
        reconstruct,
    }
}

/// Fetch (building and memoizing on first use) the operator pair for a
/// 1-D extent pair. Safe for concurrent use from many element tasks.
pub fn projection_pair(dg_points: usize, fd_points: usize) -> Arc<ProjectionPair> {
    static CACHE: OnceLock<Mutex<HashMap<(usize, usize), Arc<ProjectionPair>>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let mut guard = cache.lock().expect("projection cache poisoned");
    Arc::clone(
        guard
            .entry((dg_points, fd_points))
            .or_insert_with(|| Arc::new(build_pair(dg_points, fd_points))),
    )
}

/// Apply a matrix along one axis of a flattened field (x fastest).
///
/// The matrix maps `extents[axis]` values to `m.nrows()` values on every
/// grid line parallel to the axis. Returns the transformed buffer; the
/// caller tracks the changed extents.
pub(crate) fn apply_along_axis(m: &Mat<f64>, data: &[f64], extents: &[usize], axis: usize) -> Vec<f64> {
    let in_n = extents[axis];
    let out_n = m.nrows();
    assert_eq!(m.ncols(), in_n, "matrix does not match axis extent");
    assert_eq!(data.len(), extents.iter().product::<usize>());

    let mut out_extents = extents.to_vec();
    out_extents[axis] = out_n;
    let in_strides = strides(extents);
    let out_strides = strides(&out_extents);
    let mut out = vec![0.0; out_extents.iter().product()];

    // Odometer over the output multi-index.
    let dim = extents.len();
    let mut idx = vec![0usize; dim];
    let total: usize = out_extents.iter().product();
    for _ in 0..total {
        let mut out_flat = 0;
        let mut in_base = 0;
        for a in 0..dim {
            out_flat += idx[a] * out_strides[a];
            if a != axis {
                in_base += idx[a] * in_strides[a];
            }
        }
        let mut sum = 0.0;
        for k in 0..in_n {
            sum += m[(idx[axis], k)] * data[in_base + k * in_strides[axis]];
        }
        out[out_flat] = sum;

        for a in 0..dim {
            idx[a] += 1;
            if idx[a] < out_extents[a] {
                break;
            }
            idx[a] = 0;
        }
    }

    out
}

/// Project one field from DG nodal values to subcell cell averages.
///
/// `field.len()` must equal `mesh.num_grid_points()`; the result has
/// `mesh.num_subcells()` entries.
pub fn project_to_subcell(field: &[f64], mesh: &Mesh) -> Vec<f64> {
    assert_eq!(field.len(), mesh.num_grid_points());

    let mut data = field.to_vec();
    let mut extents = mesh.extents().to_vec();
    for axis in 0..mesh.dim() {
        let pair = projection_pair(mesh.extent(axis), mesh.subcell_extent(axis));
        data = apply_along_axis(&pair.project, &data, &extents, axis);
        extents[axis] = mesh.subcell_extent(axis);
    }
    data
}

/// Reconstruct one field from subcell cell averages to DG nodal values.
///
/// Inverse of [`project_to_subcell`] for any field the DG basis
/// represents; lossy for data with genuine subcell-scale content.
pub fn reconstruct_from_subcell(averages: &[f64], mesh: &Mesh) -> Vec<f64> {
    assert_eq!(averages.len(), mesh.num_subcells());

    let mut data = averages.to_vec();
    let mut extents = mesh.subcell_extents();
    for axis in 0..mesh.dim() {
        let pair = projection_pair(mesh.extent(axis), mesh.subcell_extent(axis));
        data = apply_along_axis(&pair.reconstruct, &data, &extents, axis);
        extents[axis] = mesh.extent(axis);
    }
    data
}
