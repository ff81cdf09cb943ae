//! Vandermonde matrix for nodal-modal transformations.
//!
//! The Vandermonde matrix V connects the two representations of a DG
//! field on one element:
//! - V[i,j] = φ_j(r_i) with φ_j the j-th basis polynomial, r_i the i-th node
//! - nodal_values = V * modal_coeffs
//! - modal_coeffs = V^{-1} * nodal_values
//!
//! The basis polynomials are normalized Legendre polynomials
//! φ_j(x) = sqrt((2j+1)/2) P_j(x), so ∫ φ_i φ_j dx = δ_{ij} and the modal
//! mass matrix is the identity. The Persson troubled-cell indicator reads
//! spectral energies straight off the modal coefficients.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use faer::{linalg::solvers::Solve, Mat};

use crate::polynomial::{gauss_lobatto_nodes, legendre};

/// Vandermonde matrix and its inverse for one 1-D extent.
#[derive(Clone)]
pub struct Vandermonde {
    /// Vandermonde matrix: V[i,j] = φ_j(r_i) (normalized Legendre).
    pub v: Mat<f64>,
    /// Inverse Vandermonde matrix (nodal → modal).
    pub v_inv: Mat<f64>,
    /// Number of collocation points (order + 1).
    pub num_points: usize,
}

impl Vandermonde {
    /// Build the Vandermonde pair for `num_points` GLL collocation points.
    pub fn new(num_points: usize) -> Self {
        assert!(num_points >= 1, "Need at least one collocation point");

        // A single point carries only the constant mode; φ_0 = 1/sqrt(2).
        let order = num_points - 1;
        let nodes = gauss_lobatto_nodes(order);

        let mut v = Mat::zeros(num_points, num_points);
        for (i, &r) in nodes.iter().enumerate() {
            for j in 0..num_points {
                let norm = ((2 * j + 1) as f64 / 2.0).sqrt();
                v[(i, j)] = norm * legendre(j, r);
            }
        }

        // Invert via LU, solving V * V_inv = I column by column.
        let lu = v.as_ref().full_piv_lu();
        let mut v_inv = Mat::zeros(num_points, num_points);
        for j in 0..num_points {
            let mut rhs = Mat::zeros(num_points, 1);
            rhs[(j, 0)] = 1.0;
            let col = lu.solve(&rhs);
            for i in 0..num_points {
                v_inv[(i, j)] = col[(i, 0)];
            }
        }

        Self {
            v,
            v_inv,
            num_points,
        }
    }

    /// Transform a 1-D line of nodal values to modal coefficients.
    pub fn nodal_to_modal(&self, nodal: &[f64]) -> Vec<f64> {
        assert_eq!(nodal.len(), self.num_points);
        let n = self.num_points;
        let mut modal = vec![0.0; n];
        for i in 0..n {
            let mut sum = 0.0;
            for j in 0..n {
                sum += self.v_inv[(i, j)] * nodal[j];
            }
            modal[i] = sum;
        }
        modal
    }
}

/// Shared cache of Vandermonde pairs, keyed by point count.
///
/// The matrices are pure functions of the extent, so concurrent readers
/// from different element tasks are safe.
pub fn vandermonde_for(num_points: usize) -> Arc<Vandermonde> {
    static CACHE: OnceLock<Mutex<HashMap<usize, Arc<Vandermonde>>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let mut guard = cache.lock().expect("vandermonde cache poisoned");
    Arc::clone(
        guard
            .entry(num_points)
            .or_insert_with(|| Arc::new(Vandermonde::new(num_points))),
    )
}
