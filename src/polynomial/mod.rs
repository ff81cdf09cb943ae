//! Legendre polynomials and quadrature rules.
//!
//! Provides the 1-D building blocks for the DG basis and the subcell
//! projection integrals:
//! - Legendre polynomial evaluation (three-term recurrence)
//! - Gauss-Lobatto-Legendre nodes and weights (DG collocation points)
//! - Gauss-Legendre nodes and weights (exact subcell integrals)

mod legendre;
mod nodes;

pub use legendre::{legendre, legendre_and_derivative, legendre_derivative};
pub use nodes::{gauss_legendre_rule, gauss_lobatto_nodes, gauss_lobatto_weights};
