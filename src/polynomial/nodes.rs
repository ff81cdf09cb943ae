//! Quadrature nodes and weights.
//!
//! Two rules are needed by the subcell scheme:
//! - Gauss-Lobatto-Legendre (GLL): the DG collocation points. Endpoint
//!   inclusion makes the surface quadrature coincide with volume nodes.
//! - Gauss-Legendre (GL): open rule used to integrate the DG basis over
//!   individual subcells exactly when building the projection operator.

use std::f64::consts::PI;

use super::legendre::{legendre, legendre_and_derivative};

/// Compute the N+1 Gauss-Lobatto-Legendre nodes for polynomial order N.
///
/// The nodes are the roots of (1-x²)P'_N(x) in [-1, 1], including the
/// endpoints. Interior roots are found by Newton iteration starting from
/// the Chebyshev-Lobatto points x_j = -cos(π j / N); using the identity
/// L'_N = -N(N+1) P_N for L_N = (1-x²)P'_N the update is
/// x ← x + (1-x²) P'_N / (N(N+1) P_N).
pub fn gauss_lobatto_nodes(order: usize) -> Vec<f64> {
    let n = order;

    if n == 0 {
        return vec![0.0];
    }
    if n == 1 {
        return vec![-1.0, 1.0];
    }

    let mut nodes: Vec<f64> = (0..=n).map(|j| -(PI * j as f64 / n as f64).cos()).collect();
    nodes[0] = -1.0;
    nodes[n] = 1.0;

    for node in nodes.iter_mut().take(n).skip(1) {
        let mut x = *node;
        for _ in 0..100 {
            let (p, dp) = legendre_and_derivative(n, x);
            let update = (1.0 - x * x) * dp / (n as f64 * (n + 1) as f64 * p);
            x += update;
            if update.abs() < 1e-15 {
                break;
            }
        }
        *node = x;
    }

    nodes
}

/// Compute the GLL quadrature weights for the given order and nodes.
///
/// w_j = 2 / (N (N+1) P_N(x_j)²), exact for polynomials of degree 2N-1.
pub fn gauss_lobatto_weights(order: usize, nodes: &[f64]) -> Vec<f64> {
    let n = order;
    assert_eq!(nodes.len(), n + 1, "Need order+1 nodes");

    if n == 0 {
        return vec![2.0];
    }

    nodes
        .iter()
        .map(|&x| {
            let p = legendre(n, x);
            2.0 / (n as f64 * (n + 1) as f64 * p * p)
        })
        .collect()
}

/// Compute the n-point Gauss-Legendre rule on [-1, 1].
///
/// Returns `(nodes, weights)`. Nodes are the roots of P_n, found by
/// Newton iteration from the asymptotic guess x_i = cos(π(4i+3)/(4n+2));
/// weights are w_i = 2 / ((1-x_i²) P'_n(x_i)²). Exact for polynomials of
/// degree 2n-1.
pub fn gauss_legendre_rule(n: usize) -> (Vec<f64>, Vec<f64>) {
    assert!(n > 0, "Gauss-Legendre rule needs at least one point");

    let mut nodes = vec![0.0; n];
    let mut weights = vec![0.0; n];

    for i in 0..n {
        let mut x = (PI * (4 * i + 3) as f64 / (4 * n + 2) as f64).cos();

        for _ in 0..100 {
            let (p, dp) = legendre_and_derivative(n, x);
            let update = p / dp;
            x -= update;
            if update.abs() < 1e-15 {
                break;
            }
        }

        let (_, dp) = legendre_and_derivative(n, x);
        nodes[i] = x;
        weights[i] = 2.0 / ((1.0 - x * x) * dp * dp);
    }

    // Newton converges from the upper end; store ascending like GLL.
    nodes.reverse();
    weights.reverse();

    (nodes, weights)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gll_low_orders() {
        // Order 1: endpoints, weights 1.
        let nodes = gauss_lobatto_nodes(1);
        assert_eq!(nodes, vec![-1.0, 1.0]);
        let weights = gauss_lobatto_weights(1, &nodes);
        assert!((weights[0] - 1.0).abs() < 1e-14);
        assert!((weights[1] - 1.0).abs() < 1e-14);

        // Order 2: {-1, 0, 1} with weights {1/3, 4/3, 1/3}.
        let nodes = gauss_lobatto_nodes(2);
        assert!((nodes[1]).abs() < 1e-14);
        let weights = gauss_lobatto_weights(2, &nodes);
        assert!((weights[0] - 1.0 / 3.0).abs() < 1e-14);
        assert!((weights[1] - 4.0 / 3.0).abs() < 1e-14);
    }

    #[test]
    fn test_gll_weights_sum_to_two() {
        for order in 1..=11 {
            let nodes = gauss_lobatto_nodes(order);
            let weights = gauss_lobatto_weights(order, &nodes);
            let sum: f64 = weights.iter().sum();
            assert!(
                (sum - 2.0).abs() < 1e-12,
                "GLL weights must sum to 2 for order {}, got {}",
                order,
                sum
            );
        }
    }

    #[test]
    fn test_gll_nodes_symmetric_and_sorted() {
        for order in 2..=11 {
            let nodes = gauss_lobatto_nodes(order);
            for w in nodes.windows(2) {
                assert!(w[0] < w[1], "nodes must be ascending");
            }
            for j in 0..nodes.len() {
                assert!((nodes[j] + nodes[nodes.len() - 1 - j]).abs() < 1e-13);
            }
        }
    }

    #[test]
    fn test_gauss_legendre_exactness() {
        // n-point rule integrates x^k exactly for k <= 2n-1.
        for n in 1..=8 {
            let (nodes, weights) = gauss_legendre_rule(n);
            for k in 0..(2 * n) {
                let quad: f64 = nodes
                    .iter()
                    .zip(&weights)
                    .map(|(&x, &w)| w * x.powi(k as i32))
                    .sum();
                let exact = if k % 2 == 0 { 2.0 / (k as f64 + 1.0) } else { 0.0 };
                assert!(
                    (quad - exact).abs() < 1e-13,
                    "GL({}) failed on x^{}: {} vs {}",
                    n,
                    k,
                    quad,
                    exact
                );
            }
        }
    }

    #[test]
    fn test_gauss_legendre_two_point() {
        let (nodes, weights) = gauss_legendre_rule(2);
        let expected = 1.0 / 3.0_f64.sqrt();
        assert!((nodes[0] + expected).abs() < 1e-14);
        assert!((nodes[1] - expected).abs() < 1e-14);
        assert!((weights[0] - 1.0).abs() < 1e-14);
        assert!((weights[1] - 1.0).abs() < 1e-14);
    }
}
