//! Benchmarks for the DG ↔ subcell projection operators.
//!
//! Run with: `cargo bench --bench projection_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dg_subcell::polynomial::gauss_lobatto_nodes;
use dg_subcell::{project_to_subcell, reconstruct_from_subcell, Basis, Mesh, Quadrature};

fn nodal_field(mesh: &Mesh) -> Vec<f64> {
    let per_axis: Vec<Vec<f64>> = (0..mesh.dim())
        .map(|a| gauss_lobatto_nodes(mesh.extent(a) - 1))
        .collect();
    let mut field = Vec::with_capacity(mesh.num_grid_points());
    match mesh.dim() {
        1 => {
            for &x in &per_axis[0] {
                field.push((3.0 * x).sin());
            }
        }
        _ => {
            for &y in &per_axis[1] {
                for &x in &per_axis[0] {
                    field.push((3.0 * x).sin() * (2.0 * y).cos());
                }
            }
        }
    }
    field
}

fn bench_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("project_to_subcell");
    for n in [4, 8, 12] {
        let mesh = Mesh::isotropic(1, n, Basis::Legendre, Quadrature::GaussLobatto).unwrap();
        let field = nodal_field(&mesh);
        // Warm the operator cache outside the measurement.
        let _ = project_to_subcell(&field, &mesh);
        group.bench_with_input(BenchmarkId::new("1d", n), &n, |b, _| {
            b.iter(|| project_to_subcell(black_box(&field), &mesh))
        });
    }
    for n in [4, 8] {
        let mesh = Mesh::isotropic(2, n, Basis::Legendre, Quadrature::GaussLobatto).unwrap();
        let field = nodal_field(&mesh);
        let _ = project_to_subcell(&field, &mesh);
        group.bench_with_input(BenchmarkId::new("2d", n), &n, |b, _| {
            b.iter(|| project_to_subcell(black_box(&field), &mesh))
        });
    }
    group.finish();
}

fn bench_roundtrip(c: &mut Criterion) {
    let mesh = Mesh::isotropic(2, 6, Basis::Legendre, Quadrature::GaussLobatto).unwrap();
    let field = nodal_field(&mesh);
    let _ = project_to_subcell(&field, &mesh);
    c.bench_function("roundtrip_2d_6pts", |b| {
        b.iter(|| {
            let averages = project_to_subcell(black_box(&field), &mesh);
            reconstruct_from_subcell(&averages, &mesh)
        })
    });
}

criterion_group!(benches, bench_projection, bench_roundtrip);
criterion_main!(benches);
