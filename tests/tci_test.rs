//! Troubled-cell indicator and hysteresis scenarios.

use dg_subcell::polynomial::gauss_lobatto_nodes;
use dg_subcell::{
    persson_tci, ActiveGrid, Basis, ElementId, FieldBounds, GridTransition, Mesh,
    NeighborTopology, Quadrature, RdmpTciData, RefinementLevel, ScalarAdvection, SubcellElement,
    SubcellOptions, TciTrigger, Variables,
};

fn mesh_1d(n: usize) -> Mesh {
    Mesh::new(&[n], Basis::Legendre, Quadrature::GaussLobatto).unwrap()
}

fn nodal(n: usize, f: impl Fn(f64) -> f64) -> Vec<f64> {
    gauss_lobatto_nodes(n - 1).iter().map(|&x| f(x)).collect()
}

fn element(field: Vec<f64>, options: SubcellOptions) -> SubcellElement<ScalarAdvection> {
    let n = field.len();
    SubcellElement::new(
        ElementId::new(0),
        RefinementLevel::new(0),
        mesh_1d(n),
        ScalarAdvection,
        NeighborTopology::new(),
        options,
        Variables::from_fields(&[&field]),
    )
    .unwrap()
}

#[test]
fn smooth_sine_is_never_flagged_at_default_thresholds() {
    // The canonical end-to-end scenario: 6 DG points, half a sine period
    // (well resolved at this order).
    let field = nodal(6, |x| (0.5 * std::f64::consts::PI * x).sin());
    let elem = element(field, SubcellOptions::default());
    let status = elem.compute_troubled_cell_decision().unwrap();
    assert!(!status.troubled, "smooth sine must not be flagged");
}

#[test]
fn step_function_is_flagged_on_first_evaluation() {
    let field = nodal(6, |x| if x < 0.0 { 0.0 } else { 1.0 });
    let elem = element(field, SubcellOptions::default());
    let status = elem.compute_troubled_cell_decision().unwrap();
    assert!(status.troubled, "step function must be flagged immediately");
    assert_eq!(status.trigger, Some(TciTrigger::Persson { field: 0 }));
}

#[test]
fn persson_decision_survives_uniform_scaling() {
    let mesh = mesh_1d(8);
    let smooth = nodal(8, |x| x.cos());
    // Off-center step: populates both parities of the spectrum.
    let rough = nodal(8, |x| if x < 0.3 { 1.0 } else { -1.0 });

    for scale in [1e-12, 1e-6, 1.0, 1e6, 1e12] {
        let scaled_smooth: Vec<f64> = smooth.iter().map(|v| scale * v).collect();
        let scaled_rough: Vec<f64> = rough.iter().map(|v| scale * v).collect();
        assert!(!persson_tci(&scaled_smooth, &mesh, 4.0));
        assert!(persson_tci(&scaled_rough, &mesh, 4.0));
    }
}

#[test]
fn rdmp_violation_flags_even_with_smooth_spectrum() {
    // A smooth field whose amplitude suddenly grows violates the relaxed
    // maximum principle without exciting high modes.
    let mut elem = element(nodal(6, |x| x), SubcellOptions::default());
    let status = elem.compute_troubled_cell_decision().unwrap();
    assert!(!status.troubled);
    elem.commit_step(&status).unwrap();

    // Triple the amplitude in one step.
    let grown = Variables::from_fields(&[&nodal(6, |x| 3.0 * x)[..]]);
    elem.set_variables(grown).unwrap();
    let status = elem.compute_troubled_cell_decision().unwrap();
    assert!(status.troubled);
    assert_eq!(status.trigger, Some(TciTrigger::Rdmp { field: 0 }));
}

#[test]
fn rdmp_window_forgets_after_two_steps() {
    let mut data = RdmpTciData::new(vec![FieldBounds { min: -1.0, max: 1.0 }]);
    // Two quiet updates roll the seed out of the two-deep ring.
    data.update(vec![FieldBounds { min: -0.1, max: 0.1 }]);
    data.update(vec![FieldBounds { min: -0.1, max: 0.1 }]);

    // Bounds that were fine against the seed now fail.
    assert!(!data.check(&[FieldBounds { min: -0.9, max: 0.9 }], 1e-7, 1e-3));
    assert!(data.check(&[FieldBounds { min: -0.1, max: 0.1 }], 1e-7, 1e-3));
}

#[test]
fn hysteresis_counterexample_blocks_early_switch_back() {
    let hysteresis = 3;
    let options = SubcellOptions {
        hysteresis_steps: hysteresis,
        recheck_after_reconstruction: false,
        ..SubcellOptions::default()
    };

    // Start troubled, switch to subcell.
    let mut elem = element(nodal(6, |x| if x < 0.0 { 0.0 } else { 1.0 }), options);
    let status = elem.compute_troubled_cell_decision().unwrap();
    elem.commit_step(&status).unwrap();
    assert_eq!(elem.active_grid(), ActiveGrid::Subcell);

    let smooth = Variables::from_fields(&[&vec![0.5; elem.mesh().num_subcells()][..]]);
    elem.set_variables(smooth).unwrap();

    // hysteresis - 1 clean steps: must stay on subcell.
    for _ in 0..(hysteresis - 1) {
        let status = elem.compute_troubled_cell_decision().unwrap();
        assert!(!status.troubled);
        assert_eq!(elem.commit_step(&status).unwrap(), GridTransition::Stay);
        assert_eq!(elem.active_grid(), ActiveGrid::Subcell);
    }

    // A troubled step resets the streak: inject an RDMP violation.
    let spike = Variables::from_fields(&[&vec![50.0; elem.mesh().num_subcells()][..]]);
    elem.set_variables(spike).unwrap();
    let status = elem.compute_troubled_cell_decision().unwrap();
    assert!(status.troubled);
    assert_eq!(elem.commit_step(&status).unwrap(), GridTransition::Stay);
    assert_eq!(elem.active_grid(), ActiveGrid::Subcell);

    // Even after hysteresis - 1 further clean steps the element must NOT
    // have switched back.
    let calm = Variables::from_fields(&[&vec![50.0; elem.mesh().num_subcells()][..]]);
    elem.set_variables(calm).unwrap();
    for _ in 0..(hysteresis - 1) {
        let status = elem.compute_troubled_cell_decision().unwrap();
        assert!(!status.troubled);
        elem.commit_step(&status).unwrap();
        assert_eq!(elem.active_grid(), ActiveGrid::Subcell);
    }

    // One more clean step completes the window.
    let status = elem.compute_troubled_cell_decision().unwrap();
    assert_eq!(
        elem.commit_step(&status).unwrap(),
        GridTransition::SubcellToDg
    );
    assert_eq!(elem.active_grid(), ActiveGrid::Dg);
}

#[test]
fn non_finite_input_is_conservatively_troubled() {
    for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let mut field = nodal(6, |x| x);
        field[2] = bad;
        let elem = element(field, SubcellOptions::default());
        let status = elem.compute_troubled_cell_decision().unwrap();
        assert!(status.troubled, "{} must force troubled", bad);
        assert!(matches!(
            status.trigger,
            Some(TciTrigger::NonFinite { field: 0 })
        ));
    }
}
