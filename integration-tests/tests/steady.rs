use aerograd_core::{FlowSolver, FunctionKind, InputVariable};
use aerograd_opt::{Error, IndexBase, ObjectiveSpec};
use approx::assert_relative_eq;
use integration_tests::{flat_wing, session};

#[test]
fn flat_wing_lift_and_trailing_edge_sensitivity() {
    let mut optimizer = session(vec![ObjectiveSpec::new(FunctionKind::Cl)]);

    optimizer.solve_forward().expect("forward solve");
    let cl = optimizer.query(IndexBase::One).function_value().expect("solved");
    assert!(cl > 0.0, "CL = {cl}");

    optimizer.solve_adjoint().expect("adjoint solve");
    let trailing_edge = flat_wing().trailing_edge_nodes();
    let query = optimizer.query(IndexBase::Zero);
    let adjoint: f64 = trailing_edge
        .iter()
        .map(|&node| query.gradient_z(1, node).expect("node exists"))
        .sum();
    assert!(adjoint.abs() > 1e-6);

    // Move every trailing-edge node together and difference the lift.
    let base = optimizer.forward().mesh().coordinates();
    let mut lift_with_offset = |dz: f64| {
        let mut xyz = base.clone();
        for &node in &trailing_edge {
            xyz[3 * node + 2] += dz;
        }
        optimizer.update_geometry(&xyz).expect("same node count");
        optimizer.solve_forward().expect("forward solve");
        optimizer.query(IndexBase::One).function_value().expect("solved")
    };
    let h = 1e-6;
    let fd = (lift_with_offset(h) - lift_with_offset(-h)) / (2.0 * h);

    assert_eq!(fd.signum(), adjoint.signum());
    assert_relative_eq!(adjoint, fd, max_relative = 1e-4);
}

#[test]
fn repeated_solves_are_identical() {
    let mut optimizer = session(vec![
        ObjectiveSpec::new(FunctionKind::Cd),
        ObjectiveSpec::new(FunctionKind::WingLoad).with_wing(1),
    ]);

    optimizer.solve().expect("first solve");
    let first_values = optimizer
        .query(IndexBase::One)
        .function_vector(2)
        .expect("solved")
        .to_vec();
    let first_gradients = optimizer
        .query(IndexBase::One)
        .function_gradients(1)
        .expect("solved");

    optimizer.solve().expect("second solve");
    let query = optimizer.query(IndexBase::One);
    assert_eq!(query.function_vector(2).expect("solved"), first_values.as_slice());
    assert_eq!(query.function_gradients(1).expect("solved"), first_gradients);
}

#[test]
fn index_bases_address_the_same_nodes() {
    let mut optimizer = session(vec![ObjectiveSpec::new(FunctionKind::Cmy)]);
    optimizer.solve().expect("solves");

    let zero = optimizer.query(IndexBase::Zero);
    let one = optimizer.query(IndexBase::One);
    let n = zero.node_count();

    for node in 0..n {
        assert_eq!(zero.node(node), one.node(node + 1));
        assert_eq!(zero.gradient_x(1, node), one.gradient_x(1, node + 1));
        assert_eq!(zero.nodal_pressure(node), one.nodal_pressure(node + 1));
    }
    assert_eq!(zero.coordinate(3 * n - 1), one.coordinate(3 * n));
    assert_eq!(zero.node_y(4), one.node_y(5));

    assert!(matches!(
        zero.gradient_z(1, n),
        Err(Error::IndexOutOfRange { .. })
    ));
    assert!(matches!(
        one.gradient_z(1, 0),
        Err(Error::IndexOutOfRange { .. })
    ));
    assert!(one.gradient_z(1, n).is_ok());
    assert!(one.gradient_z(2, 1).is_err());

    let flat = zero.function_gradients(1).expect("solved");
    assert_eq!(flat.len(), 3 * n);
    assert_eq!(flat[3 * 2 + 1], zero.gradient_y(1, 2).expect("node 2"));
}

#[test]
fn geometry_changes_make_results_stale() {
    let mut optimizer = session(vec![ObjectiveSpec::new(FunctionKind::Cl)]);
    optimizer.solve().expect("solves");
    let xyz = optimizer.forward().mesh().coordinates();

    let err = optimizer
        .update_geometry(&xyz[..xyz.len() - 1])
        .expect_err("one coordinate short");
    assert!(matches!(err, Error::SizeMismatch { .. }));
    assert!(optimizer.query(IndexBase::One).gradient_z(1, 1).is_ok());

    optimizer.update_geometry(&xyz).expect("same node count");
    let query = optimizer.query(IndexBase::One);
    assert!(matches!(
        query.function_value(),
        Err(Error::PrecursorMissing { .. })
    ));
    assert!(matches!(
        query.gradient_z(1, 1),
        Err(Error::PrecursorMissing { .. })
    ));
    assert!(matches!(
        optimizer.solve_adjoint(),
        Err(Error::PrecursorMissing { .. })
    ));
}

#[test]
fn input_gradients_match_finite_differences() {
    let mut optimizer = session(vec![ObjectiveSpec::new(FunctionKind::Cl)]);
    optimizer.solve().expect("solves");
    let exact = optimizer
        .query(IndexBase::One)
        .input_gradient(1, InputVariable::Alpha)
        .expect("solved");

    let mut lift_at = |alpha_deg: f64| {
        let mut case = integration_tests::cruise();
        case.alpha = uom::si::f64::Angle::new::<uom::si::angle::degree>(alpha_deg);
        optimizer.set_operating_point(case).expect("no controls");
        optimizer.solve_forward().expect("forward solve");
        optimizer.query(IndexBase::One).function_value().expect("solved")
    };
    let h = 1e-4;
    let fd = (lift_at(2.0 + h) - lift_at(2.0 - h)) / (2.0 * h.to_radians());

    assert_relative_eq!(exact, fd, max_relative = 1e-6);
    assert!(
        optimizer
            .query(IndexBase::One)
            .input_gradient(1, InputVariable::Control(0))
            .is_err()
    );
}

#[test]
fn linear_system_products_are_consistent() {
    let mut optimizer = session(vec![ObjectiveSpec::new(FunctionKind::Residual)]);
    assert!(matches!(
        optimizer.matrix_vector_product_and_rhs(&[]),
        Err(Error::PrecursorMissing { .. })
    ));

    optimizer.solve().expect("solves");
    let n = optimizer.forward().unknown_count();

    // The converged residual vanishes.
    let residual = optimizer
        .query(IndexBase::One)
        .function_vector(1)
        .expect("solved")
        .to_vec();
    assert_eq!(residual.len(), n);
    assert!(residual.iter().all(|r| r.abs() < 1e-8));

    let v: Vec<f64> = (0..n).map(|i| 1.0 + 0.1 * i as f64).collect();
    let (product, rhs) = optimizer.matrix_vector_product_and_rhs(&v).expect("solved");
    assert_eq!(product.len(), n);
    assert_eq!(rhs.len(), n);

    // With unit seeds, the adjoint right-hand side of the residual is Aᵀ·1.
    let ones = vec![1.0; n];
    let (transposed, adjoint_rhs) = optimizer
        .adjoint_matrix_vector_product_and_rhs(1, &ones)
        .expect("solved");
    for (t, r) in transposed.iter().zip(&adjoint_rhs) {
        assert_relative_eq!(*t, *r, max_relative = 1e-10, epsilon = 1e-12);
    }

    // vᵀ(A·1) = (Aᵀv)·1 links the two products.
    let (a_ones, _) = optimizer.matrix_vector_product_and_rhs(&ones).expect("solved");
    let (at_v, _) = optimizer
        .adjoint_matrix_vector_product_and_rhs(1, &v)
        .expect("solved");
    let left: f64 = v.iter().zip(&a_ones).map(|(a, b)| a * b).sum();
    let right: f64 = at_v.iter().sum();
    assert_relative_eq!(left, right, max_relative = 1e-10);

    assert!(matches!(
        optimizer.matrix_vector_product_and_rhs(&v[1..]),
        Err(Error::SizeMismatch { .. })
    ));
}

#[test]
fn pressure_functional_gradient_matches_finite_differences() {
    let mut optimizer = session(vec![ObjectiveSpec::new(FunctionKind::Cl)]);
    assert!(optimizer.pressure_functional_gradient(&[]).is_err());
    optimizer.solve_forward().expect("forward solve");

    let n = optimizer.forward().node_count();
    let weights: Vec<f64> = (0..n).map(|i| if i % 3 == 0 { 1.0 } else { 0.5 }).collect();
    let gradient = optimizer
        .pressure_functional_gradient(&weights)
        .expect("solved");
    assert_eq!(gradient.len(), n);
    assert!(optimizer.pressure_functional_gradient(&weights[1..]).is_err());

    let node = flat_wing().trailing_edge_nodes()[3];
    let base = optimizer.forward().mesh().coordinates();
    let mut weighted_pressure = |dz: f64| {
        let mut xyz = base.clone();
        xyz[3 * node + 2] += dz;
        optimizer.update_geometry(&xyz).expect("same node count");
        optimizer.solve_forward().expect("forward solve");
        optimizer
            .nodal_pressures()
            .expect("solved")
            .iter()
            .zip(&weights)
            .map(|(p, w)| p * w)
            .sum::<f64>()
    };
    let h = 1e-6;
    let fd = (weighted_pressure(h) - weighted_pressure(-h)) / (2.0 * h);

    assert_relative_eq!(gradient[node][2], fd, max_relative = 1e-4, epsilon = 1e-6);
}
