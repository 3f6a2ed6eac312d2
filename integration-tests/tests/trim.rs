use aerograd_core::FunctionKind;
use aerograd_opt::{
    Axis, Error, IndexBase, ObjectiveSpec, OptimizerConfig, SessionConfig, SweepConfig, TrimConfig,
    vlm_session,
};
use approx::assert_relative_eq;
use integration_tests::{cruise, flat_wing, lattice};

fn trim_session(trim: TrimConfig) -> aerograd_opt::VlmOptimizer {
    let config = SessionConfig {
        lattice: lattice(),
        optimizer: OptimizerConfig {
            case: cruise(),
            objectives: vec![
                ObjectiveSpec::new(FunctionKind::CdClCm),
                ObjectiveSpec::new(FunctionKind::Cl),
                ObjectiveSpec::new(FunctionKind::Cmy),
            ],
            trim,
            sweep: SweepConfig {
                axes: vec![Axis::Alpha],
                ..SweepConfig::default()
            },
            ..OptimizerConfig::default()
        },
    };
    vlm_session(flat_wing(), &config).expect("valid session")
}

#[test]
fn trims_to_target_lift() {
    let trim = TrimConfig {
        target_cl: 0.5,
        cl_tol: 1e-6,
        ..TrimConfig::default()
    };
    let mut optimizer = trim_session(trim);

    optimizer.solve().expect("trims and solves");
    let query = optimizer.query(IndexBase::One);
    let cl = query.function_value_for(2).expect("solved");
    let cmy = query.function_value_for(3).expect("solved");
    assert_relative_eq!(cl, 0.5, epsilon = 1e-6);

    // At the trimmed angle the combined objective is CD plus the moment penalty.
    let objective = query.function_value().expect("solved");
    let cd = objective - cmy * cmy - (cl - 0.5) * (cl - 0.5);
    assert!(cd > 0.0);
    assert!(query.gradient_z(1, 1).is_ok());

    optimizer.sweep().expect("sweep trims each case");
    let sweep = optimizer.sweep_results();
    let coefficients = sweep.coefficients_for_case(1).expect("one case");
    assert_relative_eq!(coefficients.cl, 0.5, epsilon = 1e-6);
    assert_relative_eq!(
        sweep.optimization_function_for_case(1).expect("one case"),
        objective,
        max_relative = 1e-8
    );
    assert!(sweep.baseline_for_case(1).expect("one case").alpha > 0.0);
}

#[test]
fn exhausted_trim_is_a_recoverable_failure() {
    let mut optimizer = trim_session(TrimConfig {
        max_iters: 3,
        cl_tol: 1e-10,
        ..TrimConfig::default()
    });

    let err = optimizer.solve_forward().expect_err("three bisection steps");
    assert!(matches!(err, Error::ConvergenceFailure(_)));
    assert!(err.is_recoverable());
    assert!(matches!(
        optimizer.query(IndexBase::One).function_value(),
        Err(Error::PrecursorMissing { .. })
    ));
}

#[test]
fn failed_trim_keeps_earlier_values() {
    let mut optimizer = trim_session(TrimConfig::default());
    optimizer.solve().expect("trims");
    let before = optimizer.objective(2).expect("lift objective").function();

    let mut supersonic = cruise();
    supersonic.mach = 1.2;
    optimizer.set_operating_point(supersonic).expect("no controls");
    let err = optimizer.solve_forward().expect_err("supersonic");
    assert!(matches!(err, Error::NumericalSingularity(_)));
    assert!(!err.is_recoverable());

    assert_relative_eq!(optimizer.objective(2).expect("lift objective").function(), before);
    assert!(matches!(
        optimizer.query(IndexBase::One).function_value(),
        Err(Error::PrecursorMissing { .. })
    ));

    optimizer.set_operating_point(cruise()).expect("no controls");
    optimizer.solve_forward().expect("trims again");
    let after = optimizer.query(IndexBase::One).function_value_for(2).expect("solved");
    assert_relative_eq!(after, before, max_relative = 1e-12);
}
