use aerograd_core::{Coefficient, FunctionKind};
use aerograd_opt::{
    Axis, Case, CaseList, Differencing, Error, ObjectiveSpec, OptimizerConfig, SessionConfig,
    SweepConfig, SweepLists, vlm_session,
};
use approx::assert_relative_eq;
use integration_tests::{cruise, flat_wing, lattice};
use uom::si::{angle::degree, f64::Angle};

fn sweep_session(sweep: SweepConfig, cases: CaseList) -> aerograd_opt::VlmOptimizer {
    let config = SessionConfig {
        lattice: lattice(),
        optimizer: OptimizerConfig {
            case: cruise(),
            objectives: vec![ObjectiveSpec::new(FunctionKind::Cl)],
            sweep,
            cases,
            ..OptimizerConfig::default()
        },
    };
    vlm_session(flat_wing(), &config).expect("valid session")
}

fn alpha_cases(alphas: &[f64]) -> CaseList {
    let lists = SweepLists {
        alphas: alphas.iter().copied().map(Angle::new::<degree>).collect(),
        ..SweepLists::default()
    };
    CaseList::from_sweep(&lists, &cruise(), 10).expect("within capacity")
}

#[test]
fn finite_differences_converge_to_the_adjoint() {
    let mut errors = Vec::new();
    for step in [2.0, 0.5, 0.125] {
        let mut optimizer = sweep_session(
            SweepConfig {
                delta_alpha: Angle::new::<degree>(step),
                axes: vec![Axis::Alpha, Axis::Beta],
                adjoint: true,
                ..SweepConfig::default()
            },
            alpha_cases(&[2.0, 6.0]),
        );
        optimizer.sweep().expect("sweep runs");
        let sweep = optimizer.sweep_results();

        let mut worst: f64 = 0.0;
        for case in 1..=2 {
            for coefficient in [Coefficient::Cl, Coefficient::Cd] {
                let fd = sweep.derivative(case, Axis::Alpha, coefficient).expect("swept");
                let exact = sweep
                    .adjoint_derivative(case, Axis::Alpha, coefficient)
                    .expect("paired");
                worst = worst.max((fd - exact).abs());
            }
        }
        errors.push(worst);

        let cl_alpha = sweep.adjoint_derivative(1, Axis::Alpha, Coefficient::Cl).expect("paired");
        assert!(cl_alpha > 4.0 && cl_alpha < 2.0 * std::f64::consts::PI);
    }

    assert!(errors[1] < errors[0]);
    assert!(errors[2] < errors[1]);
    // One-sided differences are first order in the step.
    assert!(errors[2] < errors[0] / 8.0);
}

#[test]
fn sweep_tables_follow_case_order() {
    let mut optimizer = sweep_session(
        SweepConfig {
            axes: vec![Axis::Alpha, Axis::Q],
            differencing: Differencing::Central,
            ..SweepConfig::default()
        },
        alpha_cases(&[0.0, 3.0, 6.0]),
    );
    optimizer.sweep().expect("sweep runs");
    let sweep = optimizer.sweep_results();

    assert_eq!(sweep.swept_cases(), 3);
    let lift: Vec<f64> = (1..=3)
        .map(|case| sweep.optimization_function_for_case(case).expect("swept"))
        .collect();
    assert_relative_eq!(lift[0], 0.0, epsilon = 1e-10);
    assert!(lift[1] > 0.0 && lift[2] > lift[1]);
    for (case, cl) in lift.iter().enumerate() {
        let coefficients = sweep.coefficients_for_case(case + 1).expect("swept");
        assert_relative_eq!(coefficients.cl, *cl);
        assert_relative_eq!(coefficients.cdt, coefficients.cd + coefficients.cdo);
    }

    // Pitch damping: a nose-up rate raises the local incidence aft of the
    // moment reference.
    let cm_q = sweep.derivative(2, Axis::Q, Coefficient::Cmy).expect("swept");
    assert!(cm_q < 0.0);
    assert!(sweep.optimization_function_for_case(4).is_err());
}

#[test]
fn case_capacity_is_enforced_without_side_effects() {
    let mut optimizer = sweep_session(SweepConfig::default(), CaseList::with_capacity(2));

    assert_eq!(optimizer.push_case(cruise()), Ok(1));
    assert_eq!(
        optimizer.push_case(Case::new(0.2, Angle::new::<degree>(4.0), Angle::new::<degree>(0.0))),
        Ok(2)
    );
    let err = optimizer.push_case(Case::new(
        0.5,
        Angle::new::<degree>(8.0),
        Angle::new::<degree>(0.0),
    ));
    assert_eq!(err, Err(Error::CapacityExceeded { capacity: 2 }));

    let cases = optimizer.sweep_results().cases();
    assert_eq!(cases.len(), 2);
    assert_relative_eq!(cases.get(2).expect("second case").mach, 0.2);
    assert!(cases.get(3).is_err());
}

#[test]
fn zero_delta_fails_before_solving() {
    let mut optimizer = sweep_session(
        SweepConfig {
            delta_beta: Angle::new::<degree>(0.0),
            ..SweepConfig::default()
        },
        alpha_cases(&[2.0]),
    );

    let err = optimizer.sweep().expect_err("zero beta step");
    assert!(matches!(err, Error::InvalidConfiguration(_)));
    assert_eq!(optimizer.sweep_results().swept_cases(), 0);
}

#[test]
fn session_from_toml_runs_a_paired_sweep() {
    let text = r#"
        index_base = "zero"

        [lattice.reference]
        sref = 8.0
        cref = 1.0
        bref = 8.0
        cg = [0.25, 0.0, 0.0]

        [freestream]
        mach = 0.3
        alpha = 2.0

        [[objectives]]
        kind = "cl"

        [sweep]
        alphas = [1.0, 3.0]
        axes = ["alpha", "p"]
        differencing = "central"
        delta_alpha = 0.01
        adjoint = true
    "#;
    let config = SessionConfig::from_toml_str(text).expect("valid session");
    let mut optimizer = vlm_session(flat_wing(), &config).expect("valid session");

    optimizer.sweep().expect("sweep runs");
    let sweep = optimizer.sweep_results();
    assert_eq!(sweep.swept_cases(), 2);
    for case in 1..=2 {
        for axis in [Axis::Alpha, Axis::P] {
            for coefficient in [Coefficient::Cl, Coefficient::Cmx] {
                assert_relative_eq!(
                    sweep.derivative(case, axis, coefficient).expect("swept"),
                    sweep.adjoint_derivative(case, axis, coefficient).expect("paired"),
                    max_relative = 1e-5,
                    epsilon = 1e-8
                );
            }
        }
    }
}
