use aerograd_core::{
    AdjointSolver, Functional, OperatingPoint, Scalar, Sensitivity, SolveError,
    tape::{Tape, Var},
};
use ndarray::Array1;

use crate::{
    LatticeConfig,
    lattice::{Inputs, Lattice, control_deflections},
    mesh::Mesh,
    vector::Vec3,
};

/// The vortex-lattice solver on taped values.
///
/// Every call records one solve on a fresh [`Tape`] and back-propagates the
/// requested weighted functional, so a single sweep yields the sensitivity to
/// every node coordinate, every standard input, and every control deflection.
#[derive(Debug, Clone)]
pub struct AdjointVlm {
    mesh: Mesh,
    config: LatticeConfig,
}

/// Independent variables registered on a tape for one adjoint solve.
struct Independents<'t> {
    nodes: Vec<Vec3<Var<'t>>>,
    inputs: Inputs<Var<'t>>,
}

impl AdjointVlm {
    #[must_use]
    pub fn new(mesh: Mesh, config: LatticeConfig) -> Self {
        Self { mesh, config }
    }

    #[must_use]
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    fn register<'t>(
        &self,
        tape: &'t Tape,
        point: &OperatingPoint,
    ) -> Result<Independents<'t>, SolveError> {
        let controls = control_deflections(point, &self.mesh)?;
        let nodes = self
            .mesh
            .nodes()
            .iter()
            .map(|&node| node.map(|c| tape.var(c)))
            .collect();
        let inputs = Inputs::from_parts(
            point.standard_inputs().map(|v| tape.var(v)),
            controls.into_iter().map(|d| tape.var(d)).collect(),
        );
        Ok(Independents { nodes, inputs })
    }

    fn check_weights(&self, functional: &Functional, weights: &[f64]) -> Result<(), SolveError> {
        let expected = self.mesh.functional_length(functional)?;
        if weights.len() == expected {
            Ok(())
        } else {
            Err(SolveError::SizeMismatch {
                what: "functional weights",
                expected,
                actual: weights.len(),
            })
        }
    }

    fn validate(&self) -> Result<(), SolveError> {
        self.config
            .validate()
            .map_err(|reason| SolveError::InvalidInput(reason.into()))
    }
}

impl AdjointSolver for AdjointVlm {
    fn update_geometry(&mut self, xyz: &[f64]) -> Result<(), SolveError> {
        self.mesh.set_coordinates(xyz)
    }

    fn sensitivities(
        &mut self,
        point: &OperatingPoint,
        functional: &Functional,
        weights: &[f64],
    ) -> Result<Sensitivity, SolveError> {
        self.validate()?;
        self.check_weights(functional, weights)?;

        let tape = Tape::new();
        let independents = self.register(&tape, point)?;
        let lattice = Lattice::new(&self.mesh, &self.config, &independents.nodes)?;
        let solution = lattice.solve(&independents.inputs)?;
        let outputs = solution.loads.evaluate(functional)?;

        let value = outputs
            .iter()
            .zip(weights)
            .map(|(output, w)| output.value() * w)
            .sum();
        let gradient = tape.gradient_seeded(outputs.iter().copied().zip(weights.iter().copied()));

        let inputs = &independents.inputs;
        let standard = [
            inputs.alpha,
            inputs.beta,
            inputs.mach,
            inputs.vinf,
            inputs.density,
            inputs.recref,
            inputs.roll_rate,
            inputs.pitch_rate,
            inputs.yaw_rate,
        ];
        let sensitivity = Sensitivity {
            value,
            mesh: independents
                .nodes
                .iter()
                .map(|node| node.map(|c| gradient.wrt(c)))
                .collect(),
            inputs: standard.map(|v| gradient.wrt(v)),
            controls: inputs.controls.iter().map(|&d| gradient.wrt(d)).collect(),
        };

        log::debug!(
            "adjoint lattice solve: {} recorded operations, {} = {:.6}",
            tape.len(),
            functional.kind,
            value,
        );
        Ok(sensitivity)
    }

    fn circulation_rhs(
        &mut self,
        point: &OperatingPoint,
        functional: &Functional,
        weights: &[f64],
    ) -> Result<Vec<f64>, SolveError> {
        self.validate()?;
        self.check_weights(functional, weights)?;

        let circulation = {
            let inputs = Inputs::<f64>::constant(point, &self.mesh)?;
            Lattice::on_mesh(&self.mesh, &self.config)
                .solve(&inputs)?
                .circulation
        };

        // Geometry and inputs are constants here; only the circulation is taped.
        let tape = Tape::new();
        let lattice = Lattice::<Var<'_>>::on_mesh(&self.mesh, &self.config);
        let inputs = Inputs::constant(point, &self.mesh)?;
        let system = lattice.assemble(&inputs)?;
        let gamma: Vec<Var<'_>> = circulation.iter().map(|&g| tape.var(g)).collect();
        let solution = lattice.evaluate(&inputs, system, gamma.clone(), &gamma);

        let outputs = solution.loads.evaluate(functional)?;
        let gradient = tape.gradient_seeded(outputs.iter().copied().zip(weights.iter().copied()));
        Ok(gamma.iter().map(|&g| gradient.wrt(g)).collect())
    }

    fn transpose_product(
        &mut self,
        point: &OperatingPoint,
        v: &[f64],
    ) -> Result<Vec<f64>, SolveError> {
        self.validate()?;
        let inputs = Inputs::<f64>::constant(point, &self.mesh)?;
        let system = Lattice::on_mesh(&self.mesh, &self.config).assemble(&inputs)?;
        if v.len() != system.matrix.nrows() {
            return Err(SolveError::SizeMismatch {
                what: "transpose-product operand",
                expected: system.matrix.nrows(),
                actual: v.len(),
            });
        }
        Ok(system.matrix.t().dot(&Array1::from(v.to_vec())).to_vec())
    }

    fn pressure_sensitivities(
        &mut self,
        point: &OperatingPoint,
        weights: &[f64],
    ) -> Result<Vec<[f64; 3]>, SolveError> {
        self.validate()?;
        if weights.len() != self.mesh.node_count() {
            return Err(SolveError::SizeMismatch {
                what: "pressure weights",
                expected: self.mesh.node_count(),
                actual: weights.len(),
            });
        }

        let tape = Tape::new();
        let independents = self.register(&tape, point)?;
        let lattice = Lattice::new(&self.mesh, &self.config, &independents.nodes)?;
        let solution = lattice.solve(&independents.inputs)?;
        let gradient = tape.gradient_seeded(
            solution
                .nodal_pressures
                .iter()
                .copied()
                .zip(weights.iter().copied()),
        );

        Ok(independents
            .nodes
            .iter()
            .map(|node| node.map(|c| gradient.wrt(c)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use aerograd_core::{Coefficient, FlowSolver, FunctionKind, InputVariable};
    use approx::assert_relative_eq;

    use crate::{ControlGroup, ForwardVlm, PlanarWing, Reference, solver_pair};

    fn pair() -> (ForwardVlm, AdjointVlm) {
        let mut mesh = Mesh::from_wing(&PlanarWing {
            span: 6.0,
            root_chord: 1.2,
            tip_chord: 0.8,
            sweep: 0.1,
            chordwise: 2,
            spanwise: 6,
            ..PlanarWing::default()
        })
        .expect("valid wing");
        // Trailing-edge panels of the starboard half act as an aileron.
        let panels = (3..6).map(|j| mesh.patches()[0].panel(1, j)).collect();
        mesh.add_control_group(ControlGroup::new("aileron", panels, [0.0, 1.0, 0.0]))
            .expect("valid group");

        let config = LatticeConfig {
            reference: Reference {
                sref: 6.0,
                cref: 1.0,
                bref: 6.0,
                cg: [0.3, 0.0, 0.0],
            },
            ..LatticeConfig::default()
        };
        solver_pair(mesh, config)
    }

    fn point() -> OperatingPoint {
        OperatingPoint {
            mach: 0.3,
            alpha: 3.0_f64.to_radians(),
            beta: 1.0_f64.to_radians(),
            recref: 2e6,
            roll_rate: 0.01,
            controls: vec![0.05],
            ..OperatingPoint::default()
        }
    }

    fn central<F: FnMut(f64) -> f64>(mut f: F, h: f64) -> f64 {
        (f(h) - f(-h)) / (2.0 * h)
    }

    #[test]
    fn input_sensitivities_match_finite_differences() {
        let (mut forward, mut adjoint) = pair();
        let base = point();

        for coefficient in [Coefficient::Cl, Coefficient::Cd, Coefficient::Cmx] {
            let functional = Functional::new(FunctionKind::from(coefficient));
            let exact = adjoint
                .sensitivities(&base, &functional, &[1.0])
                .expect("adjoint");

            for variable in [
                InputVariable::Alpha,
                InputVariable::Beta,
                InputVariable::Mach,
                InputVariable::ReCref,
                InputVariable::RollRate,
                InputVariable::Control(0),
            ] {
                let h = if variable == InputVariable::ReCref { 1e2 } else { 1e-6 };
                let fd = central(
                    |delta| {
                        let p = base.perturbed(variable, delta).expect("known input");
                        forward.solve(&p).expect("solve").coefficients.get(coefficient)
                    },
                    h,
                );
                let ad = exact.input(variable).expect("known input");
                assert_relative_eq!(ad, fd, epsilon = 1e-7, max_relative = 1e-5);
            }
        }
    }

    #[test]
    fn mesh_sensitivities_match_finite_differences() {
        let (mut forward, mut adjoint) = pair();
        let base = point();
        let functional = Functional::new(FunctionKind::Cl);
        let exact = adjoint
            .sensitivities(&base, &functional, &[1.0])
            .expect("adjoint");
        let xyz = forward.mesh().coordinates();

        for (node, axis) in [(0, 2), (8, 2), (10, 0), (20, 1)] {
            let fd = central(
                |delta| {
                    let mut moved = xyz.clone();
                    moved[3 * node + axis] += delta;
                    forward.update_geometry(&moved).expect("update");
                    forward.solve(&base).expect("solve").coefficients.cl
                },
                1e-6,
            );
            assert_relative_eq!(exact.mesh[node][axis], fd, epsilon = 1e-7, max_relative = 1e-5);
        }
    }

    #[test]
    fn vector_functionals_are_weighted() {
        let (mut forward, mut adjoint) = pair();
        let functional = Functional::new(FunctionKind::WingLoad).with_wing(1);
        let weights = [0.0, 1.0, 0.0, 0.0, 2.0, 0.0];

        let exact = adjoint
            .sensitivities(&point(), &functional, &weights)
            .expect("adjoint");
        let loads = forward.solve(&point()).expect("solve");
        let span = &loads.wings[0].cl_c;
        assert_relative_eq!(exact.value, span[1] + 2.0 * span[4], max_relative = 1e-12);

        let err = adjoint.sensitivities(&point(), &functional, &[1.0]);
        assert!(matches!(err, Err(SolveError::SizeMismatch { .. })));
    }

    #[test]
    fn circulation_rhs_of_the_residual_is_the_transpose_product() {
        let (_, mut adjoint) = pair();
        let n = adjoint.mesh().panel_count();
        let weights: Vec<f64> = (0..n).map(|i| 1.0 + i as f64).collect();

        let rhs = adjoint
            .circulation_rhs(&point(), &FunctionKind::Residual.into(), &weights)
            .expect("rhs");
        let product = adjoint
            .transpose_product(&point(), &weights)
            .expect("product");

        for (r, p) in rhs.iter().zip(&product) {
            assert_relative_eq!(*r, *p, max_relative = 1e-12);
        }
    }

    #[test]
    fn pressure_sensitivities_match_finite_differences() {
        let (mut forward, mut adjoint) = pair();
        let base = point();
        let nodes = forward.node_count();
        let weights: Vec<f64> = (0..nodes).map(|i| (i % 3) as f64).collect();

        let exact = adjoint
            .pressure_sensitivities(&base, &weights)
            .expect("adjoint");
        let xyz = forward.mesh().coordinates();

        let node = 9;
        let fd = central(
            |delta| {
                let mut moved = xyz.clone();
                moved[3 * node + 2] += delta;
                forward.update_geometry(&moved).expect("update");
                forward.solve(&base).expect("solve");
                forward
                    .nodal_pressures()
                    .expect("pressures")
                    .iter()
                    .zip(&weights)
                    .map(|(p, w)| p * w)
                    .sum()
            },
            1e-6,
        );
        assert_relative_eq!(exact[node][2], fd, epsilon = 1e-6, max_relative = 1e-5);
    }
}
