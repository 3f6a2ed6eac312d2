use aerograd_core::{FlowSolver, Functional, Loads, OperatingPoint, SolveError};
use ndarray::{Array1, Array2};

use crate::{
    LatticeConfig,
    lattice::{Inputs, Lattice},
    mesh::Mesh,
};

/// What the most recent successful solve leaves behind.
#[derive(Debug, Clone)]
struct ForwardState {
    matrix: Array2<f64>,
    rhs: Vec<f64>,
    nodal_pressures: Vec<f64>,
}

/// The vortex-lattice solver on plain `f64` values.
#[derive(Debug, Clone)]
pub struct ForwardVlm {
    mesh: Mesh,
    config: LatticeConfig,
    state: Option<ForwardState>,
}

impl ForwardVlm {
    #[must_use]
    pub fn new(mesh: Mesh, config: LatticeConfig) -> Self {
        Self {
            mesh,
            config,
            state: None,
        }
    }

    #[must_use]
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    #[must_use]
    pub fn config(&self) -> &LatticeConfig {
        &self.config
    }
}

impl FlowSolver for ForwardVlm {
    fn node_count(&self) -> usize {
        self.mesh.node_count()
    }

    fn unknown_count(&self) -> usize {
        self.mesh.panel_count()
    }

    fn wing_count(&self) -> usize {
        self.mesh.patches().len()
    }

    fn rotor_count(&self) -> usize {
        0
    }

    fn control_group_count(&self) -> usize {
        self.mesh.control_groups().len()
    }

    fn node(&self, index: usize) -> Option<[f64; 3]> {
        self.mesh.nodes().get(index).copied()
    }

    fn functional_length(&self, functional: &Functional) -> Result<usize, SolveError> {
        Ok(self.mesh.functional_length(functional)?)
    }

    fn update_geometry(&mut self, xyz: &[f64]) -> Result<(), SolveError> {
        self.mesh.set_coordinates(xyz)?;
        self.state = None;
        Ok(())
    }

    fn solve(&mut self, point: &OperatingPoint) -> Result<Loads<f64>, SolveError> {
        self.config
            .validate()
            .map_err(|reason| SolveError::InvalidInput(reason.into()))?;

        let inputs = Inputs::<f64>::constant(point, &self.mesh)?;
        let solution = Lattice::on_mesh(&self.mesh, &self.config).solve(&inputs)?;

        log::debug!(
            "forward lattice solve: {} panels, alpha {:.4} rad, CL {:.6}",
            self.mesh.panel_count(),
            point.alpha,
            solution.loads.coefficients.cl,
        );

        self.state = Some(ForwardState {
            matrix: solution.system.matrix,
            rhs: solution.system.rhs.to_vec(),
            nodal_pressures: solution.nodal_pressures,
        });
        Ok(solution.loads)
    }

    fn nodal_pressures(&self) -> Option<&[f64]> {
        self.state.as_ref().map(|s| s.nodal_pressures.as_slice())
    }

    fn matrix_vector_product(&self, v: &[f64]) -> Result<Vec<f64>, SolveError> {
        let state = self
            .state
            .as_ref()
            .ok_or(SolveError::NoSolution("matrix-vector product"))?;
        if v.len() != state.matrix.ncols() {
            return Err(SolveError::SizeMismatch {
                what: "matrix-vector operand",
                expected: state.matrix.ncols(),
                actual: v.len(),
            });
        }
        Ok(state.matrix.dot(&Array1::from(v.to_vec())).to_vec())
    }

    fn right_hand_side(&self) -> Option<&[f64]> {
        self.state.as_ref().map(|s| s.rhs.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    use crate::{PlanarWing, Reference};

    fn solver() -> ForwardVlm {
        let mesh = Mesh::from_wing(&PlanarWing {
            span: 6.0,
            chordwise: 2,
            spanwise: 6,
            ..PlanarWing::default()
        })
        .expect("valid wing");
        let config = LatticeConfig {
            reference: Reference {
                sref: 6.0,
                bref: 6.0,
                ..Reference::default()
            },
            ..LatticeConfig::default()
        };
        ForwardVlm::new(mesh, config)
    }

    fn cruise() -> OperatingPoint {
        OperatingPoint {
            mach: 0.3,
            alpha: 2.0_f64.to_radians(),
            ..OperatingPoint::default()
        }
    }

    #[test]
    fn repeated_solves_are_identical() {
        let mut vlm = solver();
        let first = vlm.solve(&cruise()).expect("solve");
        let second = vlm.solve(&cruise()).expect("solve");

        assert!(first.coefficients.cl > 0.0);
        assert_eq!(first, second);
    }

    #[test]
    fn system_is_exposed_after_a_solve() {
        let mut vlm = solver();
        let n = vlm.unknown_count();
        assert!(vlm.right_hand_side().is_none());
        assert!(matches!(
            vlm.matrix_vector_product(&vec![1.0; n]),
            Err(SolveError::NoSolution(_))
        ));

        vlm.solve(&cruise()).expect("solve");

        let rhs = vlm.right_hand_side().expect("rhs").to_vec();
        assert_eq!(rhs.len(), n);
        assert!(vlm.matrix_vector_product(&[1.0]).is_err());

        // The first column is A·e₀.
        let mut e0 = vec![0.0; n];
        e0[0] = 1.0;
        let column = vlm.matrix_vector_product(&e0).expect("product");
        assert!(column[0] < 0.0);

        assert_eq!(
            vlm.nodal_pressures().expect("pressures").len(),
            vlm.node_count()
        );
    }

    #[test]
    fn compressibility_raises_lift() {
        let mut vlm = solver();
        let low = vlm.solve(&OperatingPoint {
            mach: 0.0,
            ..cruise()
        });
        let high = vlm.solve(&OperatingPoint {
            mach: 0.6,
            ..cruise()
        });

        let ratio = high.expect("solve").coefficients.cl / low.expect("solve").coefficients.cl;
        assert_relative_eq!(ratio, 1.25, max_relative = 1e-12);
    }

    #[test]
    fn geometry_update_discards_the_solution() {
        let mut vlm = solver();
        vlm.solve(&cruise()).expect("solve");

        let mut xyz = vlm.mesh().coordinates();
        assert!(vlm.update_geometry(&xyz[..3]).is_err());
        assert!(vlm.right_hand_side().is_some());

        xyz[2] += 0.01;
        vlm.update_geometry(&xyz).expect("update");
        assert!(vlm.right_hand_side().is_none());
        assert_relative_eq!(vlm.node(0).expect("node")[2], 0.01);
    }

    #[test]
    fn failed_solve_keeps_the_previous_state() {
        let mut vlm = solver();
        vlm.solve(&cruise()).expect("solve");
        let rhs = vlm.right_hand_side().expect("rhs").to_vec();

        let err = vlm.solve(&OperatingPoint {
            mach: 1.1,
            ..cruise()
        });
        assert!(matches!(err, Err(SolveError::Singular(_))));
        assert_eq!(vlm.right_hand_side().expect("rhs"), rhs.as_slice());
    }
}
