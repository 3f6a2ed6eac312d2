use thiserror::Error;

use crate::{Functional, FunctionalError, InputVariable, Loads, OperatingPoint, STANDARD_INPUTS};

/// Failures reported by a forward or adjoint flow solver.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    /// A caller-supplied buffer disagrees with the expected length.
    #[error("{what}: expected {expected} values, got {actual}")]
    SizeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The operating point or geometry is invalid for this solver.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The discretized system is singular or the flow state is degenerate.
    #[error("singular system: {0}")]
    Singular(String),

    /// An iterative stage ran out of iterations before meeting its tolerance.
    #[error("not converged after {iterations} iterations (residual {residual:e})")]
    NotConverged { iterations: usize, residual: f64 },

    #[error(transparent)]
    Functional(#[from] FunctionalError),

    /// An operation needs a prior solve that has not happened.
    #[error("no solution available: {0}")]
    NoSolution(&'static str),
}

/// Sensitivity of one scalar functional to every input of a solve.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sensitivity {
    /// The functional value the sensitivities belong to.
    pub value: f64,
    /// `∂F/∂(x, y, z)` for every mesh node, zero-based node order.
    pub mesh: Vec<[f64; 3]>,
    /// `∂F/∂input` for the standard inputs, in [`InputVariable::STANDARD`] order.
    pub inputs: [f64; STANDARD_INPUTS],
    /// `∂F/∂δ` for every control-surface group.
    pub controls: Vec<f64>,
}

impl Sensitivity {
    /// A zero sensitivity sized for the given node and control counts.
    #[must_use]
    pub fn zeros(nodes: usize, controls: usize) -> Self {
        Self {
            value: 0.0,
            mesh: vec![[0.0; 3]; nodes],
            inputs: [0.0; STANDARD_INPUTS],
            controls: vec![0.0; controls],
        }
    }

    /// Sensitivity to one input, or `None` for an unknown control group.
    #[must_use]
    pub fn input(&self, variable: InputVariable) -> Option<f64> {
        match variable {
            InputVariable::Control(group) => self.controls.get(group).copied(),
            standard => standard.standard_index().map(|index| self.inputs[index]),
        }
    }

    /// Accumulates `weight · other` into `self`.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::SizeMismatch`] unless both sensitivities are sized
    /// for the same mesh and control groups; `self` is left unchanged.
    pub fn accumulate(&mut self, other: &Sensitivity, weight: f64) -> Result<(), SolveError> {
        if other.mesh.len() != self.mesh.len() {
            return Err(SolveError::SizeMismatch {
                what: "mesh sensitivities",
                expected: self.mesh.len(),
                actual: other.mesh.len(),
            });
        }
        if other.controls.len() != self.controls.len() {
            return Err(SolveError::SizeMismatch {
                what: "control sensitivities",
                expected: self.controls.len(),
                actual: other.controls.len(),
            });
        }

        self.value += weight * other.value;
        for (acc, node) in self.mesh.iter_mut().zip(&other.mesh) {
            for (a, n) in acc.iter_mut().zip(node) {
                *a += weight * n;
            }
        }
        for (acc, input) in self.inputs.iter_mut().zip(&other.inputs) {
            *acc += weight * input;
        }
        for (acc, control) in self.controls.iter_mut().zip(&other.controls) {
            *acc += weight * control;
        }
        Ok(())
    }
}

/// The forward flow solver, as seen by the optimizer.
///
/// Node indices are zero-based here; index conventions are applied at the
/// optimizer's query boundary.
pub trait FlowSolver {
    fn node_count(&self) -> usize;

    /// Number of unknowns of the discretized linear system.
    fn unknown_count(&self) -> usize;

    fn wing_count(&self) -> usize;

    fn rotor_count(&self) -> usize;

    fn control_group_count(&self) -> usize;

    /// Coordinates of one node, or `None` past the end.
    fn node(&self, index: usize) -> Option<[f64; 3]>;

    /// Number of values a functional produces on the current geometry.
    ///
    /// # Errors
    ///
    /// Returns an error if the functional references a missing component.
    fn functional_length(&self, functional: &Functional) -> Result<usize, SolveError>;

    /// Replaces all node coordinates from a flat `x, y, z` sequence.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::SizeMismatch`] unless `xyz.len() == 3 · nodes`.
    fn update_geometry(&mut self, xyz: &[f64]) -> Result<(), SolveError>;

    /// Solves the flow at `point` and returns every functional.
    ///
    /// # Errors
    ///
    /// Returns an error if the flow state is degenerate or the linear solve
    /// fails to converge; a failed solve leaves the previous solution intact.
    fn solve(&mut self, point: &OperatingPoint) -> Result<Loads<f64>, SolveError>;

    /// Pressure jump at every node from the most recent solve.
    fn nodal_pressures(&self) -> Option<&[f64]>;

    /// `A·v` for the operator of the most recent solve.
    ///
    /// # Errors
    ///
    /// Returns an error before any solve or when `v` has the wrong length.
    fn matrix_vector_product(&self, v: &[f64]) -> Result<Vec<f64>, SolveError>;

    /// Right-hand side of the most recent solve.
    fn right_hand_side(&self) -> Option<&[f64]>;
}

/// The adjoint flow solver, as seen by the optimizer.
///
/// Implementations differentiate through the same discretization the forward
/// solver uses. Each call is self-contained: it takes the operating point
/// explicitly and holds no state from previous calls besides geometry.
pub trait AdjointSolver {
    /// Replaces all node coordinates from a flat `x, y, z` sequence.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::SizeMismatch`] unless `xyz.len() == 3 · nodes`.
    fn update_geometry(&mut self, xyz: &[f64]) -> Result<(), SolveError>;

    /// Sensitivity of `Σ wᵢ·Fᵢ` to every node coordinate and input.
    ///
    /// # Errors
    ///
    /// Returns an error if the solve fails or `weights` does not match the
    /// functional's length.
    fn sensitivities(
        &mut self,
        point: &OperatingPoint,
        functional: &Functional,
        weights: &[f64],
    ) -> Result<Sensitivity, SolveError>;

    /// `∂(Σ wᵢ·Fᵢ)/∂Γ` at the converged circulation: the adjoint right-hand side.
    ///
    /// # Errors
    ///
    /// Returns an error if the solve fails or `weights` has the wrong length.
    fn circulation_rhs(
        &mut self,
        point: &OperatingPoint,
        functional: &Functional,
        weights: &[f64],
    ) -> Result<Vec<f64>, SolveError>;

    /// `Aᵀ·v` for the operator at `point`.
    ///
    /// # Errors
    ///
    /// Returns an error if assembly fails or `v` has the wrong length.
    fn transpose_product(
        &mut self,
        point: &OperatingPoint,
        v: &[f64],
    ) -> Result<Vec<f64>, SolveError>;

    /// Mesh sensitivity of `Σ wᵢ·pᵢ` over nodal pressures.
    ///
    /// # Errors
    ///
    /// Returns an error if the solve fails or `weights` is not one per node.
    fn pressure_sensitivities(
        &mut self,
        point: &OperatingPoint,
        weights: &[f64],
    ) -> Result<Vec<[f64; 3]>, SolveError>;
}
