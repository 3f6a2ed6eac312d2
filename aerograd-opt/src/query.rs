//! Index conventions and the read-only query view of an optimizer.

use aerograd_core::{AdjointSolver, FlowSolver, InputVariable, Sensitivity};
use serde::Deserialize;

use crate::{Error, Optimizer};

/// Whether node and coordinate indices start at 0 or 1.
///
/// Objective and time-sample indices are always 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexBase {
    Zero,
    #[default]
    One,
}

impl IndexBase {
    /// The first valid index.
    #[must_use]
    pub fn first(self) -> usize {
        match self {
            Self::Zero => 0,
            Self::One => 1,
        }
    }

    /// Converts an index in this base to a zero-based position below `len`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if the index falls outside.
    pub fn position(self, what: &'static str, index: usize, len: usize) -> Result<usize, Error> {
        index
            .checked_sub(self.first())
            .filter(|&position| position < len)
            .ok_or(Error::IndexOutOfRange { what, index, len })
    }

    /// Converts a zero-based position to an index in this base.
    #[must_use]
    pub fn index(self, position: usize) -> usize {
        position + self.first()
    }
}

/// Read-only access to an optimizer's results with node indices resolved
/// in one [`IndexBase`].
#[derive(Debug)]
pub struct Query<'o, F, A> {
    optimizer: &'o Optimizer<F, A>,
    base: IndexBase,
}

impl<'o, F: FlowSolver, A: AdjointSolver> Query<'o, F, A> {
    pub(crate) fn new(optimizer: &'o Optimizer<F, A>, base: IndexBase) -> Self {
        Self { optimizer, base }
    }

    #[must_use]
    pub fn base(&self) -> IndexBase {
        self.base
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.optimizer.forward().node_count()
    }

    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] for an unknown node.
    pub fn node(&self, node: usize) -> Result<[f64; 3], Error> {
        let n = self.node_count();
        let position = self.base.position("node", node, n)?;
        self.optimizer
            .forward()
            .node(position)
            .ok_or(Error::IndexOutOfRange {
                what: "node",
                index: node,
                len: n,
            })
    }

    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] for an unknown node.
    pub fn node_x(&self, node: usize) -> Result<f64, Error> {
        self.node(node).map(|p| p[0])
    }

    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] for an unknown node.
    pub fn node_y(&self, node: usize) -> Result<f64, Error> {
        self.node(node).map(|p| p[1])
    }

    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] for an unknown node.
    pub fn node_z(&self, node: usize) -> Result<f64, Error> {
        self.node(node).map(|p| p[2])
    }

    /// Entry of the flat `x, y, z` coordinate array.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] past `3 · nodes`.
    pub fn coordinate(&self, index: usize) -> Result<f64, Error> {
        let position = self
            .base
            .position("coordinate", index, 3 * self.node_count())?;
        self.node(self.base.index(position / 3))
            .map(|p| p[position % 3])
    }

    /// The first value of the first objective.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PrecursorMissing`] without a current forward solve.
    pub fn function_value(&self) -> Result<f64, Error> {
        self.function_value_for(1)
    }

    /// The first value of an objective (1-based).
    ///
    /// # Errors
    ///
    /// Returns [`Error::PrecursorMissing`] without a current forward solve and
    /// [`Error::IndexOutOfRange`] for an unknown objective.
    pub fn function_value_for(&self, objective: usize) -> Result<f64, Error> {
        Ok(self.optimizer.current_values(objective)?.function())
    }

    /// Time-averaged first value of an objective (1-based).
    ///
    /// # Errors
    ///
    /// As [`Query::function_value_for`].
    pub fn function_average_for(&self, objective: usize) -> Result<f64, Error> {
        Ok(self.optimizer.current_values(objective)?.function_average())
    }

    /// Every value of an objective, time-major.
    ///
    /// # Errors
    ///
    /// As [`Query::function_value_for`].
    pub fn function_vector(&self, objective: usize) -> Result<&'o [f64], Error> {
        Ok(self.optimizer.current_values(objective)?.values())
    }

    /// The first value of an objective at one time sample, both 1-based.
    ///
    /// # Errors
    ///
    /// As [`Query::function_value_for`], plus [`Error::IndexOutOfRange`] for
    /// an unknown time sample.
    pub fn unsteady_function_value(&self, objective: usize, time: usize) -> Result<f64, Error> {
        Ok(self.optimizer.current_values(objective)?.sample(time)?[0])
    }

    /// `∂F/∂x` of the time-averaged objective at one node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PrecursorMissing`] without a current adjoint solve and
    /// [`Error::IndexOutOfRange`] for an unknown objective or node.
    pub fn gradient_x(&self, objective: usize, node: usize) -> Result<f64, Error> {
        self.mesh_component(self.mean(objective)?, node, 0)
    }

    /// `∂F/∂y` of the time-averaged objective at one node.
    ///
    /// # Errors
    ///
    /// As [`Query::gradient_x`].
    pub fn gradient_y(&self, objective: usize, node: usize) -> Result<f64, Error> {
        self.mesh_component(self.mean(objective)?, node, 1)
    }

    /// `∂F/∂z` of the time-averaged objective at one node.
    ///
    /// # Errors
    ///
    /// As [`Query::gradient_x`].
    pub fn gradient_z(&self, objective: usize, node: usize) -> Result<f64, Error> {
        self.mesh_component(self.mean(objective)?, node, 2)
    }

    /// `∂F/∂x` at one time sample (1-based) and node.
    ///
    /// # Errors
    ///
    /// As [`Query::gradient_x`], plus [`Error::IndexOutOfRange`] for an
    /// unknown time sample.
    pub fn gradient_x_at(&self, objective: usize, time: usize, node: usize) -> Result<f64, Error> {
        self.mesh_component(self.at(objective, time)?, node, 0)
    }

    /// # Errors
    ///
    /// As [`Query::gradient_x_at`].
    pub fn gradient_y_at(&self, objective: usize, time: usize, node: usize) -> Result<f64, Error> {
        self.mesh_component(self.at(objective, time)?, node, 1)
    }

    /// # Errors
    ///
    /// As [`Query::gradient_x_at`].
    pub fn gradient_z_at(&self, objective: usize, time: usize, node: usize) -> Result<f64, Error> {
        self.mesh_component(self.at(objective, time)?, node, 2)
    }

    /// Mesh gradient of the time-averaged objective, `x, y, z` per node.
    ///
    /// # Errors
    ///
    /// As [`Query::gradient_x`].
    pub fn function_gradients(&self, objective: usize) -> Result<Vec<f64>, Error> {
        Ok(flatten(self.mean(objective)?))
    }

    /// Mesh gradient at one time sample, `x, y, z` per node.
    ///
    /// # Errors
    ///
    /// As [`Query::gradient_x_at`].
    pub fn function_gradients_at(&self, objective: usize, time: usize) -> Result<Vec<f64>, Error> {
        Ok(flatten(self.at(objective, time)?))
    }

    /// Sensitivity of the time-averaged objective to one input.
    ///
    /// # Errors
    ///
    /// As [`Query::gradient_x`], with [`Error::IndexOutOfRange`] for an
    /// unknown control group.
    pub fn input_gradient(&self, objective: usize, variable: InputVariable) -> Result<f64, Error> {
        input(self.mean(objective)?, variable)
    }

    /// Sensitivity to one input at one time sample (1-based).
    ///
    /// # Errors
    ///
    /// As [`Query::input_gradient`] and [`Query::gradient_x_at`].
    pub fn input_gradient_at(
        &self,
        objective: usize,
        time: usize,
        variable: InputVariable,
    ) -> Result<f64, Error> {
        input(self.at(objective, time)?, variable)
    }

    /// Pressure jump at one node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PrecursorMissing`] without a current forward solve and
    /// [`Error::IndexOutOfRange`] for an unknown node.
    pub fn nodal_pressure(&self, node: usize) -> Result<f64, Error> {
        let pressures = self.optimizer.nodal_pressures()?;
        let position = self.base.position("node", node, pressures.len())?;
        Ok(pressures[position])
    }

    fn mean(&self, objective: usize) -> Result<&'o Sensitivity, Error> {
        Ok(self.optimizer.current_gradients(objective)?.mean())
    }

    fn at(&self, objective: usize, time: usize) -> Result<&'o Sensitivity, Error> {
        self.optimizer.current_gradients(objective)?.sample(time)
    }

    fn mesh_component(&self, sensitivity: &Sensitivity, node: usize, axis: usize) -> Result<f64, Error> {
        let position = self.base.position("node", node, sensitivity.mesh.len())?;
        Ok(sensitivity.mesh[position][axis])
    }
}

fn flatten(sensitivity: &Sensitivity) -> Vec<f64> {
    sensitivity.mesh.iter().flatten().copied().collect()
}

fn input(sensitivity: &Sensitivity, variable: InputVariable) -> Result<f64, Error> {
    sensitivity.input(variable).ok_or(Error::IndexOutOfRange {
        what: "control group",
        index: match variable {
            InputVariable::Control(group) => group,
            _ => 0,
        },
        len: sensitivity.controls.len(),
    })
}
