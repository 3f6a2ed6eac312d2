//! Trimming the angle of attack to a lift target.
//!
//! Each bisection step is a full forward solve. The equation is
//! `CL(α) − CL_target = 0` over a configured angle bracket.

use std::{cell::RefCell, convert::Infallible};

use aerograd_core::{EquationProblem, FlowSolver, Loads, Model, OperatingPoint, SolveError, TrimTarget};
use aerograd_solve::equation::bisection::{self, Action, Event};
use uom::si::{
    angle::{degree, radian},
    f64::Angle,
};

use crate::Error;

/// Settings of the trim loop and the combined trim objective.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimConfig {
    pub target_cl: f64,
    /// Angles of attack bounding the search; CL must change sign across them.
    pub alpha_bracket: [Angle; 2],
    pub max_iters: usize,
    /// Largest accepted `|CL − target_cl|`.
    pub cl_tol: f64,
    /// Penalty weight on `(CL − target_cl)²` in the combined objective.
    pub cl_weight: f64,
    /// Penalty weight on `CMy²` in the combined objective.
    pub cm_weight: f64,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            target_cl: 0.5,
            alpha_bracket: [Angle::new::<degree>(-5.0), Angle::new::<degree>(15.0)],
            max_iters: 60,
            cl_tol: 1e-6,
            cl_weight: 1.0,
            cm_weight: 1.0,
        }
    }
}

impl TrimConfig {
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !self.target_cl.is_finite() {
            return Err("target_cl must be finite");
        }
        if self.alpha_bracket.iter().any(|a| !a.get::<radian>().is_finite()) {
            return Err("alpha_bracket must be finite");
        }
        if !self.cl_tol.is_finite() || self.cl_tol < 0.0 {
            return Err("cl_tol must be finite and non-negative");
        }
        if !self.cl_weight.is_finite() || !self.cm_weight.is_finite() {
            return Err("trim weights must be finite");
        }
        Ok(())
    }

    /// Target and weights of the combined objective.
    #[must_use]
    pub fn target(&self) -> TrimTarget {
        TrimTarget {
            cl: self.target_cl,
            cl_weight: self.cl_weight,
            cm_weight: self.cm_weight,
        }
    }
}

/// A converged trim state.
#[derive(Debug, Clone, PartialEq)]
pub struct Trimmed {
    /// The operating point at the trimmed angle of attack.
    pub point: OperatingPoint,
    pub loads: Loads<f64>,
    pub iterations: usize,
}

/// A forward solve at a given angle of attack.
struct LiftModel<'a, F> {
    solver: RefCell<&'a mut F>,
    base: &'a OperatingPoint,
}

impl<F: FlowSolver> Model for LiftModel<'_, F> {
    type Input = f64;
    type Output = Loads<f64>;
    type Error = SolveError;

    fn call(&self, alpha: &f64) -> Result<Loads<f64>, SolveError> {
        let point = OperatingPoint {
            alpha: *alpha,
            ..self.base.clone()
        };
        self.solver.borrow_mut().solve(&point)
    }
}

struct LiftTarget {
    cl: f64,
}

impl EquationProblem<1> for LiftTarget {
    type Input = f64;
    type Output = Loads<f64>;
    type Error = Infallible;

    fn input(&self, x: &[f64; 1]) -> Result<f64, Infallible> {
        Ok(x[0])
    }

    fn residuals(&self, _alpha: &f64, loads: &Loads<f64>) -> Result<[f64; 1], Infallible> {
        Ok([loads.coefficients.cl - self.cl])
    }
}

/// Finds the angle of attack at which CL meets the target.
///
/// The solver is left holding the solution at the trimmed angle.
///
/// # Errors
///
/// Returns [`Error::ConvergenceFailure`] if the bracket does not contain the
/// target or the iteration limit is reached, and maps solve failures through
/// [`Error::from`].
pub fn trim<F: FlowSolver>(
    solver: &mut F,
    base: &OperatingPoint,
    config: &TrimConfig,
) -> Result<Trimmed, Error> {
    config.validate().map_err(Error::invalid)?;

    let bracket = config.alpha_bracket.map(|a| a.get::<radian>());
    let settings = bisection::Config::residual(config.cl_tol, config.max_iters);
    let observer = |event: &Event<'_, f64, Loads<f64>>| -> Option<Action> {
        log::debug!(
            "trim iteration {}: alpha = {:.6} deg, CL = {:.6}",
            event.iter,
            event.eval.x[0].to_degrees(),
            event.eval.snapshot.output.coefficients.cl,
        );
        None
    };

    let model = LiftModel {
        solver: RefCell::new(solver),
        base,
    };
    let solution = bisection::solve(
        &model,
        &LiftTarget {
            cl: config.target_cl,
        },
        bracket,
        &settings,
        observer,
    )
    .map_err(|err| trim_error(&err, config))?;
    let solver = model.solver.into_inner();

    if !solution.meets(config.cl_tol) {
        log::warn!(
            "trim stopped after {} iterations with CL residual {:e}",
            solution.iters,
            solution.residual
        );
        return Err(Error::ConvergenceFailure(format!(
            "trim to CL = {} not converged after {} iterations (residual {:e})",
            config.target_cl, solution.iters, solution.residual
        )));
    }

    let point = OperatingPoint {
        alpha: solution.x,
        ..base.clone()
    };
    // The last evaluation may have been an endpoint; solve again so the
    // solver state belongs to the trimmed angle.
    let loads = solver.solve(&point)?;
    log::debug!(
        "trimmed to alpha = {:.6} deg in {} iterations",
        solution.x.to_degrees(),
        solution.iters
    );

    Ok(Trimmed {
        point,
        loads,
        iterations: solution.iters,
    })
}

fn trim_error(err: &bisection::Error, config: &TrimConfig) -> Error {
    if let Some(solve_error) = err.model_error_as::<SolveError>() {
        return solve_error.clone().into();
    }
    match err {
        bisection::Error::NoBracket {
            left_residual,
            right_residual,
            ..
        } => Error::ConvergenceFailure(format!(
            "CL = {} is not bracketed by alpha in [{}, {}] deg (residuals {left_residual:.4}, {right_residual:.4})",
            config.target_cl,
            config.alpha_bracket[0].get::<degree>(),
            config.alpha_bracket[1].get::<degree>(),
        )),
        other => Error::invalid(other.to_string()),
    }
}
