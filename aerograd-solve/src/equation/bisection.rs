//! Bracketed bisection for scalar equation problems.
//!
//! Used by the trim loop to find the angle of attack that meets a lift target.

mod bracket;
mod config;
mod error;
mod solution;

pub use config::Config;
pub use error::Error;
pub use solution::{Solution, Status};

use aerograd_core::{EquationProblem, Model, Observer};

use crate::equation::{Evaluation, evaluate};

use bracket::Bracket;

/// Control actions supported by the bisection solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop the solver early and return the best point so far.
    StopEarly,
}

/// Iteration event emitted by the bisection solver.
pub struct Event<'a, I, O> {
    /// Iteration counter (1-based within the bisection loop).
    pub iter: usize,
    /// Current search bracket.
    pub bracket: [f64; 2],
    /// Evaluation at the current midpoint.
    pub eval: &'a Evaluation<I, O, 1>,
}

/// Finds a root of the equation using the bisection method.
/// Observers see each iteration's evaluation and bracket state.
///
/// The reported point is the midpoint that met a tolerance, or otherwise the
/// evaluation with the smallest residual magnitude seen so far.
///
/// # Errors
///
/// Returns an error if the bracket is invalid, the config is invalid,
/// or the model or problem returns an error during evaluation.
pub fn solve<I, O, Obs>(
    model: &impl Model<Input = I, Output = O>,
    problem: &impl EquationProblem<1, Input = I, Output = O>,
    bracket: [f64; 2],
    config: &Config,
    mut observer: Obs,
) -> Result<Solution<I, O>, Error>
where
    Obs: for<'a> Observer<Event<'a, I, O>, Action>,
{
    config
        .validate()
        .map_err(|reason| Error::InvalidConfig { reason })?;

    let endpoints = Bracket::endpoints(bracket)?;

    let lower = checked(evaluate(model, problem, [endpoints[0]])?)?;
    if lower.residuals[0].abs() <= config.residual_tol {
        return Ok(Solution::from_eval(lower, Status::Converged, 0));
    }
    let upper = checked(evaluate(model, problem, [endpoints[1]])?)?;
    if upper.residuals[0].abs() <= config.residual_tol {
        return Ok(Solution::from_eval(upper, Status::Converged, 0));
    }

    let mut bracket = Bracket::new(endpoints, [lower.residuals[0], upper.residuals[0]])?;
    let mut best = if upper.residuals[0].abs() < lower.residuals[0].abs() {
        upper
    } else {
        lower
    };

    for iter in 1..=config.max_iters {
        let mid = bracket.midpoint();
        let eval = checked(evaluate(model, problem, [mid])?)?;
        let residual = eval.residuals[0];

        let event = Event {
            iter,
            bracket: bracket.bounds(),
            eval: &eval,
        };
        let stop = matches!(observer.observe(&event), Some(Action::StopEarly));
        let converged = residual.abs() <= config.residual_tol
            || bracket.is_narrow(config.x_abs_tol, config.x_rel_tol);

        if !stop && converged {
            return Ok(Solution::from_eval(eval, Status::Converged, iter));
        }

        bracket.split(mid, residual);
        if residual.abs() < best.residuals[0].abs() {
            best = eval;
        }

        if stop {
            return Ok(Solution::from_eval(best, Status::StoppedByObserver, iter));
        }
    }

    Ok(Solution::from_eval(best, Status::MaxIters, config.max_iters))
}

/// Runs bisection without observation.
///
/// # Errors
///
/// Returns an error if the bracket is invalid, the config is invalid,
/// or the model or problem returns an error during evaluation.
pub fn solve_unobserved<I, O>(
    model: &impl Model<Input = I, Output = O>,
    problem: &impl EquationProblem<1, Input = I, Output = O>,
    bracket: [f64; 2],
    config: &Config,
) -> Result<Solution<I, O>, Error> {
    solve(model, problem, bracket, config, ())
}

/// Rejects evaluations whose residual is NaN or infinite.
fn checked<I, O>(eval: Evaluation<I, O, 1>) -> Result<Evaluation<I, O, 1>, Error> {
    let residual = eval.residuals[0];
    if residual.is_finite() {
        Ok(eval)
    } else {
        Err(Error::NonFiniteResidual {
            x: eval.x[0],
            residual,
        })
    }
}
