use thiserror::Error;

use aerograd_core::{EquationProblem, Model, Snapshot};

/// One model call seen through an equation problem.
#[derive(Debug, Clone)]
pub struct Evaluation<I, O, const N: usize> {
    /// Solver variables the call was made at.
    pub x: [f64; N],
    pub residuals: [f64; N],
    pub snapshot: Snapshot<I, O>,
}

/// The stage at which an evaluation failed.
#[derive(Debug, Error)]
pub enum EvalError<PE, ME> {
    #[error("failed to compute input")]
    Input(#[source] PE),
    #[error("model call failed")]
    Model(#[source] ME),
    #[error("failed to compute residuals")]
    Residual(#[source] PE),
}

/// Maps `x` to a model input, calls the model, and computes residuals.
///
/// # Errors
///
/// Returns the stage that failed, wrapping its error.
pub fn evaluate<M, P, const N: usize>(
    model: &M,
    problem: &P,
    x: [f64; N],
) -> Result<Evaluation<M::Input, M::Output, N>, EvalError<P::Error, M::Error>>
where
    M: Model,
    P: EquationProblem<N, Input = M::Input, Output = M::Output>,
{
    let snapshot = problem
        .input(&x)
        .map_err(EvalError::Input)
        .and_then(|input| match model.call(&input) {
            Ok(output) => Ok(Snapshot::new(input, output)),
            Err(err) => Err(EvalError::Model(err)),
        })?;
    let residuals = problem
        .residuals(&snapshot.input, &snapshot.output)
        .map_err(EvalError::Residual)?;

    Ok(Evaluation {
        x,
        residuals,
        snapshot,
    })
}
