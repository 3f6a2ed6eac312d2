use aerograd_core::Snapshot;

use crate::equation::Evaluation;

/// How a bisection solve finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Converged,
    /// The iteration limit ran out first.
    MaxIters,
    StoppedByObserver,
}

/// The point a bisection solve settled on.
#[derive(Debug, Clone)]
pub struct Solution<I, O> {
    pub status: Status,
    pub x: f64,
    pub residual: f64,
    /// Model input and output at `x`.
    pub snapshot: Snapshot<I, O>,
    pub iters: usize,
}

impl<I, O> Solution<I, O> {
    pub(super) fn from_eval(eval: Evaluation<I, O, 1>, status: Status, iters: usize) -> Self {
        let Evaluation {
            x: [x],
            residuals: [residual],
            snapshot,
        } = eval;
        Self {
            status,
            x,
            residual,
            snapshot,
            iters,
        }
    }

    /// True when the solve converged and the final residual is within `tol`.
    ///
    /// A bracket that narrows onto a discontinuity converges on width alone,
    /// so callers that need a residual bound check it here.
    #[must_use]
    pub fn meets(&self, tol: f64) -> bool {
        self.status == Status::Converged && self.residual.abs() <= tol
    }
}
