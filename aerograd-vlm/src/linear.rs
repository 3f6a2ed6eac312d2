//! Dense LU solve with partial pivoting and iterative refinement.
//!
//! Written against [`Scalar`] so the same elimination runs on plain values
//! and on taped values. Pivot choice and convergence checks only look at
//! [`Scalar::value`], so both instantiations take identical branches.

use aerograd_core::{Scalar, SolveError};
use ndarray::{Array1, Array2};

use crate::LinearConfig;

/// An LU factorization `P·A = L·U` stored in place.
#[derive(Debug, Clone)]
pub struct Lu<S> {
    factors: Array2<S>,
    permutation: Vec<usize>,
}

impl<S: Scalar> Lu<S> {
    /// Factors a square matrix.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::SizeMismatch`] for a non-square matrix and
    /// [`SolveError::Singular`] when a pivot vanishes relative to the largest
    /// matrix entry.
    pub fn factor(matrix: &Array2<S>, pivot_tolerance: f64) -> Result<Self, SolveError> {
        let n = matrix.nrows();
        if matrix.ncols() != n {
            return Err(SolveError::SizeMismatch {
                what: "matrix columns",
                expected: n,
                actual: matrix.ncols(),
            });
        }

        let largest = matrix
            .iter()
            .map(|a| a.value().abs())
            .fold(0.0_f64, f64::max);
        let threshold = pivot_tolerance * largest;

        let mut factors = matrix.clone();
        let mut permutation: Vec<usize> = (0..n).collect();

        for k in 0..n {
            let (row, magnitude) = (k..n)
                .map(|i| (i, factors[[i, k]].value().abs()))
                .fold((k, f64::NEG_INFINITY), |best, candidate| {
                    if candidate.1 > best.1 { candidate } else { best }
                });

            if !(magnitude > threshold) || !magnitude.is_finite() {
                return Err(SolveError::Singular(format!(
                    "vanishing pivot {magnitude:e} in column {k}"
                )));
            }

            if row != k {
                for j in 0..n {
                    factors.swap([k, j], [row, j]);
                }
                permutation.swap(k, row);
            }

            let pivot = factors[[k, k]];
            for i in k + 1..n {
                let factor = factors[[i, k]] / pivot;
                factors[[i, k]] = factor;
                for j in k + 1..n {
                    let update = factors[[k, j]] * factor;
                    factors[[i, j]] -= update;
                }
            }
        }

        Ok(Self {
            factors,
            permutation,
        })
    }

    /// Solves `A·x = b` by forward and back substitution.
    #[must_use]
    pub fn substitute(&self, rhs: &Array1<S>) -> Array1<S> {
        let n = self.permutation.len();
        let mut x = Array1::from_elem(n, S::zero());

        for i in 0..n {
            let mut sum = rhs[self.permutation[i]];
            for j in 0..i {
                sum -= self.factors[[i, j]] * x[j];
            }
            x[i] = sum;
        }

        for i in (0..n).rev() {
            let mut sum = x[i];
            for j in i + 1..n {
                sum -= self.factors[[i, j]] * x[j];
            }
            x[i] = sum / self.factors[[i, i]];
        }

        x
    }
}

/// `b − A·x`.
pub(crate) fn residual<S: Scalar>(matrix: &Array2<S>, x: &Array1<S>, rhs: &Array1<S>) -> Array1<S> {
    Array1::from_shape_fn(rhs.len(), |i| {
        let mut r = rhs[i];
        for (a, xj) in matrix.row(i).iter().zip(x) {
            r -= *a * *xj;
        }
        r
    })
}

fn max_abs<S: Scalar>(v: &Array1<S>) -> f64 {
    v.iter().map(|a| a.value().abs()).fold(0.0, f64::max)
}

/// Solves `A·x = b`, refining the direct solution until the residual meets
/// the configured tolerance.
///
/// # Errors
///
/// Returns [`SolveError::Singular`] for a singular matrix and
/// [`SolveError::NotConverged`] if refinement runs out of passes.
pub fn solve<S: Scalar>(
    matrix: &Array2<S>,
    rhs: &Array1<S>,
    config: &LinearConfig,
) -> Result<Array1<S>, SolveError> {
    if rhs.len() != matrix.nrows() {
        return Err(SolveError::SizeMismatch {
            what: "right-hand side",
            expected: matrix.nrows(),
            actual: rhs.len(),
        });
    }

    let lu = Lu::factor(matrix, config.pivot_tolerance)?;
    let mut x = lu.substitute(rhs);
    let tolerance = config.tolerance * max_abs(rhs).max(1.0);

    let mut pass = 0;
    loop {
        let r = residual(matrix, &x, rhs);
        let size = max_abs(&r);
        if !size.is_finite() {
            return Err(SolveError::Singular(
                "non-finite residual in linear solve".into(),
            ));
        }
        if size <= tolerance {
            if pass > 0 {
                log::trace!("linear solve converged after {pass} refinement passes");
            }
            return Ok(x);
        }
        if pass == config.max_refinements {
            return Err(SolveError::NotConverged {
                iterations: pass,
                residual: size,
            });
        }
        let correction = lu.substitute(&r);
        for (xi, ci) in x.iter_mut().zip(correction.iter()) {
            *xi += *ci;
        }
        pass += 1;
    }
}
