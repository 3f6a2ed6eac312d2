use std::{
    fmt::Debug,
    ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign},
};

use num_traits::{One, Zero};

/// The numeric capability the flow discretization is written against.
///
/// The discretization is generic over `Scalar` and instantiated exactly twice:
/// with `f64` for the forward solve, and with [`crate::tape::Var`] for the
/// adjoint, which records every operation so sensitivities can be recovered
/// with a single reverse sweep. Both instantiations run the same equations.
///
/// Control flow (pivoting, cutoffs) must only ever branch on [`Scalar::value`].
pub trait Scalar:
    Copy
    + Debug
    + Zero
    + One
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + Add<f64, Output = Self>
    + Sub<f64, Output = Self>
    + Mul<f64, Output = Self>
    + Div<f64, Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
{
    /// Lifts a plain value that carries no derivative information.
    fn constant(value: f64) -> Self;

    /// Returns the plain value, discarding derivative information.
    fn value(&self) -> f64;

    fn sqrt(self) -> Self;
    fn sin(self) -> Self;
    fn cos(self) -> Self;
    fn atan(self) -> Self;
    fn ln(self) -> Self;
    fn exp(self) -> Self;

    /// Raises to a constant power.
    fn powf(self, exponent: f64) -> Self;

    /// Absolute value, with derivative `signum(value)`.
    fn abs(self) -> Self;

    /// Returns `1 / self`.
    #[must_use]
    fn recip(self) -> Self {
        Self::one() / self
    }
}

impl Scalar for f64 {
    #[inline]
    fn constant(value: f64) -> Self {
        value
    }

    #[inline]
    fn value(&self) -> f64 {
        *self
    }

    #[inline]
    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }

    #[inline]
    fn sin(self) -> Self {
        f64::sin(self)
    }

    #[inline]
    fn cos(self) -> Self {
        f64::cos(self)
    }

    #[inline]
    fn atan(self) -> Self {
        f64::atan(self)
    }

    #[inline]
    fn ln(self) -> Self {
        f64::ln(self)
    }

    #[inline]
    fn exp(self) -> Self {
        f64::exp(self)
    }

    #[inline]
    fn powf(self, exponent: f64) -> Self {
        f64::powf(self, exponent)
    }

    #[inline]
    fn abs(self) -> Self {
        f64::abs(self)
    }
}
