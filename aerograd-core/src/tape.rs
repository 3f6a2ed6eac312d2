//! Reverse-mode differentiation by operation taping.
//!
//! A [`Tape`] records every arithmetic operation performed on [`Var`] values
//! bound to it. After the computation, [`Tape::gradient`] walks the record
//! backwards once and returns the derivative of an output with respect to
//! every recorded value, regardless of how many independent inputs there are.
//!
//! Values lifted with [`Scalar::constant`] are not bound to any tape and cost
//! nothing to record. Mixing constants with taped values is free.
//!
//! ```
//! use aerograd_core::{Scalar, tape::Tape};
//!
//! let tape = Tape::new();
//! let x = tape.var(2.0);
//! let y = tape.var(3.0);
//! let f = x * y + x.sin();
//!
//! let grad = tape.gradient(f);
//! assert!((grad.wrt(x) - (3.0 + 2.0_f64.cos())).abs() < 1e-12);
//! assert!((grad.wrt(y) - 2.0).abs() < 1e-12);
//! ```

use std::{
    cell::RefCell,
    fmt,
    ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign},
};

use num_traits::{One, Zero};

use crate::Scalar;

const NO_PARENT: usize = usize::MAX;

/// One recorded operation: up to two parents and the local partials.
#[derive(Debug, Clone, Copy)]
struct Entry {
    parents: [(usize, f64); 2],
}

/// A record of operations on [`Var`] values.
///
/// The tape is single-threaded and append-only; create one per adjoint solve
/// and drop it when the gradients have been extracted.
#[derive(Debug, Default)]
pub struct Tape {
    entries: RefCell<Vec<Entry>>,
}

impl Tape {
    /// Creates an empty tape.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty tape with room for `capacity` operations.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RefCell::new(Vec::with_capacity(capacity)),
        }
    }

    /// Registers an independent variable with the given value.
    pub fn var(&self, value: f64) -> Var<'_> {
        let index = self.record([(NO_PARENT, 0.0), (NO_PARENT, 0.0)]);
        Var {
            value,
            index,
            tape: Some(self),
        }
    }

    /// Number of operations recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Back-propagates a unit seed from `output`.
    #[must_use]
    pub fn gradient(&self, output: Var<'_>) -> Gradient {
        self.gradient_seeded([(output, 1.0)])
    }

    /// Back-propagates the weighted sum `Σ wᵢ·outputᵢ` in a single sweep.
    ///
    /// Outputs that are constants, or that belong to another tape, contribute
    /// nothing.
    #[must_use]
    pub fn gradient_seeded<'t, I>(&'t self, seeds: I) -> Gradient
    where
        I: IntoIterator<Item = (Var<'t>, f64)>,
    {
        let entries = self.entries.borrow();
        let mut adjoints = vec![0.0; entries.len()];

        for (output, weight) in seeds {
            if output.is_bound_to(self) {
                adjoints[output.index] += weight;
            }
        }

        for index in (0..entries.len()).rev() {
            let adjoint = adjoints[index];
            #[allow(clippy::float_cmp)]
            if adjoint == 0.0 {
                continue;
            }
            for (parent, partial) in entries[index].parents {
                if parent != NO_PARENT {
                    adjoints[parent] += adjoint * partial;
                }
            }
        }

        Gradient {
            adjoints,
            tape: std::ptr::from_ref(self) as usize,
        }
    }

    fn record(&self, parents: [(usize, f64); 2]) -> usize {
        let mut entries = self.entries.borrow_mut();
        entries.push(Entry { parents });
        entries.len() - 1
    }
}

/// Adjoints of every recorded value, produced by one reverse sweep.
#[derive(Debug, Clone)]
pub struct Gradient {
    adjoints: Vec<f64>,
    tape: usize,
}

impl Gradient {
    /// Derivative of the seeded output with respect to `var`.
    ///
    /// Constants and values recorded on a different tape yield zero.
    #[must_use]
    pub fn wrt(&self, var: Var<'_>) -> f64 {
        match var.tape {
            Some(tape) if std::ptr::from_ref(tape) as usize == self.tape => {
                self.adjoints.get(var.index).copied().unwrap_or(0.0)
            }
            _ => 0.0,
        }
    }
}

/// A value that records its arithmetic on a [`Tape`].
#[derive(Clone, Copy)]
pub struct Var<'t> {
    value: f64,
    index: usize,
    tape: Option<&'t Tape>,
}

impl fmt::Debug for Var<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tape {
            Some(_) => write!(f, "Var({} @ {})", self.value, self.index),
            None => write!(f, "Var({})", self.value),
        }
    }
}

impl<'t> Var<'t> {
    /// Returns `true` if this value is not bound to a tape.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        self.tape.is_none()
    }

    fn is_bound_to(&self, tape: &Tape) -> bool {
        self.tape.is_some_and(|own| std::ptr::eq(own, tape))
    }

    fn unary(self, value: f64, partial: f64) -> Self {
        match self.tape {
            Some(tape) => Var {
                value,
                index: tape.record([(self.index, partial), (NO_PARENT, 0.0)]),
                tape: Some(tape),
            },
            None => Self::constant(value),
        }
    }

    fn binary(self, rhs: Self, value: f64, d_lhs: f64, d_rhs: f64) -> Self {
        let (tape, parents) = match (self.tape, rhs.tape) {
            (Some(tape), Some(_)) => (tape, [(self.index, d_lhs), (rhs.index, d_rhs)]),
            (Some(tape), None) => (tape, [(self.index, d_lhs), (NO_PARENT, 0.0)]),
            (None, Some(tape)) => (tape, [(rhs.index, d_rhs), (NO_PARENT, 0.0)]),
            (None, None) => return Self::constant(value),
        };
        Var {
            value,
            index: tape.record(parents),
            tape: Some(tape),
        }
    }
}

impl Add for Var<'_> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.binary(rhs, self.value + rhs.value, 1.0, 1.0)
    }
}

impl Sub for Var<'_> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.binary(rhs, self.value - rhs.value, 1.0, -1.0)
    }
}

impl Mul for Var<'_> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.binary(rhs, self.value * rhs.value, rhs.value, self.value)
    }
}

impl Div for Var<'_> {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        let inv = 1.0 / rhs.value;
        self.binary(
            rhs,
            self.value * inv,
            inv,
            -self.value * inv * inv,
        )
    }
}

impl Neg for Var<'_> {
    type Output = Self;

    fn neg(self) -> Self {
        self.unary(-self.value, -1.0)
    }
}

impl Add<f64> for Var<'_> {
    type Output = Self;

    fn add(self, rhs: f64) -> Self {
        self.unary(self.value + rhs, 1.0)
    }
}

impl Sub<f64> for Var<'_> {
    type Output = Self;

    fn sub(self, rhs: f64) -> Self {
        self.unary(self.value - rhs, 1.0)
    }
}

impl Mul<f64> for Var<'_> {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        self.unary(self.value * rhs, rhs)
    }
}

impl Div<f64> for Var<'_> {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        self.unary(self.value / rhs, 1.0 / rhs)
    }
}

impl AddAssign for Var<'_> {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Var<'_> {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl MulAssign for Var<'_> {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl Zero for Var<'_> {
    fn zero() -> Self {
        Self::constant(0.0)
    }

    fn is_zero(&self) -> bool {
        self.value.is_zero()
    }
}

impl One for Var<'_> {
    fn one() -> Self {
        Self::constant(1.0)
    }
}

impl Scalar for Var<'_> {
    fn constant(value: f64) -> Self {
        Var {
            value,
            index: NO_PARENT,
            tape: None,
        }
    }

    fn value(&self) -> f64 {
        self.value
    }

    fn sqrt(self) -> Self {
        let root = self.value.sqrt();
        let partial = if root > 0.0 { 0.5 / root } else { 0.0 };
        self.unary(root, partial)
    }

    fn sin(self) -> Self {
        self.unary(self.value.sin(), self.value.cos())
    }

    fn cos(self) -> Self {
        self.unary(self.value.cos(), -self.value.sin())
    }

    fn atan(self) -> Self {
        self.unary(self.value.atan(), 1.0 / (1.0 + self.value * self.value))
    }

    fn ln(self) -> Self {
        self.unary(self.value.ln(), 1.0 / self.value)
    }

    fn exp(self) -> Self {
        let exp = self.value.exp();
        self.unary(exp, exp)
    }

    fn powf(self, exponent: f64) -> Self {
        self.unary(
            self.value.powf(exponent),
            exponent * self.value.powf(exponent - 1.0),
        )
    }

    fn abs(self) -> Self {
        let sign = if self.value > 0.0 {
            1.0
        } else if self.value < 0.0 {
            -1.0
        } else {
            0.0
        };
        self.unary(self.value.abs(), sign)
    }
}
