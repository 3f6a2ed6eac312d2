//! Root finders for aerograd equation problems.
//!
//! Solvers here take a [`Model`](aerograd_core::Model) and an
//! [`EquationProblem`](aerograd_core::EquationProblem), search the problem's
//! variables for a zero residual, and report progress through an
//! [`Observer`](aerograd_core::Observer).

pub mod equation;
