//! Core traits and types shared by the aerograd crates.
//!
//! This crate defines the abstractions the flow collaborator and the
//! optimizer build on:
//!
//! - [`Model`]: a callable that maps a typed input to a typed output
//! - [`Snapshot`]: a captured input/output pair from a model call
//! - [`Observer`]: receives solver events and optionally returns control actions
//! - [`EquationProblem`]: adapts solver variables to model inputs and residuals
//! - [`Scalar`]: the numeric capability the discretization is written against,
//!   implemented by `f64` and by the taped [`tape::Var`]
//! - [`FlowSolver`], [`AdjointSolver`]: the narrow interface to the forward
//!   and adjoint flow solvers

mod functional;
mod loads;
mod model;
mod observer;
mod operating_point;
mod problems;
mod scalar;
mod solver;

pub mod tape;

pub use functional::{FunctionKind, Functional, FunctionalError, TrimTarget};
pub use loads::{Coefficient, Coefficients, Loads, RotorLoads, SpanLoad};
pub use observer::Observer;
pub use operating_point::{InputVariable, OperatingPoint, STANDARD_INPUTS};
pub use problems::EquationProblem;
pub use scalar::Scalar;
pub use solver::{AdjointSolver, FlowSolver, Sensitivity, SolveError};
pub use {model::Model, model::Snapshot};
