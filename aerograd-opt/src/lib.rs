//! Aerodynamic objective functions with adjoint gradients.
//!
//! An [`Optimizer`] owns a forward [`FlowSolver`] and an adjoint
//! [`AdjointSolver`] over the same mesh, the objectives being optimized, and a
//! [`CaseSweep`] for stability derivatives. After [`Optimizer::solve`], a
//! [`Query`] reads values and gradients with node indices in the caller's
//! [`IndexBase`].
//!
//! [`FlowSolver`]: aerograd_core::FlowSolver
//! [`AdjointSolver`]: aerograd_core::AdjointSolver

mod error;
mod optimizer;

pub mod case;
pub mod config;
pub mod function;
pub mod motion;
pub mod query;
pub mod sweep;
pub mod trim;

pub use case::{Case, CaseList, SweepLists};
pub use config::{ObjectiveSpec, OptimizerConfig, SessionConfig};
pub use error::Error;
pub use function::ObjectiveFunction;
pub use motion::PitchHeave;
pub use optimizer::{ObjectiveGradients, Optimizer};
pub use query::{IndexBase, Query};
pub use sweep::{Axis, CaseSweep, DerivativeRow, Differencing, SweepConfig};
pub use trim::{TrimConfig, Trimmed};

use aerograd_vlm::{AdjointVlm, ForwardVlm, Mesh, solver_pair};

/// An optimizer over the vortex-lattice solvers.
pub type VlmOptimizer = Optimizer<ForwardVlm, AdjointVlm>;

/// Builds a vortex-lattice optimization session on `mesh`.
///
/// # Errors
///
/// Returns [`Error::InvalidConfiguration`] for invalid lattice settings and
/// any error of [`Optimizer::setup`].
pub fn vlm_session(mesh: Mesh, config: &SessionConfig) -> Result<VlmOptimizer, Error> {
    config
        .lattice
        .validate()
        .map_err(|reason| Error::InvalidConfiguration(reason.into()))?;
    let (forward, adjoint) = solver_pair(mesh, config.lattice);
    Optimizer::setup(config.optimizer.clone(), forward, adjoint)
}
