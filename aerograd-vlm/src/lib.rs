//! A horseshoe vortex-lattice flow solver with exact adjoint sensitivities.
//!
//! The discretization in [`lattice`] is written once, generic over
//! [`Scalar`](aerograd_core::Scalar), and instantiated twice:
//!
//! - [`ForwardVlm`] runs it on `f64` and implements
//!   [`FlowSolver`](aerograd_core::FlowSolver).
//! - [`AdjointVlm`] runs it on taped values and implements
//!   [`AdjointSolver`](aerograd_core::AdjointSolver), recovering every
//!   sensitivity from a single reverse sweep.

mod adjoint;
mod config;
mod forward;
mod vector;

pub mod lattice;
pub mod linear;
pub mod mesh;

pub use adjoint::AdjointVlm;
pub use config::{LatticeConfig, LinearConfig, Reference};
pub use forward::ForwardVlm;
pub use mesh::{ControlGroup, Mesh, MeshError, Patch, PlanarWing};

/// Builds a forward and an adjoint solver over the same mesh and settings.
#[must_use]
pub fn solver_pair(mesh: Mesh, config: LatticeConfig) -> (ForwardVlm, AdjointVlm) {
    (
        ForwardVlm::new(mesh.clone(), config),
        AdjointVlm::new(mesh, config),
    )
}
