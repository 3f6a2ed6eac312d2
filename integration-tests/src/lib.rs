//! Shared fixtures for the end-to-end scenarios.

use aerograd_opt::{Case, ObjectiveSpec, OptimizerConfig, SessionConfig, VlmOptimizer, vlm_session};
use aerograd_vlm::{LatticeConfig, Mesh, PlanarWing, Reference};
use uom::si::{angle::degree, f64::Angle};

pub const SPAN: f64 = 8.0;

/// An untapered, unswept flat wing of aspect ratio 8.
#[must_use]
pub fn flat_wing() -> Mesh {
    Mesh::from_wing(&PlanarWing {
        span: SPAN,
        root_chord: 1.0,
        tip_chord: 1.0,
        chordwise: 4,
        spanwise: 8,
        ..PlanarWing::default()
    })
    .expect("flat wing is valid")
}

#[must_use]
pub fn lattice() -> LatticeConfig {
    LatticeConfig {
        reference: Reference {
            sref: SPAN,
            cref: 1.0,
            bref: SPAN,
            cg: [0.25, 0.0, 0.0],
        },
        ..LatticeConfig::default()
    }
}

/// Mach 0.3 at 2° angle of attack, no sideslip.
#[must_use]
pub fn cruise() -> Case {
    Case::new(0.3, Angle::new::<degree>(2.0), Angle::new::<degree>(0.0))
}

#[must_use]
pub fn session_config(objectives: Vec<ObjectiveSpec>) -> SessionConfig {
    SessionConfig {
        lattice: lattice(),
        optimizer: OptimizerConfig {
            case: cruise(),
            objectives,
            ..OptimizerConfig::default()
        },
    }
}

/// A flat-wing session at the cruise point.
#[must_use]
pub fn session(objectives: Vec<ObjectiveSpec>) -> VlmOptimizer {
    vlm_session(flat_wing(), &session_config(objectives)).expect("valid session")
}
