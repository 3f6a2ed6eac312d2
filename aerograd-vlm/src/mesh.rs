//! Structured lifting-surface meshes.
//!
//! A mesh is a set of patches, each a structured grid of nodes with
//! `chordwise + 1` rows from leading to trailing edge and `spanwise + 1`
//! columns. Each patch is one wing. Node `(i, j)` of a patch lives at
//! `first_node + j·(chordwise + 1) + i`; panel `(i, j)` at
//! `first_panel + j·chordwise + i`.

use aerograd_core::{FunctionKind, Functional, FunctionalError, SolveError};
use thiserror::Error;

/// Errors building or editing a mesh.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeshError {
    #[error("a patch needs at least one panel in each direction, got {chordwise}×{spanwise}")]
    TooCoarse { chordwise: usize, spanwise: usize },

    #[error("patch expects {expected} nodes, got {actual}")]
    NodeCount { expected: usize, actual: usize },

    #[error("node coordinates must be finite")]
    NonFinite,

    #[error("panel {panel} does not exist ({panels} panels)")]
    UnknownPanel { panel: usize, panels: usize },

    #[error("hinge axis must be a finite, nonzero vector")]
    DegenerateAxis,

    #[error("invalid wing: {0}")]
    InvalidWing(&'static str),
}

/// One structured grid of the mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub name: String,
    first_node: usize,
    first_panel: usize,
    chordwise: usize,
    spanwise: usize,
}

impl Patch {
    #[must_use]
    pub fn chordwise(&self) -> usize {
        self.chordwise
    }

    #[must_use]
    pub fn spanwise(&self) -> usize {
        self.spanwise
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        (self.chordwise + 1) * (self.spanwise + 1)
    }

    #[must_use]
    pub fn panel_count(&self) -> usize {
        self.chordwise * self.spanwise
    }

    /// Global index of node `(i, j)`.
    #[must_use]
    pub fn node(&self, i: usize, j: usize) -> usize {
        self.first_node + j * (self.chordwise + 1) + i
    }

    /// Global index of panel `(i, j)`.
    #[must_use]
    pub fn panel(&self, i: usize, j: usize) -> usize {
        self.first_panel + j * self.chordwise + i
    }
}

/// Panels whose normals rotate together about a hinge.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlGroup {
    pub name: String,
    pub panels: Vec<usize>,
    hinge_axis: [f64; 3],
}

impl ControlGroup {
    /// Creates a group; the hinge axis is normalized when added to a mesh.
    #[must_use]
    pub fn new(name: impl Into<String>, panels: Vec<usize>, hinge_axis: [f64; 3]) -> Self {
        Self {
            name: name.into(),
            panels,
            hinge_axis,
        }
    }

    /// Unit hinge axis. Positive deflection rotates normals right-handedly about it.
    #[must_use]
    pub fn hinge_axis(&self) -> [f64; 3] {
        self.hinge_axis
    }
}

/// A collection of wing patches and control groups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    nodes: Vec<[f64; 3]>,
    patches: Vec<Patch>,
    control_groups: Vec<ControlGroup>,
    panel_count: usize,
}

impl Mesh {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mesh holding a single wing.
    ///
    /// # Errors
    ///
    /// Returns an error if the wing description is invalid.
    pub fn from_wing(wing: &PlanarWing) -> Result<Self, MeshError> {
        let mut mesh = Self::new();
        mesh.add_wing(wing)?;
        Ok(mesh)
    }

    /// Appends a structured patch and returns its 1-based wing id.
    ///
    /// # Errors
    ///
    /// Returns an error if the grid is too coarse, the node count is wrong,
    /// or a coordinate is not finite.
    pub fn add_patch(
        &mut self,
        name: impl Into<String>,
        chordwise: usize,
        spanwise: usize,
        nodes: Vec<[f64; 3]>,
    ) -> Result<usize, MeshError> {
        if chordwise == 0 || spanwise == 0 {
            return Err(MeshError::TooCoarse {
                chordwise,
                spanwise,
            });
        }
        let expected = (chordwise + 1) * (spanwise + 1);
        if nodes.len() != expected {
            return Err(MeshError::NodeCount {
                expected,
                actual: nodes.len(),
            });
        }
        if nodes.iter().flatten().any(|c| !c.is_finite()) {
            return Err(MeshError::NonFinite);
        }

        let patch = Patch {
            name: name.into(),
            first_node: self.nodes.len(),
            first_panel: self.panel_count,
            chordwise,
            spanwise,
        };
        self.panel_count += patch.panel_count();
        self.nodes.extend(nodes);
        self.patches.push(patch);
        Ok(self.patches.len())
    }

    /// Appends a planar wing and returns its 1-based wing id.
    ///
    /// # Errors
    ///
    /// Returns an error if the wing description is invalid.
    pub fn add_wing(&mut self, wing: &PlanarWing) -> Result<usize, MeshError> {
        let nodes = wing.nodes()?;
        self.add_patch(wing.name.clone(), wing.chordwise, wing.spanwise, nodes)
    }

    /// Registers a control group and returns its zero-based index.
    ///
    /// # Errors
    ///
    /// Returns an error if a panel does not exist or the hinge axis is degenerate.
    pub fn add_control_group(&mut self, mut group: ControlGroup) -> Result<usize, MeshError> {
        if let Some(&panel) = group.panels.iter().find(|&&p| p >= self.panel_count) {
            return Err(MeshError::UnknownPanel {
                panel,
                panels: self.panel_count,
            });
        }
        let [x, y, z] = group.hinge_axis;
        let length = (x * x + y * y + z * z).sqrt();
        if !length.is_finite() || length == 0.0 {
            return Err(MeshError::DegenerateAxis);
        }
        group.hinge_axis = [x / length, y / length, z / length];
        self.control_groups.push(group);
        Ok(self.control_groups.len() - 1)
    }

    #[must_use]
    pub fn nodes(&self) -> &[[f64; 3]] {
        &self.nodes
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn panel_count(&self) -> usize {
        self.panel_count
    }

    #[must_use]
    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    #[must_use]
    pub fn control_groups(&self) -> &[ControlGroup] {
        &self.control_groups
    }

    /// All coordinates as a flat `x, y, z` sequence.
    #[must_use]
    pub fn coordinates(&self) -> Vec<f64> {
        self.nodes.iter().flatten().copied().collect()
    }

    /// Replaces every node coordinate from a flat `x, y, z` sequence.
    ///
    /// Topology is unchanged; the mesh is left untouched on error.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::SizeMismatch`] unless `xyz.len() == 3 · nodes`,
    /// or [`SolveError::InvalidInput`] for non-finite coordinates.
    pub fn set_coordinates(&mut self, xyz: &[f64]) -> Result<(), SolveError> {
        let expected = 3 * self.nodes.len();
        if xyz.len() != expected {
            return Err(SolveError::SizeMismatch {
                what: "node coordinates",
                expected,
                actual: xyz.len(),
            });
        }
        if xyz.iter().any(|c| !c.is_finite()) {
            return Err(SolveError::InvalidInput(
                "node coordinates must be finite".into(),
            ));
        }
        for (node, chunk) in self.nodes.iter_mut().zip(xyz.chunks_exact(3)) {
            node.copy_from_slice(chunk);
        }
        Ok(())
    }

    /// Zero-based indices of every trailing-edge node.
    #[must_use]
    pub fn trailing_edge_nodes(&self) -> Vec<usize> {
        self.patches
            .iter()
            .flat_map(|patch| (0..=patch.spanwise).map(|j| patch.node(patch.chordwise, j)))
            .collect()
    }

    /// Number of values a functional produces on this mesh.
    ///
    /// # Errors
    ///
    /// Returns an error if the functional references a missing wing or any rotor.
    pub fn functional_length(&self, functional: &Functional) -> Result<usize, FunctionalError> {
        let kind = functional.kind;
        if kind.needs_wing() {
            let wing = functional
                .wing
                .ok_or(FunctionalError::MissingWing { kind })?;
            return wing
                .checked_sub(1)
                .and_then(|index| self.patches.get(index))
                .map(Patch::spanwise)
                .ok_or(FunctionalError::UnknownWing {
                    wing,
                    available: self.patches.len(),
                });
        }
        if kind.needs_rotor() {
            return match functional.rotor {
                None => Err(FunctionalError::MissingRotor { kind }),
                Some(rotor) => Err(FunctionalError::UnknownRotor {
                    rotor,
                    available: 0,
                }),
            };
        }
        Ok(match kind {
            FunctionKind::Residual => self.panel_count,
            _ => 1,
        })
    }
}

/// A straight-tapered, swept lifting surface on a uniform grid.
///
/// Lengths in metres, angles in radians. The span is the full tip-to-tip
/// span; with `mirrored` unset only the starboard half (`y ≥ 0`) is built,
/// for use with XZ-plane symmetry.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarWing {
    pub name: String,
    pub span: f64,
    pub root_chord: f64,
    pub tip_chord: f64,
    /// Leading-edge sweep.
    pub sweep: f64,
    pub dihedral: f64,
    pub chordwise: usize,
    pub spanwise: usize,
    /// Position of the root leading edge.
    pub origin: [f64; 3],
    pub mirrored: bool,
}

impl Default for PlanarWing {
    fn default() -> Self {
        Self {
            name: "wing".into(),
            span: 10.0,
            root_chord: 1.0,
            tip_chord: 1.0,
            sweep: 0.0,
            dihedral: 0.0,
            chordwise: 4,
            spanwise: 10,
            origin: [0.0; 3],
            mirrored: true,
        }
    }
}

impl PlanarWing {
    /// Node coordinates in patch order.
    ///
    /// # Errors
    ///
    /// Returns an error if a dimension is non-positive or the grid is empty.
    pub fn nodes(&self) -> Result<Vec<[f64; 3]>, MeshError> {
        if !(self.span > 0.0 && self.root_chord > 0.0 && self.tip_chord > 0.0) {
            return Err(MeshError::InvalidWing("span and chords must be positive"));
        }
        if self.chordwise == 0 || self.spanwise == 0 {
            return Err(MeshError::TooCoarse {
                chordwise: self.chordwise,
                spanwise: self.spanwise,
            });
        }

        let half = 0.5 * self.span;
        let (y_start, y_extent) = if self.mirrored {
            (-half, self.span)
        } else {
            (0.0, half)
        };
        let (tan_sweep, tan_dihedral) = (self.sweep.tan(), self.dihedral.tan());
        let [x0, y0, z0] = self.origin;

        #[allow(clippy::cast_precision_loss)]
        let nodes = (0..=self.spanwise)
            .flat_map(|j| {
                let y = y_start + y_extent * j as f64 / self.spanwise as f64;
                let eta = y.abs() / half;
                let chord = self.root_chord + (self.tip_chord - self.root_chord) * eta;
                let x_le = x0 + y.abs() * tan_sweep;
                let z = z0 + y.abs() * tan_dihedral;
                (0..=self.chordwise).map(move |i| {
                    [
                        x_le + chord * i as f64 / self.chordwise as f64,
                        y0 + y,
                        z,
                    ]
                })
            })
            .collect();
        Ok(nodes)
    }
}
