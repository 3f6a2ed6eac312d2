//! The horseshoe vortex-lattice discretization.
//!
//! Every panel carries one horseshoe vortex: a bound segment on the panel's
//! quarter-chord line and two trailing legs running to +x infinity. The flow
//! tangency condition is enforced at the three-quarter-chord collocation
//! point of each panel, giving the dense system `A·Γ = b`. Forces follow from
//! Kutta–Joukowski on the bound segments.
//!
//! [`Lattice`] is generic over [`Scalar`]. The forward solver instantiates it
//! with `f64` and the adjoint solver with taped values, so both run exactly
//! the same equations.

use std::f64::consts::{LN_10, PI};

use aerograd_core::{
    Coefficients, InputVariable, Loads, OperatingPoint, STANDARD_INPUTS, Scalar, SolveError,
    SpanLoad,
};
use ndarray::{Array1, Array2};

use crate::{
    LatticeConfig,
    linear,
    mesh::Mesh,
    vector::{self, Vec3, add, cross, dot, mirror, norm, scale, sub},
};

const FOUR_PI: f64 = 4.0 * PI;
const DOWNSTREAM: [f64; 3] = [1.0, 0.0, 0.0];

/// Flow-state inputs in the lattice's numeric type.
#[derive(Debug, Clone)]
pub struct Inputs<S> {
    pub alpha: S,
    pub beta: S,
    pub mach: S,
    pub vinf: S,
    pub density: S,
    pub recref: S,
    pub roll_rate: S,
    pub pitch_rate: S,
    pub yaw_rate: S,
    /// One deflection per control group of the mesh, radians.
    pub controls: Vec<S>,
}

impl<S: Scalar> Inputs<S> {
    /// Builds inputs from the standard values in [`InputVariable::STANDARD`]
    /// order and one deflection per control group.
    #[must_use]
    pub fn from_parts(standard: [S; STANDARD_INPUTS], controls: Vec<S>) -> Self {
        let [
            alpha,
            beta,
            mach,
            vinf,
            density,
            recref,
            roll_rate,
            pitch_rate,
            yaw_rate,
        ] = standard;
        Self {
            alpha,
            beta,
            mach,
            vinf,
            density,
            recref,
            roll_rate,
            pitch_rate,
            yaw_rate,
            controls,
        }
    }

    /// Lifts an operating point as constants.
    ///
    /// # Errors
    ///
    /// Returns an error if the point deflects more control groups than the
    /// mesh has.
    pub fn constant(point: &OperatingPoint, mesh: &Mesh) -> Result<Self, SolveError> {
        let controls = control_deflections(point, mesh)?;
        Ok(Self::from_parts(
            point.standard_inputs().map(S::constant),
            controls.into_iter().map(S::constant).collect(),
        ))
    }
}

/// Control deflections padded with zeros to one per control group.
///
/// # Errors
///
/// Returns [`SolveError::SizeMismatch`] if the point has more deflections
/// than the mesh has groups.
pub fn control_deflections(point: &OperatingPoint, mesh: &Mesh) -> Result<Vec<f64>, SolveError> {
    let groups = mesh.control_groups().len();
    if point.controls.len() > groups {
        return Err(SolveError::SizeMismatch {
            what: "control deflections",
            expected: groups,
            actual: point.controls.len(),
        });
    }
    Ok((0..groups)
        .map(|group| point.get(InputVariable::Control(group)).unwrap_or(0.0))
        .collect())
}

#[derive(Debug, Clone)]
struct Panel<S> {
    /// Bound segment endpoints, port then starboard.
    a: Vec3<S>,
    b: Vec3<S>,
    collocation: Vec3<S>,
    normal: Vec3<S>,
    area: S,
}

impl<S: Scalar> Panel<S> {
    fn midpoint(&self) -> Vec3<S> {
        vector::lerp(self.a, self.b, 0.5)
    }
}

/// The assembled linear system at one flow state.
#[derive(Debug, Clone)]
pub struct System<S> {
    /// Panel normals after control deflection.
    pub normals: Vec<Vec3<S>>,
    /// Normal velocity at each collocation point per unit circulation of each vortex.
    pub matrix: Array2<S>,
    /// Negative onset-flow normal velocity at each collocation point.
    pub rhs: Array1<S>,
}

/// Everything a lattice solve produces.
#[derive(Debug, Clone)]
pub struct Solution<S> {
    pub system: System<S>,
    pub circulation: Vec<S>,
    pub loads: Loads<S>,
    /// Pressure-jump coefficient at each node, averaged over adjacent panels.
    pub nodal_pressures: Vec<S>,
}

/// Onset flow: freestream minus rigid-body rotation about the reference point.
struct Onset<S> {
    freestream: Vec3<S>,
    omega: Vec3<S>,
    center: Vec3<S>,
}

impl<S: Scalar> Onset<S> {
    fn at(&self, point: Vec3<S>) -> Vec3<S> {
        sub(self.freestream, cross(self.omega, sub(point, self.center)))
    }
}

/// Wind-axis unit vectors.
struct WindAxes<S> {
    drag: Vec3<S>,
    lift: Vec3<S>,
    side: Vec3<S>,
}

impl<S: Scalar> WindAxes<S> {
    fn new(alpha: S, beta: S) -> Self {
        let (sa, ca) = (alpha.sin(), alpha.cos());
        let (sb, cb) = (beta.sin(), beta.cos());
        Self {
            drag: [ca * cb, -sb, sa * cb],
            lift: [-sa, S::zero(), ca],
            side: [ca * sb, cb, sa * sb],
        }
    }
}

/// A mesh discretized into horseshoe vortices over numeric type `S`.
#[derive(Debug, Clone)]
pub struct Lattice<'m, S> {
    mesh: &'m Mesh,
    config: &'m LatticeConfig,
    panels: Vec<Panel<S>>,
}

impl<'m, S: Scalar> Lattice<'m, S> {
    /// Builds the lattice on `nodes`, which replace the mesh's own coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::SizeMismatch`] if `nodes` does not have one entry
    /// per mesh node.
    pub fn new(
        mesh: &'m Mesh,
        config: &'m LatticeConfig,
        nodes: &[Vec3<S>],
    ) -> Result<Self, SolveError> {
        if nodes.len() != mesh.node_count() {
            return Err(SolveError::SizeMismatch {
                what: "lattice nodes",
                expected: mesh.node_count(),
                actual: nodes.len(),
            });
        }
        Ok(Self::build(mesh, config, nodes))
    }

    /// Builds the lattice on the mesh's own coordinates.
    #[must_use]
    pub fn on_mesh(mesh: &'m Mesh, config: &'m LatticeConfig) -> Self {
        let nodes: Vec<Vec3<S>> = mesh.nodes().iter().map(|&n| vector::constant(n)).collect();
        Self::build(mesh, config, &nodes)
    }

    fn build(mesh: &'m Mesh, config: &'m LatticeConfig, nodes: &[Vec3<S>]) -> Self {
        let mut panels = Vec::with_capacity(mesh.panel_count());
        for patch in mesh.patches() {
            for j in 0..patch.spanwise() {
                for i in 0..patch.chordwise() {
                    let p00 = nodes[patch.node(i, j)];
                    let p10 = nodes[patch.node(i + 1, j)];
                    let p01 = nodes[patch.node(i, j + 1)];
                    let p11 = nodes[patch.node(i + 1, j + 1)];

                    let diagonal = cross(sub(p11, p00), sub(p01, p10));
                    let length = norm(diagonal);
                    let collocation = vector::lerp(
                        vector::lerp(p00, p10, 0.75),
                        vector::lerp(p01, p11, 0.75),
                        0.5,
                    );

                    panels.push(Panel {
                        a: vector::lerp(p00, p10, 0.25),
                        b: vector::lerp(p01, p11, 0.25),
                        collocation,
                        normal: scale(diagonal, length.recip()),
                        area: length * 0.5,
                    });
                }
            }
        }

        Self {
            mesh,
            config,
            panels,
        }
    }

    #[must_use]
    pub fn panel_count(&self) -> usize {
        self.panels.len()
    }

    /// Solves for the circulation and evaluates every functional.
    ///
    /// # Errors
    ///
    /// Returns an error for supersonic or degenerate flow states, a singular
    /// system, or a linear solve that does not converge.
    pub fn solve(&self, inputs: &Inputs<S>) -> Result<Solution<S>, SolveError> {
        let system = self.assemble(inputs)?;
        let circulation = linear::solve(&system.matrix, &system.rhs, &self.config.linear)?;
        let circulation = circulation.to_vec();
        let frozen: Vec<S> = circulation
            .iter()
            .map(|g| S::constant(g.value()))
            .collect();
        Ok(self.evaluate(inputs, system, circulation, &frozen))
    }

    /// Assembles the influence matrix and right-hand side.
    ///
    /// # Errors
    ///
    /// Returns an error if the flow state cannot be solved.
    pub fn assemble(&self, inputs: &Inputs<S>) -> Result<System<S>, SolveError> {
        self.check_inputs(inputs)?;

        let normals = self.normals(inputs);
        let onset = self.onset(inputs);
        let n = self.panels.len();

        let mut matrix = Array2::from_elem((n, n), S::zero());
        let mut rhs = Array1::from_elem(n, S::zero());
        for (i, (panel, &normal)) in self.panels.iter().zip(&normals).enumerate() {
            let point = panel.collocation;
            for (j, vortex) in self.panels.iter().enumerate() {
                matrix[[i, j]] = dot(self.horseshoe(point, vortex, false), normal);
            }
            rhs[i] = -dot(onset.at(point), normal);
        }

        Ok(System {
            normals,
            matrix,
            rhs,
        })
    }

    /// Evaluates forces, loads, and pressures for a given circulation.
    ///
    /// `frozen` is the circulation used for the system residual; pass the
    /// solved circulation as constants to get the residual's partial
    /// derivatives at fixed state.
    #[must_use]
    pub fn evaluate(
        &self,
        inputs: &Inputs<S>,
        system: System<S>,
        circulation: Vec<S>,
        frozen: &[S],
    ) -> Solution<S> {
        let forces = self.panel_forces(inputs, &circulation);
        let loads = Loads {
            coefficients: self.coefficients(inputs, &forces),
            wings: self.span_loads(inputs, &forces),
            rotors: Vec::new(),
            residual: linear::residual(&system.matrix, &Array1::from(frozen.to_vec()), &system.rhs)
                .iter()
                .map(|&r| -r)
                .collect(),
        };
        let nodal_pressures = self.nodal_pressures(inputs, &system.normals, &forces);

        Solution {
            system,
            circulation,
            loads,
            nodal_pressures,
        }
    }

    fn check_inputs(&self, inputs: &Inputs<S>) -> Result<(), SolveError> {
        let mach = inputs.mach.value();
        if !mach.is_finite() || mach < 0.0 {
            return Err(SolveError::InvalidInput(format!("invalid Mach number {mach}")));
        }
        if mach >= 1.0 {
            return Err(SolveError::Singular(format!(
                "Prandtl–Glauert correction is singular at Mach {mach}"
            )));
        }
        if !(inputs.vinf.value() > 0.0) || !(inputs.density.value() > 0.0) {
            return Err(SolveError::InvalidInput(
                "freestream speed and density must be positive".into(),
            ));
        }
        if inputs.controls.len() != self.mesh.control_groups().len() {
            return Err(SolveError::SizeMismatch {
                what: "control deflections",
                expected: self.mesh.control_groups().len(),
                actual: inputs.controls.len(),
            });
        }
        Ok(())
    }

    /// Panel normals rotated about each control group's hinge.
    fn normals(&self, inputs: &Inputs<S>) -> Vec<Vec3<S>> {
        let mut normals: Vec<Vec3<S>> = self.panels.iter().map(|p| p.normal).collect();
        for (group, &delta) in self.mesh.control_groups().iter().zip(&inputs.controls) {
            let axis: Vec3<S> = vector::constant(group.hinge_axis());
            let (sin, cos) = (delta.sin(), delta.cos());
            for &panel in &group.panels {
                let n = normals[panel];
                // Rodrigues' rotation.
                normals[panel] = add(
                    add(scale(n, cos), scale(cross(axis, n), sin)),
                    scale(axis, dot(axis, n) * (S::one() - cos)),
                );
            }
        }
        normals
    }

    fn onset(&self, inputs: &Inputs<S>) -> Onset<S> {
        let reference = &self.config.reference;
        let v = inputs.vinf;
        let (sa, ca) = (inputs.alpha.sin(), inputs.alpha.cos());
        let (sb, cb) = (inputs.beta.sin(), inputs.beta.cos());
        let two_v = v * 2.0;
        Onset {
            freestream: [v * ca * cb, -(v * sb), v * sa * cb],
            omega: [
                inputs.roll_rate * two_v / reference.bref,
                inputs.pitch_rate * two_v / reference.cref,
                inputs.yaw_rate * two_v / reference.bref,
            ],
            center: vector::constant(reference.cg),
        }
    }

    /// Velocity at `point` induced by a unit-strength horseshoe and its
    /// mirror image when symmetry is on.
    fn horseshoe(&self, point: Vec3<S>, vortex: &Panel<S>, trailing_only: bool) -> Vec3<S> {
        let core = self.config.core_radius;
        let mut velocity = horseshoe(point, vortex.a, vortex.b, core, trailing_only);
        if self.config.symmetry {
            // Reflection flips orientation, so the image runs starboard to port.
            let image = horseshoe(
                point,
                mirror(vortex.b),
                mirror(vortex.a),
                core,
                trailing_only,
            );
            velocity = add(velocity, image);
        }
        velocity
    }

    /// Kutta–Joukowski force on each bound segment, newtons.
    ///
    /// The local velocity excludes bound-vortex induction, so induced drag
    /// comes from the trailing-leg downwash alone.
    fn panel_forces(&self, inputs: &Inputs<S>, circulation: &[S]) -> Vec<Vec3<S>> {
        let onset = self.onset(inputs);
        self.panels
            .iter()
            .zip(circulation)
            .map(|(panel, &gamma)| {
                let point = panel.midpoint();
                let induced = self.panels.iter().zip(circulation).fold(
                    vector::zero(),
                    |sum, (vortex, &strength)| {
                        add(sum, scale(self.horseshoe(point, vortex, true), strength))
                    },
                );
                let velocity = add(onset.at(point), induced);
                scale(cross(velocity, sub(panel.b, panel.a)), inputs.density * gamma)
            })
            .collect()
    }

    /// `1 / (q∞·β)`, the Prandtl–Glauert-corrected inverse dynamic pressure.
    fn pressure_scale(inputs: &Inputs<S>) -> S {
        let q = inputs.density * inputs.vinf * inputs.vinf * 0.5;
        let beta = (S::one() - inputs.mach * inputs.mach).sqrt();
        (q * beta).recip()
    }

    fn coefficients(&self, inputs: &Inputs<S>, forces: &[Vec3<S>]) -> Coefficients<S> {
        let reference = &self.config.reference;
        let center: Vec3<S> = vector::constant(reference.cg);

        let mut force = vector::zero();
        let mut moment = vector::zero();
        for (panel, &f) in self.panels.iter().zip(forces) {
            force = add(force, f);
            moment = add(moment, cross(sub(panel.midpoint(), center), f));
        }
        if self.config.symmetry {
            force = [force[0] * 2.0, S::zero(), force[2] * 2.0];
            moment = [S::zero(), moment[1] * 2.0, S::zero()];
        }

        let scale_force = Self::pressure_scale(inputs) / reference.sref;
        let cf = scale(force, scale_force);
        let cm = [
            moment[0] * scale_force / reference.bref,
            moment[1] * scale_force / reference.cref,
            moment[2] * scale_force / reference.bref,
        ];

        let axes = WindAxes::new(inputs.alpha, inputs.beta);
        let cd = dot(cf, axes.drag);
        let cdo = self.skin_friction(inputs);
        // Upstream, side and downward axes form a right-handed wind frame.
        let wind_moment = |axis: Vec3<S>, length: f64| dot(moment, axis) * scale_force / length;

        Coefficients {
            cfx: cf[0],
            cfy: cf[1],
            cfz: cf[2],
            cmx: cm[0],
            cmy: cm[1],
            cmz: cm[2],
            cl: dot(cf, axes.lift),
            cd,
            cs: dot(cf, axes.side),
            cdo,
            cdt: cd + cdo,
            cml: -wind_moment(axes.drag, reference.bref),
            cmm: wind_moment(axes.side, reference.cref),
            cmn: -wind_moment(axes.lift, reference.bref),
        }
    }

    /// Flat-plate turbulent skin friction, `0.455 / (log₁₀ Re)^2.58`, over
    /// both sides of every panel. Zero without a Reynolds number.
    fn skin_friction(&self, inputs: &Inputs<S>) -> S {
        if !(inputs.recref.value() > 1.0) {
            return S::zero();
        }
        let mut wetted = self
            .panels
            .iter()
            .fold(S::zero(), |sum, panel| sum + panel.area * 2.0);
        if self.config.symmetry {
            wetted *= S::constant(2.0);
        }
        let log_re = inputs.recref.ln() / LN_10;
        log_re.powf(-2.58) * 0.455 * wetted / self.config.reference.sref
    }

    fn span_loads(&self, inputs: &Inputs<S>, forces: &[Vec3<S>]) -> Vec<SpanLoad<S>> {
        let axes = WindAxes::new(inputs.alpha, inputs.beta);
        let scale_strip = Self::pressure_scale(inputs) / self.config.reference.cref;

        self.mesh
            .patches()
            .iter()
            .map(|patch| {
                let mut load = SpanLoad { cl_c: Vec::new(), cx: Vec::new(), cy: Vec::new(), cz: Vec::new() };
                for j in 0..patch.spanwise() {
                    let first = &self.panels[patch.panel(0, j)];
                    let span = sub(first.b, first.a);
                    let width = (span[1] * span[1] + span[2] * span[2]).sqrt();
                    let strip = (0..patch.chordwise())
                        .fold(vector::zero(), |sum, i| add(sum, forces[patch.panel(i, j)]));
                    let c = scale(strip, scale_strip / width);

                    load.cl_c.push(dot(c, axes.lift));
                    load.cx.push(c[0]);
                    load.cy.push(c[1]);
                    load.cz.push(c[2]);
                }
                load
            })
            .collect()
    }

    /// Pressure-jump coefficient `ΔCp = F·n / (q∞·β·area)` per panel,
    /// averaged onto nodes.
    fn nodal_pressures(
        &self,
        inputs: &Inputs<S>,
        normals: &[Vec3<S>],
        forces: &[Vec3<S>],
    ) -> Vec<S> {
        let scale_pressure = Self::pressure_scale(inputs);
        let panel_cp: Vec<S> = self
            .panels
            .iter()
            .zip(normals)
            .zip(forces)
            .map(|((panel, &n), &f)| dot(f, n) * scale_pressure / panel.area)
            .collect();

        let mut nodal = vec![S::zero(); self.mesh.node_count()];
        for patch in self.mesh.patches() {
            let (nc, ns) = (patch.chordwise(), patch.spanwise());
            for j in 0..=ns {
                for i in 0..=nc {
                    let mut sum = S::zero();
                    let mut count = 0_u32;
                    for pj in j.saturating_sub(1)..=j.min(ns - 1) {
                        for pi in i.saturating_sub(1)..=i.min(nc - 1) {
                            sum += panel_cp[patch.panel(pi, pj)];
                            count += 1;
                        }
                    }
                    nodal[patch.node(i, j)] = sum / f64::from(count);
                }
            }
        }
        nodal
    }
}

/// Unit horseshoe from port point `a` to starboard point `b`, with trailing
/// legs to downstream infinity.
fn horseshoe<S: Scalar>(
    point: Vec3<S>,
    a: Vec3<S>,
    b: Vec3<S>,
    core: f64,
    trailing_only: bool,
) -> Vec3<S> {
    let trailing = sub(
        semi_infinite(point, b, core),
        semi_infinite(point, a, core),
    );
    if trailing_only {
        trailing
    } else {
        add(trailing, segment(point, a, b, core))
    }
}

/// Biot–Savart velocity of a unit segment `a → b`.
fn segment<S: Scalar>(point: Vec3<S>, a: Vec3<S>, b: Vec3<S>, core: f64) -> Vec3<S> {
    let r1 = sub(point, a);
    let r2 = sub(point, b);
    let r0 = sub(b, a);
    let c = cross(r1, r2);
    let c2 = dot(c, c);
    let (n1, n2) = (norm(r1), norm(r2));

    if c2.value() <= core * core * dot(r0, r0).value() || n1.value() <= core || n2.value() <= core
    {
        return vector::zero();
    }

    let k = dot(r0, sub(scale(r1, n1.recip()), scale(r2, n2.recip()))) / (c2 * FOUR_PI);
    scale(c, k)
}

/// Velocity of a unit semi-infinite filament leaving `start` downstream.
fn semi_infinite<S: Scalar>(point: Vec3<S>, start: Vec3<S>, core: f64) -> Vec3<S> {
    let u: Vec3<S> = vector::constant(DOWNSTREAM);
    let r = sub(point, start);
    let length = norm(r);
    let c = cross(u, r);

    if dot(c, c).value() <= core * core || length.value() <= core {
        return vector::zero();
    }

    let k = (length * (length - dot(u, r)) * FOUR_PI).recip();
    scale(c, k)
}

#[cfg(test)]
mod tests {
    use super::*;

    use aerograd_core::tape::Tape;
    use approx::assert_relative_eq;

    use crate::{Reference, mesh::PlanarWing};

    fn wing_mesh(mirrored: bool) -> Mesh {
        Mesh::from_wing(&PlanarWing {
            span: 8.0,
            chordwise: 2,
            spanwise: if mirrored { 8 } else { 4 },
            mirrored,
            ..PlanarWing::default()
        })
        .expect("valid wing")
    }

    fn config(symmetry: bool) -> LatticeConfig {
        LatticeConfig {
            reference: Reference {
                sref: 8.0,
                cref: 1.0,
                bref: 8.0,
                cg: [0.25, 0.0, 0.0],
            },
            symmetry,
            ..LatticeConfig::default()
        }
    }

    fn point(alpha_deg: f64) -> OperatingPoint {
        OperatingPoint {
            alpha: alpha_deg.to_radians(),
            ..OperatingPoint::default()
        }
    }

    fn solve(mesh: &Mesh, config: &LatticeConfig, point: &OperatingPoint) -> Solution<f64> {
        let lattice = Lattice::<f64>::on_mesh(mesh, config);
        let inputs = Inputs::constant(point, mesh).expect("inputs");
        lattice.solve(&inputs).expect("solve")
    }

    #[test]
    fn unit_segment_matches_infinite_line_limit() {
        // A long segment approximates an infinite line: |V| = 1 / (2π h).
        let v = segment([0.0, 0.0, 1.0], [0.0, -1e4, 0.0], [0.0, 1e4, 0.0], 1e-8);
        assert_relative_eq!(v[0], 1.0 / (2.0 * PI), max_relative = 1e-6);
        assert_relative_eq!(v[2], 0.0);
    }

    #[test]
    fn semi_infinite_leg_is_half_a_line_at_its_start() {
        let v = semi_infinite([0.0, 1.0, 0.0], [0.0; 3], 1e-8);
        assert_relative_eq!(v[2], 1.0 / (4.0 * PI), max_relative = 1e-12);
    }

    #[test]
    fn flat_wing_lift_is_positive_and_moderate() {
        let mesh = wing_mesh(true);
        let solution = solve(&mesh, &config(false), &point(5.0));
        let c = solution.loads.coefficients;

        // Aspect ratio 8: lifting-line slope ≈ 2π·AR/(AR + 2) ≈ 5.0 per radian.
        let slope = c.cl / 5.0_f64.to_radians();
        assert!(slope > 4.0 && slope < 5.6, "lift slope {slope}");
        assert!(c.cd > 0.0);
        assert_relative_eq!(c.cfy, 0.0, epsilon = 1e-12);
        assert_relative_eq!(c.cdt, c.cd);
    }

    #[test]
    fn symmetric_half_wing_matches_full_wing() {
        let full = solve(&wing_mesh(true), &config(false), &point(4.0));
        let half = solve(&wing_mesh(false), &config(true), &point(4.0));

        let (f, h) = (full.loads.coefficients, half.loads.coefficients);
        assert_relative_eq!(f.cl, h.cl, max_relative = 1e-10);
        assert_relative_eq!(f.cd, h.cd, max_relative = 1e-8);
        assert_relative_eq!(f.cmy, h.cmy, max_relative = 1e-8);
    }

    #[test]
    fn residual_vanishes_at_the_solution() {
        let mesh = wing_mesh(true);
        let solution = solve(&mesh, &config(false), &point(3.0));

        assert_eq!(solution.loads.residual.len(), mesh.panel_count());
        for r in &solution.loads.residual {
            assert!(r.abs() < 1e-10);
        }
    }

    #[test]
    fn span_load_peaks_at_midspan() {
        let mesh = wing_mesh(true);
        let solution = solve(&mesh, &config(false), &point(5.0));
        let load = &solution.loads.wings[0].cl_c;

        assert_eq!(load.len(), 8);
        assert!(load[3] > load[0]);
        assert_relative_eq!(load[3], load[4], max_relative = 1e-10);
        assert_relative_eq!(load[0], load[7], max_relative = 1e-10);
    }

    #[test]
    fn skin_friction_uses_reynolds_number() {
        let mesh = wing_mesh(true);
        let mut p = point(2.0);
        p.recref = 1e6;
        let c = solve(&mesh, &config(false), &p).loads.coefficients;

        // Wetted area 16 m² over sref 8 m².
        let expected = 0.455 / 6.0_f64.powf(2.58) * 2.0;
        assert_relative_eq!(c.cdo, expected, max_relative = 1e-12);
        assert_relative_eq!(c.cdt, c.cd + c.cdo);
    }

    #[test]
    fn wind_axis_moments_rotate_body_moments_by_alpha() {
        let mesh = wing_mesh(true);
        let mut p = point(6.0);
        p.roll_rate = 0.1;
        p.yaw_rate = 0.05;
        let c = solve(&mesh, &config(false), &p).loads.coefficients;
        let (sa, ca) = p.alpha.sin_cos();

        assert!(c.cmx.abs() > 1e-6, "roll rate produces a rolling moment");
        assert_relative_eq!(c.cml, -(c.cmx * ca + c.cmz * sa), max_relative = 1e-10);
        assert_relative_eq!(c.cmm, c.cmy, max_relative = 1e-10);
        assert_relative_eq!(c.cmn, c.cmx * sa - c.cmz * ca, max_relative = 1e-10);
    }

    #[test]
    fn supersonic_mach_is_singular() {
        let mesh = wing_mesh(true);
        let config = config(false);
        let lattice = Lattice::<f64>::on_mesh(&mesh, &config);
        let mut p = point(2.0);
        p.mach = 1.2;
        let inputs = Inputs::constant(&p, &mesh).expect("inputs");

        assert!(matches!(lattice.solve(&inputs), Err(SolveError::Singular(_))));
    }

    #[test]
    fn taped_lattice_matches_plain_lattice() {
        let mesh = wing_mesh(true);
        let config = config(false);
        let p = point(3.0);
        let plain = solve(&mesh, &config, &p);

        let tape = Tape::new();
        let nodes: Vec<_> = mesh.nodes().iter().map(|&n| n.map(|c| tape.var(c))).collect();
        let lattice = Lattice::new(&mesh, &config, &nodes).expect("lattice");
        let taped = lattice
            .solve(&Inputs::constant(&p, &mesh).expect("inputs"))
            .expect("solve");

        assert_relative_eq!(
            taped.loads.coefficients.cl.value(),
            plain.loads.coefficients.cl,
            max_relative = 1e-14
        );
        assert!(tape.len() > mesh.node_count() * 3);
    }

    #[test]
    fn pitch_rate_changes_lift_and_moment() {
        let mesh = wing_mesh(true);
        let base = solve(&mesh, &config(false), &point(2.0)).loads.coefficients;
        let mut p = point(2.0);
        p.pitch_rate = 0.05;
        let pitched = solve(&mesh, &config(false), &p).loads.coefficients;

        assert!((pitched.cl - base.cl).abs() > 1e-4);
        assert!((pitched.cmy - base.cmy).abs() > 1e-5);
    }
}
