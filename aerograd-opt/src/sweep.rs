//! Stability and control derivatives by finite differencing across cases.
//!
//! Each case is solved at its baseline, then once (forward differencing) or
//! twice (central differencing) per requested axis. When paired with an
//! adjoint solver, exact derivatives of every coefficient are stored in a
//! separate table; the two are never reconciled.

use std::fmt;

use aerograd_core::{
    AdjointSolver, Coefficient, Coefficients, FlowSolver, Functional, InputVariable, OperatingPoint,
};
use serde::Deserialize;
use uom::si::{
    angle::{degree, radian},
    f64::Angle,
};

use crate::{
    Error,
    case::{Case, CaseList},
    trim::{TrimConfig, trim},
};

/// An input the sweep differentiates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Alpha,
    Beta,
    Mach,
    /// Non-dimensional roll rate.
    P,
    /// Non-dimensional pitch rate.
    Q,
    /// Non-dimensional yaw rate.
    R,
    /// Deflection of one control-surface group (0-based).
    Control(usize),
}

impl Axis {
    #[must_use]
    pub fn variable(self) -> InputVariable {
        match self {
            Self::Alpha => InputVariable::Alpha,
            Self::Beta => InputVariable::Beta,
            Self::Mach => InputVariable::Mach,
            Self::P => InputVariable::RollRate,
            Self::Q => InputVariable::PitchRate,
            Self::R => InputVariable::YawRate,
            Self::Control(group) => InputVariable::Control(group),
        }
    }

    /// Returns `true` for axes measured in angle units.
    #[must_use]
    pub fn is_angle(self) -> bool {
        matches!(self, Self::Alpha | Self::Beta | Self::Control(_))
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.variable())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Differencing {
    /// `(f(x + δ) − f(x)) / δ`.
    #[default]
    Forward,
    /// `(f(x + δ) − f(x − δ)) / 2δ`.
    Central,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepConfig {
    pub delta_alpha: Angle,
    pub delta_beta: Angle,
    pub delta_mach: f64,
    pub delta_p: f64,
    pub delta_q: f64,
    pub delta_r: f64,
    pub delta_control: Angle,
    pub axes: Vec<Axis>,
    pub differencing: Differencing,
    /// Also compute exact derivatives with the adjoint solver.
    pub adjoint: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            delta_alpha: Angle::new::<degree>(1.0),
            delta_beta: Angle::new::<degree>(1.0),
            delta_mach: 0.01,
            delta_p: 0.01,
            delta_q: 0.01,
            delta_r: 0.01,
            delta_control: Angle::new::<degree>(1.0),
            axes: vec![Axis::Alpha, Axis::Beta, Axis::Mach, Axis::P, Axis::Q, Axis::R],
            differencing: Differencing::Forward,
            adjoint: false,
        }
    }
}

impl SweepConfig {
    /// Step along an axis, in radians for angles.
    #[must_use]
    pub fn delta(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Alpha => self.delta_alpha.get::<radian>(),
            Axis::Beta => self.delta_beta.get::<radian>(),
            Axis::Mach => self.delta_mach,
            Axis::P => self.delta_p,
            Axis::Q => self.delta_q,
            Axis::R => self.delta_r,
            Axis::Control(_) => self.delta_control.get::<radian>(),
        }
    }

    /// Checks every requested delta and control group.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] for a zero or non-finite delta
    /// or a control group the solver does not have.
    pub fn validate(&self, control_groups: usize) -> Result<(), Error> {
        for &axis in &self.axes {
            let delta = self.delta(axis);
            if delta == 0.0 || !delta.is_finite() {
                return Err(Error::invalid(format!(
                    "sweep delta for {axis} must be nonzero and finite (got {delta})"
                )));
            }
            if let Axis::Control(group) = axis {
                if group >= control_groups {
                    return Err(Error::invalid(format!(
                        "sweep axis {axis} names a missing control group ({control_groups} defined)"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Derivatives of every coefficient with respect to the swept axes, per radian.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DerivativeRow {
    entries: Vec<(Axis, Coefficients<f64>)>,
}

impl DerivativeRow {
    /// `∂coefficient/∂axis`, or `None` if the axis was not swept.
    #[must_use]
    pub fn get(&self, axis: Axis, coefficient: Coefficient) -> Option<f64> {
        self.entries
            .iter()
            .find(|(a, _)| *a == axis)
            .map(|(_, d)| d.get(coefficient))
    }

    /// As [`DerivativeRow::get`], per degree for angle axes.
    #[must_use]
    pub fn per_degree(&self, axis: Axis, coefficient: Coefficient) -> Option<f64> {
        let scale = if axis.is_angle() {
            Angle::new::<degree>(1.0).get::<radian>()
        } else {
            1.0
        };
        self.get(axis, coefficient).map(|d| d * scale)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Axis, Coefficients<f64>)> {
        self.entries.iter()
    }
}

/// Results of one sweep, all indexed by case.
#[derive(Debug, Clone, PartialEq, Default)]
struct Tables {
    points: Vec<OperatingPoint>,
    coefficients: Vec<Coefficients<f64>>,
    objective: Vec<f64>,
    derivatives: Vec<DerivativeRow>,
    adjoint: Option<Vec<DerivativeRow>>,
}

/// Owns the case list and the tables derived from it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CaseSweep {
    cases: CaseList,
    config: SweepConfig,
    tables: Tables,
}

impl CaseSweep {
    #[must_use]
    pub fn new(cases: CaseList, config: SweepConfig) -> Self {
        Self {
            cases,
            config,
            tables: Tables::default(),
        }
    }

    #[must_use]
    pub fn cases(&self) -> &CaseList {
        &self.cases
    }

    #[must_use]
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Replaces the sweep settings and drops the existing tables.
    pub fn set_config(&mut self, config: SweepConfig) {
        self.config = config;
        self.tables = Tables::default();
    }

    /// Appends a case and returns its 1-based index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`] when the list is full.
    pub fn push_case(&mut self, case: Case) -> Result<usize, Error> {
        self.cases.push(case)
    }

    /// Solves every case and rebuilds all tables.
    ///
    /// `objective` is evaluated at each baseline for
    /// [`CaseSweep::optimization_function_for_case`]. With `trim`, each
    /// baseline is first trimmed and derivatives are taken about the trimmed
    /// angle. On failure the previous tables are kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] before any solve for invalid
    /// deltas or a missing adjoint, and propagates solve failures.
    pub fn run<F, A>(
        &mut self,
        forward: &mut F,
        adjoint: Option<&mut A>,
        objective: &Functional,
        trim_config: Option<&TrimConfig>,
    ) -> Result<(), Error>
    where
        F: FlowSolver,
        A: AdjointSolver,
    {
        self.config.validate(forward.control_group_count())?;
        if let Some(trim_config) = trim_config {
            trim_config.validate().map_err(Error::invalid)?;
        }
        let mut adjoint = match (self.config.adjoint, adjoint) {
            (true, None) => {
                return Err(Error::invalid(
                    "adjoint pairing requested without an adjoint solver",
                ));
            }
            (true, Some(adjoint)) => Some(adjoint),
            (false, _) => None,
        };

        log::info!(
            "sweeping {} cases over {} axes ({:?} differencing)",
            self.cases.len(),
            self.config.axes.len(),
            self.config.differencing,
        );

        let mut tables = Tables {
            adjoint: adjoint.is_some().then(Vec::new),
            ..Tables::default()
        };
        for (n, case) in self.cases.iter().enumerate() {
            let mut point = case.operating_point();
            point.controls.resize(forward.control_group_count(), 0.0);

            let loads = match trim_config {
                Some(trim_config) => {
                    let trimmed = trim(forward, &point, trim_config)?;
                    point = trimmed.point;
                    trimmed.loads
                }
                None => forward.solve(&point)?,
            };
            let value = loads.evaluate(objective)?.first().copied().unwrap_or_default();
            log::debug!(
                "case {}: CL = {:.6}, objective = {value:.6}",
                n + 1,
                loads.coefficients.cl
            );

            let derivatives = self.difference(forward, &point, &loads.coefficients, n + 1)?;
            if let (Some(adjoint), Some(rows)) = (adjoint.as_deref_mut(), tables.adjoint.as_mut()) {
                rows.push(self.exact(adjoint, &point)?);
            }

            tables.points.push(point);
            tables.coefficients.push(loads.coefficients);
            tables.objective.push(value);
            tables.derivatives.push(derivatives);
        }

        self.tables = tables;
        Ok(())
    }

    fn difference<F: FlowSolver>(
        &self,
        forward: &mut F,
        point: &OperatingPoint,
        baseline: &Coefficients<f64>,
        case: usize,
    ) -> Result<DerivativeRow, Error> {
        let mut entries = Vec::with_capacity(self.config.axes.len());
        for &axis in &self.config.axes {
            let delta = self.config.delta(axis);
            let plus = forward
                .solve(&shifted(point, axis, delta)?)?
                .coefficients;
            let (minus, span) = match self.config.differencing {
                Differencing::Forward => (*baseline, delta),
                Differencing::Central => (
                    forward.solve(&shifted(point, axis, -delta)?)?.coefficients,
                    2.0 * delta,
                ),
            };
            log::debug!(
                "case {case}: d(CL)/d({axis}) = {:.6}",
                (plus.cl - minus.cl) / span
            );
            entries.push((axis, slope(&plus, &minus, span)));
        }
        Ok(DerivativeRow { entries })
    }

    fn exact<A: AdjointSolver>(
        &self,
        adjoint: &mut A,
        point: &OperatingPoint,
    ) -> Result<DerivativeRow, Error> {
        let mut by_coefficient = Vec::with_capacity(Coefficient::ALL.len());
        for coefficient in Coefficient::ALL {
            let functional = Functional::new(coefficient.into());
            by_coefficient.push(adjoint.sensitivities(point, &functional, &[1.0])?);
        }

        let mut entries = Vec::with_capacity(self.config.axes.len());
        for &axis in &self.config.axes {
            let values = by_coefficient
                .iter()
                .map(|sensitivity| {
                    sensitivity.input(axis.variable()).ok_or_else(|| {
                        Error::invalid(format!("adjoint reports no sensitivity to {axis}"))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            entries.push((axis, Coefficients::from_fn(|c| values[c.index()])));
        }
        Ok(DerivativeRow { entries })
    }

    fn row<'a, T>(&self, table: &'a [T], case: usize) -> Result<&'a T, Error> {
        case.checked_sub(1)
            .and_then(|i| table.get(i))
            .ok_or(Error::IndexOutOfRange {
                what: "swept case",
                index: case,
                len: table.len(),
            })
    }

    /// Raw coefficients of a case (1-based) from the last run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if the case was not swept.
    pub fn coefficients_for_case(&self, case: usize) -> Result<&Coefficients<f64>, Error> {
        self.row(&self.tables.coefficients, case)
    }

    /// First objective value at a case's baseline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if the case was not swept.
    pub fn optimization_function_for_case(&self, case: usize) -> Result<f64, Error> {
        self.row(&self.tables.objective, case).copied()
    }

    /// The baseline a case was differenced about, trimmed if trim was on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if the case was not swept.
    pub fn baseline_for_case(&self, case: usize) -> Result<&OperatingPoint, Error> {
        self.row(&self.tables.points, case)
    }

    /// Finite-difference derivatives of a case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if the case was not swept.
    pub fn derivatives_for_case(&self, case: usize) -> Result<&DerivativeRow, Error> {
        self.row(&self.tables.derivatives, case)
    }

    /// Adjoint derivatives of a case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PrecursorMissing`] if the last run was not paired
    /// with the adjoint, or [`Error::IndexOutOfRange`] for an unknown case.
    pub fn adjoint_derivatives_for_case(&self, case: usize) -> Result<&DerivativeRow, Error> {
        let rows = self.tables.adjoint.as_ref().ok_or(Error::PrecursorMissing {
            operation: "adjoint derivatives",
            missing: "a sweep paired with the adjoint",
        })?;
        self.row(rows, case)
    }

    /// Finite-difference `∂coefficient/∂axis` of a case, per radian.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] for an unknown case and
    /// [`Error::InvalidConfiguration`] for an axis that was not swept.
    pub fn derivative(&self, case: usize, axis: Axis, coefficient: Coefficient) -> Result<f64, Error> {
        self.derivatives_for_case(case)?
            .get(axis, coefficient)
            .ok_or_else(|| not_swept(axis))
    }

    /// As [`CaseSweep::derivative`], per degree for angle axes.
    ///
    /// # Errors
    ///
    /// Same as [`CaseSweep::derivative`].
    pub fn derivative_per_degree(
        &self,
        case: usize,
        axis: Axis,
        coefficient: Coefficient,
    ) -> Result<f64, Error> {
        self.derivatives_for_case(case)?
            .per_degree(axis, coefficient)
            .ok_or_else(|| not_swept(axis))
    }

    /// Adjoint `∂coefficient/∂axis` of a case, per radian.
    ///
    /// # Errors
    ///
    /// As [`CaseSweep::adjoint_derivatives_for_case`], plus
    /// [`Error::InvalidConfiguration`] for an axis that was not swept.
    pub fn adjoint_derivative(
        &self,
        case: usize,
        axis: Axis,
        coefficient: Coefficient,
    ) -> Result<f64, Error> {
        self.adjoint_derivatives_for_case(case)?
            .get(axis, coefficient)
            .ok_or_else(|| not_swept(axis))
    }

    /// Number of cases in the last completed run.
    #[must_use]
    pub fn swept_cases(&self) -> usize {
        self.tables.coefficients.len()
    }
}

fn not_swept(axis: Axis) -> Error {
    Error::invalid(format!("axis {axis} was not swept"))
}

fn shifted(point: &OperatingPoint, axis: Axis, delta: f64) -> Result<OperatingPoint, Error> {
    point
        .perturbed(axis.variable(), delta)
        .ok_or_else(|| Error::invalid(format!("cannot perturb {axis}")))
}

fn slope(plus: &Coefficients<f64>, minus: &Coefficients<f64>, span: f64) -> Coefficients<f64> {
    Coefficients::from_fn(|c| (plus.get(c) - minus.get(c)) / span)
}

#[cfg(test)]
mod tests {
    use super::*;

    use aerograd_core::FunctionKind;
    use aerograd_vlm::{
        AdjointVlm, ControlGroup, ForwardVlm, LatticeConfig, Mesh, PlanarWing, Reference,
        solver_pair,
    };
    use approx::assert_relative_eq;

    fn pair() -> (ForwardVlm, AdjointVlm) {
        let mut mesh = Mesh::from_wing(&PlanarWing {
            span: 6.0,
            chordwise: 2,
            spanwise: 6,
            ..PlanarWing::default()
        })
        .expect("valid wing");
        let panels = (0..3).map(|j| mesh.patches()[0].panel(1, j)).collect();
        mesh.add_control_group(ControlGroup::new("flap", panels, [0.0, 1.0, 0.0]))
            .expect("valid group");

        let config = LatticeConfig {
            reference: Reference {
                sref: 6.0,
                cref: 1.0,
                bref: 6.0,
                cg: [0.25, 0.0, 0.0],
            },
            ..LatticeConfig::default()
        };
        solver_pair(mesh, config)
    }

    fn cases() -> CaseList {
        let mut cases = CaseList::new();
        cases
            .push(Case::new(
                0.3,
                Angle::new::<degree>(3.0),
                Angle::new::<degree>(0.0),
            ))
            .expect("room for one case");
        cases
    }

    fn lift() -> Functional {
        Functional::new(FunctionKind::Cl)
    }

    #[test]
    fn central_differences_agree_with_the_adjoint() {
        let (mut forward, mut adjoint) = pair();
        let config = SweepConfig {
            delta_alpha: Angle::new::<degree>(0.01),
            delta_control: Angle::new::<degree>(0.01),
            axes: vec![Axis::Alpha, Axis::Q, Axis::Control(0)],
            differencing: Differencing::Central,
            adjoint: true,
            ..SweepConfig::default()
        };
        let mut sweep = CaseSweep::new(cases(), config);

        sweep
            .run(&mut forward, Some(&mut adjoint), &lift(), None)
            .expect("sweep runs");

        for axis in [Axis::Alpha, Axis::Q, Axis::Control(0)] {
            for coefficient in [Coefficient::Cl, Coefficient::Cmy] {
                let fd = sweep.derivative(1, axis, coefficient).expect("swept");
                let exact = sweep.adjoint_derivative(1, axis, coefficient).expect("paired");
                assert_relative_eq!(fd, exact, max_relative = 1e-5, epsilon = 1e-8);
            }
        }
        assert!(sweep.derivative(1, Axis::Alpha, Coefficient::Cl).expect("swept") > 0.0);
    }

    #[test]
    fn lateral_derivatives_of_wind_axis_moments_agree_with_the_adjoint() {
        let (mut forward, mut adjoint) = pair();
        let config = SweepConfig {
            delta_beta: Angle::new::<degree>(0.01),
            delta_p: 1e-4,
            axes: vec![Axis::Beta, Axis::P],
            differencing: Differencing::Central,
            adjoint: true,
            ..SweepConfig::default()
        };
        let mut sweep = CaseSweep::new(cases(), config);

        sweep
            .run(&mut forward, Some(&mut adjoint), &lift(), None)
            .expect("sweep runs");

        for axis in [Axis::Beta, Axis::P] {
            for coefficient in [
                Coefficient::Cml,
                Coefficient::Cmm,
                Coefficient::Cmn,
                Coefficient::Cdt,
            ] {
                let fd = sweep.derivative(1, axis, coefficient).expect("swept");
                let exact = sweep.adjoint_derivative(1, axis, coefficient).expect("paired");
                assert_relative_eq!(fd, exact, max_relative = 1e-5, epsilon = 1e-8);
            }
        }
        // Roll damping.
        assert!(sweep.derivative(1, Axis::P, Coefficient::Cml).expect("swept").abs() > 1e-3);
    }

    #[test]
    fn forward_differences_tighten_as_the_step_shrinks() {
        let (mut forward, mut adjoint) = pair();
        let mut errors = Vec::new();

        for step in [4.0, 1.0, 0.25] {
            let config = SweepConfig {
                delta_alpha: Angle::new::<degree>(step),
                axes: vec![Axis::Alpha],
                adjoint: true,
                ..SweepConfig::default()
            };
            let mut sweep = CaseSweep::new(cases(), config);
            sweep
                .run(&mut forward, Some(&mut adjoint), &lift(), None)
                .expect("sweep runs");

            let fd = sweep.derivative(1, Axis::Alpha, Coefficient::Cd).expect("swept");
            let exact = sweep
                .adjoint_derivative(1, Axis::Alpha, Coefficient::Cd)
                .expect("paired");
            errors.push((fd - exact).abs());
        }

        assert!(errors[1] < errors[0]);
        assert!(errors[2] < errors[1]);
    }

    #[test]
    fn tables_hold_baseline_coefficients_and_objective() {
        let (mut forward, _) = pair();
        let mut sweep = CaseSweep::new(
            cases(),
            SweepConfig {
                axes: vec![Axis::Alpha, Axis::Beta],
                ..SweepConfig::default()
            },
        );

        sweep
            .run(&mut forward, None::<&mut AdjointVlm>, &lift(), None)
            .expect("sweep runs");

        let coefficients = sweep.coefficients_for_case(1).expect("swept");
        assert!(coefficients.cl > 0.0);
        assert_relative_eq!(
            sweep.optimization_function_for_case(1).expect("swept"),
            coefficients.cl
        );
        assert_relative_eq!(
            sweep
                .derivative_per_degree(1, Axis::Alpha, Coefficient::Cl)
                .expect("swept"),
            sweep.derivative(1, Axis::Alpha, Coefficient::Cl).expect("swept") * std::f64::consts::PI
                / 180.0,
            max_relative = 1e-12
        );
        assert!(matches!(
            sweep.derivative(1, Axis::Mach, Coefficient::Cl),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(matches!(
            sweep.coefficients_for_case(2),
            Err(Error::IndexOutOfRange { index: 2, len: 1, .. })
        ));
        assert!(matches!(
            sweep.adjoint_derivatives_for_case(1),
            Err(Error::PrecursorMissing { .. })
        ));
    }

    #[test]
    fn invalid_settings_fail_before_any_solve() {
        let (mut forward, mut adjoint) = pair();

        let mut sweep = CaseSweep::new(
            cases(),
            SweepConfig {
                delta_mach: 0.0,
                ..SweepConfig::default()
            },
        );
        let err = sweep
            .run(&mut forward, Some(&mut adjoint), &lift(), None)
            .expect_err("zero delta");
        assert!(matches!(err, Error::InvalidConfiguration(_)));
        assert_eq!(sweep.swept_cases(), 0);
        assert!(forward.right_hand_side().is_none());

        sweep.set_config(SweepConfig {
            axes: vec![Axis::Control(1)],
            ..SweepConfig::default()
        });
        let err = sweep
            .run(&mut forward, Some(&mut adjoint), &lift(), None)
            .expect_err("one control group");
        assert!(matches!(err, Error::InvalidConfiguration(_)));

        sweep.set_config(SweepConfig {
            adjoint: true,
            ..SweepConfig::default()
        });
        let err = sweep
            .run(&mut forward, None::<&mut AdjointVlm>, &lift(), None)
            .expect_err("no adjoint solver");
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }

    #[test]
    fn failed_run_keeps_previous_tables() {
        let (mut forward, _) = pair();
        let mut sweep = CaseSweep::new(
            cases(),
            SweepConfig {
                axes: vec![Axis::Alpha],
                ..SweepConfig::default()
            },
        );
        sweep
            .run(&mut forward, None::<&mut AdjointVlm>, &lift(), None)
            .expect("sweep runs");
        let before = *sweep.coefficients_for_case(1).expect("swept");

        sweep
            .push_case(Case::new(
                1.2,
                Angle::new::<degree>(0.0),
                Angle::new::<degree>(0.0),
            ))
            .expect("room for a second case");
        let err = sweep
            .run(&mut forward, None::<&mut AdjointVlm>, &lift(), None)
            .expect_err("supersonic case");
        assert!(matches!(err, Error::NumericalSingularity(_)));
        assert_eq!(sweep.swept_cases(), 1);
        assert_eq!(*sweep.coefficients_for_case(1).expect("kept"), before);
    }
}
