//! The optimization session: owns the solvers and objectives and keeps the
//! forward and adjoint results consistent with each other.

use aerograd_core::{
    AdjointSolver, FlowSolver, FunctionKind, OperatingPoint, Sensitivity,
};

use crate::{
    Error,
    case::Case,
    config::OptimizerConfig,
    function::ObjectiveFunction,
    motion::PitchHeave,
    query::{IndexBase, Query},
    sweep::{CaseSweep, SweepConfig},
    trim::{TrimConfig, trim},
};

/// Adjoint results of one objective.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveGradients {
    samples: Vec<Sensitivity>,
    mean: Sensitivity,
}

impl ObjectiveGradients {
    /// Gradient of the time-averaged objective.
    #[must_use]
    pub fn mean(&self) -> &Sensitivity {
        &self.mean
    }

    /// Gradient at one time sample (1-based).
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] for an unknown time sample.
    pub fn sample(&self, time: usize) -> Result<&Sensitivity, Error> {
        time.checked_sub(1)
            .and_then(|k| self.samples.get(k))
            .ok_or(Error::IndexOutOfRange {
                what: "time sample",
                index: time,
                len: self.samples.len(),
            })
    }
}

/// An optimization session over one forward and one adjoint solver.
///
/// Geometry and operating-point changes invalidate every result. A failed
/// solve leaves the objective buffers and any earlier gradients untouched.
#[derive(Debug)]
pub struct Optimizer<F, A> {
    forward: F,
    adjoint: A,
    case: Case,
    objectives: Vec<ObjectiveFunction>,
    unsteady: Option<PitchHeave>,
    trim: TrimConfig,
    index_base: IndexBase,
    sweep: CaseSweep,
    /// Objective buffers belong to the current geometry and operating point.
    values_current: bool,
    /// Time samples of the last forward solve, while the forward solver
    /// still holds that solution.
    solved: Option<Vec<OperatingPoint>>,
    gradients: Option<Vec<ObjectiveGradients>>,
}

impl<F: FlowSolver, A: AdjointSolver> Optimizer<F, A> {
    /// Validates the configuration against the solvers and sizes every
    /// objective.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] for an objective count outside
    /// `1..=max_objectives`, unknown wing or rotor ids, or time windows the
    /// unsteady settings cannot fill, and [`Error::SizeMismatch`] for more
    /// control deflections than control groups.
    pub fn setup(config: OptimizerConfig, forward: F, adjoint: A) -> Result<Self, Error> {
        let OptimizerConfig {
            case,
            objectives: entries,
            max_objectives,
            index_base,
            unsteady,
            trim,
            sweep,
            cases,
        } = config;

        if entries.is_empty() || entries.len() > max_objectives {
            return Err(Error::invalid(format!(
                "{} objectives requested, between 1 and {max_objectives} supported",
                entries.len()
            )));
        }
        if let Some(motion) = &unsteady {
            motion.validate()?;
        }
        check_controls(&case, forward.control_group_count())?;

        let time_steps = unsteady.map_or(1, |motion| motion.time_steps);
        let mut objectives = Vec::with_capacity(entries.len());
        for (n, entry) in entries.iter().enumerate() {
            let mut objective = ObjectiveFunction::new(entry.kind);
            if let Some(wing) = entry.wing {
                objective.set_wing(wing)?;
            }
            if let Some(rotor) = entry.rotor {
                objective.set_rotor(rotor)?;
            }
            if entry.kind == FunctionKind::CdClCm {
                trim.validate().map_err(Error::invalid)?;
                objective.set_trim(trim.target());
            }
            if entry.time_steps > time_steps {
                return Err(Error::invalid(format!(
                    "objective {} averages {} time samples but only {time_steps} are solved",
                    n + 1,
                    entry.time_steps
                )));
            }
            let length = forward.functional_length(objective.functional())?;
            objective.set_length(length, entry.time_steps)?;
            objectives.push(objective);
        }

        log::info!(
            "optimizer set up with {} objectives on {} nodes",
            objectives.len(),
            forward.node_count()
        );

        Ok(Self {
            forward,
            adjoint,
            case,
            objectives,
            unsteady,
            trim,
            index_base,
            sweep: CaseSweep::new(cases, sweep),
            values_current: false,
            solved: None,
            gradients: None,
        })
    }

    pub fn forward(&self) -> &F {
        &self.forward
    }

    pub fn adjoint(&self) -> &A {
        &self.adjoint
    }

    pub fn case(&self) -> &Case {
        &self.case
    }

    /// The index base from the configuration, for callers without their own.
    pub fn index_base(&self) -> IndexBase {
        self.index_base
    }

    pub fn objective_count(&self) -> usize {
        self.objectives.len()
    }

    /// An objective descriptor (1-based).
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] for an unknown objective.
    pub fn objective(&self, objective: usize) -> Result<&ObjectiveFunction, Error> {
        lookup(&self.objectives, objective)
    }

    /// The sweep engine with its case list and the tables of the last run.
    pub fn sweep_results(&self) -> &CaseSweep {
        &self.sweep
    }

    /// Appends a sweep case and returns its 1-based index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`] when the case list is full.
    pub fn push_case(&mut self, case: Case) -> Result<usize, Error> {
        self.sweep.push_case(case)
    }

    pub fn set_sweep_config(&mut self, config: SweepConfig) {
        self.sweep.set_config(config);
    }

    /// Moves every mesh node in both solvers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SizeMismatch`] unless `xyz` holds three coordinates
    /// per node, and propagates geometry rejected by either solver. Both
    /// solvers keep their previous geometry on failure.
    pub fn update_geometry(&mut self, xyz: &[f64]) -> Result<(), Error> {
        let nodes = self.forward.node_count();
        if xyz.len() != 3 * nodes {
            return Err(Error::SizeMismatch {
                what: "node coordinates",
                expected: 3 * nodes,
                actual: xyz.len(),
            });
        }
        let previous: Vec<f64> = (0..nodes)
            .filter_map(|node| self.forward.node(node))
            .flatten()
            .collect();

        self.forward.update_geometry(xyz)?;
        self.invalidate();
        if let Err(err) = self.adjoint.update_geometry(xyz) {
            self.forward.update_geometry(&previous)?;
            log::warn!("adjoint rejected the new geometry, forward geometry restored: {err}");
            return Err(err.into());
        }
        Ok(())
    }

    /// Replaces the flow condition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SizeMismatch`] for more deflections than control groups.
    pub fn set_operating_point(&mut self, case: Case) -> Result<(), Error> {
        check_controls(&case, self.forward.control_group_count())?;
        self.case = case;
        self.invalidate();
        Ok(())
    }

    /// Solves the flow and fills every objective's buffers.
    ///
    /// Trims first when any objective is the combined trim objective. In
    /// unsteady mode one solve runs per time sample of the motion period and
    /// each objective records its trailing window.
    ///
    /// # Errors
    ///
    /// Propagates trim and solve failures; the buffers keep their previous
    /// values.
    pub fn solve_forward(&mut self) -> Result<(), Error> {
        let result = self.run_forward();
        if let Err(err) = &result {
            // The solver may hold a trim iterate or an earlier time sample.
            self.solved = None;
            if err.is_recoverable() {
                log::warn!("forward solve failed: {err}");
            }
        }
        result
    }

    fn run_forward(&mut self) -> Result<(), Error> {
        let mut base = self.case.operating_point();
        base.controls.resize(self.forward.control_group_count(), 0.0);

        if self
            .objectives
            .iter()
            .any(|objective| objective.kind() == FunctionKind::CdClCm)
        {
            base = trim(&mut self.forward, &base, &self.trim)?.point;
        }

        let points = match &self.unsteady {
            Some(motion) => motion.samples(&base),
            None => vec![base],
        };
        let mut loads = Vec::with_capacity(points.len());
        for point in &points {
            loads.push(self.forward.solve(point)?);
        }

        let mut rows = Vec::with_capacity(self.objectives.len());
        for objective in &self.objectives {
            let window = &loads[loads.len() - objective.time_steps()..];
            let mut samples = Vec::with_capacity(window.len());
            for sample in window {
                let values = sample.evaluate(objective.functional())?;
                if values.len() != objective.length() {
                    return Err(Error::SizeMismatch {
                        what: "objective values",
                        expected: objective.length(),
                        actual: values.len(),
                    });
                }
                samples.push(values);
            }
            rows.push(samples);
        }
        for (objective, samples) in self.objectives.iter_mut().zip(&rows) {
            objective.record(samples)?;
        }

        log::info!(
            "forward solve over {} time samples: objective 1 = {:.6}",
            points.len(),
            self.objectives[0].function()
        );
        self.values_current = true;
        self.solved = Some(points);
        self.gradients = None;
        Ok(())
    }

    /// Computes every objective's gradient at every stored time sample.
    ///
    /// Vector objectives are reduced to `w·F`, with `w` the objective's user
    /// vector or all ones.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PrecursorMissing`] without a current forward solve and
    /// propagates adjoint failures, keeping any earlier gradients.
    pub fn solve_adjoint(&mut self) -> Result<(), Error> {
        let points = self.solved.as_ref().ok_or(Error::PrecursorMissing {
            operation: "adjoint solve",
            missing: "a forward solve",
        })?;
        let nodes = self.forward.node_count();
        let groups = self.forward.control_group_count();

        let mut gradients = Vec::with_capacity(self.objectives.len());
        for objective in &self.objectives {
            let weights = objective.weights();
            let window = &points[points.len() - objective.time_steps()..];
            let mut samples = Vec::with_capacity(window.len());
            for point in window {
                samples.push(
                    self.adjoint
                        .sensitivities(point, objective.functional(), &weights)?,
                );
            }

            let mut mean = Sensitivity::zeros(nodes, groups);
            #[allow(clippy::cast_precision_loss)]
            let weight = 1.0 / samples.len() as f64;
            for sample in &samples {
                mean.accumulate(sample, weight)?;
            }
            gradients.push(ObjectiveGradients { samples, mean });
        }

        log::info!(
            "adjoint solve for {} objectives over {} time samples",
            gradients.len(),
            points.len()
        );
        self.gradients = Some(gradients);
        Ok(())
    }

    /// Runs the forward and then the adjoint solve.
    ///
    /// # Errors
    ///
    /// As [`Optimizer::solve_forward`] and [`Optimizer::solve_adjoint`].
    pub fn solve(&mut self) -> Result<(), Error> {
        self.solve_forward()?;
        self.solve_adjoint()
    }

    /// Seeds the first objective with `seed`, then solves.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SizeMismatch`] unless `seed` matches the first
    /// objective's length, and otherwise as [`Optimizer::solve`].
    pub fn solve_with_seed(&mut self, seed: Vec<f64>) -> Result<(), Error> {
        self.set_gradient_vector(1, seed)?;
        self.solve()
    }

    /// Sets the adjoint seed weights of one objective (1-based).
    ///
    /// Drops gradients computed with the previous seed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] for an unknown objective and
    /// [`Error::SizeMismatch`] for a vector of the wrong length.
    pub fn set_gradient_vector(&mut self, objective: usize, vector: Vec<f64>) -> Result<(), Error> {
        let len = self.objectives.len();
        let slot = objective
            .checked_sub(1)
            .and_then(|k| self.objectives.get_mut(k))
            .ok_or(Error::IndexOutOfRange {
                what: "objective",
                index: objective,
                len,
            })?;
        slot.set_user_vector(vector)?;
        self.gradients = None;
        Ok(())
    }

    /// `(A·v, b)` for the linear system of the last forward solve.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PrecursorMissing`] without a current forward solve and
    /// [`Error::SizeMismatch`] for a vector of the wrong length.
    pub fn matrix_vector_product_and_rhs(&self, v: &[f64]) -> Result<(Vec<f64>, Vec<f64>), Error> {
        self.last_point("matrix-vector product")?;
        let product = self.forward.matrix_vector_product(v)?;
        let rhs = self
            .forward
            .right_hand_side()
            .ok_or(Error::PrecursorMissing {
                operation: "matrix-vector product",
                missing: "a forward solve",
            })?
            .to_vec();
        Ok((product, rhs))
    }

    /// `(Aᵀ·v, ∂(w·F)/∂Γ)` for one objective (1-based) at the last solved
    /// time sample.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PrecursorMissing`] without current forward and adjoint
    /// solves, and index or size errors for bad arguments.
    pub fn adjoint_matrix_vector_product_and_rhs(
        &mut self,
        objective: usize,
        v: &[f64],
    ) -> Result<(Vec<f64>, Vec<f64>), Error> {
        if self.gradients.is_none() {
            return Err(Error::PrecursorMissing {
                operation: "adjoint matrix-vector product",
                missing: "an adjoint solve",
            });
        }
        let point = self
            .solved
            .as_ref()
            .and_then(|points| points.last())
            .ok_or(Error::PrecursorMissing {
                operation: "adjoint matrix-vector product",
                missing: "a forward solve",
            })?;
        let objective = lookup(&self.objectives, objective)?;

        let product = self.adjoint.transpose_product(point, v)?;
        let rhs = self
            .adjoint
            .circulation_rhs(point, objective.functional(), &objective.weights())?;
        Ok((product, rhs))
    }

    /// Pressure jump at every node from the last forward solve, zero-based.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PrecursorMissing`] without a current forward solve.
    pub fn nodal_pressures(&self) -> Result<&[f64], Error> {
        self.last_point("nodal pressures")?;
        self.forward.nodal_pressures().ok_or(Error::PrecursorMissing {
            operation: "nodal pressures",
            missing: "a forward solve",
        })
    }

    /// Mesh gradient of `Σ wᵢ·pᵢ` over the nodal pressures of the last solve.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PrecursorMissing`] without a current forward solve and
    /// [`Error::SizeMismatch`] unless one weight is given per node.
    pub fn pressure_functional_gradient(&mut self, weights: &[f64]) -> Result<Vec<[f64; 3]>, Error> {
        let point = self.last_point("pressure functional gradient")?.clone();
        Ok(self.adjoint.pressure_sensitivities(&point, weights)?)
    }

    /// Runs the case sweep with the owned solvers.
    ///
    /// The first objective fills the per-case objective table, and the sweep
    /// trims each case when it is the combined trim objective. Sweep solves
    /// replace the forward solver's state, so matrix products need a new
    /// forward solve afterwards.
    ///
    /// # Errors
    ///
    /// As [`CaseSweep::run`].
    pub fn sweep(&mut self) -> Result<(), Error> {
        let objective = *self.objectives[0].functional();
        let trim = (objective.kind == FunctionKind::CdClCm).then_some(&self.trim);
        let result = self
            .sweep
            .run(&mut self.forward, Some(&mut self.adjoint), &objective, trim);
        self.solved = None;
        result
    }

    /// A read-only view that resolves node indices in `base`.
    pub fn query(&self, base: IndexBase) -> Query<'_, F, A> {
        Query::new(self, base)
    }

    pub(crate) fn current_values(&self, objective: usize) -> Result<&ObjectiveFunction, Error> {
        if !self.values_current {
            return Err(Error::PrecursorMissing {
                operation: "function values",
                missing: "a forward solve on the current geometry and operating point",
            });
        }
        lookup(&self.objectives, objective)
    }

    pub(crate) fn current_gradients(&self, objective: usize) -> Result<&ObjectiveGradients, Error> {
        let gradients = self.gradients.as_ref().ok_or(Error::PrecursorMissing {
            operation: "gradients",
            missing: "an adjoint solve",
        })?;
        objective
            .checked_sub(1)
            .and_then(|k| gradients.get(k))
            .ok_or(Error::IndexOutOfRange {
                what: "objective",
                index: objective,
                len: gradients.len(),
            })
    }

    fn last_point(&self, operation: &'static str) -> Result<&OperatingPoint, Error> {
        self.solved
            .as_ref()
            .and_then(|points| points.last())
            .ok_or(Error::PrecursorMissing {
                operation,
                missing: "a forward solve",
            })
    }

    fn invalidate(&mut self) {
        self.values_current = false;
        self.solved = None;
        self.gradients = None;
    }
}

fn lookup(objectives: &[ObjectiveFunction], objective: usize) -> Result<&ObjectiveFunction, Error> {
    objective
        .checked_sub(1)
        .and_then(|k| objectives.get(k))
        .ok_or(Error::IndexOutOfRange {
            what: "objective",
            index: objective,
            len: objectives.len(),
        })
}

fn check_controls(case: &Case, groups: usize) -> Result<(), Error> {
    if case.controls.len() > groups {
        return Err(Error::SizeMismatch {
            what: "control deflections",
            expected: groups,
            actual: case.controls.len(),
        });
    }
    Ok(())
}
