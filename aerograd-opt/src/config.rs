//! Session configuration, built in code or read from TOML.
//!
//! Angles are given in degrees in the file and converted to [`Angle`]s.
//!
//! ```toml
//! index_base = "zero"
//!
//! [lattice.reference]
//! sref = 6.0
//! cref = 1.0
//! bref = 6.0
//!
//! [freestream]
//! mach = 0.3
//! alpha = 2.0
//!
//! [[objectives]]
//! kind = "cl"
//!
//! [sweep]
//! alphas = [0.0, 2.0, 4.0]
//! recrefs = [1.0e6, 5.0e6]
//! axes = ["alpha", "q", { control = 0 }]
//! differencing = "central"
//! ```

use aerograd_core::FunctionKind;
use aerograd_vlm::LatticeConfig;
use serde::Deserialize;
use uom::si::{
    angle::degree,
    f64::{Angle, MassDensity, Velocity},
    mass_density::kilogram_per_cubic_meter,
    velocity::meter_per_second,
};

use crate::{
    Error,
    case::{Case, CaseList, SweepLists},
    motion::PitchHeave,
    query::IndexBase,
    sweep::{Axis, Differencing, SweepConfig},
    trim::TrimConfig,
};

/// One requested objective.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectiveSpec {
    pub kind: FunctionKind,
    /// Wing id (1-based) for spanwise-load objectives.
    #[serde(default)]
    pub wing: Option<usize>,
    /// Rotor id (1-based) for rotor objectives.
    #[serde(default)]
    pub rotor: Option<usize>,
    /// Trailing time samples the objective stores and averages.
    #[serde(default = "one")]
    pub time_steps: usize,
}

fn one() -> usize {
    1
}

impl ObjectiveSpec {
    #[must_use]
    pub fn new(kind: FunctionKind) -> Self {
        Self {
            kind,
            wing: None,
            rotor: None,
            time_steps: 1,
        }
    }

    #[must_use]
    pub fn with_wing(mut self, wing: usize) -> Self {
        self.wing = Some(wing);
        self
    }

    #[must_use]
    pub fn with_rotor(mut self, rotor: usize) -> Self {
        self.rotor = Some(rotor);
        self
    }

    #[must_use]
    pub fn with_time_steps(mut self, time_steps: usize) -> Self {
        self.time_steps = time_steps;
        self
    }
}

/// Everything an [`Optimizer`](crate::Optimizer) needs besides its solvers.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerConfig {
    pub case: Case,
    pub objectives: Vec<ObjectiveSpec>,
    pub max_objectives: usize,
    pub index_base: IndexBase,
    /// Quasi-steady motion; `None` runs a single steady solve.
    pub unsteady: Option<PitchHeave>,
    pub trim: TrimConfig,
    pub sweep: SweepConfig,
    pub cases: CaseList,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            case: Case::default(),
            objectives: vec![ObjectiveSpec::new(FunctionKind::Cl)],
            max_objectives: 1000,
            index_base: IndexBase::default(),
            unsteady: None,
            trim: TrimConfig::default(),
            sweep: SweepConfig::default(),
            cases: CaseList::default(),
        }
    }
}

/// A complete session: the lattice discretization and the optimizer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionConfig {
    pub lattice: LatticeConfig,
    pub optimizer: OptimizerConfig,
}

impl SessionConfig {
    /// Parses a session from TOML.
    ///
    /// Missing tables and fields take their defaults. Sweep lists (`machs`,
    /// `alphas`, `betas`, `recrefs`) that are left empty fall back to the
    /// freestream value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] for malformed TOML, unknown
    /// fields, or invalid lattice settings, and [`Error::CapacityExceeded`]
    /// when the sweep lists expand past the case capacity.
    pub fn from_toml_str(text: &str) -> Result<Self, Error> {
        let file: SessionFile = toml::from_str(text).map_err(|err| Error::invalid(err.to_string()))?;
        file.lattice.validate().map_err(Error::invalid)?;

        let case = file.freestream.case();
        let cases = CaseList::from_sweep(&file.sweep.lists(), &case, file.sweep.capacity)?;

        Ok(Self {
            lattice: file.lattice,
            optimizer: OptimizerConfig {
                case,
                objectives: file.objectives,
                max_objectives: file.max_objectives,
                index_base: file.index_base,
                unsteady: file.unsteady.map(|u| u.motion()),
                trim: file.trim.config(),
                sweep: file.sweep.config(),
                cases,
            },
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SessionFile {
    index_base: IndexBase,
    max_objectives: usize,
    lattice: LatticeConfig,
    freestream: FreestreamFile,
    objectives: Vec<ObjectiveSpec>,
    unsteady: Option<UnsteadyFile>,
    trim: TrimFile,
    sweep: SweepFile,
}

impl Default for SessionFile {
    fn default() -> Self {
        let defaults = OptimizerConfig::default();
        Self {
            index_base: defaults.index_base,
            max_objectives: defaults.max_objectives,
            lattice: LatticeConfig::default(),
            freestream: FreestreamFile::default(),
            objectives: defaults.objectives,
            unsteady: None,
            trim: TrimFile::default(),
            sweep: SweepFile::default(),
        }
    }
}

/// Freestream with angles in degrees, density in kg/m³ and speed in m/s.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FreestreamFile {
    mach: f64,
    alpha: f64,
    beta: f64,
    density: f64,
    vinf: f64,
    recref: f64,
    roll_rate: f64,
    pitch_rate: f64,
    yaw_rate: f64,
    controls: Vec<f64>,
}

impl Default for FreestreamFile {
    fn default() -> Self {
        let case = Case::default();
        Self {
            mach: case.mach,
            alpha: case.alpha.get::<degree>(),
            beta: case.beta.get::<degree>(),
            density: case.density.get::<kilogram_per_cubic_meter>(),
            vinf: case.vinf.get::<meter_per_second>(),
            recref: case.recref,
            roll_rate: case.roll_rate,
            pitch_rate: case.pitch_rate,
            yaw_rate: case.yaw_rate,
            controls: Vec::new(),
        }
    }
}

impl FreestreamFile {
    fn case(&self) -> Case {
        Case {
            mach: self.mach,
            alpha: Angle::new::<degree>(self.alpha),
            beta: Angle::new::<degree>(self.beta),
            density: MassDensity::new::<kilogram_per_cubic_meter>(self.density),
            vinf: Velocity::new::<meter_per_second>(self.vinf),
            recref: self.recref,
            roll_rate: self.roll_rate,
            pitch_rate: self.pitch_rate,
            yaw_rate: self.yaw_rate,
            controls: self.controls.iter().copied().map(Angle::new::<degree>).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct UnsteadyFile {
    time_steps: usize,
    reduced_frequency: f64,
    pitch_amplitude: f64,
    heave_amplitude: f64,
}

impl Default for UnsteadyFile {
    fn default() -> Self {
        let motion = PitchHeave::default();
        Self {
            time_steps: motion.time_steps,
            reduced_frequency: motion.reduced_frequency,
            pitch_amplitude: motion.pitch_amplitude.get::<degree>(),
            heave_amplitude: motion.heave_amplitude,
        }
    }
}

impl UnsteadyFile {
    fn motion(&self) -> PitchHeave {
        PitchHeave {
            time_steps: self.time_steps,
            reduced_frequency: self.reduced_frequency,
            pitch_amplitude: Angle::new::<degree>(self.pitch_amplitude),
            heave_amplitude: self.heave_amplitude,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TrimFile {
    target_cl: f64,
    alpha_min: f64,
    alpha_max: f64,
    max_iters: usize,
    cl_tol: f64,
    cl_weight: f64,
    cm_weight: f64,
}

impl Default for TrimFile {
    fn default() -> Self {
        let trim = TrimConfig::default();
        Self {
            target_cl: trim.target_cl,
            alpha_min: trim.alpha_bracket[0].get::<degree>(),
            alpha_max: trim.alpha_bracket[1].get::<degree>(),
            max_iters: trim.max_iters,
            cl_tol: trim.cl_tol,
            cl_weight: trim.cl_weight,
            cm_weight: trim.cm_weight,
        }
    }
}

impl TrimFile {
    fn config(&self) -> TrimConfig {
        TrimConfig {
            target_cl: self.target_cl,
            alpha_bracket: [
                Angle::new::<degree>(self.alpha_min),
                Angle::new::<degree>(self.alpha_max),
            ],
            max_iters: self.max_iters,
            cl_tol: self.cl_tol,
            cl_weight: self.cl_weight,
            cm_weight: self.cm_weight,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SweepFile {
    machs: Vec<f64>,
    alphas: Vec<f64>,
    betas: Vec<f64>,
    recrefs: Vec<f64>,
    capacity: usize,
    delta_alpha: f64,
    delta_beta: f64,
    delta_mach: f64,
    delta_p: f64,
    delta_q: f64,
    delta_r: f64,
    delta_control: f64,
    axes: Vec<Axis>,
    differencing: Differencing,
    adjoint: bool,
}

impl Default for SweepFile {
    fn default() -> Self {
        let sweep = SweepConfig::default();
        Self {
            machs: Vec::new(),
            alphas: Vec::new(),
            betas: Vec::new(),
            recrefs: Vec::new(),
            capacity: CaseList::DEFAULT_CAPACITY,
            delta_alpha: sweep.delta_alpha.get::<degree>(),
            delta_beta: sweep.delta_beta.get::<degree>(),
            delta_mach: sweep.delta_mach,
            delta_p: sweep.delta_p,
            delta_q: sweep.delta_q,
            delta_r: sweep.delta_r,
            delta_control: sweep.delta_control.get::<degree>(),
            axes: sweep.axes,
            differencing: sweep.differencing,
            adjoint: sweep.adjoint,
        }
    }
}

impl SweepFile {
    fn lists(&self) -> SweepLists {
        let angles = |degrees: &[f64]| -> Vec<Angle> {
            degrees.iter().copied().map(Angle::new::<degree>).collect()
        };
        SweepLists {
            machs: self.machs.clone(),
            alphas: angles(&self.alphas),
            betas: angles(&self.betas),
            recrefs: self.recrefs.clone(),
        }
    }

    fn config(&self) -> SweepConfig {
        SweepConfig {
            delta_alpha: Angle::new::<degree>(self.delta_alpha),
            delta_beta: Angle::new::<degree>(self.delta_beta),
            delta_mach: self.delta_mach,
            delta_p: self.delta_p,
            delta_q: self.delta_q,
            delta_r: self.delta_r,
            delta_control: Angle::new::<degree>(self.delta_control),
            axes: self.axes.clone(),
            differencing: self.differencing,
            adjoint: self.adjoint,
        }
    }
}
