use aerograd_core::OperatingPoint;
use uom::si::{
    angle::radian,
    f64::{Angle, MassDensity, Velocity},
    mass_density::kilogram_per_cubic_meter,
    velocity::meter_per_second,
};

use crate::Error;

/// One flow condition of a sweep.
///
/// `vinf` is the reference velocity used to dimensionalize loads and rates.
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub mach: f64,
    pub alpha: Angle,
    pub beta: Angle,
    pub density: MassDensity,
    pub vinf: Velocity,
    /// Reynolds number based on the reference chord.
    pub recref: f64,
    /// Non-dimensional roll rate `p·b / 2V`.
    pub roll_rate: f64,
    /// Non-dimensional pitch rate `q·c / 2V`.
    pub pitch_rate: f64,
    /// Non-dimensional yaw rate `r·b / 2V`.
    pub yaw_rate: f64,
    /// Deflection per control-surface group.
    pub controls: Vec<Angle>,
}

impl Default for Case {
    fn default() -> Self {
        Self {
            mach: 0.0,
            alpha: Angle::new::<radian>(0.0),
            beta: Angle::new::<radian>(0.0),
            density: MassDensity::new::<kilogram_per_cubic_meter>(1.225),
            vinf: Velocity::new::<meter_per_second>(100.0),
            recref: 0.0,
            roll_rate: 0.0,
            pitch_rate: 0.0,
            yaw_rate: 0.0,
            controls: Vec::new(),
        }
    }
}

impl Case {
    #[must_use]
    pub fn new(mach: f64, alpha: Angle, beta: Angle) -> Self {
        Self {
            mach,
            alpha,
            beta,
            ..Self::default()
        }
    }

    /// The solver-facing operating point, in radians and SI units.
    #[must_use]
    pub fn operating_point(&self) -> OperatingPoint {
        OperatingPoint {
            mach: self.mach,
            alpha: self.alpha.get::<radian>(),
            beta: self.beta.get::<radian>(),
            vinf: self.vinf.get::<meter_per_second>(),
            density: self.density.get::<kilogram_per_cubic_meter>(),
            recref: self.recref,
            roll_rate: self.roll_rate,
            pitch_rate: self.pitch_rate,
            yaw_rate: self.yaw_rate,
            controls: self.controls.iter().map(|d| d.get::<radian>()).collect(),
        }
    }
}

/// Values swept across cases. An empty list holds the base case's value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SweepLists {
    pub machs: Vec<f64>,
    pub alphas: Vec<Angle>,
    pub betas: Vec<Angle>,
    /// Reynolds numbers based on the reference chord.
    pub recrefs: Vec<f64>,
}

impl SweepLists {
    /// Number of cases the lists expand to, or `None` on overflow.
    #[must_use]
    pub fn case_count(&self) -> Option<usize> {
        [
            self.machs.len(),
            self.alphas.len(),
            self.betas.len(),
            self.recrefs.len(),
        ]
        .into_iter()
        .try_fold(1_usize, |count, len| count.checked_mul(len.max(1)))
    }
}

fn or_base<T: Copy>(list: &[T], base: T) -> Vec<T> {
    if list.is_empty() {
        vec![base]
    } else {
        list.to_vec()
    }
}

/// An ordered list of cases bounded by a configurable capacity.
///
/// Cases are addressed 1-based, in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseList {
    cases: Vec<Case>,
    capacity: usize,
}

impl Default for CaseList {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

impl CaseList {
    pub const DEFAULT_CAPACITY: usize = 10;

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cases: Vec::new(),
            capacity,
        }
    }

    /// Builds the cartesian product of the sweep lists in Mach, alpha, beta,
    /// Reynolds order, with every other attribute taken from `base`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`] if the product exceeds `capacity`.
    pub fn from_sweep(lists: &SweepLists, base: &Case, capacity: usize) -> Result<Self, Error> {
        match lists.case_count() {
            Some(count) if count <= capacity => {}
            _ => return Err(Error::CapacityExceeded { capacity }),
        }

        let machs = or_base(&lists.machs, base.mach);
        let alphas = or_base(&lists.alphas, base.alpha);
        let betas = or_base(&lists.betas, base.beta);
        let recrefs = or_base(&lists.recrefs, base.recref);

        let mut list = Self::with_capacity(capacity);
        for &mach in &machs {
            for &alpha in &alphas {
                for &beta in &betas {
                    for &recref in &recrefs {
                        list.cases.push(Case {
                            mach,
                            alpha,
                            beta,
                            recref,
                            ..base.clone()
                        });
                    }
                }
            }
        }
        Ok(list)
    }

    /// Appends a case and returns its 1-based index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`] when full, leaving the list as is.
    pub fn push(&mut self, case: Case) -> Result<usize, Error> {
        if self.cases.len() >= self.capacity {
            return Err(Error::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        self.cases.push(case);
        Ok(self.cases.len())
    }

    /// The case with the given 1-based index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] for 0 or past the end.
    pub fn get(&self, index: usize) -> Result<&Case, Error> {
        index
            .checked_sub(1)
            .and_then(|i| self.cases.get(i))
            .ok_or(Error::IndexOutOfRange {
                what: "case",
                index,
                len: self.cases.len(),
            })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Case> {
        self.cases.iter()
    }

    pub fn clear(&mut self) {
        self.cases.clear();
    }
}
