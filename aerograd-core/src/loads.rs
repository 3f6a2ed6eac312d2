use crate::{FunctionKind, Functional, FunctionalError, Scalar};

/// A whole-vehicle force or moment coefficient with a functional behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Coefficient {
    Cfx,
    Cfy,
    Cfz,
    Cmx,
    Cmy,
    Cmz,
    Cl,
    Cd,
    Cs,
    Cdo,
    Cdt,
    Cml,
    Cmm,
    Cmn,
}

impl Coefficient {
    pub const ALL: [Coefficient; 14] = [
        Coefficient::Cfx,
        Coefficient::Cfy,
        Coefficient::Cfz,
        Coefficient::Cmx,
        Coefficient::Cmy,
        Coefficient::Cmz,
        Coefficient::Cl,
        Coefficient::Cd,
        Coefficient::Cs,
        Coefficient::Cdo,
        Coefficient::Cdt,
        Coefficient::Cml,
        Coefficient::Cmm,
        Coefficient::Cmn,
    ];

    /// Position in [`Coefficient::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Whole-vehicle force and moment coefficients.
///
/// Body-axis moments are about the reference point. `cd` is the inviscid
/// drag along the wind axis and `cdt` adds skin friction (`cdo`) to it.
/// `cml`, `cmm` and `cmn` are the rolling, pitching and yawing moments in
/// wind axes: about the upstream flow direction, the side-force axis, and
/// the downward lift direction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coefficients<S> {
    pub cfx: S,
    pub cfy: S,
    pub cfz: S,
    pub cmx: S,
    pub cmy: S,
    pub cmz: S,
    pub cl: S,
    pub cd: S,
    pub cs: S,
    pub cdo: S,
    pub cdt: S,
    pub cml: S,
    pub cmm: S,
    pub cmn: S,
}

impl<S> Coefficients<S> {
    /// Builds every coefficient from its [`Coefficient`] tag.
    pub fn from_fn(mut f: impl FnMut(Coefficient) -> S) -> Self {
        Self {
            cfx: f(Coefficient::Cfx),
            cfy: f(Coefficient::Cfy),
            cfz: f(Coefficient::Cfz),
            cmx: f(Coefficient::Cmx),
            cmy: f(Coefficient::Cmy),
            cmz: f(Coefficient::Cmz),
            cl: f(Coefficient::Cl),
            cd: f(Coefficient::Cd),
            cs: f(Coefficient::Cs),
            cdo: f(Coefficient::Cdo),
            cdt: f(Coefficient::Cdt),
            cml: f(Coefficient::Cml),
            cmm: f(Coefficient::Cmm),
            cmn: f(Coefficient::Cmn),
        }
    }
}

impl<S: Copy> Coefficients<S> {
    #[must_use]
    pub fn get(&self, coefficient: Coefficient) -> S {
        match coefficient {
            Coefficient::Cfx => self.cfx,
            Coefficient::Cfy => self.cfy,
            Coefficient::Cfz => self.cfz,
            Coefficient::Cmx => self.cmx,
            Coefficient::Cmy => self.cmy,
            Coefficient::Cmz => self.cmz,
            Coefficient::Cl => self.cl,
            Coefficient::Cd => self.cd,
            Coefficient::Cs => self.cs,
            Coefficient::Cdo => self.cdo,
            Coefficient::Cdt => self.cdt,
            Coefficient::Cml => self.cml,
            Coefficient::Cmm => self.cmm,
            Coefficient::Cmn => self.cmn,
        }
    }

    /// Applies `f` to every coefficient.
    pub fn map<T>(&self, f: impl Fn(S) -> T) -> Coefficients<T> {
        Coefficients::from_fn(|coefficient| f(self.get(coefficient)))
    }
}

/// Spanwise loading of one wing, one entry per spanwise strip.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpanLoad<S> {
    /// Sectional lift times local chord over reference chord.
    pub cl_c: Vec<S>,
    pub cx: Vec<S>,
    pub cy: Vec<S>,
    pub cz: Vec<S>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RotorLoads<S> {
    pub ct: S,
    pub cp: S,
}

/// Every functional a flow solution can produce.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Loads<S> {
    pub coefficients: Coefficients<S>,
    pub wings: Vec<SpanLoad<S>>,
    pub rotors: Vec<RotorLoads<S>>,
    /// Residual of the discretized linear system with the circulation frozen.
    pub residual: Vec<S>,
}

impl<S: Scalar> Loads<S> {
    /// Extracts the values of a functional.
    ///
    /// Scalar kinds yield one entry; residual and spanwise kinds yield one
    /// entry per unknown or strip.
    ///
    /// # Errors
    ///
    /// Returns an error if the functional references a missing wing or rotor.
    pub fn evaluate(&self, functional: &Functional) -> Result<Vec<S>, FunctionalError> {
        let kind = functional.kind;

        if let Some(coefficient) = kind.coefficient() {
            return Ok(vec![self.coefficients.get(coefficient)]);
        }

        match kind {
            FunctionKind::CdClCm => {
                let c = &self.coefficients;
                let trim = functional.trim;
                let cl_error = c.cl - trim.cl;
                Ok(vec![
                    c.cdt + cl_error * cl_error * trim.cl_weight
                        + c.cmy * c.cmy * trim.cm_weight,
                ])
            }
            FunctionKind::RotorCt | FunctionKind::RotorCp => {
                let rotor = self.rotor(kind, functional.rotor)?;
                Ok(vec![if kind == FunctionKind::RotorCt {
                    rotor.ct
                } else {
                    rotor.cp
                }])
            }
            FunctionKind::Residual => Ok(self.residual.clone()),
            FunctionKind::WingLoad => Ok(self.wing(kind, functional.wing)?.cl_c.clone()),
            FunctionKind::WingCx => Ok(self.wing(kind, functional.wing)?.cx.clone()),
            FunctionKind::WingCy => Ok(self.wing(kind, functional.wing)?.cy.clone()),
            FunctionKind::WingCz => Ok(self.wing(kind, functional.wing)?.cz.clone()),
            _ => unreachable!("coefficient kinds are handled above"),
        }
    }

    /// Drops derivative information.
    #[must_use]
    pub fn values(&self) -> Loads<f64> {
        let strip = |v: &[S]| -> Vec<f64> { v.iter().map(Scalar::value).collect() };
        Loads {
            coefficients: self.coefficients.map(|s| s.value()),
            wings: self
                .wings
                .iter()
                .map(|w| SpanLoad {
                    cl_c: strip(&w.cl_c),
                    cx: strip(&w.cx),
                    cy: strip(&w.cy),
                    cz: strip(&w.cz),
                })
                .collect(),
            rotors: self
                .rotors
                .iter()
                .map(|r| RotorLoads {
                    ct: r.ct.value(),
                    cp: r.cp.value(),
                })
                .collect(),
            residual: strip(&self.residual),
        }
    }

    fn wing(
        &self,
        kind: FunctionKind,
        wing: Option<usize>,
    ) -> Result<&SpanLoad<S>, FunctionalError> {
        let wing = wing.ok_or(FunctionalError::MissingWing { kind })?;
        wing.checked_sub(1)
            .and_then(|index| self.wings.get(index))
            .ok_or(FunctionalError::UnknownWing {
                wing,
                available: self.wings.len(),
            })
    }

    fn rotor(
        &self,
        kind: FunctionKind,
        rotor: Option<usize>,
    ) -> Result<&RotorLoads<S>, FunctionalError> {
        let rotor = rotor.ok_or(FunctionalError::MissingRotor { kind })?;
        rotor
            .checked_sub(1)
            .and_then(|index| self.rotors.get(index))
            .ok_or(FunctionalError::UnknownRotor {
                rotor,
                available: self.rotors.len(),
            })
    }
}
