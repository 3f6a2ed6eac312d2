use std::fmt;

use thiserror::Error;

use crate::Coefficient;

/// The aerodynamic quantity an objective function measures.
///
/// Each kind keeps the legacy numeric code used by optimizer drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde-derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum FunctionKind {
    /// Vehicle lift coefficient.
    Cl,
    /// Vehicle inviscid drag coefficient along the wind axis.
    Cd,
    /// Vehicle side-force coefficient.
    Cs,
    /// Body-axis force coefficients.
    Cx,
    Cy,
    Cz,
    /// Body-axis moment coefficients about the reference point.
    Cmx,
    Cmy,
    Cmz,
    /// Trim objective: minimize total drag while driving CL to a target and
    /// CMy to zero.
    CdClCm,
    /// Rotor thrust coefficient.
    RotorCt,
    /// Rotor power coefficient.
    RotorCp,
    /// Residual vector of the discretized linear system.
    Residual,
    /// Spanwise load `cl·c / cref` of one wing.
    WingLoad,
    /// Spanwise force-coefficient components of one wing.
    WingCx,
    WingCy,
    WingCz,
    /// Skin-friction drag coefficient.
    Cdo,
    /// Total drag coefficient, inviscid plus skin friction.
    Cdt,
    /// Wind-axis rolling, pitching and yawing moment coefficients.
    Cml,
    Cmm,
    Cmn,
}

impl FunctionKind {
    const ALL: [FunctionKind; 22] = [
        FunctionKind::Cl,
        FunctionKind::Cd,
        FunctionKind::Cs,
        FunctionKind::Cx,
        FunctionKind::Cy,
        FunctionKind::Cz,
        FunctionKind::Cmx,
        FunctionKind::Cmy,
        FunctionKind::Cmz,
        FunctionKind::CdClCm,
        FunctionKind::RotorCt,
        FunctionKind::RotorCp,
        FunctionKind::Residual,
        FunctionKind::WingLoad,
        FunctionKind::WingCx,
        FunctionKind::WingCy,
        FunctionKind::WingCz,
        FunctionKind::Cdo,
        FunctionKind::Cdt,
        FunctionKind::Cml,
        FunctionKind::Cmm,
        FunctionKind::Cmn,
    ];

    /// Returns the numeric code. Codes 13 to 17 extend the legacy table with
    /// the drag split and the wind-axis moments.
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Self::Cl => 1,
            Self::Cd => 2,
            Self::Cs => 3,
            Self::Cx => 4,
            Self::Cy => 5,
            Self::Cz => 6,
            Self::Cmx => 7,
            Self::Cmy => 8,
            Self::Cmz => 9,
            Self::CdClCm => 10,
            Self::RotorCt => 11,
            Self::RotorCp => 12,
            Self::Residual => 1000,
            Self::WingLoad => 2000,
            Self::WingCx => 2001,
            Self::WingCy => 2002,
            Self::WingCz => 2003,
            Self::Cdo => 13,
            Self::Cdt => 14,
            Self::Cml => 15,
            Self::Cmm => 16,
            Self::Cmn => 17,
        }
    }

    /// Maps a legacy numeric code to a function kind.
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    /// Returns `true` if the kind reads a spanwise load and needs a wing id.
    #[must_use]
    pub fn needs_wing(self) -> bool {
        matches!(
            self,
            Self::WingLoad | Self::WingCx | Self::WingCy | Self::WingCz
        )
    }

    /// Returns `true` if the kind reads rotor loads and needs a rotor id.
    #[must_use]
    pub fn needs_rotor(self) -> bool {
        matches!(self, Self::RotorCt | Self::RotorCp)
    }

    /// The whole-vehicle coefficient this kind reads directly, if any.
    #[must_use]
    pub fn coefficient(self) -> Option<Coefficient> {
        Some(match self {
            Self::Cl => Coefficient::Cl,
            Self::Cd => Coefficient::Cd,
            Self::Cs => Coefficient::Cs,
            Self::Cx => Coefficient::Cfx,
            Self::Cy => Coefficient::Cfy,
            Self::Cz => Coefficient::Cfz,
            Self::Cmx => Coefficient::Cmx,
            Self::Cmy => Coefficient::Cmy,
            Self::Cmz => Coefficient::Cmz,
            Self::Cdo => Coefficient::Cdo,
            Self::Cdt => Coefficient::Cdt,
            Self::Cml => Coefficient::Cml,
            Self::Cmm => Coefficient::Cmm,
            Self::Cmn => Coefficient::Cmn,
            _ => return None,
        })
    }
}

impl From<Coefficient> for FunctionKind {
    fn from(coefficient: Coefficient) -> Self {
        match coefficient {
            Coefficient::Cfx => Self::Cx,
            Coefficient::Cfy => Self::Cy,
            Coefficient::Cfz => Self::Cz,
            Coefficient::Cmx => Self::Cmx,
            Coefficient::Cmy => Self::Cmy,
            Coefficient::Cmz => Self::Cmz,
            Coefficient::Cl => Self::Cl,
            Coefficient::Cd => Self::Cd,
            Coefficient::Cs => Self::Cs,
            Coefficient::Cdo => Self::Cdo,
            Coefficient::Cdt => Self::Cdt,
            Coefficient::Cml => Self::Cml,
            Coefficient::Cmm => Self::Cmm,
            Coefficient::Cmn => Self::Cmn,
        }
    }
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?} ({})", self.code())
    }
}

/// Target and penalty weights of the combined trim objective.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimTarget {
    pub cl: f64,
    pub cl_weight: f64,
    pub cm_weight: f64,
}

impl Default for TrimTarget {
    fn default() -> Self {
        Self {
            cl: 0.0,
            cl_weight: 1.0,
            cm_weight: 1.0,
        }
    }
}

/// A fully specified functional: what to measure and on which component.
///
/// Wing and rotor ids are 1-based; `None` means the functional does not
/// reference one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Functional {
    pub kind: FunctionKind,
    pub wing: Option<usize>,
    pub rotor: Option<usize>,
    pub trim: TrimTarget,
}

impl Functional {
    #[must_use]
    pub fn new(kind: FunctionKind) -> Self {
        Self {
            kind,
            wing: None,
            rotor: None,
            trim: TrimTarget::default(),
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
    pub fn with_trim(mut self, trim: TrimTarget) -> Self {
        self.trim = trim;
        self
    }
}

impl From<FunctionKind> for Functional {
    fn from(kind: FunctionKind) -> Self {
        Self::new(kind)
    }
}

/// Errors resolving a functional against a set of loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FunctionalError {
    #[error("{kind} needs a wing id")]
    MissingWing { kind: FunctionKind },

    #[error("wing {wing} does not exist ({available} wings)")]
    UnknownWing { wing: usize, available: usize },

    #[error("{kind} needs a rotor id")]
    MissingRotor { kind: FunctionKind },

    #[error("rotor {rotor} does not exist ({available} rotors)")]
    UnknownRotor { rotor: usize, available: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_codes_are_unique_and_reversible() {
        for kind in FunctionKind::ALL {
            assert_eq!(FunctionKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(FunctionKind::from_code(13), Some(FunctionKind::Cdo));
        assert_eq!(FunctionKind::from_code(18), None);
        assert_eq!(FunctionKind::from_code(2001), Some(FunctionKind::WingCx));
    }

    #[test]
    fn coefficient_kinds_map_both_ways() {
        for coefficient in Coefficient::ALL {
            let kind = FunctionKind::from(coefficient);
            assert_eq!(kind.coefficient(), Some(coefficient));
        }
        assert_eq!(FunctionKind::CdClCm.coefficient(), None);
        assert!(FunctionKind::WingLoad.needs_wing());
        assert!(FunctionKind::RotorCp.needs_rotor());
        assert!(!FunctionKind::Residual.needs_wing());
    }
}
