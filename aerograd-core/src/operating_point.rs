use std::fmt;

/// Number of standard scalar inputs every adjoint solve reports.
pub const STANDARD_INPUTS: usize = 9;

/// A scalar flow-state input that sensitivities can be taken against.
///
/// The nine standard inputs keep their legacy numeric codes (1..=9);
/// control-surface groups start at code 11.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde-derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum InputVariable {
    Alpha,
    Beta,
    Mach,
    Vinf,
    Density,
    ReCref,
    /// Non-dimensional roll rate `p·b / 2V`.
    RollRate,
    /// Non-dimensional pitch rate `q·c / 2V`.
    PitchRate,
    /// Non-dimensional yaw rate `r·b / 2V`.
    YawRate,
    /// Deflection of the control-surface group with this zero-based index.
    Control(usize),
}

impl InputVariable {
    /// The standard inputs in code order.
    pub const STANDARD: [InputVariable; STANDARD_INPUTS] = [
        InputVariable::Alpha,
        InputVariable::Beta,
        InputVariable::Mach,
        InputVariable::Vinf,
        InputVariable::Density,
        InputVariable::ReCref,
        InputVariable::RollRate,
        InputVariable::PitchRate,
        InputVariable::YawRate,
    ];

    const CONTROL_CODE_BASE: u32 = 11;

    /// Maps a legacy numeric code to an input variable.
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1..=9 => Some(Self::STANDARD[(code - 1) as usize]),
            c if c >= Self::CONTROL_CODE_BASE => {
                Some(Self::Control((c - Self::CONTROL_CODE_BASE) as usize))
            }
            _ => None,
        }
    }

    /// Returns the legacy numeric code.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn code(self) -> u32 {
        match self {
            Self::Control(group) => Self::CONTROL_CODE_BASE + group as u32,
            standard => standard.standard_index().map_or(0, |index| index as u32 + 1),
        }
    }

    /// Position among the standard inputs, or `None` for control groups.
    #[must_use]
    pub fn standard_index(self) -> Option<usize> {
        Self::STANDARD.iter().position(|&v| v == self)
    }
}

impl fmt::Display for InputVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alpha => write!(f, "alpha"),
            Self::Beta => write!(f, "beta"),
            Self::Mach => write!(f, "mach"),
            Self::Vinf => write!(f, "vinf"),
            Self::Density => write!(f, "density"),
            Self::ReCref => write!(f, "recref"),
            Self::RollRate => write!(f, "p"),
            Self::PitchRate => write!(f, "q"),
            Self::YawRate => write!(f, "r"),
            Self::Control(group) => write!(f, "control[{group}]"),
        }
    }
}

/// The flow state a solver is asked to evaluate, in plain SI units.
///
/// Angles are in radians, `vinf` in m/s, `density` in kg/m³. Rates are
/// non-dimensional. This is the solver-facing form; callers typically build
/// it from a unit-checked case description.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatingPoint {
    pub mach: f64,
    pub alpha: f64,
    pub beta: f64,
    pub vinf: f64,
    pub density: f64,
    pub recref: f64,
    pub roll_rate: f64,
    pub pitch_rate: f64,
    pub yaw_rate: f64,
    /// Deflection of each control-surface group, radians.
    pub controls: Vec<f64>,
}

impl Default for OperatingPoint {
    fn default() -> Self {
        Self {
            mach: 0.0,
            alpha: 0.0,
            beta: 0.0,
            vinf: 100.0,
            density: 1.225,
            recref: 0.0,
            roll_rate: 0.0,
            pitch_rate: 0.0,
            yaw_rate: 0.0,
            controls: Vec::new(),
        }
    }
}

impl OperatingPoint {
    /// Returns the value of one input, or `None` for an unknown control group.
    #[must_use]
    pub fn get(&self, variable: InputVariable) -> Option<f64> {
        Some(match variable {
            InputVariable::Alpha => self.alpha,
            InputVariable::Beta => self.beta,
            InputVariable::Mach => self.mach,
            InputVariable::Vinf => self.vinf,
            InputVariable::Density => self.density,
            InputVariable::ReCref => self.recref,
            InputVariable::RollRate => self.roll_rate,
            InputVariable::PitchRate => self.pitch_rate,
            InputVariable::YawRate => self.yaw_rate,
            InputVariable::Control(group) => return self.controls.get(group).copied(),
        })
    }

    /// Returns a copy with one input shifted by `delta`.
    ///
    /// Returns `None` for an unknown control group.
    #[must_use]
    pub fn perturbed(&self, variable: InputVariable, delta: f64) -> Option<Self> {
        let mut point = self.clone();
        let slot = match variable {
            InputVariable::Alpha => &mut point.alpha,
            InputVariable::Beta => &mut point.beta,
            InputVariable::Mach => &mut point.mach,
            InputVariable::Vinf => &mut point.vinf,
            InputVariable::Density => &mut point.density,
            InputVariable::ReCref => &mut point.recref,
            InputVariable::RollRate => &mut point.roll_rate,
            InputVariable::PitchRate => &mut point.pitch_rate,
            InputVariable::YawRate => &mut point.yaw_rate,
            InputVariable::Control(group) => point.controls.get_mut(group)?,
        };
        *slot += delta;
        Some(point)
    }

    /// The standard inputs in code order.
    #[must_use]
    pub fn standard_inputs(&self) -> [f64; STANDARD_INPUTS] {
        [
            self.alpha,
            self.beta,
            self.mach,
            self.vinf,
            self.density,
            self.recref,
            self.roll_rate,
            self.pitch_rate,
            self.yaw_rate,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn codes_round_trip_through_legacy_numbering() {
        assert_eq!(InputVariable::from_code(1), Some(InputVariable::Alpha));
        assert_eq!(InputVariable::from_code(9), Some(InputVariable::YawRate));
        assert_eq!(InputVariable::from_code(10), None);
        assert_eq!(InputVariable::from_code(0), None);
        assert_eq!(InputVariable::from_code(12), Some(InputVariable::Control(1)));
        assert_eq!(InputVariable::Control(1).code(), 12);
        assert_eq!(InputVariable::Mach.code(), 3);
    }

    #[test]
    fn perturbing_touches_only_one_input() {
        let point = OperatingPoint {
            alpha: 0.1,
            controls: vec![0.0, 0.2],
            ..OperatingPoint::default()
        };

        let shifted = point
            .perturbed(InputVariable::Control(1), 0.05)
            .expect("group exists");
        assert_relative_eq!(shifted.controls[1], 0.25);
        assert_relative_eq!(shifted.alpha, 0.1);

        let shifted = point
            .perturbed(InputVariable::Alpha, -0.1)
            .expect("standard input");
        assert_relative_eq!(shifted.alpha, 0.0);

        assert!(point.perturbed(InputVariable::Control(2), 0.1).is_none());
        assert!(point.get(InputVariable::Control(2)).is_none());
    }
}
