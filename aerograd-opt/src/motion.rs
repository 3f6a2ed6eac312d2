//! Quasi-steady pitching and heaving motion for time-sampled objectives.

use std::f64::consts::TAU;

use aerograd_core::OperatingPoint;
use uom::si::{angle::radian, f64::Angle};

use crate::Error;

/// Harmonic pitch and heave about the base operating point, sampled at
/// equally spaced phases over one period.
///
/// With reduced frequency `k = ω·cref / 2V` and phase `φ = ω·t`:
///
/// ```text
/// θ(φ)  = θmax · sin φ
/// ḣ/V   = 2·k·(h/cref) · cos φ
/// α(φ)  = α₀ + θ(φ) − atan(ḣ/V)
/// q̂(φ) = q̂₀ + k·θmax · cos φ
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchHeave {
    /// Samples per period.
    pub time_steps: usize,
    pub reduced_frequency: f64,
    pub pitch_amplitude: Angle,
    /// Heave amplitude as a fraction of the reference chord.
    pub heave_amplitude: f64,
}

impl Default for PitchHeave {
    fn default() -> Self {
        Self {
            time_steps: 16,
            reduced_frequency: 0.1,
            pitch_amplitude: Angle::new::<radian>(0.0),
            heave_amplitude: 0.0,
        }
    }
}

impl PitchHeave {
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] for zero samples or a
    /// non-finite motion parameter.
    pub fn validate(&self) -> Result<(), Error> {
        if self.time_steps == 0 {
            return Err(Error::invalid("unsteady motion needs at least one time step"));
        }
        let parameters = [
            self.reduced_frequency,
            self.pitch_amplitude.get::<radian>(),
            self.heave_amplitude,
        ];
        if parameters.iter().any(|p| !p.is_finite()) {
            return Err(Error::invalid("unsteady motion parameters must be finite"));
        }
        if self.reduced_frequency < 0.0 {
            return Err(Error::invalid("reduced frequency must be non-negative"));
        }
        Ok(())
    }

    /// Operating point at time sample `k` (0-based) of one period.
    #[must_use]
    pub fn sample(&self, base: &OperatingPoint, k: usize) -> OperatingPoint {
        #[allow(clippy::cast_precision_loss)]
        let phase = TAU * k as f64 / self.time_steps as f64;
        let theta = self.pitch_amplitude.get::<radian>();
        let plunge = 2.0 * self.reduced_frequency * self.heave_amplitude * phase.cos();

        OperatingPoint {
            alpha: base.alpha + theta * phase.sin() - plunge.atan(),
            pitch_rate: base.pitch_rate + self.reduced_frequency * theta * phase.cos(),
            ..base.clone()
        }
    }

    /// Operating points of every sample of one period.
    #[must_use]
    pub fn samples(&self, base: &OperatingPoint) -> Vec<OperatingPoint> {
        (0..self.time_steps).map(|k| self.sample(base, k)).collect()
    }
}
