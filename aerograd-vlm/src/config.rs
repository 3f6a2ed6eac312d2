use serde::Deserialize;

/// Reference quantities used to non-dimensionalize forces and moments.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Reference {
    /// Reference area, m².
    pub sref: f64,
    /// Reference chord, m. Scales pitching moment and pitch rate.
    pub cref: f64,
    /// Reference span, m. Scales rolling and yawing moments and rates.
    pub bref: f64,
    /// Moment reference point and rotation center, m.
    pub cg: [f64; 3],
}

impl Default for Reference {
    fn default() -> Self {
        Self {
            sref: 1.0,
            cref: 1.0,
            bref: 1.0,
            cg: [0.0; 3],
        }
    }
}

impl Reference {
    /// Validates that every reference length is finite and positive.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid quantity.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !(self.sref.is_finite() && self.sref > 0.0) {
            return Err("sref must be finite and positive");
        }
        if !(self.cref.is_finite() && self.cref > 0.0) {
            return Err("cref must be finite and positive");
        }
        if !(self.bref.is_finite() && self.bref > 0.0) {
            return Err("bref must be finite and positive");
        }
        if self.cg.iter().any(|c| !c.is_finite()) {
            return Err("cg must be finite");
        }
        Ok(())
    }
}

/// Limits of the dense linear solve.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LinearConfig {
    /// Iterative-refinement passes allowed after the direct solve.
    pub max_refinements: usize,
    /// Residual tolerance, relative to the largest right-hand-side entry.
    pub tolerance: f64,
    /// Pivots below this fraction of the largest matrix entry count as zero.
    pub pivot_tolerance: f64,
}

impl Default for LinearConfig {
    fn default() -> Self {
        Self {
            max_refinements: 3,
            tolerance: 1e-10,
            pivot_tolerance: 1e-13,
        }
    }
}

impl LinearConfig {
    /// Validates that all tolerances are finite and non-negative.
    ///
    /// # Errors
    ///
    /// Returns an error if any tolerance is negative or non-finite.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err("tolerance must be finite and non-negative");
        }
        if !self.pivot_tolerance.is_finite() || self.pivot_tolerance < 0.0 {
            return Err("pivot_tolerance must be finite and non-negative");
        }
        Ok(())
    }
}

/// Configuration of the vortex-lattice discretization.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LatticeConfig {
    pub reference: Reference,
    /// Mirror the mesh through the XZ plane with image vortices.
    pub symmetry: bool,
    /// Vortex core radius, m. Induced velocities closer than this to a
    /// filament are dropped.
    pub core_radius: f64,
    pub linear: LinearConfig,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            reference: Reference::default(),
            symmetry: false,
            core_radius: 1e-8,
            linear: LinearConfig::default(),
        }
    }
}

impl LatticeConfig {
    /// Validates the reference quantities, core radius, and solver limits.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> Result<(), &'static str> {
        self.reference.validate()?;
        if !self.core_radius.is_finite() || self.core_radius < 0.0 {
            return Err("core_radius must be finite and non-negative");
        }
        self.linear.validate()
    }
}
