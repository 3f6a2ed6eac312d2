/// Iteration limit and tolerances for a bisection solve.
///
/// A solve stops once either the bracket width or the residual at the
/// midpoint falls within tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub max_iters: usize,
    /// Absolute bracket width tolerance.
    pub x_abs_tol: f64,
    /// Bracket width tolerance relative to the midpoint magnitude.
    pub x_rel_tol: f64,
    /// Residual magnitude accepted as a root.
    pub residual_tol: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_iters: 100,
            x_abs_tol: 1e-12,
            x_rel_tol: 1e-12,
            residual_tol: 1e-12,
        }
    }
}

impl Config {
    /// A configuration that converges on the residual alone, with the
    /// bracket width only guarding against running below `f64` resolution.
    #[must_use]
    pub fn residual(residual_tol: f64, max_iters: usize) -> Self {
        Self {
            max_iters,
            x_rel_tol: 0.0,
            residual_tol,
            ..Self::default()
        }
    }

    /// Validates that all tolerances are finite and non-negative.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending tolerance.
    pub fn validate(&self) -> Result<(), &'static str> {
        let tolerances = [
            (self.x_abs_tol, "x_abs_tol must be finite and non-negative"),
            (self.x_rel_tol, "x_rel_tol must be finite and non-negative"),
            (self.residual_tol, "residual_tol must be finite and non-negative"),
        ];
        match tolerances
            .into_iter()
            .find(|(tol, _)| !tol.is_finite() || *tol < 0.0)
        {
            Some((_, reason)) => Err(reason),
            None => Ok(()),
        }
    }
}
