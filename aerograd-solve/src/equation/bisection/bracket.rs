use crate::equation::bisection::Error;

/// A sign-changing interval `[lower, upper]` around a root.
///
/// Only the residual at `lower` is kept; the residual at `upper` has the
/// opposite sign whenever the bracket is alive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Bracket {
    lower: f64,
    upper: f64,
    lower_residual: f64,
}

impl Bracket {
    /// Orders and checks raw endpoints before anything is evaluated.
    pub(super) fn endpoints(bracket: [f64; 2]) -> Result<[f64; 2], Error> {
        if let Some(&value) = bracket.iter().find(|x| !x.is_finite()) {
            return Err(Error::NonFiniteBracket { value });
        }

        let [a, b] = bracket;
        #[allow(clippy::float_cmp)]
        if a == b {
            return Err(Error::ZeroWidthBracket { value: a });
        }

        Ok([a.min(b), a.max(b)])
    }

    /// Builds a bracket from evaluated endpoints.
    pub(super) fn new(endpoints: [f64; 2], residuals: [f64; 2]) -> Result<Self, Error> {
        let [lower, upper] = endpoints;
        let [lower_residual, upper_residual] = residuals;
        if lower_residual.signum() == upper_residual.signum() {
            return Err(Error::NoBracket {
                left: lower,
                right: upper,
                left_residual: lower_residual,
                right_residual: upper_residual,
            });
        }
        Ok(Self {
            lower,
            upper,
            lower_residual,
        })
    }

    pub(super) fn bounds(&self) -> [f64; 2] {
        [self.lower, self.upper]
    }

    pub(super) fn midpoint(&self) -> f64 {
        0.5 * (self.lower + self.upper)
    }

    pub(super) fn is_narrow(&self, abs_tol: f64, rel_tol: f64) -> bool {
        self.upper - self.lower <= abs_tol + rel_tol * self.midpoint().abs()
    }

    /// Keeps the half whose endpoints still straddle the root.
    pub(super) fn split(&mut self, x: f64, residual: f64) {
        if residual.signum() == self.lower_residual.signum() {
            self.lower = x;
            self.lower_residual = residual;
        } else {
            self.upper = x;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_ordered() {
        assert_eq!(Bracket::endpoints([2.0, -1.0]).ok(), Some([-1.0, 2.0]));
        assert!(matches!(
            Bracket::endpoints([1.0, 1.0]),
            Err(Error::ZeroWidthBracket { .. })
        ));
        assert!(matches!(
            Bracket::endpoints([0.0, f64::NAN]),
            Err(Error::NonFiniteBracket { .. })
        ));
    }

    #[test]
    fn split_keeps_the_sign_change() {
        let mut bracket = Bracket::new([0.0, 4.0], [-1.0, 3.0]).expect("sign change");

        bracket.split(2.0, 1.0);
        assert_eq!(bracket.bounds(), [0.0, 2.0]);

        bracket.split(1.0, -0.5);
        assert_eq!(bracket.bounds(), [1.0, 2.0]);
        assert!(bracket.is_narrow(1.0, 0.0));
    }
}
