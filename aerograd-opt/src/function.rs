use aerograd_core::{FunctionKind, Functional, TrimTarget};

use crate::Error;

/// One objective of an optimization session.
///
/// Holds what to measure, how many values it produces per time sample, and
/// the buffers the forward solve writes. Values are laid out time-major:
/// entry `k·length + j` (0-based) is component `j` of time sample `k`.
/// Accessors take 1-based indices.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveFunction {
    functional: Functional,
    length: usize,
    time_steps: usize,
    values: Vec<f64>,
    averages: Vec<f64>,
    user_vector: Option<Vec<f64>>,
    locked: bool,
}

impl ObjectiveFunction {
    /// A scalar, steady objective of the given kind.
    #[must_use]
    pub fn new(kind: FunctionKind) -> Self {
        Self {
            functional: Functional::new(kind),
            length: 1,
            time_steps: 1,
            values: vec![0.0],
            averages: vec![0.0],
            user_vector: None,
            locked: false,
        }
    }

    #[must_use]
    pub fn kind(&self) -> FunctionKind {
        self.functional.kind
    }

    /// The functional evaluated against each solve's loads.
    #[must_use]
    pub fn functional(&self) -> &Functional {
        &self.functional
    }

    /// Number of values produced per time sample.
    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }

    #[must_use]
    pub fn time_steps(&self) -> usize {
        self.time_steps
    }

    /// Total buffer length, `length · time_steps`.
    #[must_use]
    pub fn vector_length(&self) -> usize {
        self.length * self.time_steps
    }

    #[must_use]
    pub fn wing(&self) -> Option<usize> {
        self.functional.wing
    }

    #[must_use]
    pub fn rotor(&self) -> Option<usize> {
        self.functional.rotor
    }

    /// Returns `true` once a solve has written to the buffers.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Changes what the objective measures.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] after the first solve.
    pub fn set_kind(&mut self, kind: FunctionKind) -> Result<(), Error> {
        self.ensure_unlocked("kind")?;
        self.functional.kind = kind;
        Ok(())
    }

    /// Resizes the objective and reallocates both buffers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if either size is zero or a
    /// solve has already written to the buffers.
    pub fn set_length(&mut self, length: usize, time_steps: usize) -> Result<(), Error> {
        self.ensure_unlocked("length")?;
        if length == 0 || time_steps == 0 {
            return Err(Error::invalid(format!(
                "objective {} needs a nonzero length and time-step count (got {length} x {time_steps})",
                self.functional.kind
            )));
        }
        if self
            .user_vector
            .as_ref()
            .is_some_and(|vector| vector.len() != length)
        {
            self.user_vector = None;
        }
        self.length = length;
        self.time_steps = time_steps;
        self.values = vec![0.0; length * time_steps];
        self.averages = vec![0.0; length * time_steps];
        Ok(())
    }

    /// Selects the wing a spanwise-load objective reads (1-based).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] for id 0 or after the first solve.
    pub fn set_wing(&mut self, wing: usize) -> Result<(), Error> {
        self.ensure_unlocked("wing")?;
        if wing == 0 {
            return Err(Error::invalid("wing ids start at 1"));
        }
        self.functional.wing = Some(wing);
        Ok(())
    }

    /// Selects the rotor a rotor objective reads (1-based).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] for id 0 or after the first solve.
    pub fn set_rotor(&mut self, rotor: usize) -> Result<(), Error> {
        self.ensure_unlocked("rotor")?;
        if rotor == 0 {
            return Err(Error::invalid("rotor ids start at 1"));
        }
        self.functional.rotor = Some(rotor);
        Ok(())
    }

    pub(crate) fn set_trim(&mut self, trim: TrimTarget) {
        self.functional.trim = trim;
    }

    /// Sets the weights that reduce a vector objective for the adjoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SizeMismatch`] unless one weight is given per component.
    pub fn set_user_vector(&mut self, vector: Vec<f64>) -> Result<(), Error> {
        if vector.len() != self.length {
            return Err(Error::SizeMismatch {
                what: "objective user vector",
                expected: self.length,
                actual: vector.len(),
            });
        }
        self.user_vector = Some(vector);
        Ok(())
    }

    pub fn clear_user_vector(&mut self) {
        self.user_vector = None;
    }

    #[must_use]
    pub fn user_vector(&self) -> Option<&[f64]> {
        self.user_vector.as_deref()
    }

    /// Adjoint seed weights: the user vector, or all ones.
    #[must_use]
    pub fn weights(&self) -> Vec<f64> {
        self.user_vector
            .clone()
            .unwrap_or_else(|| vec![1.0; self.length])
    }

    /// Value `i` (1-based) of the most recent solve.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] for 0 or past the vector length.
    pub fn value(&self, i: usize) -> Result<f64, Error> {
        self.slot(i).map(|k| self.values[k])
    }

    /// Running time average `i` (1-based) of the most recent solve.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] for 0 or past the vector length.
    pub fn average(&self, i: usize) -> Result<f64, Error> {
        self.slot(i).map(|k| self.averages[k])
    }

    /// The first value, the scalar objective.
    #[must_use]
    pub fn function(&self) -> f64 {
        self.values[0]
    }

    /// Mean of the first component over the whole time window.
    #[must_use]
    pub fn function_average(&self) -> f64 {
        self.averages[(self.time_steps - 1) * self.length]
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Components of one time sample (1-based).
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] for an unknown time sample.
    pub fn sample(&self, time: usize) -> Result<&[f64], Error> {
        if time == 0 || time > self.time_steps {
            return Err(Error::IndexOutOfRange {
                what: "time sample",
                index: time,
                len: self.time_steps,
            });
        }
        let start = (time - 1) * self.length;
        Ok(&self.values[start..start + self.length])
    }

    /// Writes one row per time sample into the buffers and locks the sizing.
    ///
    /// The average buffer holds the cumulative mean: entry `k·length + j` is
    /// the mean of component `j` over samples `0..=k`.
    pub(crate) fn record(&mut self, samples: &[Vec<f64>]) -> Result<(), Error> {
        if samples.len() != self.time_steps {
            return Err(Error::SizeMismatch {
                what: "objective time samples",
                expected: self.time_steps,
                actual: samples.len(),
            });
        }
        if let Some(row) = samples.iter().find(|row| row.len() != self.length) {
            return Err(Error::SizeMismatch {
                what: "objective values",
                expected: self.length,
                actual: row.len(),
            });
        }

        let mut sums = vec![0.0; self.length];
        for (k, row) in samples.iter().enumerate() {
            let offset = k * self.length;
            for (j, value) in row.iter().enumerate() {
                sums[j] += value;
                self.values[offset + j] = *value;
                #[allow(clippy::cast_precision_loss)]
                let count = (k + 1) as f64;
                self.averages[offset + j] = sums[j] / count;
            }
        }
        self.locked = true;
        Ok(())
    }

    fn slot(&self, i: usize) -> Result<usize, Error> {
        if i == 0 || i > self.values.len() {
            return Err(Error::IndexOutOfRange {
                what: "objective value",
                index: i,
                len: self.values.len(),
            });
        }
        Ok(i - 1)
    }

    fn ensure_unlocked(&self, what: &str) -> Result<(), Error> {
        if self.locked {
            return Err(Error::invalid(format!(
                "cannot change the {what} of objective {} after it has been solved",
                self.functional.kind
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn accessors_are_one_based_and_bounded() {
        let mut objective = ObjectiveFunction::new(FunctionKind::WingLoad);
        objective.set_length(3, 2).expect("valid sizing");
        assert_eq!(objective.vector_length(), 6);

        objective
            .record(&[vec![1.0, 2.0, 3.0], vec![3.0, 4.0, 5.0]])
            .expect("rows match sizing");

        assert_relative_eq!(objective.function(), 1.0);
        assert_relative_eq!(objective.value(6).expect("last slot"), 5.0);
        assert!(matches!(
            objective.value(0),
            Err(Error::IndexOutOfRange { index: 0, len: 6, .. })
        ));
        assert!(objective.average(7).is_err());
        assert_eq!(objective.sample(2).expect("second sample"), &[3.0, 4.0, 5.0]);
    }

    #[test]
    fn averages_accumulate_over_time_samples() {
        let mut objective = ObjectiveFunction::new(FunctionKind::Cl);
        objective.set_length(1, 3).expect("valid sizing");
        objective
            .record(&[vec![0.3], vec![0.5], vec![0.7]])
            .expect("rows match sizing");

        assert_relative_eq!(objective.average(1).expect("slot"), 0.3);
        assert_relative_eq!(objective.average(2).expect("slot"), 0.4);
        assert_relative_eq!(objective.function_average(), 0.5);
    }

    #[test]
    fn sizing_is_frozen_after_a_solve() {
        let mut objective = ObjectiveFunction::new(FunctionKind::Cd);
        assert!(matches!(
            objective.set_length(0, 1),
            Err(Error::InvalidConfiguration(_))
        ));

        objective.record(&[vec![0.02]]).expect("scalar row");
        assert!(objective.is_locked());
        assert!(objective.set_kind(FunctionKind::Cl).is_err());
        assert!(objective.set_length(2, 1).is_err());
        assert_eq!(objective.kind(), FunctionKind::Cd);
    }

    #[test]
    fn user_vector_must_match_the_length() {
        let mut objective = ObjectiveFunction::new(FunctionKind::Residual);
        objective.set_length(4, 1).expect("valid sizing");

        let err = objective.set_user_vector(vec![1.0; 3]).expect_err("too short");
        assert!(matches!(
            err,
            Error::SizeMismatch {
                expected: 4,
                actual: 3,
                ..
            }
        ));
        assert_eq!(objective.weights(), vec![1.0; 4]);

        objective
            .set_user_vector(vec![0.0, 1.0, 0.0, 2.0])
            .expect("matching length");
        assert_eq!(objective.weights(), vec![0.0, 1.0, 0.0, 2.0]);
    }

    #[test]
    fn mismatched_rows_leave_buffers_untouched() {
        let mut objective = ObjectiveFunction::new(FunctionKind::Cl);
        objective.record(&[vec![0.4]]).expect("scalar row");

        assert!(objective.record(&[vec![0.1, 0.2]]).is_err());
        assert_relative_eq!(objective.function(), 0.4);
    }
}
