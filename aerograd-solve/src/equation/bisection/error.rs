use std::error::Error as StdError;

use thiserror::Error;

use crate::equation::EvalError;

/// Errors that can occur during bisection solving.
#[derive(Debug, Error)]
pub enum Error {
    #[error("bracket endpoints coincide at {value}")]
    ZeroWidthBracket { value: f64 },

    #[error("bracket endpoint {value} is not finite")]
    NonFiniteBracket { value: f64 },

    #[error("residual does not change sign: f({left}) = {left_residual}, f({right}) = {right_residual}")]
    NoBracket {
        left: f64,
        right: f64,
        left_residual: f64,
        right_residual: f64,
    },

    #[error("invalid config: {reason}")]
    InvalidConfig { reason: &'static str },

    #[error("failed to compute input")]
    Input(#[source] Box<dyn StdError + Send + Sync>),

    #[error("model call failed")]
    Model(#[source] Box<dyn StdError + Send + Sync>),

    #[error("failed to compute residual")]
    Residual(#[source] Box<dyn StdError + Send + Sync>),

    #[error("non-finite residual {residual} at x = {x}")]
    NonFiniteResidual { x: f64, residual: f64 },
}

impl<PE, ME> From<EvalError<PE, ME>> for Error
where
    PE: StdError + Send + Sync + 'static,
    ME: StdError + Send + Sync + 'static,
{
    fn from(err: EvalError<PE, ME>) -> Self {
        match err {
            EvalError::Input(e) => Self::Input(Box::new(e)),
            EvalError::Model(e) => Self::Model(Box::new(e)),
            EvalError::Residual(e) => Self::Residual(Box::new(e)),
        }
    }
}

impl Error {
    /// Returns the model's own error if the failure came from a model call.
    #[must_use]
    pub fn model_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            Self::Model(e) => Some(e.as_ref()),
            _ => None,
        }
    }

    /// Downcasts a model failure to the model's concrete error type.
    #[must_use]
    pub fn model_error_as<E: StdError + 'static>(&self) -> Option<&E> {
        self.model_error().and_then(|e| e.downcast_ref::<E>())
    }
}
