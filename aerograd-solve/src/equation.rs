mod evaluate;

pub mod bisection;

pub use evaluate::{EvalError, Evaluation, evaluate};
