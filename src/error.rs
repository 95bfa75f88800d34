use thiserror::Error;

use crate::optimization::config::ConfigError;

/// Errors raised while building a [`Problem`](crate::Problem).
#[derive(Debug, Error)]
pub enum ConstructionError {
    #[error(
        "dimension mismatch: {initial} initial values, {minima} minima, {maxima} maxima"
    )]
    DimensionMismatch {
        initial: usize,
        minima: usize,
        maxima: usize,
    },

    #[error("got {values} values for {parameters} parameters")]
    ValueCountMismatch { values: usize, parameters: usize },

    #[error("parameter vector is empty")]
    Empty,

    #[error("invalid bounds for parameter {index}: min {min} is not <= max {max}")]
    InvalidBounds { index: usize, min: f64, max: f64 },

    #[error("fixed mask has {mask} entries but the problem has {dimension} parameters")]
    FixedMaskMismatch { mask: usize, dimension: usize },

    #[error("invalid minimizer config: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised by [`AsyncMinimizerProblem`](crate::AsyncMinimizerProblem).
#[derive(Debug, Error)]
pub enum AsyncError {
    #[error("minimizer has not been started")]
    NotStarted,

    #[error("minimizer has already been started")]
    AlreadyStarted,

    #[error("background minimizer panicked before producing a result")]
    WorkerPanicked,

    #[error("failed to spawn minimizer thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Failure reported by a penalty function.
///
/// Never escapes a search: the candidate is scored as worst-possible instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("penalty evaluation failed: {0}")]
pub struct PenaltyError(pub String);

impl PenaltyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
