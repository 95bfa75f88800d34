//! Bounded hill-climbing minimizer for fitting layered-medium reflectivity
//! models.
//!
//! Build a [`Problem`] from a starting vector, per-parameter bounds, a
//! penalty function and a [`MinimizerConfig`], then either run a
//! [`Minimizer`] on it directly or wrap it in an [`AsyncMinimizerProblem`] to
//! run the search in the background while other threads poll snapshots.

mod core;
mod error;
mod optimization;

pub use self::core::*;
pub use error::{AsyncError, ConstructionError, PenaltyError};
pub use optimization::*;
