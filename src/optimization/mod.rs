pub mod async_problem;
pub mod callback;
pub mod config;
pub mod problem;
pub mod solvers;

pub use async_problem::{AsyncMinimizerProblem, Completion};
pub use callback::{CancelToken, HistoryCallback, IterationResult, MinimizerCallback};
pub use config::{ConfigError, DEFAULT_STAGE_SCALES, MinimizerConfig, StageSpec};
pub use problem::{Fallible, Penalty, Problem};
pub use solvers::{HillClimbMinimizer, StagedHillClimbMinimizer, select_minimizer};
pub use solvers::{Minimizer, SearchResult, StageResult, Status};
