mod hill_climb;
mod staged;
mod step;
pub mod traits;

pub use hill_climb::HillClimbMinimizer;
pub use staged::StagedHillClimbMinimizer;
pub use traits::{Minimizer, SearchResult, StageResult, Status, rng_for};

use crate::optimization::config::MinimizerConfig;

/// Pick the minimizer a config asks for, with a human-readable reason.
pub fn select_minimizer(config: &MinimizerConfig) -> (Box<dyn Minimizer>, String) {
    let mode = if config.parallel_reads {
        format!("parallel rounds of {}", config.effective_batch_size())
    } else {
        "sequential".to_string()
    };

    if config.is_staged() {
        let stages = config.stage_schedule().len();
        (
            Box::new(StagedHillClimbMinimizer::new()),
            format!(
                "{} stages x {} evaluations ({}) → StagedHillClimb",
                stages, config.loop_count, mode
            ),
        )
    } else {
        (
            Box::new(HillClimbMinimizer::new()),
            format!("{} evaluations ({}) → HillClimb", config.loop_count, mode),
        )
    }
}
