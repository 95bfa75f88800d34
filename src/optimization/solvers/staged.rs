use std::time::Instant;

use rand::RngCore;

use super::hill_climb::{SearchState, climb};
use super::step::StepPolicy;
use super::traits::{Minimizer, SearchResult, Status};
use crate::optimization::callback::MinimizerCallback;
use crate::optimization::problem::Problem;

/// Hill climb run once per stage of the configured schedule.
///
/// Stages run in order, coarse to fine. Each one starts from the best vector
/// the previous stage left behind and sizes its steps with its own scale, so
/// early stages roam the box and late ones polish. A stage may restrict which
/// dimensions move. Without a configured schedule the default
/// `1, 0.1, 0.01, 0.001` schedule is used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StagedHillClimbMinimizer;

impl StagedHillClimbMinimizer {
    pub fn new() -> Self {
        Self
    }
}

impl Minimizer for StagedHillClimbMinimizer {
    fn name(&self) -> &str {
        "StagedHillClimb"
    }

    fn minimize_with(
        &self,
        problem: &Problem,
        rng: &mut dyn RngCore,
        callback: &mut dyn MinimizerCallback,
    ) -> SearchResult {
        let started = Instant::now();
        let config = problem.config();
        let schedule = config.stage_schedule();
        tracing::info!(
            minimizer = self.name(),
            dimension = problem.dimension(),
            stages = schedule.len(),
            loop_count = config.loop_count,
            parallel_reads = config.parallel_reads,
            "starting minimization"
        );

        let mut state = SearchState::start(problem);
        let initial_penalty = state.penalty;
        let mut stages = Vec::with_capacity(schedule.len());
        let mut status = Status::BudgetExhausted;

        for (index, stage) in schedule.iter().enumerate() {
            let budget = stage.loop_count.unwrap_or(config.loop_count);
            let dimensions = problem.free_dimensions(stage.dimensions.as_deref());
            let step = StepPolicy::new(stage.scale, config.step_decades);

            callback.on_stage(index, stage.scale);
            let outcome = climb(problem, &mut state, &step, &dimensions, budget, rng, callback);
            let stage_result = outcome.stage_result(stage.scale, &state);
            tracing::debug!(
                stage = index,
                scale = stage.scale,
                penalty = stage_result.penalty,
                accepted = stage_result.accepted,
                "stage finished"
            );
            stages.push(stage_result);

            if outcome.status == Status::Cancelled {
                status = Status::Cancelled;
                break;
            }
        }

        let result = state.finish(status, initial_penalty, stages);
        tracing::info!(
            minimizer = self.name(),
            status = ?result.status,
            penalty = result.penalty,
            evaluations = result.evaluations,
            accepted = result.accepted,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "minimization finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::optimization::callback::{HistoryCallback, MinimizerCallback};
    use crate::optimization::config::{DEFAULT_STAGE_SCALES, MinimizerConfig, StageSpec};

    /// Penalty with a wide shallow basin and a narrow deep well at 0.7.
    fn rugged(params: &[f64]) -> f64 {
        params
            .iter()
            .map(|&x| (x - 0.7).powi(2) + 0.1 * (40.0 * x).sin().powi(2))
            .sum()
    }

    fn problem(config: MinimizerConfig) -> Problem {
        Problem::new(vec![9.0, 0.1], vec![0.0; 2], vec![10.0; 2], rugged, config).unwrap()
    }

    #[test]
    fn runs_every_stage_with_its_budget() {
        let calls = Arc::new(AtomicU64::new(0));
        let counter = calls.clone();
        let counted = move |params: &[f64]| {
            counter.fetch_add(1, Ordering::Relaxed);
            rugged(params)
        };
        let config = MinimizerConfig::new(300)
            .with_stages(vec![StageSpec::new(1.0), StageSpec::new(0.1).with_loop_count(50)])
            .with_terminal_stage(StageSpec::new(0.001))
            .with_seed(4);
        let problem =
            Problem::new(vec![9.0, 0.1], vec![0.0; 2], vec![10.0; 2], counted, config).unwrap();

        let result = StagedHillClimbMinimizer::new().minimize(&problem);

        let per_stage: Vec<u64> = result.stages.iter().map(|s| s.evaluations).collect();
        assert_eq!(per_stage, vec![300, 50, 300]);
        assert_eq!(result.evaluations, 650);
        assert_eq!(calls.load(Ordering::Relaxed), 651);
        assert_eq!(result.status, Status::BudgetExhausted);
    }

    #[test]
    fn falls_back_to_default_schedule() {
        let mut history = HistoryCallback::new();
        let mut rng = StdRng::seed_from_u64(1);
        let result = StagedHillClimbMinimizer::new().minimize_with(
            &problem(MinimizerConfig::new(100)),
            &mut rng,
            &mut history,
        );

        let scales: Vec<f64> = history.stages().iter().map(|&(_, scale)| scale).collect();
        assert_eq!(scales, DEFAULT_STAGE_SCALES.to_vec());
        assert_eq!(result.stages.len(), DEFAULT_STAGE_SCALES.len());
        assert_eq!(result.evaluations, 400);
    }

    #[test]
    fn later_stages_never_lose_ground() {
        for seed in 0..5 {
            let config = MinimizerConfig::new(2_000)
                .with_stages(vec![StageSpec::new(1.0), StageSpec::new(0.05), StageSpec::new(0.001)])
                .with_seed(seed);
            let result = StagedHillClimbMinimizer::new().minimize(&problem(config));

            let penalties: Vec<f64> = result.stages.iter().map(|s| s.penalty).collect();
            assert!(penalties.windows(2).all(|w| w[1] <= w[0]), "seed {seed}: {penalties:?}");
            assert!(result.penalty <= result.stages[0].penalty);
            assert!(result.penalty <= result.initial_penalty);
        }
    }

    #[test]
    fn stage_dimensions_restrict_movement() {
        let config = MinimizerConfig::new(500)
            .with_stages(vec![StageSpec::new(1.0).with_dimensions(vec![0])])
            .with_seed(2);
        let result = StagedHillClimbMinimizer::new().minimize(&problem(config));
        assert_eq!(result.params[1], 0.1);
        assert!(result.params[0] < 9.0);
    }

    /// Stops the run once the second stage begins.
    struct StopAtStage {
        stage: usize,
    }

    impl MinimizerCallback for StopAtStage {
        fn on_stage(&mut self, index: usize, _scale: f64) {
            self.stage = index;
        }

        fn should_stop(&self) -> bool {
            self.stage >= 1
        }
    }

    #[test]
    fn cancellation_skips_remaining_stages() {
        let config = MinimizerConfig::new(100)
            .with_stages(vec![StageSpec::new(1.0), StageSpec::new(0.1), StageSpec::new(0.01)]);
        let mut rng = StdRng::seed_from_u64(6);
        let mut callback = StopAtStage { stage: 0 };
        let target = problem(config);
        let result =
            StagedHillClimbMinimizer::new().minimize_with(&target, &mut rng, &mut callback);

        assert_eq!(result.status, Status::Cancelled);
        assert_eq!(result.stages.len(), 2);
        assert_eq!(result.evaluations, 100);
    }
}
