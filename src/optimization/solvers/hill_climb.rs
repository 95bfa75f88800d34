use std::time::Instant;

use rand::RngCore;
use rayon::prelude::*;

use super::step::StepPolicy;
use super::traits::{Minimizer, SearchResult, StageResult, Status};
use crate::optimization::callback::MinimizerCallback;
use crate::optimization::config::ConfigError;
use crate::optimization::problem::Problem;

/// Greedy single-phase hill climb with a fixed evaluation budget.
///
/// Every candidate is a range-relative perturbation of the current best,
/// projected into bounds. A candidate replaces the best only when its penalty
/// is strictly lower; there is no probabilistic acceptance and no convergence
/// test, the run always spends `loop_count` evaluations unless cancelled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HillClimbMinimizer {
    scale: f64,
}

impl Default for HillClimbMinimizer {
    fn default() -> Self {
        Self { scale: 1.0 }
    }
}

impl HillClimbMinimizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Step scale relative to each dimension's range (default: 1.0)
    pub fn with_scale(mut self, scale: f64) -> Result<Self, ConfigError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ConfigError::Scale(scale));
        }
        self.scale = scale;
        Ok(self)
    }
}

impl Minimizer for HillClimbMinimizer {
    fn name(&self) -> &str {
        "HillClimb"
    }

    fn minimize_with(
        &self,
        problem: &Problem,
        rng: &mut dyn RngCore,
        callback: &mut dyn MinimizerCallback,
    ) -> SearchResult {
        let started = Instant::now();
        let config = problem.config();
        tracing::info!(
            minimizer = self.name(),
            dimension = problem.dimension(),
            loop_count = config.loop_count,
            parallel_reads = config.parallel_reads,
            "starting minimization"
        );

        let mut state = SearchState::start(problem);
        let initial_penalty = state.penalty;
        let dimensions = problem.free_dimensions(None);
        let step = StepPolicy::new(self.scale, config.step_decades);

        callback.on_stage(0, self.scale);
        let outcome = climb(
            problem,
            &mut state,
            &step,
            &dimensions,
            config.loop_count,
            rng,
            callback,
        );
        let stage = outcome.stage_result(self.scale, &state);

        let result = state.finish(outcome.status, initial_penalty, vec![stage]);
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

/// Best-so-far of a running search.
pub(crate) struct SearchState {
    pub(crate) best: Vec<f64>,
    pub(crate) penalty: f64,
    pub(crate) evaluations: u64,
    pub(crate) accepted: u64,
}

impl SearchState {
    /// Project the problem's current vector, score it and publish it.
    pub(crate) fn start(problem: &Problem) -> Self {
        let mut best = problem.current_parameters();
        problem.bounds().project_in_place(&mut best);
        let penalty = problem.penalty_of(&best);
        problem.publish(&best);
        Self {
            best,
            penalty,
            evaluations: 0,
            accepted: 0,
        }
    }

    fn accept(
        &mut self,
        problem: &Problem,
        candidate: &[f64],
        penalty: f64,
        evaluation: u64,
        callback: &mut dyn MinimizerCallback,
    ) {
        self.best.copy_from_slice(candidate);
        self.penalty = penalty;
        self.accepted += 1;
        problem.publish(&self.best);
        callback.on_accept(evaluation, &self.best, penalty);
    }

    pub(crate) fn finish(
        self,
        status: Status,
        initial_penalty: f64,
        stages: Vec<StageResult>,
    ) -> SearchResult {
        SearchResult {
            status,
            penalty: self.penalty,
            initial_penalty,
            params: self.best,
            evaluations: self.evaluations,
            accepted: self.accepted,
            stages,
        }
    }
}

/// Counters of one `climb` call.
pub(crate) struct ClimbOutcome {
    pub(crate) status: Status,
    evaluations: u64,
    accepted: u64,
}

impl ClimbOutcome {
    pub(crate) fn stage_result(&self, scale: f64, state: &SearchState) -> StageResult {
        StageResult {
            scale,
            penalty: state.penalty,
            evaluations: self.evaluations,
            accepted: self.accepted,
        }
    }
}

/// Spend `budget` candidate evaluations improving `state`.
///
/// Sequential unless the config asks for parallel reads, in which case
/// candidates are drawn in rounds, scored on the rayon pool, and only the
/// round's best is compared against the current best.
pub(crate) fn climb(
    problem: &Problem,
    state: &mut SearchState,
    step: &StepPolicy,
    dimensions: &[usize],
    budget: u64,
    rng: &mut dyn RngCore,
    callback: &mut dyn MinimizerCallback,
) -> ClimbOutcome {
    let batch = problem.config().effective_batch_size();
    let evaluations_before = state.evaluations;
    let accepted_before = state.accepted;

    let status = if batch > 1 {
        climb_parallel(problem, state, step, dimensions, budget, batch, rng, callback)
    } else {
        climb_sequential(problem, state, step, dimensions, budget, rng, callback)
    };

    ClimbOutcome {
        status,
        evaluations: state.evaluations - evaluations_before,
        accepted: state.accepted - accepted_before,
    }
}

fn climb_sequential(
    problem: &Problem,
    state: &mut SearchState,
    step: &StepPolicy,
    dimensions: &[usize],
    budget: u64,
    rng: &mut dyn RngCore,
    callback: &mut dyn MinimizerCallback,
) -> Status {
    let bounds = problem.bounds();
    let mut candidate = Vec::with_capacity(problem.dimension());

    for _ in 0..budget {
        if callback.should_stop() {
            return Status::Cancelled;
        }
        step.perturb(rng, bounds, &state.best, dimensions, &mut candidate);
        let penalty = problem.penalty_of(&candidate);
        state.evaluations += 1;

        if penalty < state.penalty {
            let evaluation = state.evaluations;
            state.accept(problem, &candidate, penalty, evaluation, callback);
        }
    }
    Status::BudgetExhausted
}

#[allow(clippy::too_many_arguments)]
fn climb_parallel(
    problem: &Problem,
    state: &mut SearchState,
    step: &StepPolicy,
    dimensions: &[usize],
    budget: u64,
    batch: usize,
    rng: &mut dyn RngCore,
    callback: &mut dyn MinimizerCallback,
) -> Status {
    let bounds = problem.bounds();
    let mut candidates: Vec<Vec<f64>> = Vec::with_capacity(batch);
    let mut remaining = budget;

    while remaining > 0 {
        if callback.should_stop() {
            return Status::Cancelled;
        }
        // last round is truncated so exactly `budget` candidates get scored
        let round = remaining.min(batch as u64) as usize;
        candidates.resize_with(round, Vec::new);
        for candidate in candidates.iter_mut() {
            step.perturb(rng, bounds, &state.best, dimensions, candidate);
        }

        let scores: Vec<f64> = candidates
            .par_iter()
            .map(|candidate| problem.penalty_of(candidate))
            .collect();

        let (index, penalty) = scores
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::INFINITY), |best, (i, score)| {
                if score < best.1 { (i, score) } else { best }
            });

        let round_start = state.evaluations;
        state.evaluations += round as u64;
        remaining -= round as u64;

        if penalty < state.penalty {
            let evaluation = round_start + index as u64 + 1;
            state.accept(problem, &candidates[index], penalty, evaluation, callback);
        }
    }
    Status::BudgetExhausted
}
