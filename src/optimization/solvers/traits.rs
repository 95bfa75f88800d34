use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::optimization::callback::MinimizerCallback;
use crate::optimization::problem::Problem;

/// How a search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The full evaluation budget was spent.
    BudgetExhausted,
    /// The callback asked the search to stop.
    Cancelled,
}

/// Outcome of one stage of a search.
#[derive(Debug, Clone, PartialEq)]
pub struct StageResult {
    pub scale: f64,
    pub penalty: f64,
    pub evaluations: u64,
    pub accepted: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub status: Status,
    /// Penalty of `params`.
    pub penalty: f64,
    /// Penalty of the projected starting vector.
    pub initial_penalty: f64,
    pub params: Vec<f64>,
    /// Candidate evaluations, not counting the baseline one.
    pub evaluations: u64,
    pub accepted: u64,
    pub stages: Vec<StageResult>,
}

/// A bounded local search over a [`Problem`].
///
/// The search starts from `problem.current_parameters()`, and publishes every
/// accepted candidate back into the problem, so the problem always holds the
/// best vector found so far.
pub trait Minimizer: Send + Sync {
    fn name(&self) -> &str;

    /// Run to completion with an injected random source and callback.
    fn minimize_with(
        &self,
        problem: &Problem,
        rng: &mut dyn RngCore,
        callback: &mut dyn MinimizerCallback,
    ) -> SearchResult;

    /// Run to completion, seeding from the problem's config.
    fn minimize(&self, problem: &Problem) -> SearchResult {
        let mut rng = rng_for(problem);
        self.minimize_with(problem, &mut rng, &mut ())
    }
}

/// Rng seeded from `config.seed`, or from entropy when unset.
pub fn rng_for(problem: &Problem) -> StdRng {
    match problem.config().seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

// ============================================================================
// GUIDE: ADDING A MINIMIZER
// ============================================================================
//
// 1. Keep the search state local (best vector + best penalty) and call
//    `problem.publish(&best)` after every accepted candidate. That is the only
//    write readers ever see.
//
// 2. Score candidates with `problem.penalty_of`, never `problem.evaluate`
//    directly: failed and NaN evaluations must lose, not abort the run.
//
// 3. Project every candidate with `problem.bounds().project_in_place` before
//    scoring it, and leave fixed dimensions alone.
//
// 4. Check `callback.should_stop()` before each candidate or round and report
//    `Status::Cancelled` when it fires.
//
// 5. Register the minimizer in `select_minimizer` if a config should pick it.
//
// ============================================================================
