use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Progress hooks invoked by a running minimizer.
///
/// All methods default to no-ops, so `()` works as "no callback".
pub trait MinimizerCallback {
    /// Called after a candidate replaced the current best.
    fn on_accept(&mut self, _evaluation: u64, _params: &[f64], _penalty: f64) {}

    /// Called before a stage starts.
    fn on_stage(&mut self, _index: usize, _scale: f64) {}

    /// Checked before every candidate (or round); `true` ends the run early.
    fn should_stop(&self) -> bool {
        false
    }
}

impl MinimizerCallback for () {}

/// Accepted candidate recorded by [`HistoryCallback`].
#[derive(Debug, Clone, PartialEq)]
pub struct IterationResult {
    pub evaluation: u64,
    pub params: Vec<f64>,
    pub penalty: f64,
}

/// Records every accepted candidate and logs progress through `tracing`.
#[derive(Debug, Default)]
pub struct HistoryCallback {
    history: Vec<IterationResult>,
    stages: Vec<(usize, f64)>,
}

impl HistoryCallback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepted candidates in acceptance order.
    pub fn history(&self) -> &[IterationResult] {
        &self.history
    }

    /// `(index, scale)` of every stage that started.
    pub fn stages(&self) -> &[(usize, f64)] {
        &self.stages
    }

    /// Log a summary of the run.
    pub fn log_summary(&self) {
        match self.history.last() {
            Some(last) => tracing::info!(
                accepted = self.history.len(),
                last_evaluation = last.evaluation,
                penalty = last.penalty,
                "minimization history"
            ),
            None => tracing::info!("minimization history: no candidate accepted"),
        }
    }
}

impl MinimizerCallback for HistoryCallback {
    fn on_accept(&mut self, evaluation: u64, params: &[f64], penalty: f64) {
        tracing::trace!(evaluation, penalty, "accepted candidate");
        self.history.push(IterationResult {
            evaluation,
            params: params.to_vec(),
            penalty,
        });
    }

    fn on_stage(&mut self, index: usize, scale: f64) {
        self.stages.push((index, scale));
    }
}

/// Shared flag asking a running minimizer to stop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl MinimizerCallback for CancelToken {
    fn should_stop(&self) -> bool {
        self.is_cancelled()
    }
}
