use std::fmt;
use std::sync::{Mutex, PoisonError};

use crate::core::Bounds;
use crate::error::{ConstructionError, PenaltyError};
use crate::optimization::config::MinimizerConfig;

/// Cost of a parameter vector; lower is better.
///
/// Implemented for every `Fn(&[f64]) -> f64`. Wrap fallible closures in
/// [`Fallible`].
pub trait Penalty: Send + Sync {
    fn evaluate(&self, params: &[f64]) -> Result<f64, PenaltyError>;
}

impl<F> Penalty for F
where
    F: Fn(&[f64]) -> f64 + Send + Sync,
{
    fn evaluate(&self, params: &[f64]) -> Result<f64, PenaltyError> {
        Ok(self(params))
    }
}

/// Adapter for penalty closures that can fail, e.g. when the model
/// computation behind them errors out.
pub struct Fallible<F>(pub F);

impl<F> Penalty for Fallible<F>
where
    F: Fn(&[f64]) -> Result<f64, PenaltyError> + Send + Sync,
{
    fn evaluate(&self, params: &[f64]) -> Result<f64, PenaltyError> {
        (self.0)(params)
    }
}

/// A bounded minimization problem.
///
/// Everything except the current-best vector is fixed at construction. The
/// vector sits behind the mutex that both the running minimizer and every
/// reader go through, so readers always see a whole vector.
pub struct Problem {
    current: Mutex<Vec<f64>>,
    bounds: Bounds,
    fixed: Vec<bool>,
    penalty: Box<dyn Penalty>,
    config: MinimizerConfig,
}

impl Problem {
    /// Bundle a starting vector, its bounds, a penalty and a config.
    ///
    /// `initial` is not required to be feasible; minimizers project it
    /// before the first evaluation.
    pub fn new<P>(
        initial: Vec<f64>,
        minima: Vec<f64>,
        maxima: Vec<f64>,
        penalty: P,
        config: MinimizerConfig,
    ) -> Result<Self, ConstructionError>
    where
        P: Penalty + 'static,
    {
        if initial.len() != minima.len() || minima.len() != maxima.len() {
            return Err(ConstructionError::DimensionMismatch {
                initial: initial.len(),
                minima: minima.len(),
                maxima: maxima.len(),
            });
        }
        let bounds = Bounds::new(minima, maxima)?;
        config.validate(Some(bounds.len()))?;

        Ok(Self {
            fixed: vec![false; initial.len()],
            current: Mutex::new(initial),
            bounds,
            penalty: Box::new(penalty),
            config,
        })
    }

    /// Mark dimensions the minimizer must leave untouched.
    pub fn with_fixed(mut self, fixed: Vec<bool>) -> Result<Self, ConstructionError> {
        if fixed.len() != self.dimension() {
            return Err(ConstructionError::FixedMaskMismatch {
                mask: fixed.len(),
                dimension: self.dimension(),
            });
        }
        self.fixed = fixed;
        Ok(self)
    }

    pub fn dimension(&self) -> usize {
        self.bounds.len()
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn config(&self) -> &MinimizerConfig {
        &self.config
    }

    pub fn is_fixed(&self, index: usize) -> bool {
        self.fixed[index]
    }

    /// Indices the minimizer may move, optionally restricted to `only`.
    pub fn free_dimensions(&self, only: Option<&[usize]>) -> Vec<usize> {
        match only {
            Some(dims) => dims.iter().copied().filter(|&i| !self.fixed[i]).collect(),
            None => (0..self.dimension()).filter(|&i| !self.fixed[i]).collect(),
        }
    }

    /// Copy of the current-best vector.
    pub fn current_parameters(&self) -> Vec<f64> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the current-best vector in one critical section.
    ///
    /// This is the writer side of the problem: a minimizer calls it after
    /// every accepted candidate, and it is the only update concurrent readers
    /// observe. Components beyond the problem's dimension are ignored; a
    /// shorter slice replaces only the leading components.
    pub fn publish(&self, params: &[f64]) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let n = current.len().min(params.len());
        current[..n].copy_from_slice(&params[..n]);
    }

    /// Raw penalty evaluation.
    pub fn evaluate(&self, params: &[f64]) -> Result<f64, PenaltyError> {
        self.penalty.evaluate(params)
    }

    /// Penalty with failures and NaN scored as `+inf`, so they never win.
    pub fn penalty_of(&self, params: &[f64]) -> f64 {
        match self.penalty.evaluate(params) {
            Ok(value) if !value.is_nan() => value,
            Ok(_) => f64::INFINITY,
            Err(err) => {
                tracing::trace!(error = %err, "penalty evaluation failed, candidate discarded");
                f64::INFINITY
            }
        }
    }
}

impl fmt::Debug for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Problem")
            .field("current", &self.current_parameters())
            .field("bounds", &self.bounds)
            .field("fixed", &self.fixed)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
