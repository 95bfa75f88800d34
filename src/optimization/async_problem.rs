//! Background execution of a minimizer with non-blocking snapshot reads.
//!
//! One worker thread runs the search and is the only writer of the problem's
//! vector. Any number of readers call
//! [`current_parameters`](AsyncMinimizerProblem::current_parameters); they only
//! wait for the copy under the problem's mutex, never for search progress, and
//! always get a whole vector from some accepted iteration.
//!
//! Completion is a crossbeam channel on which nothing is ever sent: once the
//! worker is running it owns the only sender and drops it on exit (panics
//! included), after which every receiver observes the disconnection, forever.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::error::AsyncError;
use crate::optimization::callback::CancelToken;
use crate::optimization::problem::Problem;
use crate::optimization::solvers::{Minimizer, SearchResult, rng_for, select_minimizer};

/// One-shot completion signal, observable by any number of waiters.
#[derive(Debug, Clone)]
pub struct Completion {
    done: Receiver<()>,
}

impl Completion {
    /// Block until the run has finished.
    pub fn wait(&self) {
        // nothing is ever sent, so this only returns on disconnection
        let _ = self.done.recv();
    }

    /// Block for at most `timeout`; returns whether the run has finished.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        matches!(
            self.done.recv_timeout(timeout),
            Err(RecvTimeoutError::Disconnected)
        )
    }

    pub fn is_done(&self) -> bool {
        matches!(self.done.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Underlying receiver, for use in `crossbeam::select!`.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.done
    }
}

/// A [`Problem`] minimized on a dedicated background thread.
///
/// A problem can be started at most once. Dropping the wrapper detaches the
/// worker: the search runs to completion unless [`cancel`](Self::cancel) was
/// called.
pub struct AsyncMinimizerProblem {
    problem: Arc<Problem>,
    started: AtomicBool,
    done_tx: Mutex<Option<Sender<()>>>,
    done_rx: Receiver<()>,
    cancel: CancelToken,
    result: Arc<OnceLock<SearchResult>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl AsyncMinimizerProblem {
    pub fn new(problem: Problem) -> Self {
        let (done_tx, done_rx) = channel::bounded(0);
        Self {
            problem: Arc::new(problem),
            started: AtomicBool::new(false),
            done_tx: Mutex::new(Some(done_tx)),
            done_rx,
            cancel: CancelToken::new(),
            result: Arc::new(OnceLock::new()),
            worker: Mutex::new(None),
        }
    }

    /// Start the minimizer the problem's config selects.
    pub fn start(&self) -> Result<(), AsyncError> {
        let (minimizer, reason) = select_minimizer(self.problem.config());
        tracing::info!(%reason, "selected minimizer");
        self.start_with(minimizer)
    }

    /// Start `minimizer` on a new background thread.
    ///
    /// # Errors
    ///
    /// [`AsyncError::AlreadyStarted`] if this problem was started before (the
    /// first run is unaffected), [`AsyncError::Spawn`] if the thread could
    /// not be created.
    pub fn start_with(&self, minimizer: Box<dyn Minimizer>) -> Result<(), AsyncError> {
        self.launch(minimizer, |name, run| thread::Builder::new().name(name).spawn(run))
    }

    /// Claim the single start and hand the run to `spawn`.
    ///
    /// A failed spawn releases the claim and leaves completion untouched, so
    /// the problem can be started again.
    fn launch<S>(&self, minimizer: Box<dyn Minimizer>, spawn: S) -> Result<(), AsyncError>
    where
        S: FnOnce(String, Box<dyn FnOnce() + Send>) -> io::Result<JoinHandle<()>>,
    {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(AsyncError::AlreadyStarted);
        }

        // readers may look before the worker's first publish; make sure that
        // first look is already feasible
        let projected = self.problem.bounds().project(&self.problem.current_parameters());
        self.problem.publish(&projected);

        // the worker gets a clone; the stored sender is only dropped once the
        // thread exists
        let done_tx = self
            .done_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let problem = Arc::clone(&self.problem);
        let result = Arc::clone(&self.result);
        let mut cancel = self.cancel.clone();
        let name = format!("minimizer-{}", minimizer.name());

        let run: Box<dyn FnOnce() + Send> = Box::new(move || {
            let _done = done_tx;
            let mut rng = rng_for(&problem);
            let outcome = minimizer.minimize_with(&problem, &mut rng, &mut cancel);
            let _ = result.set(outcome);
        });

        let handle = match spawn(name, run) {
            Ok(handle) => handle,
            Err(err) => {
                self.started.store(false, Ordering::Release);
                return Err(AsyncError::Spawn(err));
            }
        };

        self.done_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        *self.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Whether the background run has ended.
    pub fn is_finished(&self) -> bool {
        self.completion().is_done()
    }

    /// Snapshot of the best vector found so far.
    ///
    /// # Errors
    ///
    /// [`AsyncError::NotStarted`] before [`start`](Self::start).
    pub fn current_parameters(&self) -> Result<Vec<f64>, AsyncError> {
        if !self.is_started() {
            return Err(AsyncError::NotStarted);
        }
        Ok(self.problem.current_parameters())
    }

    pub fn completion(&self) -> Completion {
        Completion {
            done: self.done_rx.clone(),
        }
    }

    /// Ask the running search to stop at its next iteration.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Result of a finished run, `None` while it is still running.
    pub fn result(&self) -> Option<SearchResult> {
        self.result.get().cloned()
    }

    /// Block until the run finishes and return its result.
    pub fn wait(&self) -> Result<SearchResult, AsyncError> {
        if !self.is_started() {
            return Err(AsyncError::NotStarted);
        }
        self.completion().wait();

        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("minimizer thread panicked");
            }
        }
        self.result().ok_or(AsyncError::WorkerPanicked)
    }

    /// Call `on_tick` with a snapshot every `interval` until the run
    /// finishes, then once more with the final vector.
    pub fn watch<F>(&self, interval: Duration, mut on_tick: F) -> Result<(), AsyncError>
    where
        F: FnMut(&[f64]),
    {
        if !self.is_started() {
            return Err(AsyncError::NotStarted);
        }
        let ticker = channel::tick(interval);
        let done = self.done_rx.clone();
        loop {
            crossbeam::select! {
                recv(done) -> _ => break,
                recv(ticker) -> _ => on_tick(self.problem.current_parameters().as_slice()),
            }
        }
        on_tick(self.problem.current_parameters().as_slice());
        Ok(())
    }

    /// Run [`watch`](Self::watch) on its own thread.
    pub fn spawn_watcher<F>(
        self: &Arc<Self>,
        interval: Duration,
        on_tick: F,
    ) -> Result<JoinHandle<()>, AsyncError>
    where
        F: FnMut(&[f64]) + Send + 'static,
    {
        if !self.is_started() {
            return Err(AsyncError::NotStarted);
        }
        let this = Arc::clone(self);
        let handle = thread::Builder::new()
            .name("minimizer-watcher".to_string())
            .spawn(move || {
                if let Err(err) = this.watch(interval, on_tick) {
                    tracing::warn!(error = %err, "watcher stopped");
                }
            })?;
        Ok(handle)
    }

    /// The wrapped problem, for its bounds and config.
    pub fn problem(&self) -> &Problem {
        &self.problem
    }
}
