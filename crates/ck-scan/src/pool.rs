//! Order-preserving parallel evaluation of scan jobs.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ck_core::errors::{CkError, ErrorInfo};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::dfunction::FunctionRegistry;
use crate::space::SamplePoint;

/// One unit of work: evaluate a registered function at a point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Position of the job in the submission order.
    pub index: usize,
    /// Registered name of the distribution function.
    pub function: String,
    /// Parameter values to evaluate at.
    pub values: SamplePoint,
}

/// Snapshot published after every completed job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Jobs finished so far.
    pub completed: usize,
    /// Jobs submitted.
    pub total: usize,
    /// Time since the run started.
    pub elapsed: Duration,
    /// Linear extrapolation of the remaining time.
    pub remaining: Duration,
}

/// Receiver of [`Progress`] updates; called from worker threads.
pub trait ProgressObserver: Send + Sync {
    /// Called once per completed job.
    fn on_progress(&self, progress: &Progress);
}

impl<F> ProgressObserver for F
where
    F: Fn(&Progress) + Send + Sync,
{
    fn on_progress(&self, progress: &Progress) {
        self(progress)
    }
}

/// Shared flag that stops a running scan.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Fresh, unset token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; jobs not yet started are skipped.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True once [`CancelToken::cancel`] was called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Optional hooks for [`WorkerPool::run_with`].
#[derive(Clone, Default)]
pub struct RunHooks {
    /// Receives progress updates.
    pub observer: Option<Arc<dyn ProgressObserver>>,
    /// Checked before every job.
    pub cancel: Option<CancelToken>,
}

/// Fixed-size pool of worker threads evaluating [`Job`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    /// Pool with `workers` threads; `None` uses the available parallelism.
    pub fn new(workers: Option<usize>) -> Self {
        let workers = match workers {
            Some(n) => n.max(1),
            None => match std::thread::available_parallelism() {
                Ok(n) => n.get(),
                Err(err) => {
                    warn!(%err, "cannot determine available parallelism, using one worker");
                    1
                }
            },
        };
        Self { workers }
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Evaluates `jobs` and returns their distributions in input order.
    pub fn run(&self, jobs: &[Job], registry: &FunctionRegistry) -> Result<Vec<Vec<f64>>, CkError> {
        self.run_with(jobs, registry, &RunHooks::default())
    }

    /// Like [`WorkerPool::run`] with progress reporting and cancellation.
    ///
    /// The first failing job stops the run: jobs not yet started are
    /// skipped and the error of the failing job with the lowest index is
    /// returned together with its parameter values.
    pub fn run_with(
        &self,
        jobs: &[Job],
        registry: &FunctionRegistry,
        hooks: &RunHooks,
    ) -> Result<Vec<Vec<f64>>, CkError> {
        let functions = jobs
            .iter()
            .map(|job| registry.get(&job.function))
            .collect::<Result<Vec<_>, _>>()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|err| {
                CkError::Configuration(ErrorInfo::new("thread-pool", err.to_string()))
            })?;

        let total = jobs.len();
        info!(jobs = total, workers = self.workers, "starting scan");
        let started = Instant::now();
        let completed = AtomicUsize::new(0);
        let failed = AtomicBool::new(false);
        let first_error: Mutex<Option<(usize, CkError)>> = Mutex::new(None);
        let record = |index: usize, err: CkError| {
            failed.store(true, Ordering::SeqCst);
            if let Ok(mut slot) = first_error.lock() {
                match &*slot {
                    Some((existing, _)) if *existing <= index => {}
                    _ => *slot = Some((index, err)),
                }
            }
        };

        let outcome: Option<Vec<(usize, Vec<f64>)>> = pool.install(|| {
            jobs.par_iter()
                .zip(functions.par_iter())
                .enumerate()
                .map(|(position, (job, function))| {
                    if failed.load(Ordering::SeqCst) {
                        return None;
                    }
                    if hooks.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                        record(
                            position,
                            CkError::Cancelled(
                                ErrorInfo::new("scan-cancelled", "scan was cancelled")
                                    .with_context("index", job.index.to_string()),
                            ),
                        );
                        return None;
                    }
                    match function.evaluate(&job.values) {
                        Ok(distribution) => {
                            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                            let progress = progress_at(done, total, started.elapsed());
                            debug!(
                                completed = progress.completed,
                                total = progress.total,
                                elapsed_s = progress.elapsed.as_secs_f64(),
                                remaining_s = progress.remaining.as_secs_f64(),
                                "scan progress"
                            );
                            if let Some(observer) = &hooks.observer {
                                observer.on_progress(&progress);
                            }
                            Some((position, distribution))
                        }
                        Err(err) => {
                            record(position, point_failure(job, err));
                            None
                        }
                    }
                })
                .collect()
        });

        let mut ordered = match outcome {
            Some(results) if !failed.load(Ordering::SeqCst) => results,
            _ => {
                let slot = first_error.lock().ok().and_then(|mut slot| slot.take());
                let err = match slot {
                    Some((_, err)) => err,
                    None => CkError::Cancelled(ErrorInfo::new(
                        "scan-aborted",
                        "scan stopped before all jobs completed",
                    )),
                };
                warn!(%err, "scan aborted");
                return Err(err);
            }
        };
        ordered.sort_by_key(|(position, _)| *position);
        info!(
            jobs = total,
            elapsed_s = started.elapsed().as_secs_f64(),
            "scan finished"
        );
        Ok(ordered.into_iter().map(|(_, distribution)| distribution).collect())
    }
}

fn progress_at(completed: usize, total: usize, elapsed: Duration) -> Progress {
    let remaining = if completed == 0 {
        Duration::ZERO
    } else {
        elapsed.mul_f64((total - completed) as f64 / completed as f64)
    };
    Progress {
        completed,
        total,
        elapsed,
        remaining,
    }
}

fn point_failure(job: &Job, err: CkError) -> CkError {
    let mut info = err.info().clone();
    info.context
        .insert("index".to_string(), job.index.to_string());
    info.context
        .insert("point".to_string(), job.values.to_string());
    match err {
        CkError::Evaluation(_) => CkError::Evaluation(info),
        CkError::NumericDegeneracy(_) => CkError::NumericDegeneracy(info),
        _ => CkError::Evaluation(info),
    }
}
