//! # Progress and Cancellation
//!
//! Stage functions report progress through a [`ProgressObserver`] and poll a
//! [`CancellationToken`]; both travel in a [`RunContext`]. The algorithms
//! never print or sleep, so callers decide how progress is shown.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use pipeline_types::Stage;

use crate::error::{CoverageError, Result};

/// Receives progress notifications from the pipeline stages.
///
/// Methods may be called concurrently from worker threads.
pub trait ProgressObserver: Send + Sync {
    /// A stage is about to process `total` units of work.
    fn stage_started(&self, _stage: Stage, _total: usize) {}

    /// `completed` of `total` units are done.
    fn advanced(&self, _stage: Stage, _completed: usize, _total: usize) {}

    /// A stage finished and produced `produced` items.
    fn stage_finished(&self, _stage: Stage, _produced: usize) {}
}

/// Observer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {}

/// Observer that logs stage boundaries and every 10 % of progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingProgress;

impl ProgressObserver for LoggingProgress {
    fn stage_started(&self, stage: Stage, total: usize) {
        tracing::info!(stage = %stage, total, "Stage started");
    }

    fn advanced(&self, stage: Stage, completed: usize, total: usize) {
        if total == 0 {
            return;
        }
        let step = (total / 10).max(1);
        if completed % step == 0 || completed == total {
            tracing::info!(
                stage = %stage,
                completed,
                total,
                percent = completed * 100 / total,
                "Stage progress"
            );
        }
    }

    fn stage_finished(&self, stage: Stage, produced: usize) {
        tracing::info!(stage = %stage, produced, "Stage finished");
    }
}

/// Shared flag that asks a running pipeline to stop.
///
/// Cloning yields a handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns true once [`cancel`](Self::cancel) was called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Fails with [`CoverageError::Cancelled`] if cancellation was requested.
    pub fn check(&self, stage: Stage) -> Result<()> {
        if self.is_cancelled() {
            Err(CoverageError::Cancelled { stage })
        } else {
            Ok(())
        }
    }
}

static NO_PROGRESS: NoProgress = NoProgress;

/// Observer and cancellation handle passed into stage functions.
#[derive(Clone)]
pub struct RunContext<'a> {
    pub observer: &'a dyn ProgressObserver,
    pub cancellation: CancellationToken,
}

impl<'a> RunContext<'a> {
    pub fn new(observer: &'a dyn ProgressObserver, cancellation: CancellationToken) -> Self {
        Self {
            observer,
            cancellation,
        }
    }

    /// Starts tracking one stage of `total` units.
    pub(crate) fn track(&self, stage: Stage, total: usize) -> StageTracker<'_> {
        self.observer.stage_started(stage, total);
        StageTracker {
            stage,
            total,
            completed: AtomicUsize::new(0),
            context: self,
        }
    }
}

impl Default for RunContext<'_> {
    fn default() -> Self {
        Self {
            observer: &NO_PROGRESS,
            cancellation: CancellationToken::new(),
        }
    }
}

impl std::fmt::Debug for RunContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Counts completed units of one stage across worker threads.
pub(crate) struct StageTracker<'a> {
    stage: Stage,
    total: usize,
    completed: AtomicUsize,
    context: &'a RunContext<'a>,
}

impl StageTracker<'_> {
    /// Checks for cancellation, then records one finished unit.
    pub(crate) fn tick(&self) -> Result<()> {
        self.context.cancellation.check(self.stage)?;
        let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        self.context
            .observer
            .advanced(self.stage, completed, self.total);
        Ok(())
    }

    pub(crate) fn finish(self, produced: usize) {
        self.context.observer.stage_finished(self.stage, produced);
    }
}
