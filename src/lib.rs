//! Multi-resolution thumbnail pyramid builder for CT slice stacks.
//!
//! Given a directory of numbered grayscale slices, [`build_pyramid`] produces
//! a hierarchy of half-scale subsampled levels under `<input_dir>/.thumbnail/`,
//! reporting progress/ETA to a caller-supplied [`ProgressSink`] and honouring
//! cooperative cancellation via [`CancelToken`].
//!
//! This crate does not install a `tracing` subscriber — callers wire up their
//! own, the way a library is expected to rather than a binary.

pub mod cancel;
pub mod codec;
pub mod downsample;
pub mod error;
pub mod options;
pub mod path_validator;
pub mod planner;
pub mod progress;
pub mod scheduler;

use std::collections::BTreeMap;

use cancel::CancelToken;
use error::PyramidError;
use options::{BuildOptions, ResolvedMode};
use planner::LevelPlan;
use progress::{Estimator, ProgressSample};
use scheduler::{ensure_dir, TaskOutcome, TaskResult};

/// Events emitted to a [`ProgressSink`] over the life of one [`build_pyramid`]
/// call, per the invocation surface.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Started {
        total_levels: usize,
        total_work: f64,
    },
    LevelStarted {
        level: usize,
        count: usize,
        width: u32,
        height: u32,
    },
    Progress {
        completed_work: f64,
        total_work: f64,
        current_level: usize,
        current_index: usize,
        eta_seconds: Option<f64>,
    },
    LevelCompleted {
        level: usize,
        failures: usize,
    },
    Finished {
        outcome: OutcomeKind,
    },
}

/// The terminal-outcome label carried by [`ProgressEvent::Finished`], per
/// the outcome tag (`Ok` / `PartialSuccess` / `Cancelled` / `Fatal`). Fatal
/// never reaches this event — it surfaces as an `Err` from
/// [`build_pyramid`] instead, before any run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Ok,
    PartialSuccess,
    Cancelled,
}

/// Receives [`ProgressEvent`]s as a run progresses. Implemented for any
/// `FnMut(ProgressEvent)` so callers can pass a closure.
pub trait ProgressSink {
    fn on_event(&mut self, event: ProgressEvent);
}

impl<F: FnMut(ProgressEvent)> ProgressSink for F {
    fn on_event(&mut self, event: ProgressEvent) {
        self(event)
    }
}

/// A no-op sink for callers that don't want progress reporting.
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn on_event(&mut self, _event: ProgressEvent) {}
}

/// One task that failed during a run, carried in [`Outcome::PartialSuccess`].
#[derive(Debug)]
pub struct FailedTask {
    pub level: usize,
    pub output_index: usize,
    pub error: error::TaskError,
}

/// Terminal outcome of a [`build_pyramid`] call.
#[derive(Debug)]
pub enum Outcome {
    /// Every task across every level succeeded (or was skipped because its
    /// output already existed and `overwrite_existing` was false).
    Ok,
    /// At least one level finished with failures but the run progressed.
    PartialSuccess { failed: Vec<FailedTask> },
    /// The caller cancelled the run. Results through the last fully
    /// completed level are usable.
    Cancelled { completed_through_level: usize },
}

fn sample_to_event(sample: ProgressSample) -> ProgressEvent {
    ProgressEvent::Progress {
        completed_work: sample.completed_work,
        total_work: sample.total_work,
        current_level: sample.current_level,
        current_index: sample.current_index,
        eta_seconds: sample.eta_seconds,
    }
}

/// Builds (or resumes) the thumbnail pyramid for `input_dir`.
///
/// Scans `input_dir` via [`planner::plan`], then runs each level in order on
/// the fast ([`scheduler::fast`]) or safe ([`scheduler::safe`]) path per
/// `options.mode`, emitting [`ProgressEvent`]s to `progress` and stopping
/// early if `cancel` becomes set.
pub fn build_pyramid(
    input_dir: &std::path::Path,
    options: &BuildOptions,
    progress: &mut dyn ProgressSink,
    cancel: &CancelToken,
) -> Result<Outcome, PyramidError> {
    options.validate()?;

    let plan = planner::plan(input_dir, options)?;
    let total_work = weighted_total_work(&plan);

    progress.on_event(ProgressEvent::Started {
        total_levels: plan.levels.len(),
        total_work,
    });

    let mut estimator = Estimator::new(total_work);
    let worker_count = options.worker_count.resolve();
    let resolved_mode = options.mode.resolve();

    let mut failed: Vec<FailedTask> = Vec::new();
    let mut last_completed_level = 0usize;
    let mut was_cancelled = false;

    'levels: for level in &plan.levels {
        let weight = level_weight(level.level);
        ensure_dir(&level.dest_dir, input_dir)?;

        let (pending, skipped) =
            scheduler::tasks_for_level(level, weight, options.overwrite_existing);

        progress.on_event(ProgressEvent::LevelStarted {
            level: level.level,
            count: level.count,
            width: level.width,
            height: level.height,
        });

        for task in &skipped {
            estimator.credit_existing(task.weight);
        }

        if cancel.is_cancelled() {
            was_cancelled = true;
            break 'levels;
        }

        let mut level_failures: BTreeMap<usize, error::TaskError> = BTreeMap::new();
        let mut level_cancelled = false;

        let mut on_result = |result: TaskResult| {
            match result.outcome {
                TaskOutcome::Completed => {
                    if let Some(sample) = estimator.record_completion(
                        result.level,
                        result.output_index,
                        result.weight,
                    ) {
                        progress.on_event(sample_to_event(sample));
                    }
                }
                TaskOutcome::Cancelled => {
                    level_cancelled = true;
                }
                TaskOutcome::Failed(e) => {
                    level_failures.insert(result.output_index, e);
                }
            }
        };

        match resolved_mode {
            ResolvedMode::Parallel => {
                scheduler::fast::run_level(pending, input_dir, worker_count, cancel, &mut on_result)
            }
            ResolvedMode::Sequential => {
                scheduler::safe::run_level(pending, input_dir, cancel, &mut on_result)
            }
        }

        let sample = estimator.level_boundary(level.level, level.count);
        progress.on_event(sample_to_event(sample));
        progress.on_event(ProgressEvent::LevelCompleted {
            level: level.level,
            failures: level_failures.len(),
        });

        for (output_index, task_error) in level_failures {
            failed.push(FailedTask {
                level: level.level,
                output_index,
                error: task_error,
            });
        }

        if level_cancelled || cancel.is_cancelled() {
            was_cancelled = true;
            break 'levels;
        }
        last_completed_level = level.level;
    }

    let outcome = if was_cancelled {
        Outcome::Cancelled {
            completed_through_level: last_completed_level,
        }
    } else if failed.is_empty() {
        Outcome::Ok
    } else {
        Outcome::PartialSuccess { failed }
    };

    progress.on_event(ProgressEvent::Finished {
        outcome: outcome_kind(&outcome),
    });

    Ok(outcome)
}

fn outcome_kind(outcome: &Outcome) -> OutcomeKind {
    match outcome {
        Outcome::Ok => OutcomeKind::Ok,
        Outcome::PartialSuccess { .. } => OutcomeKind::PartialSuccess,
        Outcome::Cancelled { .. } => OutcomeKind::Cancelled,
    }
}

fn level_weight(level: usize) -> f64 {
    4f64.powi(1 - level as i32)
}

fn weighted_total_work(plan: &LevelPlan) -> f64 {
    plan.levels
        .iter()
        .map(|l| l.count as f64 * level_weight(l.level))
        .sum()
}

/// Installs a `tracing` subscriber that writes to the test harness's
/// captured stdout, for tests that want to see `planner`/scheduler log
/// output rather than just assert on outcomes. Safe to call more than once
/// per process (subsequent calls are ignored).
#[cfg(test)]
pub(crate) fn init_test_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
