//! Pyramid Scheduler, fast path (component F). A fixed-size worker pool
//! drains a bounded task queue so a feeder never races ahead of disk I/O;
//! results flow back over a second channel to the scheduler thread, which
//! owns the [`crate::progress::Estimator`] exclusively.
//!
//! Bounded backpressure is grounded in `crossbeam-channel`, used the same
//! way `freddiehaddad-oxidized` wires its event/render threads together
//! with `crossbeam_channel` in its root crate. `lib_optimized.rs` has no
//! task-level parallelism at all — it processes groups of slices strictly
//! sequentially "to avoid Python GIL deadlock issues" and only parallelizes
//! pixel rows within a single image via `rayon`; this module adds a
//! level-at-a-time worker pool on top of that.

use std::path::Path;
use std::thread;

use crossbeam_channel::bounded;

use crate::cancel::CancelToken;

use super::{execute_task, Task, TaskOutcome, TaskResult};

/// Runs `tasks` against `worker_count` threads, sending a [`TaskResult`]
/// for each one to `on_result` as it completes. Blocks until every task has
/// been attempted (or skipped due to cancellation).
pub fn run_level<F>(tasks: Vec<Task>, base: &Path, worker_count: u32, cancel: &CancelToken, mut on_result: F)
where
    F: FnMut(TaskResult),
{
    if tasks.is_empty() {
        return;
    }
    let worker_count = worker_count.max(1) as usize;
    let queue_depth = (worker_count * 2).max(1);

    thread::scope(|scope| {
        let (task_tx, task_rx) = bounded::<Task>(queue_depth);
        let (result_tx, result_rx) = bounded::<TaskResult>(queue_depth);

        for _ in 0..worker_count {
            let task_rx = task_rx.clone();
            let result_tx = result_tx.clone();
            let cancel = cancel.clone();
            scope.spawn(move || {
                while let Ok(task) = task_rx.recv() {
                    let outcome = execute_task(&task, base, &cancel);
                    let result = TaskResult {
                        level: task.level,
                        output_index: task.output_index,
                        weight: task.weight,
                        outcome,
                    };
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
            });
        }
        drop(task_rx);
        drop(result_tx);

        let feeder_cancel = cancel.clone();
        scope.spawn(move || {
            for task in tasks {
                if feeder_cancel.is_cancelled() {
                    break;
                }
                if task_tx.send(task).is_err() {
                    break;
                }
            }
            // dropping task_tx here (end of closure) signals workers to stop
        });

        // Drains until every worker has exited (their result_tx clones drop
        // once the feeder stops sending and task_rx is exhausted), so a
        // cancelled run still reports a terminal outcome for every task
        // that was in flight rather than leaving it unaccounted for.
        for result in result_rx {
            on_result(result);
        }
    });
}
