//! Pyramid Scheduler, safe path (component G). Executes the exact same
//! tasks as the fast path, strictly sequentially in index order, with no
//! temp-rename races to reason about and fully deterministic disk access.
//!
//! This exists because, on runtimes where per-task work
//! cannot run in true parallel, added workers only add contention — this
//! core always has a genuinely parallel backend (native OS threads), so in
//! practice `Mode::Auto` picks the fast path whenever more than one core is
//! available; this path is exercised by `Mode::Sequential` and by
//! single-core hosts. It must produce byte-identical output to the fast
//! path, which is why both call the same [`super::execute_task`].

use std::path::Path;

use crate::cancel::CancelToken;

use super::{execute_task, Task, TaskResult};

/// Runs `tasks` one at a time, in order, reporting each to `on_result` as
/// it finishes. Stops dispatching further tasks once cancellation is
/// observed, but still reports a terminal outcome for every task that was
/// handed in.
pub fn run_level<F>(tasks: Vec<Task>, base: &Path, cancel: &CancelToken, mut on_result: F)
where
    F: FnMut(TaskResult),
{
    for task in tasks {
        let outcome = execute_task(&task, base, cancel);
        on_result(TaskResult {
            level: task.level,
            output_index: task.output_index,
            weight: task.weight,
            outcome,
        });
    }
}
