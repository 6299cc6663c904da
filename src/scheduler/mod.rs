//! Shared scheduler types and the single-task execution path used
//! identically by both the fast path (`fast.rs`, component F) and the
//! safe path (`safe.rs`, component G), so that the two are guaranteed to
//! produce byte-identical output.

pub mod fast;
pub mod safe;

use std::fs;
use std::path::{Path, PathBuf};

use crate::cancel::CancelToken;
use crate::codec;
use crate::downsample;
use crate::error::{PyramidError, TaskError};
use crate::path_validator;
use crate::planner::{LevelSpec, PairTask};

/// One output to produce: average `a` and `b`, write `output_index` under
/// `dest_dir`.
#[derive(Debug, Clone)]
pub struct Task {
    pub level: usize,
    pub output_index: usize,
    pub a: PathBuf,
    pub b: PathBuf,
    pub dest_dir: PathBuf,
    pub weight: f64,
}

/// Result of attempting one task.
#[derive(Debug)]
pub enum TaskOutcome {
    Completed,
    /// Cancellation was observed before the write; no output was produced.
    Cancelled,
    Failed(TaskError),
}

/// A task result as reported back to the scheduler thread.
#[derive(Debug)]
pub struct TaskResult {
    pub level: usize,
    pub output_index: usize,
    pub weight: f64,
    pub outcome: TaskOutcome,
}

pub(crate) fn tasks_for_level(
    level: &LevelSpec,
    weight: f64,
    overwrite_existing: bool,
) -> (Vec<Task>, Vec<Task>) {
    let mut pending = Vec::new();
    let mut skipped = Vec::new();
    for pair in &level.pairs {
        let task = task_from_pair(level, pair, weight);
        let out_path = task.dest_dir.join(format!("{:06}.tif", task.output_index));
        if !overwrite_existing && out_path.exists() {
            skipped.push(task);
        } else {
            pending.push(task);
        }
    }
    (pending, skipped)
}

fn task_from_pair(level: &LevelSpec, pair: &PairTask, weight: f64) -> Task {
    Task {
        level: level.level,
        output_index: pair.output_index,
        a: pair.a.clone(),
        b: pair.b.clone(),
        dest_dir: level.dest_dir.clone(),
        weight,
    }
}

/// Creates `dir`, validating every path segment against `base` on the way
/// down (component A, invoked from the scheduler's "prepare" step rather
/// than from the validator itself, since directory creation is a
/// filesystem mutation and not a pure path check).
pub fn ensure_dir(dir: &Path, base: &Path) -> Result<PathBuf, PyramidError> {
    if let Some(parent) = dir.parent() {
        if parent != dir && !parent.exists() {
            ensure_dir(parent, base)?;
        }
    }
    let validated = path_validator::validate_path(dir, base)?;
    fs::create_dir_all(&validated)?;
    Ok(validated)
}

/// Runs one task: reads both inputs, checks cancellation between the reads
/// and the write, downsamples, writes atomically via
/// temp-file rename.
pub fn execute_task(task: &Task, base: &Path, cancel: &CancelToken) -> TaskOutcome {
    if cancel.is_cancelled() {
        return TaskOutcome::Cancelled;
    }
    match execute_task_inner(task, base, cancel) {
        Ok(true) => TaskOutcome::Completed,
        Ok(false) => TaskOutcome::Cancelled,
        Err(e) => TaskOutcome::Failed(e),
    }
}

fn execute_task_inner(task: &Task, base: &Path, cancel: &CancelToken) -> Result<bool, TaskError> {
    let a_path = path_validator::validate_path(&task.a, base)?;
    let img_a = codec::load_gray(&a_path)?;
    let b_path = path_validator::validate_path(&task.b, base)?;
    let img_b = codec::load_gray(&b_path)?;

    if cancel.is_cancelled() {
        return Ok(false);
    }

    let result = downsample::pair_downsample(&img_a, &img_b)?;

    let filename = format!("{:06}.tif", task.output_index);
    let final_path = task.dest_dir.join(&filename);
    let validated_final = path_validator::validate_path(&final_path, base)?;
    write_atomically(&validated_final, &result)?;
    Ok(true)
}

fn write_atomically(final_path: &Path, image: &codec::GrayImage) -> Result<(), TaskError> {
    let tmp_path = final_path.with_extension("tif.tmp");
    codec::save_gray_tiff(&tmp_path, image)?;
    fs::rename(&tmp_path, final_path).map_err(TaskError::Write)?;
    Ok(())
}
