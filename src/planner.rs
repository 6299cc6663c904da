//! Level Planner (component D). Scans the input directory, infers the
//! slice naming scheme, and produces an ordered level plan consumed by
//! both scheduler paths.
//!
//! Directory scanning and natural-order sort are grounded in
//! `lib_optimized.rs`'s `list_slices_sorted` (`walkdir` + `natord::compare`).
//! Filename pattern inference and per-level work planning are new: that
//! code never parsed prefixes/widths at all, it just globbed and sorted.

use std::path::{Path, PathBuf};

use natord::compare as natord_compare;
use walkdir::WalkDir;

use crate::codec::{self, BitDepth};
use crate::error::PlannerError;
use crate::options::BuildOptions;
use crate::path_validator;

const ALLOWED_EXTENSIONS: &[&str] = &["tif", "tiff", "bmp", "png", "jpg", "jpeg"];

/// One output task at a level: average the two sources at this pair's
/// indices (in the sorted order fixed here), write the result at
/// `output_index`. Odd trailing inputs are dropped (the policy this
/// planner commits to), so every task here is a full pair — never the single-source
/// variant `downsample::single_downsample` exists to serve.
#[derive(Debug, Clone)]
pub struct PairTask {
    pub output_index: usize,
    pub a: PathBuf,
    pub b: PathBuf,
}

/// The full plan for one level: where its inputs live, where its outputs
/// go, and the pair tasks that produce them.
#[derive(Debug, Clone)]
pub struct LevelSpec {
    pub level: usize,
    pub count: usize,
    pub width: u32,
    pub height: u32,
    pub source_dir: PathBuf,
    pub dest_dir: PathBuf,
    pub pairs: Vec<PairTask>,
}

/// The inferred naming scheme plus the validated, ordered file list.
#[derive(Debug, Clone)]
pub struct SliceSequence {
    pub files: Vec<PathBuf>,
    pub prefix: String,
    pub index_width: usize,
    pub extension: String,
    pub min_index: u64,
    pub max_index: u64,
}

/// The complete level plan for a run.
#[derive(Debug, Clone)]
pub struct LevelPlan {
    pub input_dir: PathBuf,
    pub base_out: PathBuf,
    pub input_count: usize,
    pub input_width: u32,
    pub input_height: u32,
    pub bit_depth: BitDepth,
    pub levels: Vec<LevelSpec>,
}

fn list_candidate_files(input_dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(input_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| ALLOWED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();

    files.sort_by(|a, b| natord_compare(&a.to_string_lossy(), &b.to_string_lossy()));
    files
}

/// Splits a filename into (prefix, zero-padded digit run, lowercase
/// extension). Returns `None` if the stem has no trailing digits.
fn parse_name(path: &Path) -> Option<(String, String, String)> {
    let stem = path.file_stem()?.to_str()?;
    let ext = path.extension()?.to_str()?.to_lowercase();
    let digit_start = stem
        .rfind(|c: char| !c.is_ascii_digit())
        .map(|i| i + 1)
        .unwrap_or(0);
    if digit_start == stem.len() {
        return None;
    }
    let prefix = stem[..digit_start].to_string();
    let digits = stem[digit_start..].to_string();
    Some((prefix, digits, ext))
}

/// Infers (prefix, index width, extension) from the two lexicographically
/// (by natural order, matching how the sequence itself is sorted) first
/// names, and rejects the plan outright if they disagree.
fn infer_pattern(first_two: &[PathBuf]) -> Result<(String, usize, String), PlannerError> {
    let mut parsed = Vec::new();
    for p in first_two {
        let (prefix, digits, ext) = parse_name(p).ok_or_else(|| {
            PlannerError::PatternMismatch(p.clone())
        })?;
        parsed.push((prefix, digits, ext));
    }
    let (prefix0, digits0, ext0) = parsed[0].clone();
    if let Some((prefix1, digits1, ext1)) = parsed.get(1) {
        if *prefix1 != prefix0 || digits1.len() != digits0.len() || *ext1 != ext0 {
            return Err(PlannerError::PatternMismatch(first_two[1].clone()));
        }
    }
    Ok((prefix0, digits0.len(), ext0))
}

/// Scans `input_dir`, infers the naming scheme, and truncates the sequence
/// at the first file that deviates from it (logged, not fatal).
pub fn scan(input_dir: &Path) -> Result<SliceSequence, PlannerError> {
    let candidates = list_candidate_files(input_dir);
    if candidates.is_empty() {
        return Err(PlannerError::EmptyInput(input_dir.to_path_buf()));
    }

    let bootstrap: Vec<PathBuf> = candidates.iter().take(2).cloned().collect();
    let (prefix, width, ext) = infer_pattern(&bootstrap)?;

    let mut files = Vec::with_capacity(candidates.len());
    let mut indices = Vec::with_capacity(candidates.len());
    for path in &candidates {
        match parse_name(path) {
            Some((p, digits, e)) if p == prefix && e == ext && digits.len() == width => {
                match digits.parse::<u64>() {
                    Ok(idx) => {
                        indices.push(idx);
                        files.push(path.clone());
                    }
                    Err(_) => {
                        tracing::warn!(path = %path.display(), "slice index is not numeric, truncating sequence here");
                        break;
                    }
                }
            }
            _ => {
                tracing::warn!(
                    path = %path.display(),
                    "slice name deviates from the inferred (prefix={prefix:?}, width={width}, ext={ext:?}) pattern, truncating sequence here"
                );
                break;
            }
        }
    }

    let min_index = *indices.first().unwrap_or(&0);
    let max_index = *indices.last().unwrap_or(&0);

    Ok(SliceSequence {
        files,
        prefix,
        index_width: width,
        extension: ext,
        min_index,
        max_index,
    })
}

fn level_output_path(dest_dir: &Path, index: usize) -> PathBuf {
    dest_dir.join(format!("{index:06}.tif"))
}

/// Builds the full level plan: probes the first slice for dimensions and
/// bit depth, then walks level-by-level until `min(Wℓ, Hℓ) <=
/// max_thumbnail_size` or `Nℓ < 2`, whichever comes first, capped at
/// `options.max_level`.
pub fn plan(input_dir: &Path, options: &BuildOptions) -> Result<LevelPlan, PlannerError> {
    if !input_dir.is_dir() {
        return Err(PlannerError::MissingInputDir(input_dir.to_path_buf()));
    }

    let sequence = scan(input_dir)?;
    if sequence.files.is_empty() {
        return Err(PlannerError::EmptyInput(input_dir.to_path_buf()));
    }

    let first = &sequence.files[0];
    let bit_depth = codec::detect_bit_depth(first)?;
    let (w0, h0) = codec::dimensions(first)?;

    let base_out = path_validator::safe_join(input_dir, &[".thumbnail"])?;

    let mut levels = Vec::new();
    let mut cur_files = sequence.files.clone();
    let mut cur_w = w0;
    let mut cur_h = h0;
    let mut level = 1usize;

    loop {
        if (level as u32) > options.max_level {
            break;
        }
        if cur_files.len() < 2 {
            break;
        }

        let n_pairs = cur_files.len() / 2;
        let new_w = cur_w / 2;
        let new_h = cur_h / 2;
        if new_w == 0 || new_h == 0 {
            break;
        }

        let source_dir = if level == 1 {
            input_dir.to_path_buf()
        } else {
            base_out.join((level - 1).to_string())
        };
        let dest_dir = base_out.join(level.to_string());

        let pairs: Vec<PairTask> = (0..n_pairs)
            .map(|i| PairTask {
                output_index: i,
                a: cur_files[2 * i].clone(),
                b: cur_files[2 * i + 1].clone(),
            })
            .collect();

        levels.push(LevelSpec {
            level,
            count: n_pairs,
            width: new_w,
            height: new_h,
            source_dir,
            dest_dir: dest_dir.clone(),
            pairs,
        });

        if new_w.min(new_h) <= options.max_thumbnail_size {
            break;
        }

        cur_files = (0..n_pairs).map(|i| level_output_path(&dest_dir, i)).collect();
        cur_w = new_w;
        cur_h = new_h;
        level += 1;
    }

    Ok(LevelPlan {
        input_dir: input_dir.to_path_buf(),
        base_out,
        input_count: sequence.files.len(),
        input_width: w0,
        input_height: h0,
        bit_depth,
        levels,
    })
}
