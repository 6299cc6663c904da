//! Error taxonomy for the pyramid builder, per-concern enums wired together
//! with `#[from]` so `?` composes across module boundaries, the way
//! `PABannier-WSIStreamer`'s `error.rs` layers `IoError` / `FormatError` /
//! `TiffError`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the path validator (component A).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("invalid filename {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("path {} escapes input directory {}", .path.display(), .base.display())]
    PathEscape { path: PathBuf, base: PathBuf },
}

/// Errors raised by the image codec adapter (component B).
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("unsupported image format at {}: {reason}", .path.display())]
    UnsupportedFormat { path: PathBuf, reason: String },
}

/// Errors raised by the pair downsampler (component C).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DownsampleError {
    #[error("dimension mismatch: expected {expected_w}x{expected_h}, got {got_w}x{got_h}")]
    DimensionMismatch {
        expected_w: u32,
        expected_h: u32,
        got_w: u32,
        got_h: u32,
    },

    #[error("bit depth mismatch between paired images")]
    BitDepthMismatch,

    #[error("image too small to downsample: {w}x{h}")]
    TooSmall { w: u32, h: u32 },
}

/// Errors raised by the level planner (component D).
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("input directory {} does not exist or is not a directory", .0.display())]
    MissingInputDir(PathBuf),

    #[error("input directory {} contains no recognised slice images", .0.display())]
    EmptyInput(PathBuf),

    #[error("slice name {} does not follow a consistent (prefix, index width, extension) pattern", .0.display())]
    PatternMismatch(PathBuf),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("failed to probe first slice: {0}")]
    Probe(#[from] CodecError),
}

/// Errors raised by a single scheduler task. These are always task-scoped:
/// the scheduler logs them, counts them, and omits the output rather than
/// aborting the run.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Downsample(#[from] DownsampleError),

    #[error("failed to write output: {0}")]
    Write(#[source] std::io::Error),
}

/// Invalid `BuildOptions` combinations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OptionsError {
    #[error("max_thumbnail_size must be greater than 0")]
    ZeroThumbnailSize,

    #[error("max_level must be greater than 0")]
    ZeroMaxLevel,

    #[error("worker_count must be greater than 0 when fixed")]
    ZeroWorkerCount,
}

/// Top-level error surface returned by [`crate::build_pyramid`]. Every
/// variant here is a `Fatal` outcome per spec: the run never produced a
/// usable pyramid. Task-level failures never reach this type — they are
/// tallied as [`crate::Outcome::PartialSuccess`] instead.
#[derive(Debug, Error)]
pub enum PyramidError {
    #[error(transparent)]
    InvalidOptions(#[from] OptionsError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Planner(#[from] PlannerError),

    #[error("destination directory is not writable: {}", .0.display())]
    DestinationNotWritable(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
