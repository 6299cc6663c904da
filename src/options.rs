//! Run options for [`crate::build_pyramid`], modeled on `Config` in
//! `PABannier-WSIStreamer/src/config.rs`: a plain struct with documented
//! defaults and a `validate()` pass, minus the CLI/env-var surface (the
//! GUI/CLI shell that would own that is out of scope for this core).

use crate::error::OptionsError;

/// Default cap below which a level's minimum dimension stops the pyramid.
pub const DEFAULT_MAX_THUMBNAIL_SIZE: u32 = 500;

/// Default cap on the number of levels generated, regardless of size.
pub const DEFAULT_MAX_LEVEL: u32 = 10;

/// Worker pool size for the fast scheduling path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerCount {
    /// `min(available_parallelism, 8)`.
    Auto,
    Fixed(u32),
}

impl Default for WorkerCount {
    fn default() -> Self {
        WorkerCount::Auto
    }
}

impl WorkerCount {
    /// Resolve to a concrete worker count, in `[1, 8]`, typically
    /// `min(cpu_count, 8)`. A fixed count is clamped to the same range so a
    /// caller can't balloon the fast path's worker pool (and its `2*P`-deep
    /// backpressure queue, see `scheduler::fast`) past what the resource
    /// model allows.
    pub fn resolve(self) -> u32 {
        match self {
            WorkerCount::Auto => {
                let cpus = std::thread::available_parallelism()
                    .map(|n| n.get() as u32)
                    .unwrap_or(1);
                cpus.clamp(1, 8)
            }
            WorkerCount::Fixed(n) => n.clamp(1, 8),
        }
    }
}

/// Scheduler execution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Parallel when a genuinely parallel backend is available, else
    /// sequential.
    Auto,
    Parallel,
    Sequential,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Auto
    }
}

impl Mode {
    /// Resolve `Auto` using the same signal `WorkerCount::Auto` uses: more
    /// than one available core means a genuinely parallel backend exists.
    pub fn resolve(self) -> ResolvedMode {
        match self {
            Mode::Parallel => ResolvedMode::Parallel,
            Mode::Sequential => ResolvedMode::Sequential,
            Mode::Auto => {
                let cpus = std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1);
                if cpus > 1 {
                    ResolvedMode::Parallel
                } else {
                    ResolvedMode::Sequential
                }
            }
        }
    }
}

/// The mode actually used for a run, after `Auto` resolution. Reported in
/// no external event, but kept separate from [`Mode`] so the scheduler
/// dispatch is a plain match with no "auto" case left to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedMode {
    Parallel,
    Sequential,
}

/// Options for a pyramid build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    /// A level stops the pyramid once min(width, height) falls to or below
    /// this value.
    pub max_thumbnail_size: u32,
    /// Hard cap on the number of levels generated.
    pub max_level: u32,
    /// Worker pool size for the fast path.
    pub worker_count: WorkerCount,
    /// Scheduler execution strategy.
    pub mode: Mode,
    /// When `false` (default), existing output files are left untouched and
    /// their decode/encode work is skipped. When `true`, every output is
    /// regenerated unconditionally.
    pub overwrite_existing: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            max_thumbnail_size: DEFAULT_MAX_THUMBNAIL_SIZE,
            max_level: DEFAULT_MAX_LEVEL,
            worker_count: WorkerCount::Auto,
            mode: Mode::Auto,
            overwrite_existing: false,
        }
    }
}

impl BuildOptions {
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.max_thumbnail_size == 0 {
            return Err(OptionsError::ZeroThumbnailSize);
        }
        if self.max_level == 0 {
            return Err(OptionsError::ZeroMaxLevel);
        }
        if let WorkerCount::Fixed(0) = self.worker_count {
            return Err(OptionsError::ZeroWorkerCount);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(BuildOptions::default().validate().is_ok());
    }

    #[test]
    fn zero_thumbnail_size_rejected() {
        let mut opts = BuildOptions::default();
        opts.max_thumbnail_size = 0;
        assert_eq!(opts.validate(), Err(OptionsError::ZeroThumbnailSize));
    }

    #[test]
    fn zero_max_level_rejected() {
        let mut opts = BuildOptions::default();
        opts.max_level = 0;
        assert_eq!(opts.validate(), Err(OptionsError::ZeroMaxLevel));
    }

    #[test]
    fn zero_fixed_worker_count_rejected() {
        let mut opts = BuildOptions::default();
        opts.worker_count = WorkerCount::Fixed(0);
        assert_eq!(opts.validate(), Err(OptionsError::ZeroWorkerCount));
    }

    #[test]
    fn worker_count_auto_resolves_in_range() {
        let n = WorkerCount::Auto.resolve();
        assert!((1..=8).contains(&n));
    }

    #[test]
    fn worker_count_fixed_is_clamped_to_eight() {
        assert_eq!(WorkerCount::Fixed(32).resolve(), 8);
        assert_eq!(WorkerCount::Fixed(1).resolve(), 1);
    }
}
