//! Progress/ETA Estimator (component E). Owned exclusively by the
//! scheduler thread — never shared across workers — so its internal state
//! needs no synchronization; workers only ever report completions through
//! a channel the scheduler drains sequentially.
//!
//! There is no earlier precedent for EMA-smoothed ETA: `lib_optimized.rs`
//! reports raw percentage only, via its `pct` callback argument. This
//! module implements it from scratch.

use std::time::{Duration, Instant};

/// Number of initial level-1 completions collected before the estimator
/// starts reporting an ETA.
pub const SAMPLING_WINDOW: usize = 30;

/// EMA smoothing coefficient for throughput.
pub const EMA_ALPHA: f64 = 0.3;

/// Minimum interval between emitted progress events.
pub const UPDATE_INTERVAL: Duration = Duration::from_millis(100);

const EPSILON: f64 = 1e-9;

/// One progress sample, delivered to the caller at most once per 100ms
/// (except at level boundaries, which always emit).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSample {
    pub completed_work: f64,
    pub total_work: f64,
    pub current_level: usize,
    pub current_index: usize,
    pub eta_seconds: Option<f64>,
}

/// Weighted work accounting plus EMA-smoothed remaining-time estimation.
pub struct Estimator {
    work_total: f64,
    work_completed: f64,
    t_start: Instant,
    last_emit: Option<Instant>,
    level1_samples: Vec<(f64, Instant)>,
    first_level1_sample_at: Option<Instant>,
    throughput: Option<f64>,
    last_sample_at: Option<Instant>,
}

impl Estimator {
    pub fn new(work_total: f64) -> Self {
        Estimator {
            work_total,
            work_completed: 0.0,
            t_start: Instant::now(),
            last_emit: None,
            level1_samples: Vec::with_capacity(SAMPLING_WINDOW),
            first_level1_sample_at: None,
            throughput: None,
            last_sample_at: None,
        }
    }

    pub fn completed_work(&self) -> f64 {
        self.work_completed
    }

    pub fn total_work(&self) -> f64 {
        self.work_total
    }

    /// Pre-credits work for an output that already existed on disk before
    /// this run started (idempotent resume). Does not count toward the
    /// level-1 throughput sampling window, since no work was actually
    /// timed for it.
    pub fn credit_existing(&mut self, weight: f64) {
        self.work_completed += weight;
    }

    fn record_throughput_sample(&mut self, level: usize, weight: f64, now: Instant) {
        if level == 1 && self.level1_samples.len() < SAMPLING_WINDOW {
            if self.first_level1_sample_at.is_none() {
                self.first_level1_sample_at = Some(now);
            }
            self.level1_samples.push((weight, now));
        }

        let have_baseline = self.level1_samples.len() >= SAMPLING_WINDOW;

        if have_baseline && self.throughput.is_none() {
            let start = self.first_level1_sample_at.unwrap();
            let elapsed = now.duration_since(start).as_secs_f64().max(EPSILON);
            let work: f64 = self.level1_samples.iter().map(|(w, _)| w).sum();
            self.throughput = Some(work / elapsed);
        } else if have_baseline {
            if let Some(last) = self.last_sample_at {
                let dt = now.duration_since(last).as_secs_f64();
                if dt > EPSILON {
                    let instantaneous = weight / dt;
                    let rho = self.throughput.unwrap_or(instantaneous);
                    self.throughput = Some(EMA_ALPHA * instantaneous + (1.0 - EMA_ALPHA) * rho);
                }
            }
        }
        self.last_sample_at = Some(now);
    }

    fn eta_seconds(&self) -> Option<f64> {
        let rho = self.throughput?;
        let remaining_work = (self.work_total - self.work_completed).max(0.0);
        Some(remaining_work / rho.max(EPSILON))
    }

    /// Records a task completion. Returns a sample only if the 100ms
    /// throttle allows emission right now; callers that want a forced
    /// emission at a level boundary should use [`Estimator::level_boundary`]
    /// instead.
    pub fn record_completion(
        &mut self,
        level: usize,
        index: usize,
        weight: f64,
    ) -> Option<ProgressSample> {
        let now = Instant::now();
        self.work_completed += weight;
        self.record_throughput_sample(level, weight, now);

        let should_emit = match self.last_emit {
            None => true,
            Some(last) => now.duration_since(last) >= UPDATE_INTERVAL,
        };
        if !should_emit {
            return None;
        }
        self.last_emit = Some(now);
        Some(ProgressSample {
            completed_work: self.work_completed,
            total_work: self.work_total,
            current_level: level,
            current_index: index,
            eta_seconds: self.eta_seconds(),
        })
    }

    /// Forces a "refined" sample at a level boundary, bypassing the 100ms
    /// throttle.
    pub fn level_boundary(&mut self, level: usize, count: usize) -> ProgressSample {
        self.last_emit = Some(Instant::now());
        ProgressSample {
            completed_work: self.work_completed,
            total_work: self.work_total,
            current_level: level,
            current_index: count,
            eta_seconds: self.eta_seconds(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.t_start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_no_eta_before_sampling_window_fills() {
        let mut est = Estimator::new(100.0);
        for i in 0..SAMPLING_WINDOW - 1 {
            let sample = est.record_completion(1, i, 1.0);
            if let Some(sample) = sample {
                assert!(sample.eta_seconds.is_none());
            }
        }
    }

    #[test]
    fn completed_work_is_monotonic() {
        let mut est = Estimator::new(10.0);
        let mut last = 0.0;
        for i in 0..10 {
            est.record_completion(1, i, 1.0);
            assert!(est.completed_work() >= last);
            last = est.completed_work();
        }
        assert_eq!(est.completed_work(), 10.0);
    }

    #[test]
    fn credit_existing_advances_completed_work_without_sampling() {
        let mut est = Estimator::new(10.0);
        est.credit_existing(4.0);
        assert_eq!(est.completed_work(), 4.0);
    }

    #[test]
    fn level_boundary_always_emits() {
        let mut est = Estimator::new(10.0);
        let sample = est.level_boundary(1, 2);
        assert_eq!(sample.current_level, 1);
        assert_eq!(sample.current_index, 2);
    }
}
