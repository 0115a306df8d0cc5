//! Send-rate schedule for a burst window.
//!
//! The inter-send interval moves through three phases: a constant hold at
//! the starting rate, a linear ease toward the ending rate, and a constant
//! hold at the ending rate until the window expires.

use std::time::Duration;

use super::BurstOptions;

/// Derived schedule values, cached at construction.
///
/// Pure and clock-free: callers feed in the elapsed time since the burst
/// started and get back the interval to wait before the next send.
#[derive(Debug, Clone)]
pub struct BurstSchedule {
    duration: Duration,
    starting_interval: Duration,
    ending_interval: Duration,
    pre_ease: Duration,
    ease: Duration,
}

impl BurstSchedule {
    /// Derive a schedule from burst options.
    pub fn new(options: &BurstOptions) -> Self {
        let duration = options.burst_duration;
        let pre_ease = duration.mul_f64(options.pre_ease_coverage);
        let ease = (duration - pre_ease).div_f64(1.0 + options.ease_to_post_ratio);
        Self {
            duration,
            starting_interval: Duration::from_secs_f64(1.0 / options.start_fire_rate),
            ending_interval: Duration::from_secs_f64(1.0 / options.end_fire_rate),
            pre_ease,
            ease,
        }
    }

    /// Length of the whole burst window.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Interval at the starting rate.
    pub fn starting_interval(&self) -> Duration {
        self.starting_interval
    }

    /// Interval at the ending rate.
    pub fn ending_interval(&self) -> Duration {
        self.ending_interval
    }

    /// Time spent at the constant starting rate.
    pub fn pre_ease_duration(&self) -> Duration {
        self.pre_ease
    }

    /// Length of the linear ease between the two rates.
    pub fn ease_duration(&self) -> Duration {
        self.ease
    }

    /// Whether the window has expired `elapsed` into the burst.
    pub fn is_complete(&self, elapsed: Duration) -> bool {
        elapsed >= self.duration
    }

    /// Inter-send interval for a packet sent `elapsed` into the burst.
    pub fn interval_at(&self, elapsed: Duration) -> Duration {
        if elapsed < self.pre_ease {
            return self.starting_interval;
        }
        if self.ease.is_zero() || elapsed >= self.pre_ease + self.ease {
            return self.ending_interval;
        }
        let t = (elapsed - self.pre_ease).as_secs_f64() / self.ease.as_secs_f64();
        let start = self.starting_interval.as_secs_f64();
        let end = self.ending_interval.as_secs_f64();
        Duration::from_secs_f64(start + (end - start) * t)
    }
}
