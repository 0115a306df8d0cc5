//! Burst transmission: redundant sends over an eased schedule, received
//! at most once.
//!
//! A burst sends the same logical payload many times over a short window
//! so that at least one copy very likely survives transit loss. The send
//! rate eases from a fast start to a slower tail; the receiver
//! deduplicates by burst id and delivers whichever copy arrives first.

mod receiver;
mod schedule;
mod transmitter;
mod window;

pub use receiver::{BurstDelivery, BurstMeta, BurstReceiver};
pub use schedule::BurstSchedule;
pub use transmitter::BurstTransmitter;
pub use window::DedupWindow;

use std::time::Duration;

use thiserror::Error;

use crate::channel::ChannelError;
use crate::core::constants::{
    DEFAULT_BURST_DURATION, DEFAULT_DEDUP_WINDOW, DEFAULT_END_FIRE_RATE,
    DEFAULT_EASE_TO_POST_RATIO, DEFAULT_PRE_EASE_COVERAGE, DEFAULT_START_FIRE_RATE,
};
use crate::core::ConfigError;

/// Configuration for the burst pair. Immutable per instance.
#[derive(Debug, Clone)]
pub struct BurstOptions {
    /// Length of the redundant send window.
    pub burst_duration: Duration,

    /// Send rate at the start of the window (packets/second).
    pub start_fire_rate: f64,

    /// Send rate at the end of the window (packets/second).
    pub end_fire_rate: f64,

    /// Fraction of the window spent at the constant start rate, in `[0, 1)`.
    pub pre_ease_coverage: f64,

    /// Ratio of post-ease hold duration to ease duration.
    pub ease_to_post_ratio: f64,

    /// Receiver-side recency window capacity (distinct burst ids).
    pub dedup_window: usize,

    /// Whether receiver handlers are given the burst id and sequence index
    /// alongside the payload.
    pub pass_metadata: bool,
}

impl Default for BurstOptions {
    fn default() -> Self {
        Self {
            burst_duration: DEFAULT_BURST_DURATION,
            start_fire_rate: DEFAULT_START_FIRE_RATE,
            end_fire_rate: DEFAULT_END_FIRE_RATE,
            pre_ease_coverage: DEFAULT_PRE_EASE_COVERAGE,
            ease_to_post_ratio: DEFAULT_EASE_TO_POST_RATIO,
            dedup_window: DEFAULT_DEDUP_WINDOW,
            pass_metadata: false,
        }
    }
}

impl BurstOptions {
    /// Validated construction path: checks every parameter and fails fast.
    ///
    /// The trusted path is a struct literal (or [`Default`]); it skips
    /// these checks, and malformed values misbehave downstream without a
    /// contract.
    pub fn validated(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }

    /// Check parameters without consuming the options.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.burst_duration.is_zero() {
            return Err(ConfigError::NotPositive {
                name: "burst_duration",
                value: self.burst_duration.as_secs_f64(),
            });
        }
        if self.start_fire_rate <= 0.0 {
            return Err(ConfigError::NotPositive {
                name: "start_fire_rate",
                value: self.start_fire_rate,
            });
        }
        if self.end_fire_rate <= 0.0 {
            return Err(ConfigError::NotPositive {
                name: "end_fire_rate",
                value: self.end_fire_rate,
            });
        }
        if !(0.0..1.0).contains(&self.pre_ease_coverage) {
            return Err(ConfigError::NotAFraction {
                name: "pre_ease_coverage",
                value: self.pre_ease_coverage,
            });
        }
        if self.ease_to_post_ratio < 0.0 {
            return Err(ConfigError::Negative {
                name: "ease_to_post_ratio",
                value: self.ease_to_post_ratio,
            });
        }
        if self.dedup_window == 0 {
            return Err(ConfigError::Zero {
                name: "dedup_window",
            });
        }
        Ok(())
    }
}

/// Errors from the burst pair.
#[derive(Debug, Error)]
pub enum BurstError {
    /// A server endpoint must name the recipient of a burst.
    #[error("recipient is required when transmitting from a server endpoint")]
    MissingRecipient,

    /// The transmitter or receiver has been closed.
    #[error("burst object is closed")]
    Closed,

    /// Configuration rejected by the validated construction path.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Channel error surfaced on the calling context.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),
}
