//! Rotation delta replication: keyframes and relative updates.
//!
//! The delta pair continuously replicates a two-joint orientation state,
//! sending only the change since the last successfully sent update and
//! forcing a periodic absolute keyframe to bound accumulated drift.

mod apply;
mod joints;
mod receiver;
mod sampler;
mod transmitter;

pub use apply::{ApplyOutcome, DeltaApplier, SenderFilter};
pub use joints::{JointFrame, JointHandle, JointPair};
pub use receiver::DeltaReceiver;
pub use sampler::DeltaSampler;
pub use transmitter::DeltaTransmitter;

use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::channel::ChannelError;
use crate::core::constants::{
    DEFAULT_CYCLES_BETWEEN_KEYFRAMES, DEFAULT_DELTA_ANGLE_THRESHOLD,
    DEFAULT_MAX_TRANSMISSION_RATE,
};
use crate::core::ConfigError;

/// Configuration for the delta pair. Immutable per instance.
#[derive(Debug, Clone)]
pub struct DeltaOptions {
    /// Upper bound on the sampling rate (Hz).
    pub max_transmission_rate: f64,

    /// Delta sends between forced keyframe resynchronizations.
    pub cycles_between_keyframes: u32,

    /// Per-axis angular change below which a delta is not sent (radians).
    pub delta_angle_threshold: f32,
}

impl Default for DeltaOptions {
    fn default() -> Self {
        Self {
            max_transmission_rate: DEFAULT_MAX_TRANSMISSION_RATE,
            cycles_between_keyframes: DEFAULT_CYCLES_BETWEEN_KEYFRAMES,
            delta_angle_threshold: DEFAULT_DELTA_ANGLE_THRESHOLD,
        }
    }
}

impl DeltaOptions {
    /// Validated construction path: checks every parameter and fails fast.
    ///
    /// The trusted path is a struct literal (or [`Default`]), which skips
    /// these checks.
    pub fn validated(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }

    /// Check parameters without consuming the options.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_transmission_rate <= 0.0 {
            return Err(ConfigError::NotPositive {
                name: "max_transmission_rate",
                value: self.max_transmission_rate,
            });
        }
        if self.cycles_between_keyframes == 0 {
            return Err(ConfigError::Zero {
                name: "cycles_between_keyframes",
            });
        }
        if self.delta_angle_threshold < 0.0 {
            return Err(ConfigError::Negative {
                name: "delta_angle_threshold",
                value: self.delta_angle_threshold as f64,
            });
        }
        Ok(())
    }

    /// Interval between sampling cycles.
    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.max_transmission_rate)
    }
}

/// Errors from the delta pair.
#[derive(Debug, Error)]
pub enum DeltaError {
    /// A server endpoint must name the recipient of its updates.
    #[error("recipient is required when transmitting from a server endpoint")]
    MissingRecipient,

    /// The transmitter or receiver has been closed.
    #[error("delta object is closed")]
    Closed,

    /// Configuration rejected by the validated construction path.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Channel error surfaced on the calling context.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Cancel `unified` as soon as any lifetime dependency ends.
///
/// The three observed ends are the caller-supplied lifetime token, the
/// channel's close notification, and the joint state's destroy
/// notification. The watcher also exits when `unified` itself is
/// cancelled by an explicit `close()`.
pub(crate) fn spawn_close_fanin(unified: CancellationToken, observed: [CancellationToken; 3]) {
    tokio::spawn(async move {
        let [first, second, third] = observed;
        tokio::select! {
            _ = unified.cancelled() => {}
            _ = first.cancelled() => unified.cancel(),
            _ = second.cancelled() => unified.cancel(),
            _ = third.cancelled() => unified.cancel(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_valid() {
        assert!(DeltaOptions::default().validate().is_ok());
    }

    #[test]
    fn test_sample_interval() {
        let options = DeltaOptions::default();
        let interval = options.sample_interval();
        assert!((interval.as_secs_f64() - 1.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let options = DeltaOptions {
            max_transmission_rate: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            options.validate(),
            Err(ConfigError::NotPositive { name: "max_transmission_rate", .. })
        ));

        let options = DeltaOptions {
            cycles_between_keyframes: 0,
            ..Default::default()
        };
        assert!(matches!(
            options.validate(),
            Err(ConfigError::Zero { name: "cycles_between_keyframes" })
        ));

        let options = DeltaOptions {
            delta_angle_threshold: -0.01,
            ..Default::default()
        };
        assert!(matches!(
            options.validate(),
            Err(ConfigError::Negative { name: "delta_angle_threshold", .. })
        ));
    }

    #[tokio::test]
    async fn test_fanin_fires_on_any_dependency() {
        for index in 0..3 {
            let unified = CancellationToken::new();
            let deps = [
                CancellationToken::new(),
                CancellationToken::new(),
                CancellationToken::new(),
            ];
            spawn_close_fanin(unified.clone(), deps.clone());

            deps[index].cancel();
            unified.cancelled().await;
            assert!(unified.is_cancelled());
        }
    }
}
