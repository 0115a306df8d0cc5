//! Error types for the VOLLEY protocol.

use thiserror::Error;

/// Errors from validating configuration parameters.
///
/// Raised by the validated construction paths (`BurstOptions::validated`,
/// `DeltaOptions::validated`). The trusted paths skip these checks and
/// leave malformed values to misbehave downstream.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Parameter must be strictly positive.
    #[error("{name} must be positive, got {value}")]
    NotPositive {
        /// Parameter name.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },

    /// Parameter must lie in `[0, 1)`.
    #[error("{name} must be within [0, 1), got {value}")]
    NotAFraction {
        /// Parameter name.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },

    /// Parameter must not be negative.
    #[error("{name} must not be negative, got {value}")]
    Negative {
        /// Parameter name.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },

    /// Parameter must be at least one.
    #[error("{name} must be at least 1")]
    Zero {
        /// Parameter name.
        name: &'static str,
    },
}

/// Top-level VOLLEY errors.
#[derive(Debug, Error)]
pub enum VolleyError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Channel error.
    #[error("channel error: {0}")]
    Channel(#[from] crate::channel::ChannelError),

    /// Wire codec error.
    #[error("wire error: {0}")]
    Wire(#[from] crate::wire::WireError),
}
