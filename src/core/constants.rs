//! Protocol constants and configuration defaults.

use std::time::Duration;

// =============================================================================
// BURST TRANSMISSION
// =============================================================================

/// Length of the redundant send window.
pub const DEFAULT_BURST_DURATION: Duration = Duration::from_millis(500);

/// Send rate at the start of the burst window (packets/second).
pub const DEFAULT_START_FIRE_RATE: f64 = 44.0;

/// Send rate at the end of the burst window (packets/second).
pub const DEFAULT_END_FIRE_RATE: f64 = 16.0;

/// Fraction of the burst window spent at the constant start rate.
pub const DEFAULT_PRE_EASE_COVERAGE: f64 = 0.1;

/// Ratio of post-ease hold duration to ease duration.
pub const DEFAULT_EASE_TO_POST_RATIO: f64 = 0.3;

/// Receiver-side recency window capacity (distinct burst ids).
pub const DEFAULT_DEDUP_WINDOW: usize = 64;

/// Burst ids are drawn uniformly from `[0, MAX_BURST_ID]` (31-bit space).
pub const MAX_BURST_ID: u32 = i32::MAX as u32;

// =============================================================================
// DELTA TRANSMISSION
// =============================================================================

/// Upper bound on the sampling rate of the delta transmitter (Hz).
pub const DEFAULT_MAX_TRANSMISSION_RATE: f64 = 60.0;

/// Delta sends between forced keyframe resynchronizations.
pub const DEFAULT_CYCLES_BETWEEN_KEYFRAMES: u32 = 29;

/// Per-axis angular change below which a delta is not worth sending (radians, 2 degrees).
pub const DEFAULT_DELTA_ANGLE_THRESHOLD: f32 = 0.034907;

// =============================================================================
// WIRE SIZES
// =============================================================================

/// Burst packet header size (id + sequence + payload length).
pub const BURST_HEADER_SIZE: usize = 12;

/// Motion packet size (flag + 6 x f32).
pub const MOTION_PACKET_SIZE: usize = 25;
