//! # VOLLEY Protocol
//!
//! Reliability and efficiency primitives for unreliable, possibly lossy
//! message channels:
//!
//! - **Burst transmission**: send one logical message as many redundant
//!   packets over a bounded window with an eased send rate, so at least
//!   one copy very likely survives transit loss; the receiver
//!   deduplicates by burst id and delivers at most once.
//! - **Delta transmission**: continuously replicate a two-joint
//!   orientation state, sending only the change since the last sent
//!   update, with periodic keyframes bounding accumulated drift.
//!
//! The two pairs are independent; they compose only through the
//! [`Channel`] abstraction and the opaque payloads they carry.
//!
//! ## Feature Flags
//!
//! - `burst` (default): the burst transmitter/receiver pair
//! - `delta` (default): the delta transmitter/receiver pair
//! - `memory-channel` (default): in-process channel for tests and demos
//!
//! ## Example Usage
//!
//! ```ignore
//! use volley_protocol::prelude::*;
//!
//! let transmitter = BurstTransmitter::new(channel, BurstOptions::default())?;
//!
//! // Fire-and-forget: ~14 redundant copies over half a second.
//! let burst_id = transmitter.transmit(None, b"door_opened".as_slice())?;
//!
//! // The far side delivers the payload exactly once.
//! let receiver = BurstReceiver::new(&far_channel, BurstOptions::default(), |delivery| {
//!     println!("got {:?}", delivery.payload);
//! })?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Channel abstraction (always included)
pub mod channel;

// Wire codecs (always included)
pub mod wire;

// Burst pair (feature-gated)
#[cfg(feature = "burst")]
#[cfg_attr(docsrs, doc(cfg(feature = "burst")))]
pub mod burst;

// Delta pair (feature-gated)
#[cfg(feature = "delta")]
#[cfg_attr(docsrs, doc(cfg(feature = "delta")))]
pub mod delta;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::channel::{Channel, ChannelError, Inbound, PeerId, Role, Target};
    pub use crate::core::{ConfigError, Lifecycle, VolleyError};
    pub use crate::wire::{BurstPacket, MotionKind, MotionPacket, WireError};

    #[cfg(feature = "memory-channel")]
    pub use crate::channel::memory::{MemoryChannel, MemoryNetwork};

    #[cfg(feature = "burst")]
    pub use crate::burst::{
        BurstDelivery, BurstError, BurstMeta, BurstOptions, BurstReceiver, BurstSchedule,
        BurstTransmitter, DedupWindow,
    };

    #[cfg(feature = "delta")]
    pub use crate::delta::{
        ApplyOutcome, DeltaApplier, DeltaError, DeltaOptions, DeltaReceiver, DeltaSampler,
        DeltaTransmitter, JointFrame, JointHandle, JointPair, SenderFilter,
    };
}

// Re-export commonly used items at crate root
pub use crate::channel::{Channel, ChannelError, PeerId, Role, Target};
pub use crate::core::{ConfigError, VolleyError};

#[cfg(feature = "burst")]
pub use crate::burst::{BurstError, BurstOptions, BurstReceiver, BurstTransmitter};

#[cfg(feature = "delta")]
pub use crate::delta::{
    DeltaError, DeltaOptions, DeltaReceiver, DeltaTransmitter, JointHandle, SenderFilter,
};
