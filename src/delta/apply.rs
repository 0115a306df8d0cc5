//! Receiver-side gate and application of motion packets.

use std::fmt;

use glam::{EulerRot, Quat};

use crate::channel::PeerId;
use crate::wire::{MotionKind, MotionPacket};

use super::joints::JointPair;

/// Which senders a receiver accepts packets from.
pub enum SenderFilter {
    /// Accept every sender.
    Any,
    /// Accept exactly one sender.
    Only(PeerId),
    /// Accept senders the predicate approves.
    Predicate(Box<dyn Fn(PeerId) -> bool + Send + Sync>),
}

impl SenderFilter {
    /// Whether packets from `sender` pass the filter.
    pub fn accepts(&self, sender: PeerId) -> bool {
        match self {
            Self::Any => true,
            Self::Only(allowed) => sender == *allowed,
            Self::Predicate(predicate) => predicate(sender),
        }
    }
}

impl fmt::Debug for SenderFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "Any"),
            Self::Only(peer) => write!(f, "Only({peer})"),
            Self::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}

/// Classified outcome of feeding one packet to the applier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Keyframe replaced both rotations.
    Keyframe,
    /// Delta composed onto the live rotations.
    Delta,
    /// Receiver inactive; packet discarded.
    Inactive,
    /// Sender rejected by the filter; packet discarded.
    Rejected,
}

/// Applies motion packets to a local joint pair.
///
/// Keyframes replace rotations absolutely (translations preserved).
/// Deltas are post-multiplied onto the **local current** rotations, not
/// onto any remembered reference: after a lost delta the local state has
/// diverged from the sender's reference frame, and later deltas carry
/// that error forward until a keyframe resynchronizes. That compounding
/// drift is the accepted price of delta encoding, not a defect.
#[derive(Debug)]
pub struct DeltaApplier {
    active: bool,
    filter: SenderFilter,
}

impl DeltaApplier {
    /// Create an applier with the given filter and initial activity.
    pub fn new(filter: SenderFilter, start_active: bool) -> Self {
        Self {
            active: start_active,
            filter,
        }
    }

    /// Whether packets are currently applied.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Toggle the activity gate.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Feed one packet through the gate and, if it passes, into the state.
    pub fn apply(
        &self,
        sender: PeerId,
        packet: &MotionPacket,
        joints: &mut JointPair,
    ) -> ApplyOutcome {
        if !self.active {
            return ApplyOutcome::Inactive;
        }
        if !self.filter.accepts(sender) {
            return ApplyOutcome::Rejected;
        }

        let a = quat(packet.a);
        let b = quat(packet.b);
        match packet.kind {
            MotionKind::Keyframe => {
                joints.a.rotation = a;
                joints.b.rotation = b;
                ApplyOutcome::Keyframe
            }
            MotionKind::Delta => {
                joints.a.rotation = joints.a.rotation * a;
                joints.b.rotation = joints.b.rotation * b;
                ApplyOutcome::Delta
            }
        }
    }
}

fn quat(angles: [f32; 3]) -> Quat {
    Quat::from_euler(EulerRot::XYZ, angles[0], angles[1], angles[2])
}
