//! Transmitter-side per-tick encode decision.

use glam::{EulerRot, Quat};

use crate::wire::MotionPacket;

use super::joints::JointPair;
use super::DeltaOptions;

/// Decides, one sampling cycle at a time, whether the live state warrants
/// a keyframe, a delta, or nothing.
///
/// Pure and clock-free; the transmitter task drives it at the configured
/// rate. The countdown starts expired, so the first
/// [`sample`](Self::sample) call always produces a keyframe and
/// establishes the reference the following deltas are computed against.
#[derive(Debug, Clone)]
pub struct DeltaSampler {
    last_sent_a: Quat,
    last_sent_b: Quat,
    cycles_until_keyframe: u32,
    cycles_between_keyframes: u32,
    threshold: f32,
}

impl DeltaSampler {
    /// Create a sampler from delta options.
    pub fn new(options: &DeltaOptions) -> Self {
        Self {
            last_sent_a: Quat::IDENTITY,
            last_sent_b: Quat::IDENTITY,
            cycles_until_keyframe: 0,
            cycles_between_keyframes: options.cycles_between_keyframes,
            threshold: options.delta_angle_threshold,
        }
    }

    /// Delta sends remaining before the next forced keyframe.
    pub fn cycles_until_keyframe(&self) -> u32 {
        self.cycles_until_keyframe
    }

    /// The reference orientations the next delta would be computed against.
    pub fn last_sent(&self) -> (Quat, Quat) {
        (self.last_sent_a, self.last_sent_b)
    }

    /// Run one sampling cycle against the current live state.
    ///
    /// Returns the packet to send, if any. A cycle with no change, or with
    /// a change below the angle threshold on every axis, produces nothing
    /// and does not advance the keyframe countdown — the threshold is a
    /// noise filter, not a state update trigger.
    pub fn sample(&mut self, current: &JointPair) -> Option<MotionPacket> {
        let (current_a, current_b) = current.rotations();

        if self.cycles_until_keyframe == 0 {
            self.last_sent_a = current_a;
            self.last_sent_b = current_b;
            self.cycles_until_keyframe = self.cycles_between_keyframes;
            return Some(MotionPacket::keyframe(euler(current_a), euler(current_b)));
        }

        if current_a == self.last_sent_a && current_b == self.last_sent_b {
            return None;
        }

        // Rotation taking the last-sent reference to the live state.
        let delta_a = euler(self.last_sent_a.inverse() * current_a);
        let delta_b = euler(self.last_sent_b.inverse() * current_b);
        if !exceeds_threshold(delta_a, self.threshold) && !exceeds_threshold(delta_b, self.threshold)
        {
            return None;
        }

        self.last_sent_a = current_a;
        self.last_sent_b = current_b;
        self.cycles_until_keyframe -= 1;
        Some(MotionPacket::delta(delta_a, delta_b))
    }
}

fn euler(rotation: Quat) -> [f32; 3] {
    let (x, y, z) = rotation.to_euler(EulerRot::XYZ);
    [x, y, z]
}

fn exceeds_threshold(angles: [f32; 3], threshold: f32) -> bool {
    angles.iter().any(|angle| angle.abs() > threshold)
}
