//! Subscription loop applying inbound motion packets to local state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::channel::Channel;
use crate::core::LifecycleCell;
use crate::wire::MotionPacket;

use super::apply::{ApplyOutcome, DeltaApplier, SenderFilter};
use super::joints::JointHandle;
use super::spawn_close_fanin;

/// Applies inbound keyframes and deltas to a local joint pair, gated by a
/// sender-acceptance filter.
///
/// Lifetime-linked the same way as the transmitter: the caller's lifetime
/// token, the channel, and the joint state each close the receiver when
/// they end.
#[derive(Debug)]
pub struct DeltaReceiver {
    active: Arc<AtomicBool>,
    closed: CancellationToken,
    lifecycle: LifecycleCell,
}

impl DeltaReceiver {
    /// Subscribe to the channel and start applying packets.
    ///
    /// `start_active` sets the initial state of the activity gate; an
    /// inactive receiver discards packets without touching the state.
    pub fn new<C: Channel>(
        channel: &C,
        joints: JointHandle,
        lifetime: CancellationToken,
        filter: SenderFilter,
        start_active: bool,
    ) -> Self {
        let mut rx = channel.subscribe();
        let closed = CancellationToken::new();
        spawn_close_fanin(
            closed.clone(),
            [lifetime, channel.closed(), joints.destroyed()],
        );

        let active = Arc::new(AtomicBool::new(start_active));
        let task_active = Arc::clone(&active);
        let task_closed = closed.clone();

        tokio::spawn(async move {
            let mut applier = DeltaApplier::new(filter, start_active);
            loop {
                let inbound = tokio::select! {
                    _ = task_closed.cancelled() => break,
                    inbound = rx.recv() => match inbound {
                        Some(inbound) => inbound,
                        None => break,
                    },
                };

                let packet = match MotionPacket::decode(&inbound.bytes) {
                    Ok(packet) => packet,
                    Err(err) => {
                        warn!(%err, "malformed motion packet dropped");
                        continue;
                    }
                };

                applier.set_active(task_active.load(Ordering::SeqCst));
                let outcome = joints
                    .update(|pair| applier.apply(inbound.sender, &packet, pair))
                    .await;
                match outcome {
                    ApplyOutcome::Rejected => {
                        trace!(sender = %inbound.sender, "motion packet rejected by sender filter");
                    }
                    ApplyOutcome::Inactive => {
                        trace!(sender = %inbound.sender, "motion packet ignored while inactive");
                    }
                    applied => trace!(sender = %inbound.sender, ?applied, "motion packet applied"),
                }
            }
            debug!("delta receiver task exited");
        });

        Self {
            active,
            closed,
            lifecycle: LifecycleCell::new(),
        }
    }

    /// Toggle the activity gate.
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    /// Whether inbound packets are currently applied.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Deactivate, unsubscribe, and sever the lifetime linkage. Safe to
    /// call repeatedly.
    pub fn close(&self) {
        if self.lifecycle.close() {
            self.set_active(false);
            self.closed.cancel();
            debug!("delta receiver closed");
        }
    }

    /// Whether the receiver was closed, explicitly or by a lifetime
    /// dependency ending.
    pub fn is_closed(&self) -> bool {
        self.lifecycle.is_closed() || self.closed.is_cancelled()
    }
}

#[cfg(all(test, feature = "memory-channel"))]
mod tests {
    use std::time::Duration;

    use glam::Quat;
    use tokio::time::sleep;

    use crate::channel::memory::MemoryNetwork;
    use crate::channel::{PeerId, Target};

    use super::super::transmitter::DeltaTransmitter;
    use super::super::{DeltaOptions, JointPair};
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn assert_same_rotation(actual: Quat, expected: Quat) {
        assert!(
            actual.angle_between(expected) < EPSILON,
            "rotations differ by {} rad",
            actual.angle_between(expected)
        );
    }

    /// Full pipeline: a client transmitter replicates its joint pair into
    /// a server-side joint pair.
    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_replication() {
        let net = MemoryNetwork::new();
        let server = net.server();
        let client = net.connect();

        let sender_joints = JointHandle::default();
        let local_joints = JointHandle::default();

        let _receiver = DeltaReceiver::new(
            &server,
            local_joints.clone(),
            CancellationToken::new(),
            SenderFilter::Only(client.peer_id()),
            true,
        );
        let transmitter = DeltaTransmitter::new(
            client,
            sender_joints.clone(),
            CancellationToken::new(),
            None,
            DeltaOptions::default(),
        )
        .unwrap();
        transmitter.start().unwrap();

        let interval = DeltaOptions::default().sample_interval();
        sleep(interval / 2).await;

        let mut angle = 0.0f32;
        for _ in 0..40 {
            angle += 0.1;
            sender_joints
                .set_rotations(Quat::from_rotation_x(angle), Quat::from_rotation_y(angle))
                .await;
            sleep(interval).await;
        }

        let local = local_joints.read().await;
        let sender = sender_joints.read().await;
        assert_same_rotation(local.a.rotation, sender.a.rotation);
        assert_same_rotation(local.b.rotation, sender.b.rotation);
    }

    #[tokio::test(start_paused = true)]
    async fn test_filtered_sender_is_ignored() {
        let net = MemoryNetwork::new();
        let server = net.server();
        let accepted = net.connect();
        let rejected = net.connect();

        let local_joints = JointHandle::default();
        let _receiver = DeltaReceiver::new(
            &server,
            local_joints.clone(),
            CancellationToken::new(),
            SenderFilter::Only(accepted.peer_id()),
            true,
        );

        let packet = MotionPacket::keyframe([1.0, 0.0, 0.0], [0.0; 3]);
        rejected
            .send(Target::Server, packet.encode().to_vec())
            .unwrap();
        sleep(Duration::from_millis(10)).await;
        assert_eq!(local_joints.read().await, JointPair::default());

        accepted
            .send(Target::Server, packet.encode().to_vec())
            .unwrap();
        sleep(Duration::from_millis(10)).await;
        assert_same_rotation(
            local_joints.read().await.a.rotation,
            Quat::from_rotation_x(1.0),
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_predicate_filter() {
        let net = MemoryNetwork::new();
        let server = net.server();
        let client = net.connect();

        let local_joints = JointHandle::default();
        let blocked = client.peer_id();
        let _receiver = DeltaReceiver::new(
            &server,
            local_joints.clone(),
            CancellationToken::new(),
            SenderFilter::Predicate(Box::new(move |peer: PeerId| peer != blocked)),
            true,
        );

        let packet = MotionPacket::keyframe([0.5, 0.0, 0.0], [0.0; 3]);
        client
            .send(Target::Server, packet.encode().to_vec())
            .unwrap();
        sleep(Duration::from_millis(10)).await;
        assert_eq!(local_joints.read().await, JointPair::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_gate() {
        let net = MemoryNetwork::new();
        let server = net.server();
        let client = net.connect();

        let local_joints = JointHandle::default();
        let receiver = DeltaReceiver::new(
            &server,
            local_joints.clone(),
            CancellationToken::new(),
            SenderFilter::Any,
            false,
        );
        assert!(!receiver.is_active());

        let packet = MotionPacket::keyframe([0.9, 0.0, 0.0], [0.0; 3]);
        client
            .send(Target::Server, packet.encode().to_vec())
            .unwrap();
        sleep(Duration::from_millis(10)).await;
        assert_eq!(local_joints.read().await, JointPair::default());

        receiver.set_active(true);
        client
            .send(Target::Server, packet.encode().to_vec())
            .unwrap();
        sleep(Duration::from_millis(10)).await;
        assert_same_rotation(
            local_joints.read().await.a.rotation,
            Quat::from_rotation_x(0.9),
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_stops_applying() {
        let net = MemoryNetwork::new();
        let server = net.server();
        let client = net.connect();

        let local_joints = JointHandle::default();
        let receiver = DeltaReceiver::new(
            &server,
            local_joints.clone(),
            CancellationToken::new(),
            SenderFilter::Any,
            true,
        );

        receiver.close();
        receiver.close(); // idempotent
        assert!(receiver.is_closed());

        sleep(Duration::from_millis(10)).await;
        let packet = MotionPacket::keyframe([1.0, 0.0, 0.0], [0.0; 3]);
        client
            .send(Target::Server, packet.encode().to_vec())
            .unwrap();
        sleep(Duration::from_millis(10)).await;
        assert_eq!(local_joints.read().await, JointPair::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroying_state_closes_receiver() {
        let net = MemoryNetwork::new();
        let server = net.server();

        let local_joints = JointHandle::default();
        let receiver = DeltaReceiver::new(
            &server,
            local_joints.clone(),
            CancellationToken::new(),
            SenderFilter::Any,
            true,
        );

        local_joints.destroy();
        sleep(Duration::from_millis(10)).await;
        assert!(receiver.is_closed());
    }
}
