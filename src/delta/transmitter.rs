//! Fixed-rate sampling loop emitting keyframe and delta packets.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::channel::{Channel, PeerId, Role, Target};
use crate::core::LifecycleCell;

use super::joints::JointHandle;
use super::sampler::DeltaSampler;
use super::{spawn_close_fanin, DeltaError, DeltaOptions};

/// Replicates a joint pair by sampling it at a bounded rate and emitting
/// keyframe or delta packets.
///
/// Lifetime-linked to three external ends: the caller's lifetime token,
/// the channel, and the tracked joint state. Whichever of them ends first
/// closes the transmitter automatically.
#[derive(Debug)]
pub struct DeltaTransmitter<C: Channel> {
    channel: Arc<C>,
    joints: JointHandle,
    options: DeltaOptions,
    target: Target,
    /// 0 when stopped, otherwise the generation of the active loop.
    run_state: Arc<AtomicU64>,
    generation: AtomicU64,
    closed: CancellationToken,
    lifecycle: LifecycleCell,
}

impl<C: Channel> DeltaTransmitter<C> {
    /// Validated construction path: checks the options and fails fast.
    ///
    /// On a server endpoint `recipient` is mandatory; on a client endpoint
    /// it is ignored and updates target the server.
    pub fn new(
        channel: C,
        joints: JointHandle,
        lifetime: CancellationToken,
        recipient: Option<PeerId>,
        options: DeltaOptions,
    ) -> Result<Self, DeltaError> {
        options.validate()?;
        Self::new_trusted(channel, joints, lifetime, recipient, options)
    }

    /// Trusted construction path: skips parameter validation. The role
    /// check on `recipient` still applies.
    pub fn new_trusted(
        channel: C,
        joints: JointHandle,
        lifetime: CancellationToken,
        recipient: Option<PeerId>,
        options: DeltaOptions,
    ) -> Result<Self, DeltaError> {
        let target = match channel.role() {
            Role::Server => Target::Peer(recipient.ok_or(DeltaError::MissingRecipient)?),
            Role::Client => Target::Server,
        };

        let closed = CancellationToken::new();
        spawn_close_fanin(
            closed.clone(),
            [lifetime, channel.closed(), joints.destroyed()],
        );

        Ok(Self {
            channel: Arc::new(channel),
            joints,
            options,
            target,
            run_state: Arc::new(AtomicU64::new(0)),
            generation: AtomicU64::new(0),
            closed,
            lifecycle: LifecycleCell::new(),
        })
    }

    /// Begin sampling. No-op if already running.
    ///
    /// The loop opens with an immediate keyframe establishing the
    /// reference, then checks the state once per sample interval.
    pub fn start(&self) -> Result<(), DeltaError> {
        if self.is_closed() {
            return Err(DeltaError::Closed);
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if self
            .run_state
            .compare_exchange(0, generation, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }

        let channel = Arc::clone(&self.channel);
        let joints = self.joints.clone();
        let options = self.options.clone();
        let target = self.target;
        let run_state = Arc::clone(&self.run_state);
        let closed = self.closed.clone();

        tokio::spawn(async move {
            let mut sampler = DeltaSampler::new(&options);
            let interval = options.sample_interval();
            debug!(?target, "delta transmitter started");
            loop {
                if run_state.load(Ordering::SeqCst) != generation || closed.is_cancelled() {
                    break;
                }
                let tick = Instant::now();

                let current = joints.read().await;
                if let Some(packet) = sampler.sample(&current) {
                    trace!(kind = ?packet.kind, "motion packet sent");
                    if let Err(err) = channel.send(target, packet.encode().to_vec()) {
                        debug!(%err, "motion send failed");
                    }
                }

                // Best-effort fixed-rate pacing: sleep whatever remains of
                // the interval after this cycle's processing.
                let budget = interval.saturating_sub(tick.elapsed());
                tokio::select! {
                    _ = closed.cancelled() => break,
                    _ = sleep(budget) => {}
                }
            }
            let _ = run_state.compare_exchange(generation, 0, Ordering::SeqCst, Ordering::SeqCst);
            debug!("delta transmitter stopped");
        });

        Ok(())
    }

    /// Stop sampling. The loop observes the flag at its next iteration
    /// boundary; `start` may be called again afterwards.
    pub fn stop(&self) {
        self.run_state.store(0, Ordering::SeqCst);
    }

    /// Whether the sampling loop is running.
    pub fn is_running(&self) -> bool {
        self.run_state.load(Ordering::SeqCst) != 0
    }

    /// Stop sampling and sever the lifetime linkage. Safe to call
    /// repeatedly; the transmitter must not be reused afterwards.
    pub fn close(&self) {
        if self.lifecycle.close() {
            self.stop();
            self.closed.cancel();
            debug!("delta transmitter closed");
        }
    }

    /// Whether the transmitter was closed, explicitly or by a lifetime
    /// dependency ending.
    pub fn is_closed(&self) -> bool {
        self.lifecycle.is_closed() || self.closed.is_cancelled()
    }
}
