//! Burst reception: dedup window and at-most-once delivery.

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::channel::{Channel, PeerId, Role};
use crate::core::LifecycleCell;
use crate::wire::BurstPacket;

use super::window::DedupWindow;
use super::{BurstError, BurstOptions};

/// Burst metadata passed to handlers when `pass_metadata` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstMeta {
    /// The burst's idempotency key.
    pub id: u32,
    /// Sequence index of the copy that survived dedup.
    pub sequence: u32,
}

/// What a handler receives for each surviving burst.
#[derive(Debug, Clone)]
pub struct BurstDelivery {
    /// Sending peer's identity; populated on server endpoints.
    pub sender: Option<PeerId>,
    /// Burst id and sequence, when the receiver passes metadata through.
    pub meta: Option<BurstMeta>,
    /// The payload of whichever copy arrived first.
    pub payload: Vec<u8>,
}

/// Delivers each burst's payload at most once.
///
/// Subscribes to the channel on construction; every later duplicate of an
/// accepted burst id is silently dropped, converting "send N times" into
/// "receive at most once".
#[derive(Debug)]
pub struct BurstReceiver {
    cancel: CancellationToken,
    lifecycle: LifecycleCell,
}

impl BurstReceiver {
    /// Validated construction path: checks the options and fails fast.
    pub fn new<C, F>(channel: &C, options: BurstOptions, handler: F) -> Result<Self, BurstError>
    where
        C: Channel,
        F: FnMut(BurstDelivery) + Send + 'static,
    {
        options.validate()?;
        Ok(Self::new_trusted(channel, options, handler))
    }

    /// Trusted construction path: skips parameter validation.
    pub fn new_trusted<C, F>(channel: &C, options: BurstOptions, mut handler: F) -> Self
    where
        C: Channel,
        F: FnMut(BurstDelivery) + Send + 'static,
    {
        let mut rx = channel.subscribe();
        let role = channel.role();
        let channel_closed = channel.closed();
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let mut window = DedupWindow::new(options.dedup_window);
        let pass_metadata = options.pass_metadata;

        tokio::spawn(async move {
            loop {
                let inbound = tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    _ = channel_closed.cancelled() => break,
                    inbound = rx.recv() => match inbound {
                        Some(inbound) => inbound,
                        None => break,
                    },
                };

                let packet = match BurstPacket::decode(&inbound.bytes) {
                    Ok(packet) => packet,
                    Err(err) => {
                        warn!(%err, "malformed burst packet dropped");
                        continue;
                    }
                };

                if !window.check_and_insert(packet.id) {
                    trace!(id = packet.id, seq = packet.seq, "duplicate burst dropped");
                    continue;
                }

                trace!(id = packet.id, seq = packet.seq, "burst delivered");
                handler(BurstDelivery {
                    sender: (role == Role::Server).then_some(inbound.sender),
                    meta: pass_metadata.then_some(BurstMeta {
                        id: packet.id,
                        sequence: packet.seq,
                    }),
                    payload: packet.payload,
                });
            }
            debug!("burst receiver task exited");
        });

        Self {
            cancel,
            lifecycle: LifecycleCell::new(),
        }
    }

    /// Unsubscribe from the channel and release the handler and window.
    /// Idempotent.
    pub fn close(&self) {
        if self.lifecycle.close() {
            self.cancel.cancel();
            debug!("burst receiver closed");
        }
    }

    /// Whether the receiver has been closed.
    pub fn is_closed(&self) -> bool {
        self.lifecycle.is_closed()
    }
}
