//! Burst transmission: repeated sends of one payload over an eased schedule.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use rand::Rng;
use tokio::time::{sleep, Instant};
use tracing::{debug, trace};

use crate::channel::{Channel, PeerId, Role, Target};
use crate::core::{lock, LifecycleCell};
use crate::wire::{BurstPacket, MAX_BURST_ID};

use super::schedule::BurstSchedule;
use super::{BurstError, BurstOptions};

/// Sends each payload as a burst of redundant packets.
///
/// Every [`transmit`](Self::transmit) call draws a fresh random burst id,
/// spawns an independent scheduling task, and returns immediately. Bursts
/// run concurrently and share only the transmitter's active-id set, which
/// is how [`stop_transmission`](Self::stop_transmission) and
/// [`close`](Self::close) reach them.
#[derive(Debug)]
pub struct BurstTransmitter<C: Channel> {
    channel: Arc<C>,
    schedule: BurstSchedule,
    active: Arc<Mutex<HashSet<u32>>>,
    lifecycle: LifecycleCell,
}

impl<C: Channel> BurstTransmitter<C> {
    /// Validated construction path: checks the options and fails fast.
    pub fn new(channel: C, options: BurstOptions) -> Result<Self, BurstError> {
        options.validate()?;
        Ok(Self::new_trusted(channel, options))
    }

    /// Trusted construction path: skips parameter validation.
    pub fn new_trusted(channel: C, options: BurstOptions) -> Self {
        Self {
            channel: Arc::new(channel),
            schedule: BurstSchedule::new(&options),
            active: Arc::new(Mutex::new(HashSet::new())),
            lifecycle: LifecycleCell::new(),
        }
    }

    /// Start a burst carrying `payload` and return its id.
    ///
    /// On a server endpoint `recipient` is mandatory; on a client endpoint
    /// it is ignored and the burst targets the server. The id is returned
    /// immediately; sending proceeds on a background task until the window
    /// expires or the burst is stopped.
    pub fn transmit(
        &self,
        recipient: Option<PeerId>,
        payload: impl Into<Vec<u8>>,
    ) -> Result<u32, BurstError> {
        if self.lifecycle.is_closed() {
            return Err(BurstError::Closed);
        }
        let target = match self.channel.role() {
            Role::Server => Target::Peer(recipient.ok_or(BurstError::MissingRecipient)?),
            Role::Client => Target::Server,
        };

        let id = rand::thread_rng().gen_range(0..=MAX_BURST_ID);
        lock(&self.active).insert(id);

        let channel = Arc::clone(&self.channel);
        let active = Arc::clone(&self.active);
        let schedule = self.schedule.clone();
        let payload: Vec<u8> = payload.into();

        tokio::spawn(async move {
            let start = Instant::now();
            let mut seq: u32 = 1;
            debug!(id, ?target, "burst started");
            loop {
                let elapsed = start.elapsed();
                if schedule.is_complete(elapsed) || !lock(&active).contains(&id) {
                    break;
                }
                let packet = BurstPacket::new(id, seq, payload.clone());
                if let Err(err) = channel.send(target, packet.encode()) {
                    // The link is lossy by contract; a failed copy is not fatal.
                    debug!(id, seq, %err, "burst send failed");
                } else {
                    trace!(id, seq, "burst packet sent");
                }
                seq += 1;
                sleep(schedule.interval_at(start.elapsed())).await;
            }
            lock(&active).remove(&id);
            debug!(id, packets = seq - 1, "burst finished");
        });

        Ok(id)
    }

    /// Stop an in-flight burst.
    ///
    /// Idempotent: unknown or already-finished ids are a no-op. The burst
    /// task observes the removal at its next iteration, so at most one
    /// in-flight send may still occur.
    pub fn stop_transmission(&self, id: u32) {
        lock(&self.active).remove(&id);
    }

    /// Number of bursts currently in flight.
    pub fn active_bursts(&self) -> usize {
        lock(&self.active).len()
    }

    /// Close the transmitter.
    ///
    /// Clears the active set, so running burst tasks see their id absent
    /// and wind down on their own. Idempotent; subsequent `transmit` calls
    /// fail with [`BurstError::Closed`].
    pub fn close(&self) {
        if self.lifecycle.close() {
            lock(&self.active).clear();
            debug!("burst transmitter closed");
        }
    }

    /// Whether the transmitter has been closed.
    pub fn is_closed(&self) -> bool {
        self.lifecycle.is_closed()
    }
}

#[cfg(all(test, feature = "memory-channel"))]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use crate::channel::memory::MemoryNetwork;
    use crate::channel::Inbound;

    use super::*;

    fn reference_options() -> BurstOptions {
        BurstOptions {
            burst_duration: Duration::from_millis(500),
            start_fire_rate: 44.0,
            end_fire_rate: 16.0,
            pre_ease_coverage: 0.1,
            ease_to_post_ratio: 0.3,
            ..Default::default()
        }
    }

    /// Collect every raw packet reaching `rx`, stamped with its virtual
    /// arrival time.
    fn spawn_collector(
        mut rx: mpsc::UnboundedReceiver<Inbound>,
    ) -> Arc<Mutex<Vec<(Instant, BurstPacket)>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        tokio::spawn(async move {
            while let Some(inbound) = rx.recv().await {
                let packet = BurstPacket::decode(&inbound.bytes).unwrap();
                lock(&sink).push((Instant::now(), packet));
            }
        });
        seen
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_respects_schedule_and_window() {
        let net = MemoryNetwork::new();
        let server = net.server();
        let client = net.connect();
        let seen = spawn_collector(server.subscribe());

        let transmitter = BurstTransmitter::new(client, reference_options()).unwrap();
        let start = Instant::now();
        let id = transmitter.transmit(None, b"hello".as_slice()).unwrap();
        assert!(id <= MAX_BURST_ID);

        sleep(Duration::from_secs(1)).await;

        let seen = lock(&seen);
        assert!(
            (12..=16).contains(&seen.len()),
            "unexpected packet count {}",
            seen.len()
        );

        // First packet fires at t=0, none at or past the window end.
        assert_eq!(seen[0].0, start);
        let end = start + Duration::from_millis(500);
        for (at, packet) in seen.iter() {
            assert!(*at < end, "packet {} sent at {:?}", packet.seq, *at - start);
            assert_eq!(packet.id, id);
            assert_eq!(packet.payload, b"hello");
        }

        // Sequence indices count up from 1.
        for (i, (_, packet)) in seen.iter().enumerate() {
            assert_eq!(packet.seq, i as u32 + 1);
        }

        // Slowing burst: inter-send gaps never shrink.
        let gaps: Vec<Duration> = seen.windows(2).map(|pair| pair[1].0 - pair[0].0).collect();
        for pair in gaps.windows(2) {
            assert!(
                pair[1] + Duration::from_micros(100) >= pair[0],
                "gap shrank: {:?} after {:?}",
                pair[1],
                pair[0]
            );
        }

        assert_eq!(transmitter.active_bursts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_transmission_is_observed() {
        let net = MemoryNetwork::new();
        let server = net.server();
        let client = net.connect();
        let seen = spawn_collector(server.subscribe());

        let transmitter = BurstTransmitter::new(client, reference_options()).unwrap();
        let id = transmitter.transmit(None, vec![1]).unwrap();

        sleep(Duration::from_millis(30)).await;
        transmitter.stop_transmission(id);
        sleep(Duration::from_secs(1)).await;

        let count = lock(&seen).len();
        assert!(count <= 3, "burst kept sending after stop: {count} packets");
        assert_eq!(transmitter.active_bursts(), 0);

        // Stopping again is a no-op.
        transmitter.stop_transmission(id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_requires_recipient() {
        let net = MemoryNetwork::new();
        let server = net.server();
        let client = net.connect();

        let transmitter = BurstTransmitter::new(server, reference_options()).unwrap();
        assert!(matches!(
            transmitter.transmit(None, vec![1]),
            Err(BurstError::MissingRecipient)
        ));

        // With a recipient the burst reaches that client.
        let seen = spawn_collector(client.subscribe());
        transmitter
            .transmit(Some(client.peer_id()), vec![2])
            .unwrap();
        sleep(Duration::from_secs(1)).await;
        assert!(!lock(&seen).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_stops_running_bursts() {
        let net = MemoryNetwork::new();
        let server = net.server();
        let client = net.connect();
        let seen = spawn_collector(server.subscribe());

        let transmitter = BurstTransmitter::new(client, reference_options()).unwrap();
        transmitter.transmit(None, vec![1]).unwrap();
        transmitter.transmit(None, vec![2]).unwrap();
        assert_eq!(transmitter.active_bursts(), 2);

        sleep(Duration::from_millis(30)).await;
        transmitter.close();
        let sent_by_close = lock(&seen).len();

        sleep(Duration::from_secs(1)).await;
        // Each task may have had one in-flight iteration at close time.
        assert!(lock(&seen).len() <= sent_by_close + 2);
        assert_eq!(transmitter.active_bursts(), 0);

        assert!(transmitter.is_closed());
        assert!(matches!(
            transmitter.transmit(None, vec![3]),
            Err(BurstError::Closed)
        ));
        transmitter.close(); // idempotent
    }
}
