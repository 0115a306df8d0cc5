//! In-process channel implementation.
//!
//! Routes packets between one server endpoint and any number of client
//! endpoints without touching the network. Used by this crate's tests and
//! useful as a transport double in downstream integration tests; it is not
//! a real transport.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::core::lock;

use super::{Channel, ChannelError, Inbound, PeerId, Role, Target};

/// Peer identity of the server endpoint.
pub const SERVER_PEER: PeerId = PeerId(0);

/// Delivery side of one endpoint: live subscriptions plus the close token.
#[derive(Debug, Default)]
struct Endpoint {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Inbound>>>,
    closed: CancellationToken,
}

impl Endpoint {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<Inbound> {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.subscribers).push(tx);
        rx
    }

    /// Fan a packet out to every live subscription. Packets for a closed
    /// endpoint are dropped silently; the link is lossy by contract.
    fn deliver(&self, inbound: Inbound) {
        if self.closed.is_cancelled() {
            trace!(sender = %inbound.sender, "packet for closed endpoint dropped");
            return;
        }
        lock(&self.subscribers).retain(|tx| tx.send(inbound.clone()).is_ok());
    }
}

#[derive(Debug)]
struct NetworkInner {
    server: Arc<Endpoint>,
    clients: Mutex<HashMap<PeerId, Arc<Endpoint>>>,
    next_peer: AtomicU64,
}

/// Hub connecting one server endpoint with any number of client endpoints.
#[derive(Debug, Clone)]
pub struct MemoryNetwork {
    inner: Arc<NetworkInner>,
}

impl MemoryNetwork {
    /// Create an empty network with just the server endpoint.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(NetworkInner {
                server: Arc::new(Endpoint::default()),
                clients: Mutex::new(HashMap::new()),
                next_peer: AtomicU64::new(1),
            }),
        }
    }

    /// Handle to the server endpoint.
    pub fn server(&self) -> MemoryChannel {
        MemoryChannel {
            role: Role::Server,
            id: SERVER_PEER,
            endpoint: Arc::clone(&self.inner.server),
            net: Arc::clone(&self.inner),
        }
    }

    /// Create and connect a new client endpoint.
    pub fn connect(&self) -> MemoryChannel {
        let id = PeerId(self.inner.next_peer.fetch_add(1, Ordering::Relaxed));
        let endpoint = Arc::new(Endpoint::default());
        lock(&self.inner.clients).insert(id, Arc::clone(&endpoint));
        trace!(%id, "client endpoint connected");
        MemoryChannel {
            role: Role::Client,
            id,
            endpoint,
            net: Arc::clone(&self.inner),
        }
    }
}

impl Default for MemoryNetwork {
    fn default() -> Self {
        Self::new()
    }
}

/// One endpoint of a [`MemoryNetwork`]. Cheap to clone; clones share the
/// endpoint's subscriptions and close state.
#[derive(Debug, Clone)]
pub struct MemoryChannel {
    role: Role,
    id: PeerId,
    endpoint: Arc<Endpoint>,
    net: Arc<NetworkInner>,
}

impl MemoryChannel {
    /// This endpoint's peer identity (`SERVER_PEER` for the server).
    pub fn peer_id(&self) -> PeerId {
        self.id
    }

    /// Close the endpoint: the close token fires, further sends fail and
    /// inbound packets are dropped. Idempotent.
    pub fn close(&self) {
        self.endpoint.closed.cancel();
        if self.role == Role::Client {
            lock(&self.net.clients).remove(&self.id);
        }
    }
}

impl Channel for MemoryChannel {
    fn role(&self) -> Role {
        self.role
    }

    fn send(&self, target: Target, bytes: Vec<u8>) -> Result<(), ChannelError> {
        if self.endpoint.closed.is_cancelled() {
            return Err(ChannelError::Closed);
        }
        match (self.role, target) {
            (Role::Server, Target::Peer(peer)) => {
                let client = lock(&self.net.clients)
                    .get(&peer)
                    .cloned()
                    .ok_or(ChannelError::PeerUnreachable(peer))?;
                client.deliver(Inbound { sender: SERVER_PEER, bytes });
                Ok(())
            }
            (Role::Server, Target::All) => {
                let clients: Vec<_> = lock(&self.net.clients).values().cloned().collect();
                for client in clients {
                    client.deliver(Inbound {
                        sender: SERVER_PEER,
                        bytes: bytes.clone(),
                    });
                }
                Ok(())
            }
            (Role::Client, Target::Server) => {
                self.net.server.deliver(Inbound { sender: self.id, bytes });
                Ok(())
            }
            _ => Err(ChannelError::InvalidTarget),
        }
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<Inbound> {
        self.endpoint.subscribe()
    }

    fn closed(&self) -> CancellationToken {
        self.endpoint.closed.clone()
    }
}
