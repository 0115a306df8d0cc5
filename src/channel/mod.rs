//! Channel abstraction the burst and delta pairs compose over.
//!
//! A [`Channel`] is one endpoint of a bidirectional, possibly lossy packet
//! link between a server and its client peers. The transmitters and
//! receivers in this crate consume nothing else from the transport: an
//! addressed fire-and-forget send, a subscription stream of inbound
//! packets, the endpoint's role, and a close notification.

use std::fmt;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[cfg(feature = "memory-channel")]
#[cfg_attr(docsrs, doc(cfg(feature = "memory-channel")))]
pub mod memory;

/// Identity of a connected peer, assigned by the channel implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// Which side of the channel an endpoint is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The single authoritative endpoint; addresses clients by [`PeerId`].
    Server,
    /// A client endpoint; its only peer is the server.
    Client,
}

/// Addressing for an outbound packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// A specific client peer. Valid from server endpoints only.
    Peer(PeerId),
    /// The server peer. Valid from client endpoints only.
    Server,
    /// Every connected client. Valid from server endpoints only.
    All,
}

/// An inbound packet together with its sender's identity.
#[derive(Debug, Clone)]
pub struct Inbound {
    /// Identity of the sending endpoint.
    pub sender: PeerId,
    /// Raw packet bytes.
    pub bytes: Vec<u8>,
}

/// Channel delivery errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The addressed peer is not connected.
    #[error("{0} is not reachable")]
    PeerUnreachable(PeerId),

    /// This endpoint has been closed.
    #[error("channel endpoint is closed")]
    Closed,

    /// The target cannot be addressed from this endpoint's role.
    #[error("target is not addressable from this endpoint")]
    InvalidTarget,
}

/// One endpoint of a bidirectional, possibly lossy packet channel.
///
/// Sends enqueue and return immediately; neither delivery nor ordering is
/// guaranteed. Implementations must deliver inbound packets to every live
/// subscription without blocking the sender.
pub trait Channel: Send + Sync + 'static {
    /// This endpoint's role.
    fn role(&self) -> Role;

    /// Enqueue a packet toward the target. Never blocks.
    fn send(&self, target: Target, bytes: Vec<u8>) -> Result<(), ChannelError>;

    /// Register a new subscription receiving every inbound packet.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<Inbound>;

    /// Token cancelled when this endpoint is closed or destroyed.
    fn closed(&self) -> CancellationToken;
}
