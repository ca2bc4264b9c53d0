//! Contract between the sync core and whatever moves bytes between peers.
//!
//! A transport owns identity assignment and connection establishment. It
//! reports everything that happens on its channels as `TransportEvent`s, in
//! order, to the single actor loop that owns the session.

use crate::{ChannelHandle, PeerIdentity, SessionError};

#[derive(Debug)]
pub enum TransportEvent {
    /// A channel to `peer` is open; `channel` is its outbound half.
    Opened {
        peer: PeerIdentity,
        channel: ChannelHandle,
    },
    Data {
        from: PeerIdentity,
        bytes: Vec<u8>,
    },
    Closed {
        peer: PeerIdentity,
    },
    /// The channel to `peer` failed, or an outgoing connection attempt never
    /// opened.
    Failed {
        peer: PeerIdentity,
        reason: String,
    },
}

/// Implementations keep at most one live channel per identity: a second
/// channel for an identity that is connected or being dialed is refused, and
/// `Closed`/`Failed` for a channel is reported before its identity can open
/// again. Every event for an identity therefore refers to a single channel.
pub trait Transport {
    /// The identity other peers know us by, once the transport has one.
    fn local_identity(&self) -> Option<PeerIdentity>;

    /// Starts opening a channel to `target`. Success only means the attempt
    /// is underway; the outcome arrives later as `Opened` or `Failed`.
    fn connect(&mut self, target: &PeerIdentity) -> Result<(), SessionError>;
}
