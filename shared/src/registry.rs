//! Bookkeeping for open peer channels.
//!
//! The registry maps each peer identity to the outbound half of its channel.
//! Sending never blocks: bytes are queued on an unbounded channel drained by
//! the transport's writer task. When that task is gone the queue is closed,
//! the send is dropped here, and the transport reports the loss separately as
//! a close or error event.

use crate::{encode, Envelope, PeerIdentity};
use log::{debug, error, warn};
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Outbound half of a peer channel.
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    sender: mpsc::UnboundedSender<Vec<u8>>,
}

impl ChannelHandle {
    pub fn new(sender: mpsc::UnboundedSender<Vec<u8>>) -> Self {
        Self { sender }
    }

    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    fn send(&self, bytes: Vec<u8>) -> bool {
        self.sender.send(bytes).is_ok()
    }
}

/// A registered peer channel
#[derive(Debug)]
pub struct Connection {
    pub peer_identity: PeerIdentity,
    pub channel: ChannelHandle,
}

impl Connection {
    pub fn is_open(&self) -> bool {
        self.channel.is_open()
    }
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<PeerIdentity, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
        }
    }

    /// Inserts or replaces the channel for `identity`.
    pub fn register(&mut self, identity: PeerIdentity, channel: ChannelHandle) {
        if self.connections.contains_key(&identity) {
            debug!("Replacing channel for {}", identity);
        }
        self.connections.insert(
            identity.clone(),
            Connection {
                peer_identity: identity,
                channel,
            },
        );
    }

    /// Removes the channel for `identity`. Returns true if one was registered.
    pub fn unregister(&mut self, identity: &PeerIdentity) -> bool {
        self.connections.remove(identity).is_some()
    }

    pub fn is_open(&self, identity: &PeerIdentity) -> bool {
        self.connections
            .get(identity)
            .map(Connection::is_open)
            .unwrap_or(false)
    }

    /// Queues `envelope` for `identity`. Returns true if it was handed to an
    /// open channel.
    pub fn send(&self, identity: &PeerIdentity, envelope: &Envelope) -> bool {
        match encode(envelope) {
            Ok(bytes) => self.send_bytes(identity, bytes),
            Err(e) => {
                error!("Failed to encode {} for {}: {}", envelope.kind(), identity, e);
                false
            }
        }
    }

    /// Queues `envelope` on every open channel. Returns how many accepted it.
    pub fn broadcast(&self, envelope: &Envelope) -> usize {
        self.broadcast_except(envelope, None)
    }

    /// Like `broadcast`, skipping `exclude`.
    pub fn broadcast_except(&self, envelope: &Envelope, exclude: Option<&PeerIdentity>) -> usize {
        let bytes = match encode(envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to encode {} for broadcast: {}", envelope.kind(), e);
                return 0;
            }
        };

        let mut delivered = 0;
        for identity in self.connections.keys() {
            if Some(identity) == exclude {
                continue;
            }
            if self.send_bytes(identity, bytes.clone()) {
                delivered += 1;
            }
        }
        delivered
    }

    fn send_bytes(&self, identity: &PeerIdentity, bytes: Vec<u8>) -> bool {
        let Some(connection) = self.connections.get(identity) else {
            debug!("No channel registered for {}, dropping message", identity);
            return false;
        };
        if !connection.is_open() {
            debug!("Channel to {} is not open, dropping message", identity);
            return false;
        }
        if !connection.channel.send(bytes) {
            warn!("Failed to queue message for {}", identity);
            return false;
        }
        true
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
